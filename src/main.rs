//! Banking System - Main Application Entry Point
//!
//! A JSON API for a small retail bank: customers register, log in, deposit
//! and withdraw money, and list their ledger. Interest is credited on a
//! schedule by a background task.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: signed session cookie, sessions stored hashed
//! - **Background work**: in-process task queue (eager locally, worker pool in production)
//!
//! # Startup Flow
//!
//! 1. Load settings from environment variables (and `.env`)
//! 2. Initialize logging
//! 3. Create database connection pool and run migrations
//! 4. Collect static files
//! 5. Start the task queue and the periodic scheduler
//! 6. Build HTTP router and serve until Ctrl-C

mod app;
mod config;
mod db;
mod error;
mod handlers;
mod ledger;
mod middleware;
mod models;
mod services;
mod static_files;
mod tasks;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{EmailBackend, Settings};
use crate::tasks::{JobContext, TaskQueue, scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let settings = Arc::new(Settings::from_env()?);

    // RUST_LOG wins over the environment's default filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    if settings.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
    tracing::info!(environment = ?settings.environment, "Configuration loaded");

    if settings.is_production() && matches!(settings.email, EmailBackend::Console { .. }) {
        tracing::warn!("No email relay configured; emails will only be logged");
    }

    // Create database pool
    let pool = db::create_pool(&settings.database).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    static_files::collect_on_startup(&settings.static_files);

    let (tasks, _workers) = TaskQueue::start(JobContext {
        pool: pool.clone(),
        settings: Arc::clone(&settings),
        http: reqwest::Client::new(),
    });
    scheduler::spawn(tasks.clone(), settings.tasks.interest_interval);
    tracing::info!(mode = ?settings.tasks.mode, "Task queue started");

    let app = app::build_router(app::AppState {
        pool,
        settings: Arc::clone(&settings),
        tasks,
    });

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", settings.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
