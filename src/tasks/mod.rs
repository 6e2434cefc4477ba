//! Background task queue.
//!
//! Jobs are either run eagerly on the caller's task (local development, so
//! failures surface immediately) or pushed onto a bounded channel drained by
//! worker tasks (production). [`scheduler`] enqueues periodic jobs.

pub mod scheduler;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::{
    config::{Settings, TaskMode},
    db::DbPool,
    error::AppError,
    services::{
        email_service::{self, EmailMessage},
        session_service, transaction_service,
    },
};

/// Unit of background work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    SendEmail(EmailMessage),
    AccrueInterest,
    PurgeExpiredSessions,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::SendEmail(_) => "send_email",
            Job::AccrueInterest => "accrue_interest",
            Job::PurgeExpiredSessions => "purge_expired_sessions",
        }
    }
}

/// Everything a job needs to run.
#[derive(Clone)]
pub struct JobContext {
    pub pool: DbPool,
    pub settings: Arc<Settings>,
    pub http: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Email(#[from] email_service::EmailError),

    #[error(transparent)]
    App(#[from] AppError),

    #[error("task queue is closed")]
    QueueClosed,
}

impl From<TaskError> for AppError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::App(inner) => inner,
            other => AppError::Task(other.to_string()),
        }
    }
}

#[derive(Clone)]
enum Dispatch {
    Eager(JobContext),
    Queue(mpsc::Sender<Job>),
}

/// Handle used by request handlers and the scheduler to submit jobs.
#[derive(Clone)]
pub struct TaskQueue {
    dispatch: Dispatch,
}

impl TaskQueue {
    /// Build a queue according to the configured mode.
    ///
    /// In worker mode the returned handles belong to the spawned workers;
    /// they finish once every `TaskQueue` clone has been dropped.
    pub fn start(ctx: JobContext) -> (Self, Vec<JoinHandle<()>>) {
        match ctx.settings.tasks.mode {
            TaskMode::Eager => (Self::eager(ctx), Vec::new()),
            TaskMode::Worker { workers } => {
                let capacity = ctx.settings.tasks.queue_capacity;
                Self::with_workers(ctx, workers, capacity)
            }
        }
    }

    pub fn eager(ctx: JobContext) -> Self {
        Self {
            dispatch: Dispatch::Eager(ctx),
        }
    }

    pub fn with_workers(
        ctx: JobContext,
        workers: usize,
        capacity: usize,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let ctx = ctx.clone();
                tokio::spawn(worker_loop(worker_id, receiver, ctx))
            })
            .collect();

        (
            Self {
                dispatch: Dispatch::Queue(sender),
            },
            handles,
        )
    }

    /// Submit a job.
    ///
    /// Eager mode runs the job before returning and propagates its error.
    /// Worker mode only fails if the queue has shut down.
    pub async fn enqueue(&self, job: Job) -> Result<(), TaskError> {
        match &self.dispatch {
            Dispatch::Eager(ctx) => run_job(ctx, job).await,
            Dispatch::Queue(sender) => {
                tracing::debug!(job = job.name(), "job queued");
                sender.send(job).await.map_err(|_| TaskError::QueueClosed)
            }
        }
    }

    #[cfg(test)]
    pub fn is_eager(&self) -> bool {
        matches!(self.dispatch, Dispatch::Eager(_))
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    ctx: JobContext,
) {
    tracing::debug!(worker_id, "task worker started");
    loop {
        // The lock is only held while waiting for the next job.
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };
        let name = job.name();
        if let Err(e) = run_job(&ctx, job).await {
            tracing::error!(worker_id, job = name, error = %e, "job failed");
        }
    }
    tracing::debug!(worker_id, "task worker stopped");
}

/// Execute one job.
pub async fn run_job(ctx: &JobContext, job: Job) -> Result<(), TaskError> {
    let started = std::time::Instant::now();
    let name = job.name();

    match job {
        Job::SendEmail(message) => {
            email_service::send(&ctx.settings.email, &ctx.http, &message).await?;
        }
        Job::AccrueInterest => {
            let credited = transaction_service::accrue_interest(&ctx.pool, Utc::now()).await?;
            tracing::info!(accounts = credited, "interest accrued");
        }
        Job::PurgeExpiredSessions => {
            let removed = session_service::purge_expired(&ctx.pool).await?;
            tracing::debug!(removed, "expired sessions purged");
        }
    }

    tracing::debug!(job = name, elapsed_ms = started.elapsed().as_millis() as u64, "job finished");
    Ok(())
}
