//! Static asset collection.
//!
//! On startup every file under the configured source directories is copied
//! into the static root, which is then served under `/static`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::StaticSettings;

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to copy {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Copy all files from `sources` into `root`, preserving relative paths.
///
/// Missing source directories are skipped. When two sources contain the
/// same relative path the first one wins. Returns the number of files copied.
pub fn collect(sources: &[PathBuf], root: &Path) -> Result<usize, CollectError> {
    fs::create_dir_all(root).map_err(|source| CollectError::Copy {
        path: root.to_path_buf(),
        source,
    })?;

    let mut copied = 0;
    let mut seen = std::collections::HashSet::new();

    for source_dir in sources.iter().filter(|d| d.is_dir()) {
        for entry in WalkDir::new(source_dir).follow_links(true) {
            let entry = entry.map_err(|source| CollectError::Walk {
                path: source_dir.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(source_dir) else {
                continue;
            };
            if !seen.insert(relative.to_path_buf()) {
                tracing::debug!(path = %relative.display(), "static file shadowed, skipping");
                continue;
            }

            let target = root.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|source| CollectError::Copy {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::copy(entry.path(), &target).map_err(|source| CollectError::Copy {
                path: entry.path().to_path_buf(),
                source,
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Best-effort collection run at startup.
///
/// Failures are logged and swallowed; the server starts regardless.
pub fn collect_on_startup(settings: &StaticSettings) {
    if settings.source_dirs.is_empty() {
        return;
    }
    match collect(&settings.source_dirs, &settings.root) {
        Ok(count) => tracing::info!(
            count,
            root = %settings.root.display(),
            "static files collected"
        ),
        Err(e) => tracing::warn!(error = %e, "static file collection failed, continuing"),
    }
}
