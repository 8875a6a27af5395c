use crate::Config;
use crate::import::ContentCategory;
use rand::Rng;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create poster directory {0:?}: {1}")]
    DirectoryCreationFailed(PathBuf, std::io::Error),

    #[error("Poster directory is not writable: {0:?}")]
    DirectoryNotWritable(PathBuf),

    #[error("Session secret is still the default value")]
    DefaultSessionSecret,
}

impl StartupCheckError {
    /// The server cannot do its job without its poster directories.
    pub fn is_critical(&self) -> bool {
        matches!(self, StartupCheckError::DirectoryCreationFailed(..))
    }
}

/// Whether `dir` exists as a directory and a file can be created inside it.
pub async fn is_writable_dir(dir: &Path) -> bool {
    match tokio::fs::metadata(dir).await {
        Ok(metadata) if metadata.is_dir() => {}
        _ => return false,
    }

    let probe = dir.join(format!(".write-check-{:016x}", rand::rng().random::<u64>()));
    match tokio::fs::write(&probe, b"").await {
        Ok(()) => {
            if let Err(e) = tokio::fs::remove_file(&probe).await {
                warn!("Failed to remove write probe {:?}: {}", probe, e);
            }
            true
        }
        Err(_) => false,
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    for category in ContentCategory::ALL {
        let dir = config.directories.dir_for(category);
        if !dir.exists() {
            info!(
                "Poster directory for {} does not exist, creating: {:?}",
                category, dir
            );
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                error!("Failed to create poster directory for {}: {}", category, e);
                errors.push(StartupCheckError::DirectoryCreationFailed(
                    dir.to_path_buf(),
                    e,
                ));
                continue;
            }
        }

        if is_writable_dir(dir).await {
            info!("Poster directory for {} is writable: {:?}", category, dir);
        } else {
            warn!("Poster directory for {} is not writable: {:?}", category, dir);
            errors.push(StartupCheckError::DirectoryNotWritable(dir.to_path_buf()));
        }
    }

    if config.app.session_secret == Config::default().app.session_secret {
        warn!("Session secret has not been changed from its default");
        errors.push(StartupCheckError::DefaultSessionSecret);
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
