use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tracing::{debug, warn};

use crate::shuffle::constants::STAGING_SUFFIX;
use crate::shuffle::error::{ShuffleError, ShuffleResult};

/// Output written to a sibling file and renamed over the real output only
/// once the run has succeeded. Dropping it uncommitted removes the staging
/// file, leaving the output path as it was before the run.
pub struct StagedOutput {
    target: PathBuf,
    staging: PathBuf,
    committed: bool,
}

impl StagedOutput {
    pub async fn create(target: &Path) -> ShuffleResult<(Self, File)> {
        let staging = staging_path(target).map_err(|source| ShuffleError::CreateOutput {
            path: target.to_path_buf(),
            source,
        })?;

        let file = File::create(&staging).await.map_err(|source| ShuffleError::CreateOutput {
            path: target.to_path_buf(),
            source,
        })?;
        debug!("Staging output in {}", staging.display());

        Ok((
            Self {
                target: target.to_path_buf(),
                staging,
                committed: false,
            },
            file,
        ))
    }

    /// Move the finished output into place. The input may be the target
    /// itself, its open handle keeps reading the old contents.
    pub async fn commit(mut self) -> ShuffleResult<()> {
        tokio::fs::rename(&self.staging, &self.target)
            .await
            .map_err(|source| ShuffleError::Persist {
                path: self.target.clone(),
                source,
            })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.staging) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove staging file {}: {}", self.staging.display(), e);
            }
        }
    }
}

fn staging_path(target: &Path) -> io::Result<PathBuf> {
    let name = target.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name")
    })?;

    let mut staged_name = std::ffi::OsString::from(".");
    staged_name.push(name);
    staged_name.push(STAGING_SUFFIX);
    Ok(target.with_file_name(staged_name))
}
