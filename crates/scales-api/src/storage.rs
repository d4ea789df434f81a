use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::error::ApiError;

/// On-disk store for uploaded attachments.
///
/// Flat directory, caller-chosen names, last write wins on name collisions.
/// No deduplication and no integrity hashing; files are also served
/// directly under `/uploads/{name}`.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Uploads directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Reject names that would escape the uploads directory.
    pub fn validate_name(name: &str) -> Result<(), ApiError> {
        let safe = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains('/')
            && !name.contains('\\');
        if safe {
            Ok(())
        } else {
            Err(ApiError::Validation("file name"))
        }
    }

    pub async fn save(&self, name: &str, bytes: &[u8]) -> Result<()> {
        fs::write(self.path_for(name), bytes).await?;
        Ok(())
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.path_for(name)).await?)
    }

    /// Missing files are not an error; deletion runs best-effort after the
    /// DB transaction commits.
    pub async fn delete(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Upload {} already gone", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Names of every payload currently on disk.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}
