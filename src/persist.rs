//! Message files on disk
//!
//! Each message lands at `<directory>/<seq>.eml` with its raw bytes
//! unmodified. Saving the same sequence number again overwrites the
//! file.

use crate::error::Result;
use crate::session::SeqNum;
use std::path::{Path, PathBuf};

/// File extension of saved messages.
pub const EXTENSION: &str = "eml";

#[derive(Debug, Clone)]
pub struct Persister {
    directory: PathBuf,
}

impl Persister {
    /// Save into an existing directory.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Create `directory` (and parents) if needed, then save into it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the directory cannot be created.
    pub async fn create(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory).await?;
        Ok(Self { directory })
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[must_use]
    pub fn path_for(&self, seq: SeqNum) -> PathBuf {
        self.directory.join(format!("{seq}.{EXTENSION}"))
    }

    /// Write `body` for message `seq` and return the file path.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the file cannot be written.
    pub async fn save(&self, seq: SeqNum, body: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(seq);
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}
