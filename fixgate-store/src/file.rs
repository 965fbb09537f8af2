/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! File-backed sequence counters.
//!
//! Each session keeps `<store_dir>/<session_id>.seqnums`, a small JSON
//! document. Saves go through a temporary file that is synced and then
//! renamed over the previous version, so a crash leaves either the old or the
//! new pair on disk, never a torn write.

use crate::traits::{SequenceNumbers, SequenceStore};
use async_trait::async_trait;
use fixgate_core::error::StoreError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Sequence store persisted as JSON on disk.
#[derive(Debug, Clone)]
pub struct FileSequenceStore {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl FileSequenceStore {
    /// Creates a store for `session_id` under `dir`.
    ///
    /// Nothing is touched on disk until the first load or save.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>, session_id: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            path: dir.join(format!("{session_id}.seqnums")),
            tmp_path: dir.join(format!("{session_id}.seqnums.tmp")),
        }
    }

    /// Returns the path of the persisted document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SequenceStore for FileSequenceStore {
    async fn load(&self) -> Result<SequenceNumbers, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(SequenceNumbers::default());
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&raw).map_err(|err| StoreError::Corrupted {
            reason: format!("{}: {err}", self.path.display()),
        })
    }

    async fn save(&self, seqs: SequenceNumbers) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec(&seqs).map_err(|err| StoreError::Io(err.to_string()))?;

        let mut file = tokio::fs::File::create(&self.tmp_path).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&self.tmp_path, &self.path).await?;

        debug!(
            path = %self.path.display(),
            out_seq = seqs.out_seq,
            in_seq = seqs.in_seq,
            "sequence numbers persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("fixgate-store-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_missing_file_loads_zeros() {
        let store = FileSequenceStore::new(scratch_dir(), "LP1");
        assert_eq!(store.load().await.unwrap(), SequenceNumbers::default());
    }

    #[tokio::test]
    async fn test_save_then_reload_from_fresh_handle() {
        let dir = scratch_dir();
        let seqs = SequenceNumbers {
            out_seq: 41,
            in_seq: 17,
        };
        FileSequenceStore::new(&dir, "LP1").save(seqs).await.unwrap();

        let reopened = FileSequenceStore::new(&dir, "LP1");
        assert_eq!(reopened.load().await.unwrap(), seqs);
        assert!(reopened.path().ends_with("LP1.seqnums"));
        assert!(!dir.join("LP1.seqnums.tmp").exists());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_corrupted_file() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("LP2.seqnums"), b"not json").unwrap();

        let store = FileSequenceStore::new(&dir, "LP2");
        assert!(matches!(
            store.load().await,
            Err(StoreError::Corrupted { .. })
        ));

        let _ = std::fs::remove_dir_all(dir);
    }
}
