use std::path::{Path, PathBuf};

use tokio::fs;

use crate::transport::frame;

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("write snapshot to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("replace snapshot at {path}: {source}")]
    Replace {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Writes the number set to a durable file via atomic replace.
///
/// Each save writes the full contents to `<path>.new`, then renames it
/// over the canonical path, so a concurrent reader of the canonical
/// path sees either the full old or the full new contents, never a
/// partial write. Not safe to call concurrently with itself: two saves
/// would race on the same temporary path.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists the numbers in the given order, one 10-byte frame each,
    /// no separators. On failure the temporary file is removed and the
    /// canonical file is left untouched.
    pub async fn save(&self, numbers: &[i64]) -> Result<(), SnapshotError> {
        let tmp_path = self.tmp_path();

        let mut buf = Vec::with_capacity(numbers.len() * frame::FRAME_LEN);
        for &number in numbers {
            buf.extend_from_slice(&frame::encode(number));
        }

        if let Err(source) = fs::write(&tmp_path, &buf).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(SnapshotError::Write {
                path: tmp_path,
                source,
            });
        }

        if let Err(source) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(SnapshotError::Replace {
                path: self.path.clone(),
                source,
            });
        }

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".new");
        PathBuf::from(tmp)
    }
}
