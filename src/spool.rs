use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// A single uploaded blob staged on disk for the duration of one request.
///
/// The file must be gone by the time the response is finalized, on success
/// and failure alike: callers delete it explicitly with [`remove`], and
/// `Drop` covers early returns and panics as a backstop.
///
/// [`remove`]: SpooledUpload::remove
pub struct SpooledUpload {
    path: PathBuf,
    removed: bool,
}

impl SpooledUpload {
    /// Stage `data` under `spool_dir` with a request-unique name.
    pub async fn write(spool_dir: &Path, original_name: &str, data: &[u8]) -> Result<Self> {
        fs::create_dir_all(spool_dir)
            .await
            .context("failed to create spool directory")?;

        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let stored_name = format!("{}.{}", Uuid::new_v4(), ext);

        let path = spool_dir.join(stored_name);
        fs::write(&path, data)
            .await
            .context("failed to write spooled upload")?;

        Ok(Self {
            path,
            removed: false,
        })
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        fs::read(&self.path)
            .await
            .context("failed to read spooled upload")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the staged file. Consumes the spool so nothing can touch the
    /// path afterwards.
    pub async fn remove(mut self) -> Result<()> {
        self.removed = true;
        fs::remove_file(&self.path)
            .await
            .context("failed to delete spooled upload")
    }
}

impl Drop for SpooledUpload {
    fn drop(&mut self) {
        if !self.removed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
