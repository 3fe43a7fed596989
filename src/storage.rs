//! Single-slot persistent photo store.
//!
//! Holds the most recent captured photo across restarts. Writes go through a
//! temp file and rename so a reader never observes a half-written image.

use std::io;
use std::path::PathBuf;

use bytes::Bytes;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PhotoSlot {
    path: PathBuf,
}

impl PhotoSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Overwrite the slot with a new photo.
    pub async fn write(&self, data: &[u8]) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), bytes = data.len(), "photo slot written");
        Ok(())
    }

    /// Read the slot, `None` if nothing has been captured yet.
    pub async fn read(&self) -> io::Result<Option<Bytes>> {
        match fs::read(&self.path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let slot = PhotoSlot::new(dir.path().join("photo.jpg"));

        assert!(!slot.exists().await);
        assert_eq!(slot.read().await.unwrap(), None);

        let payload = b"\xFF\xD8fake jpeg\xFF\xD9".to_vec();
        slot.write(&payload).await.unwrap();

        assert!(slot.exists().await);
        assert_eq!(slot.read().await.unwrap().unwrap(), Bytes::from(payload));
    }

    #[tokio::test]
    async fn overwrite_replaces_previous_photo() {
        let dir = tempfile::tempdir().unwrap();
        let slot = PhotoSlot::new(dir.path().join("photo.jpg"));

        slot.write(b"first").await.unwrap();
        slot.write(b"second").await.unwrap();

        assert_eq!(
            slot.read().await.unwrap().unwrap(),
            Bytes::from_static(b"second")
        );
    }
}
