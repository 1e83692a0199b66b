use super::{ByteStore, StoreError};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Filesystem-backed store rooted at a directory
///
/// Writes go to a sibling `.part` file first and are renamed into place, so a
/// reader never sees a half-written chunk or track.
pub struct FsByteStore {
    root: PathBuf,
}

impl FsByteStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::io(&root.display().to_string(), e))?;

        info!("Audio storage initialized at {}", root.display());

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StoreError::io(
                key,
                std::io::Error::new(ErrorKind::InvalidInput, "storage key must be a relative path"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl ByteStore for FsByteStore {
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(key, e))?;
        }

        let mut partial = path.clone().into_os_string();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        fs::write(&partial, bytes)
            .await
            .map_err(|e| StoreError::io(key, e))?;
        fs::rename(&partial, &path)
            .await
            .map_err(|e| StoreError::io(key, e))?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(key)?;
        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(key.to_string()),
            _ => StoreError::io(key, e),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(key.to_string()),
            _ => StoreError::io(key, e),
        })
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}
