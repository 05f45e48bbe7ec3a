use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use atomicwrites::{AtomicFile, OverwriteBehavior};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    config::StorageConfig,
    error::{Error, Result},
    mime::ImageKind,
    naming,
};

type LockTable = DashMap<String, Arc<Mutex<()>>>;

/// Upload and processed areas plus the per-name lock table.
#[derive(Clone)]
pub struct Storage {
    config: Arc<StorageConfig>,
    locks: Arc<LockTable>,
}

impl Storage {
    /// Creates both areas if they are missing.
    pub async fn open(config: StorageConfig) -> Result<Self> {
        for dir in [&config.upload_dir, &config.processed_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(Error::StorageWrite)?;
        }
        tracing::debug!(
            upload_dir = %config.upload_dir.display(),
            processed_dir = %config.processed_dir.display(),
            "storage areas ready"
        );

        Ok(Self {
            config: Arc::new(config),
            locks: Arc::new(DashMap::new()),
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.upload_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.config.processed_dir
    }

    /// Persists validated bytes under a fresh storage name and returns it.
    pub async fn store(
        &self,
        original: Option<&str>,
        kind: ImageKind,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let name = naming::storage_name(original, kind);
        let path = self.config.upload_dir.join(&name);

        let size = bytes.len();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|err| Error::StorageWrite(std::io::Error::other(err)))??;

        tracing::info!(name, size, "stored upload");
        Ok(name)
    }

    /// Takes exclusive access to a stored image for the duration of a request.
    pub async fn checkout(&self, name: &str) -> Result<Checkout> {
        naming::parse_storage_name(name)?;

        let lock = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;

        Ok(Checkout {
            name: name.to_string(),
            source: self.config.upload_dir.join(name),
            processed_dir: self.config.processed_dir.clone(),
            processed: Vec::new(),
            consume: self.config.consume_on_success,
            locks: self.locks.clone(),
            guard: Some(guard),
        })
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    AtomicFile::new(path, OverwriteBehavior::DisallowOverwrite)
        .write(|file| file.write_all(bytes))
        .map_err(|err| match err {
            atomicwrites::Error::Internal(err) | atomicwrites::Error::User(err) => {
                Error::StorageWrite(err)
            }
        })
}

/// Scoped access to one stored image. Transient processed files are always
/// removed on drop; the source is only deleted by [`Checkout::commit`].
pub struct Checkout {
    name: String,
    source: PathBuf,
    processed_dir: PathBuf,
    processed: Vec<PathBuf>,
    consume: bool,
    locks: Arc<LockTable>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Checkout {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Reserves a request-unique path in the processed area.
    pub fn processed_path(&mut self, operation: &str, kind: ImageKind) -> PathBuf {
        let stem = self
            .name
            .rsplit_once('.')
            .map_or(self.name.as_str(), |(stem, _)| stem);
        let path = self.processed_dir.join(format!(
            "{stem}_{operation}_{}.{}",
            Uuid::new_v4().simple(),
            kind.extension()
        ));
        self.processed.push(path.clone());
        path
    }

    /// Called once the response payload is fully built.
    pub async fn commit(mut self) -> Result<()> {
        for path in std::mem::take(&mut self.processed) {
            remove_quietly(&path).await;
        }

        if self.consume {
            tokio::fs::remove_file(&self.source)
                .await
                .map_err(|err| Error::read(&self.source, err))?;
            tracing::debug!(name = %self.name, "consumed upload");
        }
        Ok(())
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to remove processed file")
        }
    }
}

impl Drop for Checkout {
    fn drop(&mut self) {
        for path in self.processed.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "failed to remove processed file")
                }
            }
        }

        drop(self.guard.take());
        // Keep the entry while other requests still hold or wait on it.
        self.locks
            .remove_if(&self.name, |_, lock| Arc::strong_count(lock) == 1);
    }
}
