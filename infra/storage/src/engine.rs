//! Storage handle: sandboxed reads, atomic and direct writes, optional compression.

use crate::builder::StorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance;
use crate::security;
use std::io::ErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Marker embedded in temporary file names; used by the purge routine.
pub(crate) const TMP_MARKER: &str = ".basistmp.";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

impl Compression {
    #[must_use]
    fn compress(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::None => data.to_vec(),
            Self::Lz4 => lz4_flex::compress_prepend_size(data),
        }
    }

    fn decompress(self, data: Vec<u8>) -> Result<Vec<u8>, StorageError> {
        match self {
            Self::None => Ok(data),
            Self::Lz4 => {
                lz4_flex::decompress_size_prepended(&data).context("Lz4 decompression failed")
            },
        }
    }
}

#[derive(Debug)]
pub struct StorageInner {
    /// Canonical physical root; every resolved path starts with it.
    pub(crate) root: PathBuf,
    pub(crate) compression: Compression,
    pub(crate) tmp_counter: AtomicU64,
}

/// A cheaply cloneable handle to a sandboxed directory.
///
/// ```rust
/// use basis_storage::{Storage, StorageError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     let storage = Storage::builder().root(tmp.path()).connect().await?;
///
///     storage.write("models/user/42.archive", b"data").await?;
///     assert!(storage.exists("models/user/42.archive")?);
///
///     storage.delete("models/user/42.archive").await?;
///     assert!(!storage.exists("models/user/42.archive")?);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Storage {
    pub(crate) inner: Arc<StorageInner>,
}

impl Deref for Storage {
    type Target = StorageInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Storage {
    #[must_use = "The storage is not opened until you call .connect()"]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    /// The canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    #[must_use]
    pub fn compression(&self) -> Compression {
        self.inner.compression
    }

    /// Resolves a relative path to a physical path inside the root.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] if the path is empty, absolute, escapes the root,
    /// or passes through a symlink pointing outside it.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        security::resolve_path(&self.root, path)
    }

    /// Reads a whole file, decompressing it when compression is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if the file does not exist,
    /// [`StorageError::Decompress`] if the bytes are not a valid compressed block, and
    /// [`StorageError::Io`] for any other read failure.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        let resolved = self.resolve(path)?;

        let data = match fs::read(&resolved).await {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StorageError::FileNotFound {
                    message: resolved.display().to_string().into(),
                    context: None,
                });
            },
            Err(err) => {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Read failed: {}", resolved.display()).into()),
                });
            },
        };

        self.inner.compression.decompress(data)
    }

    /// Writes a file atomically.
    ///
    /// 1. Data goes to a unique temporary file next to the target (`<name>.basistmp.<n>`).
    /// 2. The temporary file is synced to disk.
    /// 3. It is renamed over the target; the parent directory is synced afterwards.
    ///
    /// Missing parent directories are created. On platforms that refuse to rename over an
    /// existing file the target is removed first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] for paths outside the root and
    /// [`StorageError::Io`] for permission, disk-full or rename failures. The temporary file
    /// is removed when the write fails.
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        let resolved = self.prepare_target(path).await?;
        let temp = unique_tmp_path(&resolved, &self.tmp_counter);
        let payload = self.inner.compression.compress(data);

        if let Err(err) = write_synced(&temp, &payload).await {
            discard_tmp(&temp).await;
            return Err(err);
        }

        if let Err(err) = fs::rename(&temp, &resolved).await {
            if err.kind() != ErrorKind::AlreadyExists {
                discard_tmp(&temp).await;
                return Err(StorageError::Io {
                    source: err,
                    context: Some(
                        format!("Atomic swap failed: {} -> {}", temp.display(), resolved.display())
                            .into(),
                    ),
                });
            }

            let replaced = async {
                fs::remove_file(&resolved).await.context(format!(
                    "Failed to replace existing file: {}",
                    resolved.display()
                ))?;
                fs::rename(&temp, &resolved).await.context(format!(
                    "Atomic swap failed: {} -> {}",
                    temp.display(),
                    resolved.display()
                ))
            };
            if let Err(err) = replaced.await {
                discard_tmp(&temp).await;
                return Err(err);
            }
        }

        if let Some(parent) = resolved.parent() {
            sync_dir(parent).await;
        }

        debug!(path = %resolved.display(), "File saved atomically");
        Ok(())
    }

    /// Writes a file in place, truncating any previous content.
    ///
    /// # Errors
    ///
    /// Same as [`Storage::write`]. A failure may leave the target partially written.
    pub async fn write_direct(
        &self,
        path: impl AsRef<Path>,
        data: &[u8],
    ) -> Result<(), StorageError> {
        let resolved = self.prepare_target(path).await?;
        let payload = self.inner.compression.compress(data);

        fs::write(&resolved, &payload)
            .await
            .context(format!("Write failed: {}", resolved.display()))?;

        debug!(path = %resolved.display(), "File saved in place");
        Ok(())
    }

    /// Deletes a file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if there is nothing to delete and
    /// [`StorageError::Io`] on permission failures.
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;
        match fs::remove_file(&resolved).await {
            Ok(()) => {},
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StorageError::FileNotFound {
                    message: resolved.display().to_string().into(),
                    context: None,
                });
            },
            Err(err) => {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Failed to delete: {}", resolved.display()).into()),
                });
            },
        }
        debug!(path = %resolved.display(), "File deleted");
        Ok(())
    }

    /// Checks whether a file exists inside the root.
    ///
    /// # Errors
    ///
    /// Only path validation errors are returned; a missing file is `Ok(false)`.
    pub fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        let resolved = self.resolve(path)?;
        Ok(resolved.is_file())
    }

    pub async fn purge_tmp(&self) {
        maintenance::purge_tmp(&self.root).await;
    }

    async fn prepare_target(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        let resolved = self.resolve(path)?;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create directories for {}", resolved.display()))?;
        }

        Ok(resolved)
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let mut file = fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .await
        .context(format!("Temp creation failed: {}", path.display()))?;
    file.write_all(data).await.context("Write failed")?;
    file.sync_all().await.context("Hardware sync failed")?;
    Ok(())
}

async fn discard_tmp(path: &Path) {
    if let Err(err) = fs::remove_file(path).await
        && err.kind() != ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %err, "Failed to remove temporary file");
    }
}

async fn sync_dir(path: &Path) {
    match fs::File::open(path).await {
        Ok(dir) => {
            if let Err(err) = dir.sync_all().await {
                warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Directory open failed");
        },
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("archive");
    target.with_file_name(format!("{file_name}{TMP_MARKER}{}.{counter}", std::process::id()))
}
