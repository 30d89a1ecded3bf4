use crate::engine::{Compression, Storage, StorageInner};
use crate::error::{StorageError, StorageErrorExt};
use private::Sealed;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::fs;
use tracing::info;

#[derive(Debug, Clone, Copy)]
struct StorageOptions {
    compression: Compression,
    create: bool,
    purge: bool,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self { compression: Compression::None, create: true, purge: true }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct StorageBuilder<S: Sealed = NoRoot> {
    state: S,
    options: StorageOptions,
}

#[allow(private_bounds)]
impl<S: Sealed> StorageBuilder<S> {
    #[must_use = "Sets compression for stored files"]
    pub const fn compression(mut self, compression: Compression) -> Self {
        self.options.compression = compression;
        self
    }

    #[must_use = "Sets whether the root directory is created when missing"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.options.create = enable;
        self
    }

    /// Resource roots are read-only, so callers usually disable purging for them.
    #[must_use = "Sets whether stale temporary files are purged on connect"]
    pub const fn purge(mut self, enable: bool) -> Self {
        self.options.purge = enable;
        self
    }

    fn transition<N: Sealed>(self, state: N) -> StorageBuilder<N> {
        StorageBuilder { state, options: self.options }
    }
}

impl StorageBuilder<NoRoot> {
    #[must_use = "Creates a new storage builder with default options"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the root directory of the storage"]
    pub fn root(self, path: impl Into<PathBuf>) -> StorageBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }
}

impl StorageBuilder<WithRoot> {
    /// Consumes the builder and opens the storage.
    ///
    /// 1. Creates the root directory when `create(true)` was set.
    /// 2. Canonicalizes the root so later sandbox checks compare physical paths.
    /// 3. Purges orphaned temporary files when `purge(true)` was set.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the root cannot be created or resolved, for example
    /// when it does not exist and `create` is false.
    pub async fn connect(self) -> Result<Storage, StorageError> {
        let root = &self.state.0;

        if self.options.create {
            fs::create_dir_all(root)
                .await
                .context(format!("Failed to bootstrap storage root: {}", root.display()))?;
            info!(path = %root.display(), "Bootstrapped storage root directory");
        }

        let canonical = fs::canonicalize(root)
            .await
            .context(format!("Failed to resolve storage root: {}", root.display()))?;

        let storage = Storage {
            inner: Arc::new(StorageInner {
                root: canonical,
                compression: self.options.compression,
                tmp_counter: AtomicU64::new(1),
            }),
        };

        if self.options.purge {
            storage.purge_tmp().await;
        }

        Ok(storage)
    }
}
