//! Sandboxed file layer used by the model store.
//!
//! Every path handed to a [`Storage`] is relative to its root. Paths that are absolute or
//! climb out of the root are rejected before any I/O happens.
//!
//! # Core Features
//!
//! - **Atomic Writes**: unique temp file + `fsync` + `rename`, so readers never observe a
//!   partially written archive.
//! - **Direct Writes**: plain truncating writes for callers that opt out of atomicity.
//! - **Transparent Compression**: optional LZ4 block compression, invisible to the consumer.
//! - **Self-Healing**: stale temporary files left behind by crashes are purged on connect.
//!
//! # Examples
//!
//! ```rust
//! use basis_storage::{Compression, Storage, StorageError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("saves");
//!     let storage = Storage::builder()
//!         .root(&root)
//!         .create(true)
//!         .compression(Compression::Lz4)
//!         .connect()
//!         .await?;
//!
//!     storage.write("settings.archive", b"archive bytes").await?;
//!     assert_eq!(storage.read("settings.archive").await?, b"archive bytes");
//!
//!     assert!(storage.resolve("../outside.archive").is_err());
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;
mod security;

pub use builder::StorageBuilder;
pub use engine::{Compression, Storage};
pub use error::{StorageError, StorageErrorExt};
