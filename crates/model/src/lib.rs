//! # Model
//!
//! A base for model types that are built uniformly from several sources, persisted as
//! archives, and shared as one well-known instance per type.
//!
//! ## Building blocks
//!
//! * [`Model`] and [`Descriptor`]: the capability protocol. Every hook has a no-op default;
//!   `#[descriptor]` and `#[hooks]` fill in the boilerplate.
//! * [`construct`]: the initializer cascade. Defaults, then [`Model::set_up`], then exactly
//!   one hook for the data source. Never fails.
//! * [`ModelStore`]: archives under a save root and read-only bootstrap files under a
//!   resource root, written atomically through `basis-storage`.
//! * [`Registry`]: one [`Shared`] instance per type, created lazily, replaceable and
//!   reloadable, with [`SharedInstanceUpdated`] notifications through `basis-events`.
//!
//! ## Loading order
//!
//! A save file always wins. The resource file (JSON or TOML mapping or sequence) is only
//! read when no usable save file exists, and a defaults-only instance is the last resort.
//! Missing or malformed files are logged at `debug` and never surface as errors.
//!
//! ## Example
//!
//! ```rust
//! use basis_model::{
//!     Decoder, Dictionary, DictionaryExt, Encoder, Model, ModelError, Registry,
//!     StorageConfig, descriptor, hooks,
//! };
//!
//! #[descriptor(name = "config")]
//! #[derive(Debug, Default)]
//! struct Config {
//!     timeout: u32,
//! }
//!
//! #[hooks]
//! impl Model for Config {
//!     fn set_up(&mut self) {
//!         self.timeout = 10;
//!     }
//!
//!     fn set_with_dictionary(&mut self, dict: &Dictionary) {
//!         if let Some(timeout) = dict.value_of("timeout") {
//!             self.timeout = timeout;
//!         }
//!     }
//!
//!     fn set_with_decoder(&mut self, decoder: &Decoder) {
//!         if let Some(timeout) = decoder.decode("timeout") {
//!             self.timeout = timeout;
//!         }
//!     }
//!
//!     fn encode_with_encoder(&self, encoder: &mut Encoder) -> Result<(), ModelError> {
//!         encoder.encode("timeout", &self.timeout)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ModelError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # std::fs::create_dir_all(tmp.path().join("resources")).unwrap();
//!     # std::fs::write(tmp.path().join("resources/config.json"), r#"{"timeout": 30}"#).unwrap();
//!     let config = StorageConfig {
//!         resource_dir: tmp.path().join("resources"),
//!         save_dir: tmp.path().join("saves"),
//!         ..StorageConfig::default()
//!     };
//!     let registry = Registry::from_config(&config).await?;
//!
//!     let shared = registry.get::<Config>().await;
//!     assert_eq!(shared.read().timeout, 30);
//!
//!     shared.write().timeout = 60;
//!     registry.save(&shared).await?;
//!
//!     assert_eq!(registry.reload::<Config>().await.read().timeout, 60);
//!     Ok(())
//! }
//! ```

extern crate self as basis_model;

mod archive;
mod cascade;
mod config;
mod error;
mod id;
mod model;
mod registry;
mod shared;
mod store;
mod value;

pub use crate::archive::{Decoder, Encoder, encode_model, is_archive};
pub use crate::cascade::{
    Source, construct, construct_from_bytes, construct_from_file, instance, with_array,
    with_decoder, with_dictionary,
};
pub use crate::config::{BasisConfig, CompressionMode, ENV_PREFIX, StorageConfig, load_config};
pub use crate::error::{ModelError, ModelErrorExt};
pub use crate::id::{ID_LENGTH, SAFE_ALPHABET, unique_id};
pub use crate::model::{Capabilities, Descriptor, Model};
pub use crate::registry::{Change, Registry, RegistryBuilder, SharedInstanceUpdated};
pub use crate::shared::Shared;
pub use crate::store::ModelStore;
pub use crate::value::{Dictionary, DictionaryExt, Document, Value, parse_document};
pub use basis_derive::{descriptor, hooks};
pub use basis_events::{NotificationReceiverExt, Subscription};
pub use basis_logger::LoggingConfig;
pub use basis_storage::{Compression, Storage, StorageError};
