//! The capability protocol a concrete model type opts into.

use crate::archive::{Decoder, Encoder};
use crate::error::ModelError;
use crate::value::{Dictionary, Value};
use bitflags::bitflags;
use std::path::PathBuf;

/// Static facts about a model type: its stable name and where its files live.
///
/// Paths are relative. Resource files resolve against the resource root, save files
/// against the save root.
pub trait Descriptor {
    /// Stable name used in archives, file names and notifications.
    ///
    /// Archives are matched to a type by this name alone. Instantiations of a generic model
    /// share one name, and therefore one save file and each other's archives, unless
    /// `Descriptor` is implemented per instantiation with distinct names.
    const NAME: &'static str;

    /// Read-only bootstrap file holding a mapping or a sequence.
    #[must_use]
    fn resource_file() -> PathBuf {
        PathBuf::from(format!("{}.json", Self::NAME))
    }

    /// Archive of the shared instance.
    #[must_use]
    fn save_file() -> PathBuf {
        PathBuf::from(format!("{}.archive", Self::NAME))
    }

    /// Archive of the instance carrying `id`.
    #[must_use]
    fn save_file_for_id(id: &str) -> PathBuf {
        PathBuf::from(Self::NAME).join(format!("{id}.archive"))
    }
}

bitflags! {
    /// Hooks a model type overrides. Informational only; every hook is safe to call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const SET_UP = 1 << 0;
        const DICTIONARY = 1 << 1;
        const ARRAY = 1 << 2;
        const DECODER = 1 << 3;
        const ENCODER = 1 << 4;
    }
}

/// A model type: a default-constructible value with optional construction and
/// persistence hooks.
///
/// Every hook has a no-op default body. Construction always runs [`Model::set_up`] first and
/// then at most one `set_with_*` hook matching the data source.
///
/// ```rust
/// use basis_model::{Capabilities, Dictionary, DictionaryExt, Model, descriptor, hooks};
///
/// #[descriptor(name = "config")]
/// #[derive(Debug, Default)]
/// struct Config {
///     timeout: u32,
/// }
///
/// #[hooks]
/// impl Model for Config {
///     fn set_up(&mut self) {
///         self.timeout = 10;
///     }
///
///     fn set_with_dictionary(&mut self, dict: &Dictionary) {
///         if let Some(timeout) = dict.value_of("timeout") {
///             self.timeout = timeout;
///         }
///     }
/// }
///
/// assert_eq!(Config::CAPABILITIES, Capabilities::SET_UP | Capabilities::DICTIONARY);
/// assert_eq!(basis_model::instance::<Config>().timeout, 10);
/// ```
pub trait Model: Descriptor + Default + Send + Sync + 'static {
    /// Declared hook set, usually generated by `#[hooks]`.
    const CAPABILITIES: Capabilities = Capabilities::empty();

    /// Establishes defaults. First step of every construction path.
    fn set_up(&mut self) {}

    fn set_with_dictionary(&mut self, _dict: &Dictionary) {}

    fn set_with_array(&mut self, _array: &[Value]) {}

    /// Restores state from an archive. The unique id is already restored when this runs.
    fn set_with_decoder(&mut self, _decoder: &Decoder) {}

    /// Writes state into an archive. The unique id is recorded by the framework.
    ///
    /// # Errors
    /// Returns [`ModelError::Encode`] when a value cannot be serialized.
    fn encode_with_encoder(&self, _encoder: &mut Encoder) -> Result<(), ModelError> {
        Ok(())
    }

    /// The instance id, for types that carry one.
    fn unique_id(&self) -> Option<&str> {
        None
    }

    /// Stores an id. Types without an id field ignore it.
    fn set_unique_id(&mut self, _id: String) {}
}
