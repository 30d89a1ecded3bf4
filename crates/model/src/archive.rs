//! Keyed binary archive used for save files.
//!
//! Layout: `[MAGIC "BSAR"][VERSION][FLAGS][BODY]`, where `BODY` is the postcard encoding of
//! the type name, the unique id and the entry map. Each entry holds the postcard encoding of
//! a single value, so a decoder can skip keys it does not know and a missing key reads as
//! `None`.

use crate::error::{ModelError, ModelErrorExt};
use crate::model::Model;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const MAGIC: [u8; 4] = *b"BSAR";
const VERSION: u8 = 1;
const FLAGS: u8 = 0;
const HEADER_LEN: usize = MAGIC.len() + 2;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Body {
    type_name: String,
    unique_id: Option<String>,
    entries: BTreeMap<String, Vec<u8>>,
}

/// Collects keyed values for [`Model::encode_with_encoder`].
#[derive(Debug, Default)]
pub struct Encoder {
    body: Body,
}

impl Encoder {
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { body: Body { type_name: type_name.into(), ..Body::default() } }
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns [`ModelError::Encode`] if the value cannot be serialized.
    pub fn encode<V: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &V,
    ) -> Result<(), ModelError> {
        let key = key.into();
        let bytes = postcard::to_stdvec(value).context(format!("Failed to encode key `{key}`"))?;
        self.body.entries.insert(key, bytes);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.body.entries.contains_key(key)
    }

    pub fn set_unique_id(&mut self, id: Option<String>) {
        self.body.unique_id = id;
    }

    /// Serializes the archive.
    ///
    /// # Errors
    /// Returns [`ModelError::Encode`] if the body cannot be serialized.
    pub fn into_bytes(self) -> Result<Vec<u8>, ModelError> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + 64);
        bytes.extend_from_slice(&MAGIC);
        bytes.push(VERSION);
        bytes.push(FLAGS);
        postcard::to_io(&self.body, &mut bytes).context("Failed to encode archive body")?;
        Ok(bytes)
    }
}

/// Read access to a decoded archive, handed to [`Model::set_with_decoder`].
#[derive(Debug, Default)]
pub struct Decoder {
    body: Body,
}

impl Decoder {
    /// Parses archive bytes.
    ///
    /// # Errors
    /// Returns [`ModelError::Archive`] for a wrong magic, an unsupported version or flags,
    /// or a corrupted body.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        if !is_archive(bytes) {
            return Err(malformed("Missing archive header"));
        }
        let (header, payload) = bytes.split_at(HEADER_LEN);
        let (version, flags) = (header[MAGIC.len()], header[MAGIC.len() + 1]);
        if version != VERSION {
            return Err(malformed(format!("Unsupported archive version {version}")));
        }
        if flags != FLAGS {
            return Err(malformed(format!("Unsupported archive flags {flags:#04x}")));
        }

        let body = postcard::from_bytes(payload)
            .map_err(|e| malformed(format!("Corrupted archive body: {e}")))?;
        Ok(Self { body })
    }

    /// Returns the value stored under `key`, or `None` when it is absent or does not decode
    /// as `V`.
    #[must_use]
    pub fn decode<V: DeserializeOwned>(&self, key: &str) -> Option<V> {
        let bytes = self.body.entries.get(key)?;
        match postcard::from_bytes(bytes) {
            Ok(value) => Some(value),
            Err(error) => {
                debug!(archive = %self.body.type_name, key, %error, "Archive entry did not decode");
                None
            },
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.body.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.body.entries.keys().map(String::as_str)
    }

    /// Name of the model type that wrote the archive.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.body.type_name
    }

    #[must_use]
    pub fn unique_id(&self) -> Option<&str> {
        self.body.unique_id.as_deref()
    }
}

impl From<Encoder> for Decoder {
    fn from(encoder: Encoder) -> Self {
        Self { body: encoder.body }
    }
}

/// Whether `bytes` start with an archive header.
#[must_use]
pub fn is_archive(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_LEN && bytes.starts_with(&MAGIC)
}

/// Encodes `instance` through its encode hook. The unique id is recorded in the envelope.
///
/// # Errors
/// Propagates failures of the encode hook and of the envelope encoding.
pub fn encode_model<T: Model>(instance: &T) -> Result<Vec<u8>, ModelError> {
    let mut encoder = Encoder::new(T::NAME);
    encoder.set_unique_id(instance.unique_id().map(str::to_owned));
    instance.encode_with_encoder(&mut encoder).context(format!("Encoding `{}`", T::NAME))?;
    encoder.into_bytes()
}

fn malformed(message: impl Into<std::borrow::Cow<'static, str>>) -> ModelError {
    ModelError::Archive { message: message.into(), context: None }
}
