//! Initializer cascade: defaults, then `set_up`, then one source-specific hook.
//!
//! Nothing here fails. Unusable input is logged at `debug` and the next fallback is used,
//! ending with a defaults-only instance.

use crate::archive::{self, Decoder};
use crate::model::Model;
use crate::value::{self, Dictionary, Document, Value};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Where a new instance takes its data from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    None,
    Dictionary(&'a Dictionary),
    Sequence(&'a [Value]),
    Decoder(&'a Decoder),
}

/// Builds an instance from `source`.
///
/// 1. `T::default()`
/// 2. [`Model::set_up`]
/// 3. The single hook matching `source`, if any. For archives the stored unique id is
///    restored before [`Model::set_with_decoder`] runs.
#[must_use]
pub fn construct<T: Model>(source: Source<'_>) -> T {
    let mut instance = T::default();
    instance.set_up();

    match source {
        Source::None => {},
        Source::Dictionary(dict) => instance.set_with_dictionary(dict),
        Source::Sequence(items) => instance.set_with_array(items),
        Source::Decoder(decoder) => {
            if let Some(id) = decoder.unique_id() {
                instance.set_unique_id(id.to_owned());
            }
            instance.set_with_decoder(decoder);
        },
    }

    instance
}

/// A defaults-only instance.
#[must_use]
pub fn instance<T: Model>() -> T {
    construct(Source::None)
}

#[must_use]
pub fn with_dictionary<T: Model>(dict: &Dictionary) -> T {
    construct(Source::Dictionary(dict))
}

#[must_use]
pub fn with_array<T: Model>(items: &[Value]) -> T {
    construct(Source::Sequence(items))
}

#[must_use]
pub fn with_decoder<T: Model>(decoder: &Decoder) -> T {
    construct(Source::Decoder(decoder))
}

/// Builds an instance from file contents.
///
/// Archive bytes go through the decoder; anything else is parsed as a mapping or sequence
/// (format from the extension of `hint`, otherwise sniffed). Unusable bytes yield
/// [`instance`].
#[must_use]
pub fn construct_from_bytes<T: Model>(bytes: &[u8], hint: Option<&Path>) -> T {
    try_construct_from_bytes(bytes, hint).unwrap_or_else(instance)
}

/// Reads `path` and builds an instance from its contents, or from defaults when the file
/// cannot be read.
pub async fn construct_from_file<T: Model>(path: impl AsRef<Path>) -> T {
    let path = path.as_ref();
    match fs::read(path).await {
        Ok(bytes) => construct_from_bytes(&bytes, Some(path)),
        Err(error) => {
            debug!(model = T::NAME, path = %path.display(), %error, "File unreadable, using defaults");
            instance()
        },
    }
}

pub(crate) fn try_construct_from_bytes<T: Model>(bytes: &[u8], hint: Option<&Path>) -> Option<T> {
    if archive::is_archive(bytes) {
        return match Decoder::from_bytes(bytes) {
            Ok(decoder) if decoder.type_name() == T::NAME => Some(with_decoder(&decoder)),
            Ok(decoder) => {
                debug!(model = T::NAME, found = decoder.type_name(), "Archive belongs to another model");
                None
            },
            Err(error) => {
                debug!(model = T::NAME, %error, "Archive unreadable");
                None
            },
        };
    }

    match value::parse_document(bytes, hint)? {
        Document::Dictionary(dict) => Some(with_dictionary(&dict)),
        Document::Sequence(items) => Some(with_array(&items)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{Encoder, encode_model};
    use crate::error::ModelError;
    use crate::model::Descriptor;
    use crate::value::DictionaryExt;
    use serde_json::json;

    /// Records which hooks ran, in order.
    #[derive(Debug, Default)]
    struct Probe {
        calls: Vec<&'static str>,
        timeout: u32,
        id: Option<String>,
    }

    impl Descriptor for Probe {
        const NAME: &'static str = "probe";
    }

    impl Model for Probe {
        fn set_up(&mut self) {
            self.calls.push("set_up");
            self.timeout = 10;
        }

        fn set_with_dictionary(&mut self, dict: &Dictionary) {
            self.calls.push("dictionary");
            if let Some(timeout) = dict.value_of("timeout") {
                self.timeout = timeout;
            }
        }

        fn set_with_array(&mut self, items: &[Value]) {
            self.calls.push("array");
            self.timeout = u32::try_from(items.len()).unwrap_or(u32::MAX);
        }

        fn set_with_decoder(&mut self, decoder: &Decoder) {
            self.calls.push("decoder");
            if let Some(timeout) = decoder.decode("timeout") {
                self.timeout = timeout;
            }
        }

        fn encode_with_encoder(&self, encoder: &mut Encoder) -> Result<(), ModelError> {
            encoder.encode("timeout", &self.timeout)
        }

        fn unique_id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_unique_id(&mut self, id: String) {
            self.id = Some(id);
        }
    }

    /// Implements nothing.
    #[derive(Debug, Default, PartialEq)]
    struct Bare {
        value: u8,
    }

    impl Descriptor for Bare {
        const NAME: &'static str = "bare";
    }

    impl Model for Bare {}

    #[test]
    fn none_runs_only_set_up() {
        let probe = instance::<Probe>();
        assert_eq!(probe.calls, ["set_up"]);
        assert_eq!(probe.timeout, 10);
    }

    #[test]
    fn each_source_runs_exactly_one_hook_after_set_up() {
        let dict = json!({ "timeout": 30 });
        let dict = dict.as_object().unwrap();
        assert_eq!(with_dictionary::<Probe>(dict).calls, ["set_up", "dictionary"]);

        let items = [json!(1), json!(2)];
        let probe = with_array::<Probe>(&items);
        assert_eq!(probe.calls, ["set_up", "array"]);
        assert_eq!(probe.timeout, 2);

        let decoder = Decoder::from(Encoder::new("probe"));
        assert_eq!(with_decoder::<Probe>(&decoder).calls, ["set_up", "decoder"]);
    }

    #[test]
    fn missing_hooks_are_skipped() {
        let dict = Dictionary::new();
        assert_eq!(with_dictionary::<Bare>(&dict), Bare::default());
        assert_eq!(with_array::<Bare>(&[json!(1)]), Bare::default());
    }

    #[test]
    fn dictionary_overrides_set_up_defaults() {
        let probe = construct_from_bytes::<Probe>(br#"{"timeout": 30}"#, None);
        assert_eq!(probe.timeout, 30);
    }

    #[test]
    fn archive_bytes_restore_fields_and_id() {
        let mut source = with_dictionary::<Probe>(json!({ "timeout": 45 }).as_object().unwrap());
        source.set_unique_id("abc".into());

        let restored = construct_from_bytes::<Probe>(&encode_model(&source).unwrap(), None);
        assert_eq!(restored.calls, ["set_up", "decoder"]);
        assert_eq!(restored.timeout, 45);
        assert_eq!(restored.unique_id(), Some("abc"));
    }

    #[test]
    fn archive_of_another_model_is_unusable() {
        let bytes = encode_model(&Bare::default()).unwrap();
        assert_eq!(construct_from_bytes::<Probe>(&bytes, None).calls, ["set_up"]);
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        for bytes in [&b"BSAR\x01\x00\xff\xff"[..], b"\"scalar\"", b"{ broken", b""] {
            let probe = construct_from_bytes::<Probe>(bytes, Some(Path::new("probe.json")));
            assert_eq!(probe.calls, ["set_up"], "input {bytes:?}");
            assert_eq!(probe.timeout, 10);
        }
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let probe = construct_from_file::<Probe>(dir.path().join("absent.json")).await;
        assert_eq!(probe.calls, ["set_up"]);
    }

    #[tokio::test]
    async fn toml_file_is_a_dictionary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.toml");
        std::fs::write(&path, "timeout = 25\n").unwrap();

        assert_eq!(construct_from_file::<Probe>(&path).await.timeout, 25);
    }
}
