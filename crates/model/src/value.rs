//! Mapping and sequence sources, and parsing them out of resource files.

use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, trace};

pub use serde_json::Value;

/// Keyed mapping handed to [`Model::set_with_dictionary`](crate::Model::set_with_dictionary).
pub type Dictionary = serde_json::Map<String, Value>;

/// Typed lookups on a [`Dictionary`].
pub trait DictionaryExt {
    /// Returns the value under `key` converted to `V`, or `None` when it is absent or has
    /// another shape.
    fn value_of<V: DeserializeOwned>(&self, key: &str) -> Option<V>;
}

impl DictionaryExt for Dictionary {
    fn value_of<V: DeserializeOwned>(&self, key: &str) -> Option<V> {
        self.get(key).and_then(|value| V::deserialize(value).ok())
    }
}

/// A parsed resource file.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Dictionary(Dictionary),
    Sequence(Vec<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_hint(hint: Option<&Path>) -> Option<Self> {
        let extension = hint?.extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else if extension.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else {
            None
        }
    }

    /// A leading `[` is ambiguous: a JSON array or a TOML table header.
    fn sniff(text: &str) -> Self {
        match text.trim_start().as_bytes().first() {
            Some(b'{' | b'[') => Self::Json,
            _ => Self::Toml,
        }
    }

    const fn other(self) -> Self {
        match self {
            Self::Json => Self::Toml,
            Self::Toml => Self::Json,
        }
    }

    fn parse(self, text: &str) -> Result<Value, String> {
        match self {
            Self::Json => serde_json::from_str::<Value>(text).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str::<Value>(text).map_err(|e| e.to_string()),
        }
    }
}

/// Parses `bytes` as a mapping or a sequence.
///
/// The format follows the extension of `hint` (`json`, `toml`). Other or missing extensions
/// are sniffed, and when the sniffed format fails to parse the other one is tried. Returns
/// `None` for unparsable content and for top-level scalars.
#[must_use]
pub fn parse_document(bytes: &[u8], hint: Option<&Path>) -> Option<Document> {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.trim_start_matches('\u{feff}'),
        Err(err) => {
            debug!(error = %err, "Resource is not UTF-8");
            return None;
        },
    };

    let (format, parsed) = match Format::from_hint(hint) {
        Some(format) => (format, format.parse(text)),
        None => {
            let sniffed = Format::sniff(text);
            match sniffed.parse(text) {
                Ok(value) => (sniffed, Ok(value)),
                Err(error) => {
                    trace!(format = ?sniffed, %error, "Sniffed format failed, trying the other");
                    let other = sniffed.other();
                    (other, other.parse(text))
                },
            }
        },
    };

    match parsed {
        Ok(Value::Object(map)) => Some(Document::Dictionary(map)),
        Ok(Value::Array(items)) => Some(Document::Sequence(items)),
        Ok(other) => {
            debug!(?format, kind = kind_of(&other), "Resource holds a scalar");
            None
        },
        Err(error) => {
            debug!(?format, %error, "Resource could not be parsed");
            None
        },
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_of_converts_or_yields_none() {
        let Value::Object(dict) = json!({ "timeout": 30, "name": "basis" }) else {
            unreachable!()
        };

        assert_eq!(dict.value_of::<u32>("timeout"), Some(30));
        assert_eq!(dict.value_of::<String>("name").as_deref(), Some("basis"));
        assert_eq!(dict.value_of::<u32>("name"), None);
        assert_eq!(dict.value_of::<u32>("missing"), None);
    }

    #[test]
    fn json_object_is_a_dictionary() {
        let doc = parse_document(br#"{"timeout": 30}"#, Some(Path::new("config.json")));
        let Some(Document::Dictionary(dict)) = doc else { panic!("expected dictionary") };
        assert_eq!(dict.value_of::<u32>("timeout"), Some(30));
    }

    #[test]
    fn json_array_is_a_sequence() {
        let doc = parse_document(b"  [1, 2, 3]", None);
        assert_eq!(doc, Some(Document::Sequence(vec![json!(1), json!(2), json!(3)])));
    }

    #[test]
    fn toml_by_extension_and_by_sniffing() {
        let text = b"timeout = 30\n[retry]\ncount = 2\n";

        for hint in [Some(Path::new("config.toml")), None, Some(Path::new("config.plist"))] {
            let Some(Document::Dictionary(dict)) = parse_document(text, hint) else {
                panic!("expected dictionary for {hint:?}");
            };
            assert_eq!(dict.value_of::<u32>("timeout"), Some(30));
            assert_eq!(dict["retry"]["count"], json!(2));
        }
    }

    #[test]
    fn sniffed_toml_may_open_with_a_table_header() {
        let text = b"[server]\ntimeout = 30\n";

        for hint in [None, Some(Path::new("config.conf"))] {
            let Some(Document::Dictionary(dict)) = parse_document(text, hint) else {
                panic!("expected dictionary for {hint:?}");
            };
            assert_eq!(dict["server"]["timeout"], json!(30));
        }
    }

    #[test]
    fn sniffed_json_array_stays_a_sequence() {
        let doc = parse_document(b"[\"a\", \"b\"]", Some(Path::new("tracks.list")));
        assert_eq!(doc, Some(Document::Sequence(vec![json!("a"), json!("b")])));
    }

    #[test]
    fn scalars_and_garbage_are_unusable() {
        assert_eq!(parse_document(b"42", Some(Path::new("n.json"))), None);
        assert_eq!(parse_document(b"{ not json", None), None);
        assert_eq!(parse_document(b"= = =", None), None);
        assert_eq!(parse_document(&[0xff, 0xfe, 0x00], None), None);
    }

    #[test]
    fn extension_overrides_sniffing() {
        assert_eq!(parse_document(b"timeout = 30", Some(Path::new("config.json"))), None);
    }
}
