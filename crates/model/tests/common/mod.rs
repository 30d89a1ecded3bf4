#![allow(dead_code, unreachable_pub)]

use basis_model::{
    Decoder, Dictionary, DictionaryExt, Encoder, Model, ModelError, Registry, StorageConfig,
    Value, descriptor, hooks,
};
use std::path::Path;
use tempfile::TempDir;

/// `set_up` gives 10; the resource file and archives override it.
#[descriptor(name = "config")]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Config {
    pub timeout: u32,
    pub label: String,
}

#[hooks]
impl Model for Config {
    fn set_up(&mut self) {
        self.timeout = 10;
    }

    fn set_with_dictionary(&mut self, dict: &Dictionary) {
        if let Some(timeout) = dict.value_of("timeout") {
            self.timeout = timeout;
        }
        if let Some(label) = dict.value_of("label") {
            self.label = label;
        }
    }

    fn set_with_decoder(&mut self, decoder: &Decoder) {
        if let Some(timeout) = decoder.decode("timeout") {
            self.timeout = timeout;
        }
        if let Some(label) = decoder.decode("label") {
            self.label = label;
        }
    }

    fn encode_with_encoder(&self, encoder: &mut Encoder) -> Result<(), ModelError> {
        encoder.encode("timeout", &self.timeout)?;
        encoder.encode("label", &self.label)
    }
}

/// Bootstrapped from a JSON array; carries its own id.
#[descriptor(name = "playlist", resource = "lists/playlist.json", save = "lists/playlist.bin")]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Playlist {
    pub id: Option<String>,
    pub tracks: Vec<String>,
}

#[hooks]
impl Model for Playlist {
    fn set_with_array(&mut self, array: &[Value]) {
        self.tracks = array.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect();
    }

    fn set_with_decoder(&mut self, decoder: &Decoder) {
        self.tracks = decoder.decode("tracks").unwrap_or_default();
    }

    fn encode_with_encoder(&self, encoder: &mut Encoder) -> Result<(), ModelError> {
        encoder.encode("tracks", &self.tracks)
    }

    fn unique_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_unique_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

/// Implements no hooks at all.
#[descriptor]
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Marker {
    pub flag: bool,
}

#[hooks]
impl Model for Marker {}

pub struct Fixture {
    pub dir: TempDir,
    pub config: StorageConfig,
}

impl Fixture {
    /// Resource root holding `config.json` = `{"timeout": 30}` and a playlist array.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let resources = dir.path().join("resources");
        std::fs::create_dir_all(resources.join("lists")).expect("resource dirs");
        std::fs::write(resources.join("config.json"), r#"{"timeout": 30}"#).expect("config");
        std::fs::write(resources.join("lists/playlist.json"), r#"["intro", "outro"]"#)
            .expect("playlist");

        let config = StorageConfig {
            resource_dir: resources,
            save_dir: dir.path().join("saves"),
            ..StorageConfig::default()
        };
        Self { dir, config }
    }

    pub async fn registry(&self) -> Registry {
        Registry::from_config(&self.config).await.expect("registry")
    }

    pub fn save_path(&self, relative: impl AsRef<Path>) -> std::path::PathBuf {
        self.config.save_dir.join(relative)
    }
}
