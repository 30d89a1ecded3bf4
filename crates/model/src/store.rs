//! Persistence manager: archives in the save root, bootstrap files in the resource root.

use crate::archive;
use crate::cascade;
use crate::config::StorageConfig;
use crate::error::ModelError;
use crate::id;
use crate::model::Model;
use basis_storage::{Storage, StorageError};
use std::path::Path;
use tracing::{debug, info, warn};

/// Reads and writes model instances.
///
/// Save files are authoritative: a readable save file always wins over the resource file,
/// which is only consulted to bootstrap a type that has never been saved. Resource files
/// are never written.
#[derive(Debug, Clone)]
pub struct ModelStore {
    saves: Storage,
    resources: Option<Storage>,
    atomic: bool,
}

impl ModelStore {
    /// Uses `saves` for archives and `resources`, when present, for bootstrap files.
    #[must_use]
    pub const fn new(saves: Storage, resources: Option<Storage>) -> Self {
        Self { saves, resources, atomic: true }
    }

    /// Sets whether the type-level helpers write through a temporary file.
    #[must_use]
    pub const fn atomic_writes(mut self, enable: bool) -> Self {
        self.atomic = enable;
        self
    }

    /// Opens both roots described by `config`.
    ///
    /// The save root is created when missing. An unusable resource root is logged and
    /// disables resource lookups.
    ///
    /// # Errors
    /// Returns [`ModelError::Storage`] if the save root cannot be opened.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, ModelError> {
        let saves = Storage::builder()
            .root(&config.save_dir)
            .compression(config.compression.into())
            .connect()
            .await?;

        let resources = match Storage::builder()
            .root(&config.resource_dir)
            .create(false)
            .purge(false)
            .connect()
            .await
        {
            Ok(storage) => Some(storage),
            Err(error) => {
                warn!(
                    path = %config.resource_dir.display(),
                    %error,
                    "Resource directory unusable, bootstrapping from defaults only"
                );
                None
            },
        };

        info!(saves = %saves.root().display(), resources = resources.is_some(), "Model store ready");
        Ok(Self::new(saves, resources).atomic_writes(config.atomic_writes))
    }

    #[must_use]
    pub const fn saves(&self) -> &Storage {
        &self.saves
    }

    #[must_use]
    pub const fn resources(&self) -> Option<&Storage> {
        self.resources.as_ref()
    }

    /// Encodes `instance` and writes it to `path` under the save root.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidPath`] for paths outside the root, [`ModelError::Encode`]
    /// when the encode hook fails, and [`ModelError::Storage`] for write failures.
    pub async fn save<T: Model>(
        &self,
        instance: &T,
        path: impl AsRef<Path>,
        atomic: bool,
    ) -> Result<(), ModelError> {
        let bytes = archive::encode_model(instance)?;
        self.write(path.as_ref(), &bytes, atomic).await
    }

    /// Builds an instance from `path` under the save root.
    ///
    /// Archives decode, mappings and sequences go through their hooks, and anything else,
    /// including a missing file, yields a defaults-only instance.
    ///
    /// # Errors
    /// Only [`ModelError::InvalidPath`]; unreadable content is never an error.
    pub async fn load<T: Model>(&self, path: impl AsRef<Path>) -> Result<T, ModelError> {
        Ok(self.read_saved::<T>(path.as_ref()).await?.unwrap_or_else(cascade::instance))
    }

    /// Writes the shared instance archive ([`Descriptor::save_file`](crate::Descriptor::save_file)).
    ///
    /// # Errors
    /// See [`ModelStore::save`].
    pub async fn save_shared<T: Model>(&self, instance: &T) -> Result<(), ModelError> {
        self.save(instance, T::save_file(), self.atomic).await
    }

    /// Loads the shared instance: save file, then resource file, then defaults.
    pub async fn load_shared<T: Model>(&self) -> T {
        match self.read_saved::<T>(&T::save_file()).await {
            Ok(Some(instance)) => return instance,
            Ok(None) => {},
            Err(error) => warn!(model = T::NAME, %error, "Save file path rejected"),
        }
        self.bootstrap().await
    }

    /// Writes `instance` to its per-id archive, assigning a generated id first when it has
    /// none. Returns the id used.
    ///
    /// # Errors
    /// Returns [`ModelError::MissingUniqueId`] if the type does not store ids, otherwise as
    /// [`ModelStore::save`].
    pub async fn save_with_id<T: Model>(&self, instance: &mut T) -> Result<String, ModelError> {
        let id = assign_unique_id(instance)?;
        self.save(instance, T::save_file_for_id(&id), self.atomic).await?;
        Ok(id)
    }

    /// Loads the instance stored under `id`: its archive, then the resource file, then
    /// defaults. The result always carries `id`.
    ///
    /// # Errors
    /// Only [`ModelError::InvalidPath`] when `id` does not form a path inside the save root.
    pub async fn load_with_id<T: Model>(&self, id: &str) -> Result<T, ModelError> {
        let mut instance = match self.read_saved::<T>(&T::save_file_for_id(id)).await? {
            Some(instance) => instance,
            None => self.bootstrap().await,
        };
        instance.set_unique_id(id.to_owned());
        Ok(instance)
    }

    pub(crate) async fn write(
        &self,
        path: &Path,
        bytes: &[u8],
        atomic: bool,
    ) -> Result<(), ModelError> {
        let written = if atomic {
            self.saves.write(path, bytes).await
        } else {
            self.saves.write_direct(path, bytes).await
        };
        written.map_err(ModelError::from_storage)
    }

    pub(crate) const fn atomic(&self) -> bool {
        self.atomic
    }

    async fn read_saved<T: Model>(&self, path: &Path) -> Result<Option<T>, ModelError> {
        match self.saves.read(path).await {
            Ok(bytes) => Ok(cascade::try_construct_from_bytes(&bytes, Some(path)).or_else(|| {
                debug!(model = T::NAME, path = %path.display(), "Save file unusable");
                None
            })),
            Err(error) => soft_miss::<T>(path, error).map(|()| None),
        }
    }

    /// Resource file, then defaults.
    async fn bootstrap<T: Model>(&self) -> T {
        let path = T::resource_file();
        let Some(resources) = &self.resources else {
            return cascade::instance();
        };

        match resources.read(&path).await {
            Ok(bytes) => cascade::try_construct_from_bytes(&bytes, Some(&path)).unwrap_or_else(|| {
                debug!(model = T::NAME, path = %path.display(), "Resource file unusable");
                cascade::instance()
            }),
            Err(error) => {
                if let Err(error) = soft_miss::<T>(&path, error) {
                    warn!(model = T::NAME, %error, "Resource path rejected");
                }
                cascade::instance()
            },
        }
    }
}

/// Ensures `instance` carries an id, generating one when needed.
pub(crate) fn assign_unique_id<T: Model>(instance: &mut T) -> Result<String, ModelError> {
    if let Some(id) = instance.unique_id() {
        return Ok(id.to_owned());
    }

    instance.set_unique_id(id::unique_id());
    instance.unique_id().map(str::to_owned).ok_or_else(|| ModelError::MissingUniqueId {
        message: format!("`{}` does not store a unique id", T::NAME).into(),
        context: None,
    })
}

/// Path rejections are errors; every other read failure is a logged miss.
fn soft_miss<T: Model>(path: &Path, error: StorageError) -> Result<(), ModelError> {
    match error {
        StorageError::InvalidPath { .. } => Err(ModelError::from_storage(error)),
        StorageError::FileNotFound { .. } => {
            debug!(model = T::NAME, path = %path.display(), "File absent");
            Ok(())
        },
        other => {
            debug!(model = T::NAME, path = %path.display(), error = %other, "File unreadable");
            Ok(())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{Decoder, Encoder};
    use crate::model::Descriptor;
    use crate::value::{Dictionary, DictionaryExt};
    use tempfile::TempDir;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Note {
        id: Option<String>,
        text: String,
    }

    impl Descriptor for Note {
        const NAME: &'static str = "note";
    }

    impl Model for Note {
        fn set_with_dictionary(&mut self, dict: &Dictionary) {
            self.text = dict.value_of("text").unwrap_or_default();
        }

        fn set_with_decoder(&mut self, decoder: &Decoder) {
            self.text = decoder.decode("text").unwrap_or_default();
        }

        fn encode_with_encoder(&self, encoder: &mut Encoder) -> Result<(), ModelError> {
            encoder.encode("text", &self.text)
        }

        fn unique_id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_unique_id(&mut self, id: String) {
            self.id = Some(id);
        }
    }

    #[derive(Debug, Default)]
    struct Anonymous;

    impl Descriptor for Anonymous {
        const NAME: &'static str = "anonymous";
    }

    impl Model for Anonymous {}

    async fn store() -> (TempDir, ModelStore) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("resources")).unwrap();
        std::fs::write(dir.path().join("resources/note.json"), r#"{"text": "bootstrap"}"#)
            .unwrap();

        let config = StorageConfig {
            resource_dir: dir.path().join("resources"),
            save_dir: dir.path().join("saves"),
            ..StorageConfig::default()
        };
        let store = ModelStore::from_config(&config).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn shared_load_prefers_save_over_resource() {
        let (_dir, store) = store().await;
        assert_eq!(store.load_shared::<Note>().await.text, "bootstrap");

        let note = Note { text: "saved".into(), ..Note::default() };
        store.save_shared(&note).await.unwrap();
        assert_eq!(store.load_shared::<Note>().await.text, "saved");
    }

    #[tokio::test]
    async fn save_with_id_assigns_and_reuses_ids() {
        let (_dir, store) = store().await;
        let mut note = Note { text: "first".into(), ..Note::default() };

        let id = store.save_with_id(&mut note).await.unwrap();
        assert_eq!(note.id.as_deref(), Some(id.as_str()));
        assert!(store.saves().exists(Note::save_file_for_id(&id)).unwrap());

        note.text = "second".into();
        assert_eq!(store.save_with_id(&mut note).await.unwrap(), id);

        let loaded: Note = store.load_with_id(&id).await.unwrap();
        assert_eq!(loaded, note);
    }

    #[tokio::test]
    async fn unknown_id_bootstraps_and_keeps_the_id() {
        let (_dir, store) = store().await;
        let loaded: Note = store.load_with_id("fresh").await.unwrap();
        assert_eq!(loaded.text, "bootstrap");
        assert_eq!(loaded.id.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn type_without_id_support_is_rejected() {
        let (_dir, store) = store().await;
        let err = store.save_with_id(&mut Anonymous).await.unwrap_err();
        assert!(matches!(err, ModelError::MissingUniqueId { .. }));
    }

    #[tokio::test]
    async fn escaping_paths_are_rejected() {
        let (_dir, store) = store().await;

        let err = store.save(&Note::default(), "../outside.archive", true).await.unwrap_err();
        assert!(matches!(err, ModelError::InvalidPath { .. }));

        let err = store.load::<Note>("/etc/passwd").await.unwrap_err();
        assert!(matches!(err, ModelError::InvalidPath { .. }));

        let err = store.load_with_id::<Note>("../../escape").await.unwrap_err();
        assert!(matches!(err, ModelError::InvalidPath { .. }));
    }

    #[tokio::test]
    async fn missing_resource_root_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            resource_dir: dir.path().join("absent"),
            save_dir: dir.path().join("saves"),
            ..StorageConfig::default()
        };
        let store = ModelStore::from_config(&config).await.unwrap();

        assert!(store.resources().is_none());
        assert_eq!(store.load_shared::<Note>().await, Note::default());
    }

    #[tokio::test]
    async fn direct_writes_are_readable() {
        let (_dir, store) = store().await;
        let note = Note { text: "direct".into(), ..Note::default() };

        store.save(&note, "manual/note.archive", false).await.unwrap();
        let loaded: Note = store.load("manual/note.archive").await.unwrap();
        assert_eq!(loaded.text, "direct");
    }
}
