//! Per-type shared instance registry with change notifications.

use crate::archive;
use crate::config::StorageConfig;
use crate::error::ModelError;
use crate::model::Model;
use crate::shared::Shared;
use crate::store::{self, ModelStore};
use basis_events::{NotificationCenter, Subscription};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, trace};

/// What happened to a shared instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Replaced through [`Registry::set`].
    Set,
    /// Rebuilt from storage through [`Registry::reload`].
    Reloaded,
}

/// Posted after a type's shared instance was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedInstanceUpdated {
    pub type_id: TypeId,
    /// [`Descriptor::NAME`](crate::Descriptor::NAME) of the type.
    pub type_name: &'static str,
    pub change: Change,
}

impl SharedInstanceUpdated {
    fn of<T: Model>(change: Change) -> Self {
        Self { type_id: TypeId::of::<T>(), type_name: T::NAME, change }
    }

    /// Whether the notification concerns `T`.
    #[must_use]
    pub fn is<T: Model>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

/// One type's slot. `gate` serialises construction; `value` is the occupant.
struct Slot<T> {
    value: RwLock<Option<Shared<T>>>,
    gate: Mutex<()>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self { value: RwLock::new(None), gate: Mutex::new(()) }
    }
}

impl<T> Slot<T> {
    fn current(&self) -> Option<Shared<T>> {
        self.value.read().clone()
    }
}

type ErasedSlot = Arc<dyn Any + Send + Sync>;

struct RegistryInner {
    store: ModelStore,
    slots: RwLock<FxHashMap<TypeId, ErasedSlot>>,
    notifications: NotificationCenter<SharedInstanceUpdated>,
}

impl fmt::Debug for RegistryInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryInner")
            .field("store", &self.store)
            .field("slots", &self.slots.read().len())
            .field("notifications", &self.notifications)
            .finish()
    }
}

/// Holds at most one shared instance per model type.
///
/// A type's slot starts empty. [`Registry::get`] fills it lazily from storage (save file,
/// then resource file, then defaults) and returns the same handle until the slot is
/// replaced with [`Registry::set`], rebuilt with [`Registry::reload`] or emptied with
/// [`Registry::clear`]. Handles taken earlier stay valid but detached.
///
/// `set` and `reload` post one [`SharedInstanceUpdated`] each, after the slot is updated and
/// no lock is held.
///
/// ```rust
/// use basis_model::{Model, Registry, StorageConfig, descriptor, hooks};
///
/// #[descriptor(name = "session")]
/// #[derive(Debug, Default)]
/// struct Session {
///     visits: u32,
/// }
///
/// #[hooks]
/// impl Model for Session {}
///
/// #[tokio::main]
/// async fn main() -> Result<(), basis_model::ModelError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     let config = StorageConfig {
///         save_dir: tmp.path().join("saves"),
///         resource_dir: tmp.path().join("resources"),
///         ..StorageConfig::default()
///     };
///     let registry = Registry::from_config(&config).await?;
///
///     let session = registry.get::<Session>().await;
///     session.write().visits += 1;
///
///     assert!(registry.get::<Session>().await.ptr_eq(&session));
///     registry.save(&session).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    #[must_use]
    pub fn new(store: ModelStore) -> Self {
        Self::from_parts(store, NotificationCenter::new())
    }

    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Opens a [`ModelStore`] from `config` and wraps it in a registry.
    ///
    /// # Errors
    /// Returns [`ModelError::Storage`] if the save root cannot be opened.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, ModelError> {
        Ok(Self::new(ModelStore::from_config(config).await?))
    }

    fn from_parts(
        store: ModelStore,
        notifications: NotificationCenter<SharedInstanceUpdated>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                store,
                slots: RwLock::new(FxHashMap::default()),
                notifications,
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &ModelStore {
        &self.inner.store
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationCenter<SharedInstanceUpdated> {
        &self.inner.notifications
    }

    /// Returns the shared instance of `T`, loading it on first use.
    ///
    /// Concurrent first calls load once. If [`Registry::set`] fills the slot while a load is
    /// in flight, the set instance wins and the loaded one is dropped.
    pub async fn get<T: Model>(&self) -> Shared<T> {
        let slot = self.slot::<T>();
        if let Some(current) = slot.current() {
            return current;
        }

        let _gate = slot.gate.lock().await;
        if let Some(current) = slot.current() {
            return current;
        }

        let loaded = Shared::new(self.inner.store.load_shared::<T>().await);
        let current = slot.value.write().get_or_insert(loaded).clone();
        debug!(model = T::NAME, "Shared instance created");
        current
    }

    /// Whether `T` currently has a shared instance. Never constructs one.
    #[must_use]
    pub fn has<T: Model>(&self) -> bool {
        self.existing_slot::<T>().is_some_and(|slot| slot.value.read().is_some())
    }

    /// Makes `instance` the shared instance of `T` and posts [`Change::Set`].
    pub fn set<T: Model>(&self, instance: impl Into<Shared<T>>) -> Shared<T> {
        let instance = instance.into();
        *self.slot::<T>().value.write() = Some(instance.clone());
        self.notify::<T>(Change::Set);
        instance
    }

    /// Discards the shared instance of `T`, loads a fresh one and posts [`Change::Reloaded`].
    pub async fn reload<T: Model>(&self) -> Shared<T> {
        let slot = self.slot::<T>();
        let fresh = {
            let _gate = slot.gate.lock().await;
            slot.value.write().take();

            let fresh = Shared::new(self.inner.store.load_shared::<T>().await);
            *slot.value.write() = Some(fresh.clone());
            fresh
        };

        info!(model = T::NAME, "Shared instance reloaded");
        self.notify::<T>(Change::Reloaded);
        fresh
    }

    /// Persists `instance`.
    ///
    /// The current shared instance goes to the type save file. Any other handle goes to its
    /// per-id file, receiving a generated id first when it has none.
    ///
    /// # Errors
    /// Returns [`ModelError::MissingUniqueId`] for a detached instance of a type without id
    /// support, and any encoding or storage failure.
    pub async fn save<T: Model>(&self, instance: &Shared<T>) -> Result<(), ModelError> {
        let is_shared = self
            .existing_slot::<T>()
            .and_then(|slot| slot.current())
            .is_some_and(|current| current.ptr_eq(instance));

        let (path, bytes) = if is_shared {
            (T::save_file(), archive::encode_model(&*instance.read())?)
        } else {
            let mut guard = instance.write();
            let id = store::assign_unique_id(&mut *guard)?;
            (T::save_file_for_id(&id), archive::encode_model(&*guard)?)
        };

        let store = &self.inner.store;
        store.write(&path, &bytes, store.atomic()).await
    }

    /// Empties the slot of `T` without posting a notification. Returns the former occupant.
    pub fn clear<T: Model>(&self) -> Option<Shared<T>> {
        self.existing_slot::<T>().and_then(|slot| slot.value.write().take())
    }

    /// Registers a synchronous observer for every [`SharedInstanceUpdated`].
    #[must_use = "Dropping the subscription immediately unregisters the observer"]
    pub fn observe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&SharedInstanceUpdated) + Send + Sync + 'static,
    {
        self.inner.notifications.observe(observer)
    }

    /// Opens a broadcast receiver for async consumers.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SharedInstanceUpdated>> {
        self.inner.notifications.subscribe()
    }

    fn notify<T: Model>(&self, change: Change) {
        let delivery = self.inner.notifications.post(SharedInstanceUpdated::of::<T>(change));
        trace!(
            model = T::NAME,
            ?change,
            observers = delivery.observers,
            subscribers = delivery.subscribers,
            "Shared instance update posted"
        );
    }

    fn existing_slot<T: Model>(&self) -> Option<Arc<Slot<T>>> {
        let slots = self.inner.slots.read();
        slots.get(&TypeId::of::<T>()).and_then(|slot| Arc::clone(slot).downcast().ok())
    }

    fn slot<T: Model>(&self) -> Arc<Slot<T>> {
        if let Some(slot) = self.existing_slot::<T>() {
            return slot;
        }

        let mut slots = self.inner.slots.write();
        let entry = slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(Slot::<T>::default()) as ErasedSlot);

        if let Ok(slot) = Arc::clone(entry).downcast::<Slot<T>>() {
            return slot;
        }
        let slot = Arc::new(Slot::<T>::default());
        *entry = Arc::clone(&slot) as ErasedSlot;
        slot
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    store: Option<ModelStore>,
    capacity: Option<usize>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn store(mut self, store: ModelStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Buffer size of the broadcast channel behind [`Registry::subscribe`].
    #[must_use]
    pub const fn notification_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// # Errors
    /// Returns [`ModelError::Validation`] without a store and [`ModelError::Notification`]
    /// for a zero capacity.
    pub fn build(self) -> Result<Registry, ModelError> {
        let store = self.store.ok_or_else(|| ModelError::Validation {
            message: "ModelStore not provided".into(),
            context: None,
        })?;
        let notifications = match self.capacity {
            Some(capacity) => NotificationCenter::with_capacity(capacity)?,
            None => NotificationCenter::new(),
        };

        Ok(Registry::from_parts(store, notifications))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Descriptor;
    use basis_storage::Storage;

    #[derive(Debug, Default)]
    struct Counter {
        hits: u32,
    }

    impl Descriptor for Counter {
        const NAME: &'static str = "counter";
    }

    impl Model for Counter {}

    async fn registry() -> (tempfile::TempDir, Registry) {
        let dir = tempfile::tempdir().unwrap();
        let saves = Storage::builder().root(dir.path()).connect().await.unwrap();
        (dir, Registry::new(ModelStore::new(saves, None)))
    }

    #[tokio::test]
    async fn has_does_not_create_a_slot() {
        let (_dir, registry) = registry().await;
        assert!(!registry.has::<Counter>());
        assert!(registry.inner.slots.read().is_empty());
    }

    #[tokio::test]
    async fn clear_returns_the_occupant_without_notifying() {
        let (_dir, registry) = registry().await;
        let mut events = registry.subscribe();

        let counter = registry.get::<Counter>().await;
        let cleared = registry.clear::<Counter>().unwrap();

        assert!(cleared.ptr_eq(&counter));
        assert!(!registry.has::<Counter>());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn builder_requires_a_store() {
        assert!(matches!(Registry::builder().build(), Err(ModelError::Validation { .. })));

        let (_dir, registry) = registry().await;
        let err = Registry::builder()
            .store(registry.store().clone())
            .notification_capacity(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::Notification { .. }));
    }

    #[test]
    fn notification_names_the_type() {
        let event = SharedInstanceUpdated::of::<Counter>(Change::Set);
        assert!(event.is::<Counter>());
        assert_eq!(event.type_name, "counter");
    }
}
