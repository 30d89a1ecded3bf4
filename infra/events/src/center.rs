use crate::error::NotificationError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 64;
const MIN_CAPACITY: usize = 1;

/// Marker trait for types that can be posted through a [`NotificationCenter`].
///
/// Any type that is `Send + Sync + 'static` automatically implements this trait.
pub trait Event: Any + Send + Sync + 'static {}
impl<T: Any + Send + Sync + 'static> Event for T {}

type Observer<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Inner<E> {
    observers: RwLock<FxHashMap<u64, Observer<E>>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<Arc<E>>,
}

/// How many listeners a single [`NotificationCenter::post`] reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Observers invoked synchronously.
    pub observers: usize,
    /// Broadcast receivers the event was queued for.
    pub subscribers: usize,
}

/// A cheaply cloneable hub that fans one event type out to observers and subscribers.
pub struct NotificationCenter<E: Event> {
    inner: Arc<Inner<E>>,
}

impl<E: Event> Clone for NotificationCenter<E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<E: Event> fmt::Debug for NotificationCenter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("event", &std::any::type_name::<E>())
            .field("observers", &self.observer_count())
            .field("subscribers", &self.inner.sender.receiver_count())
            .finish()
    }
}

impl<E: Event> Default for NotificationCenter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> NotificationCenter<E> {
    /// Creates a center whose broadcast channel buffers the default number of events.
    #[must_use]
    pub fn new() -> Self {
        Self::build(DEFAULT_CAPACITY)
    }

    /// Creates a center with a specific broadcast buffer capacity.
    ///
    /// # Errors
    /// Returns [`NotificationError::InvalidCapacity`] if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self, NotificationError> {
        if capacity < MIN_CAPACITY {
            return Err(NotificationError::InvalidCapacity {
                message: format!("capacity must be >= {MIN_CAPACITY}").into(),
                context: Some(std::any::type_name::<E>().into()),
            });
        }
        Ok(Self::build(capacity))
    }

    fn build(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(Inner {
                observers: RwLock::new(FxHashMap::default()),
                next_id: AtomicU64::new(1),
                sender,
            }),
        }
    }

    /// Registers a synchronous observer.
    ///
    /// The observer is removed when the returned [`Subscription`] is dropped.
    #[must_use = "Dropping the subscription immediately unregisters the observer"]
    pub fn observe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.observers.write().insert(id, Arc::new(observer));
        trace!(event = std::any::type_name::<E>(), id, "Observer registered");

        let weak: Weak<Inner<E>> = Arc::downgrade(&self.inner);
        Subscription { id, cancel: Some(Box::new(move || Inner::remove(&weak, id))) }
    }

    /// Opens a broadcast receiver for async consumption.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<E>> {
        self.inner.sender.subscribe()
    }

    /// Delivers `event` to every observer, then queues it for every subscriber.
    ///
    /// Observers run on the calling thread before this method returns; their order is
    /// unspecified.
    pub fn post(&self, event: E) -> Delivery {
        let event = Arc::new(event);
        let observers: Vec<Observer<E>> = self.inner.observers.read().values().cloned().collect();

        for observer in &observers {
            observer(&event);
        }

        let subscribers = self.inner.sender.send(event).unwrap_or(0);
        trace!(
            event = std::any::type_name::<E>(),
            observers = observers.len(),
            subscribers,
            "Notification posted"
        );

        Delivery { observers: observers.len(), subscribers }
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.observers.read().len()
    }
}

impl<E: Event> Inner<E> {
    fn remove(weak: &Weak<Self>, id: u64) {
        if let Some(inner) = weak.upgrade() {
            inner.observers.write().remove(&id);
            trace!(event = std::any::type_name::<E>(), id, "Observer removed");
        }
    }
}

/// Keeps an observer registered; dropping it unregisters the observer.
#[must_use = "Dropping the subscription immediately unregisters the observer"]
pub struct Subscription {
    id: u64,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Keeps the observer registered for the lifetime of its center.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn zero_capacity_is_rejected() {
        let err = NotificationCenter::<u8>::with_capacity(0).unwrap_err();
        assert!(matches!(err, NotificationError::InvalidCapacity { .. }));
    }

    #[test]
    fn dropping_subscription_unregisters_observer() {
        let center = NotificationCenter::<u32>::new();
        let guard = center.observe(|_| {});
        assert_eq!(center.observer_count(), 1);

        drop(guard);
        assert_eq!(center.observer_count(), 0);
        assert_eq!(center.post(1).observers, 0);
    }

    #[test]
    fn detached_observer_survives_guard() {
        let center = NotificationCenter::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        center.observe(move |value| sink.lock().push(*value)).detach();

        center.post(5);
        assert_eq!(*seen.lock(), vec![5]);
    }

    #[test]
    fn observer_may_register_another_observer_while_posting() {
        let center = NotificationCenter::<u32>::new();
        let nested = Arc::new(Mutex::new(Vec::new()));

        let inner_center = center.clone();
        let holder = Arc::clone(&nested);
        let _guard = center.observe(move |_| {
            holder.lock().push(inner_center.observe(|_| {}));
        });

        assert_eq!(center.post(1).observers, 1);
        assert_eq!(center.observer_count(), 2);
    }

    #[test]
    fn subscription_outliving_center_is_harmless() {
        let center = NotificationCenter::<u32>::new();
        let guard = center.observe(|_| {});
        drop(center);
        drop(guard);
    }
}
