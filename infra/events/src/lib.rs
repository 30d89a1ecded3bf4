//! # Events
//!
//! A notification center for one event type.
//!
//! Two kinds of listeners can attach to a [`NotificationCenter`]:
//!
//! * **Observers**: callbacks invoked synchronously, on the posting thread, before
//!   [`NotificationCenter::post`] returns. An observer stays registered for as long as its
//!   [`Subscription`] guard is alive.
//! * **Subscribers**: `tokio::sync::broadcast` receivers for async consumers.
//!
//! Posting never holds an internal lock while observers run, so an observer may post again
//! or register further observers.
//!
//! # Example
//!
//! ```rust
//! use basis_events::NotificationCenter;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Saved(&'static str);
//!
//! let center = NotificationCenter::<Saved>::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//!
//! let counter = Arc::clone(&seen);
//! let _guard = center.observe(move |_: &Saved| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! let delivery = center.post(Saved("settings"));
//! assert_eq!(delivery.observers, 1);
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

mod center;
mod error;
mod receiver;

pub use center::{Delivery, Event, NotificationCenter, Subscription};
pub use error::{NotificationError, NotificationErrorExt};
pub use receiver::NotificationReceiverExt;
