use crate::center::Event;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Lag-tolerant receive for broadcast subscribers.
///
/// A slow subscriber that falls behind skips to the oldest retained event instead of failing.
pub trait NotificationReceiverExt<T> {
    /// Receive the next event, returning `None` when the center is gone.
    fn next_event(&mut self) -> impl Future<Output = Option<Arc<T>>> + Send;
}

impl<T: Event> NotificationReceiverExt<T> for broadcast::Receiver<Arc<T>> {
    async fn next_event(&mut self) -> Option<Arc<T>> {
        let mut skipped = 0u64;

        loop {
            match self.recv().await {
                Ok(event) => {
                    if skipped > 0 {
                        warn!(
                            event = std::any::type_name::<T>(),
                            skipped, "Subscriber lagged; continuing from the oldest retained event"
                        );
                    }
                    return Some(event);
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    skipped = skipped.saturating_add(n);
                    debug!(event = std::any::type_name::<T>(), skipped = n, "Subscriber lagged");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
