//! Algorithm change notifications.

use std::sync::Mutex;

use strum::{Display, EnumString};
use tokio::sync::broadcast;

use aiverify_core::StoreError;

use crate::store::{BoxFuture, StoreResult};

/// Pub/sub channel of an algorithm notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum AlgoEvent {
    #[strum(serialize = "algo.install")]
    Install,
    #[strum(serialize = "algo.update")]
    Update,
    #[strum(serialize = "algo.delete")]
    Delete,
}

/// A published notification: the channel plus the algorithm's registry key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub event: AlgoEvent,
    pub key: String,
}

impl Notification {
    pub fn new(event: AlgoEvent, key: impl Into<String>) -> Self {
        Self {
            event,
            key: key.into(),
        }
    }
}

/// Fire-and-forget notification sink.
pub trait Publisher: Send + Sync {
    fn publish<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, StoreResult<()>>;
}

/// Publisher that broadcasts in-process and keeps a log of every notification.
#[derive(Debug)]
pub struct MemoryPublisher {
    sender: broadcast::Sender<Notification>,
    log: Mutex<Vec<Notification>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            sender,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Every notification published so far, in order.
    pub fn published(&self) -> Vec<Notification> {
        self.log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Notifications of one channel, in order.
    pub fn published_on(&self, event: AlgoEvent) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|n| n.event == event)
            .map(|n| n.key)
            .collect()
    }

    /// Forget the notification log.
    pub fn clear(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.clear();
        }
    }
}

impl Default for MemoryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher for MemoryPublisher {
    fn publish<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.log
                .lock()
                .map_err(|_| StoreError::backend("notification log poisoned"))?
                .push(notification.clone());
            // No subscribers is not an error for fire-and-forget delivery.
            let _ = self.sender.send(notification.clone());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_channel_names() {
        assert_eq!(AlgoEvent::Install.to_string(), "algo.install");
        assert_eq!(AlgoEvent::Update.to_string(), "algo.update");
        assert_eq!(AlgoEvent::from_str("algo.delete").unwrap(), AlgoEvent::Delete);
    }

    #[tokio::test]
    async fn test_memory_publisher_records_and_broadcasts() {
        let publisher = MemoryPublisher::new();
        let mut rx = publisher.subscribe();

        let n = Notification::new(AlgoEvent::Install, "algo:p:shap");
        publisher.publish(&n).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), n);
        assert_eq!(publisher.published_on(AlgoEvent::Install), vec!["algo:p:shap"]);
        assert!(publisher.published_on(AlgoEvent::Delete).is_empty());

        publisher.clear();
        assert!(publisher.published().is_empty());
    }
}
