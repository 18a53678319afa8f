//! Change subscriptions.
//!
//! Writers publish a [`ChangeEvent`] after every successful mutation and any
//! number of listeners receive it. Delivery is at-most-once per listener: a
//! listener that falls behind the channel capacity skips the missed events and
//! carries on.

use std::fmt;
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Default number of events buffered per listener
pub const DEFAULT_CAPACITY: usize = 256;

/// Collections that emit change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Partners,
    WasteRequests,
    Vouchers,
    RewardTransactions,
    Notifications,
    AuditLogs,
    RewardRules,
    RewardCampaigns,
    PickupSchedules,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Partners => "partners",
            Self::WasteRequests => "wasteRequests",
            Self::Vouchers => "vouchers",
            Self::RewardTransactions => "rewardTransactions",
            Self::Notifications => "notifications",
            Self::AuditLogs => "auditLogs",
            Self::RewardRules => "rewardRules",
            Self::RewardCampaigns => "rewardCampaigns",
            Self::PickupSchedules => "pickupSchedules",
        };
        f.write_str(name)
    }
}

/// What happened to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
}

/// A single mutation notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub id: i64,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    #[must_use]
    pub const fn created(collection: Collection, id: i64) -> Self {
        Self {
            collection,
            id,
            kind: ChangeKind::Created,
        }
    }

    #[must_use]
    pub const fn updated(collection: Collection, id: i64) -> Self {
        Self {
            collection,
            id,
            kind: ChangeKind::Updated,
        }
    }
}

/// Fan-out hub for change events. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed {
    /// Creates a feed buffering up to `capacity` events per listener.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event, returning how many listeners will see it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        trace!("Publishing {:?}", event);
        // No listeners is not an error
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribes to every collection.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            filter: None,
        }
    }

    /// Subscribes to one collection only.
    #[must_use]
    pub fn subscribe_to(&self, collection: Collection) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            filter: Some(collection),
        }
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiving end of a [`ChangeFeed`].
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    filter: Option<Collection>,
}

impl Subscription {
    /// Waits for the next matching event. Returns `None` once the feed is dropped.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.is_none_or(|c| c == event.collection) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Change listener lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_listeners() {
        let feed = ChangeFeed::default();
        let mut first = feed.subscribe();
        let mut second = feed.subscribe();

        let delivered = feed.publish(ChangeEvent::created(Collection::Partners, 1));
        assert_eq!(delivered, 2);

        assert_eq!(
            first.recv().await,
            Some(ChangeEvent::created(Collection::Partners, 1))
        );
        assert_eq!(
            second.recv().await,
            Some(ChangeEvent::created(Collection::Partners, 1))
        );
    }

    #[tokio::test]
    async fn test_filtered_subscription_skips_other_collections() {
        let feed = ChangeFeed::default();
        let mut vouchers = feed.subscribe_to(Collection::Vouchers);

        feed.publish(ChangeEvent::updated(Collection::Partners, 1));
        feed.publish(ChangeEvent::updated(Collection::Vouchers, 9));

        assert_eq!(
            vouchers.recv().await,
            Some(ChangeEvent::updated(Collection::Vouchers, 9))
        );
    }

    #[tokio::test]
    async fn test_publish_without_listeners() {
        let feed = ChangeFeed::default();
        assert_eq!(feed.publish(ChangeEvent::created(Collection::AuditLogs, 1)), 0);
        assert_eq!(feed.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_lagged_listener_keeps_receiving() {
        let feed = ChangeFeed::new(2);
        let mut listener = feed.subscribe();

        for id in 0..5 {
            feed.publish(ChangeEvent::created(Collection::WasteRequests, id));
        }

        // The two newest events survive
        assert_eq!(listener.recv().await.map(|e| e.id), Some(3));
        assert_eq!(listener.recv().await.map(|e| e.id), Some(4));
    }

    #[tokio::test]
    async fn test_closed_feed_ends_subscription() {
        let feed = ChangeFeed::default();
        let mut listener = feed.subscribe();
        drop(feed);
        assert_eq!(listener.recv().await, None);
    }
}
