use tokio::sync::broadcast;

use crate::feed::ChangeEvent;

/// Which slice of the row-level change stream a consumer wants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedFilter {
    /// Events scoped to a single thread (open-thread mirror).
    Thread(String),
    /// Every event in the process (notification routing).
    All,
}

/// Signal delivered by a live subscription. `Lagged` means the transport
/// dropped events and gives no gap-filling guarantee; the consumer must
/// re-fetch from the store and reconcile by id.
#[derive(Clone, Debug)]
pub enum FeedSignal {
    Event(ChangeEvent),
    Lagged,
    Closed,
}

/// Handle for one live subscription. Dropping it unsubscribes.
pub struct FeedSubscription {
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl FeedSubscription {
    pub fn new(receiver: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { receiver }
    }

    pub async fn next(&mut self) -> FeedSignal {
        match self.receiver.recv().await {
            Ok(event) => FeedSignal::Event(event),
            Err(broadcast::error::RecvError::Lagged(_)) => FeedSignal::Lagged,
            Err(broadcast::error::RecvError::Closed) => FeedSignal::Closed,
        }
    }
}

/// Write side of the change feed. Services publish after every durable
/// mutation; delivery is fire-and-forget.
pub trait ChangeFeedPublisher: Send + Sync {
    fn publish(&self, event: &ChangeEvent) -> crate::ports::BoxFuture<'_, ()>;
}

/// Read side of the change feed.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, filter: &FeedFilter) -> crate::ports::BoxFuture<'_, FeedSubscription>;
}
