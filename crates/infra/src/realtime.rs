use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};

use sewa_domain::feed::ChangeEvent;
use sewa_domain::ports::BoxFuture;
use sewa_domain::ports::feed::{ChangeFeed, ChangeFeedPublisher, FeedFilter, FeedSubscription};

use crate::config::AppConfig;
use crate::observability;

/// In-process change feed: one broadcast channel per thread for open-view
/// mirrors plus a process-wide channel for notification routing. This is
/// the `local` transport; in production the managed store's own change
/// feed plays this role.
pub struct LocalChangeFeed {
    buffer: usize,
    all: broadcast::Sender<ChangeEvent>,
    per_thread: Arc<RwLock<HashMap<String, broadcast::Sender<ChangeEvent>>>>,
}

impl LocalChangeFeed {
    pub fn new(buffer: usize) -> Self {
        let (all, _) = broadcast::channel(buffer.max(1));
        Self {
            buffer: buffer.max(1),
            all,
            per_thread: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        tracing::debug!(
            channel_prefix = %config.realtime_channel_prefix,
            buffer = config.realtime_buffer,
            "local change feed online"
        );
        Self::new(config.realtime_buffer)
    }

    async fn thread_sender(&self, thread_id: &str) -> broadcast::Sender<ChangeEvent> {
        if let Some(sender) = self.per_thread.read().await.get(thread_id) {
            return sender.clone();
        }
        let mut channels = self.per_thread.write().await;
        channels
            .entry(thread_id.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer).0)
            .clone()
    }

    fn change_kind(event: &ChangeEvent) -> &'static str {
        match event {
            ChangeEvent::ThreadInserted(_) => "thread_inserted",
            ChangeEvent::ThreadUpdated(_) => "thread_updated",
            ChangeEvent::MessageInserted(_) => "message_inserted",
        }
    }
}

impl ChangeFeedPublisher for LocalChangeFeed {
    fn publish(&self, event: &ChangeEvent) -> BoxFuture<'_, ()> {
        let event = event.clone();
        Box::pin(async move {
            observability::register_realtime_event(Self::change_kind(&event));
            let sender = self.thread_sender(event.thread_id()).await;
            // A send error only means nobody is listening right now.
            let _ = sender.send(event.clone());
            let _ = self.all.send(event);
        })
    }
}

impl ChangeFeed for LocalChangeFeed {
    fn subscribe(&self, filter: &FeedFilter) -> BoxFuture<'_, FeedSubscription> {
        let filter = filter.clone();
        Box::pin(async move {
            match filter {
                FeedFilter::All => FeedSubscription::new(self.all.subscribe()),
                FeedFilter::Thread(thread_id) => {
                    FeedSubscription::new(self.thread_sender(&thread_id).await.subscribe())
                }
            }
        })
    }
}
