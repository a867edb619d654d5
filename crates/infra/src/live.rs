use std::sync::Arc;

use sewa_domain::DomainResult;
use sewa_domain::contact::{ContactService, Thread, ThreadStatus};
use sewa_domain::error::DomainError;
use sewa_domain::feed::{SessionUpdate, ThreadSession};
use sewa_domain::identity::ActorIdentity;
use sewa_domain::messaging::{
    MAX_MESSAGES_PER_REQUEST, Message, MessagingService, SendMessageInput, build_message_catchup,
};
use sewa_domain::notify::NotificationRouter;
use sewa_domain::ports::feed::{ChangeFeed, FeedFilter, FeedSignal, FeedSubscription};

use crate::observability;

/// Consecutive failed re-fetches before the viewer is told the live
/// connection is gone and should fall back to manual refresh.
const MAX_RESYNC_FAILURES: u32 = 3;

/// What an open thread view receives from the live loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiveUpdate {
    Message(Message),
    ConversationOpened,
    StatusChanged(ThreadStatus),
    /// The session was rebuilt from a store re-fetch; re-render the whole
    /// message list instead of patching.
    Resynced,
    ConnectionLost,
}

/// One open thread view: a [`ThreadSession`] mirror plus the feed
/// subscription that keeps it current. Lag and channel loss degrade to a
/// store re-fetch, never to a stale screen.
pub struct ThreadLive {
    actor: ActorIdentity,
    contact: ContactService,
    messaging: MessagingService,
    feed: Arc<dyn ChangeFeed>,
    session: ThreadSession,
    subscription: FeedSubscription,
    resync_failures: u32,
}

impl ThreadLive {
    pub async fn open(
        actor: ActorIdentity,
        contact: ContactService,
        messaging: MessagingService,
        feed: Arc<dyn ChangeFeed>,
        thread_id: &str,
    ) -> DomainResult<Self> {
        let thread = contact.get_thread(thread_id).await?;
        thread
            .role_of(&actor.user_id)
            .ok_or(DomainError::NotAuthorized)?;

        let backlog = messaging
            .list_messages(
                &actor,
                thread_id,
                build_message_catchup(Some(MAX_MESSAGES_PER_REQUEST), None, None),
            )
            .await?;
        let subscription = feed
            .subscribe(&FeedFilter::Thread(thread_id.to_string()))
            .await;

        Ok(Self {
            session: ThreadSession::new(&thread, backlog),
            actor,
            contact,
            messaging,
            feed,
            subscription,
            resync_failures: 0,
        })
    }

    pub fn session(&self) -> &ThreadSession {
        &self.session
    }

    /// Sends and appends optimistically; the feed echo is deduped by the
    /// session, so the message shows up exactly once either way.
    pub async fn send(&mut self, body: &str) -> DomainResult<Message> {
        let message = self
            .messaging
            .send_message(
                &self.actor,
                SendMessageInput {
                    thread_id: self.session.thread_id().to_string(),
                    body: body.to_string(),
                    occurred_at_ms: None,
                },
            )
            .await?;
        self.session.append_local(message.clone());
        Ok(message)
    }

    pub async fn mark_read(&mut self) -> DomainResult<Thread> {
        self.messaging
            .mark_thread_read(&self.actor, self.session.thread_id())
            .await
    }

    /// Blocks until the session surfaces something the view must react to.
    pub async fn next_update(&mut self) -> LiveUpdate {
        loop {
            match self.subscription.next().await {
                FeedSignal::Event(event) => {
                    if let Some(update) = self.session.apply(&event) {
                        return Self::surface(update);
                    }
                }
                FeedSignal::Lagged => {
                    if let Some(update) = self.resync("lagged").await {
                        return update;
                    }
                }
                FeedSignal::Closed => {
                    self.subscription = self
                        .feed
                        .subscribe(&FeedFilter::Thread(self.session.thread_id().to_string()))
                        .await;
                    if let Some(update) = self.resync("closed").await {
                        return update;
                    }
                }
            }
        }
    }

    async fn resync(&mut self, reason: &str) -> Option<LiveUpdate> {
        match self.refetch().await {
            Ok((thread, messages)) => {
                observability::register_session_resync(reason, "ok");
                self.resync_failures = 0;
                match self.session.reconcile(&thread, messages) {
                    Some(SessionUpdate::ConversationOpened) => Some(LiveUpdate::ConversationOpened),
                    _ => Some(LiveUpdate::Resynced),
                }
            }
            Err(err) => {
                observability::register_session_resync(reason, "error");
                self.resync_failures += 1;
                tracing::warn!(
                    thread_id = self.session.thread_id(),
                    reason,
                    failures = self.resync_failures,
                    error = %err,
                    "session re-fetch failed"
                );
                // A definitive domain answer will not improve on retry.
                if !err.is_retryable() || self.resync_failures >= MAX_RESYNC_FAILURES {
                    Some(LiveUpdate::ConnectionLost)
                } else {
                    None
                }
            }
        }
    }

    async fn refetch(&self) -> DomainResult<(Thread, Vec<Message>)> {
        let thread = self.contact.get_thread(self.session.thread_id()).await?;
        let messages = self
            .messaging
            .list_messages(
                &self.actor,
                self.session.thread_id(),
                build_message_catchup(Some(MAX_MESSAGES_PER_REQUEST), None, None),
            )
            .await?;
        Ok((thread, messages))
    }

    fn surface(update: SessionUpdate) -> LiveUpdate {
        match update {
            SessionUpdate::MessageAdded(message) => LiveUpdate::Message(message),
            SessionUpdate::ConversationOpened => LiveUpdate::ConversationOpened,
            SessionUpdate::StatusChanged(status) => LiveUpdate::StatusChanged(status),
        }
    }
}

/// Process-scope loop feeding the whole change feed into the notification
/// router. Intended for `tokio::spawn`; returns when the feed shuts down.
pub async fn pump_notifications(feed: Arc<dyn ChangeFeed>, router: Arc<NotificationRouter>) {
    let mut subscription = feed.subscribe(&FeedFilter::All).await;
    loop {
        match subscription.next().await {
            FeedSignal::Event(event) => match router.handle_event(&event).await {
                Ok(Some(_)) => observability::register_notification("emitted"),
                Ok(None) => observability::register_notification("suppressed"),
                Err(err) => {
                    tracing::warn!(error = %err, "notification routing failed");
                    observability::register_notification("error");
                }
            },
            // A lagged notification consumer just misses toasts; badges
            // self-correct on the next unread refresh.
            FeedSignal::Lagged => continue,
            FeedSignal::Closed => break,
        }
    }
}
