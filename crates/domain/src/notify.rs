use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::DomainResult;
use crate::contact::{Thread, ThreadStatus};
use crate::feed::ChangeEvent;
use crate::identity::ActorIdentity;
use crate::messaging::Message;
use crate::ports::contact::ThreadRepository;
use crate::ports::directory::ProfileDirectory;
use crate::ports::notify::{NotificationSink, UnreadBadge};
use crate::util::format_ms_rfc3339;

/// Hard cap on the body excerpt carried in a notification.
const PREVIEW_MAX_CHARS: usize = 50;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationPayload {
    pub title: String,
    pub preview: String,
    pub thread_id: String,
    pub sent_at: String,
}

pub fn preview_of(body: &str) -> String {
    body.chars().take(PREVIEW_MAX_CHARS).collect()
}

/// Process-scope consumer of the change feed that decides which events
/// become user-facing notifications.
///
/// Suppression rules: self-authored events never notify, and neither does
/// anything in the currently open thread (already visible). The open
/// thread is explicit state on the router so the logic stays testable
/// without a UI harness.
pub struct NotificationRouter {
    local_user: ActorIdentity,
    threads: Arc<dyn ThreadRepository>,
    directory: Arc<dyn ProfileDirectory>,
    sink: Arc<dyn NotificationSink>,
    badge: Arc<dyn UnreadBadge>,
    active_thread: RwLock<Option<String>>,
    last_status: RwLock<HashMap<String, ThreadStatus>>,
}

impl NotificationRouter {
    pub fn new(
        local_user: ActorIdentity,
        threads: Arc<dyn ThreadRepository>,
        directory: Arc<dyn ProfileDirectory>,
        sink: Arc<dyn NotificationSink>,
        badge: Arc<dyn UnreadBadge>,
    ) -> Self {
        Self {
            local_user,
            threads,
            directory,
            sink,
            badge,
            active_thread: RwLock::new(None),
            last_status: RwLock::new(HashMap::new()),
        }
    }

    /// The thread the user is currently viewing, if any. Events for it are
    /// already on screen and never notify.
    pub async fn set_active_thread(&self, thread_id: Option<String>) {
        *self.active_thread.write().await = thread_id;
    }

    /// Routes one feed event. Returns the payload that was emitted, or
    /// `None` when the event was suppressed.
    pub async fn handle_event(
        &self,
        event: &ChangeEvent,
    ) -> DomainResult<Option<NotificationPayload>> {
        match event {
            ChangeEvent::MessageInserted(message) => self.handle_message(message).await,
            ChangeEvent::ThreadUpdated(thread) => self.handle_thread_update(thread).await,
            ChangeEvent::ThreadInserted(thread) => {
                self.remember_status(thread).await;
                Ok(None)
            }
        }
    }

    async fn handle_message(&self, message: &Message) -> DomainResult<Option<NotificationPayload>> {
        if message.sender_id == self.local_user.user_id {
            return Ok(None);
        }
        if self.is_active(&message.thread_id).await {
            return Ok(None);
        }

        let Some(thread) = self.threads.get_thread(&message.thread_id).await? else {
            tracing::debug!(thread_id = %message.thread_id, "message event for unknown thread");
            return Ok(None);
        };
        if thread.role_of(&self.local_user.user_id).is_none() {
            return Ok(None);
        }

        let payload = NotificationPayload {
            title: self.resolve_name(&message.sender_id).await,
            preview: preview_of(&message.body),
            thread_id: message.thread_id.clone(),
            sent_at: format_ms_rfc3339(message.created_at_ms),
        };
        self.sink.notify(&payload).await;
        self.refresh_badge().await?;
        Ok(Some(payload))
    }

    /// Status flips toward the seeker (request accepted or declined)
    /// notify too, once per transition; counter-only updates re-publish
    /// the thread with an unchanged status and stay quiet.
    async fn handle_thread_update(
        &self,
        thread: &Thread,
    ) -> DomainResult<Option<NotificationPayload>> {
        let previous = self.remember_status(thread).await;
        if previous == Some(thread.status) {
            return Ok(None);
        }
        if thread.seeker_id != self.local_user.user_id {
            return Ok(None);
        }
        let verdict = match thread.status {
            ThreadStatus::Accepted => "accepted your contact request",
            ThreadStatus::Declined => "declined your contact request",
            _ => return Ok(None),
        };
        if self.is_active(&thread.thread_id).await {
            return Ok(None);
        }

        let peer = thread
            .peer_of(&self.local_user.user_id)
            .unwrap_or(&thread.host_id)
            .to_string();
        let payload = NotificationPayload {
            title: self.resolve_name(&peer).await,
            preview: verdict.to_string(),
            thread_id: thread.thread_id.clone(),
            sent_at: format_ms_rfc3339(crate::util::now_ms()),
        };
        self.sink.notify(&payload).await;
        Ok(Some(payload))
    }

    async fn is_active(&self, thread_id: &str) -> bool {
        self.active_thread.read().await.as_deref() == Some(thread_id)
    }

    async fn remember_status(&self, thread: &Thread) -> Option<ThreadStatus> {
        self.last_status
            .write()
            .await
            .insert(thread.thread_id.clone(), thread.status)
    }

    async fn resolve_name(&self, profile_id: &str) -> String {
        match self.directory.display_name(profile_id).await {
            Ok(Some(name)) => name,
            Ok(None) => profile_id.to_string(),
            Err(err) => {
                tracing::warn!(profile_id, error = %err, "display name lookup failed");
                profile_id.to_string()
            }
        }
    }

    async fn refresh_badge(&self) -> DomainResult<()> {
        let threads = self
            .threads
            .list_threads_for_user(&self.local_user.user_id)
            .await?;
        let total: u64 = threads
            .iter()
            .filter_map(|thread| {
                thread
                    .role_of(&self.local_user.user_id)
                    .map(|role| u64::from(thread.unread_for(role)))
            })
            .sum();
        self.badge.refresh(&self.local_user.user_id, total).await;
        Ok(())
    }
}
