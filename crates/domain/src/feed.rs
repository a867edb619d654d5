use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::contact::{Thread, ThreadStatus};
use crate::messaging::Message;

/// Row-level change pushed by the backing store. The feed is
/// eventually-consistent and makes no ordering or gap-filling guarantee;
/// consumers reconcile by id against the store when in doubt.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ChangeEvent {
    ThreadInserted(Thread),
    ThreadUpdated(Thread),
    MessageInserted(Message),
}

impl ChangeEvent {
    pub fn thread_id(&self) -> &str {
        match self {
            Self::ThreadInserted(thread) | Self::ThreadUpdated(thread) => &thread.thread_id,
            Self::MessageInserted(message) => &message.thread_id,
        }
    }
}

/// What a session application step surfaced to the UI layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionUpdate {
    MessageAdded(Message),
    /// Fired exactly once, on the pending -> accepted flip.
    ConversationOpened,
    StatusChanged(ThreadStatus),
}

/// Live in-memory mirror of one open thread. A cache, never authoritative:
/// always rebuildable from a store re-fetch via `reconcile`.
///
/// Handles the two consistency hazards of the feed: the echo of the
/// sender's own optimistic append (de-dup by message id, never by
/// timestamp) and out-of-order delivery (insertion keeps
/// `(created_at_ms, message_id)` order instead of trusting feed order).
#[derive(Clone, Debug)]
pub struct ThreadSession {
    thread_id: String,
    status: ThreadStatus,
    messages: Vec<Message>,
    seen: HashSet<String>,
    opened_emitted: bool,
}

impl ThreadSession {
    pub fn new(thread: &Thread, backlog: Vec<Message>) -> Self {
        let mut session = Self {
            thread_id: thread.thread_id.clone(),
            status: thread.status,
            messages: Vec::new(),
            seen: HashSet::new(),
            opened_emitted: thread.status != ThreadStatus::Pending,
        };
        for message in backlog {
            session.insert_message(message);
        }
        session
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn status(&self) -> ThreadStatus {
        self.status
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Optimistic local append after a successful send. Returns false when
    /// the feed echo already delivered the message.
    pub fn append_local(&mut self, message: Message) -> bool {
        self.insert_message(message)
    }

    /// Applies one feed event. Events for other threads are ignored.
    pub fn apply(&mut self, event: &ChangeEvent) -> Option<SessionUpdate> {
        if event.thread_id() != self.thread_id {
            return None;
        }
        match event {
            ChangeEvent::MessageInserted(message) => {
                if self.insert_message(message.clone()) {
                    Some(SessionUpdate::MessageAdded(message.clone()))
                } else {
                    None
                }
            }
            ChangeEvent::ThreadInserted(thread) | ChangeEvent::ThreadUpdated(thread) => {
                self.apply_status(thread.status)
            }
        }
    }

    /// Replaces the cache with an authoritative store snapshot, merging by
    /// id so an in-flight local append is never dropped.
    pub fn reconcile(&mut self, thread: &Thread, full_list: Vec<Message>) -> Option<SessionUpdate> {
        let mut kept: Vec<Message> = self.messages.drain(..).collect();
        self.seen.clear();
        for message in full_list {
            kept.retain(|local| local.message_id != message.message_id);
            self.insert_message(message);
        }
        for local in kept {
            self.insert_message(local);
        }
        self.apply_status(thread.status)
    }

    fn apply_status(&mut self, status: ThreadStatus) -> Option<SessionUpdate> {
        if status == self.status {
            return None;
        }
        self.status = status;
        if status == ThreadStatus::Accepted && !self.opened_emitted {
            self.opened_emitted = true;
            return Some(SessionUpdate::ConversationOpened);
        }
        Some(SessionUpdate::StatusChanged(status))
    }

    fn insert_message(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.message_id.clone()) {
            return false;
        }
        let position = self
            .messages
            .partition_point(|existing| {
                (existing.created_at_ms, existing.message_id.as_str())
                    < (message.created_at_ms, message.message_id.as_str())
            });
        self.messages.insert(position, message);
        true
    }
}
