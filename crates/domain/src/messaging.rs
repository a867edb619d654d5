use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::contact::ThreadStatus;
use crate::error::DomainError;
use crate::feed::ChangeEvent;
use crate::identity::ActorIdentity;
use crate::ports::contact::ThreadRepository;
use crate::ports::feed::ChangeFeedPublisher;
use crate::ports::messaging::MessageRepository;
use crate::util::now_ms;

const MAX_BODY_LENGTH: usize = 2_000;
const MAX_EMOJI_LENGTH: usize = 64;
pub const MAX_MESSAGES_PER_REQUEST: usize = 200;

/// One entry in a thread's append-only message log. Ordered by
/// `(created_at_ms, message_id)`; ids are v7 so ties break consistently.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub message_id: String,
    pub thread_id: String,
    pub sender_id: String,
    pub body: String,
    pub created_at_ms: i64,
    pub delivered_at_ms: Option<i64>,
    pub read_at_ms: Option<i64>,
}

/// Per-message annotation, unique on `(message_id, user_id, emoji)`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct SendMessageInput {
    pub thread_id: String,
    pub body: String,
    pub occurred_at_ms: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct MessageCatchup {
    pub since_created_at_ms: Option<i64>,
    pub since_message_id: Option<String>,
    pub limit: usize,
}

pub fn build_message_catchup(
    limit: Option<usize>,
    since_created_at_ms: Option<i64>,
    since_message_id: Option<String>,
) -> MessageCatchup {
    let safe_limit = limit.unwrap_or(50).clamp(1, MAX_MESSAGES_PER_REQUEST);
    MessageCatchup {
        since_created_at_ms,
        since_message_id,
        limit: safe_limit,
    }
}

#[derive(Clone)]
pub struct MessagingService {
    threads: Arc<dyn ThreadRepository>,
    messages: Arc<dyn MessageRepository>,
    feed: Arc<dyn ChangeFeedPublisher>,
}

impl MessagingService {
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        messages: Arc<dyn MessageRepository>,
        feed: Arc<dyn ChangeFeedPublisher>,
    ) -> Self {
        Self {
            threads,
            messages,
            feed,
        }
    }

    /// Appends a message and bumps the recipient's unread counter. Not
    /// idempotent: callers disable the send control until the prior call
    /// resolves rather than retrying blindly.
    pub async fn send_message(
        &self,
        actor: &ActorIdentity,
        input: SendMessageInput,
    ) -> DomainResult<Message> {
        let thread = self
            .threads
            .get_thread(&input.thread_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let role = thread
            .role_of(&actor.user_id)
            .ok_or(DomainError::NotAuthorized)?;
        if thread.status == ThreadStatus::Blocked {
            return Err(DomainError::Blocked);
        }

        let body = validate_body(&input.body)?;
        let message = Message {
            message_id: crate::util::uuid_v7_without_dashes(),
            thread_id: thread.thread_id.clone(),
            sender_id: actor.user_id.clone(),
            body,
            created_at_ms: input.occurred_at_ms.unwrap_or_else(now_ms),
            delivered_at_ms: None,
            read_at_ms: None,
        };

        let message = self.messages.create_message(&message).await?;
        self.threads
            .increment_unread(&thread.thread_id, role.other())
            .await?;
        self.feed
            .publish(&ChangeEvent::MessageInserted(message.clone()))
            .await;
        Ok(message)
    }

    pub async fn list_messages(
        &self,
        actor: &ActorIdentity,
        thread_id: &str,
        cursor: MessageCatchup,
    ) -> DomainResult<Vec<Message>> {
        self.assert_party(thread_id, actor).await?;
        self.messages.list_messages(thread_id, &cursor).await
    }

    /// Resets the viewer's unread counter and stamps read receipts on the
    /// peer's unread messages. Publishes the updated thread so other tabs
    /// refresh their badges.
    pub async fn mark_thread_read(
        &self,
        actor: &ActorIdentity,
        thread_id: &str,
    ) -> DomainResult<crate::contact::Thread> {
        let thread = self
            .threads
            .get_thread(thread_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        let role = thread
            .role_of(&actor.user_id)
            .ok_or(DomainError::NotAuthorized)?;

        let stamped = self
            .messages
            .mark_messages_read(thread_id, &actor.user_id, now_ms())
            .await?;
        tracing::debug!(thread_id, stamped, "read receipts stamped");

        let thread = self.threads.reset_unread(thread_id, role).await?;
        self.feed
            .publish(&ChangeEvent::ThreadUpdated(thread.clone()))
            .await;
        Ok(thread)
    }

    /// Idempotent on the `(message_id, user_id, emoji)` triple: adding an
    /// existing reaction returns it unchanged.
    pub async fn add_reaction(
        &self,
        actor: &ActorIdentity,
        thread_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> DomainResult<Reaction> {
        self.assert_party(thread_id, actor).await?;
        let emoji = validate_emoji(emoji)?;
        self.messages
            .get_message(thread_id, message_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        let reaction = Reaction {
            message_id: message_id.to_string(),
            user_id: actor.user_id.clone(),
            emoji,
            created_at_ms: now_ms(),
        };
        match self.messages.create_reaction(&reaction).await {
            Ok(reaction) => Ok(reaction),
            Err(DomainError::Conflict) => Ok(reaction),
            Err(err) => Err(err),
        }
    }

    /// Removing an absent reaction is a no-op.
    pub async fn remove_reaction(
        &self,
        actor: &ActorIdentity,
        thread_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> DomainResult<()> {
        self.assert_party(thread_id, actor).await?;
        self.messages
            .delete_reaction(message_id, &actor.user_id, emoji.trim())
            .await
    }

    pub async fn list_reactions(
        &self,
        actor: &ActorIdentity,
        thread_id: &str,
        message_id: &str,
    ) -> DomainResult<Vec<Reaction>> {
        self.assert_party(thread_id, actor).await?;
        self.messages.list_reactions(message_id).await
    }

    async fn assert_party(&self, thread_id: &str, actor: &ActorIdentity) -> DomainResult<()> {
        let thread = self
            .threads
            .get_thread(thread_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        thread
            .role_of(&actor.user_id)
            .map(|_| ())
            .ok_or(DomainError::NotAuthorized)
    }
}

fn validate_body(body: &str) -> DomainResult<String> {
    let body = body.trim().to_string();
    if body.is_empty() {
        return Err(DomainError::Validation("body is required".into()));
    }
    if body.chars().count() > MAX_BODY_LENGTH {
        return Err(DomainError::Validation(format!(
            "body exceeds max length of {MAX_BODY_LENGTH}"
        )));
    }
    Ok(body)
}

fn validate_emoji(emoji: &str) -> DomainResult<String> {
    let emoji = emoji.trim().to_string();
    if emoji.is_empty() {
        return Err(DomainError::Validation("emoji is required".into()));
    }
    if emoji.chars().count() > MAX_EMOJI_LENGTH {
        return Err(DomainError::Validation(format!(
            "emoji exceeds max length of {MAX_EMOJI_LENGTH}"
        )));
    }
    Ok(emoji)
}
