use std::collections::HashMap;
use std::sync::Arc;

use sewa_domain::DomainResult;
use sewa_domain::contact::{Thread, ThreadKey, ThreadRole};
use sewa_domain::error::DomainError;
use sewa_domain::identity::ProfileId;
use sewa_domain::messaging::{Message, MessageCatchup, Reaction};
use sewa_domain::ports::BoxFuture;
use sewa_domain::ports::contact::ThreadRepository;
use sewa_domain::ports::directory::{IdentityResolver, ListingDirectory, ProfileDirectory};
use sewa_domain::ports::messaging::MessageRepository;
use tokio::sync::RwLock;

/// In-memory thread store for the `memory` backend. The `(listing,
/// seeker, host)` index lives behind the same lock as the rows, so a
/// duplicate insert observes `Conflict` even when two tabs race.
#[derive(Default)]
pub struct InMemoryThreadRepository {
    state: Arc<RwLock<ThreadState>>,
}

#[derive(Default)]
struct ThreadState {
    rows: HashMap<String, Thread>,
    by_key: HashMap<ThreadKey, String>,
}

impl InMemoryThreadRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThreadRepository for InMemoryThreadRepository {
    fn create_thread(&self, thread: &Thread) -> BoxFuture<'_, DomainResult<Thread>> {
        let thread = thread.clone();
        let state = self.state.clone();
        Box::pin(async move {
            let mut state = state.write().await;
            if state.rows.contains_key(&thread.thread_id) {
                return Err(DomainError::Conflict);
            }
            let key = thread.key();
            if state.by_key.contains_key(&key) {
                return Err(DomainError::Conflict);
            }
            state.by_key.insert(key, thread.thread_id.clone());
            state.rows.insert(thread.thread_id.clone(), thread.clone());
            Ok(thread)
        })
    }

    fn get_thread(&self, thread_id: &str) -> BoxFuture<'_, DomainResult<Option<Thread>>> {
        let thread_id = thread_id.to_string();
        let state = self.state.clone();
        Box::pin(async move { Ok(state.read().await.rows.get(&thread_id).cloned()) })
    }

    fn get_thread_by_key(&self, key: &ThreadKey) -> BoxFuture<'_, DomainResult<Option<Thread>>> {
        let key = key.clone();
        let state = self.state.clone();
        Box::pin(async move {
            let state = state.read().await;
            let Some(thread_id) = state.by_key.get(&key) else {
                return Ok(None);
            };
            Ok(state.rows.get(thread_id).cloned())
        })
    }

    fn update_thread(&self, thread: &Thread) -> BoxFuture<'_, DomainResult<Thread>> {
        let thread = thread.clone();
        let state = self.state.clone();
        Box::pin(async move {
            let mut state = state.write().await;
            if !state.rows.contains_key(&thread.thread_id) {
                return Err(DomainError::NotFound);
            }
            state.rows.insert(thread.thread_id.clone(), thread.clone());
            Ok(thread)
        })
    }

    fn list_threads_for_user(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Vec<Thread>>> {
        let user_id = user_id.to_string();
        let state = self.state.clone();
        Box::pin(async move {
            let mut rows: Vec<_> = state
                .read()
                .await
                .rows
                .values()
                .filter(|thread| thread.seeker_id == user_id || thread.host_id == user_id)
                .cloned()
                .collect();
            rows.sort_by(|left, right| {
                right
                    .created_at_ms
                    .cmp(&left.created_at_ms)
                    .then_with(|| right.thread_id.cmp(&left.thread_id))
            });
            Ok(rows)
        })
    }

    fn increment_unread(
        &self,
        thread_id: &str,
        role: ThreadRole,
    ) -> BoxFuture<'_, DomainResult<Thread>> {
        let thread_id = thread_id.to_string();
        let state = self.state.clone();
        Box::pin(async move {
            let mut state = state.write().await;
            let thread = state.rows.get_mut(&thread_id).ok_or(DomainError::NotFound)?;
            match role {
                ThreadRole::Seeker => thread.seeker_unread = thread.seeker_unread.saturating_add(1),
                ThreadRole::Host => thread.host_unread = thread.host_unread.saturating_add(1),
            }
            Ok(thread.clone())
        })
    }

    fn reset_unread(
        &self,
        thread_id: &str,
        role: ThreadRole,
    ) -> BoxFuture<'_, DomainResult<Thread>> {
        let thread_id = thread_id.to_string();
        let state = self.state.clone();
        Box::pin(async move {
            let mut state = state.write().await;
            let thread = state.rows.get_mut(&thread_id).ok_or(DomainError::NotFound)?;
            match role {
                ThreadRole::Seeker => thread.seeker_unread = 0,
                ThreadRole::Host => thread.host_unread = 0,
            }
            Ok(thread.clone())
        })
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: Arc<RwLock<HashMap<String, Message>>>,
    reactions: Arc<RwLock<Vec<Reaction>>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageRepository for InMemoryMessageRepository {
    fn create_message(&self, message: &Message) -> BoxFuture<'_, DomainResult<Message>> {
        let message = message.clone();
        let messages = self.messages.clone();
        Box::pin(async move {
            let mut messages = messages.write().await;
            if messages.contains_key(&message.message_id) {
                return Err(DomainError::Conflict);
            }
            messages.insert(message.message_id.clone(), message.clone());
            Ok(message)
        })
    }

    fn get_message(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<Message>>> {
        let thread_id = thread_id.to_string();
        let message_id = message_id.to_string();
        let messages = self.messages.clone();
        Box::pin(async move {
            let messages = messages.read().await;
            Ok(messages
                .get(&message_id)
                .filter(|message| message.thread_id == thread_id)
                .cloned())
        })
    }

    fn list_messages(
        &self,
        thread_id: &str,
        cursor: &MessageCatchup,
    ) -> BoxFuture<'_, DomainResult<Vec<Message>>> {
        let thread_id = thread_id.to_string();
        let cursor = cursor.clone();
        let messages = self.messages.clone();
        Box::pin(async move {
            let mut rows: Vec<_> = messages
                .read()
                .await
                .values()
                .filter(|message| message.thread_id == thread_id)
                .filter(|message| match cursor.since_created_at_ms {
                    None => true,
                    Some(since) => {
                        message.created_at_ms > since
                            || message.created_at_ms == since
                                && cursor
                                    .since_message_id
                                    .as_ref()
                                    .is_none_or(|id| message.message_id > *id)
                    }
                })
                .cloned()
                .collect();
            rows.sort_by(|left, right| {
                left.created_at_ms
                    .cmp(&right.created_at_ms)
                    .then_with(|| left.message_id.cmp(&right.message_id))
            });
            rows.truncate(cursor.limit);
            Ok(rows)
        })
    }

    fn mark_messages_read(
        &self,
        thread_id: &str,
        viewer_id: &str,
        read_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<usize>> {
        let thread_id = thread_id.to_string();
        let viewer_id = viewer_id.to_string();
        let messages = self.messages.clone();
        Box::pin(async move {
            let mut messages = messages.write().await;
            let mut stamped = 0;
            for message in messages.values_mut() {
                if message.thread_id == thread_id
                    && message.sender_id != viewer_id
                    && message.read_at_ms.is_none()
                {
                    message.read_at_ms = Some(read_at_ms);
                    stamped += 1;
                }
            }
            Ok(stamped)
        })
    }

    fn count_unread(
        &self,
        thread_id: &str,
        viewer_id: &str,
    ) -> BoxFuture<'_, DomainResult<usize>> {
        let thread_id = thread_id.to_string();
        let viewer_id = viewer_id.to_string();
        let messages = self.messages.clone();
        Box::pin(async move {
            let count = messages
                .read()
                .await
                .values()
                .filter(|message| {
                    message.thread_id == thread_id
                        && message.sender_id != viewer_id
                        && message.read_at_ms.is_none()
                })
                .count();
            Ok(count)
        })
    }

    fn create_reaction(&self, reaction: &Reaction) -> BoxFuture<'_, DomainResult<Reaction>> {
        let reaction = reaction.clone();
        let reactions = self.reactions.clone();
        Box::pin(async move {
            let mut reactions = reactions.write().await;
            let duplicate = reactions.iter().any(|row| {
                row.message_id == reaction.message_id
                    && row.user_id == reaction.user_id
                    && row.emoji == reaction.emoji
            });
            if duplicate {
                return Err(DomainError::Conflict);
            }
            reactions.push(reaction.clone());
            Ok(reaction)
        })
    }

    fn delete_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> BoxFuture<'_, DomainResult<()>> {
        let message_id = message_id.to_string();
        let user_id = user_id.to_string();
        let emoji = emoji.to_string();
        let reactions = self.reactions.clone();
        Box::pin(async move {
            reactions.write().await.retain(|row| {
                !(row.message_id == message_id && row.user_id == user_id && row.emoji == emoji)
            });
            Ok(())
        })
    }

    fn list_reactions(&self, message_id: &str) -> BoxFuture<'_, DomainResult<Vec<Reaction>>> {
        let message_id = message_id.to_string();
        let reactions = self.reactions.clone();
        Box::pin(async move {
            let mut rows: Vec<_> = reactions
                .read()
                .await
                .iter()
                .filter(|row| row.message_id == message_id)
                .cloned()
                .collect();
            rows.sort_by(|left, right| left.created_at_ms.cmp(&right.created_at_ms));
            Ok(rows)
        })
    }
}

/// Listing ownership lookup seeded at startup (or per test).
#[derive(Default)]
pub struct InMemoryListingDirectory {
    owners: Arc<RwLock<HashMap<String, ProfileId>>>,
}

impl InMemoryListingDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_listing(&self, listing_id: &str, owner_id: &str) {
        self.owners
            .write()
            .await
            .insert(listing_id.to_string(), owner_id.to_string());
    }
}

impl ListingDirectory for InMemoryListingDirectory {
    fn listing_owner(&self, listing_id: &str) -> BoxFuture<'_, DomainResult<ProfileId>> {
        let listing_id = listing_id.to_string();
        let owners = self.owners.clone();
        Box::pin(async move {
            owners
                .read()
                .await
                .get(&listing_id)
                .cloned()
                .ok_or(DomainError::NotFound)
        })
    }
}

#[derive(Default)]
pub struct InMemoryProfileDirectory {
    names: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, profile_id: &str, display_name: &str) {
        self.names
            .write()
            .await
            .insert(profile_id.to_string(), display_name.to_string());
    }
}

impl ProfileDirectory for InMemoryProfileDirectory {
    fn display_name(&self, profile_id: &str) -> BoxFuture<'_, DomainResult<Option<String>>> {
        let profile_id = profile_id.to_string();
        let names = self.names.clone();
        Box::pin(async move { Ok(names.read().await.get(&profile_id).cloned()) })
    }
}

/// Holds the signed-in profile for the current process. The auth layer
/// proper is out of scope; this adapter is what the contact flow consults
/// to establish `seeker_id`.
#[derive(Default)]
pub struct SessionIdentity {
    profile_id: Arc<RwLock<Option<ProfileId>>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sign_in(&self, profile_id: &str) {
        *self.profile_id.write().await = Some(profile_id.to_string());
    }

    pub async fn sign_out(&self) {
        *self.profile_id.write().await = None;
    }
}

impl IdentityResolver for SessionIdentity {
    fn current_profile_id(&self) -> BoxFuture<'_, DomainResult<Option<ProfileId>>> {
        let profile_id = self.profile_id.clone();
        Box::pin(async move { Ok(profile_id.read().await.clone()) })
    }
}
