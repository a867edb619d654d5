use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::feed::ChangeEvent;
use crate::identity::ActorIdentity;
use crate::messaging::{Message, MessagingService, SendMessageInput};
use crate::ports::contact::ThreadRepository;
use crate::ports::directory::ListingDirectory;
use crate::ports::feed::ChangeFeedPublisher;
use crate::util::now_ms;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    Pending,
    Accepted,
    Declined,
    Blocked,
    Archived,
}

impl ThreadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Blocked => "blocked",
            Self::Archived => "archived",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadRole {
    Seeker,
    Host,
}

impl ThreadRole {
    pub fn other(&self) -> Self {
        match self {
            Self::Seeker => Self::Host,
            Self::Host => Self::Seeker,
        }
    }
}

/// The uniqueness key: at most one thread may exist per triple, no matter
/// how many tabs race on the contact button.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ThreadKey {
    pub listing_id: String,
    pub seeker_id: String,
    pub host_id: String,
}

/// One conversation between exactly one seeker and one host about exactly
/// one listing. Never hard-deleted; archived instead.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thread {
    pub thread_id: String,
    pub listing_id: String,
    pub seeker_id: String,
    pub host_id: String,
    pub status: ThreadStatus,
    pub created_at_ms: i64,
    pub accepted_at_ms: Option<i64>,
    pub declined_at_ms: Option<i64>,
    pub seeker_unread: u32,
    pub host_unread: u32,
}

impl Thread {
    pub fn key(&self) -> ThreadKey {
        ThreadKey {
            listing_id: self.listing_id.clone(),
            seeker_id: self.seeker_id.clone(),
            host_id: self.host_id.clone(),
        }
    }

    pub fn role_of(&self, user_id: &str) -> Option<ThreadRole> {
        if self.seeker_id == user_id {
            Some(ThreadRole::Seeker)
        } else if self.host_id == user_id {
            Some(ThreadRole::Host)
        } else {
            None
        }
    }

    pub fn peer_of(&self, user_id: &str) -> Option<&str> {
        match self.role_of(user_id)? {
            ThreadRole::Seeker => Some(&self.host_id),
            ThreadRole::Host => Some(&self.seeker_id),
        }
    }

    pub fn unread_for(&self, role: ThreadRole) -> u32 {
        match role {
            ThreadRole::Seeker => self.seeker_unread,
            ThreadRole::Host => self.host_unread,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseDecision {
    Accepted,
    Declined,
}

#[derive(Clone, Debug)]
pub struct ContactInput {
    pub listing_id: String,
    pub seeker_id: String,
    pub host_id: String,
    pub initial_message: Option<String>,
}

/// How `create_or_resume` resolved the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactDisposition {
    /// A fresh pending thread was inserted.
    Created,
    /// A request is already outstanding; nothing changed.
    AlreadyPending,
    /// An accepted conversation was returned unchanged.
    Resumed,
    /// A declined (or archived) thread was re-opened in place.
    Reopened,
}

impl ContactDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyPending => "already_pending",
            Self::Resumed => "resumed",
            Self::Reopened => "reopened",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ContactOutcome {
    pub thread: Thread,
    pub disposition: ContactDisposition,
    /// The seeded first message, when one was requested and appended.
    pub message: Option<Message>,
    /// The thread is the durable anchor: a failed seed append never rolls
    /// it back, the failure is carried here instead.
    pub message_failure: Option<String>,
}

/// Orchestrates the contact-request lifecycle: one thread per
/// `(listing, seeker, host)` key, monotonic status transitions with the
/// declined -> pending re-open path, blocked absorbing everything.
#[derive(Clone)]
pub struct ContactService {
    threads: Arc<dyn ThreadRepository>,
    messaging: MessagingService,
    feed: Arc<dyn ChangeFeedPublisher>,
}

impl ContactService {
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        messaging: MessagingService,
        feed: Arc<dyn ChangeFeedPublisher>,
    ) -> Self {
        Self {
            threads,
            messaging,
            feed,
        }
    }

    /// Resolves the listing owner and delegates to `create_or_resume`.
    pub async fn contact_listing(
        &self,
        actor: &ActorIdentity,
        directory: &dyn ListingDirectory,
        listing_id: &str,
        initial_message: Option<String>,
    ) -> DomainResult<ContactOutcome> {
        let host_id = directory.listing_owner(listing_id).await?;
        if host_id == actor.user_id {
            return Err(DomainError::Validation(
                "cannot contact your own listing".into(),
            ));
        }
        let outcome = self
            .create_or_resume(
                actor,
                ContactInput {
                    listing_id: listing_id.to_string(),
                    seeker_id: actor.user_id.clone(),
                    host_id,
                    initial_message,
                },
            )
            .await?;
        tracing::debug!(
            listing_id,
            disposition = outcome.disposition.as_str(),
            "listing contact resolved"
        );
        Ok(outcome)
    }

    /// Race-safe under concurrent duplicate calls: the store rejects a
    /// second insert for the key and we fall back to the existing row.
    pub async fn create_or_resume(
        &self,
        actor: &ActorIdentity,
        input: ContactInput,
    ) -> DomainResult<ContactOutcome> {
        let input = validate_contact_input(input)?;
        if actor.user_id != input.seeker_id {
            return Err(DomainError::NotAuthorized);
        }

        let key = ThreadKey {
            listing_id: input.listing_id.clone(),
            seeker_id: input.seeker_id.clone(),
            host_id: input.host_id.clone(),
        };
        if let Some(existing) = self.threads.get_thread_by_key(&key).await? {
            return self
                .resume_existing(actor, existing, input.initial_message)
                .await;
        }

        let thread = Thread {
            thread_id: crate::util::uuid_v7_without_dashes(),
            listing_id: input.listing_id,
            seeker_id: input.seeker_id,
            host_id: input.host_id,
            status: ThreadStatus::Pending,
            created_at_ms: now_ms(),
            accepted_at_ms: None,
            declined_at_ms: None,
            seeker_unread: 0,
            host_unread: 0,
        };
        match self.threads.create_thread(&thread).await {
            Ok(thread) => {
                self.feed
                    .publish(&ChangeEvent::ThreadInserted(thread.clone()))
                    .await;
                let (message, message_failure) = self
                    .seed_message(actor, &thread.thread_id, input.initial_message)
                    .await;
                Ok(ContactOutcome {
                    thread,
                    disposition: ContactDisposition::Created,
                    message,
                    message_failure,
                })
            }
            Err(DomainError::Conflict) => {
                // Lost the insert race to another tab. The constraint kept
                // exactly one row; resolve to it.
                let existing = self
                    .threads
                    .get_thread_by_key(&key)
                    .await?
                    .ok_or(DomainError::Conflict)?;
                self.resume_existing(actor, existing, input.initial_message)
                    .await
            }
            Err(err) => Err(err),
        }
    }

    /// Host answers a pending request. Emits a thread-updated event so the
    /// seeker's UI flips without polling.
    pub async fn respond(
        &self,
        actor: &ActorIdentity,
        thread_id: &str,
        decision: ResponseDecision,
    ) -> DomainResult<Thread> {
        let mut thread = self
            .threads
            .get_thread(thread_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        if thread.host_id != actor.user_id {
            return Err(DomainError::NotAuthorized);
        }
        match thread.status {
            ThreadStatus::Blocked => return Err(DomainError::Blocked),
            ThreadStatus::Pending => {}
            other => {
                return Err(DomainError::InvalidTransition {
                    from: other.as_str().to_string(),
                    to: match decision {
                        ResponseDecision::Accepted => "accepted".to_string(),
                        ResponseDecision::Declined => "declined".to_string(),
                    },
                });
            }
        }

        let now = now_ms();
        match decision {
            ResponseDecision::Accepted => {
                thread.status = ThreadStatus::Accepted;
                thread.accepted_at_ms = Some(now);
            }
            ResponseDecision::Declined => {
                thread.status = ThreadStatus::Declined;
                thread.declined_at_ms = Some(now);
            }
        }
        let thread = self.threads.update_thread(&thread).await?;
        self.feed
            .publish(&ChangeEvent::ThreadUpdated(thread.clone()))
            .await;
        Ok(thread)
    }

    /// Either party may block from any state; blocking twice is a no-op.
    /// Blocked is terminal for the protocol.
    pub async fn block(&self, actor: &ActorIdentity, thread_id: &str) -> DomainResult<Thread> {
        let mut thread = self
            .threads
            .get_thread(thread_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        thread
            .role_of(&actor.user_id)
            .ok_or(DomainError::NotAuthorized)?;
        if thread.status == ThreadStatus::Blocked {
            return Ok(thread);
        }

        thread.status = ThreadStatus::Blocked;
        let thread = self.threads.update_thread(&thread).await?;
        self.feed
            .publish(&ChangeEvent::ThreadUpdated(thread.clone()))
            .await;
        Ok(thread)
    }

    /// Housekeeping: hides the thread without deleting history.
    pub async fn archive(&self, actor: &ActorIdentity, thread_id: &str) -> DomainResult<Thread> {
        let mut thread = self
            .threads
            .get_thread(thread_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        thread
            .role_of(&actor.user_id)
            .ok_or(DomainError::NotAuthorized)?;
        if thread.status == ThreadStatus::Archived {
            return Ok(thread);
        }

        thread.status = ThreadStatus::Archived;
        let thread = self.threads.update_thread(&thread).await?;
        self.feed
            .publish(&ChangeEvent::ThreadUpdated(thread.clone()))
            .await;
        Ok(thread)
    }

    pub async fn get_thread(&self, thread_id: &str) -> DomainResult<Thread> {
        self.threads
            .get_thread(thread_id)
            .await?
            .ok_or(DomainError::NotFound)
    }

    pub async fn list_threads(&self, actor: &ActorIdentity) -> DomainResult<Vec<Thread>> {
        self.threads.list_threads_for_user(&actor.user_id).await
    }

    async fn resume_existing(
        &self,
        actor: &ActorIdentity,
        existing: Thread,
        initial_message: Option<String>,
    ) -> DomainResult<ContactOutcome> {
        tracing::debug!(
            thread_id = %existing.thread_id,
            status = existing.status.as_str(),
            "contact resolved to existing thread"
        );
        match existing.status {
            ThreadStatus::Pending => Ok(ContactOutcome {
                thread: existing,
                disposition: ContactDisposition::AlreadyPending,
                message: None,
                message_failure: None,
            }),
            ThreadStatus::Accepted => Ok(ContactOutcome {
                thread: existing,
                disposition: ContactDisposition::Resumed,
                message: None,
                message_failure: None,
            }),
            ThreadStatus::Declined | ThreadStatus::Archived => {
                // Re-send reuses the row: same thread id, history intact.
                let mut thread = existing;
                thread.status = ThreadStatus::Pending;
                thread.declined_at_ms = None;
                thread.created_at_ms = now_ms();
                let thread = self.threads.update_thread(&thread).await?;
                self.feed
                    .publish(&ChangeEvent::ThreadUpdated(thread.clone()))
                    .await;
                let (message, message_failure) = self
                    .seed_message(actor, &thread.thread_id, initial_message)
                    .await;
                Ok(ContactOutcome {
                    thread,
                    disposition: ContactDisposition::Reopened,
                    message,
                    message_failure,
                })
            }
            ThreadStatus::Blocked => Err(DomainError::Blocked),
        }
    }

    async fn seed_message(
        &self,
        actor: &ActorIdentity,
        thread_id: &str,
        initial_message: Option<String>,
    ) -> (Option<Message>, Option<String>) {
        let Some(body) = initial_message else {
            return (None, None);
        };
        match self
            .messaging
            .send_message(
                actor,
                SendMessageInput {
                    thread_id: thread_id.to_string(),
                    body,
                    occurred_at_ms: None,
                },
            )
            .await
        {
            Ok(message) => (Some(message), None),
            Err(err) => {
                tracing::warn!(thread_id, error = %err, "initial message append failed");
                (None, Some(err.to_string()))
            }
        }
    }
}

fn validate_contact_input(mut input: ContactInput) -> DomainResult<ContactInput> {
    input.listing_id = input.listing_id.trim().to_string();
    input.seeker_id = input.seeker_id.trim().to_string();
    input.host_id = input.host_id.trim().to_string();

    if input.listing_id.is_empty() || input.seeker_id.is_empty() || input.host_id.is_empty() {
        return Err(DomainError::Validation(
            "listing_id, seeker_id and host_id are required".into(),
        ));
    }
    if input.seeker_id == input.host_id {
        return Err(DomainError::Validation(
            "seeker and host must be different profiles".into(),
        ));
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::tests::{MockMessageRepo, MockThreadRepo, RecordingFeed};
    use crate::messaging::{MessageCatchup, Reaction};
    use crate::ports::BoxFuture;
    use crate::ports::messaging::MessageRepository;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn build_service(
        threads: Arc<dyn ThreadRepository>,
        messages: Arc<dyn MessageRepository>,
    ) -> (ContactService, MessagingService, Arc<RecordingFeed>) {
        let feed = Arc::new(RecordingFeed::default());
        let messaging = MessagingService::new(threads.clone(), messages, feed.clone());
        let contact = ContactService::new(threads, messaging.clone(), feed.clone());
        (contact, messaging, feed)
    }

    fn contact_input(message: Option<&str>) -> ContactInput {
        ContactInput {
            listing_id: "L1".to_string(),
            seeker_id: "S1".to_string(),
            host_id: "H1".to_string(),
            initial_message: message.map(str::to_string),
        }
    }

    fn seeker() -> ActorIdentity {
        ActorIdentity::with_user_id("S1")
    }

    fn host() -> ActorIdentity {
        ActorIdentity::with_user_id("H1")
    }

    #[tokio::test]
    async fn first_contact_creates_pending_thread_with_seed_message() {
        let threads = Arc::new(MockThreadRepo::default());
        let messages = Arc::new(MockMessageRepo::default());
        let (contact, messaging, _feed) = build_service(threads.clone(), messages);

        let outcome = contact
            .create_or_resume(&seeker(), contact_input(Some("Is this available?")))
            .await
            .expect("contact");

        assert_eq!(outcome.disposition, ContactDisposition::Created);
        assert_eq!(outcome.thread.status, ThreadStatus::Pending);
        assert_eq!(outcome.thread.host_unread, 0, "snapshot taken at insert");
        assert!(outcome.message.is_some());
        assert!(outcome.message_failure.is_none());

        let current = contact
            .get_thread(&outcome.thread.thread_id)
            .await
            .expect("thread");
        assert_eq!(current.host_unread, 1);
        let history = messaging
            .list_messages(
                &seeker(),
                &outcome.thread.thread_id,
                MessageCatchup {
                    since_created_at_ms: None,
                    since_message_id: None,
                    limit: 50,
                },
            )
            .await
            .expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].body, "Is this available?");
    }

    #[tokio::test]
    async fn duplicate_contact_while_pending_is_a_noop() {
        let threads = Arc::new(MockThreadRepo::default());
        let messages = Arc::new(MockMessageRepo::default());
        let (contact, messaging, _feed) = build_service(threads, messages);

        let first = contact
            .create_or_resume(&seeker(), contact_input(Some("hello")))
            .await
            .expect("first");
        let second = contact
            .create_or_resume(&seeker(), contact_input(Some("hello again")))
            .await
            .expect("second");

        assert_eq!(second.disposition, ContactDisposition::AlreadyPending);
        assert_eq!(second.thread.thread_id, first.thread.thread_id);
        assert!(second.message.is_none(), "no message appended on duplicate");
        let history = messaging
            .list_messages(
                &seeker(),
                &first.thread.thread_id,
                MessageCatchup {
                    since_created_at_ms: None,
                    since_message_id: None,
                    limit: 50,
                },
            )
            .await
            .expect("history");
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn decline_then_resend_reuses_thread_and_keeps_history() {
        let threads = Arc::new(MockThreadRepo::default());
        let messages = Arc::new(MockMessageRepo::default());
        let (contact, messaging, _feed) = build_service(threads, messages);

        let first = contact
            .create_or_resume(&seeker(), contact_input(Some("Is this available?")))
            .await
            .expect("first");
        let declined = contact
            .respond(&host(), &first.thread.thread_id, ResponseDecision::Declined)
            .await
            .expect("decline");
        assert_eq!(declined.status, ThreadStatus::Declined);
        assert!(declined.declined_at_ms.is_some());

        let resent = contact
            .create_or_resume(&seeker(), contact_input(Some("Still interested")))
            .await
            .expect("resend");
        assert_eq!(resent.disposition, ContactDisposition::Reopened);
        assert_eq!(resent.thread.thread_id, first.thread.thread_id);
        assert_eq!(resent.thread.status, ThreadStatus::Pending);
        assert!(resent.thread.declined_at_ms.is_none());

        let history = messaging
            .list_messages(
                &seeker(),
                &first.thread.thread_id,
                MessageCatchup {
                    since_created_at_ms: None,
                    since_message_id: None,
                    limit: 50,
                },
            )
            .await
            .expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].body, "Is this available?");
        assert_eq!(history[1].body, "Still interested");
    }

    #[tokio::test]
    async fn accepted_thread_resumes_unchanged() {
        let threads = Arc::new(MockThreadRepo::default());
        let messages = Arc::new(MockMessageRepo::default());
        let (contact, _messaging, _feed) = build_service(threads, messages);

        let first = contact
            .create_or_resume(&seeker(), contact_input(None))
            .await
            .expect("first");
        contact
            .respond(&host(), &first.thread.thread_id, ResponseDecision::Accepted)
            .await
            .expect("accept");

        let again = contact
            .create_or_resume(&seeker(), contact_input(None))
            .await
            .expect("again");
        assert_eq!(again.disposition, ContactDisposition::Resumed);
        assert_eq!(again.thread.thread_id, first.thread.thread_id);
        assert_eq!(again.thread.status, ThreadStatus::Accepted);
        assert!(again.thread.accepted_at_ms.is_some());
    }

    /// The key-uniqueness race: the rival tab's row is already in the store
    /// but this tab's initial lookup missed it, so the insert hits the
    /// constraint and the orchestrator must resolve to the existing row.
    struct BlindFirstLookup {
        inner: Arc<MockThreadRepo>,
        lookup_done: AtomicBool,
    }

    impl ThreadRepository for BlindFirstLookup {
        fn create_thread(&self, thread: &Thread) -> BoxFuture<'_, DomainResult<Thread>> {
            self.inner.create_thread(thread)
        }

        fn get_thread(&self, thread_id: &str) -> BoxFuture<'_, DomainResult<Option<Thread>>> {
            self.inner.get_thread(thread_id)
        }

        fn get_thread_by_key(&self, key: &ThreadKey) -> BoxFuture<'_, DomainResult<Option<Thread>>> {
            if !self.lookup_done.swap(true, Ordering::SeqCst) {
                return Box::pin(async { Ok(None) });
            }
            self.inner.get_thread_by_key(key)
        }

        fn update_thread(&self, thread: &Thread) -> BoxFuture<'_, DomainResult<Thread>> {
            self.inner.update_thread(thread)
        }

        fn list_threads_for_user(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Vec<Thread>>> {
            self.inner.list_threads_for_user(user_id)
        }

        fn increment_unread(
            &self,
            thread_id: &str,
            role: ThreadRole,
        ) -> BoxFuture<'_, DomainResult<Thread>> {
            self.inner.increment_unread(thread_id, role)
        }

        fn reset_unread(
            &self,
            thread_id: &str,
            role: ThreadRole,
        ) -> BoxFuture<'_, DomainResult<Thread>> {
            self.inner.reset_unread(thread_id, role)
        }
    }

    #[tokio::test]
    async fn insert_conflict_resolves_to_existing_thread() {
        let inner = Arc::new(MockThreadRepo::default());
        let rival = crate::messaging::tests::pending_thread("rival", "L1", "S1", "H1");
        inner
            .create_thread(&rival)
            .await
            .expect("rival row in place");

        let threads = Arc::new(BlindFirstLookup {
            inner,
            lookup_done: AtomicBool::new(false),
        });
        let messages = Arc::new(MockMessageRepo::default());
        let (contact, _messaging, _feed) = build_service(threads, messages);

        let outcome = contact
            .create_or_resume(&seeker(), contact_input(None))
            .await
            .expect("resolved");
        assert_eq!(outcome.thread.thread_id, "rival");
        assert_eq!(outcome.disposition, ContactDisposition::AlreadyPending);
    }

    #[tokio::test]
    async fn concurrent_double_submit_yields_one_thread() {
        let threads = Arc::new(MockThreadRepo::default());
        let messages = Arc::new(MockMessageRepo::default());
        let (contact, _messaging, _feed) = build_service(threads.clone(), messages);

        let actor = seeker();
        let (left, right) = tokio::join!(
            contact.create_or_resume(&actor, contact_input(None)),
            contact.create_or_resume(&actor, contact_input(None)),
        );
        let left = left.expect("left tab");
        let right = right.expect("right tab");

        assert_eq!(left.thread.thread_id, right.thread.thread_id);
        assert_eq!(threads.threads.read().await.len(), 1);
    }

    #[tokio::test]
    async fn blocked_is_absorbing() {
        let threads = Arc::new(MockThreadRepo::default());
        let messages = Arc::new(MockMessageRepo::default());
        let (contact, _messaging, _feed) = build_service(threads, messages);

        let first = contact
            .create_or_resume(&seeker(), contact_input(None))
            .await
            .expect("first");
        let blocked = contact
            .block(&host(), &first.thread.thread_id)
            .await
            .expect("block");
        assert_eq!(blocked.status, ThreadStatus::Blocked);

        let err = contact
            .respond(&host(), &first.thread.thread_id, ResponseDecision::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Blocked));

        let err = contact
            .create_or_resume(&seeker(), contact_input(Some("please?")))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Blocked));

        let again = contact
            .block(&seeker(), &first.thread.thread_id)
            .await
            .expect("repeat block is a no-op");
        assert_eq!(again.status, ThreadStatus::Blocked);
    }

    #[tokio::test]
    async fn respond_requires_host_and_pending_status() {
        let threads = Arc::new(MockThreadRepo::default());
        let messages = Arc::new(MockMessageRepo::default());
        let (contact, _messaging, _feed) = build_service(threads, messages);

        let first = contact
            .create_or_resume(&seeker(), contact_input(None))
            .await
            .expect("first");

        let err = contact
            .respond(&seeker(), &first.thread.thread_id, ResponseDecision::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotAuthorized));

        contact
            .respond(&host(), &first.thread.thread_id, ResponseDecision::Accepted)
            .await
            .expect("accept");
        let err = contact
            .respond(&host(), &first.thread.thread_id, ResponseDecision::Declined)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    struct FailingMessageRepo;

    impl MessageRepository for FailingMessageRepo {
        fn create_message(&self, _message: &Message) -> BoxFuture<'_, DomainResult<Message>> {
            Box::pin(async { Err(DomainError::Store("message store timeout".into())) })
        }

        fn get_message(
            &self,
            _thread_id: &str,
            _message_id: &str,
        ) -> BoxFuture<'_, DomainResult<Option<Message>>> {
            Box::pin(async { Ok(None) })
        }

        fn list_messages(
            &self,
            _thread_id: &str,
            _cursor: &MessageCatchup,
        ) -> BoxFuture<'_, DomainResult<Vec<Message>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn mark_messages_read(
            &self,
            _thread_id: &str,
            _viewer_id: &str,
            _read_at_ms: i64,
        ) -> BoxFuture<'_, DomainResult<usize>> {
            Box::pin(async { Ok(0) })
        }

        fn count_unread(
            &self,
            _thread_id: &str,
            _viewer_id: &str,
        ) -> BoxFuture<'_, DomainResult<usize>> {
            Box::pin(async { Ok(0) })
        }

        fn create_reaction(&self, _reaction: &Reaction) -> BoxFuture<'_, DomainResult<Reaction>> {
            Box::pin(async { Err(DomainError::Store("unavailable".into())) })
        }

        fn delete_reaction(
            &self,
            _message_id: &str,
            _user_id: &str,
            _emoji: &str,
        ) -> BoxFuture<'_, DomainResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn list_reactions(&self, _message_id: &str) -> BoxFuture<'_, DomainResult<Vec<Reaction>>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    #[tokio::test]
    async fn seed_failure_keeps_thread_and_reports_error() {
        let threads = Arc::new(MockThreadRepo::default());
        let (contact, _messaging, _feed) =
            build_service(threads.clone(), Arc::new(FailingMessageRepo));

        let outcome = contact
            .create_or_resume(&seeker(), contact_input(Some("hello")))
            .await
            .expect("thread still created");
        assert_eq!(outcome.disposition, ContactDisposition::Created);
        assert!(outcome.message.is_none());
        assert!(outcome
            .message_failure
            .as_deref()
            .is_some_and(|failure| failure.contains("timeout")));
        assert_eq!(threads.threads.read().await.len(), 1);
    }

    #[tokio::test]
    async fn contact_validation_rejects_self_contact_and_wrong_actor() {
        let threads = Arc::new(MockThreadRepo::default());
        let messages = Arc::new(MockMessageRepo::default());
        let (contact, _messaging, _feed) = build_service(threads, messages);

        let err = contact
            .create_or_resume(
                &seeker(),
                ContactInput {
                    listing_id: "L1".to_string(),
                    seeker_id: "S1".to_string(),
                    host_id: "S1".to_string(),
                    initial_message: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = contact
            .create_or_resume(&ActorIdentity::with_user_id("someone-else"), contact_input(None))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotAuthorized));
    }

    struct StaticListingDirectory {
        owner: String,
    }

    impl ListingDirectory for StaticListingDirectory {
        fn listing_owner(&self, _listing_id: &str) -> BoxFuture<'_, DomainResult<String>> {
            let owner = self.owner.clone();
            Box::pin(async move { Ok(owner) })
        }
    }

    #[tokio::test]
    async fn contact_listing_resolves_host_and_rejects_own_listing() {
        let threads = Arc::new(MockThreadRepo::default());
        let messages = Arc::new(MockMessageRepo::default());
        let (contact, _messaging, _feed) = build_service(threads, messages);
        let directory = StaticListingDirectory {
            owner: "H1".to_string(),
        };

        let outcome = contact
            .contact_listing(&seeker(), &directory, "L1", None)
            .await
            .expect("contact via listing");
        assert_eq!(outcome.thread.host_id, "H1");

        let own = StaticListingDirectory {
            owner: "S1".to_string(),
        };
        let err = contact
            .contact_listing(&seeker(), &own, "L1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
