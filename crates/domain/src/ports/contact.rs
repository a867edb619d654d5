use crate::DomainResult;
use crate::contact::{Thread, ThreadKey, ThreadRole};

/// Durable record of contact threads. Implementations must enforce the
/// uniqueness constraint on `(listing_id, seeker_id, host_id)` by
/// returning `DomainError::Conflict` for a duplicate insert, including
/// under concurrent callers.
pub trait ThreadRepository: Send + Sync {
    fn create_thread(&self, thread: &Thread) -> crate::ports::BoxFuture<'_, DomainResult<Thread>>;

    fn get_thread(
        &self,
        thread_id: &str,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Option<Thread>>>;

    fn get_thread_by_key(
        &self,
        key: &ThreadKey,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Option<Thread>>>;

    fn update_thread(&self, thread: &Thread) -> crate::ports::BoxFuture<'_, DomainResult<Thread>>;

    fn list_threads_for_user(
        &self,
        user_id: &str,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Vec<Thread>>>;

    fn increment_unread(
        &self,
        thread_id: &str,
        role: ThreadRole,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Thread>>;

    fn reset_unread(
        &self,
        thread_id: &str,
        role: ThreadRole,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Thread>>;
}
