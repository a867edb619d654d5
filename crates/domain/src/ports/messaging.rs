use crate::DomainResult;
use crate::messaging::{Message, MessageCatchup, Reaction};

pub trait MessageRepository: Send + Sync {
    fn create_message(
        &self,
        message: &Message,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Message>>;

    fn get_message(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Option<Message>>>;

    fn list_messages(
        &self,
        thread_id: &str,
        cursor: &MessageCatchup,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Vec<Message>>>;

    /// Stamps `read_at_ms` on every unread message in the thread that was
    /// not sent by `viewer_id`. Returns the number of messages stamped.
    /// Already-read messages are left untouched.
    fn mark_messages_read(
        &self,
        thread_id: &str,
        viewer_id: &str,
        read_at_ms: i64,
    ) -> crate::ports::BoxFuture<'_, DomainResult<usize>>;

    fn count_unread(
        &self,
        thread_id: &str,
        viewer_id: &str,
    ) -> crate::ports::BoxFuture<'_, DomainResult<usize>>;

    fn create_reaction(
        &self,
        reaction: &Reaction,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Reaction>>;

    fn delete_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> crate::ports::BoxFuture<'_, DomainResult<()>>;

    fn list_reactions(
        &self,
        message_id: &str,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Vec<Reaction>>>;
}
