use crate::notify::NotificationPayload;

/// Outbound toast/push/email delivery. Fire-and-forget: the router never
/// waits on or retries sink failures.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, payload: &NotificationPayload) -> crate::ports::BoxFuture<'_, ()>;
}

/// Aggregate unread badge owned by the presence tracker.
pub trait UnreadBadge: Send + Sync {
    fn refresh(&self, user_id: &str, total_unread: u64) -> crate::ports::BoxFuture<'_, ()>;
}
