use crate::DomainResult;
use crate::identity::ProfileId;

/// Maps the authenticated principal to a stable profile id. Owned by the
/// auth layer, consumed here only to establish `seeker_id`.
pub trait IdentityResolver: Send + Sync {
    fn current_profile_id(&self) -> crate::ports::BoxFuture<'_, DomainResult<Option<ProfileId>>>;
}

/// Resolves listing ownership when a seeker initiates contact from a
/// listing page.
pub trait ListingDirectory: Send + Sync {
    fn listing_owner(
        &self,
        listing_id: &str,
    ) -> crate::ports::BoxFuture<'_, DomainResult<ProfileId>>;
}

/// Display-name lookup for notification payloads.
pub trait ProfileDirectory: Send + Sync {
    fn display_name(
        &self,
        profile_id: &str,
    ) -> crate::ports::BoxFuture<'_, DomainResult<Option<String>>>;
}
