use serde::{Deserialize, Serialize};

/// Stable profile identifier handed out by the identity provider. Threads
/// reference it as `seeker_id` / `host_id`.
pub type ProfileId = String;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActorIdentity {
    pub user_id: ProfileId,
    pub username: String,
}

impl ActorIdentity {
    pub fn with_user_id(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            user_id: user_id.clone(),
            username: user_id,
        }
    }
}
