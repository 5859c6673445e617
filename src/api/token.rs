//! Session token storage.

use parking_lot::RwLock;

/// Key-value storage for the session token and cached user info.
///
/// Host applications back this with their platform storage.
pub trait TokenStore: Send + Sync {
    /// Current bearer token, if logged in.
    fn token(&self) -> Option<String>;

    /// Store a bearer token.
    fn set_token(&self, token: String);

    /// Forget the token and any cached user info.
    fn clear_session(&self);

    /// Cached user info as JSON.
    fn user_info(&self) -> Option<serde_json::Value>;

    /// Cache user info.
    fn set_user_info(&self, info: serde_json::Value);
}

/// In-memory [`TokenStore`].
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
    user_info: RwLock<Option<serde_json::Value>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set_token(&self, token: String) {
        *self.token.write() = Some(token);
    }

    fn clear_session(&self) {
        *self.token.write() = None;
        *self.user_info.write() = None;
    }

    fn user_info(&self) -> Option<serde_json::Value> {
        self.user_info.read().clone()
    }

    fn set_user_info(&self, info: serde_json::Value) {
        *self.user_info.write() = Some(info);
    }
}
