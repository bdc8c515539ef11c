//! Client-side identity/session context.
//!
//! One [`SessionContext`] per process holds the current token and profile,
//! hydrated from durable storage at startup and kept in step with the
//! identity provider's session-change notifications.

pub mod context;
pub mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::identity_service::{IdentityError, ProviderUser};

pub use context::SessionContext;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};

pub const TOKEN_KEY: &str = "userToken";
pub const PROFILE_KEY: &str = "userData";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session storage JSON error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Session storage lock poisoned")]
    StorePoisoned,
    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl From<&ProviderUser> for UserProfile {
    fn from(user: &ProviderUser) -> Self {
        Self {
            uid: user.uid.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            photo_url: user.photo_url.clone(),
        }
    }
}

/// Snapshot published to every consumer of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: String,
    pub profile: Option<UserProfile>,
    /// True while a session change is being applied; callers should hold off
    /// rendering authenticated content until it clears.
    pub is_loading: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }
}
