//! Identity provider access: token decoding, the provider abstraction the
//! session context listens to, and a REST-backed implementation.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

/// Session-change notifications: `Some` on sign-in, `None` on sign-out.
pub type SessionChange = Option<ProviderUser>;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Identity provider rejected the request: {0}")]
    Rejected(String),
    #[error("Identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to issue token: {0}")]
    TokenIssue(String),
}

/// Claims carried by provider-issued ID tokens. Only `sub` is guaranteed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl TokenClaims {
    pub fn is_expired(&self) -> bool {
        self.exp.is_some_and(|exp| exp <= Utc::now().timestamp())
    }
}

/// Decodes a JWT's claims without checking its signature. Tokens come from
/// the identity provider, which is trusted for issuance.
pub fn decode_token(token: &str) -> Result<TokenClaims, IdentityError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            error!(error = ?e, "Error decoding token.");
            IdentityError::InvalidToken
        })
}

/// An authenticated account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub id_token: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderUser, IdentityError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderUser, IdentityError>;
    async fn sign_out(&self) -> Result<(), IdentityError>;
    /// The account the provider currently considers signed in, if any.
    async fn current_user(&self) -> Option<ProviderUser>;
    async fn id_token(&self, user: &ProviderUser) -> Result<String, IdentityError>;
    fn subscribe(&self) -> broadcast::Receiver<SessionChange>;
}

// --- REST provider ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordAuthRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordAuthResponse {
    local_id: String,
    id_token: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

/// Email/password accounts through the identity toolkit REST API.
pub struct RestIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    current: Mutex<Option<ProviderUser>>,
    changes: broadcast::Sender<SessionChange>,
}

impl RestIdentityProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_IDENTITY_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            current: Mutex::new(None),
            changes,
        }
    }

    async fn password_auth(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<ProviderUser, IdentityError> {
        let url = format!("{}/v1/accounts:{}", self.base_url, action);
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordAuthRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let reason = response
                .json::<ProviderErrorBody>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| status.to_string());
            warn!(action, %status, reason = %reason, "Identity provider rejected request.");
            return Err(IdentityError::Rejected(reason));
        }

        let body: PasswordAuthResponse = response.json().await?;
        let user = ProviderUser {
            uid: body.local_id,
            email: body.email,
            display_name: body.display_name,
            photo_url: body.photo_url,
            id_token: body.id_token,
        };
        self.publish(Some(user.clone())).await;
        Ok(user)
    }

    async fn publish(&self, change: SessionChange) {
        *self.current.lock().await = change.clone();
        // No subscribers is not an error.
        let _ = self.changes.send(change);
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderUser, IdentityError> {
        self.password_auth("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderUser, IdentityError> {
        self.password_auth("signInWithPassword", email, password).await
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.publish(None).await;
        Ok(())
    }

    async fn current_user(&self) -> Option<ProviderUser> {
        self.current.lock().await.clone()
    }

    async fn id_token(&self, user: &ProviderUser) -> Result<String, IdentityError> {
        Ok(user.id_token.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }
}

// --- In-memory provider ---

const IN_MEMORY_SIGNING_KEY: &[u8] = b"linkshelf-in-memory-provider";

struct Account {
    password: String,
    uid: String,
}

#[derive(Default)]
struct InMemoryState {
    accounts: HashMap<String, Account>,
    current: Option<ProviderUser>,
    fail_token_refresh: bool,
}

/// Keeps accounts in process memory and issues HS256 tokens. Useful for local
/// development and for exercising session handling without network access.
pub struct InMemoryIdentityProvider {
    state: Mutex<InMemoryState>,
    changes: broadcast::Sender<SessionChange>,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(InMemoryState::default()),
            changes,
        }
    }

    /// Makes subsequent `id_token` calls fail.
    pub async fn set_fail_token_refresh(&self, fail: bool) {
        self.state.lock().await.fail_token_refresh = fail;
    }

    fn issue_token(uid: &str, email: &str) -> Result<String, IdentityError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: uid.to_string(),
            email: Some(email.to_string()),
            name: None,
            picture: None,
            exp: Some((now + Duration::hours(1)).timestamp()),
            iat: Some(now.timestamp()),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(IN_MEMORY_SIGNING_KEY))
            .map_err(|e| IdentityError::TokenIssue(e.to_string()))
    }

    fn user_for(uid: &str, email: &str) -> Result<ProviderUser, IdentityError> {
        Ok(ProviderUser {
            uid: uid.to_string(),
            email: Some(email.to_string()),
            display_name: None,
            photo_url: None,
            id_token: Self::issue_token(uid, email)?,
        })
    }

    async fn sign_in_as(&self, user: ProviderUser) -> ProviderUser {
        self.state.lock().await.current = Some(user.clone());
        let _ = self.changes.send(Some(user.clone()));
        user
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderUser, IdentityError> {
        let user = {
            let mut state = self.state.lock().await;
            if state.accounts.contains_key(email) {
                return Err(IdentityError::Rejected("EMAIL_EXISTS".to_string()));
            }
            let uid = Uuid::new_v4().simple().to_string();
            state.accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    uid: uid.clone(),
                },
            );
            Self::user_for(&uid, email)?
        };
        info!(uid = %user.uid, "Account registered.");
        Ok(self.sign_in_as(user).await)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderUser, IdentityError> {
        let user = {
            let state = self.state.lock().await;
            match state.accounts.get(email) {
                Some(account) if account.password == password => Self::user_for(&account.uid, email)?,
                Some(_) => return Err(IdentityError::Rejected("INVALID_PASSWORD".to_string())),
                None => return Err(IdentityError::Rejected("EMAIL_NOT_FOUND".to_string())),
            }
        };
        Ok(self.sign_in_as(user).await)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.state.lock().await.current = None;
        let _ = self.changes.send(None);
        Ok(())
    }

    async fn current_user(&self) -> Option<ProviderUser> {
        self.state.lock().await.current.clone()
    }

    async fn id_token(&self, user: &ProviderUser) -> Result<String, IdentityError> {
        if self.state.lock().await.fail_token_refresh {
            return Err(IdentityError::TokenIssue("token refresh disabled".to_string()));
        }
        match &user.email {
            Some(email) => Self::issue_token(&user.uid, email),
            None => Ok(user.id_token.clone()),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }
}
