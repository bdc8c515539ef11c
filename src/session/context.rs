use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::services::identity_service::{IdentityProvider, ProviderUser, SessionChange};
use crate::session::{
    PROFILE_KEY, SessionError, SessionState, SessionStore, TOKEN_KEY, UserProfile,
};

struct SessionInner {
    state: watch::Sender<SessionState>,
    store: Arc<dyn SessionStore>,
}

/// Process-wide observable session. Construct once with [`SessionContext::start`]
/// and share it; dropping it (or calling [`SessionContext::shutdown`]) stops
/// listening to the identity provider.
pub struct SessionContext {
    inner: Arc<SessionInner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionContext {
    /// Hydrates from `store` synchronously, then follows `provider` on a
    /// background task. Must be called inside a Tokio runtime.
    pub fn start(store: Arc<dyn SessionStore>, provider: Arc<dyn IdentityProvider>) -> Self {
        let hydrated = hydrate(store.as_ref());
        let (state, _) = watch::channel(SessionState {
            is_loading: true,
            ..hydrated
        });
        let inner = Arc::new(SessionInner { state, store });

        // Subscribe before the task starts so no change slips through.
        let changes = provider.subscribe();
        let listener = tokio::spawn(inner.clone().listen(provider, changes));

        Self {
            inner,
            listener: Mutex::new(Some(listener)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Resolves once no session change is in flight.
    pub async fn ready(&self) -> SessionState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !s.is_loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Overrides the in-memory token. Storage follows the next provider notification.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        self.inner.state.send_modify(|s| s.token = token);
    }

    pub fn set_profile(&self, profile: Option<UserProfile>) {
        self.inner.state.send_modify(|s| s.profile = profile);
    }

    /// Drops the session locally and from storage, as on logout.
    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn shutdown(&self) {
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn hydrate(store: &dyn SessionStore) -> SessionState {
    let load = || -> Result<SessionState, SessionError> {
        let token = store.get(TOKEN_KEY)?.unwrap_or_default();
        let profile = match store.get(PROFILE_KEY)? {
            Some(raw) => Some(serde_json::from_str::<UserProfile>(&raw)?),
            None => None,
        };
        Ok(SessionState {
            token,
            profile,
            is_loading: false,
        })
    };

    match load() {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "Error loading saved session; clearing it.");
            remove_saved(store);
            SessionState::default()
        }
    }
}

fn remove_saved(store: &dyn SessionStore) {
    for key in [TOKEN_KEY, PROFILE_KEY] {
        if let Err(e) = store.remove(key) {
            warn!(key, error = %e, "Failed to remove saved session entry.");
        }
    }
}

impl SessionInner {
    async fn listen(
        self: Arc<Self>,
        provider: Arc<dyn IdentityProvider>,
        mut changes: broadcast::Receiver<SessionChange>,
    ) {
        // A session the provider already holds replaces whatever was stored.
        match provider.current_user().await {
            Some(user) => self.apply(provider.as_ref(), Some(user)).await,
            None => self.state.send_modify(|s| s.is_loading = false),
        }

        loop {
            match changes.recv().await {
                Ok(change) => self.apply(provider.as_ref(), change).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session listener lagged behind the identity provider.");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Identity provider closed its session stream.");
                    break;
                }
            }
        }
    }

    async fn apply(&self, provider: &dyn IdentityProvider, change: SessionChange) {
        self.state.send_modify(|s| s.is_loading = true);

        let outcome = match change {
            Some(user) => self.store_user(provider, &user).await,
            None => {
                self.clear();
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!(error = %e, "Error handling session change; signing out locally.");
            self.clear();
        }

        self.state.send_modify(|s| s.is_loading = false);
    }

    async fn store_user(
        &self,
        provider: &dyn IdentityProvider,
        user: &ProviderUser,
    ) -> Result<(), SessionError> {
        let token = provider.id_token(user).await?;
        let profile = UserProfile::from(user);
        let profile_json = serde_json::to_string(&profile)?;

        self.state.send_modify(|s| {
            s.token = token.clone();
            s.profile = Some(profile);
        });
        self.store.set(TOKEN_KEY, &token)?;
        self.store.set(PROFILE_KEY, &profile_json)?;
        Ok(())
    }

    fn clear(&self) {
        self.state.send_modify(|s| {
            s.token.clear();
            s.profile = None;
        });
        remove_saved(self.store.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::identity_service::InMemoryIdentityProvider;
    use crate::session::MemorySessionStore;
    use std::time::Duration;
    use tokio::time::timeout;

    fn profile(uid: &str) -> UserProfile {
        UserProfile {
            uid: uid.to_string(),
            email: Some(format!("{uid}@example.com")),
            display_name: None,
            photo_url: None,
        }
    }

    async fn settle<F>(session: &SessionContext, done: F) -> SessionState
    where
        F: Fn(&SessionState) -> bool,
    {
        let mut rx = session.subscribe();
        let state = timeout(
            Duration::from_secs(2),
            rx.wait_for(|s| !s.is_loading && done(s)),
        )
        .await
        .expect("session did not settle")
        .expect("session sender dropped");
        state.clone()
    }

    #[tokio::test]
    async fn test_hydrates_from_storage() {
        let store = Arc::new(MemorySessionStore::new());
        store.set(TOKEN_KEY, "saved-token").unwrap();
        store
            .set(PROFILE_KEY, &serde_json::to_string(&profile("u1")).unwrap())
            .unwrap();

        let session = SessionContext::start(store, Arc::new(InMemoryIdentityProvider::new()));
        let state = session.ready().await;

        assert_eq!(state.token, "saved-token");
        assert_eq!(state.profile, Some(profile("u1")));
        assert!(state.is_authenticated());
    }

    #[tokio::test]
    async fn test_corrupt_storage_is_cleared() {
        let store = Arc::new(MemorySessionStore::new());
        store.set(TOKEN_KEY, "saved-token").unwrap();
        store.set(PROFILE_KEY, "{broken").unwrap();

        let session = SessionContext::start(store.clone(), Arc::new(InMemoryIdentityProvider::new()));
        let state = session.ready().await;

        assert_eq!(state, SessionState::default());
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(PROFILE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_follows_sign_in_and_sign_out() {
        let store = Arc::new(MemorySessionStore::new());
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let session = SessionContext::start(store.clone(), provider.clone());
        session.ready().await;

        let user = provider.sign_up("a@example.com", "secret1").await.unwrap();
        let state = settle(&session, |s| s.profile.is_some()).await;
        assert_eq!(state.profile.as_ref().map(|p| p.uid.as_str()), Some(user.uid.as_str()));
        assert!(!state.token.is_empty());
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some(state.token.as_str()));
        let saved: UserProfile = serde_json::from_str(&store.get(PROFILE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(saved.uid, user.uid);

        provider.sign_out().await.unwrap();
        let state = settle(&session, |s| s.profile.is_none()).await;
        assert!(!state.is_authenticated());
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.get(PROFILE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_token_failure_signs_out_locally() {
        let store = Arc::new(MemorySessionStore::new());
        store.set(TOKEN_KEY, "stale").unwrap();
        let provider = Arc::new(InMemoryIdentityProvider::new());
        provider.sign_up("a@example.com", "secret1").await.unwrap();
        provider.set_fail_token_refresh(true).await;

        let session = SessionContext::start(store.clone(), provider.clone());
        let state = session.ready().await;

        assert_eq!(state, SessionState::default());
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_shutdown_stops_listening() {
        let store = Arc::new(MemorySessionStore::new());
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let session = SessionContext::start(store, provider.clone());
        session.ready().await;

        session.shutdown();
        tokio::time::sleep(Duration::from_millis(20)).await;
        provider.sign_up("a@example.com", "secret1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!session.state().is_authenticated());
    }

    #[tokio::test]
    async fn test_explicit_overrides() {
        let session = SessionContext::start(
            Arc::new(MemorySessionStore::new()),
            Arc::new(InMemoryIdentityProvider::new()),
        );
        session.ready().await;
        session.set_token("manual");
        session.set_profile(Some(profile("u9")));

        let state = session.state();
        assert_eq!(state.token, "manual");
        assert_eq!(state.profile, Some(profile("u9")));
    }
}
