use tracing::{error, info};

use crate::services::identity_service::{IdentityProvider, ProviderUser};
use crate::session::{SessionContext, UserProfile};
use crate::ui::forms::AuthForm;

pub const LOGIN_PATH: &str = "/Auth/login";
pub const REGISTER_PATH: &str = "/Auth/Register";

/// Where to go after authenticating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub uid: String,
    pub redirect_to: String,
}

pub fn dashboard_path(uid: &str) -> String {
    format!("/pages/Dashboard/{uid}")
}

pub async fn register(
    form: &AuthForm,
    provider: &dyn IdentityProvider,
    session: &SessionContext,
) -> Result<AuthOutcome, String> {
    form.validate()?;
    let user = provider
        .sign_up(&form.email, &form.password)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create user.");
            "Failed to create user. Please try again.".to_string()
        })?;
    adopt_user(provider, session, &user).await
}

pub async fn login(
    form: &AuthForm,
    provider: &dyn IdentityProvider,
    session: &SessionContext,
) -> Result<AuthOutcome, String> {
    form.validate()?;
    let user = provider
        .sign_in(&form.email, &form.password)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to sign in.");
            "Failed to sign in. Please check your credentials and try again.".to_string()
        })?;
    adopt_user(provider, session, &user).await
}

/// Signs out with the provider, then drops the local session. Returns the
/// path to show next.
pub async fn logout(provider: &dyn IdentityProvider, session: &SessionContext) -> &'static str {
    if let Err(e) = provider.sign_out().await {
        error!(error = %e, "Logout error.");
    }
    session.clear();
    LOGIN_PATH
}

async fn adopt_user(
    provider: &dyn IdentityProvider,
    session: &SessionContext,
    user: &ProviderUser,
) -> Result<AuthOutcome, String> {
    let token = provider.id_token(user).await.map_err(|e| {
        error!(error = %e, "Failed to fetch ID token.");
        "Failed to fetch session token. Please try again.".to_string()
    })?;
    session.set_profile(Some(UserProfile::from(user)));
    session.set_token(token);
    info!(uid = %user.uid, "User authenticated.");

    Ok(AuthOutcome {
        uid: user.uid.clone(),
        redirect_to: dashboard_path(&user.uid),
    })
}
