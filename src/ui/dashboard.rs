use tracing::error;
use uuid::Uuid;

use crate::client::{BookmarkClient, LinkUpdate};
use crate::db::entities::link;
use crate::services::identity_service::decode_token;
use crate::session::SessionState;
use crate::ui::forms::{EditLinkForm, LinkForm};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toast {
    Success(String),
    Error(String),
}

/// What the dashboard should render right now.
#[derive(Debug, PartialEq, Eq)]
pub enum DashboardView<'a> {
    SignInPrompt,
    Loading,
    Error(&'a str),
    Empty(&'static str),
    Links(Vec<&'a link::Model>),
}

/// State behind the "Your Links" page for one signed-in owner.
pub struct Dashboard {
    client: BookmarkClient,
    links: Vec<link::Model>,
    loading: bool,
    error: Option<String>,
    deleting_id: Option<Uuid>,
    search_term: String,
    toasts: Vec<Toast>,
}

impl Dashboard {
    pub fn new(client: BookmarkClient) -> Self {
        Self {
            client,
            links: Vec::new(),
            loading: true,
            error: None,
            deleting_id: None,
            search_term: String::new(),
            toasts: Vec::new(),
        }
    }

    pub fn links(&self) -> &[link::Model] {
        &self.links
    }

    pub fn deleting_id(&self) -> Option<Uuid> {
        self.deleting_id
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    /// Toasts raised since the last call.
    pub fn take_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }

    /// Case-insensitive match on name or URL.
    pub fn filtered(&self) -> Vec<&link::Model> {
        let needle = self.search_term.to_lowercase();
        self.links
            .iter()
            .filter(|l| {
                l.link_name.to_lowercase().contains(&needle)
                    || l.actual_link.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn view<'a>(&'a self, session: &SessionState) -> DashboardView<'a> {
        if !session.is_authenticated() {
            return DashboardView::SignInPrompt;
        }
        if self.loading || session.is_loading {
            return DashboardView::Loading;
        }
        if let Some(error) = &self.error {
            return DashboardView::Error(error);
        }
        let links = self.filtered();
        if links.is_empty() {
            let message = if self.search_term.is_empty() {
                "No links found. Start by adding some links!"
            } else {
                "No links found matching your search."
            };
            return DashboardView::Empty(message);
        }
        DashboardView::Links(links)
    }

    pub async fn refresh(&mut self, session: &SessionState) {
        self.loading = true;
        self.error = None;

        match session.profile.as_ref().map(|p| p.uid.as_str()) {
            Some(uid) if !uid.is_empty() => match self.client.fetch_links(uid).await {
                Ok(links) => self.links = links,
                Err(e) => {
                    error!(error = %e, "Error fetching links by user.");
                    self.error = Some(e.user_message());
                }
            },
            _ => self.error = Some("User ID is required".to_string()),
        }

        self.loading = false;
    }

    /// Validates the add-link form, creates the link for the token's subject
    /// and reloads the list.
    pub async fn add_link(&mut self, form: &LinkForm, session: &SessionState) -> Result<(), String> {
        let owner = match decode_token(&session.token) {
            Ok(claims) => Some(claims.sub),
            Err(_) => None,
        };
        let submission = form.validate(owner.as_deref())?;

        match self
            .client
            .create_link(&submission.user_id, &submission.link_name, &submission.actual_link)
            .await
        {
            Ok(_) => {
                self.toasts.push(Toast::Success("Link created successfully".to_string()));
                self.refresh(session).await;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Error adding link.");
                Err(match e.status() {
                    Some(_) => e.user_message(),
                    None => "Failed to add link. Please try again.".to_string(),
                })
            }
        }
    }

    pub async fn update_link(&mut self, link_id: Uuid, form: &EditLinkForm, session: &SessionState) {
        if let Err(message) = form.validate() {
            self.toasts.push(Toast::Error(message));
            return;
        }

        let update = LinkUpdate {
            link_name: Some(form.link_name.clone()),
            actual_link: Some(form.actual_link.clone()),
        };
        match self.client.update_link(link_id, &update).await {
            Ok(_) => {
                self.toasts.push(Toast::Success("Link updated successfully".to_string()));
                self.refresh(session).await;
            }
            Err(e) => {
                error!(error = %e, "Error updating link.");
                self.toasts.push(Toast::Error("Failed to update link".to_string()));
            }
        }
    }

    pub async fn delete_link(&mut self, link_id: Uuid) {
        self.deleting_id = Some(link_id);

        match self.client.delete_link(link_id).await {
            Ok(_) => {
                self.links.retain(|l| l.id != link_id);
                self.toasts.push(Toast::Success("Link deleted successfully".to_string()));
            }
            Err(e) => {
                error!(error = %e, "Error deleting link.");
                self.toasts.push(Toast::Error("Failed to delete link. Please try again.".to_string()));
            }
        }

        self.deleting_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::spawn_api;
    use crate::services::identity_service::{IdentityProvider, InMemoryIdentityProvider};
    use crate::session::UserProfile;

    async fn signed_in() -> SessionState {
        let provider = InMemoryIdentityProvider::new();
        let user = provider.sign_up("a@example.com", "secret1").await.unwrap();
        SessionState {
            token: user.id_token.clone(),
            profile: Some(UserProfile::from(&user)),
            is_loading: false,
        }
    }

    #[tokio::test]
    async fn test_signed_out_sees_prompt() {
        let dashboard = Dashboard::new(BookmarkClient::new("http://127.0.0.1:9"));
        assert_eq!(dashboard.view(&SessionState::default()), DashboardView::SignInPrompt);
    }

    #[tokio::test]
    async fn test_add_search_edit_delete() {
        let session = signed_in().await;
        let mut dashboard = Dashboard::new(BookmarkClient::new(spawn_api().await));
        assert_eq!(dashboard.view(&session), DashboardView::Loading);

        dashboard.refresh(&session).await;
        assert_eq!(
            dashboard.view(&session),
            DashboardView::Empty("No links found. Start by adding some links!")
        );

        dashboard
            .add_link(&LinkForm::new("Rust Docs", "https://docs.rs"), &session)
            .await
            .unwrap();
        dashboard
            .add_link(&LinkForm::new("Crates", "https://crates.io"), &session)
            .await
            .unwrap();
        assert_eq!(dashboard.links().len(), 2);
        assert_eq!(dashboard.links()[0].link_name, "Crates");
        let owner = session.profile.as_ref().unwrap().uid.clone();
        assert!(dashboard.links().iter().all(|l| l.user_id == owner));

        dashboard.set_search_term("DOCS");
        match dashboard.view(&session) {
            DashboardView::Links(links) => {
                assert_eq!(links.len(), 1);
                assert_eq!(links[0].link_name, "Rust Docs");
            }
            other => panic!("unexpected view {other:?}"),
        }
        dashboard.set_search_term("nothing-matches");
        assert_eq!(
            dashboard.view(&session),
            DashboardView::Empty("No links found matching your search.")
        );
        dashboard.set_search_term("");

        let docs_id = dashboard.links()[1].id;
        let edit = EditLinkForm {
            link_name: "docs.rs".to_string(),
            actual_link: "https://docs.rs/".to_string(),
        };
        dashboard.update_link(docs_id, &edit, &session).await;
        assert!(dashboard.links().iter().any(|l| l.link_name == "docs.rs"));

        dashboard.delete_link(docs_id).await;
        assert_eq!(dashboard.links().len(), 1);
        assert!(dashboard.deleting_id().is_none());

        dashboard.delete_link(docs_id).await;
        let toasts = dashboard.take_toasts();
        assert_eq!(
            toasts.last(),
            Some(&Toast::Error("Failed to delete link. Please try again.".to_string()))
        );
        assert!(toasts.contains(&Toast::Success("Link updated successfully".to_string())));
    }

    #[tokio::test]
    async fn test_add_link_rejects_invalid_input_locally() {
        let session = signed_in().await;
        let mut dashboard = Dashboard::new(BookmarkClient::new("http://127.0.0.1:9"));

        let err = dashboard
            .add_link(&LinkForm::new("docs", "docs.rs"), &session)
            .await
            .unwrap_err();
        assert_eq!(err, "Please enter a valid URL (include http:// or https://)");

        let signed_out = SessionState::default();
        let err = dashboard
            .add_link(&LinkForm::new("docs", "https://docs.rs"), &signed_out)
            .await
            .unwrap_err();
        assert_eq!(err, "User ID not found. Please try logging in again.");
    }
}
