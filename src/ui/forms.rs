use reqwest::Url;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Email/password form shared by the login and register views.
#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
}

impl AuthForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err("Please fill in all fields".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            ));
        }
        Ok(())
    }
}

/// The add-link dialog.
#[derive(Debug, Clone, Default)]
pub struct LinkForm {
    pub link_name: String,
    pub actual_link: String,
}

/// Trimmed, checked input ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSubmission {
    pub user_id: String,
    pub link_name: String,
    pub actual_link: String,
}

impl LinkForm {
    pub fn new(link_name: impl Into<String>, actual_link: impl Into<String>) -> Self {
        Self {
            link_name: link_name.into(),
            actual_link: actual_link.into(),
        }
    }

    pub fn validate(&self, user_id: Option<&str>) -> Result<LinkSubmission, String> {
        let link_name = self.link_name.trim();
        let actual_link = self.actual_link.trim();

        if link_name.is_empty() {
            return Err("Link name is required".to_string());
        }
        if actual_link.is_empty() {
            return Err("Actual link is required".to_string());
        }
        if Url::parse(actual_link).is_err() {
            return Err("Please enter a valid URL (include http:// or https://)".to_string());
        }
        let user_id = match user_id {
            Some(id) if !id.is_empty() => id,
            _ => return Err("User ID not found. Please try logging in again.".to_string()),
        };

        Ok(LinkSubmission {
            user_id: user_id.to_string(),
            link_name: link_name.to_string(),
            actual_link: actual_link.to_string(),
        })
    }
}

/// The edit-link dialog; both fields are required.
#[derive(Debug, Clone, Default)]
pub struct EditLinkForm {
    pub link_name: String,
    pub actual_link: String,
}

impl EditLinkForm {
    pub fn validate(&self) -> Result<(), String> {
        if self.link_name.is_empty() || self.actual_link.is_empty() {
            return Err("Please fill in all fields".to_string());
        }
        Ok(())
    }
}
