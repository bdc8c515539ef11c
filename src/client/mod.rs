//! Typed HTTP client for the bookmark API, one request per call.

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::db::entities::link;
use crate::web::models::{ApiResponse, CreatedLink, LinkEnvelope, LinkList};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message} (status {status})")]
    Api { status: StatusCode, message: String },
}

impl ClientError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Http(_) => "Could not reach the server. Please try again.".to_string(),
            ClientError::Api { message, .. } => message.clone(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http(e) => e.status(),
            ClientError::Api { status, .. } => Some(*status),
        }
    }
}

/// Changes to apply to a link; unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_link: Option<String>,
}

#[derive(Clone)]
pub struct BookmarkClient {
    http: reqwest::Client,
    base_url: String,
}

impl BookmarkClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn create_link(
        &self,
        user_id: &str,
        link_name: &str,
        actual_link: &str,
    ) -> Result<link::Model, ClientError> {
        let body = serde_json::json!({
            "userId": user_id,
            "linkName": link_name,
            "actualLink": actual_link,
        });
        let created: ApiResponse<CreatedLink> =
            self.send(Method::POST, "/api/createLink", None, Some(&body)).await?;
        Ok(created.data.link)
    }

    pub async fn fetch_links(&self, user_id: &str) -> Result<Vec<link::Model>, ClientError> {
        let list: ApiResponse<LinkList> = self
            .send::<LinkList, Value>(Method::GET, "/api/FetchLinks", Some(("userId", user_id)), None)
            .await?;
        Ok(list.data.links)
    }

    pub async fn update_link(
        &self,
        link_id: Uuid,
        update: &LinkUpdate,
    ) -> Result<link::Model, ClientError> {
        let mut body = match serde_json::to_value(update) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        body.insert("linkId".to_string(), Value::String(link_id.to_string()));

        let updated: ApiResponse<LinkEnvelope> = self
            .send(Method::PATCH, "/api/updateLink", None, Some(&Value::Object(body)))
            .await?;
        Ok(updated.data.link)
    }

    pub async fn delete_link(&self, link_id: Uuid) -> Result<link::Model, ClientError> {
        let body = serde_json::json!({ "linkId": link_id });
        let deleted: ApiResponse<LinkEnvelope> =
            self.send(Method::DELETE, "/api/deleteLink", None, Some(&body)).await?;
        Ok(deleted.data.link)
    }

    async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<(&str, &str)>,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "Sending API request.");

        let mut request = self.http.request(method, url);
        if let Some(query) = query {
            request = request.query(&[query]);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| {
                body.get("message")
                    .or_else(|| body.get("error"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| status.to_string());
        Err(ClientError::Api { status, message })
    }
}
