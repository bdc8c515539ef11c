use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::db::entities::link;
use crate::db::services::LinkPatch;
use crate::web::error::AppError;

/// Every successful response carries `success` and `message` next to its payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

// --- Requests ---

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    pub link_name: Option<String>,
    pub actual_link: Option<String>,
    pub user_id: Option<String>,
}

/// A fully validated create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub link_name: String,
    pub actual_link: String,
    pub user_id: String,
}

impl CreateLinkRequest {
    pub fn validate(self) -> Result<NewLink, AppError> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if !(present(&self.link_name) && present(&self.actual_link) && present(&self.user_id)) {
            return Err(AppError::MissingFields {
                received: json!({
                    "linkName": self.link_name,
                    "actualLink": self.actual_link,
                    "userId": self.user_id,
                }),
            });
        }
        Ok(NewLink {
            link_name: self.link_name.unwrap_or_default(),
            actual_link: self.actual_link.unwrap_or_default(),
            user_id: self.user_id.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLinksQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// `linkId` plus whatever fields the caller wants changed.
#[derive(Debug, Default, Deserialize)]
pub struct PatchLinkRequest {
    #[serde(rename = "linkId")]
    pub link_id: Option<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

const PATCHABLE_FIELDS: [&str; 2] = ["linkName", "actualLink"];

impl PatchLinkRequest {
    /// Unknown keys, `userId` included, are dropped: the owner never changes.
    pub fn validate(self) -> Result<(Uuid, LinkPatch), AppError> {
        let raw_id = require_link_id(self.link_id)?;

        let updates: Vec<(&str, &Value)> = PATCHABLE_FIELDS
            .iter()
            .filter_map(|name| self.fields.get(*name).map(|value| (*name, value)))
            .collect();
        if updates.is_empty() {
            return Err(AppError::InvalidInput("No update data provided".to_string()));
        }

        let link_id = parse_link_id(&raw_id)?;

        let mut patch = LinkPatch::default();
        let mut errors = Map::new();
        for (name, value) in updates {
            match value.as_str() {
                Some(s) if !s.is_empty() => {
                    let s = s.to_string();
                    if name == "linkName" {
                        patch.link_name = Some(s);
                    } else {
                        patch.actual_link = Some(s);
                    }
                }
                Some(_) => {
                    errors.insert(name.to_string(), json!(format!("Path `{name}` is required.")));
                }
                None => {
                    errors.insert(name.to_string(), json!(format!("Path `{name}` must be a string.")));
                }
            }
        }
        if !errors.is_empty() {
            return Err(AppError::ValidationFailed {
                details: Value::Object(errors),
            });
        }

        Ok((link_id, patch))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteLinkRequest {
    #[serde(rename = "linkId")]
    pub link_id: Option<Value>,
}

impl DeleteLinkRequest {
    pub fn validate(self) -> Result<Uuid, AppError> {
        let raw_id = require_link_id(self.link_id)?;
        parse_link_id(&raw_id)
    }
}

fn require_link_id(link_id: Option<Value>) -> Result<Value, AppError> {
    match link_id {
        None | Some(Value::Null) => Err(AppError::InvalidInput("Link ID is required".to_string())),
        Some(Value::String(id)) if id.is_empty() => {
            Err(AppError::InvalidInput("Link ID is required".to_string()))
        }
        Some(id) => Ok(id),
    }
}

/// Anything other than a UUID string, numbers included, is a malformed id.
fn parse_link_id(raw: &Value) -> Result<Uuid, AppError> {
    raw.as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or(AppError::InvalidId)
}

// --- Responses ---

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedLink {
    pub link_id: Uuid,
    pub link: link::Model,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkList {
    pub links: Vec<link::Model>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkEnvelope {
    pub link: link::Model,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(body: Value) -> Result<(Uuid, LinkPatch), AppError> {
        serde_json::from_value::<PatchLinkRequest>(body).unwrap().validate()
    }

    #[test]
    fn test_create_rejects_empty_and_missing_fields() {
        let req: CreateLinkRequest =
            serde_json::from_value(json!({ "linkName": "docs", "actualLink": "" })).unwrap();
        match req.validate() {
            Err(AppError::MissingFields { received }) => {
                assert_eq!(received["linkName"], "docs");
                assert_eq!(received["userId"], Value::Null);
            }
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn test_create_accepts_complete_request() {
        let req: CreateLinkRequest = serde_json::from_value(json!({
            "linkName": "docs",
            "actualLink": "https://docs.rs",
            "userId": "uid-1",
        }))
        .unwrap();
        let new_link = req.validate().unwrap();
        assert_eq!(new_link.user_id, "uid-1");
    }

    #[test]
    fn test_patch_requires_link_id_then_fields() {
        assert!(matches!(
            patch(json!({ "linkName": "x" })),
            Err(AppError::InvalidInput(msg)) if msg == "Link ID is required"
        ));
        assert!(matches!(
            patch(json!({ "linkId": Uuid::new_v4(), "userId": "uid-1" })),
            Err(AppError::InvalidInput(msg)) if msg == "No update data provided"
        ));
    }

    #[test]
    fn test_patch_ignores_owner_and_unknown_keys() {
        let id = Uuid::new_v4();
        let (link_id, link_patch) = patch(json!({
            "linkId": id.to_string(),
            "actualLink": "https://new.example",
            "userId": "someone-else",
            "color": "red",
        }))
        .unwrap();
        assert_eq!(link_id, id);
        assert_eq!(
            link_patch,
            LinkPatch {
                link_name: None,
                actual_link: Some("https://new.example".to_string()),
            }
        );
    }

    #[test]
    fn test_patch_rejects_bad_values_and_ids() {
        assert!(matches!(
            patch(json!({ "linkId": "not-a-uuid", "linkName": "x" })),
            Err(AppError::InvalidId)
        ));
        match patch(json!({ "linkId": Uuid::new_v4(), "linkName": "", "actualLink": 5 })) {
            Err(AppError::ValidationFailed { details }) => {
                assert!(details.get("linkName").is_some());
                assert!(details.get("actualLink").is_some());
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_delete_validation() {
        assert!(matches!(
            DeleteLinkRequest::default().validate(),
            Err(AppError::InvalidInput(_))
        ));
        let id = Uuid::new_v4();
        let req = DeleteLinkRequest {
            link_id: Some(json!(id.to_string())),
        };
        assert_eq!(req.validate().unwrap(), id);
    }

    #[test]
    fn test_non_string_link_id_is_invalid_format() {
        assert!(matches!(
            patch(json!({ "linkId": 123, "linkName": "x" })),
            Err(AppError::InvalidId)
        ));
        let req: DeleteLinkRequest =
            serde_json::from_value(json!({ "linkId": { "id": "x" } })).unwrap();
        assert!(matches!(req.validate(), Err(AppError::InvalidId)));
        let req: DeleteLinkRequest = serde_json::from_value(json!({ "linkId": null })).unwrap();
        assert!(matches!(req.validate(), Err(AppError::InvalidInput(_))));
    }
}
