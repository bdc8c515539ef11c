use axum::{
    Json, Router,
    extract::{Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tracing::info;

use crate::db::services::LinkService;
use crate::web::models::{
    ApiResponse, CreateLinkRequest, CreatedLink, DeleteLinkRequest, LinkEnvelope, LinkList,
    ListLinksQuery, PatchLinkRequest,
};
use crate::web::{AppError, AppState};

pub fn link_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/createLink", post(create_link))
        .route("/FetchLinks", get(fetch_links))
        .route("/updateLink", patch(update_link))
        .route("/deleteLink", delete(delete_link))
}

async fn create_link(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedLink>>), AppError> {
    let Json(payload) = payload?;
    let new_link = payload.validate()?;

    let link = LinkService::create_link(
        &app_state.db_pool,
        new_link.user_id,
        new_link.link_name,
        new_link.actual_link,
    )
    .await?;
    info!(link_id = %link.id, user_id = %link.user_id, "Link created.");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Link created successfully",
            CreatedLink {
                link_id: link.id,
                link,
            },
        )),
    ))
}

async fn fetch_links(
    State(app_state): State<Arc<AppState>>,
    query: Result<Query<ListLinksQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<LinkList>>, AppError> {
    let Query(query) = query?;
    let user_id = query
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidInput("User ID is required".to_string()))?;

    let links = LinkService::get_links_by_user(&app_state.db_pool, &user_id).await?;
    Ok(Json(ApiResponse::ok(
        "Links fetched successfully",
        LinkList { links },
    )))
}

async fn update_link(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<PatchLinkRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LinkEnvelope>>, AppError> {
    let Json(payload) = payload?;
    let (link_id, patch) = payload.validate()?;

    let link = LinkService::update_link(&app_state.db_pool, link_id, patch).await?;
    info!(link_id = %link.id, "Link patched.");

    Ok(Json(ApiResponse::ok(
        "Link patched successfully",
        LinkEnvelope { link },
    )))
}

async fn delete_link(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<DeleteLinkRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LinkEnvelope>>, AppError> {
    let Json(payload) = payload?;
    let link_id = payload.validate()?;

    let link = LinkService::delete_link(&app_state.db_pool, link_id).await?;
    info!(link_id = %link.id, "Link deleted.");

    Ok(Json(ApiResponse::ok(
        "Link deleted successfully",
        LinkEnvelope { link },
    )))
}
