use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::db::models::ShareDetails;
use crate::error::AppResult;
use crate::routes::auth::AdminUser;
use crate::services::shares::{parse_new_share, parse_share_update, ShareLedger};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_shares).post(create_share))
        .route(
            "/:id",
            get(get_share).put(update_share).delete(delete_share),
        )
}

async fn list_shares(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<Vec<ShareDetails>>> {
    Ok(Json(ShareLedger::new(&state).list_all().await?))
}

async fn get_share(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ShareDetails>> {
    Ok(Json(ShareLedger::new(&state).get(id).await?))
}

async fn create_share(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let new_share = parse_new_share(&body)?;
    let share = ShareLedger::new(&state).create(new_share).await?;
    tracing::debug!("Share {} created by admin {}", share.id, admin.id);
    Ok((StatusCode::CREATED, Json(share)))
}

async fn update_share(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> AppResult<Json<ShareDetails>> {
    let percentage = parse_share_update(&body)?;
    Ok(Json(ShareLedger::new(&state).update(id, percentage).await?))
}

async fn delete_share(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    ShareLedger::new(&state).delete(id).await?;
    Ok(Json(
        serde_json::json!({ "message": crate::i18n::t("share.deleted") }),
    ))
}
