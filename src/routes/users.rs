use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::i18n;
use crate::routes::auth::AdminUser;
use crate::services::shares::{parse_user_shares, ShareLedger};
use crate::services::users::{UserDetails, UserPage, UserService, UsernameAvailability};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users))
        .route("/register", post(register_user))
        .route("/check-username", post(check_username))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/shares", put(replace_user_shares))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<UserPage>> {
    let page = query.page.unwrap_or(1);
    Ok(Json(UserService::list(&state, page).await?))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
) -> AppResult<Json<UserDetails>> {
    Ok(Json(UserService::get(&state, id).await?))
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let user = UserService::register(&state, &body).await?;
    tracing::debug!("User {} registered by admin {}", user.id, admin.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": i18n::t("user.created"), "user": user })),
    ))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    let user = UserService::update(&state, id, &body).await?;
    Ok(Json(
        json!({ "message": i18n::t("user.updated"), "user": user }),
    ))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    UserService::delete(&state, id).await?;
    tracing::debug!("User {} deleted by admin {}", id, admin.id);
    Ok(Json(json!({ "message": i18n::t("user.deleted") })))
}

async fn check_username(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(body): Json<Value>,
) -> AppResult<Json<UsernameAvailability>> {
    Ok(Json(UserService::check_username(&state, &body).await?))
}

/// `{shares: [{apartmentId, percentage}]}` replaces every share of the user.
async fn replace_user_shares(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    let entries = parse_user_shares(&body)?;
    let shares = ShareLedger::new(&state).replace_for_user(id, &entries).await?;
    Ok(Json(json!({
        "message": i18n::t("share.user_updated"),
        "shares": shares,
    })))
}
