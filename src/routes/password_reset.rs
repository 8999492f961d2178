use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::services::password_reset::{PasswordResetService, TokenCheck};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/request", post(request_reset))
        .route("/verify", post(verify_token))
        .route("/reset", post(reset_password))
}

#[derive(Debug, Deserialize)]
pub struct ResetRequestBody {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetBody {
    pub token: Option<String>,
    pub password: Option<String>,
}

async fn request_reset(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetRequestBody>,
) -> AppResult<Json<Value>> {
    let message = PasswordResetService::request(&state, body.email.as_deref()).await?;
    Ok(Json(json!({ "message": message })))
}

async fn verify_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyBody>,
) -> AppResult<Json<TokenCheck>> {
    Ok(Json(
        PasswordResetService::verify(&state, body.token.as_deref()).await?,
    ))
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetBody>,
) -> AppResult<Json<Value>> {
    let message =
        PasswordResetService::reset(&state, body.token.as_deref(), body.password.as_deref())
            .await?;
    Ok(Json(json!({ "message": message })))
}
