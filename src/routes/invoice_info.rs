use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::db::models::InvoiceInfo;
use crate::error::AppResult;
use crate::routes::auth::{AdminUser, AuthUser};
use crate::services::invoice_infos::InvoiceInfoService;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_invoice_infos).post(create_invoice_info))
        .route(
            "/:id",
            get(get_invoice_info)
                .put(update_invoice_info)
                .delete(delete_invoice_info),
        )
}

async fn list_invoice_infos(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<Vec<InvoiceInfo>>> {
    Ok(Json(InvoiceInfoService::list(&state).await?))
}

async fn create_invoice_info(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let info = InvoiceInfoService::create(&state, &body).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

// Owner-or-admin checks happen in the service.

async fn get_invoice_info(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<InvoiceInfo>> {
    Ok(Json(InvoiceInfoService::get(&state, &user, id).await?))
}

async fn update_invoice_info(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> AppResult<Json<InvoiceInfo>> {
    Ok(Json(
        InvoiceInfoService::update(&state, &user, id, &body).await?,
    ))
}

async fn delete_invoice_info(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    InvoiceInfoService::delete(&state, &user, id).await?;
    Ok(Json(
        json!({ "message": crate::i18n::t("invoice_info.deleted") }),
    ))
}
