use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::db::models::ApartmentView;
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::routes::auth::{AdminUser, AuthUser};
use crate::services::apartments::{ApartmentDetails, ApartmentService};
use crate::services::shares::{parse_shareholders, ShareLedger};
use crate::services::uploads::UploadStore;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_apartments).post(create_apartment))
        .route("/upload-image", post(upload_image))
        .route(
            "/:id",
            get(get_apartment)
                .put(update_apartment)
                .delete(delete_apartment),
        )
        .route("/:id/shares", put(replace_apartment_shares))
}

async fn list_apartments(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> AppResult<Json<Vec<ApartmentView>>> {
    Ok(Json(ApartmentService::list(&state).await?))
}

/// Any authenticated user may read an apartment with its shareholders.
async fn get_apartment(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApartmentDetails>> {
    Ok(Json(ApartmentService::get(&state, id).await?))
}

async fn create_apartment(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let apartment = ApartmentService::create(&state, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": i18n::t("apartment.created"), "apartment": apartment })),
    ))
}

async fn update_apartment(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    let apartment = ApartmentService::update(&state, id, &body).await?;
    Ok(Json(
        json!({ "message": i18n::t("apartment.updated"), "apartment": apartment }),
    ))
}

async fn delete_apartment(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    ApartmentService::delete(&state, id).await?;
    Ok(Json(json!({ "message": i18n::t("apartment.deleted") })))
}

/// Multipart upload with the picture in the `image` field.
async fn upload_image(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        tracing::debug!("Malformed multipart body: {}", e);
        AppError::BadRequest(e.body_text())
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(invalid)?;

        let stored = UploadStore::new(&state.config.storage.uploads_dir)
            .save_upload(file_name.as_deref(), content_type.as_deref(), &bytes)
            .await?;

        return Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": i18n::t("apartment.image_uploaded"),
                "filename": stored.filename,
                "path": stored.path,
                "size": stored.size,
            })),
        ));
    }

    Err(AppError::invalid_field(
        "image",
        i18n::t("validation.image_missing"),
    ))
}

/// `{shareholders: [{userId, percentage}]}` replaces every share of the apartment.
async fn replace_apartment_shares(
    State(state): State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    let entries = parse_shareholders(&body)?;
    let shares = ShareLedger::new(&state)
        .replace_for_apartment(id, &entries)
        .await?;
    Ok(Json(json!({
        "message": i18n::t("share.apartment_updated"),
        "shares": shares,
    })))
}
