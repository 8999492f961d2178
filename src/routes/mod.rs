pub mod apartments;
pub mod auth;
pub mod health;
pub mod invoice_info;
pub mod password_reset;
pub mod shares;
pub mod users;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::csp::csp_middleware;
use crate::services::uploads::PUBLIC_PREFIX;
use crate::AppState;

/// Token-less endpoints: login, refresh and the password reset flow.
pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth::public_router())
        .nest("/password-reset", password_reset::router())
}

/// Endpoints guarded by the `AuthUser` / `AdminUser` extractors.
pub fn protected_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth::router())
        .nest("/users", users::router())
        .nest("/apartments", apartments::router())
        .nest("/shares", shares::router())
        .nest("/invoice_infos", invoice_info::router())
}

/// Assemble the application. `public` is passed in so the caller can wrap it
/// in a rate limiter; CORS is likewise added by the caller.
pub fn app(state: Arc<AppState>, public: Router<Arc<AppState>>) -> Router {
    let uploads = ServeDir::new(&state.config.storage.uploads_dir);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", public.merge(protected_router()))
        .nest_service(PUBLIC_PREFIX, uploads)
        .with_state(state)
        .layer(axum::middleware::from_fn(csp_middleware))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::ROLE_ADMIN;
    use crate::test_support::{
        bearer, png_bytes, seed_apartment, seed_user, test_state, test_state_with_mailer,
        RecordingMailer, TEST_PASSWORD,
    };
    use axum::body::Body;
    use http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app(state: &Arc<AppState>) -> Router {
        app(state.clone(), public_router())
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_database() {
        let state = test_state().await;
        let (status, body) = send(&test_app(&state), Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "ok");
    }

    #[tokio::test]
    async fn responses_carry_security_headers() {
        let state = test_state().await;
        let response = test_app(&state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("content-security-policy"));
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn share_endpoints_require_an_admin() {
        let state = test_state().await;
        let app = test_app(&state);
        let user = seed_user(&state.db, "owner", &[]).await;

        let (status, body) = send(&app, Method::GET, "/api/shares", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _) = send(
            &app,
            Method::GET,
            "/api/shares",
            Some("Bearer not-a-jwt"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            Method::GET,
            "/api/shares",
            Some(&bearer(&state, &user)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn share_lifecycle_over_http() {
        let state = test_state().await;
        let app = test_app(&state);
        let admin = seed_user(&state.db, "admin", &[ROLE_ADMIN]).await;
        let auth = bearer(&state, &admin);
        let u1 = seed_user(&state.db, "first", &[]).await;
        let u2 = seed_user(&state.db, "second", &[]).await;
        let apartment = seed_apartment(&state.db, "Dune").await;

        let (status, share) = send(
            &app,
            Method::POST,
            "/api/shares",
            Some(&auth),
            Some(json!({"userId": u1.id, "apartmentId": apartment.id, "percentage": 60})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(share["procent"], "60.00");
        assert_eq!(share["user"]["username"], "first");
        assert_eq!(share["apartment"]["name"], "Dune");

        // Legacy field names are accepted.
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/shares",
            Some(&auth),
            Some(json!({"user_id": u1.id, "apartment_id": apartment.id, "procent": "10"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/shares",
            Some(&auth),
            Some(json!({"userId": u2.id, "apartmentId": apartment.id, "percentage": 41})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/shares",
            Some(&auth),
            Some(json!({"apartmentId": apartment.id})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"]["fields"].as_array().unwrap().len(), 2);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/shares",
            Some(&auth),
            Some(json!({"userId": 999, "apartmentId": apartment.id, "percentage": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let id = share["id"].as_i64().unwrap();
        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/api/shares/{id}"),
            Some(&auth),
            Some(json!({"percentage": "55.5"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["procent"], "55.50");

        let (status, list) = send(&app, Method::GET, "/api/shares", Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, body) = send(
            &app,
            Method::DELETE,
            &format!("/api/shares/{id}"),
            Some(&auth),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/shares/{id}"),
            Some(&auth),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bulk_replace_and_apartment_detail() {
        let state = test_state().await;
        let app = test_app(&state);
        let admin = seed_user(&state.db, "admin", &[ROLE_ADMIN]).await;
        let auth = bearer(&state, &admin);
        let u1 = seed_user(&state.db, "first", &[]).await;
        let u2 = seed_user(&state.db, "second", &[]).await;
        let apartment = seed_apartment(&state.db, "Dune").await;
        let uri = format!("/api/apartments/{}/shares", apartment.id);

        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&auth),
            Some(json!({"shareholders": [
                {"userId": u1.id, "percentage": 60},
                {"userId": u2.id, "percentage": 40},
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["message"].is_string());
        assert_eq!(body["shares"].as_array().unwrap().len(), 2);

        let (status, _) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&auth),
            Some(json!({"shareholders": [
                {"userId": u1.id, "percentage": 60},
                {"userId": u2.id, "percentage": 41},
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Any authenticated user can read the apartment detail.
        let (status, detail) = send(
            &app,
            Method::GET,
            &format!("/api/apartments/{}", apartment.id),
            Some(&bearer(&state, &u1)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["totalPercentage"], "100.00");
        assert_eq!(detail["shares"].as_array().unwrap().len(), 2);

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/api/users/{}/shares", u1.id),
            Some(&auth),
            Some(json!({"shares": []})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["shares"].as_array().unwrap().is_empty());

        let (_, detail) = send(
            &app,
            Method::GET,
            &format!("/api/apartments/{}", apartment.id),
            Some(&auth),
            None,
        )
        .await;
        assert_eq!(detail["totalPercentage"], "40.00");
    }

    #[tokio::test]
    async fn login_me_and_refresh() {
        let state = test_state().await;
        let app = test_app(&state);
        let user = seed_user(&state.db, "owner", &[]).await;
        let apartment = seed_apartment(&state.db, "Dune").await;
        crate::db::repository::ShareRepository::insert(
            &state.db,
            user.id,
            apartment.id,
            crate::db::models::Percentage::from_basis_points(2500).unwrap(),
        )
        .await
        .unwrap();

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({"username": "owner"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({"username": "owner", "password": "wrong-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, tokens) = send(
            &app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({"username": "owner", "password": TEST_PASSWORD})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = tokens["token"].as_str().unwrap();
        let refresh = tokens["refresh_token"].as_str().unwrap().to_string();
        assert!(tokens["refresh_token_expiration"].as_i64().unwrap() > 0);

        let (status, me) = send(
            &app,
            Method::GET,
            "/api/me",
            Some(&format!("Bearer {token}")),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["username"], "owner");
        assert_eq!(me["roles"], json!(["ROLE_USER"]));
        assert_eq!(me["shares"][0]["procent"], "25.00");
        assert_eq!(me["shares"][0]["apartment"]["name"], "Dune");

        let (status, renewed) = send(
            &app,
            Method::POST,
            "/api/token/refresh",
            None,
            Some(json!({"refresh_token": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(renewed["refresh_token"], json!(refresh));

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/token/refresh",
            None,
            Some(json!({"refresh_token": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn password_reset_flow_over_http() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = test_state_with_mailer(mailer.clone()).await;
        let app = test_app(&state);
        let user = seed_user(&state.db, "owner", &[]).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/password-reset/request",
            None,
            Some(json!({"email": user.email})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let generic = body["message"].clone();

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/password-reset/request",
            None,
            Some(json!({"email": "nobody@example.com"})),
        )
        .await;
        assert_eq!(body["message"], generic);

        let sent = mailer.sent();
        let mail = &sent[0];
        let start = mail.body.find("token=").unwrap() + "token=".len();
        let token = mail.body[start..].split_whitespace().next().unwrap().to_string();

        let (status, check) = send(
            &app,
            Method::POST,
            "/api/password-reset/verify",
            None,
            Some(json!({"token": token})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(check["valid"], true);
        assert_eq!(check["email"], json!(user.email));

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/password-reset/reset",
            None,
            Some(json!({"token": token, "password": "brand-new"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({"username": "owner", "password": "brand-new"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/password-reset/verify",
            None,
            Some(json!({"token": token})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_user_and_check_username() {
        let state = test_state().await;
        let app = test_app(&state);
        let admin = seed_user(&state.db, "admin", &[ROLE_ADMIN]).await;
        let auth = bearer(&state, &admin);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/users/register",
            Some(&auth),
            Some(json!({
                "username": "newbie",
                "email": "newbie@example.com",
                "password": "secret1",
                "name": "Anna",
                "surname": "Nowak",
                "invoiceInfo": {"city": "Gdańsk"},
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["username"], "newbie");
        assert_eq!(body["user"]["invoiceInfo"]["city"], "Gdańsk");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/users/register",
            Some(&auth),
            Some(json!({
                "username": "newbie",
                "email": "other@example.com",
                "password": "secret1",
                "name": "Anna",
                "surname": "Nowak",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/users/check-username",
            Some(&auth),
            Some(json!({"username": "newbie"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available"], false);

        let (status, page) = send(&app, Method::GET, "/api/users?page=1", Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 2);
    }

    #[tokio::test]
    async fn multipart_upload_is_stored_and_served() {
        let state = test_state().await;
        let app = test_app(&state);
        let admin = seed_user(&state.db, "admin", &[ROLE_ADMIN]).await;

        let boundary = "XBOUNDARYX";
        let mut payload = Vec::new();
        payload.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"My Flat.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        payload.extend_from_slice(&png_bytes(8, 8));
        payload.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/apartments/upload-image")
            .header(header::AUTHORIZATION, bearer(&state, &admin))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(payload))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        let path = body["path"].as_str().unwrap().to_string();
        assert!(path.starts_with("/uploads/apartments/my-flat-"));
        assert!(path.ends_with(".png"));

        let (status, _) = send(&app, Method::GET, &path, None, None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
