use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::{info, instrument};

use super::{
    middleware::jwt_auth,
    types::{LoginRequest, RefreshRequest, RegisterRequest, SessionResponse, TokenClaims},
};
use crate::shared::{AppError, AppState};
use crate::user::UserProfile;

/// Routes for the identity layer; logout and me sit behind the bearer gate
pub fn auth_routes(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth));

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .merge(protected)
        .with_state(state)
}

/// POST /auth/register
#[instrument(name = "register", skip(state, body))]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let user = state
        .session_service
        .register(&body.username, &body.email, &body.password, &body.name)
        .await?;

    info!(user_id = %user.id, "Registration handled");
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /auth/login
#[instrument(name = "login", skip(state, body))]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state
        .session_service
        .login(&body.identifier, &body.password)
        .await?;
    Ok(Json(session))
}

/// POST /auth/refresh
#[instrument(name = "refresh", skip(state, body))]
async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.session_service.refresh(&body.refresh_token).await?;
    Ok(Json(session))
}

/// POST /auth/logout
#[instrument(name = "logout", skip(state, claims, body))]
async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Json(body): Json<RefreshRequest>,
) -> Result<StatusCode, AppError> {
    state
        .session_service
        .logout(claims.sub, &body.refresh_token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me
async fn me(Extension(claims): Extension<TokenClaims>) -> Json<TokenClaims> {
    Json(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::SessionServiceBuilder;
    use axum::{body::Body, http::Request};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    fn json_request(method: &str, uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_register_login_me_logout_over_http() {
        let service = Arc::new(SessionServiceBuilder::new().build());
        let app = auth_routes(AppState::new(service.clone()));

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/register",
                json!({"username": "u1", "email": "e1@x.com", "password": "Passw0rd!", "name": "User One"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let user: UserProfile = serde_json::from_value(body_json(response).await).unwrap();
        service.verify_email(user.id).await.unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/login",
                json!({"identifier": "u1", "password": "Passw0rd!"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let session: SessionResponse = serde_json::from_value(body_json(response).await).unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .header("authorization", format!("Bearer {}", session.access_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let claims: TokenClaims = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(claims.sub, user.id);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/logout",
                json!({"refresh_token": session.refresh_token}),
                Some(&session.access_token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(json_request(
                "POST",
                "/auth/refresh",
                json!({"refresh_token": session.refresh_token}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_protected_route_requires_bearer_header() {
        let service = Arc::new(SessionServiceBuilder::new().build());
        let app = auth_routes(AppState::new(service));

        let missing = app
            .clone()
            .oneshot(Request::builder().uri("/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong_scheme = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .header("authorization", "Basic dTE6cGFzcw==")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(wrong_scheme.status(), StatusCode::UNAUTHORIZED);

        let bad_token = app
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .header("authorization", "Bearer not.a.token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(bad_token.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_error_body_does_not_reveal_cause() {
        let service = Arc::new(SessionServiceBuilder::new().build());
        let app = auth_routes(AppState::new(service));

        let response = app
            .oneshot(json_request(
                "POST",
                "/auth/login",
                json!({"identifier": "nobody", "password": "Passw0rd!"}),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({"error": "Invalid credentials"}));
    }

    #[tokio::test]
    async fn test_weak_password_is_bad_request() {
        let service = Arc::new(SessionServiceBuilder::new().build());
        let app = auth_routes(AppState::new(service));

        let response = app
            .oneshot(json_request(
                "POST",
                "/auth/register",
                json!({"username": "u1", "email": "e1@x.com", "password": "short1!", "name": "U"}),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
