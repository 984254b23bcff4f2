use axum::{
    extract::{rejection::FormRejection, State},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginForm, PublicUser, RegisterForm, RegisterResponse, TokenResponse},
        extractors::AuthUser,
        password::{hash_password, verify_password},
        repo::{is_unique_violation, User},
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn form_rejection(e: FormRejection) -> AppError {
    warn!(error = %e, "malformed form body");
    AppError::validation(e.body_text())
}

pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Result<Json<RegisterResponse>, AppError> {
    let Form(mut form) = form.map_err(form_rejection)?;
    form.username = form.username.trim().to_string();

    if form.username.is_empty() {
        warn!("empty username");
        return Err(AppError::validation("Username is required"));
    }

    if User::find_by_username(&state.db, &form.username).await?.is_some() {
        warn!(username = %form.username, "username already registered");
        return Err(AppError::validation("Username already registered"));
    }
    if User::find_by_email(&state.db, &form.email).await?.is_some() {
        warn!(email = %form.email, "email already registered");
        return Err(AppError::validation("Email already registered"));
    }

    let hash = hash_password(&form.password)?;

    let user = match User::create(&state.db, &form.username, &form.email, &hash).await {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            warn!(username = %form.username, "concurrent duplicate registration");
            return Err(AppError::validation("Username or email already registered"));
        }
        Err(e) => return Err(AppError::Internal(e.into())),
    };

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(Json(RegisterResponse {
        msg: "User created".into(),
    }))
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Form(form) = form.map_err(form_rejection)?;
    let username = form.username.trim();

    let user = match User::find_by_username(&state.db, username).await? {
        Some(u) => u,
        None => {
            warn!(username = %username, "login unknown user");
            return Err(AppError::Unauthorized);
        }
    };

    if !verify_password(&form.password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::Unauthorized);
    }

    let access_token = state.jwt.issue_token(&user.username)?;

    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".into(),
    }))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(PublicUser {
        id: user.id,
        username: user.username,
        email: user.email,
    })
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        app::build_app,
        state::test_support::{capture_logs, TestEnv},
    };

    fn form_request(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn ping_pongs() {
        let env = TestEnv::new().await;
        let app = build_app(env.state.clone());
        let (status, body) = send(&app, Request::get("/api/v1/ping").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "pong");
    }

    #[tokio::test]
    async fn register_then_login_returns_token() {
        let env = TestEnv::new().await;
        let app = build_app(env.state.clone());

        let (status, _) = send(
            &app,
            form_request("/api/v1/register", "username=alice&email=alice%40example.com&password=wardrobe123"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            form_request("/api/v1/login", "username=alice&password=wardrobe123"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        let token = body["access_token"].as_str().unwrap();
        assert_eq!(env.state.jwt.verify(token).unwrap().sub, "alice");
    }

    #[tokio::test]
    async fn duplicate_username_or_email_is_rejected_without_mutation() {
        let env = TestEnv::new().await;
        let app = build_app(env.state.clone());

        let (status, _) = send(
            &app,
            form_request("/api/v1/register", "username=alice&email=alice%40example.com&password=wardrobe123"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            form_request("/api/v1/register", "username=alice&email=other%40example.com&password=wardrobe123"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Username already registered");

        let (status, body) = send(
            &app,
            form_request("/api/v1/register", "username=bob&email=alice%40example.com&password=wardrobe123"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Email already registered");

        assert_eq!(User::count(&env.state.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn register_requires_only_a_username() {
        let env = TestEnv::new().await;
        let app = build_app(env.state.clone());

        let (status, body) = send(
            &app,
            form_request("/api/v1/register", "username=%20%20&email=x%40example.com&password=pw"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Username is required");

        let (status, _) = send(&app, form_request("/api/v1/register", "username=alice")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(User::count(&env.state.db).await.unwrap(), 0);

        let (status, _) = send(
            &app,
            form_request("/api/v1/register", "username=carol&email=carol&password=abc"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            form_request("/api/v1/login", "username=carol&password=abc"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["access_token"].is_string());
    }

    #[tokio::test]
    async fn database_failure_is_logged_and_hidden() {
        let env = TestEnv::new().await;
        let app = build_app(env.state.clone());
        env.state.db.close().await;
        let (logs, _guard) = capture_logs();

        let (status, body) = send(
            &app,
            form_request("/api/v1/register", "username=dave&email=dave%40example.com&password=wardrobe123"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
        assert!(logs.contents().contains("closed pool"), "{}", logs.contents());
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized_with_same_message() {
        let env = TestEnv::new().await;
        env.create_user("alice", "wardrobe123").await;
        let app = build_app(env.state.clone());

        let (status, wrong_pw) = send(
            &app,
            form_request("/api/v1/login", "username=alice&password=not-it-at-all"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, unknown) = send(
            &app,
            form_request("/api/v1/login", "username=ghost&password=wardrobe123"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_pw, unknown);
    }

    #[tokio::test]
    async fn me_requires_valid_token_for_existing_user() {
        let env = TestEnv::new().await;
        env.create_user("alice", "wardrobe123").await;
        let app = build_app(env.state.clone());

        let token = env.state.jwt.issue_token("alice").unwrap();
        let req = Request::get("/api/v1/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");

        let req = Request::get("/api/v1/me").body(Body::empty()).unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let ghost = env.state.jwt.issue_token("ghost").unwrap();
        let req = Request::get("/api/v1/me")
            .header(header::AUTHORIZATION, format!("Bearer {ghost}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
