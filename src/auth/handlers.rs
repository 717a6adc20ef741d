use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::credentials::LoginPath;
use crate::db::models::{Role, User};
use crate::error::{AppError, AppResult};
use crate::extractors::{is_valid_email, required_text, ValidatedJson, Validate};
use crate::state::AppState;

/// bcrypt ignores input past this many bytes.
const MAX_PASSWORD_BYTES: usize = 72;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(self) -> Result<Self, String> {
        let username = required_text("Username", &self.username, 50)?;
        let email = self.email.trim().to_string();
        if !is_valid_email(&email) {
            return Err("Email is not valid".into());
        }
        validate_password(&self.password)?;
        Ok(Self {
            username,
            email,
            password: self.password,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(self) -> Result<Self, String> {
        let username = required_text("Username", &self.username, 50)?;
        validate_password(&self.password)?;
        Ok(Self {
            username,
            password: self.password,
        })
    }
}

fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".into());
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(format!(
            "Password must be {} bytes or less",
            MAX_PASSWORD_BYTES
        ));
    }
    Ok(())
}

// -- Response types --

/// What a login returns about the signed-in user. Never includes the password hash.
#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl SessionUser {
    fn for_path(user: User, path: LoginPath) -> Self {
        let email = match path {
            LoginPath::Admin => Some(user.email),
            LoginPath::Author => None,
        };
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            is_active: user.is_active,
            email,
        }
    }
}

// -- Handlers --

/// Runs bcrypt and the queries around it on the blocking pool.
async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("credential task failed: {}", e)))?
}

/// POST /register — create an author account
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> AppResult<Response> {
    let credentials = state.credentials.clone();
    let db = state.db.clone();
    let id = run_blocking(move || {
        credentials.register(&db, &req.username, &req.email, &req.password, Role::Author)
    })
    .await?;

    let body = serde_json::json!({ "message": "User has been created", "id": id });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// POST /login — any role
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> AppResult<Response> {
    start_session(&state, req, LoginPath::Author).await
}

/// POST /admin/login — admins only
pub async fn admin_login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> AppResult<Response> {
    start_session(&state, req, LoginPath::Admin).await
}

async fn start_session(state: &AppState, req: LoginRequest, path: LoginPath) -> AppResult<Response> {
    let credentials = state.credentials.clone();
    let db = state.db.clone();
    let user = run_blocking(move || {
        credentials.authenticate(&db, &req.username, &req.password, path)
    })
    .await?;

    let token = state.tokens.issue(user.id);
    let mut headers = HeaderMap::new();
    state.carrier.attach(&mut headers, &token)?;

    Ok((
        StatusCode::OK,
        headers,
        Json(SessionUser::for_path(user, path)),
    )
        .into_response())
}

/// POST /logout — clear the session cookie. Tokens are stateless, so there is nothing
/// to delete server-side.
pub async fn logout(State(state): State<AppState>) -> AppResult<Response> {
    let mut headers = HeaderMap::new();
    state.carrier.clear(&mut headers)?;

    let body = serde_json::json!({ "message": "User has been logged out" });
    Ok((StatusCode::OK, headers, Json(body)).into_response())
}
