//! Authorization guard evaluated on every privileged action.
//!
//! 1. the session token is taken from the carrier (`Unauthenticated` if absent),
//! 2. verified by the token service (`InvalidToken` if forged, malformed or expired),
//! 3. resolved to the acting user,
//! 4. owner-scoped writes succeed only when the store's `(id, user_id)`-keyed
//!    mutation touched a row; a missing post and someone else's post are the same
//!    `Forbidden`,
//! 5. admin-scoped actions require `Role::Admin`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde::Serialize;

use crate::db::models::Role;
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The authenticated actor behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Scope an action requires beyond being signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Any signed-in user.
    Authenticated,
    /// Only `admin` accounts.
    Admin,
}

/// Steps 1-3: carried token to acting user.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> AppResult<Principal> {
    let token = state
        .carrier
        .extract(headers)
        .ok_or(AppError::Unauthenticated)?;

    let claims = state.tokens.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "session token rejected");
        AppError::InvalidToken
    })?;

    let conn = state.db.get()?;
    // A verified token for a user row that no longer exists cannot identify anyone.
    let user = users::find_by_id(&conn, claims.sub)?.ok_or(AppError::InvalidToken)?;

    Ok(Principal {
        id: user.id,
        username: user.username,
        role: user.role,
    })
}

/// Step 5: role check for the requested scope.
pub fn authorize(principal: &Principal, scope: Scope) -> AppResult<()> {
    match scope {
        Scope::Authenticated => Ok(()),
        Scope::Admin if principal.is_admin() => Ok(()),
        Scope::Admin => {
            tracing::warn!(user_id = principal.id, "admin action denied");
            Err(AppError::Forbidden)
        }
    }
}

/// Step 4: interprets the affected-row count of an owner-keyed mutation.
pub fn ensure_owned(principal: &Principal, post_id: i64, affected: usize) -> AppResult<()> {
    if affected == 0 {
        tracing::debug!(
            user_id = principal.id,
            post_id,
            "owner-scoped write matched no row"
        );
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn require(state: &AppState, headers: &HeaderMap, scope: Scope) -> AppResult<Principal> {
    let principal = authenticate(state, headers)?;
    authorize(&principal, scope)?;
    Ok(principal)
}

/// Extractor for routes that need any signed-in user.
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(state, &parts.headers, Scope::Authenticated)
    }
}

/// Extractor for admin-scoped routes.
#[derive(Debug, Clone)]
pub struct AdminPrincipal(pub Principal);

impl FromRequestParts<AppState> for AdminPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(state, &parts.headers, Scope::Admin).map(AdminPrincipal)
    }
}
