//! Moderation endpoints. Every handler takes an `AdminPrincipal`, so authors get 403.

use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::auth::AdminPrincipal;
use crate::db::models::{AdminPostRow, AuthorRow};
use crate::db::{posts, users};
use crate::error::AppResult;
use crate::extractors::{PathParams, QueryParams};
use crate::lifecycle::{self, Transition};
use crate::routes::posts::CategoryFilter;
use crate::state::AppState;

async fn list_posts(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
    QueryParams(filter): QueryParams<CategoryFilter>,
) -> AppResult<Json<Vec<AdminPostRow>>> {
    let conn = state.db.get()?;
    Ok(Json(posts::list_for_admin(&conn, filter.cat.as_deref())?))
}

async fn list_users(
    State(state): State<AppState>,
    AdminPrincipal(_admin): AdminPrincipal,
) -> AppResult<Json<Vec<AuthorRow>>> {
    let conn = state.db.get()?;
    Ok(Json(users::list_authors(&conn)?))
}

async fn deactivate_user(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    PathParams(id): PathParams<i64>,
) -> AppResult<Json<Transition>> {
    tracing::debug!(admin_id = admin.id, user_id = id, "deactivate user");
    Ok(Json(lifecycle::set_user_active(&state.db, id, false)?))
}

async fn reactivate_user(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    PathParams(id): PathParams<i64>,
) -> AppResult<Json<Transition>> {
    tracing::debug!(admin_id = admin.id, user_id = id, "reactivate user");
    Ok(Json(lifecycle::set_user_active(&state.db, id, true)?))
}

async fn deactivate_post(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    PathParams(id): PathParams<i64>,
) -> AppResult<Json<Transition>> {
    tracing::debug!(admin_id = admin.id, post_id = id, "deactivate post");
    Ok(Json(lifecycle::set_post_active(&state.db, id, false)?))
}

async fn reactivate_post(
    State(state): State<AppState>,
    AdminPrincipal(admin): AdminPrincipal,
    PathParams(id): PathParams<i64>,
) -> AppResult<Json<Transition>> {
    tracing::debug!(admin_id = admin.id, post_id = id, "reactivate post");
    Ok(Json(lifecycle::set_post_active(&state.db, id, true)?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/posts", get(list_posts))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}/deactivate", put(deactivate_user))
        .route("/admin/users/{id}/reactivate", put(reactivate_user))
        .route("/admin/posts/{id}/deactivate", put(deactivate_post))
        .route("/admin/posts/{id}/reactivate", put(reactivate_post))
}
