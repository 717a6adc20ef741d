use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;

use crate::auth::guard::{self, Scope};
use crate::db::models::{Category, NewPost, PostDetail, PostSummary};
use crate::db::posts;
use crate::error::{AppError, AppResult};
use crate::extractors::{required_text, PathParams, QueryParams, ValidatedJson, Validate};
use crate::state::AppState;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 20_000;

// --- Request types ---

#[derive(Debug, Deserialize)]
pub struct CategoryFilter {
    pub cat: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    pub cat_id: i64,
}

impl Validate for CreatePostRequest {
    fn validate(self) -> Result<Self, String> {
        let title = required_text("Title", &self.title, MAX_TITLE_CHARS)?;
        let description = required_text("Description", &self.description, MAX_DESCRIPTION_CHARS)?;
        let img = self
            .img
            .map(|img| img.trim().to_string())
            .filter(|img| !img.is_empty());
        let date = match self.date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(date) => {
                NaiveDateTime::parse_from_str(date, DATE_FORMAT)
                    .map_err(|_| "Date must look like 2024-01-31 18:30:00".to_string())?;
                Some(date.to_string())
            }
        };
        Ok(Self {
            title,
            description,
            img,
            date,
            cat_id: self.cat_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: String,
    pub description: String,
    pub cat_id: i64,
}

impl Validate for UpdatePostRequest {
    fn validate(self) -> Result<Self, String> {
        Ok(Self {
            title: required_text("Title", &self.title, MAX_TITLE_CHARS)?,
            description: required_text("Description", &self.description, MAX_DESCRIPTION_CHARS)?,
            cat_id: self.cat_id,
        })
    }
}

// --- Handlers ---

async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    let conn = state.db.get()?;
    Ok(Json(posts::list_categories(&conn)?))
}

/// GET /posts?cat=name — posts by active authors that are themselves active
async fn list_posts(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<CategoryFilter>,
) -> AppResult<Json<Vec<PostSummary>>> {
    let conn = state.db.get()?;
    Ok(Json(posts::list_public(&conn, filter.cat.as_deref())?))
}

async fn get_post(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
) -> AppResult<Json<PostDetail>> {
    let conn = state.db.get()?;
    posts::find_detail(&conn, id)?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn search_posts(
    State(state): State<AppState>,
    PathParams(key): PathParams<String>,
) -> AppResult<Json<Vec<PostSummary>>> {
    let conn = state.db.get()?;
    Ok(Json(posts::search_public(&conn, &key)?))
}

fn ensure_category(conn: &rusqlite::Connection, cat_id: i64) -> AppResult<()> {
    if posts::category_exists(conn, cat_id)? {
        Ok(())
    } else {
        Err(AppError::BadRequest("Category does not exist".into()))
    }
}

async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<CreatePostRequest>,
) -> AppResult<Response> {
    let principal = guard::require(&state, &headers, Scope::Authenticated)?;

    let conn = state.db.get()?;
    ensure_category(&conn, req.cat_id)?;

    let post = NewPost {
        title: req.title,
        description: req.description,
        img: req.img,
        date: req
            .date
            .unwrap_or_else(|| Utc::now().format(DATE_FORMAT).to_string()),
        user_id: principal.id,
        cat_id: req.cat_id,
    };
    let id = posts::insert(&conn, &post)?;
    tracing::info!(post_id = id, user_id = principal.id, "post created");

    let body = serde_json::json!({ "message": "Post has been created", "id": id });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn update_post(
    State(state): State<AppState>,
    PathParams(id): PathParams<i64>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<UpdatePostRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let principal = guard::require(&state, &headers, Scope::Authenticated)?;

    let conn = state.db.get()?;
    ensure_category(&conn, req.cat_id)?;

    let affected = posts::update_owned(
        &conn,
        id,
        principal.id,
        &req.title,
        &req.description,
        req.cat_id,
    )?;
    guard::ensure_owned(&principal, id, affected)?;
    tracing::info!(post_id = id, user_id = principal.id, "post updated");

    Ok(Json(serde_json::json!({ "message": "Post has been updated" })))
}

async fn delete_post(
    State(state): State<AppState>,
    principal: guard::Principal,
    PathParams(id): PathParams<i64>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let affected = posts::delete_owned(&conn, id, principal.id)?;
    guard::ensure_owned(&principal, id, affected)?;
    tracing::info!(post_id = id, user_id = principal.id, "post deleted");

    Ok(Json(serde_json::json!({ "message": "Post has been deleted" })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/search/{key}", get(search_posts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_req(date: Option<&str>, img: Option<&str>) -> CreatePostRequest {
        CreatePostRequest {
            title: " Hello ".into(),
            description: "world".into(),
            img: img.map(String::from),
            date: date.map(String::from),
            cat_id: 1,
        }
    }

    #[test]
    fn create_request_normalises_optional_fields() {
        let req = create_req(Some(""), Some("  ")).validate().unwrap();
        assert_eq!(req.title, "Hello");
        assert_eq!(req.img, None);
        assert_eq!(req.date, None);

        let req = create_req(Some("2024-01-31 18:30:00"), Some("cat.png"))
            .validate()
            .unwrap();
        assert_eq!(req.date.as_deref(), Some("2024-01-31 18:30:00"));
        assert_eq!(req.img.as_deref(), Some("cat.png"));
    }

    #[test]
    fn create_request_rejects_unparseable_date() {
        assert!(create_req(Some("yesterday"), None).validate().is_err());
    }

    #[test]
    fn update_request_bounds_title() {
        let req = UpdatePostRequest {
            title: "x".repeat(MAX_TITLE_CHARS + 1),
            description: "body".into(),
            cat_id: 1,
        };
        assert_eq!(
            req.validate().unwrap_err(),
            "Title must be 200 characters or less"
        );
    }

    #[test]
    fn empty_description_is_rejected() {
        let req = UpdatePostRequest {
            title: "t".into(),
            description: "  ".into(),
            cat_id: 1,
        };
        assert_eq!(req.validate().unwrap_err(), "Description is required");
    }
}
