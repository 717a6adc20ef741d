use serde::{Deserialize, Serialize};

/// Two-tier role model. Discriminants match the seeded `roles` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin = 1,
    Author = 2,
}

impl Role {
    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Author),
            _ => None,
        }
    }
}

impl rusqlite::types::FromSql for Role {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        let id = value.as_i64()?;
        Role::from_id(id).ok_or(rusqlite::types::FromSqlError::OutOfRange(id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Row of the public listing and search queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub img: Option<String>,
    pub date: String,
    pub user_id: i64,
    pub category: String,
}

/// Single-post view, joined with its author and category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub id: i64,
    pub username: String,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub cat_id: i64,
    pub img: Option<String>,
    pub date: String,
    pub is_active: bool,
}

/// Moderation view; unfiltered by either active flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminPostRow {
    pub post_id: i64,
    pub user_id: i64,
    pub cat_id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub title: String,
    pub description: String,
    pub img: Option<String>,
    pub date: String,
    pub category: String,
    pub user_is_active: bool,
    pub post_is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub img: Option<String>,
    pub date: String,
    pub user_id: i64,
    pub cat_id: i64,
}
