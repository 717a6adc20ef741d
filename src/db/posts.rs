//! Post and category queries.
//!
//! Public reads join `users` and filter on both active flags at read time;
//! moderation reads do not filter. Owner-scoped writes are single statements
//! keyed on `(id, user_id)` so the affected-row count is the ownership check.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{AdminPostRow, Category, NewPost, PostDetail, PostSummary};

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<PostSummary> {
    Ok(PostSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        img: row.get(3)?,
        date: row.get(4)?,
        user_id: row.get(5)?,
        category: row.get(6)?,
    })
}

pub fn list_categories(conn: &Connection) -> rusqlite::Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn category_exists(conn: &Connection, cat_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM categories WHERE id = ?1",
        params![cat_id],
        |row| row.get(0),
    )
}

/// Public listing, optionally narrowed to one category name.
pub fn list_public(conn: &Connection, category: Option<&str>) -> rusqlite::Result<Vec<PostSummary>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.title, p.description, p.img, p.date, p.user_id, c.name
         FROM posts p
         JOIN categories c ON c.id = p.cat_id
         JOIN users u ON u.id = p.user_id
         WHERE u.is_active = 1 AND p.is_active = 1
           AND (?1 IS NULL OR c.name = ?1)
         ORDER BY p.date DESC, p.id DESC",
    )?;
    let rows = stmt.query_map(params![category], summary_from_row)?;
    rows.collect()
}

/// Escape LIKE metacharacters so the key matches literally.
pub fn like_pattern(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len() + 2);
    escaped.push('%');
    for ch in key.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

pub fn search_public(conn: &Connection, key: &str) -> rusqlite::Result<Vec<PostSummary>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.title, p.description, p.img, p.date, p.user_id, c.name
         FROM posts p
         JOIN categories c ON c.id = p.cat_id
         JOIN users u ON u.id = p.user_id
         WHERE u.is_active = 1 AND p.is_active = 1
           AND (p.title LIKE ?1 ESCAPE '\\' OR c.name LIKE ?1 ESCAPE '\\')
         ORDER BY p.date DESC, p.id DESC",
    )?;
    let rows = stmt.query_map(params![like_pattern(key)], summary_from_row)?;
    rows.collect()
}

/// Direct fetch. Not filtered by either active flag.
pub fn find_detail(conn: &Connection, id: i64) -> rusqlite::Result<Option<PostDetail>> {
    conn.query_row(
        "SELECT p.id, u.username, p.user_id, p.title, p.description, c.name, p.cat_id,
                p.img, p.date, p.is_active
         FROM posts p
         JOIN users u ON u.id = p.user_id
         JOIN categories c ON c.id = p.cat_id
         WHERE p.id = ?1",
        params![id],
        |row| {
            Ok(PostDetail {
                id: row.get(0)?,
                username: row.get(1)?,
                user_id: row.get(2)?,
                title: row.get(3)?,
                description: row.get(4)?,
                category: row.get(5)?,
                cat_id: row.get(6)?,
                img: row.get(7)?,
                date: row.get(8)?,
                is_active: row.get(9)?,
            })
        },
    )
    .optional()
}

pub fn list_for_admin(
    conn: &Connection,
    category: Option<&str>,
) -> rusqlite::Result<Vec<AdminPostRow>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.user_id, p.cat_id, u.username, u.email, u.role_id, p.title,
                p.description, p.img, p.date, c.name, u.is_active, p.is_active
         FROM posts p
         JOIN categories c ON c.id = p.cat_id
         JOIN users u ON u.id = p.user_id
         WHERE (?1 IS NULL OR c.name = ?1)
         ORDER BY p.id DESC",
    )?;
    let rows = stmt.query_map(params![category], |row| {
        Ok(AdminPostRow {
            post_id: row.get(0)?,
            user_id: row.get(1)?,
            cat_id: row.get(2)?,
            username: row.get(3)?,
            email: row.get(4)?,
            role: row.get(5)?,
            title: row.get(6)?,
            description: row.get(7)?,
            img: row.get(8)?,
            date: row.get(9)?,
            category: row.get(10)?,
            user_is_active: row.get(11)?,
            post_is_active: row.get(12)?,
        })
    })?;
    rows.collect()
}

pub fn insert(conn: &Connection, post: &NewPost) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO posts (title, description, img, date, user_id, cat_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            post.title,
            post.description,
            post.img,
            post.date,
            post.user_id,
            post.cat_id
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns the number of rows changed; zero when the post is missing or owned by someone else.
pub fn update_owned(
    conn: &Connection,
    id: i64,
    owner_id: i64,
    title: &str,
    description: &str,
    cat_id: i64,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE posts SET title = ?1, description = ?2, cat_id = ?3
         WHERE id = ?4 AND user_id = ?5",
        params![title, description, cat_id, id, owner_id],
    )
}

/// Returns the number of rows deleted; zero when the post is missing or owned by someone else.
pub fn delete_owned(conn: &Connection, id: i64, owner_id: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM posts WHERE id = ?1 AND user_id = ?2",
        params![id, owner_id],
    )
}

pub fn active_flag(conn: &Connection, id: i64) -> rusqlite::Result<Option<bool>> {
    conn.query_row(
        "SELECT is_active FROM posts WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_active_flag(conn: &Connection, id: i64, active: bool) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE posts SET is_active = ?1 WHERE id = ?2",
        params![active, id],
    )
}
