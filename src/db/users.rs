use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{AuthorRow, Role, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, role_id, is_active";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        is_active: row.get(5)?,
    })
}

pub fn find_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
        params![username],
        user_from_row,
    )
    .optional()
}

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        user_from_row,
    )
    .optional()
}

pub fn username_or_email_taken(
    conn: &Connection,
    username: &str,
    email: &str,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1 OR email = ?2",
        params![username, email],
        |row| row.get(0),
    )
}

/// Inserts an active user and returns its id.
pub fn insert(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (username, email, password_hash, role_id, is_active)
         VALUES (?1, ?2, ?3, ?4, 1)",
        params![username, email, password_hash, role.id()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_authors(conn: &Connection) -> rusqlite::Result<Vec<AuthorRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, email, is_active FROM users WHERE role_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![Role::Author.id()], |row| {
        Ok(AuthorRow {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            is_active: row.get(3)?,
        })
    })?;
    rows.collect()
}

pub fn active_flag(conn: &Connection, id: i64) -> rusqlite::Result<Option<bool>> {
    conn.query_row(
        "SELECT is_active FROM users WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_active_flag(conn: &Connection, id: i64, active: bool) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE users SET is_active = ?1 WHERE id = ?2",
        params![active, id],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn insert_then_find_by_username_and_id() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let id = insert(&conn, "alice", "alice@x.com", "hash", Role::Author).unwrap();

        let by_name = find_by_username(&conn, "alice").unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.role, Role::Author);
        assert!(by_name.is_active);

        let by_id = find_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(by_id.email, "alice@x.com");
        assert!(find_by_id(&conn, id + 1).unwrap().is_none());
    }

    #[test]
    fn username_and_email_are_unique_case_insensitively() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        insert(&conn, "alice", "alice@x.com", "hash", Role::Author).unwrap();

        assert!(username_or_email_taken(&conn, "ALICE", "other@x.com").unwrap());
        assert!(username_or_email_taken(&conn, "other", "Alice@X.com").unwrap());
        assert!(!username_or_email_taken(&conn, "bob", "bob@x.com").unwrap());
        assert!(insert(&conn, "Alice", "new@x.com", "hash", Role::Author).is_err());
    }

    #[test]
    fn list_authors_excludes_admins() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        insert(&conn, "root", "root@x.com", "hash", Role::Admin).unwrap();
        insert(&conn, "alice", "alice@x.com", "hash", Role::Author).unwrap();

        let authors = list_authors(&conn).unwrap();
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].username, "alice");
    }

    #[test]
    fn active_flag_reads_and_writes() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let id = insert(&conn, "alice", "alice@x.com", "hash", Role::Author).unwrap();

        assert_eq!(active_flag(&conn, id).unwrap(), Some(true));
        assert_eq!(set_active_flag(&conn, id, false).unwrap(), 1);
        assert_eq!(active_flag(&conn, id).unwrap(), Some(false));
        assert_eq!(active_flag(&conn, 404).unwrap(), None);
        assert_eq!(set_active_flag(&conn, 404, false).unwrap(), 0);
    }
}
