use crate::db::models::{Role, User};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Which login endpoint is being used. The admin path only admits `admin` accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPath {
    Author,
    Admin,
}

impl LoginPath {
    pub fn as_str(self) -> &'static str {
        match self {
            LoginPath::Author => "author",
            LoginPath::Admin => "admin",
        }
    }
}

/// Salted one-way password hashing and account creation.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    cost: u32,
    // Verified against when no matching account exists, so a miss costs the same as a hit.
    dummy_hash: Option<String>,
}

impl CredentialStore {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            dummy_hash: bcrypt::hash("quill-no-such-account", cost).ok(),
        }
    }

    pub fn hash(&self, password: &str) -> AppResult<String> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
    }

    /// Constant-time check of `candidate` against a stored bcrypt hash.
    pub fn verify(stored_hash: &str, candidate: &str) -> bool {
        bcrypt::verify(candidate, stored_hash).unwrap_or(false)
    }

    /// Creates an active account and returns its id.
    pub fn register(
        &self,
        pool: &DbPool,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> AppResult<i64> {
        {
            let conn = pool.get()?;
            if users::username_or_email_taken(&conn, username, email)? {
                return Err(AppError::AlreadyExists);
            }
        }

        let password_hash = self.hash(password)?;

        let conn = pool.get()?;
        let id = users::insert(&conn, username, email, &password_hash, role)
            .map_err(AppError::from)
            .map_err(|e| {
                // A concurrent registration won the race for the same username or email.
                if e.is_unique_violation() {
                    AppError::AlreadyExists
                } else {
                    e
                }
            })?;

        tracing::info!(user_id = id, role = ?role, "user registered");
        Ok(id)
    }

    /// Checks a username/password pair for the given login path.
    ///
    /// Unknown usernames, wrong passwords and non-admins on the admin path all
    /// yield `InvalidCredentials`. The account's active flag is not consulted.
    pub fn authenticate(
        &self,
        pool: &DbPool,
        username: &str,
        password: &str,
        path: LoginPath,
    ) -> AppResult<User> {
        let user = {
            let conn = pool.get()?;
            users::find_by_username(&conn, username)?
        };

        let user = match user {
            Some(user) if path == LoginPath::Author || user.role == Role::Admin => user,
            Some(_) | None => {
                if let Some(dummy) = &self.dummy_hash {
                    let _ = Self::verify(dummy, password);
                }
                tracing::warn!(username, path = path.as_str(), "login rejected: no such account");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !Self::verify(&user.password_hash, password) {
            tracing::warn!(username, path = path.as_str(), "login rejected: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = user.id, path = path.as_str(), "login succeeded");
        Ok(user)
    }
}
