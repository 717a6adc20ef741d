use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::credentials::CredentialStore;
use crate::auth::session::SessionCarrier;
use crate::auth::token::{TokenConfigError, TokenService};
use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub tokens: Arc<TokenService>,
    pub carrier: SessionCarrier,
    pub credentials: CredentialStore,
}

impl AppState {
    /// Fails when the signing secret is missing or unusable.
    pub fn new(db: DbPool, config: Config) -> Result<Self, TokenConfigError> {
        let tokens = TokenService::from_config(&config.auth)?;
        let carrier = SessionCarrier::from_config(&config.auth, tokens.ttl().num_seconds());
        let credentials = CredentialStore::new(config.auth.bcrypt_cost);
        Ok(Self {
            db,
            config,
            tokens: Arc::new(tokens),
            carrier,
            credentials,
        })
    }
}
