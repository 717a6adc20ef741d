use std::net::SocketAddr;

use clap::Parser;
use rand::Rng;
use tracing_subscriber::EnvFilter;

use quill::auth::credentials::CredentialStore;
use quill::auth::handlers::RegisterRequest;
use quill::config::{Cli, Command, Config};
use quill::db;
use quill::db::models::Role;
use quill::extractors::Validate;
use quill::routes;
use quill::state::{AppState, DbPool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    // create-admin only hashes a password; no token secret required
    if let Some(Command::CreateAdmin {
        username,
        email,
        password,
    }) = &cli.command
    {
        let config = Config::read(&cli)?;
        config.auth.validate_hashing()?;
        let pool = open_database(&config)?;
        return create_admin(&pool, &config, username, email, password.clone());
    }

    let config = Config::load(&cli)?;
    tracing::debug!(auth = ?config.auth, "configuration loaded");
    let pool = open_database(&config)?;

    let state = AppState::new(pool, config.clone())?;
    let app = routes::build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn open_database(config: &Config) -> anyhow::Result<DbPool> {
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;
    Ok(pool)
}

/// Bootstraps an administrator. Admins cannot be created over HTTP.
fn create_admin(
    pool: &DbPool,
    config: &Config,
    username: &str,
    email: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let generated = password.is_none();
    let password = password.unwrap_or_else(generate_password);

    let req = RegisterRequest {
        username: username.to_string(),
        email: email.to_string(),
        password,
    }
    .validate()
    .map_err(anyhow::Error::msg)?;

    let credentials = CredentialStore::new(config.auth.bcrypt_cost);
    let id = credentials.register(pool, &req.username, &req.email, &req.password, Role::Admin)?;

    println!("Created admin '{}' (id {})", req.username, id);
    if generated {
        println!("Generated password: {}", req.password);
    }
    Ok(())
}

fn generate_password() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";
    let mut rng = rand::thread_rng();
    (0..20)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
