use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "quill", about = "A multi-author blogging server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Secret used to sign session tokens
    #[arg(long, env = "QUILL_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an administrator account and exit (no token secret needed)
    CreateAdmin {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        /// Generated and printed when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no token secret configured (set auth.token_secret, --token-secret or QUILL_TOKEN_SECRET)")]
    MissingTokenSecret,

    #[error("same_site = \"none\" requires secure_cookie = true")]
    InsecureSameSite,

    #[error("bcrypt_cost must be between 4 and 31, got {0}")]
    BcryptCost(u32),
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed to make credentialed cross-origin requests.
    pub allowed_origins: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub token_ttl_hours: u64,
    pub bcrypt_cost: u32,
    pub secure_cookie: bool,
    pub same_site: SameSite,
    pub token_secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("cookie_name", &self.cookie_name)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("secure_cookie", &self.secure_cookie)
            .field("same_site", &self.same_site)
            .field("token_secret", &self.token_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "token".to_string(),
            token_ttl_hours: 24,
            bcrypt_cost: 10,
            secure_cookie: false,
            same_site: SameSite::Lax,
            token_secret: None,
        }
    }
}

impl AuthConfig {
    /// The configured signing secret. Startup fails when it is absent.
    pub fn token_secret(&self) -> Result<&str, ConfigError> {
        self.token_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingTokenSecret)
    }

    /// Everything the server needs before it accepts requests.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.token_secret()?;
        if self.same_site == SameSite::None && !self.secure_cookie {
            return Err(ConfigError::InsecureSameSite);
        }
        self.validate_hashing()
    }

    /// The subset needed to hash passwords, as `create-admin` does.
    pub fn validate_hashing(&self) -> Result<(), ConfigError> {
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::BcryptCost(self.bcrypt_cost));
        }
        Ok(())
    }
}

impl Config {
    /// Reads and validates the configuration for serving.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let config = Self::read(cli)?;
        config.auth.validate()?;
        Ok(config)
    }

    /// Reads the file and applies CLI overrides without startup validation.
    pub fn read(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref secret) = cli.token_secret {
            config.auth.token_secret = Some(secret.clone());
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("quill.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".quill")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("quill.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn cli(data_dir: PathBuf) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(data_dir),
            token_secret: Some(SECRET.to_string()),
            command: None,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert!(config.server.allowed_origins.is_empty());
        assert_eq!(config.auth.cookie_name, "token");
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert_eq!(config.auth.same_site, SameSite::Lax);
        assert!(config.auth.token_secret.is_none());
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_defaults_to_home_dot_quill() {
        let mut cli = cli(PathBuf::new());
        cli.data_dir = None;
        assert!(Config::data_dir(&cli).ends_with(".quill"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli(tmp.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.db_path(), tmp.path().join("quill.db"));
        assert_eq!(config.auth.token_secret(), Ok(SECRET));
    }

    #[test]
    fn load_fails_without_token_secret() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cli = cli(tmp.path().to_path_buf());
        cli.token_secret = None;
        let err = Config::load(&cli).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::MissingTokenSecret)
        );
    }

    #[test]
    fn read_without_token_secret_still_allows_hashing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cli = cli(tmp.path().to_path_buf());
        cli.token_secret = None;
        let config = Config::read(&cli).unwrap();
        assert_eq!(config.auth.validate_hashing(), Ok(()));
        assert_eq!(
            config.auth.validate(),
            Err(ConfigError::MissingTokenSecret)
        );
    }

    #[test]
    fn empty_token_secret_counts_as_missing() {
        let auth = AuthConfig {
            token_secret: Some(String::new()),
            ..AuthConfig::default()
        };
        assert_eq!(auth.validate(), Err(ConfigError::MissingTokenSecret));
    }

    #[test]
    fn same_site_none_requires_secure_cookie() {
        let mut auth = AuthConfig {
            token_secret: Some(SECRET.to_string()),
            same_site: SameSite::None,
            ..AuthConfig::default()
        };
        assert_eq!(auth.validate(), Err(ConfigError::InsecureSameSite));
        auth.secure_cookie = true;
        assert_eq!(auth.validate(), Ok(()));
    }

    #[test]
    fn bcrypt_cost_is_range_checked() {
        let auth = AuthConfig {
            token_secret: Some(SECRET.to_string()),
            bcrypt_cost: 3,
            ..AuthConfig::default()
        };
        assert_eq!(auth.validate(), Err(ConfigError::BcryptCost(3)));
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "127.0.0.1"
port = 9000
allowed_origins = ["http://localhost:5173"]

[auth]
cookie_name = "quill_session"
token_ttl_hours = 12
same_site = "strict"
token_secret = "ffffffffffffffffffffffffffffffff"
"#,
        )
        .unwrap();

        let mut cli = cli(tmp.path().to_path_buf());
        cli.config = Some(config_path);
        cli.token_secret = None;
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.allowed_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.auth.cookie_name, "quill_session");
        assert_eq!(config.auth.token_ttl_hours, 12);
        assert_eq!(config.auth.same_site, SameSite::Strict);
        assert_eq!(
            config.auth.token_secret(),
            Ok("ffffffffffffffffffffffffffffffff")
        );
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
port = 9000

[auth]
token_secret = "from-file-from-file-from-file-xx"
"#,
        )
        .unwrap();

        let mut cli = cli(tmp.path().to_path_buf());
        cli.config = Some(config_path);
        cli.port = Some(4000);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.auth.token_secret(), Ok(SECRET));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let auth = AuthConfig {
            token_secret: Some(SECRET.to_string()),
            ..AuthConfig::default()
        };
        let rendered = format!("{:?}", auth);
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("REDACTED"));
    }
}
