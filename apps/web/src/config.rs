//! Web application configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                      | Default          |
//! |-------------------------------|------------------|
//! | `TALLY_BIND_ADDR`             | `0.0.0.0:8000`   |
//! | `TALLY_DB_PATH`               | `./tally.db`     |
//! | `TALLY_DB_MAX_CONNECTIONS`    | `5`              |
//! | `TALLY_JWT_SECRET`            | dev secret       |
//! | `TALLY_SESSION_LIFETIME_SECS` | `43200` (12 h)   |
//! | `TALLY_COOKIE_SECURE`         | `false`          |
//! | `TALLY_STATIC_DIR`            | `./static`       |
//! | `TALLY_BOOTSTRAP_ADMIN`       | unset            |
//! | `TALLY_BOOTSTRAP_PASSWORD`    | unset            |

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Secret used when `TALLY_JWT_SECRET` is unset. Never use in production.
pub const DEV_JWT_SECRET: &str = "tally-dev-secret-change-in-production";

/// Web application configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// HTTP listen address
    pub bind_addr: SocketAddr,

    /// SQLite database file
    pub db_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// HS256 signing key for session tokens
    pub jwt_secret: String,

    /// Session token lifetime in seconds
    pub session_lifetime_secs: i64,

    /// Mark the session cookie `Secure` (HTTPS only)
    pub cookie_secure: bool,

    /// Directory served under `/static`
    pub static_dir: PathBuf,

    /// Admin account created when the users table is empty
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// First admin account, taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl WebConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = WebConfig {
            bind_addr: lookup("TALLY_BIND_ADDR")
                .unwrap_or_else(|| "0.0.0.0:8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TALLY_BIND_ADDR".to_string()))?,

            db_path: lookup("TALLY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./tally.db")),

            db_max_connections: lookup("TALLY_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()))?,

            jwt_secret: lookup("TALLY_JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string()),

            session_lifetime_secs: lookup("TALLY_SESSION_LIFETIME_SECS")
                .unwrap_or_else(|| "43200".to_string()) // 12 hours
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TALLY_SESSION_LIFETIME_SECS".to_string()))?,

            cookie_secure: lookup("TALLY_COOKIE_SECURE")
                .unwrap_or_else(|| "false".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TALLY_COOKIE_SECURE".to_string()))?,

            static_dir: lookup("TALLY_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./static")),

            bootstrap_admin: match (lookup("TALLY_BOOTSTRAP_ADMIN"), lookup("TALLY_BOOTSTRAP_PASSWORD")) {
                (Some(username), Some(password)) => Some(BootstrapAdmin { username, password }),
                (Some(_), None) => {
                    return Err(ConfigError::MissingRequired("TALLY_BOOTSTRAP_PASSWORD".to_string()))
                }
                _ => None,
            },
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()));
        }

        if config.session_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("TALLY_SESSION_LIFETIME_SECS".to_string()));
        }

        Ok(config)
    }

    /// `true` when the JWT secret is the built-in development value.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<WebConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WebConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.db_path, PathBuf::from("./tally.db"));
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.session_lifetime_secs, 43_200);
        assert!(!config.cookie_secure);
        assert!(config.uses_dev_secret());
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TALLY_BIND_ADDR", "127.0.0.1:9000"),
            ("TALLY_JWT_SECRET", "prod-secret"),
            ("TALLY_COOKIE_SECURE", "true"),
            ("TALLY_BOOTSTRAP_ADMIN", "owner"),
            ("TALLY_BOOTSTRAP_PASSWORD", "hunter22"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert!(config.cookie_secure);
        assert!(!config.uses_dev_secret());
        assert_eq!(config.bootstrap_admin.unwrap().username, "owner");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("TALLY_DB_MAX_CONNECTIONS", "many")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("TALLY_DB_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            load(&[("TALLY_BOOTSTRAP_ADMIN", "owner")]),
            Err(ConfigError::MissingRequired(_))
        ));
    }
}
