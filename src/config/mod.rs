use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

use crate::keys::{KeyScheme, SecretKey};

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Database connection URL (`postgres://…` or `sqlite:…`)
    pub database_url: String,

    /// Runtime secret for account-key encryption (`SECRET_KEY`)
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Which account-key scheme new clients get (`ACCOUNT_KEY_SCHEME`)
    #[serde(default)]
    pub account_key_scheme: KeyScheme,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    /// Get a direct reference to the database URL
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Resolve the encryption secret: compiled-in value first, then the
    /// environment, then the built-in fallback
    pub fn secret(&self) -> SecretKey {
        SecretKey::resolve(option_env!("MEMBERSHIP_SECRET_KEY"), self.secret_key.as_deref())
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    dotenv().ok();

    let config = Config::load()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_defaults_to_legacy() {
        let config: Config = envy::from_iter([(
            "DATABASE_URL".to_string(),
            "sqlite::memory:".to_string(),
        )])
        .unwrap();

        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.account_key_scheme, KeyScheme::Legacy);
        assert!(config.secret_key.is_none());
    }

    #[test]
    fn reads_secret_and_scheme() {
        let config: Config = envy::from_iter([
            ("DATABASE_URL".to_string(), "postgres://localhost/members".to_string()),
            ("SECRET_KEY".to_string(), "from-env".to_string()),
            ("ACCOUNT_KEY_SCHEME".to_string(), "secure".to_string()),
        ])
        .unwrap();

        assert_eq!(config.account_key_scheme, KeyScheme::Secure);
        assert_eq!(config.secret_key.as_deref(), Some("from-env"));
    }
}
