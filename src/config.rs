use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
    #[serde(default)]
    pub entitlement: EntitlementConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            stripe: StripeConfig::default(),
            entitlement: EntitlementConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/craftprice.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeConfig {
    /// Secret key; the STRIPE_SECRET_KEY environment variable takes priority.
    /// When absent, subscription endpoints return a configuration error.
    pub secret_key: Option<String>,
    pub api_base: String,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            api_base: "https://api.stripe.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntitlementConfig {
    pub free_calculation_limit: u32,
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            free_calculation_limit: 7,
        }
    }
}

/// Load configuration from a TOML file, falling back to built-in defaults.
///
/// Each section is extracted independently so a partial config.toml only
/// overrides the sections it names. The STRIPE_SECRET_KEY environment
/// variable overrides any file-provided secret.
pub fn load_config(path: &Path) -> Config {
    let mut config = match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str::<toml::Value>(&content) {
            Ok(toml_value) => Config {
                server: extract_section(&toml_value, "server"),
                database: extract_section(&toml_value, "database"),
                stripe: extract_section(&toml_value, "stripe"),
                entitlement: extract_section(&toml_value, "entitlement"),
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "Failed to parse config file, using built-in defaults"
                );
                Config::default()
            }
        },
        Err(_) => {
            tracing::info!(
                path = %path.display(),
                "No config file found, using built-in defaults"
            );
            Config::default()
        }
    };

    if let Ok(key) = std::env::var("STRIPE_SECRET_KEY") {
        if !key.is_empty() {
            config.stripe.secret_key = Some(key);
        }
    }

    config
}

fn extract_section<T>(toml_value: &toml::Value, name: &str) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match toml_value.get(name) {
        Some(section) => match section.clone().try_into() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(
                    section = name,
                    error = %e,
                    "Invalid config section, using defaults"
                );
                T::default()
            }
        },
        None => {
            tracing::debug!(section = name, "Config section not present, using defaults");
            T::default()
        }
    }
}
