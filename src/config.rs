use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub perks: PerksConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Runtime knobs of the perk program. Immutable after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerksConfig {
    /// CORS origin for the embeddable widget; `*` allows any origin.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
    /// Shared secret presented by staff redemption terminals. Empty disables redemption.
    #[serde(default)]
    pub staff_redeem_token: String,
    /// Cap for `item` discounts in major units; 0 means uncapped.
    #[serde(default)]
    pub free_item_cap: f64,
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

/// How member bearer credentials are turned into a verified email.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentityConfig {
    /// HS256 secret for locally verified member JWTs.
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// Base URL of the hosted auth service (`{auth_url}/auth/v1/user`).
    #[serde(default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_allowed_origin() -> String {
    "*".to_string()
}

fn default_currency() -> String {
    "GBP".to_string()
}

impl Default for PerksConfig {
    fn default() -> Self {
        Self {
            allowed_origin: default_allowed_origin(),
            staff_redeem_token: String::new(),
            free_item_cap: 0.0,
            default_currency: default_currency(),
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        Self::load(&config_path, |name| env::var(name).ok())
    }

    /// Reads the file at `config_path` (if any) and applies overrides from `get_env`.
    pub fn load<F>(config_path: &str, get_env: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        use std::io::ErrorKind;

        let get_env_parse = |name: &str| -> Option<f64> {
            get_env(name).and_then(|v| v.trim().parse::<f64>().ok())
        };

        let mut config: Config = match std::fs::read_to_string(config_path) {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("Failed to parse config file: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let database_url = get_env("DATABASE_URL").ok_or(
                    "DATABASE_URL is not set and no config file was found at CONFIG_PATH",
                )?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env("SERVER_PORT")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(8080),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env("DB_MAX_CONNECTIONS")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(10),
                    },
                    perks: PerksConfig::default(),
                    identity: IdentityConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Unable to read config file {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Some(v) = get_env("SERVER_HOST") {
            config.server.host = v;
        }
        if let Some(v) = get_env("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Some(v) = get_env("DATABASE_URL") {
            config.database.url = v;
        }
        if let Some(v) = get_env("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Some(v) = get_env("WIDGET_ORIGIN") {
            config.perks.allowed_origin = v;
        }
        if let Some(v) = get_env("STAFF_REDEEM_TOKEN") {
            config.perks.staff_redeem_token = v;
        }
        // unparsable cap falls back to uncapped
        if get_env("FREE_ITEM_CAP").is_some() {
            config.perks.free_item_cap = get_env_parse("FREE_ITEM_CAP").unwrap_or(0.0);
        }
        if let Some(v) = get_env("DEFAULT_CURRENCY") {
            config.perks.default_currency = v;
        }
        if let Some(v) = get_env("AUTH_JWT_SECRET") {
            config.identity.jwt_secret = Some(v);
        }
        if let Some(v) = get_env("AUTH_URL") {
            config.identity.auth_url = Some(v);
        }
        if let Some(v) = get_env("AUTH_API_KEY") {
            config.identity.api_key = Some(v);
        }

        if config.database.url.trim().is_empty() {
            return Err("database.url must not be empty".into());
        }

        Ok(config)
    }
}
