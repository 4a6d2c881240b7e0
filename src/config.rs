use std::{env, path::PathBuf};

use thiserror::Error;
use tracing::Level;

use crate::{auth::AuthSettings, repositories::MongoDbInitializationInfo};

const DEFAULT_COLLECTION: &str = "emprendimientos";
const DEFAULT_PORT: u16 = 80;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
    #[error("AUTH0_DOMAIN and AUTH0_AUDIENCE must be set together")]
    PartialAuth,
}

#[derive(Debug)]
pub enum StoreBackend {
    MongoDb(MongoDbInitializationInfo),
    InMemory { seed_path: Option<PathBuf> },
}

#[derive(Debug)]
pub struct Config {
    pub store: StoreBackend,
    pub port: u16,
    pub log_path: Option<PathBuf>,
    pub log_level: Level,
    pub auth: Option<AuthSettings>,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let store = match get("STORE_BACKEND").as_deref() {
            None | Some("mongodb") => StoreBackend::MongoDb(MongoDbInitializationInfo {
                uri: require("MONGODB_URI")?,
                database: require("MONGODB_DB")?,
                collection: get("MONGODB_COLLECTION").unwrap_or_else(|| String::from(DEFAULT_COLLECTION)),
            }),
            Some("memory") => StoreBackend::InMemory {
                seed_path: get("VENTURE_SEED_PATH").map(PathBuf::from),
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let port = match get("AXUM_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "AXUM_PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let log_level = match get("LOG_LEVEL") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "LOG_LEVEL",
                value: raw,
            })?,
            None => Level::DEBUG,
        };

        let auth = match (get("AUTH0_DOMAIN"), get("AUTH0_AUDIENCE")) {
            (Some(domain), Some(audience)) => Some(AuthSettings { domain, audience }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialAuth),
        };

        Ok(Config {
            store,
            port,
            log_path: get("LOG_PATH").map(PathBuf::from),
            log_level,
            auth,
        })
    }
}
