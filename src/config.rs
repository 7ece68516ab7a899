use std::{env, fmt, str::FromStr};

use log::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub media_root: String,
    pub media_url: String,
    pub base_url: String,
    pub session_secret: String,
    pub session_lifetime_hours: i64,
}

#[derive(Debug)]
pub struct ConfigError {
    key: &'static str,
    info: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {} value: {}", self.key, self.info)
    }
}

impl std::error::Error for ConfigError {}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            database_url: "sqlite://foodgram.sqlite".to_string(),
            database_max_connections: 5,
            media_root: "media".to_string(),
            media_url: "/media/".to_string(),
            base_url: "http://localhost:8000".to_string(),
            session_secret: "secret".to_string(),
            session_lifetime_hours: 24,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let session_secret = match env::var("SESSION_SECRET") {
            Ok(secret) => secret,
            Err(_) => {
                warn!("SESSION_SECRET not set, sessions are signed with the default key");
                defaults.session_secret
            }
        };

        Ok(Self {
            port: try_load("FOODGRAM_PORT", defaults.port)?,
            database_url: try_load("DATABASE_URL", defaults.database_url)?,
            database_max_connections: try_load(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            media_root: try_load("MEDIA_ROOT", defaults.media_root)?,
            media_url: try_load("MEDIA_URL", defaults.media_url)?,
            base_url: try_load("BASE_URL", defaults.base_url)?,
            session_secret,
            session_lifetime_hours: try_load(
                "SESSION_LIFETIME_HOURS",
                defaults.session_lifetime_hours,
            )?,
        })
    }
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(value) => value.parse().map_err(|e: T::Err| ConfigError {
            key,
            info: e.to_string(),
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
