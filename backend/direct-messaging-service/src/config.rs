use crate::error::AppError;
use crate::services::LedgerSettings;
use db_pool::env_utils::parse_env_with_default;
use dotenvy::dotenv;
use std::env;
use std::fmt;

/// Where conversations and messages are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::Config(format!(
                "CHAT_STORE must be postgres or memory, got {other}"
            ))),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub store: StoreBackend,
    /// Set whenever `store` is `Postgres`
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt_secret: String,
    pub edit_window_minutes: i64,
    pub history_page_max: i64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("store", &self.store)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("port", &self.port)
            .field("jwt_secret", &"[REDACTED]")
            .field("edit_window_minutes", &self.edit_window_minutes)
            .field("history_page_max", &self.history_page_max)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let store = match env::var("CHAT_STORE") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Postgres,
        };
        let database_url = match store {
            StoreBackend::Postgres => Some(
                env::var("DATABASE_URL")
                    .map_err(|_| AppError::Config("DATABASE_URL missing".into()))?,
            ),
            StoreBackend::Memory => env::var("DATABASE_URL").ok(),
        };
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::Config("JWT_SECRET missing".into()))?;

        let defaults = LedgerSettings::default();
        let port = parse_env_with_default("PORT", 8080u16);
        let edit_window_minutes =
            parse_env_with_default("EDIT_WINDOW_MINUTES", defaults.edit_window_minutes);
        let history_page_max =
            parse_env_with_default("HISTORY_PAGE_MAX", defaults.history_page_max);

        if edit_window_minutes <= 0 {
            return Err(AppError::Config(
                "EDIT_WINDOW_MINUTES must be positive".into(),
            ));
        }
        if history_page_max <= 0 {
            return Err(AppError::Config("HISTORY_PAGE_MAX must be positive".into()));
        }

        Ok(Self {
            store,
            database_url,
            port,
            jwt_secret,
            edit_window_minutes,
            history_page_max,
        })
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            edit_window_minutes: self.edit_window_minutes,
            history_page_max: self.history_page_max,
        }
    }
}
