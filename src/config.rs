use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    /// Reads the process environment. Call `dotenv()` first to pick up a
    /// `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| Error::Config(format!("{key} must be set")))
        };

        let port = required("HTTP_PORT")?
            .parse::<u16>()
            .map_err(|_| Error::Config("HTTP_PORT must be a valid number".to_string()))?;
        let database_url = required("DATABASE_URL")?;
        let host = lookup("HTTP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                Error::Config("DB_MAX_CONNECTIONS must be a valid number".to_string())
            })?,
            None => 10,
        };

        Ok(Self {
            host,
            port,
            database_url,
            max_connections,
        })
    }
}
