//! Connection settings from the environment (and `.env` when present).

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/recordmap";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            database_url: DEFAULT_DATABASE_URL.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl StoreConfig {
    /// `DATABASE_URL` and `DB_MAX_CONNECTIONS`, loading `.env` first if one exists.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let max_connections = get("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        StoreConfig {
            database_url,
            max_connections,
        }
    }
}
