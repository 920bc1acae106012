use color_eyre::eyre::{Context, Result};
use db::setup_db_pool;
use sqlx::PgPool;
use tracing::instrument;
use url::Url;

use crate::crypto::PasswordHashing;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone)]
pub struct DatabaseConfig {
    url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: Url,
    pub port: u16,
    pub database: DatabaseConfig,
    pub insecure_password_hashing: bool,
}

impl AppConfig {
    #[instrument(name = "AppConfig::from_env")]
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("APP_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base_url).wrap_err("Invalid APP_BASE_URL not parsable")?;

        let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let port: u16 = port.parse().wrap_err("PORT must be a port number")?;

        let url = std::env::var("DATABASE_URL")
            .wrap_err("Missing DATABASE_URL, needed for app launch")?;
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .wrap_err("DATABASE_MAX_CONNECTIONS must be a positive number")?;

        Ok(Self {
            base_url,
            port,
            database: DatabaseConfig {
                url,
                max_connections,
            },
            insecure_password_hashing: std::env::var("INSECURE_PASSWORD_HASHING").is_ok(),
        })
    }

    /// Absolute URL for `path` (which may carry a query string) on this deployment.
    pub fn app_url(&self, path_and_query: &str) -> String {
        let mut url = self.base_url.clone();

        match path_and_query.split_once('?') {
            Some((path, query)) => {
                url.set_path(path);
                url.set_query(Some(query));
            }
            None => url.set_path(path_and_query),
        }

        url.into()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub app: AppConfig,
    pub db: PgPool,
    pub passwords: PasswordHashing,
}

impl AppState {
    #[instrument(name = "AppState::from_config", skip_all, err)]
    pub async fn from_config(app: AppConfig) -> Result<Self> {
        let db = setup_db_pool(app.database.url(), app.database.max_connections).await?;
        let passwords = PasswordHashing::new(app.insecure_password_hashing);

        if app.insecure_password_hashing {
            tracing::warn!(
                "INSECURE_PASSWORD_HASHING is set, passwords are hashed with minimal cost"
            );
        }

        Ok(Self { app, db, passwords })
    }
}

#[cfg(test)]
impl AppConfig {
    pub(crate) fn for_tests() -> Self {
        Self {
            base_url: Url::parse("https://foodgram.example").unwrap(),
            port: 3000,
            database: DatabaseConfig {
                url: "postgres://secret@localhost/foodgram".to_string(),
                max_connections: 5,
            },
            insecure_password_hashing: true,
        }
    }
}
