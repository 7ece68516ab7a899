use std::str::FromStr;

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use super::error::QueryError;

pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Opens the pool and brings the schema up to date.
///
/// `sqlite::memory:` databases live as long as their connection, so the pool
/// never retires idle connections.
pub async fn connect(url: &str, max_connections: u32) -> Result<Pool<Sqlite>, QueryError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .inspect_err(|e| log::error!("Failed to connect to {url}: {e}"))?;

    MIGRATOR
        .run(&pool)
        .await
        .inspect_err(|e| log::error!("Connected to {url}, but migrating failed: {e}"))?;

    log::info!("Connected to {url}");
    Ok(pool)
}
