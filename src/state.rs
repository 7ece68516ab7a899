use std::sync::Arc;

use sqlx::{Pool, Sqlite};

use crate::{config::Config, connect::connect, error::QueryError, media::MediaStore};

pub struct State {
    pub pool: Pool<Sqlite>,
    pub config: Config,
    pub media: MediaStore,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>, QueryError> {
        let pool = connect(&config.database_url, config.database_max_connections).await?;
        Ok(Self::with_pool(config, pool))
    }

    pub fn with_pool(config: Config, pool: Pool<Sqlite>) -> Arc<Self> {
        let media = MediaStore::new(&config.media_root, &config.media_url);

        Arc::new(Self {
            pool,
            config,
            media,
        })
    }
}
