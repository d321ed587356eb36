use std::{convert::Infallible, sync::Arc};

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use thiserror::Error;
use warp::Filter;

use crate::config::{Config, ConfigError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Cache: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fixture: {0}")]
    Fixture(String),

    #[error("Server: {0}")]
    Server(#[from] warp::Error),

    #[error("Query: {0}")]
    Query(#[from] crate::error::Error),
}

pub struct State {
    pub pool: Pool<Postgres>,
    pub cache: redis::Client,
    pub config: Config,
}

impl State {
    pub async fn connect(config: Config) -> Result<Arc<Self>, StartupError> {
        log::info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        let cache = redis::Client::open(config.redis_url.as_str())?;
        tokio::fs::create_dir_all(&config.media_root).await?;

        Ok(Arc::new(Self { pool, cache, config }))
    }

    /// Nothing is opened until the first query; used by tests.
    pub fn lazy(config: Config) -> Result<Arc<Self>, StartupError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect_lazy(&config.database_url)?;
        let cache = redis::Client::open(config.redis_url.as_str())?;

        Ok(Arc::new(Self { pool, cache, config }))
    }
}

pub fn with_state(
    state: Arc<State>,
) -> impl Filter<Extract = (Arc<State>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

pub async fn connect_pool(database_url: &str) -> Result<Pool<Postgres>, StartupError> {
    Ok(PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await?)
}

pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), StartupError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("Migrations applied");
    Ok(())
}
