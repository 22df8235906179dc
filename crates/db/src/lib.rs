pub mod memory;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod seed;

use carebook_core::errors::CareError;
use eyre::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

pub type DbPool = Pool<Postgres>;

pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

pub(crate) fn db_error(err: sqlx::Error) -> CareError {
    CareError::Database(eyre::Report::new(err))
}
