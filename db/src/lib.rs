use color_eyre::eyre::{eyre, WrapErr};
use sqlx::postgres::PgPoolOptions;

pub mod cooking;
pub mod errors;
pub mod follows;
pub mod users;

#[cfg(test)]
pub(crate) mod test_utils;

pub use errors::{Error, Result};
pub use sqlx;
pub use sqlx::PgPool;

const MIGRATION_LOCK_ID: i64 = 0xF0_0D_F0_0D;

#[tracing::instrument(skip(database_url), err)]
pub async fn setup_db_pool(database_url: &str, max_connections: u32) -> color_eyre::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .wrap_err("Failed to connect to the database")?;

    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&pool)
        .await
        .wrap_err("Failed to take the migration lock")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .wrap_err("Failed to run migrations")?;

    let unlocked = sqlx::query_scalar::<_, Option<bool>>("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .fetch_one(&pool)
        .await
        .wrap_err("Failed to release the migration lock")?;

    match unlocked {
        Some(true) => tracing::info!("Migration lock unlocked"),
        Some(false) => tracing::warn!("Migration lock was not held when unlocking"),
        None => return Err(eyre!("pg_advisory_unlock returned NULL")),
    }

    Ok(pool)
}
