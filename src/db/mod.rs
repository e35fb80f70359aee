//! PostgreSQL access: pool setup, migrations, rows and queries.

pub mod models;
pub mod queries;

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to prove the pool works.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `migrations/`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
mod tests {
    const INIT_SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

    /// Totals are stored at the scale they were computed with.
    #[test]
    fn money_columns_are_unscaled() {
        for column in ["grand_total", "discount_amount", "surcharge_amount", "final_price", "unit_price"] {
            for line in INIT_SCHEMA.lines().filter(|l| l.trim_start().starts_with(column)) {
                assert!(
                    line.contains("NUMERIC NOT NULL"),
                    "{} is declared as `{}`",
                    column,
                    line.trim()
                );
            }
        }
    }
}
