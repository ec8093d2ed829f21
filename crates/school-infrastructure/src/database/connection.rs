//! Database connection pool and schema bootstrap

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;

use school_core::schema::Catalog;
use school_shared::config::DatabaseSettings;

use super::ddl;

pub async fn create_pool(url: &str, settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .connect(url)
        .await
}

/// Creates every catalog table, foreign key and index that does not exist yet.
/// Runs in one transaction; existing tables are left untouched.
pub async fn bootstrap_schema(pool: &PgPool, catalog: &Catalog) -> Result<(), sqlx::Error> {
    let statements = ddl::create_statements(catalog);
    let mut tx = pool.begin().await?;
    for statement in &statements {
        sqlx::raw_sql(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    info!(tables = catalog.entities().len(), statements = statements.len(), "schema bootstrapped");
    Ok(())
}
