// ============================================================================
// School Infrastructure - PostgreSQL Entity Repository
// File: crates/school-infrastructure/src/database/postgres/entity_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{error, info, warn};
use uuid::Uuid;

use school_core::domain::Record;
use school_core::error::DomainError;
use school_core::repositories::{EntityRepository, ListQuery, Page, TenantFilter};
use school_core::schema::EntityDef;

use super::sql;

/// One repository for every catalog table. Delete policies and reference
/// checks are enforced by the foreign keys created at bootstrap.
pub struct PgEntityRepository {
    pool: PgPool,
}

impl PgEntityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_db_error(def: &EntityDef, action: &str, e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() {
            warn!(entity = def.name, action, "foreign key violation: {}", db.message());
            let constraint = db.constraint().unwrap_or("foreign key");
            return DomainError::ReferentialIntegrity(format!(
                "{} on {} violates {}",
                action, def.name, constraint
            ));
        }
        if db.is_unique_violation() {
            return DomainError::Conflict(format!("{} already exists", def.name));
        }
    }
    error!("Database error on {} {}: {}", action, def.name, e);
    DomainError::DatabaseError(e.to_string())
}

fn decode(def: &EntityDef, row: &sqlx::postgres::PgRow) -> Result<Record, DomainError> {
    sql::decode_row(def, row).map_err(|e| {
        error!("Failed to decode {} row: {}", def.name, e);
        DomainError::DatabaseError(e.to_string())
    })
}

#[async_trait]
impl EntityRepository for PgEntityRepository {
    async fn insert(&self, def: &EntityDef, record: &Record) -> Result<Record, DomainError> {
        let row = sql::insert(def, record)
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(def, "insert", e))?;

        info!(entity = def.name, id = %record.id, "row inserted");
        decode(def, &row)
    }

    async fn find(&self, def: &EntityDef, id: Uuid, filter: TenantFilter) -> Result<Option<Record>, DomainError> {
        let row = sql::find(def, id, filter)
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(def, "find", e))?;

        row.map(|r| decode(def, &r)).transpose()
    }

    async fn exists(&self, def: &EntityDef, id: Uuid, filter: TenantFilter) -> Result<bool, DomainError> {
        let row = sql::exists(def, id, filter)
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(def, "exists", e))?;

        row.try_get::<bool, _>(0)
            .map_err(|e| DomainError::DatabaseError(e.to_string()))
    }

    async fn list(&self, def: &EntityDef, filter: TenantFilter, query: &ListQuery) -> Result<Page, DomainError> {
        let total: i64 = sql::count(def, filter, query)
            .build()
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get(0))
            .map_err(|e| map_db_error(def, "count", e))?;

        let rows = sql::list(def, filter, query)
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(def, "list", e))?;

        let items = rows
            .iter()
            .map(|row| decode(def, row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            total: total.max(0) as u64,
            page: query.pagination.page,
            per_page: query.pagination.per_page,
        })
    }

    async fn update(&self, def: &EntityDef, record: &Record, filter: TenantFilter) -> Result<Option<Record>, DomainError> {
        let row = sql::update(def, record, filter)
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(def, "update", e))?;

        if row.is_some() {
            info!(entity = def.name, id = %record.id, "row updated");
        }
        row.map(|r| decode(def, &r)).transpose()
    }

    async fn delete(&self, def: &EntityDef, id: Uuid, filter: TenantFilter) -> Result<bool, DomainError> {
        let result = sql::delete(def, id, filter)
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_error(def, "delete", e))?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(entity = def.name, id = %id, "row deleted");
        }
        Ok(deleted)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| {
                error!("Database ping failed: {}", e);
                DomainError::DatabaseError(e.to_string())
            })
    }
}
