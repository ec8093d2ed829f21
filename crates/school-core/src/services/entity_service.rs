// ============================================================================
// School Core - Entity Service
// File: crates/school-core/src/services/entity_service.rs
// ============================================================================
//! Generic create/read/update/delete for every catalog entity

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use school_shared::types::{new_id, AuditFields, Pagination};
use school_shared::utils::{normalize_field_key, to_camel_case};

use crate::domain::{parse_payload, CallerContext, PayloadMode, Record};
use crate::error::DomainError;
use crate::repositories::{EntityRepository, ListQuery, Page, TenantFilter};
use crate::schema::{Catalog, EntityDef};

/// CRUD over any entity of the catalog, scoped to the caller's tenant
pub struct EntityService<R: EntityRepository + ?Sized> {
    repo: Arc<R>,
    catalog: Arc<Catalog>,
}

impl<R: EntityRepository + ?Sized> Clone for EntityService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            catalog: self.catalog.clone(),
        }
    }
}

impl<R: EntityRepository + ?Sized> EntityService<R> {
    pub fn new(repo: Arc<R>, catalog: Arc<Catalog>) -> Self {
        Self { repo, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn ping(&self) -> Result<(), DomainError> {
        self.repo.ping().await
    }

    /// Create a row from a JSON body
    pub async fn create(
        &self,
        entity: &str,
        body: &Value,
        caller: &CallerContext,
    ) -> Result<Record, DomainError> {
        let def = self.catalog.resolve(entity)?;
        self.ensure_writable(def, caller)?;

        let values = parse_payload(def, body, PayloadMode::Create)?;
        let tenant_id = def.is_tenant_scoped().then_some(caller.tenant_id);
        let record = Record::new(def, new_id(), tenant_id, values, AuditFields::created(caller.user_id));

        self.verify_references(def, &record, caller).await?;

        let created = self.repo.insert(def, &record).await?;
        info!(entity = def.name, id = %created.id, tenant = %caller.tenant_id, "record created");
        Ok(created)
    }

    pub async fn get(
        &self,
        entity: &str,
        id: Uuid,
        caller: &CallerContext,
    ) -> Result<Record, DomainError> {
        let def = self.catalog.resolve(entity)?;
        debug!(entity = def.name, %id, "fetching record");
        self.repo
            .find(def, id, TenantFilter::for_entity(def, caller))
            .await?
            .ok_or_else(|| DomainError::not_found(def.name, id))
    }

    /// List rows visible to the caller.
    ///
    /// `filters` are raw `(key, value)` query pairs; keys must name reference fields.
    pub async fn list(
        &self,
        entity: &str,
        pagination: Pagination,
        filters: &[(String, String)],
        caller: &CallerContext,
    ) -> Result<Page, DomainError> {
        let def = self.catalog.resolve(entity)?;
        let query = ListQuery {
            pagination,
            filters: parse_filters(def, filters)?,
        };
        self.repo
            .list(def, TenantFilter::for_entity(def, caller), &query)
            .await
    }

    /// Full replacement (PUT)
    pub async fn replace(
        &self,
        entity: &str,
        id: Uuid,
        body: &Value,
        caller: &CallerContext,
    ) -> Result<Record, DomainError> {
        self.update(entity, id, body, PayloadMode::Replace, caller).await
    }

    /// Partial update (PATCH)
    pub async fn patch(
        &self,
        entity: &str,
        id: Uuid,
        body: &Value,
        caller: &CallerContext,
    ) -> Result<Record, DomainError> {
        self.update(entity, id, body, PayloadMode::Merge, caller).await
    }

    async fn update(
        &self,
        entity: &str,
        id: Uuid,
        body: &Value,
        mode: PayloadMode,
        caller: &CallerContext,
    ) -> Result<Record, DomainError> {
        let def = self.catalog.resolve(entity)?;
        self.ensure_writable(def, caller)?;
        let filter = TenantFilter::for_entity(def, caller);

        let values = parse_payload(def, body, mode)?;
        let mut record = self
            .repo
            .find(def, id, filter)
            .await?
            .ok_or_else(|| DomainError::not_found(def.name, id))?;

        match mode {
            PayloadMode::Merge => record.values.extend(values),
            _ => record.values = values,
        }
        record.audit.touch(caller.user_id);

        self.verify_references(def, &record, caller).await?;

        let updated = self
            .repo
            .update(def, &record, filter)
            .await?
            // Row vanished between read and write
            .ok_or_else(|| DomainError::not_found(def.name, id))?;
        info!(entity = def.name, %id, "record updated");
        Ok(updated)
    }

    pub async fn delete(
        &self,
        entity: &str,
        id: Uuid,
        caller: &CallerContext,
    ) -> Result<(), DomainError> {
        let def = self.catalog.resolve(entity)?;
        self.ensure_writable(def, caller)?;

        if !self.repo.delete(def, id, TenantFilter::for_entity(def, caller)).await? {
            return Err(DomainError::not_found(def.name, id));
        }
        info!(entity = def.name, %id, tenant = %caller.tenant_id, "record deleted");
        Ok(())
    }

    fn ensure_writable(&self, def: &EntityDef, caller: &CallerContext) -> Result<(), DomainError> {
        if def.is_tenant_scoped() || caller.is_platform_admin() {
            return Ok(());
        }
        warn!(entity = def.name, user = %caller.user_id, "write to shared lookup table denied");
        Err(DomainError::Forbidden(format!(
            "{} is shared reference data and requires the platform administrator role",
            def.name
        )))
    }

    /// Every non-null reference must point at a row the caller can see
    async fn verify_references(
        &self,
        def: &EntityDef,
        record: &Record,
        caller: &CallerContext,
    ) -> Result<(), DomainError> {
        for (field, target, target_id) in record.outgoing_references(def) {
            let target_def = self
                .catalog
                .entity(target)
                .ok_or_else(|| DomainError::InternalError(format!("catalog lost entity {}", target)))?;
            let visible = self
                .repo
                .exists(target_def, target_id, TenantFilter::for_entity(target_def, caller))
                .await?;
            if !visible {
                warn!(entity = def.name, field, %target_id, "reference to missing row");
                return Err(DomainError::ReferentialIntegrity(format!(
                    "{} references {} {} which does not exist",
                    to_camel_case(field),
                    target,
                    target_id
                )));
            }
        }
        Ok(())
    }
}

fn parse_filters(
    def: &EntityDef,
    raw: &[(String, String)],
) -> Result<Vec<(&'static str, Uuid)>, DomainError> {
    raw.iter()
        .map(|(key, value)| {
            let column = normalize_field_key(key);
            let field = def
                .field(&column)
                .filter(|f| f.is_reference())
                .ok_or_else(|| DomainError::invalid(key.as_str(), "only reference fields can be filtered"))?;
            let id = Uuid::parse_str(value)
                .map_err(|_| DomainError::invalid(key.as_str(), "expected a UUID"))?;
            Ok((field.name, id))
        })
        .collect()
}
