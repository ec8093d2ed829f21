//! Dynamic statement building for catalog entities.
//!
//! Table and column names come from the validated catalog; values are
//! always bound parameters.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use school_core::domain::{FieldValue, Record};
use school_core::repositories::{ListQuery, TenantFilter};
use school_core::schema::{EntityDef, FieldKind};
use school_shared::types::AuditFields;

pub(super) fn select_columns(def: &EntityDef) -> String {
    let mut columns = vec!["id"];
    if def.is_tenant_scoped() {
        columns.push("tenant_id");
    }
    columns.extend(def.fields.iter().map(|f| f.name));
    columns.extend(["created_on", "created_by", "updated_on", "updated_by"]);
    columns.join(", ")
}

fn push_value<'a>(builder: &mut QueryBuilder<'a, Postgres>, kind: &FieldKind, value: &FieldValue) {
    match value {
        FieldValue::Text(s) => builder.push_bind(s.clone()),
        FieldValue::Integer(n) => builder.push_bind(*n),
        FieldValue::Float(n) => builder.push_bind(*n),
        FieldValue::Boolean(b) => builder.push_bind(*b),
        FieldValue::Date(d) => builder.push_bind(*d),
        FieldValue::DateTime(dt) => builder.push_bind(*dt),
        FieldValue::Reference(id) => builder.push_bind(*id),
        // NULLs still need the column's type
        FieldValue::Null => match kind {
            FieldKind::Text { .. } => builder.push_bind(None::<String>),
            FieldKind::Integer => builder.push_bind(None::<i64>),
            FieldKind::Float => builder.push_bind(None::<f64>),
            FieldKind::Boolean => builder.push_bind(None::<bool>),
            FieldKind::Date => builder.push_bind(None::<NaiveDate>),
            FieldKind::DateTime => builder.push_bind(None::<DateTime<Utc>>),
            FieldKind::Reference { .. } => builder.push_bind(None::<Uuid>),
        },
    };
}

fn push_scope<'a>(builder: &mut QueryBuilder<'a, Postgres>, def: &EntityDef, filter: TenantFilter) {
    if let (true, TenantFilter::Tenant(tenant)) = (def.is_tenant_scoped(), filter) {
        builder.push(" AND tenant_id = ").push_bind(tenant);
    }
}

pub(super) fn insert<'a>(def: &EntityDef, record: &Record) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(format!("INSERT INTO {} ({}) VALUES (", def.table, select_columns(def)));
    {
        let mut values = builder.separated(", ");
        values.push_bind(record.id);
        if def.is_tenant_scoped() {
            values.push_bind(record.tenant_id);
        }
    }
    for field in def.fields {
        builder.push(", ");
        push_value(&mut builder, &field.kind, record.get(field.name));
    }
    builder
        .push(", ")
        .push_bind(record.audit.created_on)
        .push(", ")
        .push_bind(record.audit.created_by)
        .push(", ")
        .push_bind(record.audit.updated_on)
        .push(", ")
        .push_bind(record.audit.updated_by)
        .push(") RETURNING ")
        .push(select_columns(def));
    builder
}

pub(super) fn find<'a>(def: &EntityDef, id: Uuid, filter: TenantFilter) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM {} WHERE id = ", select_columns(def), def.table));
    builder.push_bind(id);
    push_scope(&mut builder, def, filter);
    builder
}

pub(super) fn exists<'a>(def: &EntityDef, id: Uuid, filter: TenantFilter) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = ", def.table));
    builder.push_bind(id);
    push_scope(&mut builder, def, filter);
    builder.push(")");
    builder
}

fn push_list_predicates<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    def: &EntityDef,
    filter: TenantFilter,
    query: &ListQuery,
) {
    builder.push(" WHERE TRUE");
    push_scope(builder, def, filter);
    for (column, id) in &query.filters {
        builder.push(format!(" AND {} = ", column)).push_bind(*id);
    }
}

pub(super) fn count<'a>(def: &EntityDef, filter: TenantFilter, query: &ListQuery) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", def.table));
    push_list_predicates(&mut builder, def, filter, query);
    builder
}

pub(super) fn list<'a>(def: &EntityDef, filter: TenantFilter, query: &ListQuery) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM {}", select_columns(def), def.table));
    push_list_predicates(&mut builder, def, filter, query);
    builder
        .push(" ORDER BY created_on, id LIMIT ")
        .push_bind(query.pagination.limit() as i64)
        .push(" OFFSET ")
        .push_bind(query.pagination.offset() as i64);
    builder
}

pub(super) fn update<'a>(def: &EntityDef, record: &Record, filter: TenantFilter) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", def.table));
    for field in def.fields {
        builder.push(format!("{} = ", field.name));
        push_value(&mut builder, &field.kind, record.get(field.name));
        builder.push(", ");
    }
    builder
        .push("updated_on = ")
        .push_bind(record.audit.updated_on)
        .push(", updated_by = ")
        .push_bind(record.audit.updated_by)
        .push(" WHERE id = ")
        .push_bind(record.id);
    push_scope(&mut builder, def, filter);
    builder.push(" RETURNING ").push(select_columns(def));
    builder
}

pub(super) fn delete<'a>(def: &EntityDef, id: Uuid, filter: TenantFilter) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(format!("DELETE FROM {} WHERE id = ", def.table));
    builder.push_bind(id);
    push_scope(&mut builder, def, filter);
    builder
}

pub(super) fn decode_row(def: &EntityDef, row: &PgRow) -> Result<Record, sqlx::Error> {
    let id: Uuid = row.try_get("id")?;
    let tenant_id: Option<Uuid> = if def.is_tenant_scoped() {
        Some(row.try_get("tenant_id")?)
    } else {
        None
    };

    let mut values = std::collections::BTreeMap::new();
    for field in def.fields {
        let name = field.name;
        let value = match field.kind {
            FieldKind::Text { .. } => row.try_get::<Option<String>, _>(name)?.map(FieldValue::Text),
            FieldKind::Integer => row.try_get::<Option<i64>, _>(name)?.map(FieldValue::Integer),
            FieldKind::Float => row.try_get::<Option<f64>, _>(name)?.map(FieldValue::Float),
            FieldKind::Boolean => row.try_get::<Option<bool>, _>(name)?.map(FieldValue::Boolean),
            FieldKind::Date => row.try_get::<Option<NaiveDate>, _>(name)?.map(FieldValue::Date),
            FieldKind::DateTime => row
                .try_get::<Option<DateTime<Utc>>, _>(name)?
                .map(FieldValue::DateTime),
            FieldKind::Reference { .. } => row.try_get::<Option<Uuid>, _>(name)?.map(FieldValue::Reference),
        };
        values.insert(name, value.unwrap_or(FieldValue::Null));
    }

    let audit = AuditFields {
        created_on: row.try_get("created_on")?,
        created_by: row.try_get("created_by")?,
        updated_on: row.try_get("updated_on")?,
        updated_by: row.try_get("updated_by")?,
    };

    Ok(Record::new(def, id, tenant_id, values, audit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use school_core::schema::Catalog;
    use school_shared::types::Pagination;
    use std::collections::BTreeMap;

    fn record(def: &EntityDef, tenant: Option<Uuid>) -> Record {
        let values: BTreeMap<_, _> = def.fields.iter().map(|f| (f.name, FieldValue::Null)).collect();
        Record::new(def, Uuid::new_v4(), tenant, values, AuditFields::created(Uuid::new_v4()))
    }

    #[test]
    fn test_find_scopes_tenant_tables() {
        let catalog = Catalog::school().unwrap();
        let def = catalog.entity("department").unwrap();
        let sql = find(def, Uuid::new_v4(), TenantFilter::Tenant(Uuid::new_v4())).sql().to_string();
        assert_eq!(
            sql,
            "SELECT id, tenant_id, name, code, created_on, created_by, updated_on, updated_by \
             FROM departments WHERE id = $1 AND tenant_id = $2"
        );
    }

    #[test]
    fn test_global_tables_skip_tenant_predicate() {
        let catalog = Catalog::school().unwrap();
        let def = catalog.entity("gender").unwrap();
        let sql = find(def, Uuid::new_v4(), TenantFilter::Tenant(Uuid::new_v4())).sql().to_string();
        assert!(!sql.contains("tenant_id"));
    }

    #[test]
    fn test_insert_binds_every_column() {
        let catalog = Catalog::school().unwrap();
        let def = catalog.entity("department").unwrap();
        let sql = insert(def, &record(def, Some(Uuid::new_v4()))).sql().to_string();
        assert!(sql.starts_with(
            "INSERT INTO departments (id, tenant_id, name, code, created_on, created_by, updated_on, updated_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING"
        ));
    }

    #[test]
    fn test_update_keeps_creation_audit() {
        let catalog = Catalog::school().unwrap();
        let def = catalog.entity("department").unwrap();
        let sql = update(def, &record(def, None), TenantFilter::Tenant(Uuid::new_v4())).sql().to_string();
        assert!(sql.starts_with("UPDATE departments SET name = $1, code = $2, updated_on = $3, updated_by = $4 WHERE id = $5 AND tenant_id = $6"));
        assert!(!sql.contains("created_on ="));
    }

    #[test]
    fn test_list_with_filters_and_paging() {
        let catalog = Catalog::school().unwrap();
        let def = catalog.entity("enrollment").unwrap();
        let query = ListQuery {
            pagination: Pagination::new(Some(2), Some(10)),
            filters: vec![("student_id", Uuid::new_v4())],
        };
        let sql = list(def, TenantFilter::Tenant(Uuid::new_v4()), &query).sql().to_string();
        assert!(sql.ends_with(
            "FROM enrollments WHERE TRUE AND tenant_id = $1 AND student_id = $2 ORDER BY created_on, id LIMIT $3 OFFSET $4"
        ));
        let counted = count(def, TenantFilter::Unrestricted, &query).sql().to_string();
        assert_eq!(counted, "SELECT COUNT(*) FROM enrollments WHERE TRUE AND student_id = $1");
    }

    #[test]
    fn test_delete_statement() {
        let catalog = Catalog::school().unwrap();
        let def = catalog.entity("student").unwrap();
        let sql = delete(def, Uuid::new_v4(), TenantFilter::Tenant(Uuid::new_v4())).sql().to_string();
        assert_eq!(sql, "DELETE FROM students WHERE id = $1 AND tenant_id = $2");
    }
}
