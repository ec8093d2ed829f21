// ============================================================================
// School Infrastructure - DDL Generation
// File: crates/school-infrastructure/src/database/ddl.rs
// ============================================================================
//! PostgreSQL schema derived from the catalog.
//!
//! Tables are created first and foreign keys added afterwards, so cyclic
//! relations (document <-> document_version) need no ordering. Every
//! statement is idempotent.

use school_core::schema::{Catalog, EntityDef, FieldDef, FieldKind, Relation};

const MAX_IDENTIFIER: usize = 63;

pub fn column_type(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Text { max_len } => format!("VARCHAR({})", max_len),
        FieldKind::Integer => "BIGINT".to_string(),
        FieldKind::Float => "DOUBLE PRECISION".to_string(),
        FieldKind::Boolean => "BOOLEAN".to_string(),
        FieldKind::Date => "DATE".to_string(),
        FieldKind::DateTime => "TIMESTAMPTZ".to_string(),
        FieldKind::Reference { .. } => "UUID".to_string(),
    }
}

fn column_definition(field: &FieldDef) -> String {
    let null = if field.required { " NOT NULL" } else { "" };
    format!("{} {}{}", field.name, column_type(&field.kind), null)
}

fn identifier(prefix: &str, table: &str, column: &str) -> String {
    let mut name = format!("{}_{}_{}", prefix, table, column);
    name.truncate(MAX_IDENTIFIER);
    name
}

pub fn create_table(def: &EntityDef) -> String {
    let mut columns = vec!["id UUID PRIMARY KEY".to_string()];
    if def.is_tenant_scoped() {
        columns.push("tenant_id UUID NOT NULL".to_string());
    }
    columns.extend(def.fields.iter().map(column_definition));
    columns.extend(
        [
            "created_on TIMESTAMPTZ",
            "created_by UUID",
            "updated_on TIMESTAMPTZ",
            "updated_by UUID",
        ]
        .map(String::from),
    );

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        def.table,
        columns.join(",\n    ")
    )
}

pub fn create_indexes(def: &EntityDef) -> Vec<String> {
    let mut indexed: Vec<&str> = Vec::new();
    if def.is_tenant_scoped() {
        indexed.push("tenant_id");
    }
    indexed.extend(def.references().map(|f| f.name));

    indexed
        .into_iter()
        .map(|column| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                identifier("ix", def.table, column),
                def.table,
                column
            )
        })
        .collect()
}

pub fn add_foreign_key(catalog: &Catalog, relation: &Relation) -> Option<String> {
    let source = catalog.entity(relation.from_entity)?;
    let target = catalog.entity(relation.to_entity)?;
    let name = identifier("fk", source.table, relation.field);

    Some(format!(
        "DO $$ BEGIN\n\
         IF NOT EXISTS (SELECT 1 FROM pg_constraint WHERE conname = '{name}') THEN\n\
         ALTER TABLE {table} ADD CONSTRAINT {name} FOREIGN KEY ({column}) \
         REFERENCES {target}(id) ON DELETE {policy};\n\
         END IF;\n\
         END $$",
        name = name,
        table = source.table,
        column = relation.field,
        target = target.table,
        policy = relation.on_delete.as_sql(),
    ))
}

/// All statements needed to materialise the catalog, in execution order
pub fn create_statements(catalog: &Catalog) -> Vec<String> {
    let mut statements: Vec<String> = catalog.entities().iter().map(create_table).collect();
    statements.extend(
        catalog
            .relations()
            .iter()
            .filter_map(|rel| add_foreign_key(catalog, rel)),
    );
    statements.extend(catalog.entities().iter().flat_map(create_indexes));
    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_table_shape() {
        let catalog = Catalog::school().unwrap();
        let sql = create_table(catalog.entity("student").unwrap());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS students"));
        assert!(sql.contains("id UUID PRIMARY KEY"));
        assert!(sql.contains("tenant_id UUID NOT NULL"));
        assert!(sql.contains("name VARCHAR(200) NOT NULL"));
        assert!(sql.contains("date_of_birth DATE,"));
        assert!(sql.contains("updated_by UUID"));
    }

    #[test]
    fn test_global_table_has_no_tenant_column() {
        let catalog = Catalog::school().unwrap();
        let sql = create_table(catalog.entity("attendance_status").unwrap());
        assert!(!sql.contains("tenant_id"));
    }

    #[test]
    fn test_foreign_key_policy() {
        let catalog = Catalog::school().unwrap();
        let rel = catalog
            .relations()
            .iter()
            .find(|r| r.from_entity == "enrollment" && r.field == "student_id")
            .unwrap();
        let sql = add_foreign_key(&catalog, rel).unwrap();
        assert!(sql.contains("ALTER TABLE enrollments ADD CONSTRAINT fk_enrollments_student_id"));
        assert!(sql.contains("REFERENCES students(id) ON DELETE RESTRICT"));

        let optional = catalog
            .relations()
            .iter()
            .find(|r| r.from_entity == "announcement" && r.field == "workspace_id")
            .unwrap();
        assert!(add_foreign_key(&catalog, optional).unwrap().contains("ON DELETE SET NULL"));

        let statements = create_statements(&catalog);
        assert!(statements.iter().all(|s| !s.contains("ON DELETE CASCADE")));
    }

    #[test]
    fn test_statement_counts() {
        let catalog = Catalog::school().unwrap();
        let statements = create_statements(&catalog);
        let tables = statements.iter().filter(|s| s.starts_with("CREATE TABLE")).count();
        let fks = statements.iter().filter(|s| s.starts_with("DO $$")).count();
        assert_eq!(tables, catalog.entities().len());
        assert_eq!(fks, catalog.relations().len());

        // Tables precede constraints
        let last_table = statements.iter().rposition(|s| s.starts_with("CREATE TABLE")).unwrap();
        let first_fk = statements.iter().position(|s| s.starts_with("DO $$")).unwrap();
        assert!(last_table < first_fk);
    }

    #[test]
    fn test_indexes_cover_references() {
        let catalog = Catalog::school().unwrap();
        let indexes = create_indexes(catalog.entity("enrollment").unwrap());
        assert_eq!(indexes.len(), 3);
        assert!(indexes.iter().any(|s| s.contains("ix_enrollments_tenant_id")));
        assert!(indexes.iter().any(|s| s.contains("(course_id)")));
    }

    #[test]
    fn test_identifier_truncated() {
        let long = "x".repeat(80);
        assert_eq!(identifier("fk", &long, "col").len(), MAX_IDENTIFIER);
    }
}
