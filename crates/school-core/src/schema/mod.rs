// ============================================================================
// School Core - Schema Catalog
// File: crates/school-core/src/schema/mod.rs
// Description: Entity metadata, relationships and their delete policies
// ============================================================================
//! The schema catalog is the single model-configuration root: every entity,
//! its columns, its tenant scope, and every many-to-one relationship with an
//! explicit delete policy. Repositories and the entity service are generic
//! over it.

mod school;

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use school_shared::constants::SERVER_MANAGED_FIELDS;

use crate::error::DomainError;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,62}$").expect("identifier pattern is valid"));

/// What happens to dependent rows when the referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Delete fails while dependents exist
    Restrict,
    /// Dependents are deleted with the parent
    Cascade,
    /// Dependent reference is cleared
    SetNull,
}

impl DeletePolicy {
    pub fn as_sql(&self) -> &'static str {
        match self {
            DeletePolicy::Restrict => "RESTRICT",
            DeletePolicy::Cascade => "CASCADE",
            DeletePolicy::SetNull => "SET NULL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantScope {
    /// Rows belong to exactly one tenant
    Tenant,
    /// Shared reference data visible to every tenant
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Reference,
    Academics,
    HumanResources,
    Billing,
    Exams,
    Documents,
    Workspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text { max_len: usize },
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Reference {
        target: &'static str,
        on_delete: DeletePolicy,
    },
}

impl FieldKind {
    pub fn reference_target(&self) -> Option<&'static str> {
        match self {
            FieldKind::Reference { target, .. } => Some(target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldDef {
    pub const fn text(name: &'static str, max_len: usize) -> Self {
        Self { name, kind: FieldKind::Text { max_len }, required: false }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Integer, required: false }
    }

    pub const fn float(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Float, required: false }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Boolean, required: false }
    }

    pub const fn date(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Date, required: false }
    }

    pub const fn datetime(name: &'static str) -> Self {
        Self { name, kind: FieldKind::DateTime, required: false }
    }

    pub const fn reference(name: &'static str, target: &'static str, on_delete: DeletePolicy) -> Self {
        Self { name, kind: FieldKind::Reference { target, on_delete }, required: false }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, FieldKind::Reference { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntityDef {
    pub name: &'static str,
    pub table: &'static str,
    pub module: Module,
    pub scope: TenantScope,
    pub fields: &'static [FieldDef],
}

impl EntityDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_tenant_scoped(&self) -> bool {
        self.scope == TenantScope::Tenant
    }

    pub fn references(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.is_reference())
    }
}

/// A many-to-one edge, seen from the "many" side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub from_entity: &'static str,
    pub field: &'static str,
    pub to_entity: &'static str,
    pub required: bool,
    pub on_delete: DeletePolicy,
}

/// Immutable set of entity definitions indexed by name
#[derive(Debug, Clone)]
pub struct Catalog {
    entities: Vec<EntityDef>,
    index: HashMap<&'static str, usize>,
    relations: Vec<Relation>,
}

impl Catalog {
    /// Builds and validates a catalog
    pub fn new(entities: Vec<EntityDef>) -> Result<Self, DomainError> {
        let mut index = HashMap::with_capacity(entities.len());
        for (pos, def) in entities.iter().enumerate() {
            if index.insert(def.name, pos).is_some() {
                return Err(DomainError::InvalidCatalog(format!(
                    "duplicate entity name: {}",
                    def.name
                )));
            }
        }

        let relations = entities
            .iter()
            .flat_map(|def| {
                def.fields.iter().filter_map(move |f| match f.kind {
                    FieldKind::Reference { target, on_delete } => Some(Relation {
                        from_entity: def.name,
                        field: f.name,
                        to_entity: target,
                        required: f.required,
                        on_delete,
                    }),
                    _ => None,
                })
            })
            .collect();

        let catalog = Self { entities, index, relations };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The built-in school-management catalog
    pub fn school() -> Result<Self, DomainError> {
        Self::new(school::entities())
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.index.get(name).map(|&pos| &self.entities[pos])
    }

    /// Looks up an entity by a URL segment (`academic-year`, `academic_year`, `AcademicYear`)
    pub fn resolve(&self, segment: &str) -> Result<&EntityDef, DomainError> {
        let normalized = school_shared::utils::normalize_field_key(&segment.replace('-', "_"));
        self.entity(&normalized)
            .ok_or_else(|| DomainError::UnknownEntity(segment.to_string()))
    }

    pub fn entities(&self) -> &[EntityDef] {
        &self.entities
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Relations whose target is `entity` (the rows that point at it)
    pub fn dependents_of<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations.iter().filter(move |r| r.to_entity == entity)
    }

    fn validate(&self) -> Result<(), DomainError> {
        let mut tables = HashSet::new();
        for def in &self.entities {
            check_identifier(def.name)?;
            check_identifier(def.table)?;
            if !tables.insert(def.table) {
                return Err(DomainError::InvalidCatalog(format!(
                    "duplicate table name: {}",
                    def.table
                )));
            }

            let mut columns = HashSet::new();
            for field in def.fields {
                check_identifier(field.name)?;
                if SERVER_MANAGED_FIELDS.contains(&field.name) {
                    return Err(DomainError::InvalidCatalog(format!(
                        "{}.{} uses a reserved column name",
                        def.name, field.name
                    )));
                }
                if !columns.insert(field.name) {
                    return Err(DomainError::InvalidCatalog(format!(
                        "duplicate field {}.{}",
                        def.name, field.name
                    )));
                }
                if let FieldKind::Text { max_len } = field.kind {
                    if max_len == 0 {
                        return Err(DomainError::InvalidCatalog(format!(
                            "{}.{} has zero max length",
                            def.name, field.name
                        )));
                    }
                }
            }
        }

        for rel in &self.relations {
            let target = self.entity(rel.to_entity).ok_or_else(|| {
                DomainError::InvalidCatalog(format!(
                    "{}.{} references unknown entity {}",
                    rel.from_entity, rel.field, rel.to_entity
                ))
            })?;
            // A required reference keeps its parent alive
            if rel.required && rel.on_delete != DeletePolicy::Restrict {
                return Err(DomainError::InvalidCatalog(format!(
                    "{}.{} is required and must use RESTRICT, not {}",
                    rel.from_entity,
                    rel.field,
                    rel.on_delete.as_sql()
                )));
            }
            let source = &self.entities[self.index[rel.from_entity]];
            if source.scope == TenantScope::Global && target.scope == TenantScope::Tenant {
                return Err(DomainError::InvalidCatalog(format!(
                    "global entity {} cannot reference tenant entity {}",
                    rel.from_entity, rel.to_entity
                )));
            }
        }

        Ok(())
    }
}

fn check_identifier(name: &str) -> Result<(), DomainError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(DomainError::InvalidCatalog(format!("invalid identifier: {:?}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static PARENT_FIELDS: &[FieldDef] = &[FieldDef::text("name", 50).required()];
    static CHILD_FIELDS: &[FieldDef] = &[
        FieldDef::text("label", 50),
        FieldDef::reference("parent_id", "parent", DeletePolicy::Restrict).required(),
    ];

    fn parent() -> EntityDef {
        EntityDef {
            name: "parent",
            table: "parents",
            module: Module::Academics,
            scope: TenantScope::Tenant,
            fields: PARENT_FIELDS,
        }
    }

    fn child() -> EntityDef {
        EntityDef {
            name: "child",
            table: "children",
            module: Module::Academics,
            scope: TenantScope::Tenant,
            fields: CHILD_FIELDS,
        }
    }

    #[test]
    fn test_school_catalog_is_valid() {
        let catalog = Catalog::school().unwrap();
        assert!(catalog.entities().len() > 40);
        assert!(catalog.entity("student").is_some());
        assert!(catalog.entity("enrollment").is_some());
    }

    #[test]
    fn test_relations_are_derived() {
        let catalog = Catalog::new(vec![parent(), child()]).unwrap();
        let deps: Vec<_> = catalog.dependents_of("parent").collect();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].from_entity, "child");
        assert_eq!(deps[0].field, "parent_id");
        assert!(deps[0].required);
    }

    #[test]
    fn test_resolve_accepts_url_forms() {
        let catalog = Catalog::school().unwrap();
        assert_eq!(catalog.resolve("academic-year").unwrap().name, "academic_year");
        assert_eq!(catalog.resolve("AcademicYear").unwrap().name, "academic_year");
        assert_eq!(catalog.resolve("Academic-Year").unwrap().name, "academic_year");
        assert_eq!(catalog.resolve("academic_year").unwrap().name, "academic_year");
        assert_eq!(catalog.resolve("student").unwrap().name, "student");
        assert!(matches!(catalog.resolve("spaceship"), Err(DomainError::UnknownEntity(_))));
    }

    #[test]
    fn test_unknown_target_rejected() {
        let result = Catalog::new(vec![child()]);
        assert!(matches!(result, Err(DomainError::InvalidCatalog(_))));
    }

    #[test]
    fn test_required_set_null_rejected() {
        static FIELDS: &[FieldDef] =
            &[FieldDef::reference("parent_id", "parent", DeletePolicy::SetNull).required()];
        let bad = EntityDef { fields: FIELDS, ..child() };
        assert!(Catalog::new(vec![parent(), bad]).is_err());
    }

    #[test]
    fn test_required_cascade_rejected() {
        static FIELDS: &[FieldDef] =
            &[FieldDef::reference("parent_id", "parent", DeletePolicy::Cascade).required()];
        let bad = EntityDef { fields: FIELDS, ..child() };
        let err = Catalog::new(vec![parent(), bad]).unwrap_err();
        assert!(err.to_string().contains("child.parent_id"));
    }

    #[test]
    fn test_school_required_relations_restrict() {
        let catalog = Catalog::school().unwrap();
        let required: Vec<_> = catalog.relations().iter().filter(|r| r.required).collect();
        assert!(!required.is_empty());
        for rel in required {
            assert_eq!(rel.on_delete, DeletePolicy::Restrict, "{}.{}", rel.from_entity, rel.field);
        }
    }

    #[test]
    fn test_global_to_tenant_reference_rejected() {
        let global_child = EntityDef { scope: TenantScope::Global, ..child() };
        assert!(Catalog::new(vec![parent(), global_child]).is_err());
    }

    #[test]
    fn test_reserved_and_invalid_names_rejected() {
        static RESERVED: &[FieldDef] = &[FieldDef::text("tenant_id", 10)];
        let reserved = EntityDef { fields: RESERVED, ..parent() };
        assert!(Catalog::new(vec![reserved]).is_err());

        let bad_name = EntityDef { name: "Parent; DROP", ..parent() };
        assert!(Catalog::new(vec![bad_name]).is_err());
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        assert!(Catalog::new(vec![parent(), parent()]).is_err());
    }
}
