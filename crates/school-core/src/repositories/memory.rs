// ============================================================================
// School Core - In-Memory Entity Repository
// File: crates/school-core/src/repositories/memory.rs
// ============================================================================
//! Process-local adapter with the same integrity rules as the PostgreSQL
//! schema: foreign keys are checked on write and deletes follow each
//! relation's delete policy. A single lock guards all tables, so every
//! operation is atomic.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{FieldValue, Record};
use crate::error::DomainError;
use crate::repositories::{EntityRepository, ListQuery, Page, TenantFilter};
use crate::schema::{Catalog, DeletePolicy, EntityDef};

type Table = HashMap<Uuid, Record>;

pub struct MemoryRepository {
    catalog: Arc<Catalog>,
    tables: RwLock<HashMap<&'static str, Table>>,
}

impl MemoryRepository {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Total rows across all tables
    pub fn row_count(&self) -> usize {
        self.tables.read().values().map(|t| t.len()).sum()
    }

    fn check_references(
        tables: &HashMap<&'static str, Table>,
        def: &EntityDef,
        record: &Record,
    ) -> Result<(), DomainError> {
        for (field, target, id) in record.outgoing_references(def) {
            let found = tables.get(target).is_some_and(|t| t.contains_key(&id));
            if !found {
                return Err(DomainError::ReferentialIntegrity(format!(
                    "{}.{} references missing {} {}",
                    def.name, field, target, id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct DeletePlan {
    deletes: Vec<(&'static str, Uuid)>,
    nullify: Vec<(&'static str, Uuid, &'static str)>,
    restricted: Vec<(&'static str, Uuid, &'static str)>,
}

fn plan_delete(
    catalog: &Catalog,
    tables: &HashMap<&'static str, Table>,
    entity: &'static str,
    id: Uuid,
) -> DeletePlan {
    let mut plan = DeletePlan::default();
    let mut visited = HashSet::new();
    let mut stack = vec![(entity, id)];

    while let Some((name, row_id)) = stack.pop() {
        if !visited.insert((name, row_id)) {
            continue;
        }
        plan.deletes.push((name, row_id));

        for rel in catalog.dependents_of(name) {
            let Some(table) = tables.get(rel.from_entity) else {
                continue;
            };
            for dependent in table.values().filter(|r| r.reference(rel.field) == Some(row_id)) {
                let key = (rel.from_entity, dependent.id);
                match rel.on_delete {
                    DeletePolicy::Cascade => stack.push(key),
                    DeletePolicy::SetNull => plan.nullify.push((rel.from_entity, dependent.id, rel.field)),
                    DeletePolicy::Restrict => plan.restricted.push((rel.from_entity, dependent.id, rel.field)),
                }
            }
        }
    }

    plan.restricted.retain(|(e, rid, _)| !visited.contains(&(*e, *rid)));
    plan.nullify.retain(|(e, rid, _)| !visited.contains(&(*e, *rid)));
    plan
}

#[async_trait]
impl EntityRepository for MemoryRepository {
    async fn insert(&self, def: &EntityDef, record: &Record) -> Result<Record, DomainError> {
        let mut tables = self.tables.write();
        Self::check_references(&tables, def, record)?;

        let table = tables.entry(def.name).or_default();
        if table.contains_key(&record.id) {
            return Err(DomainError::Conflict(format!("{} {} already exists", def.name, record.id)));
        }
        table.insert(record.id, record.clone());
        debug!(entity = def.name, id = %record.id, "row inserted");
        Ok(record.clone())
    }

    async fn find(&self, def: &EntityDef, id: Uuid, filter: TenantFilter) -> Result<Option<Record>, DomainError> {
        let tables = self.tables.read();
        Ok(tables
            .get(def.name)
            .and_then(|t| t.get(&id))
            .filter(|r| filter.admits(def, r))
            .cloned())
    }

    async fn exists(&self, def: &EntityDef, id: Uuid, filter: TenantFilter) -> Result<bool, DomainError> {
        Ok(self.find(def, id, filter).await?.is_some())
    }

    async fn list(&self, def: &EntityDef, filter: TenantFilter, query: &ListQuery) -> Result<Page, DomainError> {
        let tables = self.tables.read();
        let mut rows: Vec<&Record> = tables
            .get(def.name)
            .map(|t| t.values().filter(|r| filter.admits(def, r) && query.matches(r)).collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| {
            a.audit
                .created_on
                .cmp(&b.audit.created_on)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = rows.len() as u64;
        let items = rows
            .into_iter()
            .skip(query.pagination.offset() as usize)
            .take(query.pagination.limit() as usize)
            .cloned()
            .collect();

        Ok(Page {
            items,
            total,
            page: query.pagination.page,
            per_page: query.pagination.per_page,
        })
    }

    async fn update(&self, def: &EntityDef, record: &Record, filter: TenantFilter) -> Result<Option<Record>, DomainError> {
        let mut tables = self.tables.write();
        let visible = tables
            .get(def.name)
            .and_then(|t| t.get(&record.id))
            .is_some_and(|r| filter.admits(def, r));
        if !visible {
            return Ok(None);
        }
        Self::check_references(&tables, def, record)?;

        if let Some(table) = tables.get_mut(def.name) {
            table.insert(record.id, record.clone());
        }
        Ok(Some(record.clone()))
    }

    async fn delete(&self, def: &EntityDef, id: Uuid, filter: TenantFilter) -> Result<bool, DomainError> {
        let mut tables = self.tables.write();
        let visible = tables
            .get(def.name)
            .and_then(|t| t.get(&id))
            .is_some_and(|r| filter.admits(def, r));
        if !visible {
            return Ok(false);
        }

        let plan = plan_delete(&self.catalog, &tables, def.name, id);
        if let Some((entity, row, field)) = plan.restricted.first() {
            warn!(entity = def.name, %id, dependent = *entity, dependent_id = %row, "delete restricted by dependent row");
            return Err(DomainError::ReferentialIntegrity(format!(
                "{} {} is referenced by {}.{}",
                def.name, id, entity, field
            )));
        }

        for (entity, row, field) in &plan.nullify {
            if let Some(dependent) = tables.get_mut(entity).and_then(|t| t.get_mut(row)) {
                dependent.values.insert(*field, FieldValue::Null);
            }
        }
        for (entity, row) in &plan.deletes {
            if let Some(table) = tables.get_mut(entity) {
                table.remove(row);
            }
        }
        debug!(entity = def.name, %id, removed = plan.deletes.len(), "rows deleted");
        Ok(true)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, Module, TenantScope};
    use school_shared::types::AuditFields;
    use std::collections::BTreeMap;

    fn setup() -> (Arc<Catalog>, MemoryRepository) {
        let catalog = Arc::new(Catalog::school().unwrap());
        let repo = MemoryRepository::new(catalog.clone());
        (catalog, repo)
    }

    fn row(def: &EntityDef, tenant: Uuid, values: Vec<(&'static str, FieldValue)>) -> Record {
        let mut map: BTreeMap<&'static str, FieldValue> =
            def.fields.iter().map(|f| (f.name, FieldValue::Null)).collect();
        map.extend(values);
        Record::new(def, Uuid::new_v4(), Some(tenant), map, AuditFields::created(Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_insert_rejects_dangling_reference() {
        let (catalog, repo) = setup();
        let def = catalog.entity("semester").unwrap();
        let rec = row(def, Uuid::new_v4(), vec![
            ("name", FieldValue::Text("S1".into())),
            ("academic_year_id", FieldValue::Reference(Uuid::new_v4())),
        ]);
        let err = repo.insert(def, &rec).await.unwrap_err();
        assert!(matches!(err, DomainError::ReferentialIntegrity(_)));
        assert_eq!(repo.row_count(), 0);
    }

    #[tokio::test]
    async fn test_find_respects_tenant() {
        let (catalog, repo) = setup();
        let def = catalog.entity("department").unwrap();
        let tenant_a = Uuid::new_v4();
        let rec = row(def, tenant_a, vec![("name", FieldValue::Text("Math".into()))]);
        repo.insert(def, &rec).await.unwrap();

        assert!(repo.find(def, rec.id, TenantFilter::Tenant(tenant_a)).await.unwrap().is_some());
        assert!(repo.find(def, rec.id, TenantFilter::Tenant(Uuid::new_v4())).await.unwrap().is_none());
    }

    static BOARD_FIELDS: &[FieldDef] = &[
        FieldDef::text("name", 50).required(),
        FieldDef::reference("pinned_card_id", "card", DeletePolicy::SetNull),
    ];
    static CARD_FIELDS: &[FieldDef] = &[
        FieldDef::text("title", 50),
        FieldDef::reference("board_id", "board", DeletePolicy::Cascade),
        FieldDef::reference("parent_card_id", "card", DeletePolicy::Cascade),
    ];
    static LABEL_FIELDS: &[FieldDef] = &[
        FieldDef::text("name", 50),
        FieldDef::reference("card_id", "card", DeletePolicy::SetNull),
    ];

    fn def(name: &'static str, table: &'static str, fields: &'static [FieldDef]) -> EntityDef {
        EntityDef {
            name,
            table,
            module: Module::Workspace,
            scope: TenantScope::Tenant,
            fields,
        }
    }

    fn board_catalog() -> (Arc<Catalog>, MemoryRepository) {
        let catalog = Arc::new(
            Catalog::new(vec![
                def("board", "boards", BOARD_FIELDS),
                def("card", "cards", CARD_FIELDS),
                def("label", "labels", LABEL_FIELDS),
            ])
            .unwrap(),
        );
        let repo = MemoryRepository::new(catalog.clone());
        (catalog, repo)
    }

    #[tokio::test]
    async fn test_delete_policies() {
        let (catalog, repo) = board_catalog();
        let tenant = Uuid::new_v4();
        let filter = TenantFilter::Tenant(tenant);
        let board = catalog.entity("board").unwrap();
        let card = catalog.entity("card").unwrap();
        let label = catalog.entity("label").unwrap();

        let b = row(board, tenant, vec![("name", FieldValue::Text("Term plan".into()))]);
        repo.insert(board, &b).await.unwrap();
        let c = row(card, tenant, vec![("board_id", FieldValue::Reference(b.id))]);
        repo.insert(card, &c).await.unwrap();
        let l = row(label, tenant, vec![("card_id", FieldValue::Reference(c.id))]);
        repo.insert(label, &l).await.unwrap();

        assert!(repo.delete(board, b.id, filter).await.unwrap());

        assert!(!repo.exists(card, c.id, filter).await.unwrap(), "cascade removes cards");
        let kept = repo.find(label, l.id, filter).await.unwrap().unwrap();
        assert!(kept.get("card_id").is_null(), "set null clears reference");
        assert_eq!(repo.row_count(), 1);
    }

    #[tokio::test]
    async fn test_cyclic_cascade_terminates() {
        let (catalog, repo) = board_catalog();
        let tenant = Uuid::new_v4();
        let filter = TenantFilter::Tenant(tenant);
        let board = catalog.entity("board").unwrap();
        let card = catalog.entity("card").unwrap();

        let mut b = row(board, tenant, vec![("name", FieldValue::Text("Loop".into()))]);
        repo.insert(board, &b).await.unwrap();
        let mut first = row(card, tenant, vec![("board_id", FieldValue::Reference(b.id))]);
        repo.insert(card, &first).await.unwrap();
        let second = row(card, tenant, vec![("parent_card_id", FieldValue::Reference(first.id))]);
        repo.insert(card, &second).await.unwrap();
        first.values.insert("parent_card_id", FieldValue::Reference(second.id));
        repo.update(card, &first, filter).await.unwrap();
        b.values.insert("pinned_card_id", FieldValue::Reference(first.id));
        repo.update(board, &b, filter).await.unwrap();

        assert!(repo.delete(board, b.id, filter).await.unwrap());
        assert_eq!(repo.row_count(), 0);
    }

    #[tokio::test]
    async fn test_required_child_blocks_parent_delete() {
        let (catalog, repo) = setup();
        let tenant = Uuid::new_v4();
        let filter = TenantFilter::Tenant(tenant);
        let workspace = catalog.entity("workspace").unwrap();
        let task = catalog.entity("workspace_task").unwrap();

        let ws = row(workspace, tenant, vec![("name", FieldValue::Text("Staff room".into()))]);
        repo.insert(workspace, &ws).await.unwrap();
        let t = row(task, tenant, vec![
            ("title", FieldValue::Text("Plan term".into())),
            ("workspace_id", FieldValue::Reference(ws.id)),
        ]);
        repo.insert(task, &t).await.unwrap();

        let err = repo.delete(workspace, ws.id, filter).await.unwrap_err();
        let DomainError::ReferentialIntegrity(message) = err else {
            panic!("expected referential integrity error");
        };
        assert!(message.contains("workspace_task.workspace_id"));
        assert!(!message.contains(&t.id.to_string()));
        assert!(repo.exists(workspace, ws.id, filter).await.unwrap());
        assert!(repo.exists(task, t.id, filter).await.unwrap());
    }

    #[tokio::test]
    async fn test_optional_reference_set_null_on_delete() {
        let (catalog, repo) = setup();
        let tenant = Uuid::new_v4();
        let filter = TenantFilter::Tenant(tenant);
        let workspace = catalog.entity("workspace").unwrap();
        let announcement = catalog.entity("announcement").unwrap();

        let ws = row(workspace, tenant, vec![("name", FieldValue::Text("Staff room".into()))]);
        repo.insert(workspace, &ws).await.unwrap();
        let a = row(announcement, tenant, vec![
            ("title", FieldValue::Text("Welcome".into())),
            ("workspace_id", FieldValue::Reference(ws.id)),
        ]);
        repo.insert(announcement, &a).await.unwrap();

        assert!(repo.delete(workspace, ws.id, filter).await.unwrap());
        let kept = repo.find(announcement, a.id, filter).await.unwrap().unwrap();
        assert!(kept.get("workspace_id").is_null());
    }

    #[tokio::test]
    async fn test_document_version_cycle() {
        let (catalog, repo) = setup();
        let tenant = Uuid::new_v4();
        let filter = TenantFilter::Tenant(tenant);
        let doc_type = catalog.entity("document_type").unwrap();
        let document = catalog.entity("document").unwrap();
        let version = catalog.entity("document_version").unwrap();

        let mut dt = row(doc_type, tenant, vec![("name", FieldValue::Text("Report".into()))]);
        dt.tenant_id = None;
        repo.insert(doc_type, &dt).await.unwrap();
        let mut doc = row(document, tenant, vec![
            ("title", FieldValue::Text("Term report".into())),
            ("document_type_id", FieldValue::Reference(dt.id)),
        ]);
        repo.insert(document, &doc).await.unwrap();
        let v = row(version, tenant, vec![
            ("document_id", FieldValue::Reference(doc.id)),
            ("version_number", FieldValue::Integer(1)),
            ("file_name", FieldValue::Text("report.pdf".into())),
        ]);
        repo.insert(version, &v).await.unwrap();
        doc.values.insert("document_version_id", FieldValue::Reference(v.id));
        repo.update(document, &doc, filter).await.unwrap();

        assert!(repo.delete(document, doc.id, filter).await.is_err());
        assert!(repo.delete(version, v.id, filter).await.unwrap());
        let current = repo.find(document, doc.id, filter).await.unwrap().unwrap();
        assert!(current.get("document_version_id").is_null());
        assert!(repo.delete(document, doc.id, filter).await.unwrap());
    }

    #[tokio::test]
    async fn test_global_rows_visible_to_every_tenant() {
        let (catalog, repo) = setup();
        let gender = catalog.entity("gender").unwrap();
        let mut g = row(gender, Uuid::new_v4(), vec![("name", FieldValue::Text("Female".into()))]);
        g.tenant_id = None;
        repo.insert(gender, &g).await.unwrap();

        let filter = TenantFilter::Tenant(Uuid::new_v4());
        assert!(repo.find(gender, g.id, filter).await.unwrap().is_some());
        let page = repo.list(gender, filter, &ListQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let (catalog, repo) = setup();
        let tenant = Uuid::new_v4();
        let def = catalog.entity("guardian").unwrap();
        for i in 0..5 {
            let rec = row(def, tenant, vec![("name", FieldValue::Text(format!("Guardian {i}")))]);
            repo.insert(def, &rec).await.unwrap();
        }
        let other = row(def, Uuid::new_v4(), vec![("name", FieldValue::Text("Elsewhere".into()))]);
        repo.insert(def, &other).await.unwrap();

        let query = ListQuery {
            pagination: school_shared::types::Pagination::new(Some(2), Some(2)),
            filters: vec![],
        };
        let page = repo.list(def, TenantFilter::Tenant(tenant), &query).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().all(|r| r.belongs_to(tenant)));
    }
}
