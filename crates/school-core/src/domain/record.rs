// ============================================================================
// School Core - Record
// File: crates/school-core/src/domain/record.rs
// Description: One row of any catalog entity
// ============================================================================

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use uuid::Uuid;

use school_shared::types::AuditFields;
use school_shared::utils::to_camel_case;

use crate::domain::FieldValue;
use crate::schema::EntityDef;

/// A stored row: identity, tenant partition, typed column values and audit data.
///
/// `values` holds one entry per catalog field; absent values are `FieldValue::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub entity: &'static str,
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub values: BTreeMap<&'static str, FieldValue>,
    pub audit: AuditFields,
}

impl Record {
    pub fn new(
        def: &EntityDef,
        id: Uuid,
        tenant_id: Option<Uuid>,
        values: BTreeMap<&'static str, FieldValue>,
        audit: AuditFields,
    ) -> Self {
        Self {
            entity: def.name,
            id,
            tenant_id,
            values,
            audit,
        }
    }

    pub fn get(&self, field: &str) -> &FieldValue {
        self.values.get(field).unwrap_or(&FieldValue::Null)
    }

    pub fn reference(&self, field: &str) -> Option<Uuid> {
        self.get(field).as_reference()
    }

    /// Non-null references as `(field, target entity, id)`
    pub fn outgoing_references<'a>(
        &'a self,
        def: &'a EntityDef,
    ) -> impl Iterator<Item = (&'static str, &'static str, Uuid)> + 'a {
        def.fields.iter().filter_map(move |f| {
            let target = f.kind.reference_target()?;
            let id = self.reference(f.name)?;
            Some((f.name, target, id))
        })
    }

    pub fn belongs_to(&self, tenant_id: Uuid) -> bool {
        self.tenant_id == Some(tenant_id)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 6))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("tenantId", &self.tenant_id)?;
        for (name, value) in &self.values {
            map.serialize_entry(&to_camel_case(name), value)?;
        }
        map.serialize_entry("createdOn", &self.audit.created_on)?;
        map.serialize_entry("createdBy", &self.audit.created_by)?;
        map.serialize_entry("updatedOn", &self.audit.updated_on)?;
        map.serialize_entry("updatedBy", &self.audit.updated_by)?;
        map.end()
    }
}
