// ============================================================================
// School Core - Payload Parsing
// File: crates/school-core/src/domain/payload.rs
// Description: JSON request body -> typed column values, with validation
// ============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use school_shared::constants::SERVER_MANAGED_FIELDS;
use school_shared::utils::{normalize_field_key, to_camel_case};

use crate::domain::FieldValue;
use crate::error::{DomainError, FieldViolation};
use crate::schema::{EntityDef, FieldDef, FieldKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// New row: every field resolved, required fields must be present
    Create,
    /// Full replacement (PUT): same rules as `Create`
    Replace,
    /// Partial update (PATCH): only supplied fields are returned
    Merge,
}

/// Parses a request body against an entity definition.
///
/// All violations are collected before failing. Server-managed keys (`id`,
/// `tenantId`, audit columns) are ignored rather than rejected.
pub fn parse_payload(
    def: &EntityDef,
    body: &Value,
    mode: PayloadMode,
) -> Result<BTreeMap<&'static str, FieldValue>, DomainError> {
    let object = body
        .as_object()
        .ok_or_else(|| DomainError::invalid("body", "expected a JSON object"))?;

    let mut violations = Vec::new();
    let mut values = BTreeMap::new();

    for (key, raw) in object {
        let column = normalize_field_key(key);
        if SERVER_MANAGED_FIELDS.contains(&column.as_str()) {
            continue;
        }
        let Some(field) = def.field(&column) else {
            violations.push(FieldViolation::new(key.as_str(), "unknown field"));
            continue;
        };
        match convert(field, raw) {
            Ok(value) => {
                if field.required && value.is_null() {
                    violations.push(FieldViolation::new(to_camel_case(field.name), "is required"));
                } else {
                    values.insert(field.name, value);
                }
            }
            Err(message) => violations.push(FieldViolation::new(to_camel_case(field.name), message)),
        }
    }

    if mode != PayloadMode::Merge {
        for field in def.fields {
            if values.contains_key(field.name) {
                continue;
            }
            if field.required {
                let label = to_camel_case(field.name);
                if !violations.iter().any(|v| v.field == label) {
                    violations.push(FieldViolation::new(label, "is required"));
                }
            } else {
                values.insert(field.name, FieldValue::Null);
            }
        }
    }

    if violations.is_empty() {
        Ok(values)
    } else {
        Err(DomainError::Validation(violations))
    }
}

fn convert(field: &FieldDef, raw: &Value) -> Result<FieldValue, String> {
    if raw.is_null() {
        return Ok(FieldValue::Null);
    }

    match field.kind {
        FieldKind::Text { max_len } => {
            let text = raw.as_str().ok_or("expected a string")?;
            if text.chars().count() > max_len {
                return Err(format!("must be at most {} characters", max_len));
            }
            Ok(FieldValue::Text(text.to_string()))
        }
        FieldKind::Integer => raw
            .as_i64()
            .map(FieldValue::Integer)
            .ok_or_else(|| "expected an integer".to_string()),
        FieldKind::Float => match raw.as_f64() {
            Some(n) if n.is_finite() => Ok(FieldValue::Float(n)),
            _ => Err("expected a number".to_string()),
        },
        FieldKind::Boolean => raw
            .as_bool()
            .map(FieldValue::Boolean)
            .ok_or_else(|| "expected a boolean".to_string()),
        FieldKind::Date => {
            let text = raw.as_str().ok_or("expected a date string")?;
            parse_date(text)
                .map(FieldValue::Date)
                .ok_or_else(|| "expected a date (YYYY-MM-DD)".to_string())
        }
        FieldKind::DateTime => {
            let text = raw.as_str().ok_or("expected a date-time string")?;
            parse_datetime(text)
                .map(FieldValue::DateTime)
                .ok_or_else(|| "expected an RFC 3339 date-time".to_string())
        }
        FieldKind::Reference { .. } => {
            let text = raw.as_str().ok_or("expected a UUID string")?;
            Uuid::parse_str(text)
                .map(FieldValue::Reference)
                .map_err(|_| "expected a UUID".to_string())
        }
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(text).map(|dt| dt.date_naive()))
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            // Offset-less timestamps are taken as UTC
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
