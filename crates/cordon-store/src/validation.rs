//! Input schema validation
//!
//! Malformed entities are rejected before any MAC or crypto work runs.
//! The checks are shape-level: identifiers, reserved field collisions,
//! and (in strict mode) nesting depth.

use cordon_core::{record, CordonError, Record, Result};
use serde_json::{Map, Value};

/// Row fields the storage layer owns; payloads may not shadow them
const RESERVED_FIELDS: [&str; 8] = [
    record::FIELD_ID,
    record::FIELD_LOGICAL_ID,
    record::FIELD_NORMAL_LEVEL,
    record::FIELD_POLY_LEVEL,
    record::FIELD_COMPARTMENTS,
    record::FIELD_DATA,
    record::FIELD_WRITTEN_AT,
    crate::merge::FIELD_MERGED_AT,
];

/// Maximum nesting depth accepted in strict mode
const MAX_DEPTH: usize = 32;

/// Shape validator for incoming records
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator {
    strict: bool,
}

impl SchemaValidator {
    /// Create a validator; strict mode adds depth limits
    pub fn new(strict: bool) -> Self {
        SchemaValidator { strict }
    }

    /// Validate a record before it reaches the MAC or crypto layers
    pub fn validate(&self, entity: &Record) -> Result<()> {
        if entity.logical_id().trim().is_empty() {
            return Err(CordonError::schema_validation("Entity id must be non-empty"));
        }
        self.validate_body(entity.body())?;
        Ok(())
    }

    fn validate_body(&self, body: &Map<String, Value>) -> Result<()> {
        for key in body.keys() {
            if key.trim().is_empty() {
                return Err(CordonError::schema_validation(
                    "Payload keys must be non-empty",
                ));
            }
            if RESERVED_FIELDS.contains(&key.as_str()) {
                return Err(CordonError::schema_validation(format!(
                    "Payload key {key:?} collides with a reserved row field"
                )));
            }
        }
        if self.strict {
            for value in body.values() {
                check_depth(value, 1)?;
            }
        }
        Ok(())
    }
}

fn check_depth(value: &Value, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(CordonError::schema_validation(format!(
            "Payload nesting exceeds {MAX_DEPTH} levels"
        )));
    }
    match value {
        Value::Object(map) => {
            for nested in map.values() {
                check_depth(nested, depth + 1)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                check_depth(item, depth + 1)?;
            }
        }
        _ => {}
    }
    Ok(())
}
