//! Record model: normal and polyinstantiated stored objects
//!
//! A stored object is either a normal labeled record or one instance of a
//! polyinstantiated logical entity. The distinction is a type-level fact
//! (`Record` is a sum type), not a runtime field probe; the row codec keeps
//! the wire layout's field-presence convention only as a documented
//! decoding fallback for callers that cannot supply the shape.

use crate::errors::{CordonError, Result};
use crate::label::SecurityLabel;
use crate::lattice::normalize_compartments;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Row field holding the level of a polyinstantiated instance
pub const FIELD_POLY_LEVEL: &str = "classification_level";
/// Row field holding the level of a normal record
pub const FIELD_NORMAL_LEVEL: &str = "classification";
/// Row field holding compartment tags
pub const FIELD_COMPARTMENTS: &str = "compartments";
/// Row field holding the record payload
pub const FIELD_DATA: &str = "data";
/// Row field holding the write timestamp (Unix seconds)
pub const FIELD_WRITTEN_AT: &str = "written_at";
/// Row field holding the logical entity id of a polyinstantiated instance
pub const FIELD_LOGICAL_ID: &str = "logical_id";
/// Row field holding the physical key
pub const FIELD_ID: &str = "id";

/// Which record layout a stored row uses.
///
/// Passed by the caller wherever the caller knows the store's shape.
/// `Record::from_row` falls back to probing for the
/// poly-instance-specific level field only when no shape is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// Single-instance record, label in `classification`
    Normal,
    /// Polyinstantiated instance, level in `classification_level`
    PolyInstance,
}

/// A single-instance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalRecord {
    /// Application-chosen identifier
    pub id: String,
    /// Classification label of the whole record
    pub label: SecurityLabel,
    /// Application payload
    pub body: Map<String, Value>,
}

/// One classified instance of a polyinstantiated logical entity.
///
/// At most one instance exists per `(logical_id, level)` pair: the
/// physical key appends the level to the logical id, so a same-level write
/// overwrites in place and a different-level write creates a sibling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyRecord {
    /// Identifier shared by all instances of the logical entity
    pub logical_id: String,
    /// Classification label of this instance
    pub label: SecurityLabel,
    /// Instance-specific payload
    pub body: Map<String, Value>,
}

/// A stored object: either a normal record or a poly instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    /// Single-instance record
    Normal(NormalRecord),
    /// Polyinstantiated instance
    PolyInstance(PolyRecord),
}

impl Record {
    /// Build a normal record
    pub fn normal(id: impl Into<String>, label: SecurityLabel, body: Map<String, Value>) -> Self {
        Record::Normal(NormalRecord {
            id: id.into(),
            label,
            body,
        })
    }

    /// Build a polyinstantiated instance
    pub fn poly_instance(
        logical_id: impl Into<String>,
        label: SecurityLabel,
        body: Map<String, Value>,
    ) -> Self {
        Record::PolyInstance(PolyRecord {
            logical_id: logical_id.into(),
            label,
            body,
        })
    }

    /// The record's classification label
    pub fn label(&self) -> &SecurityLabel {
        match self {
            Record::Normal(r) => &r.label,
            Record::PolyInstance(r) => &r.label,
        }
    }

    /// The caller-facing identifier (logical id for poly instances)
    pub fn logical_id(&self) -> &str {
        match self {
            Record::Normal(r) => &r.id,
            Record::PolyInstance(r) => &r.logical_id,
        }
    }

    /// The record payload
    pub fn body(&self) -> &Map<String, Value> {
        match self {
            Record::Normal(r) => &r.body,
            Record::PolyInstance(r) => &r.body,
        }
    }

    /// Which layout this record uses
    pub fn shape(&self) -> RecordShape {
        match self {
            Record::Normal(_) => RecordShape::Normal,
            Record::PolyInstance(_) => RecordShape::PolyInstance,
        }
    }

    /// Physical storage key.
    ///
    /// Poly instances key on `{logical_id}-{level}` so one row exists per
    /// `(logical_id, level)`; normal records key on their id.
    pub fn physical_key(&self) -> String {
        match self {
            Record::Normal(r) => r.id.clone(),
            Record::PolyInstance(r) => poly_physical_key(&r.logical_id, &r.label),
        }
    }

    /// Encode this record as a stored row (plaintext payload)
    pub fn to_row(&self, written_at: u64) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert(FIELD_ID.into(), Value::String(self.physical_key()));
        let compartments: Vec<Value> = self
            .label()
            .compartments
            .iter()
            .map(|c| Value::String(c.clone()))
            .collect();
        match self {
            Record::Normal(r) => {
                row.insert(
                    FIELD_NORMAL_LEVEL.into(),
                    Value::String(r.label.level.as_str().into()),
                );
            }
            Record::PolyInstance(r) => {
                row.insert(FIELD_LOGICAL_ID.into(), Value::String(r.logical_id.clone()));
                row.insert(
                    FIELD_POLY_LEVEL.into(),
                    Value::String(r.label.level.as_str().into()),
                );
            }
        }
        row.insert(FIELD_COMPARTMENTS.into(), Value::Array(compartments));
        row.insert(FIELD_DATA.into(), Value::Object(self.body().clone()));
        row.insert(FIELD_WRITTEN_AT.into(), Value::Number(written_at.into()));
        row
    }

    /// Decode a stored row.
    ///
    /// `shape` should be supplied by callers that know the store layout.
    /// Without it, a row carrying the poly-specific level field decodes as
    /// a poly instance (the documented fallback); anything else decodes as
    /// a normal record. Rows whose level string fails to parse are
    /// unrankable and fail closed.
    pub fn from_row(row: &Map<String, Value>, shape: Option<RecordShape>) -> Result<Record> {
        let shape = shape.unwrap_or_else(|| {
            if row.contains_key(FIELD_POLY_LEVEL) {
                RecordShape::PolyInstance
            } else {
                RecordShape::Normal
            }
        });

        let label = parse_row_label(row, shape)?;
        let body = match row.get(FIELD_DATA) {
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(CordonError::serialization(format!(
                    "Record payload must be an object, got {other}"
                )))
            }
            None => Map::new(),
        };

        match shape {
            RecordShape::Normal => {
                let id = required_string(row, FIELD_ID)?;
                Ok(Record::Normal(NormalRecord { id, label, body }))
            }
            RecordShape::PolyInstance => {
                let logical_id = required_string(row, FIELD_LOGICAL_ID)?;
                Ok(Record::PolyInstance(PolyRecord {
                    logical_id,
                    label,
                    body,
                }))
            }
        }
    }
}

/// Physical key of a poly instance: `{logical_id}-{level}`
pub fn poly_physical_key(logical_id: &str, label: &SecurityLabel) -> String {
    format!("{}-{}", logical_id, label.level.as_str())
}

/// Extract the classification label from a stored row.
///
/// Reads `classification_level` for poly rows and `classification` for
/// normal rows; a missing or unrankable level is an explicit failure.
pub fn parse_row_label(row: &Map<String, Value>, shape: RecordShape) -> Result<SecurityLabel> {
    let field = match shape {
        RecordShape::Normal => FIELD_NORMAL_LEVEL,
        RecordShape::PolyInstance => FIELD_POLY_LEVEL,
    };
    let level_str = required_string(row, field)?;
    let level = crate::lattice::ClassificationLevel::from_str(&level_str)?;
    let compartments = match row.get(FIELD_COMPARTMENTS) {
        Some(Value::Array(tags)) => normalize_compartments(
            tags.iter()
                .filter_map(|t| t.as_str().map(str::to_string)),
        ),
        _ => Default::default(),
    };
    Ok(SecurityLabel {
        level,
        compartments,
    })
}

fn required_string(row: &Map<String, Value>, field: &str) -> Result<String> {
    row.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CordonError::serialization(format!("Row is missing field {field:?}")))
}
