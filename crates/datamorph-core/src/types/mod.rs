//! # Core Type Definitions
//!
//! This module contains the primitive types shared by every Datamorph pass:
//! - Conceptual primitive types (`DataType`) and union resolution
//! - Physical primitive types (`PhysicalDataType`)
//! - Error types (`DataModelError`, `NotationError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Render to a single canonical string through `Display`

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// CONCEPTUAL DATA TYPES
// =============================================================================

/// Primitive value types available in a conceptual model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Integer,
    Long,
    Float,
    Double,
    Decimal,
    String,
    AnyUri,
    Date,
    DateTime,
    Json,
    Timeseries,
    File,
    Sequence,
}

impl DataType {
    /// Every conceptual data type, in declaration order.
    pub const ALL: [DataType; 14] = [
        DataType::Boolean,
        DataType::Integer,
        DataType::Long,
        DataType::Float,
        DataType::Double,
        DataType::Decimal,
        DataType::String,
        DataType::AnyUri,
        DataType::Date,
        DataType::DateTime,
        DataType::Json,
        DataType::Timeseries,
        DataType::File,
        DataType::Sequence,
    ];

    /// Notation name of the type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Decimal => "decimal",
            DataType::String => "string",
            DataType::AnyUri => "anyURI",
            DataType::Date => "date",
            DataType::DateTime => "dateTime",
            DataType::Json => "json",
            DataType::Timeseries => "timeseries",
            DataType::File => "file",
            DataType::Sequence => "sequence",
        }
    }

    /// The physical storage type used when this type is lowered.
    #[must_use]
    pub fn to_physical(&self) -> PhysicalDataType {
        match self {
            DataType::Boolean => PhysicalDataType::Boolean,
            DataType::Integer => PhysicalDataType::Int32,
            DataType::Long => PhysicalDataType::Int64,
            DataType::Float => PhysicalDataType::Float32,
            DataType::Double | DataType::Decimal => PhysicalDataType::Float64,
            DataType::String | DataType::AnyUri => PhysicalDataType::Text,
            DataType::Date => PhysicalDataType::Date,
            DataType::DateTime => PhysicalDataType::Timestamp,
            DataType::Json => PhysicalDataType::Json,
            DataType::Timeseries => PhysicalDataType::Timeseries,
            DataType::File => PhysicalDataType::File,
            DataType::Sequence => PhysicalDataType::Sequence,
        }
    }

    /// Resolve a union of primitive types to exactly one type.
    ///
    /// Precedence, evaluated in order over the de-duplicated branches:
    /// 1. any json branch resolves to string
    /// 2. only booleans resolve to boolean
    /// 3. a subset of {boolean, integer, long} resolves to integer (long if present)
    /// 4. a subset of {boolean, integers, floats} resolves to double
    /// 5. a subset of {date, dateTime} resolves to dateTime
    /// 6. anything else resolves to string
    ///
    /// The precedence applies to single-branch unions too, so `float | float`
    /// widens to double. The input order never affects the result.
    #[must_use]
    pub fn resolve_union(branches: &[DataType]) -> DataType {
        let set: BTreeSet<DataType> = branches.iter().copied().collect();
        let subset_of = |allowed: &[DataType]| set.iter().all(|t| allowed.contains(t));

        if set.is_empty() || set.contains(&DataType::Json) {
            return DataType::String;
        }
        if subset_of(&[DataType::Boolean]) {
            return DataType::Boolean;
        }
        if subset_of(&[DataType::Boolean, DataType::Integer, DataType::Long]) {
            return if set.contains(&DataType::Long) {
                DataType::Long
            } else {
                DataType::Integer
            };
        }
        if subset_of(&[
            DataType::Boolean,
            DataType::Integer,
            DataType::Long,
            DataType::Float,
            DataType::Double,
            DataType::Decimal,
        ]) {
            return DataType::Double;
        }
        if subset_of(&[DataType::Date, DataType::DateTime]) {
            return DataType::DateTime;
        }
        DataType::String
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        DataType::ALL
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(trimmed))
            .copied()
            .ok_or_else(|| NotationError::InvalidValue {
                field: "value_type".to_string(),
                value: s.to_string(),
            })
    }
}

// =============================================================================
// PHYSICAL DATA TYPES
// =============================================================================

/// Storage types available in a physical container.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PhysicalDataType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Date,
    Timestamp,
    Json,
    /// Enumeration backed by a named collection of enum values.
    Enum { collection: String },
    Timeseries,
    File,
    Sequence,
    /// Reference to another node, stored in the container.
    DirectRelation,
}

impl PhysicalDataType {
    const SIMPLE: [PhysicalDataType; 13] = [
        PhysicalDataType::Boolean,
        PhysicalDataType::Int32,
        PhysicalDataType::Int64,
        PhysicalDataType::Float32,
        PhysicalDataType::Float64,
        PhysicalDataType::Text,
        PhysicalDataType::Date,
        PhysicalDataType::Timestamp,
        PhysicalDataType::Json,
        PhysicalDataType::Timeseries,
        PhysicalDataType::File,
        PhysicalDataType::Sequence,
        PhysicalDataType::DirectRelation,
    ];

    /// Approximate conceptual counterpart. Direct relations have none.
    #[must_use]
    pub fn to_conceptual(&self) -> Option<DataType> {
        match self {
            PhysicalDataType::Boolean => Some(DataType::Boolean),
            PhysicalDataType::Int32 => Some(DataType::Integer),
            PhysicalDataType::Int64 => Some(DataType::Long),
            PhysicalDataType::Float32 => Some(DataType::Float),
            PhysicalDataType::Float64 => Some(DataType::Double),
            PhysicalDataType::Text | PhysicalDataType::Enum { .. } => Some(DataType::String),
            PhysicalDataType::Date => Some(DataType::Date),
            PhysicalDataType::Timestamp => Some(DataType::DateTime),
            PhysicalDataType::Json => Some(DataType::Json),
            PhysicalDataType::Timeseries => Some(DataType::Timeseries),
            PhysicalDataType::File => Some(DataType::File),
            PhysicalDataType::Sequence => Some(DataType::Sequence),
            PhysicalDataType::DirectRelation => None,
        }
    }
}

impl fmt::Display for PhysicalDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhysicalDataType::Boolean => "boolean",
            PhysicalDataType::Int32 => "int32",
            PhysicalDataType::Int64 => "int64",
            PhysicalDataType::Float32 => "float32",
            PhysicalDataType::Float64 => "float64",
            PhysicalDataType::Text => "text",
            PhysicalDataType::Date => "date",
            PhysicalDataType::Timestamp => "timestamp",
            PhysicalDataType::Json => "json",
            PhysicalDataType::Enum { collection } => {
                return write!(f, "enum(collection={})", collection);
            }
            PhysicalDataType::Timeseries => "timeseries",
            PhysicalDataType::File => "file",
            PhysicalDataType::Sequence => "sequence",
            PhysicalDataType::DirectRelation => "direct",
        };
        f.write_str(name)
    }
}

impl FromStr for PhysicalDataType {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || NotationError::InvalidValue {
            field: "value_type".to_string(),
            value: s.to_string(),
        };

        if let Some(rest) = trimmed.strip_prefix("enum(") {
            let collection = rest
                .strip_suffix(')')
                .and_then(|body| body.trim().strip_prefix("collection="))
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .ok_or_else(invalid)?;
            return Ok(PhysicalDataType::Enum {
                collection: collection.to_string(),
            });
        }

        PhysicalDataType::SIMPLE
            .iter()
            .find(|t| t.to_string().eq_ignore_ascii_case(trimmed))
            .cloned()
            .ok_or_else(invalid)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the entity notation parser in strict mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotationError {
    /// The text does not match the `prefix:suffix(content)` shape.
    #[error("Malformed entity '{raw}': {reason}")]
    Malformed { raw: String, reason: String },

    /// A content key that the entity kind does not define.
    #[error("Unknown field '{field}' for {kind} entity")]
    UnknownField { kind: String, field: String },

    /// A content key that appears more than once.
    #[error("Duplicate field '{field}'")]
    DuplicateField { field: String },

    /// A field value that cannot be interpreted.
    #[error("Invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },

    /// The text is a valid entity of a different kind.
    #[error("Expected {expected} entity, got '{raw}'")]
    KindMismatch { expected: String, raw: String },
}

/// Fatal errors that abort the conversion of the current model.
///
/// - Recoverable problems are reported as issues, never as errors
/// - Use `Result<T, DataModelError>` for fallible operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataModelError {
    /// Entity text could not be parsed.
    #[error("Notation error: {0}")]
    Notation(#[from] NotationError),

    /// The inheritance graph contains a cycle.
    #[error("Inheritance cycle detected involving: {}", members.join(", "))]
    InheritanceCycle { members: Vec<String> },

    /// A cross-reference required at finalize time is missing.
    #[error("Missing link for {element}")]
    MissingLink { element: String },

    /// A property has only one of container / container property set.
    #[error("Property {property} has a half-set container reference")]
    HalfStoredProperty { property: String },

    /// The conversion configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// =============================================================================
// TESTS
// =============================================================================
