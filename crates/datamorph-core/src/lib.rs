//! # datamorph-core
//!
//! The deterministic data-model compiler for Datamorph - THE LOGIC.
//!
//! A conceptual model (concepts, properties, inheritance) is lowered into a
//! physical storage model (views, containers, direct relations, edges and
//! reverse connections), and a physical model can be lifted back. Every
//! converted element keeps a link to its counterpart.
//!
//! ## Layout
//!
//! - `entity` → typed references and their textual notation
//! - `conceptual` / `physical` → the two model shapes
//! - `graph` / `analysis` → inheritance closure and schema queries
//! - `lowering` / `lifting` / `linking` → the conversions
//! - `validation` / `tabular` → checks and the flat row form
//!
//! ## Architectural Constraints
//!
//! - Pure and synchronous: NO async, NO I/O, NO network dependencies
//! - Deterministic: identical input gives byte-identical output
//! - Recoverable problems go to an [`IssueSink`]; only fatal ones are `Err`

// =============================================================================
// MODULES
// =============================================================================

pub mod analysis;
pub mod conceptual;
pub mod config;
pub mod entity;
pub mod graph;
pub mod issues;
pub mod lifting;
pub mod linking;
pub mod lowering;
pub mod physical;
pub mod primitives;
pub mod tabular;
pub mod types;
pub mod validation;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{DataModelError, DataType, NotationError, PhysicalDataType};

// =============================================================================
// RE-EXPORTS: Entities
// =============================================================================

pub use entity::notation::{Defaults, NotationParser};
pub use entity::{
    ConceptEntity, ContainerConstraintEntity, ContainerEntity, ContainerIndexEntity,
    DataModelEntity, Direction, EdgeEntity, Entity, EntityKind, NodeEntity, Prefix,
    ReverseConnectionEntity, ViewEntity,
};

// =============================================================================
// RE-EXPORTS: Models
// =============================================================================

pub use conceptual::{
    Concept, ConceptualMetadata, ConceptualModel, ConceptualProperty, ConceptualPropertyId,
    ConceptualValueType,
};
pub use physical::{
    Connection, ConnectionKind, Container, PhysicalMetadata, PhysicalModel, PhysicalProperty,
    PhysicalPropertyId, PhysicalValueType, UsedFor, View,
};

// =============================================================================
// RE-EXPORTS: Conversion
// =============================================================================

pub use analysis::{Analysis, Linkage, SchemaGraph, ViewQuery};
pub use config::ConversionConfig;
pub use issues::{Issue, IssueCode, IssueList, IssueSink, Severity};
pub use lifting::PhysicalToConceptual;
pub use linking::{ConversionOutput, LinkTable, sync};
pub use lowering::{ConceptualToPhysical, PlatformSchema};
pub use tabular::{ConceptualTable, PhysicalTable};
pub use validation::{ValidationPass, Validator};
