//! # Platform Primitives
//!
//! Hardcoded limits and naming constants of the physical platform.
//!
//! These are the defaults of [`ConversionConfig`](crate::config::ConversionConfig);
//! a configuration may tighten them but the naming rules never change.

/// Maximum number of properties a single container may hold.
///
/// When a concept needs more stored properties, the container is split and
/// the overflow goes to a container with a bumped name.
pub const MAX_PROPERTIES_PER_CONTAINER: usize = 100;

/// Maximum length of generated identifiers such as constraint names.
pub const MAX_IDENTIFIER_LENGTH: usize = 43;

/// Property id marking the start node of an edge class.
pub const START_NODE_PROPERTY: &str = "startNode";

/// Property id marking the end node of an edge class.
pub const END_NODE_PROPERTY: &str = "endNode";

/// Version given to views when neither the concept nor the model has one.
pub const DEFAULT_VERSION: &str = "v1";

/// Suffix appended to a container name that has no trailing number.
pub const FIRST_BUMP_SUFFIX: u64 = 2;

/// Joins view and property into a generated edge type identifier.
pub const EDGE_TYPE_SEPARATOR: char = '.';

/// Constraint kind prefix for "requires" container constraints.
pub const REQUIRES_CONSTRAINT: &str = "requires";
