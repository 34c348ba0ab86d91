//! # Conversion Configuration
//!
//! Knobs for lowering and lifting. Deserializes from the `[conversion]`
//! table of the application's TOML file; every key is optional.

use crate::DataModelError;
use crate::primitives::{
    END_NODE_PROPERTY, MAX_IDENTIFIER_LENGTH, MAX_PROPERTIES_PER_CONTAINER, START_NODE_PROPERTY,
};
use serde::{Deserialize, Serialize};

/// Settings shared by every conversion pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Container capacity before the container name is bumped.
    pub max_properties_per_container: usize,

    /// Generated identifiers (constraint names) are truncated to this length.
    pub max_identifier_length: usize,

    /// Property id marking the start node of an edge class.
    pub start_node_property: String,

    /// Property id marking the end node of an edge class.
    pub end_node_property: String,

    /// Resolve relations defined in both directions into a single stored
    /// relation plus an inwards edge or a reverse connection.
    pub infer_inverse_connections: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_properties_per_container: MAX_PROPERTIES_PER_CONTAINER,
            max_identifier_length: MAX_IDENTIFIER_LENGTH,
            start_node_property: START_NODE_PROPERTY.to_string(),
            end_node_property: END_NODE_PROPERTY.to_string(),
            infer_inverse_connections: true,
        }
    }
}

impl ConversionConfig {
    /// Reject settings no conversion can honour.
    pub fn validate(&self) -> Result<(), DataModelError> {
        if self.max_properties_per_container == 0 {
            return Err(DataModelError::InvalidConfig(
                "max_properties_per_container must be at least 1".to_string(),
            ));
        }
        if self.max_identifier_length == 0 {
            return Err(DataModelError::InvalidConfig(
                "max_identifier_length must be at least 1".to_string(),
            ));
        }
        if self.start_node_property.is_empty()
            || self.start_node_property == self.end_node_property
        {
            return Err(DataModelError::InvalidConfig(
                "start and end node properties must be distinct and non-empty".to_string(),
            ));
        }
        Ok(())
    }
}
