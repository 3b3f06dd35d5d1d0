//! Engine configuration
//!
//! Names of the attributes the engine reads and writes. Loaded from JSON,
//! with every field optional.

use serde::{Deserialize, Serialize};

/// Attribute and naming settings for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Attribute holding an element's directive table
    #[serde(default = "default_binding_attribute")]
    pub binding_attribute: String,
    /// Attribute tagging each node generated by `repeat` with its index
    #[serde(default = "default_repeat_index_attribute")]
    pub repeat_index_attribute: String,
    /// Prefix of names generated by `uniqueName`
    #[serde(default = "default_unique_name_prefix")]
    pub unique_name_prefix: String,
}

fn default_binding_attribute() -> String {
    "data-bind".to_string()
}

fn default_repeat_index_attribute() -> String {
    "data-repeat-index".to_string()
}

fn default_unique_name_prefix() -> String {
    "ko_unique_".to_string()
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            binding_attribute: default_binding_attribute(),
            repeat_index_attribute: default_repeat_index_attribute(),
            unique_name_prefix: default_unique_name_prefix(),
        }
    }
}

impl BindingConfig {
    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
