//! The `Link` payload (spec §3): evidence of one execution of a step or
//! inspection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A hash dict: algorithm name (e.g. `"sha256"`) to lowercase hex digest.
/// Identical shape for materials and products (spec §3).
pub type HashDict = HashMap<String, String>;

/// `byproducts` of a recorded command execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Byproducts {
    pub stdout: String,
    pub stderr: String,
    #[serde(rename = "return-value")]
    pub return_value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    #[serde(rename = "_type", default = "link_type_tag")]
    pub type_: String,
    pub name: String,
    pub materials: HashMap<String, HashDict>,
    pub products: HashMap<String, HashDict>,
    pub command: Vec<String>,
    pub byproducts: Byproducts,
    #[serde(default)]
    pub environment: HashMap<String, serde_json::Value>,
}

fn link_type_tag() -> String {
    "link".to_string()
}

impl Link {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            type_: link_type_tag(),
            name: name.into(),
            materials: HashMap::new(),
            products: HashMap::new(),
            command: Vec::new(),
            byproducts: Byproducts::default(),
            environment: HashMap::new(),
        }
    }

    /// An empty link with the given name, used as the summary link for a
    /// sublayout that declares no steps (spec §4.9 rule 4).
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name)
    }
}
