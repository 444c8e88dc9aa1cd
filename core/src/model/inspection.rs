//! An `Inspection` entry in a layout (spec §3): a command the verifier runs
//! itself against the already-verified step artifacts, with no key or
//! threshold of its own.

use serde::{Deserialize, Serialize};

use crate::rules::Rule;

fn inspection_type_tag() -> String {
    "inspection".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Inspection {
    #[serde(rename = "_type", default = "inspection_type_tag")]
    pub type_: String,
    pub name: String,
    #[serde(default)]
    pub expected_materials: Vec<Rule>,
    #[serde(default)]
    pub expected_products: Vec<Rule>,
    pub run: Vec<String>,
}

impl Inspection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            type_: inspection_type_tag(),
            name: name.into(),
            expected_materials: Vec::new(),
            expected_products: Vec::new(),
            run: Vec::new(),
        }
    }
}
