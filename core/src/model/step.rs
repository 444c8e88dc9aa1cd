//! A `Step` entry in a layout (spec §3): a single mandated, authorized
//! command, whose resulting link(s) are matched against `pubkeys` and
//! `threshold`.

use serde::{Deserialize, Serialize};

use crate::rules::Rule;

fn step_type_tag() -> String {
    "step".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    #[serde(rename = "_type", default = "step_type_tag")]
    pub type_: String,
    pub name: String,
    #[serde(default)]
    pub expected_materials: Vec<Rule>,
    #[serde(default)]
    pub expected_products: Vec<Rule>,
    pub pubkeys: Vec<String>,
    #[serde(default)]
    pub expected_command: Vec<String>,
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

fn default_threshold() -> usize {
    1
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            type_: step_type_tag(),
            name: name.into(),
            expected_materials: Vec::new(),
            expected_products: Vec::new(),
            pubkeys: Vec::new(),
            expected_command: Vec::new(),
            threshold: 1,
        }
    }
}
