//! The `Layout` payload (spec §3): the root of trust for a supply chain,
//! naming its steps, inspections, authorized keys and expiration.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{InTotoError, Result};
use crate::model::inspection::Inspection;
use crate::model::key::PublicKey;
use crate::model::step::Step;

fn layout_type_tag() -> String {
    "layout".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Layout {
    #[serde(rename = "_type", default = "layout_type_tag")]
    pub type_: String,
    /// RFC 3339 timestamp; verification fails once `now >= expires` (spec §4.1/§8).
    pub expires: String,
    #[serde(default)]
    pub readme: String,
    pub keys: HashMap<String, PublicKey>,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub inspect: Vec<Inspection>,
}

impl Layout {
    /// Parse `expires` and compare against `now`. Spec §4.1's redesign note
    /// requires rejecting an unparseable timestamp rather than treating it
    /// as non-expiring.
    pub fn is_expired(&self, now: DateTime<Utc>) -> Result<bool> {
        let expires = DateTime::parse_from_rfc3339(&self.expires).map_err(|e| {
            InTotoError::FormatError(format!("layout 'expires' is not RFC 3339: {e}"))
        })?;
        Ok(now >= expires)
    }

    pub fn check_expiry(&self, now: DateTime<Utc>) -> Result<()> {
        if self.is_expired(now)? {
            return Err(InTotoError::LayoutExpiredError {
                expires: self.expires.clone(),
                now: now.to_rfc3339(),
            });
        }
        Ok(())
    }

    /// Resolve `keyid` against the top-level `keys` map, including PGP
    /// subkeys (spec §4.2), returning the key whose identity should be
    /// credited (the master key, for a subkey match).
    pub fn resolve_key(&self, keyid: &str) -> Option<&PublicKey> {
        for key in self.keys.values() {
            if key.resolves(keyid) {
                return Some(key);
            }
        }
        None
    }

    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Structural validation run at load time, mirroring
    /// `layout.py::_validate_steps_and_inspections`: step names must be
    /// unique, inspection names must be unique, and a step may not share its
    /// name with an inspection (both are looked up by name during
    /// verification and a collision would be ambiguous).
    pub fn validate(&self) -> Result<()> {
        let mut step_names = HashSet::new();
        for step in &self.steps {
            if !step_names.insert(step.name.as_str()) {
                return Err(InTotoError::FormatError(format!(
                    "duplicate step name '{}'",
                    step.name
                )));
            }
        }

        let mut inspect_names = HashSet::new();
        for inspection in &self.inspect {
            if !inspect_names.insert(inspection.name.as_str()) {
                return Err(InTotoError::FormatError(format!(
                    "duplicate inspection name '{}'",
                    inspection.name
                )));
            }
            if step_names.contains(inspection.name.as_str()) {
                return Err(InTotoError::FormatError(format!(
                    "name '{}' is used by both a step and an inspection",
                    inspection.name
                )));
            }
        }

        for step in &self.steps {
            for keyid in &step.pubkeys {
                if self.resolve_key(keyid).is_none() {
                    return Err(InTotoError::FormatError(format!(
                        "step '{}' references unknown key '{}'",
                        step.name, keyid
                    )));
                }
            }
            if step.threshold == 0 {
                return Err(InTotoError::FormatError(format!(
                    "step '{}' has a threshold of 0",
                    step.name
                )));
            }
            if step.threshold > step.pubkeys.len() {
                return Err(InTotoError::FormatError(format!(
                    "step '{}' threshold {} exceeds its {} authorized keys",
                    step.name,
                    step.threshold,
                    step.pubkeys.len()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::key::KeyVal;

    fn layout() -> Layout {
        Layout {
            type_: layout_type_tag(),
            expires: "2099-01-01T00:00:00Z".to_string(),
            readme: String::new(),
            keys: HashMap::new(),
            steps: Vec::new(),
            inspect: Vec::new(),
        }
    }

    #[test]
    fn rejects_past_expiry() {
        let l = Layout {
            expires: "2000-01-01T00:00:00Z".to_string(),
            ..layout()
        };
        assert!(l.check_expiry(Utc::now()).is_err());
    }

    #[test]
    fn rejects_unparseable_expiry() {
        let l = Layout {
            expires: "not-a-date".to_string(),
            ..layout()
        };
        assert!(l.is_expired(Utc::now()).is_err());
    }

    #[test]
    fn rejects_step_inspection_name_collision() {
        let mut l = layout();
        l.steps.push(Step::new("build"));
        l.inspect.push(Inspection::new("build"));
        assert!(l.validate().is_err());
    }

    #[test]
    fn rejects_step_key_not_in_keys_map() {
        let mut l = layout();
        let mut step = Step::new("build");
        step.pubkeys.push("unknownkeyid".to_string());
        l.steps.push(step);
        assert!(l.validate().is_err());
    }

    #[test]
    fn accepts_step_key_resolved_via_subkey() {
        let mut l = layout();
        let mut master = PublicKey {
            keyid: "master".to_string(),
            keytype: "rsa".to_string(),
            scheme: "rsassa-pss-sha256".to_string(),
            keyval: KeyVal {
                public: "x".to_string(),
                private: None,
                certificate: None,
            },
            subkeys: HashMap::new(),
            keyid_hash_algorithms: None,
        };
        master.subkeys.insert("sub".to_string(), master.clone());
        l.keys.insert("master".to_string(), master);

        let mut step = Step::new("build");
        step.pubkeys.push("sub".to_string());
        l.steps.push(step);
        assert!(l.validate().is_ok());
    }
}
