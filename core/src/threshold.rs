//! Threshold checker (spec §4.7/§4.8): selects the candidate link files for
//! a step that are both authorized and validly signed, then enforces that
//! every link retained for a `threshold > 1` step agrees on materials and
//! products. Deliberately payload-agnostic: it only ever looks at a
//! candidate's claimed keyid and signable bytes, so the same selection
//! logic covers both ordinary link slots and sublayout slots (spec §4.9:
//! the container wrapping a nested layout is threshold-checked exactly like
//! any other link, before anyone looks at what is inside it).

use std::collections::HashMap;

use crate::crypto::{verify_signature, SignatureRecord};
use crate::error::{InTotoError, Result};
use crate::model::{Layout, Link, PublicKey, Step};

/// One candidate signature found on a link file named after this step,
/// together with the exact bytes it was computed over.
pub struct Candidate<'a> {
    pub sig: &'a SignatureRecord,
    pub signable_bytes: &'a [u8],
}

/// Build the `subkey keyid -> master keyid` reverse map from a layout's
/// top-level keys (spec §4.7 step 1).
fn subkey_to_master(layout: &Layout) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for master in layout.keys.values() {
        for subkey_id in master.subkeys.keys() {
            map.insert(subkey_id.clone(), master.keyid.clone());
        }
    }
    map
}

/// Resolve `keyid` to the layout key whose `keyval` must be used for
/// verification, and the master keyid that should be credited for dedup
/// (spec §4.7 step 2/4): a subkey's signature verifies against its master's
/// key material and is credited to the master.
fn resolve_authorized_key<'a>(
    keyid: &str,
    step: &Step,
    layout: &'a Layout,
    subkey_to_master: &HashMap<String, String>,
) -> Option<(String, &'a PublicKey)> {
    if step.pubkeys.iter().any(|p| p == keyid) {
        if let Some(key) = layout.keys.get(keyid) {
            return Some((keyid.to_string(), key));
        }
    }

    if let Some(master_id) = subkey_to_master.get(keyid) {
        if step.pubkeys.iter().any(|p| p == master_id) {
            if let Some(key) = layout.keys.get(master_id) {
                return Some((master_id.clone(), key));
            }
        }
    }

    None
}

/// Run steps 2-6 of spec §4.7: verify each candidate's signature against
/// the authorized key it claims, dedup by master keyid, and fail if the
/// distinct-master count is below `step.threshold`. Returns, for each
/// retained master, the index into `candidates` that represents it and the
/// keyid that actually signed.
pub fn select_authorized(
    step: &Step,
    layout: &Layout,
    candidates: &[Candidate<'_>],
) -> Result<Vec<(usize, String)>> {
    let reverse = subkey_to_master(layout);
    let mut by_master: HashMap<String, (usize, String)> = HashMap::new();

    for (index, candidate) in candidates.iter().enumerate() {
        let Some((master_id, key)) =
            resolve_authorized_key(&candidate.sig.keyid, step, layout, &reverse)
        else {
            log::debug!(
                "link keyid '{}' is not authorized for step '{}', skipping",
                candidate.sig.keyid,
                step.name
            );
            continue;
        };

        match verify_signature(
            &key.keytype,
            &key.scheme,
            &key.keyval.public,
            candidate.sig,
            candidate.signable_bytes,
        ) {
            Ok(()) => {
                by_master
                    .entry(master_id)
                    .or_insert((index, candidate.sig.keyid.clone()));
            }
            Err(e) => {
                log::debug!(
                    "signature by '{}' on step '{}' did not verify: {}",
                    candidate.sig.keyid,
                    step.name,
                    e
                );
            }
        }
    }

    if by_master.len() < step.threshold {
        return Err(InTotoError::ThresholdVerificationError {
            step: step.name.clone(),
            reason: format!(
                "{} distinct-master validly-signed authorized link(s), need {}",
                by_master.len(),
                step.threshold
            ),
        });
    }

    Ok(by_master.into_values().collect())
}

/// Spec §4.8: for a step with `threshold > 1`, every retained link must
/// carry identical materials and products.
pub fn check_threshold_equality(step: &Step, links: &[(String, &Link)]) -> Result<()> {
    if step.threshold <= 1 || links.len() <= 1 {
        return Ok(());
    }

    let (first_keyid, first_link) = &links[0];
    for (keyid, link) in &links[1..] {
        if link.materials != first_link.materials || link.products != first_link.products {
            return Err(InTotoError::ThresholdVerificationError {
                step: step.name.clone(),
                reason: format!(
                    "link signed by '{first_keyid}' and link signed by '{keyid}' disagree on materials/products"
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn test_layout() -> Layout {
        Layout {
            type_: "layout".to_string(),
            expires: "2099-01-01T00:00:00Z".to_string(),
            readme: String::new(),
            keys: Map::new(),
            steps: Vec::new(),
            inspect: Vec::new(),
        }
    }

    fn test_key(keyid: &str) -> PublicKey {
        PublicKey {
            keyid: keyid.to_string(),
            keytype: "ed25519".to_string(),
            scheme: "ed25519".to_string(),
            keyval: crate::model::KeyVal {
                public: "deadbeef".to_string(),
                private: None,
                certificate: None,
            },
            subkeys: Map::new(),
            keyid_hash_algorithms: None,
        }
    }

    #[test]
    fn subkey_to_master_builds_reverse_map() {
        let mut layout = test_layout();
        let mut master = test_key("master");
        master.subkeys.insert("sub".to_string(), test_key("sub"));
        layout.keys.insert("master".to_string(), master);

        let map = subkey_to_master(&layout);
        assert_eq!(map.get("sub"), Some(&"master".to_string()));
    }

    #[test]
    fn unauthorized_keyid_yields_no_match() {
        let layout = test_layout();
        let step = Step::new("build");
        let reverse = subkey_to_master(&layout);
        assert!(resolve_authorized_key("nope", &step, &layout, &reverse).is_none());
    }

    #[test]
    fn below_threshold_fails() {
        let mut layout = test_layout();
        layout.keys.insert("k1".to_string(), test_key("k1"));
        let mut step = Step::new("build");
        step.pubkeys.push("k1".to_string());
        step.threshold = 2;

        let result = select_authorized(&step, &layout, &[]);
        assert!(matches!(result, Err(InTotoError::ThresholdVerificationError { .. })));
    }

    #[test]
    fn threshold_equality_detects_mismatch() {
        let step = Step {
            threshold: 2,
            ..Step::new("build")
        };
        let mut link_a = Link::new("build");
        link_a.products.insert(
            "a".to_string(),
            [("sha256".to_string(), "aaa".to_string())].into_iter().collect(),
        );
        let link_b = Link::new("build");

        let links = vec![("k1".to_string(), &link_a), ("k2".to_string(), &link_b)];
        assert!(check_threshold_equality(&step, &links).is_err());
    }
}
