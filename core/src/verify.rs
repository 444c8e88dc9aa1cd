//! Verification driver (spec §4.11): the top-level orchestration of every
//! other module in this crate, in the exact 12-step order the spec lays
//! out.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;

use crate::config::Config;
use crate::crypto::{verify_signature, SignatureRecord};
use crate::error::{InTotoError, Result};
use crate::inspect;
use crate::model::container::{Payload, SignedContainer};
use crate::model::{Layout, Link, PublicKey, Step};
use crate::params;
use crate::recorder::link_filename;
use crate::rules::{evaluate_rules, Rule, Side, StepArtifacts};
use crate::sublayout;
use crate::threshold::{self, Candidate};

/// Bounds sublayout recursion depth (spec §9: "guard against pathological
/// inputs with a depth limit").
const MAX_SUBLAYOUT_DEPTH: usize = 32;

/// Everything a verification run needs beyond the layout container itself.
#[derive(Clone)]
pub struct VerifyOptions {
    /// Directory finished/unfinished link files are read from.
    pub link_dir: PathBuf,
    /// Parameter substitution map (spec §4.6); empty if unused.
    pub parameters: HashMap<String, String>,
    pub config: Config,
}

/// The result of a successful verification run: the final per-step and
/// per-inspection link map, plus the summary link a sublayout recursion
/// would hand back to its caller (spec §4.9 rule 4).
pub struct VerificationOutcome {
    pub links: HashMap<String, Link>,
    pub summary: Link,
}

/// Run the full driver against an already-loaded, not-yet-verified layout
/// container, trusted against exactly the keys in `trust_root`.
pub fn verify_layout(
    container: &SignedContainer,
    trust_root: &HashMap<String, PublicKey>,
    opts: &VerifyOptions,
) -> Result<VerificationOutcome> {
    verify_layout_at_depth(container, trust_root, opts, 0)
}

fn verify_layout_at_depth(
    container: &SignedContainer,
    trust_root: &HashMap<String, PublicKey>,
    opts: &VerifyOptions,
    depth: usize,
) -> Result<VerificationOutcome> {
    if depth > MAX_SUBLAYOUT_DEPTH {
        return Err(InTotoError::FormatError(
            "sublayout recursion exceeded the maximum supported depth".into(),
        ));
    }

    // Step 1: verify layout signatures against every supplied trusted key.
    verify_layout_signatures(container, trust_root)?;

    let Payload::Layout(loaded_layout) = &container.payload else {
        return Err(InTotoError::FormatError("top-level payload is not a layout".into()));
    };

    // Step 2: expiry, checked against the pre-substitution layout.
    loaded_layout.check_expiry(Utc::now())?;

    // Step 3: parameter substitution on an in-memory copy; the signed bytes
    // already verified above are the pre-substitution ones.
    let layout = if opts.parameters.is_empty() {
        loaded_layout.clone()
    } else {
        substitute_layout(loaded_layout, &opts.parameters)?
    };
    layout.validate()?;

    // Step 4: load candidate link files per step, failing early if too few
    // were even found on disk.
    let mut per_step_entries: HashMap<String, Vec<(String, SignedContainer)>> = HashMap::new();
    for step in &layout.steps {
        let mut entries = Vec::new();
        for keyid in authorized_keyids(&layout, step) {
            let path = opts.link_dir.join(link_filename(&step.name, &keyid));
            if let Some(c) = try_load_container(&path)? {
                entries.push((keyid, c));
            }
        }
        if entries.len() < step.threshold {
            return Err(InTotoError::LinkNotFoundError {
                step: step.name.clone(),
                found: entries.len(),
                threshold: step.threshold,
            });
        }
        per_step_entries.insert(step.name.clone(), entries);
    }

    // Step 5: threshold-verify signatures, then (step 6) recurse into any
    // retained slot that turns out to hold a nested layout.
    let mut final_links: HashMap<String, Link> = HashMap::new();
    for step in &layout.steps {
        let entries = per_step_entries.remove(&step.name).unwrap_or_default();
        let retained = select_and_resolve_step(&layout, step, entries, opts, depth)?;

        // Step 7: command-alignment mismatch is advisory only.
        for (keyid, link) in &retained {
            if !step.expected_command.is_empty() && link.command != step.expected_command {
                log::warn!(
                    "step '{}': link signed by '{keyid}' ran '{}', expected '{}'",
                    step.name,
                    link.command.join(" "),
                    step.expected_command.join(" ")
                );
            }
        }

        // Step 8: threshold-equality, then reduce to one representative.
        let refs: Vec<(String, &Link)> = retained.iter().map(|(k, l)| (k.clone(), l)).collect();
        threshold::check_threshold_equality(step, &refs)?;
        let (_, representative) = retained
            .into_iter()
            .next()
            .expect("threshold selection guarantees at least one retained link");
        final_links.insert(step.name.clone(), representative);
    }

    // Step 9: evaluate each step's material then product rules against the
    // reduced link map. No step rule may see inspection artifacts, since
    // none have run yet.
    for step in &layout.steps {
        let link = final_links
            .get(&step.name)
            .expect("every step has a reduced link by this point")
            .clone();
        evaluate_step_side(step, Side::Materials, &step.expected_materials, &link, &final_links)?;
        evaluate_step_side(step, Side::Products, &step.expected_products, &link, &final_links)?;
    }

    // Step 10: run inspections in declaration order, merging their links in.
    let timeout = Some(Duration::from_secs(layout_inspection_timeout(opts)));
    for inspection in &layout.inspect {
        let link = inspect::run_inspection(inspection, timeout)?;
        final_links.insert(inspection.name.clone(), link);
    }

    // Step 11: evaluate each inspection's rules against the union map.
    for inspection in &layout.inspect {
        let link = final_links
            .get(&inspection.name)
            .expect("the inspection just ran")
            .clone();
        let materials_queue: BTreeSet<String> = link.materials.keys().cloned().collect();
        evaluate_rules(
            &inspection.expected_materials,
            Side::Materials,
            &link.materials,
            &link.products,
            materials_queue,
            &|name| other_step_artifacts(&final_links, name),
        )
        .map_err(|e| rule_error_context(e, &inspection.name, "materials"))?;

        let products_queue: BTreeSet<String> = link.products.keys().cloned().collect();
        evaluate_rules(
            &inspection.expected_products,
            Side::Products,
            &link.materials,
            &link.products,
            products_queue,
            &|name| other_step_artifacts(&final_links, name),
        )
        .map_err(|e| rule_error_context(e, &inspection.name, "products"))?;
    }

    // Step 12: the summary link for whoever called us (spec §4.9 rule 4).
    let ordered_step_links: Vec<&Link> = layout
        .steps
        .iter()
        .filter_map(|s| final_links.get(&s.name))
        .collect();
    let summary = sublayout::summarize("", &layout, &ordered_step_links);

    Ok(VerificationOutcome {
        links: final_links,
        summary,
    })
}

fn layout_inspection_timeout(opts: &VerifyOptions) -> u64 {
    opts.config.link_cmd_exec_timeout
}

fn rule_error_context(err: InTotoError, _item: &str, _side: &str) -> InTotoError {
    err
}

fn evaluate_step_side(
    step: &Step,
    side: Side,
    rules: &[Rule],
    link: &Link,
    final_links: &HashMap<String, Link>,
) -> Result<()> {
    let queue: BTreeSet<String> = match side {
        Side::Materials => link.materials.keys().cloned().collect(),
        Side::Products => link.products.keys().cloned().collect(),
    };
    evaluate_rules(
        rules,
        side,
        &link.materials,
        &link.products,
        queue,
        &|name| other_step_artifacts(final_links, name),
    )
    .map(|_| ())
    .map_err(|e| rule_error_context(e, &step.name, "rules"))
}

fn other_step_artifacts<'a>(final_links: &'a HashMap<String, Link>, name: &str) -> Option<StepArtifacts<'a>> {
    final_links.get(name).map(|l| StepArtifacts {
        materials: &l.materials,
        products: &l.products,
    })
}

/// Steps 5 and 6 combined for one step: threshold-select authorized,
/// validly-signed candidates, then resolve any retained sublayout slot to
/// its summary link.
fn select_and_resolve_step(
    layout: &Layout,
    step: &Step,
    entries: Vec<(String, SignedContainer)>,
    opts: &VerifyOptions,
    depth: usize,
) -> Result<Vec<(String, Link)>> {
    let mut signable_bytes_store = Vec::with_capacity(entries.len());
    let mut sig_refs: Vec<&SignatureRecord> = Vec::new();
    let mut candidate_entry_index = Vec::new();

    for (i, (keyid, container)) in entries.iter().enumerate() {
        if let Some(sig) = container.signatures.iter().find(|s| &s.keyid == keyid) {
            signable_bytes_store.push(container.signable_bytes()?);
            sig_refs.push(sig);
            candidate_entry_index.push(i);
        }
    }

    let candidates: Vec<Candidate<'_>> = sig_refs
        .iter()
        .zip(signable_bytes_store.iter())
        .map(|(sig, bytes)| Candidate {
            sig,
            signable_bytes: bytes,
        })
        .collect();

    let selected = threshold::select_authorized(step, layout, &candidates)?;

    let mut retained = Vec::with_capacity(selected.len());
    for (candidate_index, signing_keyid) in selected {
        let entry_index = candidate_entry_index[candidate_index];
        let (_, container) = &entries[entry_index];

        let link = if sublayout::is_sublayout(&container.payload) {
            recurse_sublayout(layout, step, &signing_keyid, container, opts, depth)?
        } else {
            match &container.payload {
                Payload::Link(link) => link.clone(),
                Payload::Layout(_) => unreachable!("handled above"),
            }
        };
        retained.push((signing_keyid, link));
    }

    Ok(retained)
}

fn recurse_sublayout(
    outer_layout: &Layout,
    step: &Step,
    keyid: &str,
    container: &SignedContainer,
    opts: &VerifyOptions,
    depth: usize,
) -> Result<Link> {
    let trust = sublayout::sublayout_verification_keys(outer_layout, keyid);
    let link_dir = opts.link_dir.join(sublayout::sublayout_link_dir(&step.name, keyid));
    let sub_opts = VerifyOptions {
        link_dir,
        parameters: opts.parameters.clone(),
        config: opts.config.clone(),
    };
    let outcome = verify_layout_at_depth(container, &trust, &sub_opts, depth + 1)?;
    let mut summary = outcome.summary;
    summary.name = step.name.clone();
    Ok(summary)
}

fn authorized_keyids(layout: &Layout, step: &Step) -> Vec<String> {
    let mut ids = Vec::new();
    for pubkey in &step.pubkeys {
        ids.push(pubkey.clone());
        if let Some(key) = layout.keys.get(pubkey) {
            ids.extend(key.subkeys.keys().cloned());
        }
    }
    ids
}

fn try_load_container(path: &Path) -> Result<Option<SignedContainer>> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let value: serde_json::Value = serde_json::from_slice(&bytes)?;
            Ok(Some(SignedContainer::from_value(value)?))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(InTotoError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Spec §4.11 step 1: at least one key must be supplied, and every
/// supplied key must check a signature on the layout.
fn verify_layout_signatures(
    container: &SignedContainer,
    trust_root: &HashMap<String, PublicKey>,
) -> Result<()> {
    if trust_root.is_empty() {
        return Err(InTotoError::SignatureVerificationError);
    }

    let bytes = container.signable_bytes()?;
    for key in trust_root.values() {
        let sig = container
            .signatures
            .iter()
            .find(|s| s.keyid == key.keyid)
            .ok_or(InTotoError::SignatureVerificationError)?;
        verify_signature(&key.keytype, &key.scheme, &key.keyval.public, sig, &bytes)
            .map_err(|_| InTotoError::SignatureVerificationError)?;
    }
    Ok(())
}

/// Spec §4.6: apply `{NAME}` substitution to every step's
/// `expected_command` and rule tokens, and every inspection's `run` and
/// rule tokens.
fn substitute_layout(layout: &Layout, params: &HashMap<String, String>) -> Result<Layout> {
    let mut out = layout.clone();
    for step in out.steps.iter_mut() {
        step.expected_command = params::substitute_all(&step.expected_command, params)?;
        step.expected_materials = substitute_rules(&step.expected_materials, params)?;
        step.expected_products = substitute_rules(&step.expected_products, params)?;
    }
    for inspection in out.inspect.iter_mut() {
        inspection.run = params::substitute_all(&inspection.run, params)?;
        inspection.expected_materials = substitute_rules(&inspection.expected_materials, params)?;
        inspection.expected_products = substitute_rules(&inspection.expected_products, params)?;
    }
    Ok(out)
}

fn substitute_rules(rules: &[Rule], params: &HashMap<String, String>) -> Result<Vec<Rule>> {
    rules
        .iter()
        .map(|rule| {
            let tokens = params::substitute_all(&rule.to_tokens(), params)?;
            crate::rules::parse_rule(&tokens)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ed25519::Ed25519Signer;
    use crate::crypto::{keyid_of_public_key, Signer};
    use crate::model::{Byproducts, KeyVal};
    use ed25519_dalek::SigningKey;

    fn signer_and_key() -> (Ed25519Signer, PublicKey) {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        let public_hex = hex::encode(signing_key.verifying_key().to_bytes());
        let keyid = keyid_of_public_key("ed25519", "ed25519", &public_hex);
        let signer = Ed25519Signer::new(signing_key, keyid.clone());
        let key = PublicKey {
            keyid,
            keytype: "ed25519".to_string(),
            scheme: "ed25519".to_string(),
            keyval: KeyVal {
                public: public_hex,
                private: None,
                certificate: None,
            },
            subkeys: HashMap::new(),
            keyid_hash_algorithms: None,
        };
        (signer, key)
    }

    fn signed_layout_container(layout: Layout, signer: &Ed25519Signer) -> SignedContainer {
        let mut container = SignedContainer::new_classic(Payload::Layout(layout));
        let bytes = container.signable_bytes().unwrap();
        let sig = signer.sign(&bytes).unwrap();
        container.add_signature(sig);
        container
    }

    fn empty_layout(expires: &str) -> Layout {
        Layout {
            type_: "layout".to_string(),
            expires: expires.to_string(),
            readme: String::new(),
            keys: HashMap::new(),
            steps: Vec::new(),
            inspect: Vec::new(),
        }
    }

    #[test]
    fn rejects_verification_with_no_trusted_keys() {
        let (signer, _key) = signer_and_key();
        let layout = empty_layout("2099-01-01T00:00:00Z");
        let container = signed_layout_container(layout, &signer);

        let dir = tempfile::tempdir().unwrap();
        let opts = VerifyOptions {
            link_dir: dir.path().to_path_buf(),
            parameters: HashMap::new(),
            config: Config::default(),
        };

        let result = verify_layout(&container, &HashMap::new(), &opts);
        assert!(matches!(result, Err(InTotoError::SignatureVerificationError)));
    }

    #[test]
    fn verifies_a_layout_with_no_steps() {
        let (signer, key) = signer_and_key();
        let layout = empty_layout("2099-01-01T00:00:00Z");
        let container = signed_layout_container(layout, &signer);

        let mut trust = HashMap::new();
        trust.insert(key.keyid.clone(), key);

        let dir = tempfile::tempdir().unwrap();
        let opts = VerifyOptions {
            link_dir: dir.path().to_path_buf(),
            parameters: HashMap::new(),
            config: Config::default(),
        };

        let outcome = verify_layout(&container, &trust, &opts).unwrap();
        assert!(outcome.links.is_empty());
    }

    #[test]
    fn rejects_expired_layout() {
        let (signer, key) = signer_and_key();
        let layout = empty_layout("2000-01-01T00:00:00Z");
        let container = signed_layout_container(layout, &signer);

        let mut trust = HashMap::new();
        trust.insert(key.keyid.clone(), key);

        let dir = tempfile::tempdir().unwrap();
        let opts = VerifyOptions {
            link_dir: dir.path().to_path_buf(),
            parameters: HashMap::new(),
            config: Config::default(),
        };

        let result = verify_layout(&container, &trust, &opts);
        assert!(matches!(result, Err(InTotoError::LayoutExpiredError { .. })));
    }

    #[test]
    fn full_single_step_layout_verifies_end_to_end() {
        let (layout_signer, layout_key) = signer_and_key();
        let (step_signer, step_key) = signer_and_key();

        let mut layout = empty_layout("2099-01-01T00:00:00Z");
        layout.keys.insert(step_key.keyid.clone(), step_key.clone());

        let mut step = Step::new("write-code");
        step.pubkeys.push(step_key.keyid.clone());
        step.threshold = 1;
        layout.steps.push(step);

        let container = signed_layout_container(layout, &layout_signer);
        let mut trust = HashMap::new();
        trust.insert(layout_key.keyid.clone(), layout_key);

        let dir = tempfile::tempdir().unwrap();

        let link = Link {
            type_: "link".to_string(),
            name: "write-code".to_string(),
            materials: HashMap::new(),
            products: HashMap::new(),
            command: Vec::new(),
            byproducts: Byproducts::default(),
            environment: HashMap::new(),
        };
        let mut link_container = SignedContainer::new_classic(Payload::Link(link));
        let bytes = link_container.signable_bytes().unwrap();
        let sig = step_signer.sign(&bytes).unwrap();
        link_container.add_signature(sig);

        let filename = link_filename("write-code", &step_signer.keyid());
        std::fs::write(
            dir.path().join(filename),
            serde_json::to_vec(&link_container.to_value().unwrap()).unwrap(),
        )
        .unwrap();

        let opts = VerifyOptions {
            link_dir: dir.path().to_path_buf(),
            parameters: HashMap::new(),
            config: Config::default(),
        };

        let outcome = verify_layout(&container, &trust, &opts).unwrap();
        assert!(outcome.links.contains_key("write-code"));
    }
}
