//! Link recording (spec §4.5): one-shot `in_toto_run`-style recording and
//! the two-phase `record_start`/`record_stop` variant, grounded on
//! `original_source/in_toto/runlib.py`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;

use crate::crypto::Signer;
use crate::error::{InTotoError, Result};
use crate::model::container::{Payload, SignedContainer};
use crate::model::{Byproducts, Link, PublicKey};
use crate::resolver::{self, ResolverOptions};

/// The finished link's on-disk filename: `<step>.<keyid[:8]>.link` (spec §6).
pub fn link_filename(step_name: &str, keyid: &str) -> String {
    format!("{step_name}.{}.link", &keyid_prefix(keyid))
}

/// The unfinished link's on-disk filename:
/// `.<step>.<keyid[:8]>.link-unfinished` (spec §6).
pub fn unfinished_filename(step_name: &str, keyid: &str) -> String {
    format!(".{step_name}.{}.link-unfinished", &keyid_prefix(keyid))
}

fn keyid_prefix(keyid: &str) -> String {
    keyid.chars().take(8).collect()
}

fn default_environment(cwd: &Path) -> HashMap<String, Value> {
    let mut env = HashMap::new();
    env.insert(
        "workdir".to_string(),
        Value::String(cwd.to_string_lossy().into_owned()),
    );
    env
}

/// One-shot recording (spec §4.5, `runlib.py::in_toto_run`): resolve
/// materials, optionally run `command`, resolve products, sign, and return
/// the container ready to be written by the caller.
pub fn record_run(
    step_name: &str,
    material_uris: &[String],
    product_uris: &[String],
    command: &[String],
    signer: &dyn Signer,
    resolver_opts: &ResolverOptions,
    timeout: Option<Duration>,
    use_dsse: bool,
    record_environment: bool,
) -> Result<SignedContainer> {
    let materials = resolver::resolve_all(material_uris, resolver_opts)?;

    let byproducts = if command.is_empty() {
        Byproducts::default()
    } else {
        let cwd = std::env::current_dir().map_err(|e| InTotoError::Io {
            path: PathBuf::from("."),
            source: e,
        })?;
        let result = crate::process::execute(command, Some(&cwd), timeout, true)?;
        Byproducts {
            stdout: result.stdout,
            stderr: result.stderr,
            return_value: result.return_value,
        }
    };

    let products = resolver::resolve_all(product_uris, resolver_opts)?;

    let mut link = Link::new(step_name.to_string());
    link.materials = materials.into_iter().collect();
    link.products = products.into_iter().collect();
    link.command = command.to_vec();
    link.byproducts = byproducts;
    if record_environment {
        let cwd = std::env::current_dir().unwrap_or_default();
        link.environment = default_environment(&cwd);
    }

    sign_link(link, signer, use_dsse)
}

fn sign_link(link: Link, signer: &dyn Signer, use_dsse: bool) -> Result<SignedContainer> {
    let mut container = if use_dsse {
        SignedContainer::new_dsse(Payload::Link(link))
    } else {
        SignedContainer::new_classic(Payload::Link(link))
    };
    let bytes = container.signable_bytes()?;
    let sig = signer
        .sign(&bytes)
        .map_err(|e| InTotoError::FormatError(format!("signing failed: {e}")))?;
    container.add_signature(sig);
    Ok(container)
}

/// Phase one of two-phase recording (spec §4.5): materials only, written to
/// the unfinished filename by the caller.
pub fn record_start(
    step_name: &str,
    material_uris: &[String],
    signer: &dyn Signer,
    resolver_opts: &ResolverOptions,
    use_dsse: bool,
) -> Result<SignedContainer> {
    let materials = resolver::resolve_all(material_uris, resolver_opts)?;
    let mut link = Link::new(step_name.to_string());
    link.materials = materials.into_iter().collect();
    sign_link(link, signer, use_dsse)
}

/// Phase two (spec §4.5): load the unfinished container the caller read
/// from disk, cryptographically verify it was signed by `verification_key`
/// (the public counterpart of `signer`), append
/// products/command/byproducts/environment, and re-sign.
pub fn record_stop(
    unfinished: SignedContainer,
    product_uris: &[String],
    command: &[String],
    signer: &dyn Signer,
    verification_key: &PublicKey,
    resolver_opts: &ResolverOptions,
    timeout: Option<Duration>,
    record_environment: bool,
) -> Result<SignedContainer> {
    let expected_keyid = signer.keyid();
    let sig = unfinished
        .signatures
        .iter()
        .find(|s| s.keyid == expected_keyid)
        .cloned()
        .ok_or_else(|| {
            InTotoError::FormatError(format!(
                "unfinished link was not signed by keyid '{expected_keyid}'"
            ))
        })?;

    let signable_bytes = unfinished.signable_bytes()?;
    crate::crypto::verify_signature(
        &verification_key.keytype,
        &verification_key.scheme,
        &verification_key.keyval.public,
        &sig,
        &signable_bytes,
    )
    .map_err(|e| {
        InTotoError::FormatError(format!("unfinished link signature verification failed: {e}"))
    })?;

    let Payload::Link(mut link) = unfinished.payload else {
        return Err(InTotoError::FormatError(
            "unfinished link file does not contain a link payload".into(),
        ));
    };

    let byproducts = if command.is_empty() {
        Byproducts::default()
    } else {
        let cwd = std::env::current_dir().map_err(|e| InTotoError::Io {
            path: PathBuf::from("."),
            source: e,
        })?;
        let result = crate::process::execute(command, Some(&cwd), timeout, true)?;
        Byproducts {
            stdout: result.stdout,
            stderr: result.stderr,
            return_value: result.return_value,
        }
    };

    let products = resolver::resolve_all(product_uris, resolver_opts)?;
    link.products = products.into_iter().collect();
    link.command = command.to_vec();
    link.byproducts = byproducts;
    if record_environment {
        let cwd = std::env::current_dir().unwrap_or_default();
        link.environment = default_environment(&cwd);
    }

    sign_link(link, signer, unfinished.dsse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ed25519::Ed25519Signer;
    use crate::model::key::KeyVal;
    use ed25519_dalek::SigningKey;

    fn test_signer() -> Ed25519Signer {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Ed25519Signer::new(signing_key, "deadbeefcafef00d".to_string())
    }

    /// A signer paired with the `PublicKey` a verifier would use to check it.
    fn test_signer_and_key() -> (Ed25519Signer, PublicKey) {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        let verifying_key = signing_key.verifying_key();
        let keyid = "deadbeefcafef00d".to_string();
        let signer = Ed25519Signer::new(signing_key, keyid.clone());
        let public_key = PublicKey {
            keyid,
            keytype: "ed25519".to_string(),
            scheme: "ed25519".to_string(),
            keyval: KeyVal {
                public: hex::encode(verifying_key.to_bytes()),
                private: None,
                certificate: None,
            },
            subkeys: Default::default(),
            keyid_hash_algorithms: None,
        };
        (signer, public_key)
    }

    #[test]
    fn filenames_use_first_eight_hex_chars() {
        assert_eq!(link_filename("build", "deadbeefcafef00d"), "build.deadbeef.link");
        assert_eq!(
            unfinished_filename("build", "deadbeefcafef00d"),
            ".build.deadbeef.link-unfinished"
        );
    }

    #[test]
    fn record_run_with_no_command_signs_empty_byproducts() {
        let signer = test_signer();
        let container = record_run(
            "build",
            &[],
            &[],
            &[],
            &signer,
            &ResolverOptions::default(),
            None,
            false,
            false,
        )
        .unwrap();
        assert_eq!(container.signatures.len(), 1);
        assert_eq!(container.payload.as_link().unwrap().byproducts.return_value, 0);
    }

    #[test]
    fn record_stop_rejects_wrong_signer() {
        let (signer_a, key_a) = test_signer_and_key();
        let unfinished = record_start("build", &[], &signer_a, &ResolverOptions::default(), false).unwrap();

        let (signer_b, _key_b) = test_signer_and_key();
        let result = record_stop(
            unfinished,
            &[],
            &[],
            &signer_b,
            &key_a,
            &ResolverOptions::default(),
            None,
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn record_stop_rejects_forged_unfinished_signature() {
        let (signer, key) = test_signer_and_key();
        let mut unfinished =
            record_start("build", &[], &signer, &ResolverOptions::default(), false).unwrap();

        // Keep the keyid so it still matches, but replace the signature bytes
        // with garbage: a forged unfinished-link file with a fabricated
        // signature record must not be accepted.
        unfinished.signatures[0].sig = "00".repeat(64);

        let result = record_stop(
            unfinished,
            &[],
            &[],
            &signer,
            &key,
            &ResolverOptions::default(),
            None,
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn two_phase_round_trips_into_a_finished_link() {
        let (signer, key) = test_signer_and_key();
        let unfinished = record_start("build", &[], &signer, &ResolverOptions::default(), false).unwrap();
        let finished = record_stop(
            unfinished,
            &[],
            &["true".to_string()],
            &signer,
            &key,
            &ResolverOptions::default(),
            None,
            false,
        )
        .unwrap();
        assert_eq!(finished.payload.as_link().unwrap().command, vec!["true".to_string()]);
    }
}
