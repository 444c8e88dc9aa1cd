//! Signer/Verifier adapters (spec §4.2).
//!
//! The core depends only on the adapter interface below. Four concrete
//! families are recognized: Ed25519, ECDSA (P-256/P-384), RSA (PKCS#1 v1.5
//! or PSS over SHA-256), and PGP, where verification additionally consults
//! `other_headers` (the hex-encoded OpenPGP signature trailer) because the
//! bytes actually signed are `payload || other_headers || 0x04 0xff ||
//! be32(len(other_headers))`.
//!
//! Each family lives in its own module and is feature-gated independently
//! (`rsa-signer`, `ecdsa-signer`, `pgp-signer`) except Ed25519, which has no
//! heavy optional backend and is always available.

pub mod ed25519;

#[cfg(feature = "ecdsa-signer")]
pub mod ecdsa_adapter;

#[cfg(feature = "rsa-signer")]
pub mod rsa_adapter;

#[cfg(feature = "pgp-signer")]
pub mod pgp;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A signature record as it appears in a signed container's `signatures`
/// array (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureRecord {
    pub keyid: String,
    pub sig: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_headers: Option<String>,
}

/// Reasons a verification attempt can fail, distinct from "not even
/// attempted" (e.g. unknown keytype).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum VerifyError {
    #[error("signature does not verify against the supplied key")]
    BadSignature,
    #[error("key '{0}' has expired")]
    KeyExpired(String),
    #[error("unsupported keytype/scheme combination: {0}/{1}")]
    Unsupported(String, String),
    #[error("malformed key or signature material: {0}")]
    Malformed(String),
}

/// Uniform signer interface: produce a signature record over raw payload
/// bytes (spec §4.2). `other_headers` is populated only by the PGP family.
pub trait Signer {
    fn sign(&self, payload: &[u8]) -> Result<SignatureRecord, VerifyError>;
    fn keyid(&self) -> String;
}

/// Uniform verifier interface: check a signature record against a public
/// key and the signed payload bytes.
pub trait Verifier {
    fn verify(&self, sig: &SignatureRecord, payload: &[u8]) -> Result<(), VerifyError>;
}

/// Dispatch to the concrete adapter named by `keytype`/`scheme` and verify
/// `sig` over `payload` against `keyval_public` (spec §4.2). Each adapter's
/// key material format follows its own convention: Ed25519 and RSA/ECDSA
/// keys are PEM, PGP keys are armored certs.
pub fn verify_signature(
    keytype: &str,
    scheme: &str,
    keyval_public: &str,
    sig: &SignatureRecord,
    payload: &[u8],
) -> Result<(), VerifyError> {
    match keytype {
        "ed25519" => {
            let verifier = ed25519::Ed25519Verifier::from_keyval_public_hex(keyval_public)?;
            verifier.verify(sig, payload)
        }
        #[cfg(feature = "rsa-signer")]
        "rsa" => {
            let rsa_scheme = rsa_adapter::RsaScheme::from_scheme_name(scheme)?;
            let verifier = rsa_adapter::RsaVerifier::from_public_key_pem(rsa_scheme, keyval_public)?;
            verifier.verify(sig, payload)
        }
        #[cfg(feature = "ecdsa-signer")]
        "ecdsa" => {
            let curve = ecdsa_adapter::EcdsaCurve::from_scheme_name(scheme)?;
            let verifier = ecdsa_adapter::EcdsaVerifier::from_pkcs8_pem(curve, keyval_public)?;
            verifier.verify(sig, payload)
        }
        #[cfg(feature = "pgp-signer")]
        "pgp" | "gpg" => {
            let verifier = pgp::PgpVerifier::from_armored_public_key(keyval_public.as_bytes())?;
            verifier.verify(sig, payload)
        }
        other => Err(VerifyError::Unsupported(other.to_string(), scheme.to_string())),
    }
}

/// Compute the canonical in-toto keyid for a public key: the lowercase hex
/// SHA-256 digest of the canonical encoding of its `keytype`/`scheme`/
/// `keyval` fields, matching `securesystemslib`'s key id derivation.
pub fn keyid_of_public_key(keytype: &str, scheme: &str, keyval_public: &str) -> String {
    use sha2::{Digest, Sha256};

    let value = serde_json::json!({
        "keytype": keytype,
        "scheme": scheme,
        "keyval": {"public": keyval_public},
    });
    let bytes = crate::canonical::canonicalize(&value).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    hex::encode(digest)
}
