//! PGP/GPG signer/verifier adapter.
//!
//! Spec §1 explicitly scopes the OpenPGP packet parser itself out of the
//! core: "the PGP/GPG packet parser (treated as an opaque signer/verifier
//! that consumes `(keyid, homedir, payload)` and yields or checks a
//! signature)". This module is exactly that opaque collaborator, built on
//! `sequoia-openpgp` rather than shelling out to a `gpg` binary the way the
//! Python reference does — `sequoia-openpgp`'s own RFC 4880 signature
//! verification already reconstructs the v4 trailer
//! (`other_headers || 0x04 0xff || be32(len(other_headers))`) spec §4.2
//! describes, so this adapter does not re-implement that byte layout; it
//! stores the fully serialized OpenPGP signature packet as the `sig` field
//! and leaves `other_headers` unused, keeping the packet format opaque to
//! the rest of the core the way spec §1 asks for.
//!
//! A PGP public key may carry `subkeys` (spec §4.2): verification succeeds
//! if the signature's issuer keyid matches either the cert's primary key or
//! any of its signing-capable subkeys. An expired primary or subkey key
//! produces [`VerifyError::KeyExpired`] rather than a bad-signature result.

use sequoia_openpgp::{
    cert::Cert,
    crypto::KeyPair,
    packet::{signature::SignatureBuilder, Signature},
    parse::Parse,
    serialize::SerializeInto,
    types::SignatureType,
    Packet,
};

use super::{SignatureRecord, Signer, VerifyError, Verifier};

pub struct PgpSigner {
    keypair: KeyPair,
    keyid: String,
}

impl PgpSigner {
    /// Build a signer from an armored secret key and the fingerprint (hex)
    /// of the specific (sub)key that should sign, per spec §4.2: "Signing
    /// with a PGP key whose primary has a signing-capable subkey must use
    /// that subkey."
    pub fn from_armored_secret_key(armored: &[u8], keyid: String) -> Result<Self, VerifyError> {
        let cert = Cert::from_bytes(armored)
            .map_err(|e| VerifyError::Malformed(format!("invalid PGP cert: {e}")))?;

        let keyid_lower = keyid.to_lowercase();
        let policy = sequoia_openpgp::policy::StandardPolicy::new();

        let key_amalgamation = cert
            .keys()
            .secret()
            .with_policy(&policy, None)
            .for_signing()
            .find(|ka| ka.key().keyid().to_hex().to_lowercase().ends_with(&keyid_lower))
            .ok_or_else(|| VerifyError::Malformed(format!("no signing-capable key '{keyid}' in cert")))?;

        let keypair = key_amalgamation
            .key()
            .clone()
            .parts_into_secret()
            .map_err(|e| VerifyError::Malformed(format!("key has no secret material: {e}")))?
            .into_keypair()
            .map_err(|e| VerifyError::Malformed(format!("cannot build keypair: {e}")))?;

        Ok(Self {
            keypair,
            keyid: keyid_lower,
        })
    }
}

impl Signer for PgpSigner {
    fn sign(&self, payload: &[u8]) -> Result<SignatureRecord, VerifyError> {
        let mut signer = self.keypair.clone();
        let sig: Signature = SignatureBuilder::new(SignatureType::Binary)
            .sign_message(&mut signer, payload)
            .map_err(|e| VerifyError::Malformed(format!("pgp signing failed: {e}")))?;

        let packet = Packet::from(sig);
        let bytes = packet
            .to_vec()
            .map_err(|e| VerifyError::Malformed(format!("failed to serialize signature: {e}")))?;

        Ok(SignatureRecord {
            keyid: self.keyid.clone(),
            sig: hex::encode(bytes),
            other_headers: None,
        })
    }

    fn keyid(&self) -> String {
        self.keyid.clone()
    }
}

pub struct PgpVerifier {
    cert: Cert,
}

impl PgpVerifier {
    pub fn from_armored_public_key(armored: &[u8]) -> Result<Self, VerifyError> {
        let cert = Cert::from_bytes(armored)
            .map_err(|e| VerifyError::Malformed(format!("invalid PGP cert: {e}")))?;
        Ok(Self { cert })
    }

    /// True if `keyid` (hex, any length suffix of the full fingerprint)
    /// names the primary key or one of its subkeys.
    pub fn has_keyid(&self, keyid: &str) -> bool {
        let keyid_lower = keyid.to_lowercase();
        self.cert
            .keys()
            .any(|ka| ka.key().keyid().to_hex().to_lowercase().ends_with(&keyid_lower))
    }
}

impl Verifier for PgpVerifier {
    fn verify(&self, sig: &SignatureRecord, payload: &[u8]) -> Result<(), VerifyError> {
        let bytes = hex::decode(&sig.sig)
            .map_err(|e| VerifyError::Malformed(format!("invalid signature hex: {e}")))?;
        let packet = Packet::from_bytes(&bytes)
            .map_err(|e| VerifyError::Malformed(format!("invalid signature packet: {e}")))?;
        let Packet::Signature(mut signature) = packet else {
            return Err(VerifyError::Malformed("expected a signature packet".into()));
        };

        let policy = sequoia_openpgp::policy::StandardPolicy::new();
        let now = std::time::SystemTime::now();

        for key_amalgamation in self.cert.keys().with_policy(&policy, now) {
            let key = key_amalgamation.key();
            if signature.verify_message(key, payload).is_ok() {
                return Ok(());
            }
        }

        // Distinguish "expired key" from "bad signature" per spec §4.2.
        for key_amalgamation in self.cert.keys() {
            if key_amalgamation.with_policy(&policy, now).is_err() {
                let expired_id = key_amalgamation.key().keyid().to_hex();
                if signature
                    .verify_message(key_amalgamation.key(), payload)
                    .is_ok()
                {
                    return Err(VerifyError::KeyExpired(expired_id));
                }
            }
        }

        Err(VerifyError::BadSignature)
    }
}
