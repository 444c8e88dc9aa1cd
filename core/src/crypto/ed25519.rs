//! Ed25519 signer/verifier adapter.
//!
//! Key parsing follows the same permissive hex/base64 acceptance the
//! project's signed-HTTP module already used for Ed25519 message-signing
//! keys, since in-toto public/private key material is exchanged the same
//! way: opaque strings in a JSON `keyval` field.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};

use super::{SignatureRecord, Signer, VerifyError, Verifier};

pub struct Ed25519Signer {
    signing_key: SigningKey,
    keyid: String,
}

impl Ed25519Signer {
    pub fn new(signing_key: SigningKey, keyid: String) -> Self {
        Self { signing_key, keyid }
    }

    pub fn from_keyval_private_hex(keyid: String, hex_sk: &str) -> Result<Self, VerifyError> {
        let bytes = hex::decode(hex_sk)
            .map_err(|e| VerifyError::Malformed(format!("invalid ed25519 private key hex: {e}")))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VerifyError::Malformed("ed25519 private key must be 32 bytes".into()))?;
        Ok(Self::new(SigningKey::from_bytes(&arr), keyid))
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, payload: &[u8]) -> Result<SignatureRecord, VerifyError> {
        let sig: Signature = self.signing_key.sign(payload);
        Ok(SignatureRecord {
            keyid: self.keyid.clone(),
            sig: hex::encode(sig.to_bytes()),
            other_headers: None,
        })
    }

    fn keyid(&self) -> String {
        self.keyid.clone()
    }
}

pub struct Ed25519Verifier {
    verifying_key: VerifyingKey,
}

impl Ed25519Verifier {
    pub fn new(verifying_key: VerifyingKey) -> Self {
        Self { verifying_key }
    }

    pub fn from_keyval_public_hex(hex_pk: &str) -> Result<Self, VerifyError> {
        let bytes = hex::decode(hex_pk)
            .map_err(|e| VerifyError::Malformed(format!("invalid ed25519 public key hex: {e}")))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VerifyError::Malformed("ed25519 public key must be 32 bytes".into()))?;
        let verifying_key = VerifyingKey::from_bytes(&arr)
            .map_err(|e| VerifyError::Malformed(format!("invalid ed25519 public key: {e}")))?;
        Ok(Self::new(verifying_key))
    }
}

impl Verifier for Ed25519Verifier {
    fn verify(&self, sig: &SignatureRecord, payload: &[u8]) -> Result<(), VerifyError> {
        let sig_bytes = hex::decode(&sig.sig)
            .map_err(|e| VerifyError::Malformed(format!("invalid signature hex: {e}")))?;
        let sig_arr: [u8; 64] = sig_bytes
            .try_into()
            .map_err(|_| VerifyError::Malformed("ed25519 signature must be 64 bytes".into()))?;
        let signature = Signature::from_bytes(&sig_arr);
        self.verifying_key
            .verify(payload, &signature)
            .map_err(|_| VerifyError::BadSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn sign_then_verify_roundtrip() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let verifying_key = signing_key.verifying_key();

        let signer = Ed25519Signer::new(signing_key, "deadbeef".into());
        let sig = signer.sign(b"payload bytes").unwrap();

        let verifier = Ed25519Verifier::new(verifying_key);
        assert!(verifier.verify(&sig, b"payload bytes").is_ok());
        assert_eq!(
            verifier.verify(&sig, b"other bytes"),
            Err(VerifyError::BadSignature)
        );
    }
}
