//! ECDSA signer/verifier adapter over P-256 and P-384 (spec §4.2), built on
//! the RustCrypto `p256`/`p384`/`ecdsa` crates, signing over SHA-256.

use ecdsa::signature::{Signer as _, Verifier as _};

use super::{SignatureRecord, Signer, VerifyError, Verifier};

/// Which NIST curve a key uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcdsaCurve {
    P256,
    P384,
}

impl EcdsaCurve {
    pub fn scheme_name(self) -> &'static str {
        match self {
            EcdsaCurve::P256 => "ecdsa-sha2-nistp256",
            EcdsaCurve::P384 => "ecdsa-sha2-nistp384",
        }
    }

    pub fn from_scheme_name(scheme: &str) -> Result<Self, VerifyError> {
        match scheme {
            "ecdsa-sha2-nistp256" => Ok(EcdsaCurve::P256),
            "ecdsa-sha2-nistp384" => Ok(EcdsaCurve::P384),
            other => Err(VerifyError::Unsupported("ecdsa".into(), other.into())),
        }
    }
}

enum SigningKeyInner {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
}

pub struct EcdsaSigner {
    inner: SigningKeyInner,
    keyid: String,
}

impl EcdsaSigner {
    pub fn from_pkcs8_pem(curve: EcdsaCurve, keyid: String, pem: &str) -> Result<Self, VerifyError> {
        use ecdsa::elliptic_curve::pkcs8::DecodePrivateKey;

        let inner = match curve {
            EcdsaCurve::P256 => SigningKeyInner::P256(
                p256::ecdsa::SigningKey::from_pkcs8_pem(pem)
                    .map_err(|e| VerifyError::Malformed(format!("invalid P-256 private key: {e}")))?,
            ),
            EcdsaCurve::P384 => SigningKeyInner::P384(
                p384::ecdsa::SigningKey::from_pkcs8_pem(pem)
                    .map_err(|e| VerifyError::Malformed(format!("invalid P-384 private key: {e}")))?,
            ),
        };
        Ok(Self { inner, keyid })
    }
}

impl Signer for EcdsaSigner {
    fn sign(&self, payload: &[u8]) -> Result<SignatureRecord, VerifyError> {
        let der = match &self.inner {
            SigningKeyInner::P256(sk) => {
                let sig: p256::ecdsa::Signature = sk.sign(payload);
                sig.to_der().as_bytes().to_vec()
            }
            SigningKeyInner::P384(sk) => {
                let sig: p384::ecdsa::Signature = sk.sign(payload);
                sig.to_der().as_bytes().to_vec()
            }
        };
        Ok(SignatureRecord {
            keyid: self.keyid.clone(),
            sig: hex::encode(der),
            other_headers: None,
        })
    }

    fn keyid(&self) -> String {
        self.keyid.clone()
    }
}

enum VerifyingKeyInner {
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
}

pub struct EcdsaVerifier {
    inner: VerifyingKeyInner,
}

impl EcdsaVerifier {
    pub fn from_pkcs8_pem(curve: EcdsaCurve, pem: &str) -> Result<Self, VerifyError> {
        use ecdsa::elliptic_curve::pkcs8::DecodePublicKey;

        let inner = match curve {
            EcdsaCurve::P256 => VerifyingKeyInner::P256(
                p256::ecdsa::VerifyingKey::from_public_key_pem(pem)
                    .map_err(|e| VerifyError::Malformed(format!("invalid P-256 public key: {e}")))?,
            ),
            EcdsaCurve::P384 => VerifyingKeyInner::P384(
                p384::ecdsa::VerifyingKey::from_public_key_pem(pem)
                    .map_err(|e| VerifyError::Malformed(format!("invalid P-384 public key: {e}")))?,
            ),
        };
        Ok(Self { inner })
    }
}

impl Verifier for EcdsaVerifier {
    fn verify(&self, sig: &SignatureRecord, payload: &[u8]) -> Result<(), VerifyError> {
        let der = hex::decode(&sig.sig)
            .map_err(|e| VerifyError::Malformed(format!("invalid signature hex: {e}")))?;
        match &self.inner {
            VerifyingKeyInner::P256(vk) => {
                let signature = p256::ecdsa::Signature::from_der(&der)
                    .map_err(|e| VerifyError::Malformed(format!("invalid DER signature: {e}")))?;
                vk.verify(payload, &signature)
                    .map_err(|_| VerifyError::BadSignature)
            }
            VerifyingKeyInner::P384(vk) => {
                let signature = p384::ecdsa::Signature::from_der(&der)
                    .map_err(|e| VerifyError::Malformed(format!("invalid DER signature: {e}")))?;
                vk.verify(payload, &signature)
                    .map_err(|_| VerifyError::BadSignature)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_name_roundtrips() {
        assert_eq!(
            EcdsaCurve::from_scheme_name("ecdsa-sha2-nistp256").unwrap(),
            EcdsaCurve::P256
        );
        assert!(EcdsaCurve::from_scheme_name("bogus").is_err());
    }
}
