//! RSA signer/verifier adapter (spec §4.2): PKCS#1 v1.5 or PSS over SHA-256,
//! built on the RustCrypto `rsa` crate.

use rsa::{
    pkcs1v15::{SigningKey as Pkcs1SigningKey, VerifyingKey as Pkcs1VerifyingKey},
    pss::{BlindedSigningKey as PssSigningKey, VerifyingKey as PssVerifyingKey},
    sha2::Sha256,
    signature::{RandomizedSigner, SignatureEncoding, Verifier as _},
    pkcs8::{DecodePrivateKey, DecodePublicKey},
    RsaPrivateKey, RsaPublicKey,
};

use super::{SignatureRecord, Signer, VerifyError, Verifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaScheme {
    Pkcs1v15Sha256,
    PssSha256,
}

impl RsaScheme {
    pub fn from_scheme_name(scheme: &str) -> Result<Self, VerifyError> {
        match scheme {
            "rsassa-pss-sha256" => Ok(RsaScheme::PssSha256),
            "rsassa-pkcs1v15-sha256" => Ok(RsaScheme::Pkcs1v15Sha256),
            other => Err(VerifyError::Unsupported("rsa".into(), other.into())),
        }
    }
}

pub struct RsaSigner {
    key: RsaPrivateKey,
    scheme: RsaScheme,
    keyid: String,
}

impl RsaSigner {
    pub fn from_pkcs8_pem(scheme: RsaScheme, keyid: String, pem: &str) -> Result<Self, VerifyError> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| VerifyError::Malformed(format!("invalid RSA private key: {e}")))?;
        Ok(Self { key, scheme, keyid })
    }
}

impl Signer for RsaSigner {
    fn sign(&self, payload: &[u8]) -> Result<SignatureRecord, VerifyError> {
        let mut rng = rand::rngs::OsRng;
        let sig_bytes = match self.scheme {
            RsaScheme::Pkcs1v15Sha256 => {
                let signing_key = Pkcs1SigningKey::<Sha256>::new(self.key.clone());
                signing_key.sign_with_rng(&mut rng, payload).to_vec()
            }
            RsaScheme::PssSha256 => {
                let signing_key = PssSigningKey::<Sha256>::new(self.key.clone());
                signing_key.sign_with_rng(&mut rng, payload).to_vec()
            }
        };
        Ok(SignatureRecord {
            keyid: self.keyid.clone(),
            sig: hex::encode(sig_bytes),
            other_headers: None,
        })
    }

    fn keyid(&self) -> String {
        self.keyid.clone()
    }
}

pub struct RsaVerifier {
    key: RsaPublicKey,
    scheme: RsaScheme,
}

impl RsaVerifier {
    pub fn from_public_key_pem(scheme: RsaScheme, pem: &str) -> Result<Self, VerifyError> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| VerifyError::Malformed(format!("invalid RSA public key: {e}")))?;
        Ok(Self { key, scheme })
    }
}

impl Verifier for RsaVerifier {
    fn verify(&self, sig: &SignatureRecord, payload: &[u8]) -> Result<(), VerifyError> {
        let sig_bytes = hex::decode(&sig.sig)
            .map_err(|e| VerifyError::Malformed(format!("invalid signature hex: {e}")))?;

        match self.scheme {
            RsaScheme::Pkcs1v15Sha256 => {
                let verifying_key = Pkcs1VerifyingKey::<Sha256>::new(self.key.clone());
                let signature = rsa::pkcs1v15::Signature::try_from(sig_bytes.as_slice())
                    .map_err(|e| VerifyError::Malformed(format!("invalid signature: {e}")))?;
                verifying_key
                    .verify(payload, &signature)
                    .map_err(|_| VerifyError::BadSignature)
            }
            RsaScheme::PssSha256 => {
                let verifying_key = PssVerifyingKey::<Sha256>::new(self.key.clone());
                let signature = rsa::pss::Signature::try_from(sig_bytes.as_slice())
                    .map_err(|e| VerifyError::Malformed(format!("invalid signature: {e}")))?;
                verifying_key
                    .verify(payload, &signature)
                    .map_err(|_| VerifyError::BadSignature)
            }
        }
    }
}
