//! Loading and saving the CLI's own on-disk key files.
//!
//! A key file is just a serialized `in_toto::model::PublicKey`: the private
//! variant carries `keyval.private`, the public variant (written alongside
//! as `<path>.pub`) has it stripped, matching the shape layouts already use
//! for their `keys` map.

use {
    crate::prelude::*,
    in_toto::crypto::{ed25519::Ed25519Signer, Signer},
    in_toto::model::PublicKey,
};

pub(crate) fn load_public_key(path: &PathBuf) -> AnyResult<PublicKey> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read key file '{}': {e}", path.display()))?;
    serde_json::from_str(&contents).map_err(|e| anyhow!("malformed key file '{}': {e}", path.display()))
}

/// Load a private key file and build the signer matching its `keytype`.
pub(crate) fn load_signer(path: &PathBuf) -> AnyResult<Box<dyn Signer>> {
    let key = load_public_key(path)?;
    let private = key
        .keyval
        .private
        .as_ref()
        .ok_or_else(|| anyhow!("key file '{}' has no private key material", path.display()))?;

    match key.keytype.as_str() {
        "ed25519" => {
            let signer = Ed25519Signer::from_keyval_private_hex(key.keyid.clone(), private)
                .map_err(|e| anyhow!("invalid ed25519 private key: {e}"))?;
            Ok(Box::new(signer))
        }
        "rsa" => {
            use in_toto::crypto::rsa_adapter::{RsaScheme, RsaSigner};
            let scheme = RsaScheme::from_scheme_name(&key.scheme)
                .map_err(|e| anyhow!("unsupported rsa scheme '{}': {e}", key.scheme))?;
            let signer = RsaSigner::from_pkcs8_pem(scheme, key.keyid.clone(), private)
                .map_err(|e| anyhow!("invalid rsa private key: {e}"))?;
            Ok(Box::new(signer))
        }
        "ecdsa" => {
            use in_toto::crypto::ecdsa_adapter::{EcdsaCurve, EcdsaSigner};
            let curve = EcdsaCurve::from_scheme_name(&key.scheme)
                .map_err(|e| anyhow!("unsupported ecdsa scheme '{}': {e}", key.scheme))?;
            let signer = EcdsaSigner::from_pkcs8_pem(curve, key.keyid.clone(), private)
                .map_err(|e| anyhow!("invalid ecdsa private key: {e}"))?;
            Ok(Box::new(signer))
        }
        other => Err(anyhow!("unsupported keytype '{other}'")),
    }
}

pub(crate) fn save_key_pair(base_path: &PathBuf, private_key: &PublicKey) -> AnyResult<()> {
    std::fs::write(base_path, serde_json::to_vec_pretty(private_key)?)?;

    let mut public_only = private_key.clone();
    public_only.keyval.private = None;
    let public_path = base_path.with_extension("pub");
    std::fs::write(&public_path, serde_json::to_vec_pretty(&public_only)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use in_toto::model::KeyVal;
    use std::collections::HashMap;

    fn ed25519_key_pair() -> PublicKey {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        let public_hex = hex::encode(signing_key.verifying_key().to_bytes());
        let private_hex = hex::encode(signing_key.to_bytes());

        PublicKey {
            keyid: in_toto::crypto::keyid_of_public_key("ed25519", "ed25519", &public_hex),
            keytype: "ed25519".to_string(),
            scheme: "ed25519".to_string(),
            keyval: KeyVal {
                public: public_hex,
                private: Some(private_hex),
                certificate: None,
            },
            subkeys: HashMap::new(),
            keyid_hash_algorithms: None,
        }
    }

    #[test]
    fn save_key_pair_strips_private_material_from_pub_file() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = dir.path().join("alice");
        let key = ed25519_key_pair();

        save_key_pair(&base_path, &key).unwrap();

        let private = load_public_key(&base_path).unwrap();
        assert_eq!(private.keyval.private, key.keyval.private);

        let public = load_public_key(&base_path.with_extension("pub")).unwrap();
        assert_eq!(public.keyval.private, None);
        assert_eq!(public.keyval.public, key.keyval.public);
    }

    #[test]
    fn load_signer_rejects_a_key_file_with_no_private_material() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = dir.path().join("alice");
        save_key_pair(&base_path, &ed25519_key_pair()).unwrap();

        let result = load_signer(&base_path.with_extension("pub"));
        assert!(result.is_err());
    }

    #[test]
    fn load_signer_builds_a_working_ed25519_signer() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = dir.path().join("alice");
        let key = ed25519_key_pair();
        save_key_pair(&base_path, &key).unwrap();

        let signer = load_signer(&base_path).unwrap();
        assert_eq!(signer.keyid(), key.keyid);
        assert!(signer.sign(b"payload").is_ok());
    }
}
