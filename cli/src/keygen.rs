//! `in-toto keygen` (spec §4.2): generate a fresh signing keypair and write
//! it to `<name>` (private) and `<name>.pub` (public), grounded on
//! `original_source/in_toto/keylib.py::generate_and_write_*_keypair`.

use {
    crate::{keys::save_key_pair, prelude::*},
    in_toto::crypto::keyid_of_public_key,
    in_toto::model::{KeyVal, PublicKey},
    rand::rngs::OsRng,
    std::collections::HashMap,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum KeyType {
    Ed25519,
    Rsa,
    Ecdsa,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum Curve {
    P256,
    P384,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct KeygenCommand {
    /// Base path for the generated keypair; writes `<name>` (private) and
    /// `<name>.pub` (public).
    name: PathBuf,

    #[arg(long, value_enum, default_value = "ed25519")]
    keytype: KeyType,

    /// Curve to use for `--keytype ecdsa`.
    #[arg(long, value_enum, default_value = "p256")]
    curve: Curve,

    /// Modulus size in bits for `--keytype rsa`.
    #[arg(long, default_value_t = 3072)]
    rsa_bits: usize,
}

pub(crate) fn handle(cmd: KeygenCommand) -> AnyResult<(), CliError> {
    let key = match cmd.keytype {
        KeyType::Ed25519 => generate_ed25519(),
        KeyType::Rsa => generate_rsa(cmd.rsa_bits),
        KeyType::Ecdsa => generate_ecdsa(cmd.curve),
    }?;

    save_key_pair(&cmd.name, &key)?;

    println!(
        "{check} wrote {priv_path} and {pub_path}",
        check = "✔".green().bold(),
        priv_path = cmd.name.display(),
        pub_path = cmd.name.with_extension("pub").display(),
    );

    Ok(())
}

fn generate_ed25519() -> AnyResult<PublicKey> {
    let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
    let public_hex = hex::encode(signing_key.verifying_key().to_bytes());
    let private_hex = hex::encode(signing_key.to_bytes());
    let keyid = keyid_of_public_key("ed25519", "ed25519", &public_hex);

    Ok(PublicKey {
        keyid,
        keytype: "ed25519".to_string(),
        scheme: "ed25519".to_string(),
        keyval: KeyVal {
            public: public_hex,
            private: Some(private_hex),
            certificate: None,
        },
        subkeys: HashMap::new(),
        keyid_hash_algorithms: None,
    })
}

fn generate_rsa(bits: usize) -> AnyResult<PublicKey> {
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey};

    let private_key = rsa::RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| anyhow!("failed to generate RSA key: {e}"))?;
    let public_key = private_key.to_public_key();

    let private_pem = private_key
        .to_pkcs8_pem(Default::default())
        .map_err(|e| anyhow!("failed to encode RSA private key: {e}"))?
        .to_string();
    let public_pem = public_key
        .to_public_key_pem(Default::default())
        .map_err(|e| anyhow!("failed to encode RSA public key: {e}"))?;

    let scheme = "rsassa-pss-sha256";
    let keyid = keyid_of_public_key("rsa", scheme, &public_pem);

    Ok(PublicKey {
        keyid,
        keytype: "rsa".to_string(),
        scheme: scheme.to_string(),
        keyval: KeyVal {
            public: public_pem,
            private: Some(private_pem),
            certificate: None,
        },
        subkeys: HashMap::new(),
        keyid_hash_algorithms: None,
    })
}

fn generate_ecdsa(curve: Curve) -> AnyResult<PublicKey> {
    use ecdsa::elliptic_curve::pkcs8::{EncodePrivateKey, EncodePublicKey};
    use in_toto::crypto::ecdsa_adapter::EcdsaCurve;

    let (private_pem, public_pem, scheme) = match curve {
        Curve::P256 => {
            let signing_key = p256::ecdsa::SigningKey::random(&mut OsRng);
            let private_pem = signing_key
                .to_pkcs8_pem(Default::default())
                .map_err(|e| anyhow!("failed to encode P-256 private key: {e}"))?
                .to_string();
            let public_pem = signing_key
                .verifying_key()
                .to_public_key_pem(Default::default())
                .map_err(|e| anyhow!("failed to encode P-256 public key: {e}"))?;
            (private_pem, public_pem, EcdsaCurve::P256.scheme_name())
        }
        Curve::P384 => {
            let signing_key = p384::ecdsa::SigningKey::random(&mut OsRng);
            let private_pem = signing_key
                .to_pkcs8_pem(Default::default())
                .map_err(|e| anyhow!("failed to encode P-384 private key: {e}"))?
                .to_string();
            let public_pem = signing_key
                .verifying_key()
                .to_public_key_pem(Default::default())
                .map_err(|e| anyhow!("failed to encode P-384 public key: {e}"))?;
            (private_pem, public_pem, EcdsaCurve::P384.scheme_name())
        }
    };

    let keyid = keyid_of_public_key("ecdsa", scheme, &public_pem);

    Ok(PublicKey {
        keyid,
        keytype: "ecdsa".to_string(),
        scheme: scheme.to_string(),
        keyval: KeyVal {
            public: public_pem,
            private: Some(private_pem),
            certificate: None,
        },
        subkeys: HashMap::new(),
        keyid_hash_algorithms: None,
    })
}
