//! The `PublicKey` shape (spec §3/§6): `{"keyid","keytype","scheme","keyval",
//! "subkeys"?}`. `in-toto-rs` never embeds private key material in this
//! struct; loading a signer from a private key file is a `crypto` concern.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct KeyVal {
    pub public: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
}

/// A public key as it appears in a layout's `keys` map or a link's
/// signatures. May carry `subkeys` (PGP primary + signing subkeys, spec
/// §4.2); a bare RSA/ECDSA/Ed25519 key has none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicKey {
    pub keyid: String,
    pub keytype: String,
    pub scheme: String,
    pub keyval: KeyVal,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub subkeys: HashMap<String, PublicKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyid_hash_algorithms: Option<Vec<String>>,
}

impl PublicKey {
    /// True if `keyid` names this key itself or one of its subkeys, per
    /// spec §4.2's PGP master/subkey delegation rule.
    pub fn resolves(&self, keyid: &str) -> bool {
        self.keyid == keyid || self.subkeys.contains_key(keyid)
    }

    /// The master keyid that should be credited for a signature made by
    /// `keyid`, following spec §4.7's dedup-by-master-key rule: a subkey
    /// signature counts against its primary key's identity.
    pub fn master_keyid_for(&self, keyid: &str) -> Option<&str> {
        if self.keyid == keyid || self.subkeys.contains_key(keyid) {
            Some(&self.keyid)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(keyid: &str) -> PublicKey {
        PublicKey {
            keyid: keyid.to_string(),
            keytype: "ed25519".to_string(),
            scheme: "ed25519".to_string(),
            keyval: KeyVal {
                public: "deadbeef".to_string(),
                private: None,
                certificate: None,
            },
            subkeys: HashMap::new(),
            keyid_hash_algorithms: None,
        }
    }

    #[test]
    fn resolves_self_not_others() {
        let k = key("aaaa");
        assert!(k.resolves("aaaa"));
        assert!(!k.resolves("bbbb"));
    }

    #[test]
    fn master_keyid_for_subkey() {
        let mut master = key("master");
        master.subkeys.insert("sub1".to_string(), key("sub1"));
        assert_eq!(master.master_keyid_for("sub1"), Some("master"));
        assert_eq!(master.master_keyid_for("master"), Some("master"));
        assert_eq!(master.master_keyid_for("other"), None);
    }
}
