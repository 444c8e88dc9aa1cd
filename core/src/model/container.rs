//! Signed containers (spec §3/§4.1/§9): a `Layout` or `Link` payload wrapped
//! in either the classic `{signed, signatures}` shape or a DSSE envelope.
//!
//! The reference implementation models `Layout`/`Link` as subclasses of a
//! polymorphic `Signable`; spec §9's redesign note replaces that with a
//! tagged union (`Payload`) plus one generic `SignedContainer<P>`, detecting
//! the container shape from which fields are present at load time, matching
//! `original_source/in_toto/models/metadata.py`'s `PayloadDeserializer`.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::{canonicalize, dsse_pae};
use crate::crypto::SignatureRecord;
use crate::error::{InTotoError, Result};
use crate::model::link::Link;
use crate::model::layout::Layout;

pub const DSSE_PAYLOAD_TYPE: &str = "application/vnd.in-toto+json";

/// Either kind of top-level signed metadata, dispatched on `_type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Payload {
    Layout(Layout),
    Link(Link),
}

impl Payload {
    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::Layout(_) => "layout",
            Payload::Link(_) => "link",
        }
    }

    pub fn as_layout(&self) -> Option<&Layout> {
        match self {
            Payload::Layout(l) => Some(l),
            Payload::Link(_) => None,
        }
    }

    pub fn as_link(&self) -> Option<&Link> {
        match self {
            Payload::Link(l) => Some(l),
            Payload::Layout(_) => None,
        }
    }
}

/// A container holding an unverified payload plus its signatures, in either
/// the classic or DSSE wire shape (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct SignedContainer {
    pub payload: Payload,
    pub signatures: Vec<SignatureRecord>,
    pub dsse: bool,
}

impl SignedContainer {
    pub fn new_classic(payload: Payload) -> Self {
        Self {
            payload,
            signatures: Vec::new(),
            dsse: false,
        }
    }

    pub fn new_dsse(payload: Payload) -> Self {
        Self {
            payload,
            signatures: Vec::new(),
            dsse: true,
        }
    }

    /// The exact byte sequence a signer/verifier must operate over, per
    /// spec §4.1: canonical JSON of the payload for the classic shape, or
    /// the DSSE PAE of `(payloadType, json(payload))` for the envelope
    /// shape.
    pub fn signable_bytes(&self) -> Result<Vec<u8>> {
        let value = serde_json::to_value(&self.payload)?;
        if self.dsse {
            let json_bytes = serde_json::to_vec(&value)?;
            Ok(dsse_pae(DSSE_PAYLOAD_TYPE, &json_bytes))
        } else {
            canonicalize(&value)
        }
    }

    pub fn add_signature(&mut self, sig: SignatureRecord) {
        self.signatures.push(sig);
    }

    /// Parse either wire shape from a raw JSON document, detecting the
    /// shape from which top-level fields are present (spec §3: "The
    /// container format is chosen at emit time; verification detects it
    /// from shape").
    pub fn from_value(value: Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| InTotoError::FormatError("signed container must be a JSON object".into()))?;

        if let Some(payload_b64) = obj.get("payload") {
            let payload_b64 = payload_b64
                .as_str()
                .ok_or_else(|| InTotoError::FormatError("DSSE 'payload' must be a string".into()))?;
            let payload_bytes = base64::engine::general_purpose::STANDARD
                .decode(payload_b64)
                .map_err(|e| InTotoError::FormatError(format!("invalid base64 DSSE payload: {e}")))?;
            let payload_value: Value = serde_json::from_slice(&payload_bytes)?;
            let payload = parse_payload(payload_value)?;
            let signatures = parse_signatures(obj.get("signatures"))?;
            return Ok(Self {
                payload,
                signatures,
                dsse: true,
            });
        }

        let signed = obj
            .get("signed")
            .ok_or_else(|| InTotoError::FormatError("missing 'signed' or 'payload' field".into()))?;
        let payload = parse_payload(signed.clone())?;
        let signatures = parse_signatures(obj.get("signatures"))?;
        Ok(Self {
            payload,
            signatures,
            dsse: false,
        })
    }

    /// Serialize to the wire shape this container was built or parsed as.
    pub fn to_value(&self) -> Result<Value> {
        let payload_value = serde_json::to_value(&self.payload)?;
        let signatures_value = serde_json::to_value(&self.signatures)?;

        if self.dsse {
            let json_bytes = serde_json::to_vec(&payload_value)?;
            let payload_b64 = base64::engine::general_purpose::STANDARD.encode(json_bytes);
            Ok(serde_json::json!({
                "payload": payload_b64,
                "payloadType": DSSE_PAYLOAD_TYPE,
                "signatures": signatures_value,
            }))
        } else {
            Ok(serde_json::json!({
                "signed": payload_value,
                "signatures": signatures_value,
            }))
        }
    }
}

fn parse_payload(value: Value) -> Result<Payload> {
    let type_field = value
        .get("_type")
        .and_then(Value::as_str)
        .ok_or_else(|| InTotoError::FormatError("payload missing '_type'".into()))?;

    match type_field {
        "layout" => Ok(Payload::Layout(serde_json::from_value(value)?)),
        "link" => Ok(Payload::Link(serde_json::from_value(value)?)),
        other => Err(InTotoError::FormatError(format!(
            "unrecognized payload '_type': '{other}'"
        ))),
    }
}

fn parse_signatures(value: Option<&Value>) -> Result<Vec<SignatureRecord>> {
    match value {
        Some(v) => Ok(serde_json::from_value(v.clone())?),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::link::Link;

    #[test]
    fn classic_roundtrips_through_value() {
        let container = SignedContainer::new_classic(Payload::Link(Link::new("build")));
        let value = container.to_value().unwrap();
        let parsed = SignedContainer::from_value(value).unwrap();
        assert_eq!(parsed.payload.type_name(), "link");
        assert!(!parsed.dsse);
    }

    #[test]
    fn dsse_roundtrips_through_value() {
        let container = SignedContainer::new_dsse(Payload::Link(Link::new("build")));
        let value = container.to_value().unwrap();
        assert!(value.get("payload").is_some());
        let parsed = SignedContainer::from_value(value).unwrap();
        assert!(parsed.dsse);
        assert_eq!(parsed.payload.type_name(), "link");
    }

    #[test]
    fn rejects_missing_type_field() {
        let bogus = serde_json::json!({"signed": {"foo": "bar"}, "signatures": []});
        assert!(SignedContainer::from_value(bogus).is_err());
    }
}
