//! Error taxonomy for the verification and recording engine.
//!
//! Every kind here maps to a decision point called out by the core
//! specification: signature checks, threshold selection, rule evaluation,
//! inspection execution, and the ambient parsing/config layers around them.
//! The verification driver is fail-fast: the first error of any kind other
//! than a recovered per-link signature failure terminates verification and
//! is returned to the caller as one of these variants.

use std::path::PathBuf;

use thiserror::Error;

use crate::rules::RuleTrace;

/// Errors raised by the verification and recording engine.
#[derive(Debug, Error)]
pub enum InTotoError {
    #[error("signature verification failed: no supplied key validated the layout's signatures")]
    SignatureVerificationError,

    #[error("layout expired at {expires} (now is {now})")]
    LayoutExpiredError { expires: String, now: String },

    #[error("not enough link files found for step '{step}': found {found}, need threshold {threshold}")]
    LinkNotFoundError {
        step: String,
        found: usize,
        threshold: usize,
    },

    #[error("threshold verification failed for step '{step}': {reason}")]
    ThresholdVerificationError { step: String, reason: String },

    #[error("rule verification failed for '{item}' ({side}): {trace}")]
    RuleVerificationError {
        item: String,
        side: String,
        trace: Box<RuleTrace>,
    },

    #[error("inspection '{name}' returned non-zero or non-integer exit status: {detail}")]
    BadReturnValueError { name: String, detail: String },

    #[error("key '{keyid}' is expired and cannot be used for verification")]
    KeyExpirationError { keyid: String },

    #[error("parameter substitution referenced undefined name '{name}'")]
    ParameterError { name: String },

    #[error("lstrip_paths collapses '{a}' and '{b}' onto the same key '{key}'")]
    PrefixError { a: String, b: String, key: String },

    #[error("metadata failed schema validation: {0}")]
    FormatError(String),

    #[error("subprocess '{command}' exceeded its {timeout_secs}s timeout")]
    TimeoutError { command: String, timeout_secs: u64 },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InTotoError>;
