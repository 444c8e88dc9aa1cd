//! Artifact resolvers (spec §4.3): map a URI to one or more canonical URIs
//! and a hash dict for each.
//!
//! Spec §9's redesign note replaces the reference's global
//! `RESOLVER_FOR_URI_SCHEME` class registry with an explicit `ResolverSet`
//! value threaded through the recorder and verifier, grounded on
//! `original_source/in_toto/resolver/resolver.py`'s `Resolver.for_uri`
//! dispatch but made a plain struct instead of metaclass state.

pub mod dir;
pub mod file;
pub mod ostree;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::link::HashDict;

pub const DEFAULT_SCHEME: &str = "file";

/// Options shared by every resolver, set once per `in-toto run`/`verify`
/// invocation (spec §6: `--exclude`, `--lstrip-paths`, `--follow-symlink-dirs`,
/// `--normalize-line-endings`).
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    pub exclude_patterns: Vec<String>,
    pub lstrip_paths: Vec<String>,
    pub follow_symlink_dirs: bool,
    pub normalize_line_endings: bool,
    /// Root of the OSTree repository a bare `ostree:<ref>` URI is resolved
    /// against; defaults to the current directory, matching
    /// `OSTreeResolver(base_path=...)` defaulting to `os.getcwd()`.
    pub ostree_base_path: Option<std::path::PathBuf>,
}

/// The scheme a URI names, or the default (`file`) when none is present.
/// `scheme:path` — an empty scheme before the colon is not meaningful, so a
/// Windows-style `C:\...` path is treated as schemeless, matching
/// `resolver.py::Resolver.for_uri`'s `scheme not in RESOLVER_FOR_URI_SCHEME`
/// fallback.
pub fn scheme_of(uri: &str) -> &str {
    match uri.split_once(':') {
        Some((scheme, _rest)) if !scheme.is_empty() && is_known_scheme(scheme) => scheme,
        _ => DEFAULT_SCHEME,
    }
}

fn is_known_scheme(scheme: &str) -> bool {
    matches!(scheme, "file" | "dir" | "ostree")
}

/// Resolve one declared artifact URI to its canonical key(s) and hash dict.
pub fn resolve(uri: &str, opts: &ResolverOptions) -> Result<BTreeMap<String, HashDict>> {
    match scheme_of(uri) {
        "dir" => dir::resolve(uri, opts),
        "ostree" => ostree::resolve(uri, opts),
        _ => file::resolve(uri, opts),
    }
}

/// Resolve a whole set of declared URIs, merging their results.
pub fn resolve_all(uris: &[String], opts: &ResolverOptions) -> Result<BTreeMap<String, HashDict>> {
    let mut merged = BTreeMap::new();
    for uri in uris {
        merged.extend(resolve(uri, opts)?);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_of_recognizes_known_schemes() {
        assert_eq!(scheme_of("dir:foo"), "dir");
        assert_eq!(scheme_of("ostree:foo"), "ostree");
        assert_eq!(scheme_of("file:foo"), "file");
    }

    #[test]
    fn scheme_of_defaults_to_file() {
        assert_eq!(scheme_of("src/main.rs"), "file");
        assert_eq!(scheme_of("C:\\Users\\x"), "file");
    }
}
