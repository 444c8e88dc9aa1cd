//! The `dir` resolver (spec §4.3): an entire directory collapses to one
//! URI, hashed deterministically over the sorted list of its contents.

use std::collections::BTreeMap;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::ResolverOptions;
use crate::error::{InTotoError, Result};
use crate::model::link::HashDict;

/// `H(relpath || "\0" || H(content) || "\0")` accumulated in sorted-key
/// order, equivalently the digest of the sorted `sha256(file) "  " relpath
/// "\n"` lines concatenated then hashed again (spec §4.3).
fn directory_digest(root: &Path, opts: &ResolverOptions) -> Result<String> {
    if !root.is_dir() {
        return Err(InTotoError::FormatError(format!(
            "'{}' is not a directory",
            root.display()
        )));
    }

    let file_opts = ResolverOptions {
        exclude_patterns: opts.exclude_patterns.clone(),
        lstrip_paths: Vec::new(),
        follow_symlink_dirs: opts.follow_symlink_dirs,
        normalize_line_endings: opts.normalize_line_endings,
        ostree_base_path: opts.ostree_base_path.clone(),
    };

    let files = super::file::resolve(root.to_str().unwrap_or_default(), &file_opts)?;

    let mut lines = String::new();
    for (path, hash) in &files {
        let relpath = path
            .strip_prefix(&format!("{}/", root.to_string_lossy()))
            .unwrap_or(path);
        let sha256 = hash.get("sha256").cloned().unwrap_or_default();
        lines.push_str(&sha256);
        lines.push_str("  ");
        lines.push_str(relpath);
        lines.push('\n');
    }

    let digest = Sha256::digest(lines.as_bytes());
    Ok(hex::encode(digest))
}

pub(super) fn resolve(uri: &str, opts: &ResolverOptions) -> Result<BTreeMap<String, HashDict>> {
    let path_str = uri.strip_prefix("dir:").unwrap_or(uri);
    let root = Path::new(path_str);

    let digest = directory_digest(root, opts)?;
    let mut hash = HashDict::new();
    hash.insert("sha256".to_string(), digest);

    let key = crate::resolver::file::strip_key(uri, &opts.lstrip_paths);
    let mut result = BTreeMap::new();
    result.insert(key, hash);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_directory_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();

        let opts = ResolverOptions::default();
        let first = resolve(dir.path().to_str().unwrap(), &opts).unwrap();
        let second = resolve(dir.path().to_str().unwrap(), &opts).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn non_existent_directory_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let opts = ResolverOptions::default();
        assert!(resolve(missing.to_str().unwrap(), &opts).is_err());
    }

    #[test]
    fn key_keeps_the_dir_scheme_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let uri = format!("dir:{}", dir.path().to_str().unwrap());
        let opts = ResolverOptions::default();
        let result = resolve(&uri, &opts).unwrap();
        assert!(result.contains_key(&uri));
    }

    #[test]
    fn differs_when_contents_differ() {
        let dir_a = tempfile::tempdir().unwrap();
        std::fs::write(dir_a.path().join("a.txt"), b"a").unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        std::fs::write(dir_b.path().join("a.txt"), b"different").unwrap();

        let opts = ResolverOptions::default();
        let hash_a = resolve(dir_a.path().to_str().unwrap(), &opts).unwrap();
        let hash_b = resolve(dir_b.path().to_str().unwrap(), &opts).unwrap();
        assert_ne!(hash_a, hash_b);
    }
}
