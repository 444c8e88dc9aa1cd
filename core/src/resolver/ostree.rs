//! The `ostree` resolver (spec §4.3): resolves a ref to its commit object
//! id, read from the repository's `refs/heads/<ref>` file the same way a
//! plain git ref works. Missing ref or repo is a hard error, not a skip.

use std::collections::BTreeMap;

use super::ResolverOptions;
use crate::error::{InTotoError, Result};
use crate::model::link::HashDict;

pub(super) fn resolve(uri: &str, opts: &ResolverOptions) -> Result<BTreeMap<String, HashDict>> {
    let ref_name = uri.strip_prefix("ostree:").unwrap_or(uri);
    let base = opts
        .ostree_base_path
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    if !base.join("refs").is_dir() && !base.join("objects").is_dir() {
        return Err(InTotoError::FormatError(format!(
            "'{}' is not an OSTree repository",
            base.display()
        )));
    }

    let ref_path = base.join("refs").join("heads").join(ref_name);
    let commit_id = std::fs::read_to_string(&ref_path)
        .map_err(|_| {
            InTotoError::FormatError(format!("OSTree ref '{ref_name}' not found in '{}'", base.display()))
        })?
        .trim()
        .to_string();

    let mut hash = HashDict::new();
    hash.insert("sha256".to_string(), commit_id);

    let key = crate::resolver::file::strip_key(uri, &opts.lstrip_paths);
    let mut result = BTreeMap::new();
    result.insert(key, hash);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_repo_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ResolverOptions {
            ostree_base_path: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(resolve("ostree:test-branch", &opts).is_err());
    }

    #[test]
    fn resolves_ref_to_commit_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("refs/heads")).unwrap();
        std::fs::create_dir_all(dir.path().join("objects")).unwrap();
        std::fs::write(dir.path().join("refs/heads/test-branch"), "abc123\n").unwrap();

        let opts = ResolverOptions {
            ostree_base_path: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let result = resolve("ostree:test-branch", &opts).unwrap();
        assert_eq!(
            result.get("ostree:test-branch").unwrap().get("sha256").unwrap(),
            "abc123"
        );
    }

    #[test]
    fn missing_ref_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("refs/heads")).unwrap();
        std::fs::create_dir_all(dir.path().join("objects")).unwrap();

        let opts = ResolverOptions {
            ostree_base_path: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(resolve("ostree:missing-branch", &opts).is_err());
    }
}
