//! The `file` resolver (spec §4.3): walks a path and hashes each regular
//! file it finds, one URI per file.
//!
//! Grounded on `original_source/in_toto/resolver/file_resolver.py`:
//! normalize the path, apply exclude patterns at each directory level
//! (pruning excluded subtrees rather than just filtering the leaves),
//! skip broken symlinks with a log line, and apply `lstrip_paths` only
//! to the recorded key, never to the path actually read from disk.

use std::collections::BTreeMap;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::{scheme_of, ResolverOptions};
use crate::error::{InTotoError, Result};
use crate::model::link::HashDict;

fn exclude_matcher(patterns: &[String]) -> Result<Option<ignore::gitignore::Gitignore>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = ignore::gitignore::GitignoreBuilder::new(".");
    for pattern in patterns {
        builder
            .add_line(None, pattern)
            .map_err(|e| InTotoError::FormatError(format!("invalid exclude pattern '{pattern}': {e}")))?;
    }
    let matcher = builder
        .build()
        .map_err(|e| InTotoError::FormatError(format!("invalid exclude patterns: {e}")))?;
    Ok(Some(matcher))
}

fn is_excluded(matcher: &Option<ignore::gitignore::Gitignore>, path: &Path, is_dir: bool) -> bool {
    match matcher {
        Some(m) => m.matched(path, is_dir).is_ignore(),
        None => false,
    }
}

/// Strip a leading `file:` scheme prefix, then the first matching
/// `lstrip_paths` prefix, per `apply_left_strip`. Collision between two
/// distinct source paths stripping to the same key is a hard error.
pub fn strip_key(raw_key: &str, lstrip_paths: &[String]) -> String {
    let without_scheme = raw_key.strip_prefix("file:").unwrap_or(raw_key);
    for prefix in lstrip_paths {
        if let Some(rest) = without_scheme.strip_prefix(prefix.as_str()) {
            return rest.to_string();
        }
    }
    without_scheme.to_string()
}

pub(super) fn resolve(uri: &str, opts: &ResolverOptions) -> Result<BTreeMap<String, HashDict>> {
    let path_str = uri.strip_prefix("file:").unwrap_or(uri);
    let root = Path::new(path_str);
    let matcher = exclude_matcher(&opts.exclude_patterns)?;

    let mut raw_keys = Vec::new();

    if root.is_file() {
        raw_keys.push(path_str.to_string());
    } else if root.is_dir() {
        let walker = walkdir::WalkDir::new(root).follow_links(opts.follow_symlink_dirs);

        for entry in walker.into_iter().filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            !is_excluded(&matcher, e.path(), e.file_type().is_dir())
        }) {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            if entry.depth() == 0 {
                continue;
            }
            let path = entry.path();
            if entry.file_type().is_symlink() && !path.exists() {
                log::info!("path '{}' appears to be a broken symlink, skipping", path.display());
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            raw_keys.push(path.to_string_lossy().replace('\\', "/"));
        }
    } else {
        log::info!("path '{}' does not exist, skipping", root.display());
        return Ok(BTreeMap::new());
    }

    let mut result = BTreeMap::new();
    let mut first_raw_key_for: BTreeMap<String, String> = BTreeMap::new();
    for raw_key in raw_keys {
        let key = strip_key(&raw_key, &opts.lstrip_paths);
        if let Some(first_raw_key) = first_raw_key_for.get(&key) {
            return Err(InTotoError::PrefixError {
                a: first_raw_key.clone(),
                b: raw_key,
                key,
            });
        }
        let hash = hash_file(Path::new(&raw_key), opts.normalize_line_endings)?;
        first_raw_key_for.insert(key.clone(), raw_key);
        result.insert(key, hash);
    }

    let _ = scheme_of(uri);
    Ok(result)
}

fn hash_file(path: &Path, normalize_line_endings: bool) -> Result<HashDict> {
    let bytes = std::fs::read(path).map_err(|e| InTotoError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let digest = if normalize_line_endings {
        let normalized = normalize_crlf(&bytes);
        Sha256::digest(&normalized)
    } else {
        Sha256::digest(&bytes)
    };

    let mut dict = HashDict::new();
    dict.insert("sha256".to_string(), hex::encode(digest));
    Ok(dict)
}

/// Collapse CRLF and lone CR to LF, matching
/// `securesystemslib.hash.digest_filename(..., normalize_line_endings=True)`.
fn normalize_crlf(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                out.push(b'\n');
                if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                    i += 1;
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hashes_a_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.txt");
        std::fs::write(&file_path, b"hello").unwrap();

        let opts = ResolverOptions::default();
        let result = resolve(file_path.to_str().unwrap(), &opts).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn lstrip_paths_strips_prefix() {
        let stripped = strip_key("build/out/a.txt", &["build/".to_string()]);
        assert_eq!(stripped, "out/a.txt");
    }

    #[test]
    fn normalize_crlf_collapses_crlf_and_cr() {
        assert_eq!(normalize_crlf(b"a\r\nb\rc\n"), b"a\nb\nc\n");
    }

    #[test]
    fn prefix_collision_reports_the_first_colliding_raw_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("a/x.txt"), b"1").unwrap();
        std::fs::write(dir.path().join("b/x.txt"), b"2").unwrap();

        let opts = ResolverOptions {
            lstrip_paths: vec![
                format!("{}/a/", dir.path().to_str().unwrap()),
                format!("{}/b/", dir.path().to_str().unwrap()),
            ],
            ..Default::default()
        };

        let err = resolve(dir.path().to_str().unwrap(), &opts).unwrap_err();
        match err {
            InTotoError::PrefixError { a, b, key } => {
                assert_ne!(a, b, "must report the two distinct colliding source paths");
                assert!(a.ends_with("x.txt") && b.ends_with("x.txt"));
                assert_eq!(key, "x.txt");
            }
            other => panic!("expected PrefixError, got {other:?}"),
        }
    }

    #[test]
    fn missing_path_yields_empty_set() {
        let opts = ResolverOptions::default();
        let result = resolve("/nonexistent/path/xyz", &opts).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn walks_directory_and_hashes_each_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let mut f = std::fs::File::create(dir.path().join("sub/b.txt")).unwrap();
        f.write_all(b"b").unwrap();

        let opts = ResolverOptions::default();
        let result = resolve(dir.path().to_str().unwrap(), &opts).unwrap();
        assert_eq!(result.len(), 2);
    }
}
