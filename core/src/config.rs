//! Configuration (spec §6/§9): the reference implementation scans
//! environment variables and an rc file into a mutated global settings
//! module; spec §9's redesign note replaces that with an explicit `Config`
//! value, built by merging pure `env -> Config` and `rc -> Config` layers
//! under a fixed precedence and passed through the recording/verification
//! entry points rather than read from ambient global state.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::resolver::ResolverOptions;

/// Every setting spec §6 names, with its default.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub artifact_exclude_patterns: Vec<String>,
    pub artifact_base_path: Option<PathBuf>,
    pub link_cmd_exec_timeout: u64,
    pub follow_symlink_dirs: bool,
    pub normalize_line_endings: bool,
    pub lstrip_paths: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifact_exclude_patterns: Vec::new(),
            artifact_base_path: None,
            link_cmd_exec_timeout: 10,
            follow_symlink_dirs: false,
            normalize_line_endings: false,
            lstrip_paths: Vec::new(),
        }
    }
}

impl Config {
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            exclude_patterns: self.artifact_exclude_patterns.clone(),
            lstrip_paths: self.lstrip_paths.clone(),
            follow_symlink_dirs: self.follow_symlink_dirs,
            normalize_line_endings: self.normalize_line_endings,
            ostree_base_path: self.artifact_base_path.clone(),
        }
    }

    /// Merge `more` over `self`: every field `more` sets non-default
    /// overrides the corresponding field here. Used to apply, in order,
    /// defaults < rc file < environment < CLI flags (spec §9).
    fn overlay(mut self, more: PartialConfig) -> Self {
        if let Some(v) = more.artifact_exclude_patterns {
            self.artifact_exclude_patterns = v;
        }
        if let Some(v) = more.artifact_base_path {
            self.artifact_base_path = Some(v);
        }
        if let Some(v) = more.link_cmd_exec_timeout {
            self.link_cmd_exec_timeout = v;
        }
        if let Some(v) = more.follow_symlink_dirs {
            self.follow_symlink_dirs = v;
        }
        if let Some(v) = more.normalize_line_endings {
            self.normalize_line_endings = v;
        }
        if let Some(v) = more.lstrip_paths {
            self.lstrip_paths = v;
        }
        self
    }
}

/// Each layer (rc file, environment, CLI flags) only ever knows about the
/// settings it actually found; `None` means "this layer is silent on this
/// setting", distinguishing it from an explicit false/empty value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialConfig {
    pub artifact_exclude_patterns: Option<Vec<String>>,
    pub artifact_base_path: Option<PathBuf>,
    pub link_cmd_exec_timeout: Option<u64>,
    pub follow_symlink_dirs: Option<bool>,
    pub normalize_line_endings: Option<bool>,
    pub lstrip_paths: Option<Vec<String>>,
}

/// Parse a TOML rc file's contents into a `PartialConfig`.
pub fn from_rc_str(contents: &str) -> Result<PartialConfig, toml::de::Error> {
    toml::from_str(contents)
}

/// Read the recognized `IN_TOTO_*` environment variables into a
/// `PartialConfig`.
pub fn from_env(vars: &HashMap<String, String>) -> PartialConfig {
    let mut cfg = PartialConfig::default();

    if let Some(v) = vars.get("IN_TOTO_ARTIFACT_EXCLUDE_PATTERNS") {
        cfg.artifact_exclude_patterns = Some(v.split(',').map(str::to_string).collect());
    }
    if let Some(v) = vars.get("IN_TOTO_ARTIFACT_BASE_PATH") {
        cfg.artifact_base_path = Some(PathBuf::from(v));
    }
    if let Some(v) = vars.get("IN_TOTO_LINK_CMD_EXEC_TIMEOUT") {
        cfg.link_cmd_exec_timeout = v.parse().ok();
    }
    if let Some(v) = vars.get("IN_TOTO_FOLLOW_SYMLINK_DIRS") {
        cfg.follow_symlink_dirs = parse_bool(v);
    }
    if let Some(v) = vars.get("IN_TOTO_NORMALIZE_LINE_ENDINGS") {
        cfg.normalize_line_endings = parse_bool(v);
    }
    if let Some(v) = vars.get("IN_TOTO_LSTRIP_PATHS") {
        cfg.lstrip_paths = Some(v.split(',').map(str::to_string).collect());
    }

    cfg
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Merge defaults, an rc-file layer, an environment layer, and a CLI-flag
/// layer, in that precedence order (later layers win), per spec §9.
pub fn resolve(rc: PartialConfig, env: PartialConfig, cli: PartialConfig) -> Config {
    Config::default().overlay(rc).overlay(env).overlay(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_env_overrides_rc() {
        let rc = PartialConfig {
            link_cmd_exec_timeout: Some(5),
            follow_symlink_dirs: Some(true),
            ..Default::default()
        };
        let env = PartialConfig {
            link_cmd_exec_timeout: Some(20),
            ..Default::default()
        };
        let cli = PartialConfig {
            link_cmd_exec_timeout: Some(99),
            ..Default::default()
        };

        let merged = resolve(rc, env, cli);
        assert_eq!(merged.link_cmd_exec_timeout, 99);
        assert!(merged.follow_symlink_dirs);
    }

    #[test]
    fn unset_layers_fall_through_to_default() {
        let merged = resolve(PartialConfig::default(), PartialConfig::default(), PartialConfig::default());
        assert_eq!(merged, Config::default());
    }

    #[test]
    fn env_parses_comma_separated_lists_and_bools() {
        let mut vars = HashMap::new();
        vars.insert("IN_TOTO_LSTRIP_PATHS".to_string(), "a/,b/".to_string());
        vars.insert("IN_TOTO_NORMALIZE_LINE_ENDINGS".to_string(), "true".to_string());

        let cfg = from_env(&vars);
        assert_eq!(cfg.lstrip_paths, Some(vec!["a/".to_string(), "b/".to_string()]));
        assert_eq!(cfg.normalize_line_endings, Some(true));
    }
}
