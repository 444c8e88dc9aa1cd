pub(crate) use {
    crate::error::CliError,
    anyhow::{anyhow, Result as AnyResult},
    clap::{Args, Parser, Subcommand, ValueEnum},
    colored::Colorize,
    serde::{Deserialize, Serialize},
    std::path::PathBuf,
};

/// Where to find the CLI's own rc file.
pub(crate) const CLI_CONF_PATH: &str = "~/.in_toto/conf.toml";

/// Expands `~/` to the user's home directory in path arguments.
pub(crate) fn expand_tilde(path: &str) -> AnyResult<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var_os("HOME").ok_or_else(|| anyhow!("HOME is not set"))?;
        return Ok(PathBuf::from(home).join(rest));
    }
    Ok(PathBuf::from(path))
}

/// Serializes `value` compactly or pretty-printed (`--compact-json`,
/// `runlib.py`'s `compact_json` flag) and writes it to `path`.
pub(crate) fn write_json(
    path: &std::path::Path,
    value: &serde_json::Value,
    compact: bool,
) -> AnyResult<(), CliError> {
    let bytes = if compact {
        serde_json::to_vec(value)?
    } else {
        serde_json::to_vec_pretty(value)?
    };
    std::fs::write(path, bytes)?;
    Ok(())
}
