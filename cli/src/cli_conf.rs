//! The CLI's own rc file (spec §6/§9): a thin TOML wrapper around the
//! engine's `PartialConfig`, loaded once at startup and overlaid with
//! environment variables and CLI flags by each subcommand.

use {crate::prelude::*, in_toto::config::PartialConfig};

/// Struct holding the on-disk rc file shape.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct CliConf {
    #[serde(flatten)]
    pub(crate) config: PartialConfig,
}

impl CliConf {
    pub(crate) fn load() -> AnyResult<Self> {
        Self::load_from_path(&expand_tilde(CLI_CONF_PATH)?)
    }

    pub(crate) fn load_from_path(path: &PathBuf) -> AnyResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn save(&self) -> AnyResult<()> {
        self.save_to_path(&expand_tilde(CLI_CONF_PATH)?)
    }

    pub(crate) fn save_to_path(&self, path: &PathBuf) -> AnyResult<()> {
        let parent_folder = path.parent().expect("Parent folder must exist.");
        let conf = toml::to_string_pretty(&self.config)?;

        std::fs::create_dir_all(parent_folder)?;
        std::fs::write(path, conf)?;

        Ok(())
    }

    /// Merge the rc file's settings with the environment and whatever the
    /// running subcommand parsed from its own flags, in that precedence
    /// order (spec §9).
    pub(crate) fn resolve(&self, cli: PartialConfig) -> in_toto::config::Config {
        let env = in_toto::config::from_env(&std::env::vars().collect());
        in_toto::config::resolve(self.config.clone(), env, cli)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rc_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.toml");
        let conf = CliConf::load_from_path(&path).unwrap();
        assert_eq!(conf.config, PartialConfig::default());
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.toml");

        let mut conf = CliConf::default();
        conf.config.link_cmd_exec_timeout = Some(42);
        conf.save_to_path(&path).unwrap();

        let loaded = CliConf::load_from_path(&path).unwrap();
        assert_eq!(loaded.config.link_cmd_exec_timeout, Some(42));
    }
}
