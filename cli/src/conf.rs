//! `in-toto conf get`/`in-toto conf set`: inspect or edit the CLI's own rc
//! file, field by field, operating on `in_toto::config::PartialConfig`.

use crate::{cli_conf::CliConf, prelude::*};

#[derive(Subcommand, Clone, Debug)]
pub(crate) enum ConfCommand {
    /// Print the current rc file contents.
    Get,
    /// Set a single rc file field.
    Set(ConfSetCommand),
}

#[derive(Args, Clone, Debug)]
pub(crate) struct ConfSetCommand {
    #[command(subcommand)]
    field: ConfField,
}

#[derive(Subcommand, Clone, Debug)]
pub(crate) enum ConfField {
    ArtifactExcludePatterns { patterns: Vec<String> },
    ArtifactBasePath { path: PathBuf },
    LinkCmdExecTimeout { seconds: u64 },
    FollowSymlinkDirs { value: bool },
    NormalizeLineEndings { value: bool },
    LstripPaths { prefixes: Vec<String> },
}

pub(crate) fn handle(cmd: ConfCommand) -> AnyResult<(), CliError> {
    match cmd {
        ConfCommand::Get => handle_get(),
        ConfCommand::Set(set) => handle_set(set),
    }
}

fn handle_get() -> AnyResult<(), CliError> {
    let conf = CliConf::load()?;
    println!("{}", toml::to_string_pretty(&conf.config).map_err(|e| anyhow!(e))?);
    Ok(())
}

fn handle_set(cmd: ConfSetCommand) -> AnyResult<(), CliError> {
    let mut conf = CliConf::load()?;

    match cmd.field {
        ConfField::ArtifactExcludePatterns { patterns } => {
            conf.config.artifact_exclude_patterns = Some(patterns);
        }
        ConfField::ArtifactBasePath { path } => {
            conf.config.artifact_base_path = Some(path);
        }
        ConfField::LinkCmdExecTimeout { seconds } => {
            conf.config.link_cmd_exec_timeout = Some(seconds);
        }
        ConfField::FollowSymlinkDirs { value } => {
            conf.config.follow_symlink_dirs = Some(value);
        }
        ConfField::NormalizeLineEndings { value } => {
            conf.config.normalize_line_endings = Some(value);
        }
        ConfField::LstripPaths { prefixes } => {
            conf.config.lstrip_paths = Some(prefixes);
        }
    }

    conf.save()?;
    println!("{} updated {}", "✔".green().bold(), CLI_CONF_PATH);
    Ok(())
}
