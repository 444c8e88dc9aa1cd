//! `in-toto record start`/`in-toto record stop` (spec §4.5): two-phase link
//! recording, wrapping `in_toto::recorder::{record_start,record_stop}`.

use {
    crate::{cli_conf::CliConf, keys::{load_public_key, load_signer}, prelude::*},
    in_toto::config::PartialConfig,
    in_toto::model::container::SignedContainer,
    std::time::Duration,
};

#[derive(Subcommand, Clone, Debug)]
pub(crate) enum RecordCommand {
    Start(RecordStartCommand),
    Stop(RecordStopCommand),
}

#[derive(Args, Clone, Debug)]
pub(crate) struct RecordStartCommand {
    #[arg(short, long)]
    step_name: String,
    #[arg(short, long)]
    key: PathBuf,
    #[arg(short = 'm', long = "materials", num_args = 0..)]
    materials: Vec<String>,
    #[arg(long)]
    dsse: bool,
    #[arg(long)]
    compact_json: bool,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct RecordStopCommand {
    #[arg(short, long)]
    step_name: String,
    #[arg(short, long)]
    key: PathBuf,
    #[arg(short = 'p', long = "products", num_args = 0..)]
    products: Vec<String>,
    #[arg(last = true)]
    command: Vec<String>,
    #[arg(long)]
    record_environment: bool,
    #[arg(long)]
    exec_timeout: Option<u64>,
    #[arg(long)]
    compact_json: bool,
}

pub(crate) fn handle(cmd: RecordCommand) -> AnyResult<(), CliError> {
    match cmd {
        RecordCommand::Start(start) => handle_start(start),
        RecordCommand::Stop(stop) => handle_stop(stop),
    }
}

fn unfinished_path(step_name: &str, keyid: &str) -> PathBuf {
    PathBuf::from(in_toto::recorder::unfinished_filename(step_name, keyid))
}

fn handle_start(cmd: RecordStartCommand) -> AnyResult<(), CliError> {
    let signer = load_signer(&cmd.key)?;
    let config = CliConf::load()?.resolve(PartialConfig::default());

    let container = in_toto::recorder::record_start(
        &cmd.step_name,
        &cmd.materials,
        signer.as_ref(),
        &config.resolver_options(),
        cmd.dsse,
    )?;

    let path = unfinished_path(&cmd.step_name, &signer.keyid());
    write_json(&path, &container.to_value()?, cmd.compact_json)?;
    println!("{} wrote {}", "✔".green().bold(), path.display());
    Ok(())
}

fn handle_stop(cmd: RecordStopCommand) -> AnyResult<(), CliError> {
    let signer = load_signer(&cmd.key)?;
    let verification_key = load_public_key(&cmd.key)?;
    let config = CliConf::load()?.resolve(PartialConfig {
        link_cmd_exec_timeout: cmd.exec_timeout,
        ..Default::default()
    });

    let path = unfinished_path(&cmd.step_name, &signer.keyid());
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| anyhow!("failed to read unfinished link '{}': {e}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)?;
    let unfinished = SignedContainer::from_value(value)?;

    let container = in_toto::recorder::record_stop(
        unfinished,
        &cmd.products,
        &cmd.command,
        signer.as_ref(),
        &verification_key,
        &config.resolver_options(),
        Some(Duration::from_secs(config.link_cmd_exec_timeout)),
        cmd.record_environment,
    )?;

    let finished_path = PathBuf::from(in_toto::recorder::link_filename(&cmd.step_name, &signer.keyid()));
    write_json(&finished_path, &container.to_value()?, cmd.compact_json)?;
    std::fs::remove_file(&path)?;

    println!("{} wrote {}", "✔".green().bold(), finished_path.display());
    Ok(())
}
