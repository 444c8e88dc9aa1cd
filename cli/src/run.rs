//! `in-toto run` (spec §4.5): one-shot link recording, wrapping
//! `in_toto::recorder::record_run`, grounded on `original_source/in_toto/in_toto_run.py`.

use {
    crate::{cli_conf::CliConf, keys::load_signer, prelude::*},
    in_toto::config::PartialConfig,
    std::time::Duration,
};

#[derive(Args, Clone, Debug)]
pub(crate) struct RunCommand {
    /// Name of the step being recorded.
    #[arg(short, long)]
    step_name: String,

    /// Path to the signing key to use.
    #[arg(short, long)]
    key: PathBuf,

    /// Material artifact paths/URIs to resolve before running `command`.
    #[arg(short = 'm', long = "materials", num_args = 0..)]
    materials: Vec<String>,

    /// Product artifact paths/URIs to resolve after running `command`.
    #[arg(short = 'p', long = "products", num_args = 0..)]
    products: Vec<String>,

    /// Command to run and capture byproducts for; empty records no command.
    #[arg(last = true)]
    command: Vec<String>,

    /// Write the link as a DSSE envelope instead of the classic `{signed,signatures}` shape.
    #[arg(long)]
    dsse: bool,

    /// Record the working directory in the link's `environment` field.
    #[arg(long)]
    record_environment: bool,

    /// Where to write the finished link; defaults to `<step>.<keyid8>.link`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    exec_timeout: Option<u64>,

    /// Write compact instead of pretty-printed JSON.
    #[arg(long)]
    compact_json: bool,
}

pub(crate) fn handle(cmd: RunCommand) -> AnyResult<(), CliError> {
    let signer = load_signer(&cmd.key)?;
    let config = CliConf::load()?.resolve(PartialConfig {
        link_cmd_exec_timeout: cmd.exec_timeout,
        ..Default::default()
    });

    let container = in_toto::recorder::record_run(
        &cmd.step_name,
        &cmd.materials,
        &cmd.products,
        &cmd.command,
        signer.as_ref(),
        &config.resolver_options(),
        Some(Duration::from_secs(config.link_cmd_exec_timeout)),
        cmd.dsse,
        cmd.record_environment,
    )?;

    let filename = in_toto::recorder::link_filename(&cmd.step_name, &signer.keyid());
    let output = cmd.output.unwrap_or_else(|| PathBuf::from(&filename));
    write_json(&output, &container.to_value()?, cmd.compact_json)?;

    println!("{} wrote {}", "✔".green().bold(), output.display());
    Ok(())
}
