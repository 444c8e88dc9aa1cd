//! `in-toto verify` (spec §4.4): run the layout verification driver,
//! wrapping `in_toto::verify::verify_layout`.

use {
    crate::{cli_conf::CliConf, keys::load_public_key, prelude::*},
    in_toto::config::PartialConfig,
    in_toto::model::container::SignedContainer,
    in_toto::model::PublicKey,
    std::collections::HashMap,
};

#[derive(Args, Clone, Debug)]
pub(crate) struct VerifyCommand {
    /// Path to the root layout file.
    #[arg(short, long)]
    layout: PathBuf,

    /// Public keys the root layout must be signed by.
    #[arg(short = 'k', long = "layout-keys", num_args = 1..)]
    layout_keys: Vec<PathBuf>,

    /// Directory to read link/layout files from.
    #[arg(short = 'd', long, default_value = ".")]
    link_dir: PathBuf,

    /// `NAME=VALUE` parameter substitutions.
    #[arg(long = "parameter", num_args = 0..)]
    parameters: Vec<String>,
}

pub(crate) fn handle(cmd: VerifyCommand) -> AnyResult<(), CliError> {
    let contents = std::fs::read_to_string(&cmd.layout)
        .map_err(|e| anyhow!("failed to read layout '{}': {e}", cmd.layout.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)?;
    let container = SignedContainer::from_value(value)?;

    let mut trust_root: HashMap<String, PublicKey> = HashMap::new();
    for path in &cmd.layout_keys {
        let key = load_public_key(path)?;
        trust_root.insert(key.keyid.clone(), key);
    }

    let mut parameters = HashMap::new();
    for entry in &cmd.parameters {
        let (name, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("malformed --parameter '{entry}', expected NAME=VALUE"))?;
        parameters.insert(name.to_string(), value.to_string());
    }

    let config = CliConf::load()?.resolve(PartialConfig::default());
    let opts = in_toto::verify::VerifyOptions {
        link_dir: cmd.link_dir,
        parameters,
        config,
    };

    in_toto::verify::verify_layout(&container, &trust_root, &opts)?;

    println!("{} layout verification passed", "✔".green().bold());
    Ok(())
}
