//! `in-toto sign` (spec §4.3): add a signature to an existing layout or link
//! file in place, grounded on `original_source/in_toto/in_toto_sign.py`.

use {
    crate::{keys::load_signer, prelude::*},
    in_toto::model::container::SignedContainer,
};

#[derive(Args, Clone, Debug)]
pub(crate) struct SignCommand {
    /// Metadata file (layout or link) to sign.
    #[arg(short, long)]
    file: PathBuf,

    /// Key to sign with.
    #[arg(short, long)]
    key: PathBuf,

    /// Write the result to a different path instead of signing in place.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write compact instead of pretty-printed JSON.
    #[arg(long)]
    compact_json: bool,
}

pub(crate) fn handle(cmd: SignCommand) -> AnyResult<(), CliError> {
    let signer = load_signer(&cmd.key)?;

    let contents = std::fs::read_to_string(&cmd.file)
        .map_err(|e| anyhow!("failed to read '{}': {e}", cmd.file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&contents)?;
    let mut container = SignedContainer::from_value(value)?;

    let bytes = container.signable_bytes()?;
    let sig = signer
        .sign(&bytes)
        .map_err(|e| anyhow!("signing failed: {e}"))?;
    container.add_signature(sig);

    let output = cmd.output.unwrap_or(cmd.file);
    write_json(&output, &container.to_value()?, cmd.compact_json)?;

    println!("{} signed {}", "✔".green().bold(), output.display());
    Ok(())
}
