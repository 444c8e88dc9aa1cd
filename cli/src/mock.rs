//! `in-toto mock`: `in-toto run` with defaults — records materials and
//! products in the current directory under a throwaway key and stores the
//! result as `<name>.link`, mirroring `in_toto_mock` from the Python
//! reference implementation.

use {crate::prelude::*, in_toto::crypto::ed25519::Ed25519Signer, std::time::Duration};

#[derive(Args, Clone, Debug)]
pub(crate) struct MockCommand {
    /// Unique name to relate the mock link with a step or inspection.
    name: String,

    /// Command to run and capture byproducts for.
    #[arg(last = true)]
    command: Vec<String>,

    /// Write the link as a DSSE envelope instead of the classic `{signed,signatures}` shape.
    #[arg(long)]
    dsse: bool,

    /// Write compact instead of pretty-printed JSON.
    #[arg(long)]
    compact_json: bool,
}

pub(crate) fn handle(cmd: MockCommand) -> AnyResult<(), CliError> {
    let signing_key = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
    let public_hex = hex::encode(signing_key.verifying_key().to_bytes());
    let keyid = in_toto::crypto::keyid_of_public_key("ed25519", "ed25519", &public_hex);
    let signer = Ed25519Signer::new(signing_key, keyid);

    let container = in_toto::recorder::record_run(
        &cmd.name,
        &[".".to_string()],
        &[".".to_string()],
        &cmd.command,
        &signer,
        &in_toto::resolver::ResolverOptions::default(),
        Some(Duration::from_secs(10)),
        cmd.dsse,
        true,
    )?;

    let filename = format!("{}.link", cmd.name);
    log::info!("storing unsigned mock link metadata to '{filename}'...");
    write_json(std::path::Path::new(&filename), &container.to_value()?, cmd.compact_json)?;

    println!("{} wrote {}", "✔".green().bold(), filename);
    Ok(())
}
