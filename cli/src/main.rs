mod cli_conf;
mod completion;
mod conf;
mod display;
mod error;
mod keygen;
mod keys;
mod mock;
mod prelude;
mod record;
mod run;
mod sign;
mod verify_cmd;

use prelude::*;

#[derive(Parser)]
#[command(name = "in-toto", version, about = "Supply-chain integrity verification and recording")]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify a layout and its links.
    Verify(verify_cmd::VerifyCommand),
    /// Record a step's materials, command, and products in one shot.
    Run(run::RunCommand),
    /// Record a step across two invocations (`record start`/`record stop`).
    Record {
        #[command(subcommand)]
        command: record::RecordCommand,
    },
    /// Sign a layout or link file.
    Sign(sign::SignCommand),
    /// Run a step with a throwaway key and default `.` materials/products.
    Mock(mock::MockCommand),
    /// Generate a signing keypair.
    Keygen(keygen::KeygenCommand),
    /// Inspect or edit the CLI's own configuration file.
    Conf {
        #[command(subcommand)]
        command: conf::ConfCommand,
    },
    /// Generate shell completion scripts.
    Completion(completion::CompletionCommand),
}

fn main() {
    env_logger::init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let err: error::CliError = e.into();
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Verify(cmd) => verify_cmd::handle(cmd),
        Command::Run(cmd) => run::handle(cmd),
        Command::Record { command } => record::handle(command),
        Command::Sign(cmd) => sign::handle(cmd),
        Command::Mock(cmd) => mock::handle(cmd),
        Command::Keygen(cmd) => keygen::handle(cmd),
        Command::Conf { command } => conf::handle(command),
        Command::Completion(cmd) => completion::handle(cmd),
    };

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
