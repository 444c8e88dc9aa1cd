use {
    crate::{display::*, prelude::*},
    thiserror::Error,
};

/// Custom error definitions for the in-toto CLI. Takes care of displaying
/// a pretty summary in the console.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("{error}{separator}\n{0}", error = "Syntax Error".red().bold(), separator = separator())]
    SyntaxError(clap::error::Error),
    #[error("{error}{separator}\n{0}", error = "IO Error".red().bold(), separator = separator())]
    IoError(std::io::Error),
    #[error("{error}{separator}\n{0}", error = "in-toto Error".red().bold(), separator = separator())]
    InTotoError(in_toto::InTotoError),
    #[error("{error}{separator}\n{0}", error = "JSON Error".red().bold(), separator = separator())]
    JsonError(serde_json::Error),
    #[error("{error}{separator}\n{0}", error = "Error".red().bold(), separator = separator())]
    AnyError(anyhow::Error),
}

impl From<clap::error::Error> for CliError {
    fn from(e: clap::error::Error) -> Self {
        CliError::SyntaxError(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::IoError(e)
    }
}

impl From<in_toto::InTotoError> for CliError {
    fn from(e: in_toto::InTotoError) -> Self {
        CliError::InTotoError(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::JsonError(e)
    }
}

impl From<anyhow::Error> for CliError {
    fn from(e: anyhow::Error) -> Self {
        CliError::AnyError(e)
    }
}
