//! Command-line front end for the cancel / withdrawal form.

use std::io;

use thiserror::Error;

use crate::errors::FormError;

pub mod forms;
pub mod output;
mod shell;

pub use shell::run_cli;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Form(#[from] FormError),
}

pub type CommandResult = Result<(), CommandError>;
