use thiserror::Error;

/// The user gave insufficient or ambiguous input.
///
/// The binary prints the usage text after any error that carries one of these.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    /// `next_arg()` had no matched token to continue from, or nothing followed it.
    #[error("Invalid usage: expected an argument")]
    MissingArgument,
    /// A command that needs package definitions was given no names.
    #[error("This command requires a formula argument")]
    FormulaUnspecified,
    /// A command that needs installed instances was given no names.
    #[error("This command requires a keg argument")]
    KegUnspecified,
}

/// Installed-instance lookup failures. Never resolved by guessing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KegError {
    #[error("{0} is not installed")]
    NotInstalled(String),
    #[error("{0} has multiple installed versions")]
    MultipleVersions(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormulaError {
    #[error("No available formula for {0}")]
    Unavailable(String),
}

/// An external command exited with a non-success status.
#[derive(Debug, Error)]
#[error("Failed while executing {command}{}", status_suffix(.status))]
pub struct ExecutionError {
    /// The full command line, program and arguments joined by spaces.
    pub command: String,
    /// Exit code, if the process exited normally.
    pub status: Option<i32>,
}

fn status_suffix(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!(" (exit status {code})"),
        None => String::new(),
    }
}
