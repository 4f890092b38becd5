use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct CLI {
    #[command(subcommand)]
    pub(crate) command: BrewCommand,
}

/// Everything after the command name, flags included, in the order given.
#[derive(Debug, Args, Clone, PartialEq)]
pub struct RawArgs {
    /// Formula names and flags (`--verbose`, `-v`, `-di`, ...)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum BrewCommand {
    /// Check the host for things that could break builds
    Doctor(RawArgs),
    /// Fetch the newest formulae from the remote repository. `--json` prints the result as JSON
    Update(RawArgs),
    /// Show where the named formulae are defined
    Info(RawArgs),
    /// List the files of installed kegs, or every installed package when none are named
    List(RawArgs),
    /// Print the installation prefix
    Prefix,
    /// Print the formula repository root
    Repository,
    /// Print the cellar holding installed kegs
    Cellar,
    /// Print the download cache directory
    Cache,
    /// Print the usage summary
    Usage,
    #[command(name = "__doctor-checks", hide = true)]
    DoctorChecks,
}
