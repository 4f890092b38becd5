mod cli;
mod execute;

use clap::Parser;
use brewctl::*;
use crate::cli::CLI;

fn main() {
    let cli = CLI::parse();
    init_colors();
    if let Err(e) = execute::execute(cli, EnvFlags::from_env()) {
        onoe(&format!("{e:#}"));
        std::process::exit(1);
    }
}
