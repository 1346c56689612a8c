//! svcs CLI entry point.

use clap::Parser;
use svcs::cli::{self, Cli, Commands, EXIT_ERROR};

fn main() {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Diff(args) => cli::run_diff(&cli, args),
        Commands::Tree(args) => cli::run_tree(&cli, args),
        Commands::Catalog(args) => cli::run_catalog(&cli, args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
