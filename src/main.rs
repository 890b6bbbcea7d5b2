//! Changegate CLI entry point.

use clap::Parser;
use changegate::cli::{self, Cli, Commands, EXIT_ERROR};

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Validate(args) => match cli::run_validate(&args) {
            Ok(code) => code,
            Err(e) => {
                // Unexpected internal errors surface as "ask": the gate
                // could not assess the change.
                eprintln!("Error: cannot assess change: {}", e);
                EXIT_ERROR
            }
        },
        Commands::Init(args) => match cli::run_init(&args) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {}", e);
                EXIT_ERROR
            }
        },
    };

    std::process::exit(exit_code);
}
