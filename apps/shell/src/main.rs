//! # Tote Entry Point
//!
//! `tote <command>`; see [`tote_shell::USAGE`].

use std::process::ExitCode;

use tote_shell::{Command, ShellError};

#[tokio::main]
async fn main() -> ExitCode {
    tote_shell::init_tracing();

    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    match tote_shell::run(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(ShellError::Usage(message)) => {
            eprintln!("{message}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
