#![forbid(unsafe_code)]

use std::io::Write as _;
use std::process::ExitCode;

use clap::Parser;
use formbind::cli::{Cli, run};

fn main() -> ExitCode {
    let cli = Cli::parse();
    formbind::logging::init(cli.verbose);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match run(&cli, &mut out) {
        Ok(()) => {
            let _ = out.flush();
            ExitCode::SUCCESS
        }
        Err(err) => {
            let _ = out.flush();
            tracing::debug!(error = ?err, "command failed");
            eprintln!("formbind: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
