//! Binary entrypoint for the `almsync` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // Credentials may live in a local .env file.
    let _ = dotenvy::dotenv();

    match almsync::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
