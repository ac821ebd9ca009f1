use std::process::ExitCode;

use ox9::cli;
use ox9::tools::Registry;

#[tokio::main]
async fn main() -> ExitCode {
    let registry = Registry::builtin();
    let argv: Vec<String> = std::env::args().collect();
    match cli::run(argv, &registry).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
