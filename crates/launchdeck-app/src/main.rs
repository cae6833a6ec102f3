use std::process::ExitCode;

use clap::Parser;
use launchdeck_app::fatal;

mod cli;

fn main() -> ExitCode {
    fatal::install_panic_hook();

    if let Err(e) = launchdeck_core::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let args = cli::Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            fatal::report(&format!("Failed to start async runtime: {}", e));
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::execute(args)) {
        Ok(code) => code,
        Err(e) => {
            fatal::report(&format!("{:?}", e));
            ExitCode::FAILURE
        }
    }
}
