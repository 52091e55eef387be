use shardget_core::logging;

mod cli;

use crate::cli::{exit_code, CliCommand};

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(err) = CliCommand::run_from_args().await {
        let code = exit_code(&err);
        if code == cli::EXIT_CANCELLED {
            eprintln!("cancelled");
        } else {
            eprintln!("shardget error: {:#}", err);
        }
        std::process::exit(code);
    }
}
