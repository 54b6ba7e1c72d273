use clap::Parser;
use dval_core::logging;

mod cli;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();

    // One log file per run, named after the validator.
    let app = cli.command.app_name();
    let log = match logging::init_logging(app) {
        Ok(ctx) => ctx,
        Err(e) => {
            let ctx = logging::init_logging_stderr(app);
            tracing::warn!("file logging unavailable, using stderr: {:#}", e);
            ctx
        }
    };

    let result = cli.run(&log);
    if let Err(err) = &result {
        tracing::error!("{:#}", err);
    }
    log.finish();
    if let Err(err) = result {
        eprintln!("dval error: {:#}", err);
        std::process::exit(1);
    }
}
