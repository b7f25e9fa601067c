use anyhow::Result;
use clap::Parser;
use log::warn;

use rtu_addr_tool::cli::{self, Cli};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli::load_config(&cli)?;

    // Dropping the run future on Ctrl+C drops the session, which closes the port.
    let interrupted = tokio::select! {
        result = cli::run(cli, config) => {
            result?;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        warn!("🛑 Interrupted, serial port released");
        // stdin may still be blocked on a read the runtime would wait for
        std::process::exit(130);
    }

    Ok(())
}
