use std::process;

use clap::Parser;
use recordkit_cli::exit_codes::EXIT_ERROR;
use recordkit_cli::{commands, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    configure_logging(cli.verbose, cli.debug, cli.quiet);

    let exit_code = match commands::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!("command failed: {e:?}");
            eprintln!("Error: {e:#}");
            EXIT_ERROR
        }
    };
    process::exit(exit_code);
}

fn configure_logging(verbose: bool, debug: bool, quiet: bool) {
    use tracing::Level;
    use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

    let log_level = if quiet {
        Level::ERROR
    } else if debug {
        Level::DEBUG
    } else if verbose {
        Level::TRACE
    } else {
        Level::INFO
    };

    registry()
        .with(EnvFilter::new(format!(
            "recordkit_fields={log_level},recordkit_cli={log_level},warn"
        )))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
