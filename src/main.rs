// Entrypoint for the CLI application.
// - Parse arguments, set up logging, open the session.
// - Run one command, then always close the session so a refreshed or new
//   token reaches disk even when the command failed.

use clap::{CommandFactory, Parser};
use mstodo::api::RequestDispatcher;
use mstodo::cli::{Cli, Command};
use mstodo::config::ClientConfig;
use mstodo::session::Session;
use mstodo::{commands, ui};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "MSTODO_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let Some(command) = cli.command else {
        Cli::command().print_help().ok();
        println!();
        return ExitCode::SUCCESS;
    };

    match run(cli.client.into_config(), command, cli.verbose, cli.debug) {
        Ok(code) => code,
        Err(e) => {
            ui::error(&e, cli.verbose);
            ExitCode::FAILURE
        }
    }
}

fn run(
    config: ClientConfig,
    command: Command,
    verbose: bool,
    debug: bool,
) -> anyhow::Result<ExitCode> {
    let dispatcher = RequestDispatcher::new(&config)?.with_debug(debug);
    let mut session = Session::open_default(config)?;

    let outcome = commands::run(command, verbose, &mut session, &dispatcher);
    let closed = session.close();

    // Command errors take precedence over a failed save.
    let code = outcome?;
    closed?;
    Ok(code)
}

fn init_logging(debug: bool) {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ if debug => EnvFilter::new("warn,mstodo=debug"),
        _ => EnvFilter::new("warn"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
