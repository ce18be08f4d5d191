mod cli;
mod config;
mod inventory;
mod output;
mod run;
mod ui;

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use cli::Cli;
use config::RunConfig;
use inventory::CommandSource;
use output::{FailureLog, OutputSink};
use run::SshDialer;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    // Fatal startup errors: unresolvable hosts, commands, or credentials.
    let hosts = inventory::load_hosts(&cli)?;
    let source = CommandSource::from_cli(&cli)?;
    let config = RunConfig::resolve(&cli)?;

    let run_stamp = output::timestamp();
    let sink = OutputSink::from_config(&config, &run_stamp);
    let failure_log = FailureLog::new(Path::new("."), &run_stamp);
    let dialer = SshDialer::new(&config);

    let results = run::execute(&hosts, &source, &dialer, &sink, &failure_log)?;
    run::print_summary(&results, &failure_log);

    Ok(())
}
