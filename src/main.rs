mod cli;
mod commands;
mod config;
mod graph;
mod paths;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

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

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Infer(args) => commands::infer::run(&ctx, args),
        Command::Diff(args) => commands::diff::run(&ctx, args),
        Command::Qualify(args) => commands::qualify::run(&ctx, args),
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Workflow(cmd) => commands::workflow::run(&ctx, cmd),
        Command::State(cmd) => commands::state::run(&ctx, cmd),
        Command::Config(cmd) => commands::config::run(&ctx, cmd),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "infragraph", &mut io::stdout());
            Ok(())
        }
    }
}
