use anyhow::Result;
use clap::Parser;
use taskgrid::{cli, commands};

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_logging(args.verbose);
    let at = args.at.as_deref();
    let command = args.command.unwrap_or(cli::Command::Month {
        year: None,
        month: None,
    });
    match command {
        cli::Command::Init { name } => commands::init(name),
        cli::Command::Month { year, month } => commands::month(at, year, month),
        cli::Command::Week { date } => commands::week(at, date),
        cli::Command::Day { date } => commands::day(at, date),
        cli::Command::Stats => commands::stats(at),
        cli::Command::Notify { action } => commands::notify(at, action),
        cli::Command::Expired => commands::expired(at),
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}
