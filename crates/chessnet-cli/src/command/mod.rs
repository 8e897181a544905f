use std::{io::Write as _, path::PathBuf};

use clap::{Parser, Subcommand};

use self::{create::CreateArg, list::ListArg, train::TrainArg};

mod create;
mod list;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Pipeline configuration file (JSON); missing fields take their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Run the analysis, training and duel cycle
    Train(#[clap(flatten)] TrainArg),
    /// Create networks and add them to the population
    Create(#[clap(flatten)] CreateArg),
    /// Show the stored population
    List(#[clap(flatten)] ListArg),
}

fn init_logger(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level),
    )
    .format(|buf, record| {
        writeln!(
            buf,
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        )
    })
    .target(env_logger::Target::Stderr)
    .init();
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_logger(args.debug);

    let config = crate::util::load_config(args.config.as_deref())?;
    match args.mode {
        Mode::Train(arg) => train::run(config, &arg)?,
        Mode::Create(arg) => create::run(&config, &arg)?,
        Mode::List(arg) => list::run(&config, &arg)?,
    }
    Ok(())
}
