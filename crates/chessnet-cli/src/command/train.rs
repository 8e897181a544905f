use std::path::PathBuf;

use anyhow::Context as _;
use chessnet_engine::{CancellationToken, MaterialEvaluator};
use chessnet_training::{
    config::{Language, PipelineConfig},
    events::LogSink,
    pipeline::Pipeline,
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Stop after this many cycles (default: run until Ctrl-C)
    #[arg(long)]
    cycles: Option<usize>,
    /// Network directory
    #[arg(long)]
    directory: Option<PathBuf>,
    /// Maximum curated positions per network
    #[arg(long)]
    dataset_size: Option<usize>,
    /// Training epochs per dataset
    #[arg(long)]
    repeats: Option<usize>,
    /// Duel rounds per cycle
    #[arg(long)]
    duel_iterations: Option<usize>,
    /// Population size after each duel phase
    #[arg(long)]
    max_networks: Option<usize>,
    /// Language of lifecycle messages (english, russian)
    #[arg(long)]
    language: Option<Language>,
    /// Seed for partitions, pairings and new architectures
    #[arg(long)]
    seed: Option<u64>,
}

impl TrainArg {
    fn apply(&self, config: &mut PipelineConfig) {
        let Self {
            cycles: _,
            directory,
            dataset_size,
            repeats,
            duel_iterations,
            max_networks,
            language,
            seed,
        } = self;
        if let Some(directory) = directory {
            config.store.directory.clone_from(directory);
        }
        if let Some(dataset_size) = *dataset_size {
            config.dataset_size = dataset_size;
        }
        if let Some(repeats) = *repeats {
            config.repeats = repeats;
        }
        if let Some(duel_iterations) = *duel_iterations {
            config.duel_iterations = duel_iterations;
        }
        if let Some(max_networks) = *max_networks {
            config.max_networks = max_networks;
        }
        if let Some(language) = *language {
            config.language = language;
        }
        if seed.is_some() {
            config.seed = *seed;
        }
    }
}

pub(crate) fn run(mut config: PipelineConfig, arg: &TrainArg) -> anyhow::Result<()> {
    arg.apply(&mut config);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        let installed = ctrlc::set_handler(move || {
            if !cancel.is_cancelled() {
                eprintln!("Received Ctrl-C: finishing the current games and samples ...");
            }
            cancel.cancel();
        });
        if let Err(e) = installed {
            log::warn!("failed to install Ctrl-C handler: {e}");
        }
    }

    let sink = LogSink::new(config.language);
    let mut pipeline = Pipeline::new(config, MaterialEvaluator, Box::new(sink), cancel)
        .context("Failed to start the training pipeline")?;
    let completed = pipeline.run(arg.cycles).context("Training pipeline failed")?;

    eprintln!("Completed cycles: {completed}");
    eprintln!("Population:");
    for network in pipeline.population() {
        eprintln!(
            "  {:<32} {:>12} gen {}",
            network.to_string(),
            network.record().to_string(),
            network.identity().generation
        );
    }
    Ok(())
}
