use anyhow::Context as _;
use chessnet_network::Network;
use chessnet_training::{config::PipelineConfig, store::PopulationStore};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ListArg {
    /// Order by win/draw/loss record (wins + draws / 2) instead of file name
    #[arg(long)]
    by_score: bool,
}

fn score(network: &Network) -> f64 {
    let record = network.record();
    f64::from(record.wins) + f64::from(record.draws) / 2.0
}

fn lineage(network: &Network) -> String {
    let identity = network.identity();
    if identity.is_founder() {
        "founder".to_owned()
    } else {
        format!(
            "gen {} of {} + {}",
            identity.generation, identity.parent1, identity.parent2
        )
    }
}

pub(crate) fn run(config: &PipelineConfig, arg: &ListArg) -> anyhow::Result<()> {
    let store = PopulationStore::new(config.store.clone());
    let mut networks = store
        .list_all()
        .with_context(|| format!("Failed to load networks from {}", store.directory().display()))?;
    if arg.by_score {
        networks.sort_by(|a, b| score(b).total_cmp(&score(a)));
    }

    eprintln!(
        "{} networks in {}",
        networks.len(),
        store.directory().display()
    );
    for network in &networks {
        println!(
            "{:<32} {:<24} {:>12}  {}",
            network.to_string(),
            network.architecture(),
            network.record().to_string(),
            lineage(network)
        );
    }
    Ok(())
}
