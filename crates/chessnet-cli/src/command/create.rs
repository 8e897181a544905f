use anyhow::{Context as _, ensure};
use chessnet_network::{Activation, Network, genetic};
use chessnet_training::{config::PipelineConfig, store::PopulationStore};
use rand::Rng;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct CreateArg {
    /// Number of networks to create
    #[arg(long, default_value_t = 1)]
    count: usize,
    /// Layer sizes, e.g. `64,32,1` (default: random architecture)
    #[arg(long, value_delimiter = ',', requires = "activations")]
    layers: Vec<usize>,
    /// One activation per layer transition, e.g. `tanh,sin`
    #[arg(long, value_delimiter = ',', requires = "layers")]
    activations: Vec<Activation>,
    /// Network name (default: random)
    #[arg(long)]
    name: Option<String>,
}

fn validate_name(name: &str) -> anyhow::Result<()> {
    ensure!(!name.trim().is_empty(), "Network name must not be empty");
    ensure!(
        !name.contains(['/', '\\']) && !name.contains(".."),
        "Network name must not contain path separators or `..`: {name:?}"
    );
    Ok(())
}

fn build_network<R>(arg: &CreateArg, rng: &mut R) -> anyhow::Result<Network>
where
    R: Rng + ?Sized,
{
    let (layers, activations) = if arg.layers.is_empty() {
        genetic::random_architecture(rng)
    } else {
        (arg.layers.clone(), arg.activations.clone())
    };
    let name = match &arg.name {
        Some(name) => {
            validate_name(name)?;
            name.clone()
        }
        None => genetic::generate_name(rng),
    };
    let network =
        Network::random(rng, layers, activations, name).context("Invalid network structure")?;
    Ok(network)
}

pub(crate) fn run(config: &PipelineConfig, arg: &CreateArg) -> anyhow::Result<()> {
    let store = PopulationStore::new(config.store.clone());
    let mut rng = rand::rng();
    for _ in 0..arg.count {
        let mut network = build_network(arg, &mut rng)?;
        let path = store
            .save(&mut network, false)
            .context("Failed to save network")?;
        eprintln!(
            "Created {network} [{}] -> {}",
            network.architecture(),
            path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chessnet_training::config::StoreConfig;

    use super::*;

    #[test]
    fn test_explicit_structure() {
        let arg = CreateArg {
            count: 1,
            layers: vec![128, 16, 1],
            activations: vec![Activation::LeakyRelu, Activation::Tanh],
            name: Some("Chess Titan".to_owned()),
        };
        let network = build_network(&arg, &mut rand::rng()).unwrap();
        assert_eq!(network.layer_sizes(), [128, 16, 1]);
        assert_eq!(network.name(), "Chess Titan");
        assert!(network.identity().is_founder());
    }

    #[test]
    fn test_invalid_structure_is_rejected() {
        let arg = CreateArg {
            count: 1,
            layers: vec![100, 1],
            activations: vec![Activation::Tanh],
            name: None,
        };
        assert!(build_network(&arg, &mut rand::rng()).is_err());
    }

    #[test]
    fn test_name_must_stay_inside_directory() {
        for name in ["../Escape", "a/b", "a\\b", "..", "", "  "] {
            let arg = CreateArg {
                name: Some(name.to_owned()),
                ..CreateArg::default()
            };
            assert!(build_network(&arg, &mut rand::rng()).is_err(), "{name:?}");
        }
        let arg = CreateArg {
            name: Some("Dr. Net".to_owned()),
            ..CreateArg::default()
        };
        assert_eq!(build_network(&arg, &mut rand::rng()).unwrap().name(), "Dr. Net");
    }

    #[test]
    fn test_create_saves_copies() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            store: StoreConfig {
                directory: dir.path().to_owned(),
                ..StoreConfig::default()
            },
            ..PipelineConfig::default()
        };
        let arg = CreateArg {
            count: 3,
            name: Some("Sky Net".to_owned()),
            ..CreateArg::default()
        };
        run(&config, &arg).unwrap();

        let store = PopulationStore::new(config.store.clone());
        let networks = store.list_all().unwrap();
        assert_eq!(networks.len(), 3);
        assert!(networks.iter().all(|n| n.name() == "Sky Net"));
    }
}
