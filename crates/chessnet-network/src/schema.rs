//! Persisted representation of a network.
//!
//! A network file is a JSON object with the architecture, a flat weight array and
//! the identity/record fields:
//!
//! ```json
//! {
//!   "layerSizes": [64, 8, 1],
//!   "activationNames": ["tanh", "sin"],
//!   "weights": [0.12, -0.31, ...],
//!   "wins": 2, "draws": 1, "losses": 0,
//!   "name": "Sky Titan",
//!   "parent1Name": "", "parent2Name": "",
//!   "generation": 0,
//!   "copyIndex": 0
//! }
//! ```
//!
//! Weights are flattened layer by layer, destination neuron by destination neuron,
//! source neuron by source neuron, which is exactly the order of
//! [`Network::weights`].

use serde::{Deserialize, Serialize};

use crate::{Activation, Identity, Network, NetworkError, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNetwork {
    pub layer_sizes: Vec<usize>,
    pub activation_names: Vec<String>,
    pub weights: Vec<f32>,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub draws: u32,
    #[serde(default)]
    pub losses: u32,
    pub name: String,
    #[serde(default)]
    pub parent1_name: String,
    #[serde(default)]
    pub parent2_name: String,
    #[serde(default)]
    pub generation: u32,
    #[serde(default)]
    pub copy_index: u32,
}

impl From<&Network> for SerializedNetwork {
    fn from(network: &Network) -> Self {
        let identity = network.identity();
        let record = network.record();
        Self {
            layer_sizes: network.layer_sizes().to_vec(),
            activation_names: network
                .activations()
                .map(|a| a.name().to_owned())
                .collect(),
            weights: network.weights().collect(),
            wins: record.wins,
            draws: record.draws,
            losses: record.losses,
            name: identity.name.clone(),
            parent1_name: identity.parent1.clone(),
            parent2_name: identity.parent2.clone(),
            generation: identity.generation,
            copy_index: identity.copy_index,
        }
    }
}

impl TryFrom<SerializedNetwork> for Network {
    type Error = NetworkError;

    fn try_from(value: SerializedNetwork) -> Result<Self, Self::Error> {
        let activations = value
            .activation_names
            .iter()
            .map(|name| name.parse::<Activation>())
            .collect::<Result<Vec<_>, _>>()?;
        let identity = Identity {
            name: value.name,
            copy_index: value.copy_index,
            generation: value.generation,
            parent1: value.parent1_name,
            parent2: value.parent2_name,
        };
        let record = Record {
            wins: value.wins,
            draws: value.draws,
            losses: value.losses,
        };
        Network::from_parts(
            value.layer_sizes,
            activations,
            &value.weights,
            identity,
            record,
        )
    }
}
