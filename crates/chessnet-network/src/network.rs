//! The feed-forward network and its training step.
//!
//! A [`Network`] is a stack of fully-connected layers. Layer transition `i` maps
//! `layer_sizes[i]` neurons to `layer_sizes[i + 1]` neurons through a weight matrix
//! stored row-major as `[destination][source]`, followed by the transition's
//! [`Activation`].
//!
//! # Forward Pass
//!
//! Input values of exactly `0.0` are replaced by `0.01` before entering the first
//! layer, so an empty square never zeroes out the gradient of its outgoing weights.
//!
//! # Back-Propagation
//!
//! [`Network::back_propagate`] performs one online (per-sample) gradient step with
//! the fixed [`LEARNING_RATE`]:
//!
//! 1. Forward pass, keeping every layer's activated values
//! 2. Output delta: `(output - target) · f'(output)`
//! 3. Walk transitions from last to first: update the transition's weights with
//!    `w -= delta_j · upstream_k · LEARNING_RATE`, then derive the upstream delta
//!    from the freshly updated weights and `f'(upstream activation)`
//!
//! The squared-error cost is returned for diagnostics only.

use std::{fmt, iter};

use rand::Rng;

use crate::{Activation, NetworkError};

/// Step size of [`Network::back_propagate`].
pub const LEARNING_RATE: f32 = 0.003;

/// Accepted input widths: one board plane or separate white/black planes.
pub const INPUT_SIZES: [usize; 2] = [64, 128];

/// The network always produces a single evaluation.
pub const OUTPUT_SIZE: usize = 1;

const ZERO_INPUT_SUBSTITUTE: f32 = 0.01;
const INITIAL_WEIGHT_RANGE: f32 = 0.5;

/// Name and lineage of a network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// Cosmetic name, not necessarily unique.
    pub name: String,
    /// Disambiguates networks sharing a name on disk.
    pub copy_index: u32,
    /// Number of crossovers separating this network from a founder.
    pub generation: u32,
    /// Name of the first parent; empty for founders.
    pub parent1: String,
    /// Name of the second parent; empty for founders.
    pub parent2: String,
}

impl Identity {
    /// Identity of a freshly created founder network.
    #[must_use]
    pub fn founder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns `true` if the network has no recorded parents.
    #[must_use]
    pub fn is_founder(&self) -> bool {
        self.parent1.is_empty() && self.parent2.is_empty()
    }
}

/// Accumulated duel results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Record {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

impl Record {
    #[must_use]
    pub fn games(&self) -> u32 {
        self.wins + self.draws + self.losses
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.wins, self.draws, self.losses)
    }
}

#[derive(Debug, Clone)]
struct Layer {
    inputs: usize,
    outputs: usize,
    activation: Activation,
    weights: Vec<f32>,
}

impl Layer {
    fn weight(&self, destination: usize, source: usize) -> f32 {
        self.weights[destination * self.inputs + source]
    }

    fn row(&self, destination: usize) -> &[f32] {
        let start = destination * self.inputs;
        &self.weights[start..start + self.inputs]
    }

    fn forward(&self, upstream: &[f32]) -> Vec<f32> {
        (0..self.outputs)
            .map(|j| {
                let sum = iter::zip(self.row(j), upstream)
                    .map(|(w, x)| w * x)
                    .sum::<f32>();
                self.activation.apply(sum)
            })
            .collect()
    }

    fn descend(&mut self, deltas: &[f32], upstream: &[f32], learning_rate: f32) {
        for (row, delta) in self.weights.chunks_exact_mut(self.inputs).zip(deltas) {
            for (w, x) in iter::zip(row, upstream) {
                *w -= delta * x * learning_rate;
            }
        }
    }
}

/// A fully-connected feed-forward evaluation network.
///
/// The network owns its weights, its [`Identity`] and its duel [`Record`]. Fitness
/// is a transient ranking value maintained by the duel stage and is never persisted.
#[derive(Debug, Clone)]
pub struct Network {
    layer_sizes: Vec<usize>,
    layers: Vec<Layer>,
    identity: Identity,
    record: Record,
    fitness: f32,
}

/// Checks the layer/activation invariants shared by every constructor.
pub fn validate_architecture(
    layer_sizes: &[usize],
    activations: &[Activation],
) -> Result<(), NetworkError> {
    let count = layer_sizes.len();
    if count < 2 {
        return Err(NetworkError::TooFewLayers { count });
    }
    if activations.len() != count - 1 {
        return Err(NetworkError::ActivationCount {
            layers: count,
            expected: count - 1,
            actual: activations.len(),
        });
    }
    if let Some(index) = layer_sizes.iter().position(|&size| size == 0) {
        return Err(NetworkError::EmptyLayer { index });
    }
    if !INPUT_SIZES.contains(&layer_sizes[0]) {
        return Err(NetworkError::InvalidInputSize {
            size: layer_sizes[0],
        });
    }
    if layer_sizes[count - 1] != OUTPUT_SIZE {
        return Err(NetworkError::InvalidOutputSize {
            size: layer_sizes[count - 1],
        });
    }
    Ok(())
}

fn weight_count(layer_sizes: &[usize]) -> usize {
    layer_sizes.windows(2).map(|w| w[0] * w[1]).sum()
}

impl Network {
    /// Creates a founder network with random weights in `[-0.5, 0.5]`.
    pub fn new(
        layer_sizes: Vec<usize>,
        activations: Vec<Activation>,
        name: impl Into<String>,
    ) -> Result<Self, NetworkError> {
        Self::random(&mut rand::rng(), layer_sizes, activations, name)
    }

    /// Same as [`Network::new`] with an explicit random number generator.
    pub fn random<R>(
        rng: &mut R,
        layer_sizes: Vec<usize>,
        activations: Vec<Activation>,
        name: impl Into<String>,
    ) -> Result<Self, NetworkError>
    where
        R: Rng + ?Sized,
    {
        validate_architecture(&layer_sizes, &activations)?;
        let weights = (0..weight_count(&layer_sizes))
            .map(|_| rng.random_range(-INITIAL_WEIGHT_RANGE..=INITIAL_WEIGHT_RANGE))
            .collect::<Vec<_>>();
        Self::from_parts(
            layer_sizes,
            activations,
            &weights,
            Identity::founder(name),
            Record::default(),
        )
    }

    /// Builds a network from a flat weight array (layer, destination, source order).
    pub fn from_parts(
        layer_sizes: Vec<usize>,
        activations: Vec<Activation>,
        weights: &[f32],
        identity: Identity,
        record: Record,
    ) -> Result<Self, NetworkError> {
        validate_architecture(&layer_sizes, &activations)?;
        let expected = weight_count(&layer_sizes);
        if weights.len() != expected {
            return Err(NetworkError::WeightCount {
                expected,
                actual: weights.len(),
            });
        }

        let mut rest = weights;
        let layers = iter::zip(layer_sizes.windows(2), activations)
            .map(|(sizes, activation)| {
                let (inputs, outputs) = (sizes[0], sizes[1]);
                let (head, tail) = rest.split_at(inputs * outputs);
                rest = tail;
                Layer {
                    inputs,
                    outputs,
                    activation,
                    weights: head.to_vec(),
                }
            })
            .collect();

        Ok(Self {
            layer_sizes,
            layers,
            identity,
            record,
            fitness: 0.0,
        })
    }

    #[must_use]
    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    pub fn activations(&self) -> impl Iterator<Item = Activation> + '_ {
        self.layers.iter().map(|l| l.activation)
    }

    /// Width of the encoded board this network expects.
    #[must_use]
    pub fn input_size(&self) -> usize {
        self.layer_sizes[0]
    }

    /// Returns `true` if both networks have identical layer sizes and activations.
    #[must_use]
    pub fn same_architecture(&self, other: &Self) -> bool {
        self.layer_sizes == other.layer_sizes && self.activations().eq(other.activations())
    }

    /// Short architecture description, e.g. `64-8-1 [tanh, sin]`.
    #[must_use]
    pub fn architecture(&self) -> String {
        let sizes = self
            .layer_sizes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("-");
        let activations = self
            .activations()
            .map(Activation::name)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{sizes} [{activations}]")
    }

    /// All weights in layer, destination, source order.
    pub fn weights(&self) -> impl Iterator<Item = f32> + '_ {
        self.layers.iter().flat_map(|l| l.weights.iter().copied())
    }

    pub(crate) fn weights_mut(&mut self) -> impl Iterator<Item = &mut f32> + '_ {
        self.layers.iter_mut().flat_map(|l| l.weights.iter_mut())
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    #[must_use]
    pub fn copy_index(&self) -> u32 {
        self.identity.copy_index
    }

    pub fn set_copy_index(&mut self, copy_index: u32) {
        self.identity.copy_index = copy_index;
    }

    pub(crate) fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }

    #[must_use]
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    #[must_use]
    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f32) {
        self.fitness = fitness;
    }

    /// Runs the forward pass and returns the activated values of every layer,
    /// input layer included.
    ///
    /// # Panics
    ///
    /// Panics if `input.len()` differs from [`Network::input_size`].
    #[must_use]
    pub fn forward(&self, input: &[f32]) -> Vec<Vec<f32>> {
        assert_eq!(
            input.len(),
            self.input_size(),
            "input width does not match the input layer"
        );
        let mut neurons = Vec::with_capacity(self.layer_sizes.len());
        neurons.push(
            input
                .iter()
                .map(|&x| if x == 0.0 { ZERO_INPUT_SUBSTITUTE } else { x })
                .collect::<Vec<_>>(),
        );
        for layer in &self.layers {
            let next = layer.forward(neurons.last().unwrap());
            neurons.push(next);
        }
        neurons
    }

    /// Evaluates an encoded position.
    ///
    /// # Panics
    ///
    /// Panics if `input.len()` differs from [`Network::input_size`].
    #[must_use]
    pub fn evaluate(&self, input: &[f32]) -> f32 {
        self.forward(input).last().unwrap()[0]
    }

    /// Performs one stochastic gradient step towards `target` and returns the
    /// squared-error cost measured before the update.
    ///
    /// # Panics
    ///
    /// Panics if `input.len()` differs from [`Network::input_size`] or if
    /// `target.len()` differs from the output size.
    pub fn back_propagate(&mut self, input: &[f32], target: &[f32]) -> f32 {
        let neurons = self.forward(input);
        let output = neurons.last().unwrap();
        assert_eq!(output.len(), target.len());

        let cost = iter::zip(output, target)
            .map(|(o, t)| (o - t).powi(2))
            .sum::<f32>()
            / 2.0;

        let last = self.layers.last().unwrap().activation;
        let mut deltas = iter::zip(output, target)
            .map(|(o, t)| (o - t) * last.derivative(*o))
            .collect::<Vec<_>>();

        for t in (0..self.layers.len()).rev() {
            let upstream = &neurons[t];
            self.layers[t].descend(&deltas, upstream, LEARNING_RATE);
            if t == 0 {
                break;
            }
            let layer = &self.layers[t];
            let upstream_activation = self.layers[t - 1].activation;
            deltas = (0..layer.inputs)
                .map(|j| {
                    let sum = (0..layer.outputs)
                        .map(|k| deltas[k] * layer.weight(k, j))
                        .sum::<f32>();
                    sum * upstream_activation.derivative(upstream[j])
                })
                .collect();
        }

        cost
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.identity.name, self.identity.copy_index)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn tanh_network(sizes: &[usize]) -> Network {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        Network::random(
            &mut rng,
            sizes.to_vec(),
            vec![Activation::Tanh; sizes.len() - 1],
            "Test Net",
        )
        .unwrap()
    }

    fn sample_input(width: usize) -> Vec<f32> {
        (0..width)
            .map(|i| match i % 5 {
                0 => 0.0,
                1 => 0.1,
                2 => -0.3,
                3 => 0.7,
                _ => -0.9,
            })
            .collect()
    }

    #[test]
    fn test_activation_count_mismatch_fails() {
        let err = Network::new(vec![64, 8, 1], vec![Activation::Tanh], "x").unwrap_err();
        assert!(matches!(
            err,
            NetworkError::ActivationCount {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_input_and_output_sizes_fail() {
        let err = Network::new(vec![32, 1], vec![Activation::Tanh], "x").unwrap_err();
        assert!(matches!(err, NetworkError::InvalidInputSize { size: 32 }));

        let err = Network::new(vec![64, 2], vec![Activation::Tanh], "x").unwrap_err();
        assert!(matches!(err, NetworkError::InvalidOutputSize { size: 2 }));

        let err = Network::new(vec![64], vec![], "x").unwrap_err();
        assert!(matches!(err, NetworkError::TooFewLayers { count: 1 }));

        let err = Network::new(
            vec![64, 0, 1],
            vec![Activation::Tanh, Activation::Tanh],
            "x",
        )
        .unwrap_err();
        assert!(matches!(err, NetworkError::EmptyLayer { index: 1 }));
    }

    #[test]
    fn test_random_weights_in_initial_range() {
        let network = tanh_network(&[128, 16, 4, 1]);
        assert_eq!(network.weights().count(), 128 * 16 + 16 * 4 + 4);
        assert!(network.weights().all(|w| (-0.5..=0.5).contains(&w)));
    }

    #[test]
    fn test_zero_input_is_substituted() {
        let network = tanh_network(&[64, 4, 1]);
        let neurons = network.forward(&[0.0; 64]);
        assert!(neurons[0].iter().all(|&x| x == 0.01));
        assert_eq!(
            network.evaluate(&[0.0; 64]),
            network.evaluate(&[0.01; 64])
        );
    }

    #[test]
    fn test_forward_matches_manual_computation() {
        let network = Network::from_parts(
            vec![64, 1],
            vec![Activation::Tanh],
            &[0.5; 64],
            Identity::founder("Manual"),
            Record::default(),
        )
        .unwrap();
        let output = network.evaluate(&[0.1; 64]);
        let expected = (64.0_f32 * 0.5 * 0.1).tanh();
        assert!((output - expected).abs() < 1e-6);
    }

    #[test]
    fn test_back_propagate_reduces_error() {
        let mut network = tanh_network(&[64, 8, 1]);
        let input = sample_input(64);
        let target = [0.25];
        let initial = (network.evaluate(&input) - target[0]).abs();
        for _ in 0..200 {
            network.back_propagate(&input, &target);
        }
        let trained = (network.evaluate(&input) - target[0]).abs();
        assert!(trained < initial, "{trained} >= {initial}");
    }

    #[test]
    fn test_back_propagate_returns_cost() {
        let mut network = tanh_network(&[64, 4, 1]);
        let input = sample_input(64);
        let output = network.evaluate(&input);
        let cost = network.back_propagate(&input, &[0.0]);
        assert!((cost - output * output / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_transition_gradient_step() {
        let mut network = Network::from_parts(
            vec![64, 1],
            vec![Activation::LeakyRelu],
            &[0.1; 64],
            Identity::founder("Linear"),
            Record::default(),
        )
        .unwrap();
        let input = [1.0; 64];
        // output = 6.4 (positive branch of leaky relu), derivative 1
        network.back_propagate(&input, &[0.4]);
        let expected = 0.1 - 6.0 * LEARNING_RATE;
        assert!(network.weights().all(|w| (w - expected).abs() < 1e-5));
    }

    #[test]
    fn test_architecture_comparison() {
        let a = tanh_network(&[64, 8, 1]);
        let b = tanh_network(&[64, 8, 1]);
        let c = tanh_network(&[64, 4, 1]);
        let d = Network::new(
            vec![64, 8, 1],
            vec![Activation::Sin, Activation::Tanh],
            "x",
        )
        .unwrap();
        assert!(a.same_architecture(&b));
        assert!(!a.same_architecture(&c));
        assert!(!a.same_architecture(&d));
        assert_eq!(d.architecture(), "64-8-1 [sin, tanh]");
    }

    #[test]
    fn test_display_includes_copy_index() {
        let mut network = tanh_network(&[64, 1]);
        network.set_copy_index(2);
        assert_eq!(network.to_string(), "Test Net (2)");
        assert_eq!(network.record().to_string(), "0/0/0");
    }
}
