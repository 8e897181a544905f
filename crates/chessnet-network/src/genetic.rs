//! Genetic operators on networks.
//!
//! These functions implement the variation side of the evolutionary loop. Selection
//! (which networks survive, which are replaced) lives in the training crate; this
//! module only knows how to produce new networks.
//!
//! # Operators
//!
//! - [`crossover`] - Uniform per-weight crossover of two same-architecture parents,
//!   followed by a light mutation
//! - [`Network::mutate`] - Uniform perturbation of a random subset of weights
//! - [`random_architecture`] / [`random_network`] - Brand-new founders with a random
//!   depth, layer sizes and activations
//! - [`generate_name`] - Cosmetic two-word names
//!
//! # Uniform Crossover
//!
//! Each weight of the child is copied from parent A or parent B with equal
//! probability. Children are never blends of both parents, so any weight of an
//! unmutated child can be traced back to exactly one parent. Parents must share
//! layer sizes and activations; mismatched parents are rejected with
//! [`NetworkError::ArchitectureMismatch`].

use rand::{Rng, seq::IndexedRandom};

use crate::{Activation, Network, NetworkError, network::INPUT_SIZES};

/// Candidate sizes for hidden layers of random architectures.
pub const HIDDEN_SIZES: [usize; 7] = [128, 64, 32, 16, 8, 4, 2];

/// Depth range (number of layers, input and output included) of random architectures.
pub const DEPTH_RANGE: std::ops::RangeInclusive<usize> = 3..=5;

/// Mutation probability (percent) applied to every crossover child.
pub const CROSSOVER_MUTATION_PERCENT: u32 = 10;

/// Mutation magnitude applied to every crossover child.
pub const CROSSOVER_MUTATION_MAGNITUDE: f32 = 0.3;

const FIRST_NAMES: [&str; 8] = [
    "Test",
    "Betta",
    "Alpha",
    "Sky",
    "Chess",
    "Neural",
    "Perfect",
    "Unstoppable",
];

const SECOND_NAMES: [&str; 7] = [
    "Net",
    "Champion",
    "Master",
    "Titan",
    "Grandmaster",
    "Calculator",
    "Predictor",
];

/// Generates a two-word cosmetic name such as `"Sky Titan"`.
///
/// Names are not unique; on-disk collisions are resolved by the copy index.
pub fn generate_name<R>(rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    let first = FIRST_NAMES.choose(rng).unwrap();
    let second = SECOND_NAMES.choose(rng).unwrap();
    format!("{first} {second}")
}

/// Draws a random layer structure and activation list.
///
/// Depth is uniform in [`DEPTH_RANGE`], the input size is one of
/// [`INPUT_SIZES`](crate::INPUT_SIZES), hidden sizes come from [`HIDDEN_SIZES`]
/// and the output size is always 1. Every transition gets an independently drawn
/// activation.
pub fn random_architecture<R>(rng: &mut R) -> (Vec<usize>, Vec<Activation>)
where
    R: Rng + ?Sized,
{
    let depth = rng.random_range(DEPTH_RANGE);
    let mut layer_sizes = Vec::with_capacity(depth);
    layer_sizes.push(*INPUT_SIZES.choose(rng).unwrap());
    for _ in 1..depth - 1 {
        layer_sizes.push(*HIDDEN_SIZES.choose(rng).unwrap());
    }
    layer_sizes.push(crate::OUTPUT_SIZE);

    let activations = (0..depth - 1)
        .map(|_| *Activation::ALL.choose(rng).unwrap())
        .collect();
    (layer_sizes, activations)
}

/// Creates a founder with a random architecture, random weights and a random name.
pub fn random_network<R>(rng: &mut R) -> Network
where
    R: Rng + ?Sized,
{
    let (layer_sizes, activations) = random_architecture(rng);
    let name = generate_name(rng);
    Network::random(rng, layer_sizes, activations, name)
        .expect("random architectures always satisfy the layer invariants")
}

/// Uniform crossover without the follow-up mutation.
///
/// The child takes parent A's architecture, gets a fresh name, records both
/// parents and has generation `a.generation + 1`. Its duel record starts empty.
pub fn uniform_crossover<R>(a: &Network, b: &Network, rng: &mut R) -> Result<Network, NetworkError>
where
    R: Rng + ?Sized,
{
    if !a.same_architecture(b) {
        return Err(NetworkError::ArchitectureMismatch {
            left: a.architecture(),
            right: b.architecture(),
        });
    }

    let mut child = a.clone();
    for (w, from_b) in child.weights_mut().zip(b.weights()) {
        if rng.random_bool(0.5) {
            *w = from_b;
        }
    }

    let identity = child.identity_mut();
    identity.name = generate_name(rng);
    identity.copy_index = 0;
    identity.generation = a.identity().generation + 1;
    identity.parent1 = a.name().to_owned();
    identity.parent2 = b.name().to_owned();
    *child.record_mut() = crate::Record::default();
    child.set_fitness(0.0);

    Ok(child)
}

/// Crosses two parents and mutates the child with
/// [`CROSSOVER_MUTATION_PERCENT`] / [`CROSSOVER_MUTATION_MAGNITUDE`].
///
/// # Example
///
/// ```
/// use chessnet_network::{Activation, Network, genetic};
///
/// let a = Network::new(vec![64, 4, 1], vec![Activation::Tanh; 2], "Alpha Net").unwrap();
/// let b = Network::new(vec![64, 4, 1], vec![Activation::Tanh; 2], "Sky Titan").unwrap();
///
/// let child = genetic::crossover(&a, &b, &mut rand::rng()).unwrap();
/// assert_eq!(child.layer_sizes(), a.layer_sizes());
/// assert_eq!(child.identity().generation, 1);
/// assert_eq!(child.identity().parent1, "Alpha Net");
/// ```
pub fn crossover<R>(a: &Network, b: &Network, rng: &mut R) -> Result<Network, NetworkError>
where
    R: Rng + ?Sized,
{
    let mut child = uniform_crossover(a, b, rng)?;
    child.mutate(CROSSOVER_MUTATION_PERCENT, CROSSOVER_MUTATION_MAGNITUDE, rng);
    Ok(child)
}

/// Applies uniform mutation to a weight slice in-place.
///
/// Each weight is perturbed with probability `probability_percent / 100`
/// (clamped to 100) by a value drawn uniformly from `[-magnitude, magnitude]`.
pub fn mutate_weights<'a, I, R>(weights: I, probability_percent: u32, magnitude: f32, rng: &mut R)
where
    I: IntoIterator<Item = &'a mut f32>,
    R: Rng + ?Sized,
{
    let probability = f64::from(probability_percent.min(100)) / 100.0;
    let magnitude = magnitude.abs();
    for w in weights {
        if rng.random_bool(probability) {
            *w += rng.random_range(-magnitude..=magnitude);
        }
    }
}

impl Network {
    /// Perturbs each weight with probability `probability_percent / 100` by a
    /// uniform value in `[-magnitude, magnitude]`.
    pub fn mutate<R>(&mut self, probability_percent: u32, magnitude: f32, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        mutate_weights(self.weights_mut(), probability_percent, magnitude, rng);
    }
}
