//! Feed-forward evaluation networks for chess positions.
//!
//! This crate implements the model that the training pipeline evolves: a small,
//! fully-connected feed-forward network mapping an encoded board (64 or 128 inputs)
//! to a single scalar evaluation.
//!
//! # Modules
//!
//! - [`activation`] - The closed set of per-layer activation functions
//! - [`network`] - [`Network`]: forward pass, online back-propagation, identity and record
//! - [`genetic`] - Crossover, mutation, random architectures and names
//! - [`schema`] - On-disk JSON representation of a network
//!
//! # Lifecycle
//!
//! A network is created in one of three ways:
//!
//! 1. **Fresh** - [`Network::new`] with weights uniformly drawn from `[-0.5, 0.5]`
//! 2. **Crossover** - [`genetic::crossover`] of two parents sharing an architecture
//! 3. **Loaded** - [`schema::SerializedNetwork`] converted back with [`TryFrom`]
//!
//! # Example
//!
//! ```
//! use chessnet_network::{Activation, Network};
//!
//! let network = Network::new(
//!     vec![64, 8, 1],
//!     vec![Activation::Tanh, Activation::Tanh],
//!     "Alpha Net",
//! )
//! .unwrap();
//!
//! let output = network.evaluate(&[0.0; 64]);
//! assert!((-1.0..=1.0).contains(&output));
//! ```

pub use self::{activation::Activation, network::*};

pub mod activation;
pub mod genetic;
pub mod network;
pub mod schema;

/// Errors raised while building, loading or combining networks.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum NetworkError {
    #[display("network needs at least 2 layers, got {count}")]
    TooFewLayers { count: usize },
    #[display("input layer size must be 64 or 128, got {size}")]
    InvalidInputSize { size: usize },
    #[display("output layer size must be 1, got {size}")]
    InvalidOutputSize { size: usize },
    #[display("layer {index} has no neurons")]
    EmptyLayer { index: usize },
    #[display("expected {expected} activation functions for {layers} layers, got {actual}")]
    ActivationCount {
        layers: usize,
        expected: usize,
        actual: usize,
    },
    #[display("unknown activation function '{name}'")]
    UnknownActivation { name: String },
    #[display("expected {expected} weights, got {actual}")]
    WeightCount { expected: usize, actual: usize },
    #[display("cannot cross networks with different architectures ({left} vs {right})")]
    ArchitectureMismatch { left: String, right: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NetworkError::ActivationCount {
            layers: 3,
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "expected 2 activation functions for 3 layers, got 3"
        );
    }
}
