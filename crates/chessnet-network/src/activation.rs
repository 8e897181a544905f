//! Per-layer activation functions.
//!
//! Every layer transition of a [`Network`](crate::Network) applies one scalar
//! activation to each weighted sum. The set of activations is closed: names are
//! parsed once when a network is built or loaded, and the forward/backward passes
//! dispatch on the [`Activation`] variant.
//!
//! # Derivative Convention
//!
//! [`Activation::derivative`] takes the **activated** value `y = f(x)`, not the
//! pre-activation `x`. For `tanh` this yields the exact derivative `1 - y²`; for the
//! other kinds the formula is applied to `y` as-is. Back-propagation relies on this
//! convention and never stores pre-activation sums.

use std::{fmt, str::FromStr};

use crate::NetworkError;

/// Activation function of a single layer transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activation {
    /// Hyperbolic tangent.
    Tanh,
    /// Leaky ReLU with a 0.01 slope for non-positive inputs.
    LeakyRelu,
    /// Arc tangent.
    ArcTan,
    /// Inverse square root unit: `x / sqrt(1 + x²)`.
    InverseSquare,
    /// Sine.
    Sin,
    /// Cardinal sine: `sin(x) / x`, with `sinc(0) = 1`.
    Sinc,
}

impl Activation {
    /// All activation kinds, in file-format order.
    pub const ALL: [Self; 6] = [
        Self::Tanh,
        Self::LeakyRelu,
        Self::ArcTan,
        Self::InverseSquare,
        Self::Sin,
        Self::Sinc,
    ];

    /// Name used in persisted network files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tanh => "tanh",
            Self::LeakyRelu => "leakyrelu",
            Self::ArcTan => "arctan",
            Self::InverseSquare => "invsquare",
            Self::Sin => "sin",
            Self::Sinc => "sinc",
        }
    }

    /// Applies the activation to a weighted sum.
    #[must_use]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Tanh => x.tanh(),
            Self::LeakyRelu => {
                if x <= 0.0 {
                    0.01 * x
                } else {
                    x
                }
            }
            Self::ArcTan => x.atan(),
            Self::InverseSquare => x / (1.0 + x * x).sqrt(),
            Self::Sin => x.sin(),
            Self::Sinc => {
                if x == 0.0 {
                    1.0
                } else {
                    x.sin() / x
                }
            }
        }
    }

    /// Derivative evaluated at an already activated value `y`.
    #[must_use]
    pub fn derivative(self, y: f32) -> f32 {
        match self {
            Self::Tanh => 1.0 - y * y,
            Self::LeakyRelu => {
                if y <= 0.0 {
                    0.01
                } else {
                    1.0
                }
            }
            Self::ArcTan => 1.0 / (y * y + 1.0),
            Self::InverseSquare => (1.0 / (1.0 + y * y).sqrt()).powi(3),
            Self::Sin => y.cos(),
            Self::Sinc => {
                if y == 0.0 {
                    0.0
                } else {
                    y.cos() / y - y.sin() / (y * y)
                }
            }
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "arctanh" is the legacy spelling written by older model files.
        match s {
            "arctanh" => Ok(Self::ArcTan),
            _ => Self::ALL
                .into_iter()
                .find(|a| a.name() == s)
                .ok_or_else(|| NetworkError::UnknownActivation {
                    name: s.to_owned(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for activation in Activation::ALL {
            assert_eq!(activation.name().parse::<Activation>().unwrap(), activation);
        }
    }

    #[test]
    fn test_legacy_arctanh_alias() {
        assert_eq!("arctanh".parse::<Activation>().unwrap(), Activation::ArcTan);
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = "relu".parse::<Activation>().unwrap_err();
        assert_eq!(err.to_string(), "unknown activation function 'relu'");
    }

    #[test]
    fn test_tanh_derivative_uses_activated_value() {
        let y = Activation::Tanh.apply(0.5);
        let expected = 1.0 - 0.5_f32.tanh().powi(2);
        assert!((Activation::Tanh.derivative(y) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_zero_handling() {
        assert_eq!(Activation::Sinc.apply(0.0), 1.0);
        assert_eq!(Activation::Sinc.derivative(0.0), 0.0);
        assert_eq!(Activation::LeakyRelu.apply(-2.0), -0.02);
        assert_eq!(Activation::LeakyRelu.derivative(0.0), 0.01);
        assert_eq!(Activation::LeakyRelu.derivative(3.0), 1.0);
    }
}
