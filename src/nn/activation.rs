//! Activation functions as a closed set of variants.
//!
//! The encoder selects its nonlinearity from a configuration string once,
//! at construction. Unknown names are rejected there; the forward path
//! only ever sees a resolved variant.

use crate::error::{EnlaceError, Result};
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// Slope used by [`Activation::LeakyReLU`].
const LEAKY_RELU_SLOPE: f32 = 0.1;

/// Initial slope used by [`Activation::PReLU`].
const PRELU_SLOPE: f32 = 0.25;

/// The activation functions supported by the MPN encoder.
///
/// # Example
///
/// ```
/// use enlace::nn::Activation;
///
/// let act = Activation::parse("LeakyReLU").unwrap();
/// assert_eq!(act, Activation::LeakyReLU);
/// assert!(Activation::parse("swish").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// ReLU(x) = max(0, x)
    ReLU,
    /// LeakyReLU(x) = max(0.1 * x, x)
    LeakyReLU,
    /// PReLU with a fixed 0.25 slope (forward-only encoder).
    PReLU,
    /// tanh(x)
    Tanh,
}

impl Activation {
    /// Resolve an activation from its configuration name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` for unsupported names. This is a
    /// construction-time check; forward passes never re-validate.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "ReLU" => Ok(Self::ReLU),
            "LeakyReLU" => Ok(Self::LeakyReLU),
            "PReLU" => Ok(Self::PReLU),
            "tanh" => Ok(Self::Tanh),
            _ => Err(EnlaceError::hyperparameter(
                "activation",
                name,
                "one of ReLU, LeakyReLU, PReLU, tanh",
            )),
        }
    }

    /// Apply the activation elementwise to a scalar.
    #[inline]
    #[must_use]
    pub fn apply_scalar(self, x: f32) -> f32 {
        match self {
            Self::ReLU => x.max(0.0),
            Self::LeakyReLU => {
                if x > 0.0 {
                    x
                } else {
                    LEAKY_RELU_SLOPE * x
                }
            }
            Self::PReLU => {
                if x > 0.0 {
                    x
                } else {
                    PRELU_SLOPE * x
                }
            }
            Self::Tanh => x.tanh(),
        }
    }

    /// Apply the activation elementwise to a tensor.
    #[must_use]
    pub fn apply(self, x: &Tensor) -> Tensor {
        let data: Vec<f32> = x.data().iter().map(|&v| self.apply_scalar(v)).collect();
        Tensor::new(&data, x.shape())
    }
}
