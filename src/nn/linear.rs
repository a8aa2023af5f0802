//! Fully connected (linear) layer.
//!
//! Implements the transformation y = xW^T + b.

use super::init::{xavier_uniform, zeros};
use super::module::Module;
use crate::tensor::Tensor;

/// Fully connected layer: y = xW^T + b
///
/// Weight initialization follows Xavier/Glorot (Glorot & Bengio, 2010).
///
/// # Shape
///
/// - Input: `(*, in_features)` where `*` means any number of batch dimensions
/// - Output: `(*, out_features)`
///
/// # Example
///
/// ```
/// use enlace::nn::{Linear, Module};
/// use enlace::tensor::Tensor;
///
/// let layer = Linear::with_seed(20, 30, Some(0));
/// let x = Tensor::ones(&[8, 20]);
/// assert_eq!(layer.forward(&x).shape(), &[8, 30]);
/// ```
pub struct Linear {
    /// Weight matrix, shape: [out_features, in_features]
    weight: Tensor,

    /// Cached transposed weight [in_features, out_features] for fast forward.
    weight_t: Tensor,

    /// Bias vector, shape: [out_features], or None if bias=false
    bias: Option<Tensor>,

    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Create a new Linear layer with Xavier initialization.
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self::with_seed(in_features, out_features, None)
    }

    /// Create a Linear layer with a specific random seed.
    pub fn with_seed(in_features: usize, out_features: usize, seed: Option<u64>) -> Self {
        let weight = xavier_uniform(&[out_features, in_features], in_features, out_features, seed);
        let weight_t = weight.transpose();
        let bias = zeros(&[out_features]);

        Self {
            weight,
            weight_t,
            bias: Some(bias),
            in_features,
            out_features,
        }
    }

    /// Create a Linear layer without bias.
    pub fn without_bias(in_features: usize, out_features: usize) -> Self {
        Self::without_bias_with_seed(in_features, out_features, None)
    }

    /// Create a Linear layer without bias with a specific random seed.
    pub fn without_bias_with_seed(
        in_features: usize,
        out_features: usize,
        seed: Option<u64>,
    ) -> Self {
        let weight = xavier_uniform(&[out_features, in_features], in_features, out_features, seed);
        let weight_t = weight.transpose();

        Self {
            weight,
            weight_t,
            bias: None,
            in_features,
            out_features,
        }
    }

    /// Get the input feature dimension.
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Get the output feature dimension.
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Check if this layer has a bias term.
    pub fn has_bias(&self) -> bool {
        self.bias.is_some()
    }

    /// Set weight tensor from external data (e.g. pre-derived parameters).
    ///
    /// Recomputes the cached transposed weight.
    ///
    /// # Panics
    ///
    /// Panics if the shape is not `[out_features, in_features]`.
    pub fn set_weight(&mut self, weight: Tensor) {
        assert_eq!(
            weight.shape(),
            &[self.out_features, self.in_features],
            "Weight shape must be [out, in]"
        );
        self.weight_t = weight.transpose();
        self.weight = weight;
    }

    /// Set bias tensor from external data.
    ///
    /// # Panics
    ///
    /// Panics if the length is not `out_features`.
    pub fn set_bias(&mut self, bias: Tensor) {
        assert_eq!(bias.numel(), self.out_features, "Bias length must be out_features");
        self.bias = Some(bias);
    }

    /// Get reference to weight tensor.
    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    /// Get reference to bias tensor if present.
    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }
}

impl Module for Linear {
    fn forward(&self, input: &Tensor) -> Tensor {
        // y = x @ W^T + b
        let input_shape = input.shape();
        let ndim = input_shape.len();

        // Flatten leading batch dimensions so gathered 3D inputs work too.
        let (reshaped, batch_shape) = if ndim > 2 {
            let batch_size: usize = input_shape[..ndim - 1].iter().product();
            let in_features = input_shape[ndim - 1];
            (
                input.view(&[batch_size, in_features]),
                Some(input_shape[..ndim - 1].to_vec()),
            )
        } else {
            (input.clone(), None)
        };

        let output = reshaped.matmul(&self.weight_t);

        let output = match &self.bias {
            Some(b) => output.broadcast_add(b),
            None => output,
        };

        match batch_shape {
            Some(mut shape) => {
                shape.push(self.out_features);
                output.view(&shape)
            }
            None => output,
        }
    }

    fn parameters(&self) -> Vec<&Tensor> {
        match &self.bias {
            Some(b) => vec![&self.weight, b],
            None => vec![&self.weight],
        }
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        match &mut self.bias {
            Some(b) => vec![&mut self.weight, b],
            None => vec![&mut self.weight],
        }
    }
}

impl std::fmt::Debug for Linear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linear")
            .field("in_features", &self.in_features)
            .field("out_features", &self.out_features)
            .field("bias", &self.bias.is_some())
            .finish_non_exhaustive()
    }
}
