//! The `Module` trait shared by all neural layers.

use crate::tensor::Tensor;

/// Interface for neural network layers.
///
/// Mirrors the forward/parameters/train-eval contract common to layer
/// libraries. Layers that need structure beyond a single input tensor
/// (like the MPN encoder) expose their own forward methods and implement
/// only the parameter plumbing here.
pub trait Module {
    /// Forward pass on a single input tensor.
    fn forward(&self, input: &Tensor) -> Tensor;

    /// All learnable parameter tensors, in a stable order.
    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    /// Mutable access to learnable parameters.
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }

    /// Switch to training mode (enables dropout).
    fn train(&mut self) {}

    /// Switch to evaluation mode (disables dropout).
    fn eval(&mut self) {}

    /// Whether the module is in training mode.
    fn training(&self) -> bool {
        false
    }

    /// Total number of scalar parameters.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }
}
