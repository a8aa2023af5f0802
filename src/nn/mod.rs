//! Neural network building blocks for the MPN encoder.
//!
//! The module is organized around the [`Module`] trait, which defines the
//! interface for all layers:
//!
//! - **Layers**: [`Linear`]
//! - **Regularization**: [`Dropout`]
//! - **Activations**: [`Activation`] (closed variant set resolved at
//!   construction)
//! - **Functional**: [`functional`] for the padded index gather and
//!   softmax helpers used by the message passing forward path
//!
//! # References
//!
//! - Glorot, X., & Bengio, Y. (2010). Understanding the difficulty of training
//!   deep feedforward neural networks. AISTATS.
//! - Srivastava, N., et al. (2014). Dropout: A simple way to prevent neural
//!   networks from overfitting. JMLR.

mod activation;
mod dropout;
pub mod functional;
pub mod init;
mod linear;
mod module;

pub use activation::Activation;
pub use dropout::Dropout;
pub use functional as F;
pub use linear::Linear;
pub use module::Module;
