//! # enlace
//!
//! Molecular encoder: SMILES notations in, fixed-width vectors out.
//!
//! The pipeline has two halves. [`graph`] parses and featurizes
//! molecules, flattening a batch into dense index-addressed tensors with
//! a sentinel zero slot so ragged adjacency pads harmlessly. [`mpn`]
//! runs directed-bond message passing over those tensors and mean-pools
//! atom vectors into one encoding per molecule.
//!
//! ## Quick start
//!
//! ```
//! use enlace::graph::{BatchOptions, GraphBuilder};
//! use enlace::mpn::{Mpn, MpnConfig};
//!
//! # fn main() -> enlace::Result<()> {
//! let mut builder = GraphBuilder::new(BatchOptions::default());
//! let graph = builder.mol2graph(&["CCO", "c1ccccc1", "CC(=O)O"])?;
//!
//! let mpn = Mpn::new(MpnConfig::default().with_hidden_size(64).with_seed(42))?;
//! let encodings = mpn.forward(&graph);
//! assert_eq!(encodings.shape(), &[3, 64]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`chem`]: SMILES parsing, hydrogen transforms, distance matrices,
//!   deterministic conformer embedding
//! - [`featurize`]: one-hot-with-overflow encodings for atoms and bonds
//! - [`graph`]: batching into [`graph::MolGraph`] with memoization
//! - [`mpn`]: the message passing encoder and task head
//! - [`nn`]: linear layers, dropout, activations, functional helpers
//! - [`tensor`]: the minimal dense float tensor these are built on

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chem;
pub mod error;
pub mod featurize;
pub mod graph;
pub mod mpn;
pub mod nn;
pub mod tensor;

pub use error::{EnlaceError, Result};
pub use graph::{BatchOptions, GraphBuilder, MolGraph};
pub use mpn::{Mpn, MpnConfig, MpnPredictor};
pub use tensor::Tensor;
