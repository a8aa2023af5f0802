//! Directed-bond message passing network over batched molecular graphs.
//!
//! Messages live on directed bonds. Each round, a bond's incoming
//! messages (excluding its own reverse) are summed, projected, added to
//! the bond's input projection, and passed through the activation. After
//! the final round messages aggregate onto atoms, and atom vectors
//! mean-pool per molecule. Optional message attention reweights incoming
//! messages before summation, and optional self attention mixes atom
//! vectors within a molecule before pooling.

use serde::{Deserialize, Serialize};

use crate::error::{EnlaceError, Result};
use crate::featurize::{bond_fdim, ATOM_FDIM};
use crate::graph::MolGraph;
use crate::nn::{Activation, Dropout, Linear, Module, F};
use crate::tensor::Tensor;

/// Hyperparameters of the encoder.
///
/// `three_d` and `virtual_edges` must match the [`BatchOptions`] used to
/// build the graphs this encoder consumes, since they set the bond
/// feature width.
///
/// [`BatchOptions`]: crate::graph::BatchOptions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpnConfig {
    /// Width of bond messages and atom vectors.
    pub hidden_size: usize,
    /// Number of message passing rounds; `depth - 1` update steps.
    pub depth: usize,
    /// Dropout probability applied to messages and atom vectors while
    /// training.
    pub dropout: f32,
    /// Nonlinearity shared by every stage.
    pub activation: Activation,
    /// Reweight incoming messages with learned attention.
    pub message_attention: bool,
    /// Mix atom vectors with self attention before pooling.
    pub self_attention: bool,
    /// Expect a 3D distance scalar in bond features.
    pub three_d: bool,
    /// Expect virtual-edge features (topological distance one-hot).
    pub virtual_edges: bool,
    /// Seed for weight initialization and dropout. `None` draws from
    /// entropy.
    pub seed: Option<u64>,
}

impl Default for MpnConfig {
    fn default() -> Self {
        Self {
            hidden_size: 300,
            depth: 3,
            dropout: 0.0,
            activation: Activation::ReLU,
            message_attention: false,
            self_attention: false,
            three_d: false,
            virtual_edges: false,
            seed: None,
        }
    }
}

impl MpnConfig {
    /// Set the message and atom vector width.
    #[must_use]
    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    /// Set the number of message passing rounds.
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Set the dropout probability.
    #[must_use]
    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    /// Set the nonlinearity.
    #[must_use]
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Resolve the activation from its configuration name.
    ///
    /// # Errors
    ///
    /// Returns [`EnlaceError::InvalidHyperparameter`] for unknown names.
    pub fn with_activation_name(mut self, name: &str) -> Result<Self> {
        self.activation = Activation::parse(name)?;
        Ok(self)
    }

    /// Toggle attention over incoming messages.
    #[must_use]
    pub fn with_message_attention(mut self, on: bool) -> Self {
        self.message_attention = on;
        self
    }

    /// Toggle self attention over atoms before pooling.
    #[must_use]
    pub fn with_self_attention(mut self, on: bool) -> Self {
        self.self_attention = on;
        self
    }

    /// Pin initialization and dropout to a seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.hidden_size == 0 {
            return Err(EnlaceError::hyperparameter(
                "hidden_size",
                self.hidden_size.to_string(),
                "must be at least 1",
            ));
        }
        if self.depth == 0 {
            return Err(EnlaceError::hyperparameter(
                "depth",
                self.depth.to_string(),
                "must be at least 1",
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(EnlaceError::hyperparameter(
                "dropout",
                self.dropout.to_string(),
                "must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

/// The message passing encoder: a batch of molecular graphs in, one
/// vector per molecule out.
///
/// # Examples
///
/// ```
/// use enlace::graph::{BatchOptions, GraphBuilder};
/// use enlace::mpn::{Mpn, MpnConfig};
///
/// let mut builder = GraphBuilder::new(BatchOptions::default());
/// let graph = builder.mol2graph(&["CCO", "c1ccccc1"]).unwrap();
/// let mpn = Mpn::new(MpnConfig::default().with_hidden_size(16).with_seed(0)).unwrap();
/// let encodings = mpn.forward(&graph);
/// assert_eq!(encodings.shape(), &[2, 16]);
/// ```
#[derive(Debug)]
pub struct Mpn {
    config: MpnConfig,
    w_i: Linear,
    w_h: Linear,
    w_o: Linear,
    w_a: Option<Linear>,
    w_b: Option<Linear>,
    w_ma: Option<Linear>,
    dropout: Dropout,
    training: bool,
}

impl Mpn {
    /// Construct an encoder, initializing weights with seeded Xavier
    /// when the config carries a seed.
    ///
    /// # Errors
    ///
    /// Returns [`EnlaceError::InvalidHyperparameter`] for an out-of-range
    /// config.
    pub fn new(config: MpnConfig) -> Result<Self> {
        config.validate()?;
        let h = config.hidden_size;
        let bond_in = ATOM_FDIM + bond_fdim(config.three_d, config.virtual_edges);

        // One seed stream per layer so adding an optional layer never
        // shifts the others.
        let seed_for = |slot: u64| config.seed.map(|seed| seed.wrapping_add(slot));

        let w_i = Linear::without_bias_with_seed(bond_in, h, seed_for(0));
        let w_h = Linear::without_bias_with_seed(h, h, seed_for(1));
        let w_o = Linear::with_seed(ATOM_FDIM + h, h, seed_for(2));
        let w_a = config
            .self_attention
            .then(|| Linear::without_bias_with_seed(h, h, seed_for(3)));
        let w_b = config
            .self_attention
            .then(|| Linear::with_seed(h, h, seed_for(4)));
        let w_ma = config
            .message_attention
            .then(|| Linear::without_bias_with_seed(h, 1, seed_for(5)));

        let mut dropout = match config.seed {
            Some(s) => Dropout::with_seed(config.dropout, s.wrapping_add(100)),
            None => Dropout::new(config.dropout),
        };
        dropout.eval();

        Ok(Self {
            config,
            w_i,
            w_h,
            w_o,
            w_a,
            w_b,
            w_ma,
            dropout,
            training: false,
        })
    }

    /// The config this encoder was built with.
    #[must_use]
    pub fn config(&self) -> &MpnConfig {
        &self.config
    }

    /// Enable dropout.
    pub fn train(&mut self) {
        self.training = true;
        self.dropout.train();
    }

    /// Disable dropout (the default).
    pub fn eval(&mut self) {
        self.training = false;
        self.dropout.eval();
    }

    /// Whether dropout is active.
    #[must_use]
    pub fn training(&self) -> bool {
        self.training
    }

    /// Encode a batch into `[n_mols, hidden_size]`.
    ///
    /// # Panics
    ///
    /// Panics if the graph's bond feature width disagrees with the
    /// config's `three_d` / `virtual_edges` flags.
    #[must_use]
    pub fn forward(&self, graph: &MolGraph) -> Tensor {
        let expected = ATOM_FDIM + bond_fdim(self.config.three_d, self.config.virtual_edges);
        assert_eq!(
            graph.fbonds.shape()[1],
            expected,
            "Graph bond width {} does not match encoder input width {expected}",
            graph.fbonds.shape()[1]
        );

        let act = self.config.activation;
        let h = self.config.hidden_size;

        let binput = self.w_i.forward(&graph.fbonds);
        let mut message = act.apply(&binput);

        for _ in 1..self.config.depth {
            let mut nei = F::index_select_nd(&message, &graph.bgraph);
            if let Some(w_ma) = &self.w_ma {
                self.attend_messages(&mut nei, w_ma, graph);
            }
            let summed = F::sum_dim1(&nei);
            let updated = binput.add(&self.w_h.forward(&summed));
            message = self.dropout.forward(&act.apply(&updated));
        }

        let nei = F::index_select_nd(&message, &graph.agraph);
        let summed = F::sum_dim1(&nei);
        let ainput = graph.fatoms.concat_cols(&summed);
        let atom_hiddens = self.dropout.forward(&act.apply(&self.w_o.forward(&ainput)));

        let mut pooled = Tensor::zeros(&[graph.n_mols(), h]);
        for (m, &(offset, len)) in graph.scope.iter().enumerate() {
            let cur = atom_hiddens.narrow_rows(offset, len);
            let hidden = match (&self.w_a, &self.w_b) {
                (Some(w_a), Some(w_b)) => {
                    let att_w = F::softmax_rows(&w_a.forward(&cur).matmul(&cur.transpose()));
                    let att_hiddens = act.apply(&w_b.forward(&att_w.matmul(&cur)));
                    cur.add(&self.dropout.forward(&att_hiddens))
                }
                _ => cur,
            };
            let data = hidden.data();
            let out = pooled.data_mut();
            let scale = 1.0 / len as f32;
            for row in 0..len {
                for col in 0..h {
                    out[m * h + col] += data[row * h + col] * scale;
                }
            }
        }
        pooled
    }

    /// Scale each incoming message by a masked softmax over its slot's
    /// learned score. Padded slots (index 0, the sentinel) receive zero
    /// weight rather than leaking into the distribution.
    fn attend_messages(&self, nei: &mut Tensor, w_ma: &Linear, graph: &MolGraph) {
        let shape = nei.shape().to_vec();
        let (rows, width, h) = (shape[0], shape[1], shape[2]);
        let scores = w_ma.forward(nei); // [rows, width, 1]
        let score_data = scores.data();
        let data = nei.data_mut();
        for r in 0..rows {
            let logits = &score_data[r * width..(r + 1) * width];
            let live: Vec<bool> = (0..width).map(|s| graph.bgraph.get(r, s) != 0).collect();
            let weights = F::masked_softmax_1d(logits, &live);
            for s in 0..width {
                let base = (r * width + s) * h;
                for k in 0..h {
                    data[base + k] *= weights[s];
                }
            }
        }
    }
}

/// Task head over the encoder: two feed-forward layers, with a sigmoid
/// for classification datasets.
#[derive(Debug)]
pub struct MpnPredictor {
    encoder: Mpn,
    ffn1: Linear,
    ffn2: Linear,
    kind: DatasetKind,
}

/// What the predictor's outputs mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    /// Raw real-valued outputs.
    Regression,
    /// Per-task probabilities through a sigmoid.
    Classification,
}

impl MpnPredictor {
    /// Build an encoder plus task head producing `num_tasks` outputs per
    /// molecule.
    ///
    /// # Errors
    ///
    /// Propagates config validation failures, and rejects
    /// `num_tasks == 0`.
    pub fn new(config: MpnConfig, num_tasks: usize, kind: DatasetKind) -> Result<Self> {
        if num_tasks == 0 {
            return Err(EnlaceError::hyperparameter(
                "num_tasks",
                num_tasks.to_string(),
                "must be at least 1",
            ));
        }
        let h = config.hidden_size;
        let seed = config.seed;
        let encoder = Mpn::new(config)?;
        let ffn1 = Linear::with_seed(h, h, seed.map(|s| s.wrapping_add(200)));
        let ffn2 = Linear::with_seed(h, num_tasks, seed.map(|s| s.wrapping_add(201)));
        Ok(Self {
            encoder,
            ffn1,
            ffn2,
            kind,
        })
    }

    /// The underlying encoder.
    #[must_use]
    pub fn encoder(&self) -> &Mpn {
        &self.encoder
    }

    /// Enable dropout in the encoder.
    pub fn train(&mut self) {
        self.encoder.train();
    }

    /// Disable dropout in the encoder.
    pub fn eval(&mut self) {
        self.encoder.eval();
    }

    /// Predict `[n_mols, num_tasks]` for a batch.
    #[must_use]
    pub fn forward(&self, graph: &MolGraph) -> Tensor {
        let encodings = self.encoder.forward(graph);
        let hidden = Activation::ReLU.apply(&self.ffn1.forward(&encodings));
        let outputs = self.ffn2.forward(&hidden);
        match self.kind {
            DatasetKind::Regression => outputs,
            DatasetKind::Classification => F::sigmoid(&outputs),
        }
    }
}
