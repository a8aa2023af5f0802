//! Molecular graph batching: SMILES notations in, dense index-addressed
//! tensors out.
//!
//! A batch flattens every molecule's atoms and directed bonds into
//! shared tensors. Slot 0 of the bond axis is a sentinel zero row, so
//! the ragged adjacency tables can pad with index 0 and padded gathers
//! contribute nothing downstream. Per-molecule featurization is
//! memoized in a bounded LRU cache keyed by notation and batching mode.

mod cache;

use std::sync::Arc;

use crate::chem::Molecule;
use crate::error::{EnlaceError, Result};
use crate::featurize::{atom_features, bond_features, bond_fdim, ATOM_FDIM};
use crate::tensor::Tensor;

use cache::{FeatureCache, DEFAULT_CACHE_CAPACITY};

/// Batching mode flags. All options change feature widths or values, so
/// every one of them participates in the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOptions {
    /// Make implicit hydrogens explicit graph nodes before featurizing.
    pub add_hs: bool,
    /// Generate a conformer and append a 3D distance scalar to each
    /// bond feature row.
    pub three_d: bool,
    /// Connect every atom pair with an edge; pairs without a real bond
    /// get sentinel features, and every edge gains a topological
    /// distance one-hot.
    pub virtual_edges: bool,
    /// Seed for the deterministic conformer embedder. Only read when
    /// `three_d` is set.
    pub embed_seed: u64,
}

/// A dense 2D table of indices with zero padding.
///
/// Rows are in-neighbor lists; the width is the batch-wide maximum
/// in-degree, and short rows pad with index 0, the sentinel slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTable {
    data: Vec<usize>,
    rows: usize,
    width: usize,
}

impl IndexTable {
    /// An all-zero table.
    #[must_use]
    pub fn new(rows: usize, width: usize) -> Self {
        Self {
            data: vec![0; rows * width],
            rows,
            width,
        }
    }

    /// Build from ragged rows, padding each with 0 up to `width`.
    ///
    /// # Panics
    ///
    /// Panics if any row is longer than `width`.
    #[must_use]
    pub fn from_rows(rows: &[Vec<usize>], width: usize) -> Self {
        let mut table = Self::new(rows.len(), width);
        for (r, row) in rows.iter().enumerate() {
            assert!(
                row.len() <= width,
                "Row {r} has {} entries, table width is {width}",
                row.len()
            );
            table.data[r * width..r * width + row.len()].copy_from_slice(row);
        }
        table
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Entries per row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Entry at `(row, slot)`.
    ///
    /// # Panics
    ///
    /// Panics if out of range.
    #[must_use]
    pub fn get(&self, row: usize, slot: usize) -> usize {
        assert!(row < self.rows && slot < self.width);
        self.data[row * self.width + slot]
    }

    /// Borrow one row.
    #[must_use]
    pub fn row(&self, row: usize) -> &[usize] {
        &self.data[row * self.width..(row + 1) * self.width]
    }
}

/// A batch of molecules flattened into dense tensors.
///
/// * `fatoms`: `[n_atoms, ATOM_FDIM]`, all atoms across the batch.
/// * `fbonds`: `[n_bonds + 1, ATOM_FDIM + bond_fdim]`, one row per
///   directed bond prefixed by its source atom's features; row 0 is the
///   all-zero sentinel.
/// * `agraph`: per atom, the directed bonds pointing at it.
/// * `bgraph`: per directed bond `x -> y`, the bonds `z -> x` with
///   `z != y` (the reverse bond never feeds its own update).
/// * `scope`: `(offset, length)` into the atom axis per molecule, in
///   input order.
#[derive(Debug, Clone)]
pub struct MolGraph {
    /// Atom feature rows across the batch.
    pub fatoms: Tensor,
    /// Directed bond feature rows; row 0 is the sentinel.
    pub fbonds: Tensor,
    /// Incoming bond ids per atom.
    pub agraph: IndexTable,
    /// Incoming bond ids per directed bond, reverse excluded.
    pub bgraph: IndexTable,
    /// Atom-axis `(offset, length)` per molecule.
    pub scope: Vec<(usize, usize)>,
}

impl MolGraph {
    /// Number of molecules in the batch.
    #[must_use]
    pub fn n_mols(&self) -> usize {
        self.scope.len()
    }

    /// Total atoms across the batch.
    #[must_use]
    pub fn n_atoms(&self) -> usize {
        self.fatoms.shape()[0]
    }

    /// Total directed bonds across the batch (sentinel excluded).
    #[must_use]
    pub fn n_bonds(&self) -> usize {
        self.fbonds.shape()[0] - 1
    }

    /// Check the structural invariants of the batch.
    ///
    /// # Panics
    ///
    /// Panics with a description of the first violated invariant.
    pub fn validate(&self) {
        let n_atoms = self.n_atoms();
        let n_bond_rows = self.fbonds.shape()[0];
        assert!(
            self.fbonds.row(0).iter().all(|&x| x == 0.0),
            "Sentinel bond row must be all zeros"
        );
        assert_eq!(self.agraph.rows(), n_atoms, "agraph must have one row per atom");
        assert_eq!(
            self.bgraph.rows(),
            n_bond_rows,
            "bgraph must have one row per bond slot"
        );
        assert_eq!(
            self.agraph.width(),
            self.bgraph.width(),
            "agraph and bgraph must share a width"
        );
        assert!(
            self.bgraph.row(0).iter().all(|&x| x == 0),
            "Sentinel bgraph row must be all zeros"
        );
        for row in 0..self.agraph.rows() {
            for &idx in self.agraph.row(row) {
                assert!(idx < n_bond_rows, "agraph index {idx} out of range");
            }
        }
        for row in 0..self.bgraph.rows() {
            for &idx in self.bgraph.row(row) {
                assert!(idx < n_bond_rows, "bgraph index {idx} out of range");
            }
        }
        let mut covered = 0;
        for &(offset, len) in &self.scope {
            assert_eq!(offset, covered, "Scopes must tile the atom axis in order");
            assert!(len > 0, "Every molecule must contribute at least one atom");
            covered += len;
        }
        assert_eq!(covered, n_atoms, "Scopes must cover every atom");
    }
}

/// One directed bond in a featurized molecule, before batching.
#[derive(Debug, Clone)]
pub(crate) struct DirectedBond {
    pub source: usize,
    pub target: usize,
    /// Source atom features followed by bond features.
    pub features: Vec<f32>,
}

/// Cached featurization of a single molecule.
#[derive(Debug)]
pub(crate) struct MolFeatures {
    pub n_atoms: usize,
    pub atom_rows: Vec<Vec<f32>>,
    pub directed_bonds: Vec<DirectedBond>,
}

/// Builds [`MolGraph`] batches from SMILES notations, memoizing
/// per-molecule work.
#[derive(Debug)]
pub struct GraphBuilder {
    options: BatchOptions,
    cache: FeatureCache,
}

impl GraphBuilder {
    /// Builder with the default cache capacity.
    #[must_use]
    pub fn new(options: BatchOptions) -> Self {
        Self::with_cache_capacity(options, DEFAULT_CACHE_CAPACITY)
    }

    /// Builder with an explicit cache bound. Capacity 0 disables
    /// memoization.
    #[must_use]
    pub fn with_cache_capacity(options: BatchOptions, capacity: usize) -> Self {
        Self {
            options,
            cache: FeatureCache::new(capacity),
        }
    }

    /// The batching mode this builder runs in.
    #[must_use]
    pub fn options(&self) -> BatchOptions {
        self.options
    }

    /// Number of memoized molecules.
    #[must_use]
    pub fn cached_molecules(&self) -> usize {
        self.cache.len()
    }

    /// Featurize and batch a slice of SMILES notations.
    ///
    /// The output depends only on the notations and the batching mode;
    /// a molecule's own rows are identical regardless of its batch
    /// position or companions, apart from adjacency table width, which
    /// is the batch-wide maximum in-degree.
    ///
    /// # Errors
    ///
    /// * [`EnlaceError::EmptyBatch`] for an empty slice.
    /// * [`EnlaceError::Parse`] for a malformed notation.
    /// * [`EnlaceError::EmbeddingFailure`] when 3D mode cannot embed.
    pub fn mol2graph<S: AsRef<str>>(&mut self, notations: &[S]) -> Result<MolGraph> {
        if notations.is_empty() {
            return Err(EnlaceError::EmptyBatch);
        }

        let mut mols = Vec::with_capacity(notations.len());
        for notation in notations {
            let notation = notation.as_ref();
            let features = match self.cache.get(notation, &self.options) {
                Some(hit) => hit,
                None => {
                    let computed = Arc::new(featurize_molecule(notation, &self.options)?);
                    self.cache.insert(notation, &self.options, Arc::clone(&computed));
                    computed
                }
            };
            mols.push(features);
        }

        Ok(assemble(&mols, &self.options))
    }
}

/// Parse one notation and featurize its atoms and directed bonds.
fn featurize_molecule(notation: &str, options: &BatchOptions) -> Result<MolFeatures> {
    let mut mol = Molecule::from_smiles(notation)?;
    if options.add_hs {
        mol = mol.add_hydrogens();
    }
    if options.three_d {
        mol.embed_3d(options.embed_seed)
            .map_err(|message| EnlaceError::EmbeddingFailure {
                notation: notation.to_owned(),
                message,
            })?;
    }

    let n = mol.n_atoms();
    let atom_rows: Vec<Vec<f32>> = (0..n).map(|i| atom_features(&mol, i)).collect();

    let topo = options.virtual_edges.then(|| mol.topological_distances());
    let dist_3d = if options.three_d {
        mol.distances_3d()
    } else {
        None
    };

    let mut directed_bonds = Vec::new();
    let mut push_pair = |x: usize, y: usize, bond_part: &[f32]| {
        for (source, target) in [(x, y), (y, x)] {
            let mut features =
                Vec::with_capacity(atom_rows[source].len() + bond_part.len());
            features.extend_from_slice(&atom_rows[source]);
            features.extend_from_slice(bond_part);
            directed_bonds.push(DirectedBond {
                source,
                target,
                features,
            });
        }
    };

    if options.virtual_edges {
        for x in 0..n {
            for y in (x + 1)..n {
                let bond_part = bond_features(
                    mol.bond_between(x, y),
                    topo.as_ref().map(|t| t[x][y]),
                    dist_3d.as_ref().map(|d| d[x][y]),
                );
                push_pair(x, y, &bond_part);
            }
        }
    } else {
        for bond in mol.bonds() {
            let bond_part = bond_features(
                Some(bond),
                None,
                dist_3d.as_ref().map(|d| d[bond.a1][bond.a2]),
            );
            push_pair(bond.a1, bond.a2, &bond_part);
        }
    }

    Ok(MolFeatures {
        n_atoms: n,
        atom_rows,
        directed_bonds,
    })
}

/// Flatten featurized molecules into the batch tensors.
fn assemble(mols: &[Arc<MolFeatures>], options: &BatchOptions) -> MolGraph {
    let total_atoms: usize = mols.iter().map(|m| m.n_atoms).sum();
    let total_bonds: usize = mols.iter().map(|m| m.directed_bonds.len()).sum();
    let fbond_width = ATOM_FDIM + bond_fdim(options.three_d, options.virtual_edges);

    let mut fatoms = Vec::with_capacity(total_atoms);
    let mut fbond_rows: Vec<Vec<f32>> = Vec::with_capacity(total_bonds + 1);
    fbond_rows.push(vec![0.0; fbond_width]);

    // Per atom, the global ids of directed bonds pointing at it, and per
    // global bond id, its (source, target) in global atom indices.
    let mut in_bonds: Vec<Vec<usize>> = vec![Vec::new(); total_atoms];
    let mut endpoints: Vec<(usize, usize)> = Vec::with_capacity(total_bonds + 1);
    endpoints.push((usize::MAX, usize::MAX)); // sentinel slot

    let mut scope = Vec::with_capacity(mols.len());
    let mut atom_offset = 0;
    for mol in mols {
        for row in &mol.atom_rows {
            fatoms.push(row.clone());
        }
        for bond in &mol.directed_bonds {
            let id = fbond_rows.len();
            fbond_rows.push(bond.features.clone());
            let source = atom_offset + bond.source;
            let target = atom_offset + bond.target;
            endpoints.push((source, target));
            in_bonds[target].push(id);
        }
        scope.push((atom_offset, mol.n_atoms));
        atom_offset += mol.n_atoms;
    }

    let max_nb = in_bonds.iter().map(Vec::len).max().unwrap_or(0).max(1);

    let agraph = IndexTable::from_rows(&in_bonds, max_nb);

    // bgraph[b] for b = x -> y lists the bonds feeding x, minus the
    // reverse bond y -> x.
    let mut bgraph_rows: Vec<Vec<usize>> = Vec::with_capacity(total_bonds + 1);
    bgraph_rows.push(Vec::new());
    for &(source, target) in endpoints.iter().skip(1) {
        let row = in_bonds[source]
            .iter()
            .copied()
            .filter(|&incoming| endpoints[incoming].0 != target)
            .collect();
        bgraph_rows.push(row);
    }
    let bgraph = IndexTable::from_rows(&bgraph_rows, max_nb);

    let graph = MolGraph {
        fatoms: Tensor::from_rows(&fatoms),
        fbonds: Tensor::from_rows(&fbond_rows),
        agraph,
        bgraph,
        scope,
    };
    debug_assert!({
        graph.validate();
        true
    });
    graph
}
