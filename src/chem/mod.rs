//! Chemistry toolkit: molecules, atoms, bonds, and derived properties.
//!
//! This is the collaborator surface consumed by the graph batcher. It
//! carries a SMILES parser for the organic subset, hydrogen transforms,
//! topological and 3D distance matrices, and a deterministic conformer
//! embedder. Atom and bond structs store intrinsic properties; computed
//! properties (degree, valence, hybridization) are derived from the graph
//! on demand.

mod embed;
mod smiles;

use crate::error::{EnlaceError, Result};

/// Path length reported for atom pairs in different fragments.
///
/// Large enough that distance-bucket one-hots always land in the
/// overflow slot.
pub const DISTANCE_UNREACHABLE: usize = 10_000;

/// Order of an undirected chemical bond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondOrder {
    /// Single bond.
    Single,
    /// Double bond.
    Double,
    /// Triple bond.
    Triple,
    /// Aromatic (delocalized) bond.
    Aromatic,
}

impl BondOrder {
    /// Contribution of this bond to an atom's valence sum.
    ///
    /// Aromatic bonds count 1 here; the extra delocalized electron is
    /// accounted for per-atom during implicit hydrogen assignment.
    #[must_use]
    pub fn valence_contribution(self) -> u8 {
        match self {
            Self::Single | Self::Aromatic => 1,
            Self::Double => 2,
            Self::Triple => 3,
        }
    }
}

/// Intrinsic atomic properties, the things you would read off a
/// structural formula.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Atom {
    /// Atomic number (1 = H, 6 = C, 7 = N, ...).
    pub atomic_num: u8,
    /// Formal charge in elementary charge units.
    pub formal_charge: i8,
    /// Chiral tag: 0 = unspecified, 1 = clockwise (@@), 2 = counterclockwise (@), 3 = other.
    pub chirality: u8,
    /// Number of virtual (suppressed) hydrogens on this atom.
    ///
    /// These are not graph nodes. After SMILES parsing, this count is the
    /// single source of truth for how many implicit Hs the atom carries.
    pub n_implicit_hs: u8,
    /// Whether this atom is in an aromatic ring.
    pub is_aromatic: bool,
    /// Number of unpaired electrons.
    pub radical_electrons: u8,
}

/// An undirected bond between two atoms, with derived predicates filled
/// in when the molecule is finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    /// First endpoint (atom index).
    pub a1: usize,
    /// Second endpoint (atom index).
    pub a2: usize,
    /// Bond order.
    pub order: BondOrder,
    /// Stereo descriptor category, 0..=5 (0 = none).
    pub stereo: u8,
    /// Whether the bond lies on a cycle. Computed at construction.
    pub in_ring: bool,
    /// Whether the bond is part of a conjugated system. Computed at
    /// construction.
    pub conjugated: bool,
}

/// Hybridization category of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hybridization {
    /// sp (linear)
    SP,
    /// sp2 (trigonal planar)
    SP2,
    /// sp3 (tetrahedral)
    SP3,
    /// sp3d (trigonal bipyramidal)
    SP3D,
    /// sp3d2 (octahedral)
    SP3D2,
    /// Anything else (bare ions, hypervalent oddities).
    Other,
}

/// A molecular graph with optional 3D conformer.
///
/// # Examples
///
/// ```
/// use enlace::chem::Molecule;
///
/// let ethane = Molecule::from_smiles("CC").unwrap();
/// assert_eq!(ethane.n_atoms(), 2);
/// assert_eq!(ethane.total_num_hs(0), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    /// Per-atom adjacency: (neighbor atom index, bond index).
    neighbors: Vec<Vec<(usize, usize)>>,
    /// 3D coordinates, present after a successful `embed_3d`.
    conformer: Option<Vec<[f32; 3]>>,
}

impl Molecule {
    /// Parse a SMILES notation into a molecule.
    ///
    /// Supports the organic subset, bracket atoms (isotope, chirality,
    /// H count, charge), branches, ring closures including `%nn`, bond
    /// symbols, aromatic lowercase atoms, and `.`-separated fragments.
    ///
    /// # Errors
    ///
    /// Returns [`EnlaceError::Parse`] with a diagnostic for malformed input.
    pub fn from_smiles(notation: &str) -> Result<Self> {
        let (atoms, bonds) =
            smiles::parse(notation).map_err(|msg| EnlaceError::parse(notation, msg))?;
        Ok(Self::from_parts(atoms, bonds))
    }

    /// Assemble a molecule from atoms and bonds, computing derived bond
    /// predicates (ring membership, conjugation).
    ///
    /// # Panics
    ///
    /// Panics if a bond references an atom index out of range.
    #[must_use]
    pub fn from_parts(atoms: Vec<Atom>, mut bonds: Vec<Bond>) -> Self {
        let n = atoms.len();
        let mut neighbors: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
        for (bi, bond) in bonds.iter().enumerate() {
            assert!(
                bond.a1 < n && bond.a2 < n,
                "Bond ({}, {}) references atom out of range (n_atoms = {n})",
                bond.a1,
                bond.a2
            );
            neighbors[bond.a1].push((bond.a2, bi));
            neighbors[bond.a2].push((bond.a1, bi));
        }

        let bridges = find_bridges(n, &bonds, &neighbors);
        for (bi, bond) in bonds.iter_mut().enumerate() {
            bond.in_ring = !bridges[bi];
        }

        let mut mol = Self {
            atoms,
            bonds,
            neighbors,
            conformer: None,
        };

        // Conjugation needs hybridization, which needs the finished graph.
        let conjugated: Vec<bool> = mol
            .bonds
            .iter()
            .map(|b| {
                matches!(b.order, BondOrder::Aromatic)
                    || (is_pi_capable(mol.hybridization(b.a1))
                        && is_pi_capable(mol.hybridization(b.a2)))
            })
            .collect();
        for (bond, c) in mol.bonds.iter_mut().zip(conjugated) {
            bond.conjugated = c;
        }

        mol
    }

    /// Number of atoms.
    #[must_use]
    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// Borrow atom `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    #[must_use]
    pub fn atom(&self, i: usize) -> &Atom {
        &self.atoms[i]
    }

    /// All atoms in index order.
    #[must_use]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// All bonds.
    #[must_use]
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// The bond between two atoms, if any. Order of arguments is
    /// irrelevant.
    #[must_use]
    pub fn bond_between(&self, a1: usize, a2: usize) -> Option<&Bond> {
        self.neighbors
            .get(a1)?
            .iter()
            .find(|&&(nbr, _)| nbr == a2)
            .map(|&(_, bi)| &self.bonds[bi])
    }

    /// Number of explicit neighbors of atom `i`.
    #[must_use]
    pub fn degree(&self, i: usize) -> usize {
        self.neighbors[i].len()
    }

    /// Implicit valence (number of implicit hydrogens) of atom `i`.
    #[must_use]
    pub fn implicit_valence(&self, i: usize) -> u8 {
        self.atoms[i].n_implicit_hs
    }

    /// Total hydrogen count of atom `i`: implicit plus explicit H
    /// neighbors.
    #[must_use]
    pub fn total_num_hs(&self, i: usize) -> u8 {
        let explicit = self.neighbors[i]
            .iter()
            .filter(|&&(nbr, _)| self.atoms[nbr].atomic_num == 1)
            .count() as u8;
        self.atoms[i].n_implicit_hs + explicit
    }

    /// Hybridization category of atom `i`, derived from its bond orders
    /// and steric number.
    #[must_use]
    pub fn hybridization(&self, i: usize) -> Hybridization {
        let mut doubles = 0usize;
        let mut triples = 0usize;
        for &(_, bi) in &self.neighbors[i] {
            match self.bonds[bi].order {
                BondOrder::Double => doubles += 1,
                BondOrder::Triple => triples += 1,
                _ => {}
            }
        }
        if triples > 0 || doubles >= 2 {
            return Hybridization::SP;
        }
        if doubles == 1 || self.atoms[i].is_aromatic {
            return Hybridization::SP2;
        }
        match self.degree(i) + usize::from(self.atoms[i].n_implicit_hs) {
            0..=4 => Hybridization::SP3,
            5 => Hybridization::SP3D,
            6 => Hybridization::SP3D2,
            _ => Hybridization::Other,
        }
    }

    /// A copy of this molecule with all implicit hydrogens made explicit
    /// graph nodes.
    ///
    /// Any conformer is dropped; embedding runs after hydrogen addition.
    #[must_use]
    pub fn add_hydrogens(&self) -> Self {
        let mut atoms = self.atoms.clone();
        let mut bonds = self.bonds.clone();
        for i in 0..self.atoms.len() {
            for _ in 0..self.atoms[i].n_implicit_hs {
                let h = atoms.len();
                atoms.push(Atom {
                    atomic_num: 1,
                    ..Atom::default()
                });
                bonds.push(Bond {
                    a1: i,
                    a2: h,
                    order: BondOrder::Single,
                    stereo: 0,
                    in_ring: false,
                    conjugated: false,
                });
            }
            atoms[i].n_implicit_hs = 0;
        }
        Self::from_parts(atoms, bonds)
    }

    /// A copy of this molecule with terminal explicit hydrogens folded
    /// back into their neighbor's implicit count.
    ///
    /// Conformer coordinates of the surviving atoms are kept.
    #[must_use]
    pub fn remove_hydrogens(&self) -> Self {
        let keep: Vec<bool> = (0..self.n_atoms())
            .map(|i| {
                let a = &self.atoms[i];
                !(a.atomic_num == 1 && a.formal_charge == 0 && self.degree(i) <= 1)
            })
            .collect();

        let mut remap = vec![usize::MAX; self.n_atoms()];
        let mut atoms = Vec::new();
        for (i, a) in self.atoms.iter().enumerate() {
            if keep[i] {
                remap[i] = atoms.len();
                atoms.push(a.clone());
            }
        }

        let mut bonds = Vec::new();
        for bond in &self.bonds {
            match (keep[bond.a1], keep[bond.a2]) {
                (true, true) => bonds.push(Bond {
                    a1: remap[bond.a1],
                    a2: remap[bond.a2],
                    ..bond.clone()
                }),
                (true, false) => atoms[remap[bond.a1]].n_implicit_hs += 1,
                (false, true) => atoms[remap[bond.a2]].n_implicit_hs += 1,
                (false, false) => {}
            }
        }

        let mut mol = Self::from_parts(atoms, bonds);
        if let Some(coords) = &self.conformer {
            mol.conformer = Some(
                coords
                    .iter()
                    .zip(keep.iter())
                    .filter(|(_, &k)| k)
                    .map(|(&c, _)| c)
                    .collect(),
            );
        }
        mol
    }

    /// All-pairs shortest path lengths in bond hops (BFS per atom).
    ///
    /// Atoms in different fragments report [`DISTANCE_UNREACHABLE`].
    #[must_use]
    pub fn topological_distances(&self) -> Vec<Vec<usize>> {
        let n = self.n_atoms();
        let mut matrix = vec![vec![DISTANCE_UNREACHABLE; n]; n];
        for start in 0..n {
            let row = &mut matrix[start];
            row[start] = 0;
            let mut queue = std::collections::VecDeque::from([start]);
            while let Some(u) = queue.pop_front() {
                for &(v, _) in &self.neighbors[u] {
                    if row[v] == DISTANCE_UNREACHABLE {
                        row[v] = row[u] + 1;
                        queue.push_back(v);
                    }
                }
            }
        }
        matrix
    }

    /// Generate a 3D conformer with the deterministic embedder.
    ///
    /// The same seed always yields the same coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error string if the molecule cannot be embedded
    /// (no atoms).
    pub fn embed_3d(&mut self, seed: u64) -> std::result::Result<(), String> {
        let coords = embed::embed(self, seed)?;
        self.conformer = Some(coords);
        Ok(())
    }

    /// Whether a conformer is present.
    #[must_use]
    pub fn has_conformer(&self) -> bool {
        self.conformer.is_some()
    }

    /// Pairwise Euclidean distances from the conformer.
    ///
    /// Returns `None` when no conformer has been generated.
    #[must_use]
    pub fn distances_3d(&self) -> Option<Vec<Vec<f32>>> {
        let coords = self.conformer.as_ref()?;
        let n = coords.len();
        let mut matrix = vec![vec![0.0f32; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = coords[i][0] - coords[j][0];
                let dy = coords[i][1] - coords[j][1];
                let dz = coords[i][2] - coords[j][2];
                let d = (dx * dx + dy * dy + dz * dz).sqrt();
                matrix[i][j] = d;
                matrix[j][i] = d;
            }
        }
        Some(matrix)
    }

    /// Per-atom adjacency used by the embedder.
    pub(crate) fn neighbors(&self) -> &[Vec<(usize, usize)>] {
        &self.neighbors
    }
}

fn is_pi_capable(h: Hybridization) -> bool {
    matches!(h, Hybridization::SP | Hybridization::SP2)
}

/// Mark which bonds are bridges (cut edges). A bond lies on a ring
/// exactly when it is not a bridge.
fn find_bridges(n: usize, bonds: &[Bond], neighbors: &[Vec<(usize, usize)>]) -> Vec<bool> {
    let mut bridges = vec![true; bonds.len()];
    let mut disc = vec![usize::MAX; n];
    let mut low = vec![0usize; n];
    let mut timer = 0usize;

    // Iterative DFS so deep chains don't blow the stack. Frames are
    // (atom, bond taken to reach it, next neighbor slot to explore).
    for root in 0..n {
        if disc[root] != usize::MAX {
            continue;
        }
        let mut stack: Vec<(usize, usize, usize)> = vec![(root, usize::MAX, 0)];
        while let Some(top) = stack.last_mut() {
            let (u, parent_bond) = (top.0, top.1);
            if top.2 == 0 {
                disc[u] = timer;
                low[u] = timer;
                timer += 1;
            }
            if top.2 < neighbors[u].len() {
                let (v, bi) = neighbors[u][top.2];
                top.2 += 1;
                if bi == parent_bond {
                    continue;
                }
                if disc[v] == usize::MAX {
                    stack.push((v, bi, 0));
                } else {
                    // Back edge: never a bridge.
                    low[u] = low[u].min(disc[v]);
                    bridges[bi] = false;
                }
            } else {
                stack.pop();
                if let Some(parent) = stack.last_mut() {
                    let p = parent.0;
                    low[p] = low[p].min(low[u]);
                    if low[u] <= disc[p] {
                        bridges[parent_bond] = false;
                    }
                }
            }
        }
    }
    bridges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_methane() {
        let mol = Molecule::from_smiles("C").unwrap();
        assert_eq!(mol.n_atoms(), 1);
        assert_eq!(mol.bonds().len(), 0);
        assert_eq!(mol.atom(0).atomic_num, 6);
        assert_eq!(mol.total_num_hs(0), 4);
        assert_eq!(mol.degree(0), 0);
    }

    #[test]
    fn test_ethane_bond() {
        let mol = Molecule::from_smiles("CC").unwrap();
        assert_eq!(mol.n_atoms(), 2);
        let bond = mol.bond_between(0, 1).expect("bonded");
        assert_eq!(bond.order, BondOrder::Single);
        assert!(!bond.in_ring);
        assert!(mol.bond_between(1, 0).is_some());
        assert_eq!(mol.total_num_hs(0), 3);
    }

    #[test]
    fn test_cyclopropane_ring_bonds() {
        let mol = Molecule::from_smiles("C1CC1").unwrap();
        assert_eq!(mol.n_atoms(), 3);
        assert_eq!(mol.bonds().len(), 3);
        assert!(mol.bonds().iter().all(|b| b.in_ring));
    }

    #[test]
    fn test_propane_has_no_ring_bonds() {
        let mol = Molecule::from_smiles("CCC").unwrap();
        assert!(mol.bonds().iter().all(|b| !b.in_ring));
    }

    #[test]
    fn test_ring_with_tail() {
        // Cyclopropane with a methyl tail: three ring bonds, one bridge.
        let mol = Molecule::from_smiles("CC1CC1").unwrap();
        let ring_count = mol.bonds().iter().filter(|b| b.in_ring).count();
        assert_eq!(ring_count, 3);
        assert_eq!(mol.bonds().len(), 4);
    }

    #[test]
    fn test_ethene_hybridization_and_conjugation() {
        let mol = Molecule::from_smiles("C=C").unwrap();
        assert_eq!(mol.hybridization(0), Hybridization::SP2);
        assert_eq!(mol.hybridization(1), Hybridization::SP2);
        assert!(mol.bonds()[0].conjugated);
        assert_eq!(mol.total_num_hs(0), 2);
    }

    #[test]
    fn test_ethyne_is_sp() {
        let mol = Molecule::from_smiles("C#C").unwrap();
        assert_eq!(mol.hybridization(0), Hybridization::SP);
        assert_eq!(mol.total_num_hs(0), 1);
    }

    #[test]
    fn test_alkane_not_conjugated() {
        let mol = Molecule::from_smiles("CC").unwrap();
        assert!(!mol.bonds()[0].conjugated);
    }

    #[test]
    fn test_benzene_aromatic() {
        let mol = Molecule::from_smiles("c1ccccc1").unwrap();
        assert_eq!(mol.n_atoms(), 6);
        assert_eq!(mol.bonds().len(), 6);
        for b in mol.bonds() {
            assert_eq!(b.order, BondOrder::Aromatic);
            assert!(b.in_ring);
            assert!(b.conjugated);
        }
        for i in 0..6 {
            assert!(mol.atom(i).is_aromatic);
            assert_eq!(mol.total_num_hs(i), 1);
            assert_eq!(mol.hybridization(i), Hybridization::SP2);
        }
    }

    #[test]
    fn test_add_hydrogens_methane() {
        let mol = Molecule::from_smiles("C").unwrap().add_hydrogens();
        assert_eq!(mol.n_atoms(), 5);
        assert_eq!(mol.bonds().len(), 4);
        assert_eq!(mol.atom(0).n_implicit_hs, 0);
        assert_eq!(mol.total_num_hs(0), 4);
        assert_eq!(mol.degree(0), 4);
    }

    #[test]
    fn test_remove_hydrogens_round_trip() {
        let full = Molecule::from_smiles("CC").unwrap().add_hydrogens();
        assert_eq!(full.n_atoms(), 8);
        let stripped = full.remove_hydrogens();
        assert_eq!(stripped.n_atoms(), 2);
        assert_eq!(stripped.atom(0).n_implicit_hs, 3);
        assert_eq!(stripped.atom(1).n_implicit_hs, 3);
    }

    #[test]
    fn test_topological_distances_chain() {
        let mol = Molecule::from_smiles("CCC").unwrap();
        let d = mol.topological_distances();
        assert_eq!(d[0][0], 0);
        assert_eq!(d[0][1], 1);
        assert_eq!(d[0][2], 2);
        assert_eq!(d[2][0], 2);
    }

    #[test]
    fn test_topological_distances_fragments() {
        let mol = Molecule::from_smiles("C.C").unwrap();
        let d = mol.topological_distances();
        assert_eq!(d[0][1], DISTANCE_UNREACHABLE);
    }

    #[test]
    fn test_embed_deterministic() {
        let mut a = Molecule::from_smiles("CCO").unwrap();
        let mut b = Molecule::from_smiles("CCO").unwrap();
        a.embed_3d(7).unwrap();
        b.embed_3d(7).unwrap();
        assert_eq!(a.distances_3d(), b.distances_3d());
    }

    #[test]
    fn test_embed_bond_lengths_reasonable() {
        let mut mol = Molecule::from_smiles("CC").unwrap();
        mol.embed_3d(0).unwrap();
        let d = mol.distances_3d().unwrap();
        assert!(d[0][1] > 0.5 && d[0][1] < 3.0, "bond length {}", d[0][1]);
    }

    #[test]
    fn test_distances_3d_requires_conformer() {
        let mol = Molecule::from_smiles("CC").unwrap();
        assert!(mol.distances_3d().is_none());
    }

    #[test]
    fn test_charged_nitrogen_hydrogens() {
        // Ammonium: N+ carries 4 Hs.
        let mol = Molecule::from_smiles("[NH4+]").unwrap();
        assert_eq!(mol.atom(0).formal_charge, 1);
        assert_eq!(mol.total_num_hs(0), 4);
    }
}
