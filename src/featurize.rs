//! Fixed-width feature encodings for atoms and bonds.
//!
//! Every categorical property goes through [`onek_encoding_unk`], a
//! one-hot with a trailing overflow slot for values outside the choice
//! list. Feature widths are set by the choice lists below and exposed as
//! [`ATOM_FDIM`], [`BOND_FDIM`] and [`bond_fdim`].

use crate::chem::{Bond, BondOrder, Hybridization, Molecule};

/// Atomic number slots: elements 1..=100 encode as `atomic_num - 1`.
const ATOMIC_NUM_CHOICES: usize = 100;
const DEGREE_CHOICES: [i64; 6] = [0, 1, 2, 3, 4, 5];
const FORMAL_CHARGE_CHOICES: [i64; 5] = [-1, -2, 1, 2, 0];
const CHIRAL_TAG_CHOICES: [i64; 4] = [0, 1, 2, 3];
const IMPLICIT_VALENCE_CHOICES: [i64; 7] = [0, 1, 2, 3, 4, 5, 6];
const NUM_HS_CHOICES: [i64; 5] = [0, 1, 2, 3, 4];
const HYBRIDIZATION_CHOICES: [i64; 5] = [0, 1, 2, 3, 4];
const RADICAL_CHOICES: [i64; 3] = [0, 1, 2];
const STEREO_CHOICES: [i64; 6] = [0, 1, 2, 3, 4, 5];
/// Topological distance buckets 0..=9, overflow for longer paths and
/// disconnected fragments.
const TOPO_DISTANCE_CHOICES: [i64; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];

/// Width of an atom feature row.
pub const ATOM_FDIM: usize = ATOMIC_NUM_CHOICES
    + 1
    + (DEGREE_CHOICES.len() + 1)
    + (FORMAL_CHARGE_CHOICES.len() + 1)
    + (CHIRAL_TAG_CHOICES.len() + 1)
    + (IMPLICIT_VALENCE_CHOICES.len() + 1)
    + (NUM_HS_CHOICES.len() + 1)
    + (HYBRIDIZATION_CHOICES.len() + 1)
    + (RADICAL_CHOICES.len() + 1)
    + 1; // aromatic flag

/// Width of the base bond feature block: null flag, four order flags,
/// conjugation, ring membership, stereo one-hot.
pub const BOND_FDIM: usize = 1 + 4 + 1 + 1 + (STEREO_CHOICES.len() + 1);

/// Width of an atom feature row. Fixed regardless of batching mode.
#[must_use]
pub fn atom_fdim() -> usize {
    ATOM_FDIM
}

/// Width of a bond feature row for the given batching mode.
///
/// `virtual_edges` appends a topological distance one-hot,
/// `three_d` appends a raw 3D distance scalar.
#[must_use]
pub fn bond_fdim(three_d: bool, virtual_edges: bool) -> usize {
    BOND_FDIM
        + (TOPO_DISTANCE_CHOICES.len() + 1) * usize::from(virtual_edges)
        + usize::from(three_d)
}

/// One-hot encode `value` over `choices`, with one extra trailing slot
/// that fires when the value is not in the list.
///
/// The output length is always `choices.len() + 1`.
///
/// # Examples
///
/// ```
/// use enlace::featurize::onek_encoding_unk;
///
/// assert_eq!(onek_encoding_unk(2, &[1, 2, 3]), vec![0.0, 1.0, 0.0, 0.0]);
/// assert_eq!(onek_encoding_unk(9, &[1, 2, 3]), vec![0.0, 0.0, 0.0, 1.0]);
/// ```
#[must_use]
pub fn onek_encoding_unk(value: i64, choices: &[i64]) -> Vec<f32> {
    let mut encoding = vec![0.0; choices.len() + 1];
    let slot = choices
        .iter()
        .position(|&c| c == value)
        .unwrap_or(choices.len());
    encoding[slot] = 1.0;
    encoding
}

fn push_onek(out: &mut Vec<f32>, value: i64, choices: &[i64]) {
    out.extend(onek_encoding_unk(value, choices));
}

fn hybridization_slot(h: Hybridization) -> i64 {
    match h {
        Hybridization::SP => 0,
        Hybridization::SP2 => 1,
        Hybridization::SP3 => 2,
        Hybridization::SP3D => 3,
        Hybridization::SP3D2 => 4,
        Hybridization::Other => -1, // overflow slot
    }
}

/// Encode atom `idx` of `mol` into a row of [`ATOM_FDIM`] values.
///
/// # Panics
///
/// Panics if `idx` is out of range.
#[must_use]
pub fn atom_features(mol: &Molecule, idx: usize) -> Vec<f32> {
    let atom = mol.atom(idx);
    let mut f = Vec::with_capacity(ATOM_FDIM);
    let atomic_choices: Vec<i64> = (0..ATOMIC_NUM_CHOICES as i64).collect();
    push_onek(&mut f, i64::from(atom.atomic_num) - 1, &atomic_choices);
    push_onek(&mut f, mol.degree(idx) as i64, &DEGREE_CHOICES);
    push_onek(&mut f, i64::from(atom.formal_charge), &FORMAL_CHARGE_CHOICES);
    push_onek(&mut f, i64::from(atom.chirality), &CHIRAL_TAG_CHOICES);
    push_onek(
        &mut f,
        i64::from(mol.implicit_valence(idx)),
        &IMPLICIT_VALENCE_CHOICES,
    );
    push_onek(&mut f, i64::from(mol.total_num_hs(idx)), &NUM_HS_CHOICES);
    push_onek(
        &mut f,
        hybridization_slot(mol.hybridization(idx)),
        &HYBRIDIZATION_CHOICES,
    );
    push_onek(&mut f, i64::from(atom.radical_electrons), &RADICAL_CHOICES);
    f.push(if atom.is_aromatic { 1.0 } else { 0.0 });
    debug_assert_eq!(f.len(), ATOM_FDIM);
    f
}

/// Encode a bond (or a virtual edge when `bond` is `None`) into a
/// feature row.
///
/// `topo_distance` must be `Some` exactly when the batch runs with
/// virtual edges, and `distance_3d` exactly when it runs in 3D mode, so
/// every row in a batch has the same width. A virtual edge sets only the
/// leading null flag in the base block.
#[must_use]
pub fn bond_features(
    bond: Option<&Bond>,
    topo_distance: Option<usize>,
    distance_3d: Option<f32>,
) -> Vec<f32> {
    let width = bond_fdim(distance_3d.is_some(), topo_distance.is_some());
    let mut f = Vec::with_capacity(width);
    match bond {
        None => {
            f.push(1.0);
            f.resize(BOND_FDIM, 0.0);
        }
        Some(bond) => {
            let flag = |b: bool| if b { 1.0 } else { 0.0 };
            f.push(0.0);
            f.push(flag(bond.order == BondOrder::Single));
            f.push(flag(bond.order == BondOrder::Double));
            f.push(flag(bond.order == BondOrder::Triple));
            f.push(flag(bond.order == BondOrder::Aromatic));
            f.push(flag(bond.conjugated));
            f.push(flag(bond.in_ring));
            push_onek(&mut f, i64::from(bond.stereo), &STEREO_CHOICES);
        }
    }
    if let Some(d) = topo_distance {
        let value = i64::try_from(d).unwrap_or(i64::MAX);
        push_onek(&mut f, value, &TOPO_DISTANCE_CHOICES);
    }
    if let Some(d) = distance_3d {
        f.push(d);
    }
    debug_assert_eq!(f.len(), width);
    f
}
