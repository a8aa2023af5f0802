//! Deterministic distance-geometry style conformer embedding.
//!
//! Coordinates start from a seeded uniform cloud and relax under two
//! forces: bonded atoms are pulled toward a nominal bond length, and
//! non-bonded atoms closer than a clash radius are pushed apart. The
//! result is not a physical geometry, only a reproducible one whose
//! pairwise distances roughly track the bond graph.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Molecule;

const NOMINAL_BOND_LENGTH: f32 = 1.5;
const CLASH_RADIUS: f32 = 2.0;
const RELAX_STEPS: usize = 200;
const STEP: f32 = 0.25;

pub(crate) fn embed(mol: &Molecule, seed: u64) -> Result<Vec<[f32; 3]>, String> {
    let n = mol.n_atoms();
    if n == 0 {
        return Err("cannot embed a molecule with no atoms".into());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    // Initial cloud scaled with molecule size so large molecules don't
    // start fully collapsed.
    let side = 1.5 * (n as f32).cbrt().max(1.0);
    let mut coords: Vec<[f32; 3]> = (0..n)
        .map(|_| {
            [
                rng.gen_range(-side..side),
                rng.gen_range(-side..side),
                rng.gen_range(-side..side),
            ]
        })
        .collect();

    if n == 1 {
        return Ok(coords);
    }

    for _ in 0..RELAX_STEPS {
        // Spring toward nominal length along each bond.
        for bond in mol.bonds() {
            adjust_pair(
                &mut coords,
                bond.a1,
                bond.a2,
                NOMINAL_BOND_LENGTH,
                STEP,
                &mut rng,
            );
        }
        // Push apart non-bonded clashes.
        for i in 0..n {
            for j in (i + 1)..n {
                if mol.bond_between(i, j).is_some() {
                    continue;
                }
                let d = distance(&coords[i], &coords[j]);
                if d < CLASH_RADIUS {
                    adjust_pair(&mut coords, i, j, CLASH_RADIUS, STEP * 0.5, &mut rng);
                }
            }
        }
    }

    Ok(coords)
}

fn distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Move both endpoints toward (or away from) each other so their
/// distance trends to `target`. Coincident points get a seeded nudge so
/// the direction is well defined.
fn adjust_pair(
    coords: &mut [[f32; 3]],
    i: usize,
    j: usize,
    target: f32,
    step: f32,
    rng: &mut StdRng,
) {
    let mut d = distance(&coords[i], &coords[j]);
    if d < 1e-6 {
        coords[j][0] += rng.gen_range(0.01..0.1);
        coords[j][1] += rng.gen_range(0.01..0.1);
        coords[j][2] += rng.gen_range(0.01..0.1);
        d = distance(&coords[i], &coords[j]);
    }
    let shift = step * (d - target) / d;
    for axis in 0..3 {
        let delta = shift * (coords[j][axis] - coords[i][axis]);
        coords[i][axis] += delta;
        coords[j][axis] -= delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_empty_fails() {
        let mol = Molecule::from_parts(Vec::new(), Vec::new());
        assert!(embed(&mol, 0).is_err());
    }

    #[test]
    fn test_embed_single_atom() {
        let mol = Molecule::from_smiles("C").unwrap();
        let coords = embed(&mol, 3).unwrap();
        assert_eq!(coords.len(), 1);
    }

    #[test]
    fn test_bonded_atoms_near_nominal_length() {
        let mol = Molecule::from_smiles("CCCC").unwrap();
        let coords = embed(&mol, 11).unwrap();
        for bond in mol.bonds() {
            let d = distance(&coords[bond.a1], &coords[bond.a2]);
            assert!(
                (d - NOMINAL_BOND_LENGTH).abs() < 0.8,
                "bond {} - {} at distance {d}",
                bond.a1,
                bond.a2
            );
        }
    }

    #[test]
    fn test_seeds_differ() {
        let mol = Molecule::from_smiles("CCO").unwrap();
        let a = embed(&mol, 1).unwrap();
        let b = embed(&mol, 2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_same_seed_identical() {
        let mol = Molecule::from_smiles("c1ccccc1").unwrap();
        assert_eq!(embed(&mol, 42).unwrap(), embed(&mol, 42).unwrap());
    }
}
