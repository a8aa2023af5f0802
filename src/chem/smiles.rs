//! SMILES parser for the organic subset plus bracket atoms.
//!
//! Single pass over the byte stream: atoms are emitted as they are read,
//! bonds connect each new atom to the previous one on the branch stack,
//! and ring-closure digits pair up across the string. Implicit hydrogen
//! counts for organic-subset atoms are inferred from standard valences
//! after all bonds are known.

use std::collections::HashMap;

use super::{Atom, Bond, BondOrder};

/// Parse a SMILES notation into raw atoms and bonds.
///
/// Errors are plain strings with a byte position; the caller wraps them
/// with the offending notation.
pub(crate) fn parse(notation: &str) -> Result<(Vec<Atom>, Vec<Bond>), String> {
    if notation.is_empty() {
        return Err("empty notation".into());
    }
    let mut p = Parser::new(notation);
    p.run()?;
    p.finish()
}

/// True for atoms written without brackets: B, C, N, O, P, S, F, Cl, Br, I
/// and the aromatic lowercase forms.
fn organic_subset(symbol: &str) -> bool {
    matches!(
        symbol,
        "B" | "C" | "N" | "O" | "P" | "S" | "F" | "Cl" | "Br" | "I"
    )
}

/// Standard valences, smallest first, for implicit hydrogen inference.
fn default_valences(atomic_num: u8) -> &'static [u8] {
    match atomic_num {
        5 => &[3],        // B
        6 => &[4],        // C
        7 => &[3],        // N
        8 => &[2],        // O
        15 => &[3, 5],    // P
        16 => &[2, 4, 6], // S
        9 | 17 | 35 | 53 => &[1],
        _ => &[],
    }
}

fn atomic_number(symbol: &str) -> Option<u8> {
    Some(match symbol {
        "H" => 1,
        "He" => 2,
        "Li" => 3,
        "Be" => 4,
        "B" => 5,
        "C" => 6,
        "N" => 7,
        "O" => 8,
        "F" => 9,
        "Ne" => 10,
        "Na" => 11,
        "Mg" => 12,
        "Al" => 13,
        "Si" => 14,
        "P" => 15,
        "S" => 16,
        "Cl" => 17,
        "K" => 19,
        "Ca" => 20,
        "Ti" => 22,
        "Cr" => 24,
        "Mn" => 25,
        "Fe" => 26,
        "Co" => 27,
        "Ni" => 28,
        "Cu" => 29,
        "Zn" => 30,
        "Ga" => 31,
        "Ge" => 32,
        "As" => 33,
        "Se" => 34,
        "Br" => 35,
        "Zr" => 40,
        "Ru" => 44,
        "Rh" => 45,
        "Pd" => 46,
        "Ag" => 47,
        "Cd" => 48,
        "Sn" => 50,
        "Sb" => 51,
        "Te" => 52,
        "I" => 53,
        "Pt" => 78,
        "Au" => 79,
        "Hg" => 80,
        "Pb" => 82,
        "Bi" => 83,
        _ => return None,
    })
}

struct ParsedAtom {
    atom: Atom,
    /// Bracket atoms carry their hydrogen count literally; organic-subset
    /// atoms get theirs inferred from valence once bonds are known.
    infer_hs: bool,
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    atoms: Vec<Atom>,
    infer_hs: Vec<bool>,
    bonds: Vec<Bond>,
    /// Current attachment point; `None` right after `.` or at the start.
    prev: Option<usize>,
    /// Open branch attachment points.
    branch_stack: Vec<Option<usize>>,
    /// Bond symbol read but not yet consumed by an atom or ring closure.
    pending_bond: Option<BondOrder>,
    /// Open ring closures: digit -> (atom, bond symbol at opening).
    rings: HashMap<u16, (usize, Option<BondOrder>)>,
}

impl<'a> Parser<'a> {
    fn new(notation: &'a str) -> Self {
        Self {
            bytes: notation.as_bytes(),
            pos: 0,
            atoms: Vec::new(),
            infer_hs: Vec::new(),
            bonds: Vec::new(),
            prev: None,
            branch_stack: Vec::new(),
            pending_bond: None,
            rings: HashMap::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn err(&self, msg: impl Into<String>) -> String {
        format!("{} at position {}", msg.into(), self.pos)
    }

    fn run(&mut self) -> Result<(), String> {
        while let Some(b) = self.peek() {
            match b {
                b'-' | b'/' | b'\\' => {
                    self.pos += 1;
                    self.set_pending(BondOrder::Single)?;
                }
                b'=' => {
                    self.pos += 1;
                    self.set_pending(BondOrder::Double)?;
                }
                b'#' => {
                    self.pos += 1;
                    self.set_pending(BondOrder::Triple)?;
                }
                b':' => {
                    self.pos += 1;
                    self.set_pending(BondOrder::Aromatic)?;
                }
                b'(' => {
                    self.pos += 1;
                    if self.prev.is_none() {
                        return Err(self.err("branch before any atom"));
                    }
                    self.branch_stack.push(self.prev);
                }
                b')' => {
                    self.pos += 1;
                    if self.pending_bond.is_some() {
                        return Err(self.err("dangling bond before ')'"));
                    }
                    self.prev = self
                        .branch_stack
                        .pop()
                        .ok_or_else(|| self.err("unmatched ')'"))?;
                }
                b'.' => {
                    self.pos += 1;
                    if self.pending_bond.is_some() {
                        return Err(self.err("bond symbol before '.'"));
                    }
                    self.prev = None;
                }
                b'0'..=b'9' => {
                    self.pos += 1;
                    let label = u16::from(b - b'0');
                    self.ring_closure(label)?;
                }
                b'%' => {
                    self.pos += 1;
                    let label = self.two_digit_label()?;
                    self.ring_closure(label)?;
                }
                b'[' => {
                    self.pos += 1;
                    let parsed = self.bracket_atom()?;
                    self.push_atom(parsed)?;
                }
                _ => {
                    let parsed = self.organic_atom()?;
                    self.push_atom(parsed)?;
                }
            }
        }
        if !self.branch_stack.is_empty() {
            return Err(self.err("unmatched '('"));
        }
        if self.pending_bond.is_some() {
            return Err(self.err("dangling bond at end of notation"));
        }
        if let Some(&label) = self.rings.keys().next() {
            return Err(format!("unclosed ring bond {label}"));
        }
        Ok(())
    }

    fn set_pending(&mut self, order: BondOrder) -> Result<(), String> {
        if self.pending_bond.is_some() {
            return Err(self.err("two consecutive bond symbols"));
        }
        if self.prev.is_none() {
            return Err(self.err("bond symbol before any atom"));
        }
        self.pending_bond = Some(order);
        Ok(())
    }

    fn two_digit_label(&mut self) -> Result<u16, String> {
        let d1 = self.bump().ok_or_else(|| self.err("truncated '%' label"))?;
        let d2 = self.bump().ok_or_else(|| self.err("truncated '%' label"))?;
        if !d1.is_ascii_digit() || !d2.is_ascii_digit() {
            return Err(self.err("'%' must be followed by two digits"));
        }
        Ok(u16::from(d1 - b'0') * 10 + u16::from(d2 - b'0'))
    }

    fn ring_closure(&mut self, label: u16) -> Result<(), String> {
        let current = self
            .prev
            .ok_or_else(|| self.err("ring closure before any atom"))?;
        let pending = self.pending_bond.take();
        if let Some((other, open_bond)) = self.rings.remove(&label) {
            if other == current {
                return Err(self.err(format!("ring bond {label} closes onto its own atom")));
            }
            if self.find_bond(other, current) {
                return Err(self.err(format!("ring bond {label} duplicates an existing bond")));
            }
            let order = match (open_bond, pending) {
                (Some(a), Some(b)) if a != b => {
                    return Err(self.err(format!("ring bond {label} order mismatch")));
                }
                (Some(o), _) | (_, Some(o)) => o,
                (None, None) => self.default_order(other, current),
            };
            self.bonds.push(Bond {
                a1: other,
                a2: current,
                order,
                stereo: 0,
                in_ring: false,
                conjugated: false,
            });
        } else {
            self.rings.insert(label, (current, pending));
        }
        Ok(())
    }

    fn find_bond(&self, a1: usize, a2: usize) -> bool {
        self.bonds
            .iter()
            .any(|b| (b.a1 == a1 && b.a2 == a2) || (b.a1 == a2 && b.a2 == a1))
    }

    /// Bond order when no symbol was written: aromatic between two
    /// aromatic atoms, single otherwise.
    fn default_order(&self, a1: usize, a2: usize) -> BondOrder {
        if self.atoms[a1].is_aromatic && self.atoms[a2].is_aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn push_atom(&mut self, parsed: ParsedAtom) -> Result<(), String> {
        let idx = self.atoms.len();
        self.atoms.push(parsed.atom);
        self.infer_hs.push(parsed.infer_hs);
        if let Some(prev) = self.prev {
            let order = self
                .pending_bond
                .take()
                .unwrap_or_else(|| self.default_order(prev, idx));
            self.bonds.push(Bond {
                a1: prev,
                a2: idx,
                order,
                stereo: 0,
                in_ring: false,
                conjugated: false,
            });
        } else if self.pending_bond.is_some() {
            return Err(self.err("bond symbol with no preceding atom"));
        }
        self.prev = Some(idx);
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<ParsedAtom, String> {
        let b = self.bump().ok_or_else(|| self.err("unexpected end"))?;
        let (symbol, aromatic): (String, bool) = match b {
            b'b' | b'c' | b'n' | b'o' | b'p' | b's' => {
                ((b as char).to_ascii_uppercase().to_string(), true)
            }
            b'B' if self.peek() == Some(b'r') => {
                self.pos += 1;
                ("Br".into(), false)
            }
            b'C' if self.peek() == Some(b'l') => {
                self.pos += 1;
                ("Cl".into(), false)
            }
            b'B' | b'C' | b'N' | b'O' | b'P' | b'S' | b'F' | b'I' => {
                ((b as char).to_string(), false)
            }
            other => {
                return Err(format!(
                    "unexpected character '{}' at position {}",
                    other as char,
                    self.pos - 1
                ));
            }
        };
        debug_assert!(organic_subset(&symbol));
        let atomic_num = atomic_number(&symbol)
            .ok_or_else(|| self.err(format!("unknown element '{symbol}'")))?;
        Ok(ParsedAtom {
            atom: Atom {
                atomic_num,
                is_aromatic: aromatic,
                ..Atom::default()
            },
            infer_hs: true,
        })
    }

    /// Parse the inside of `[...]`: `[isotope]symbol[@|@@][Hn][+/-n][:class]`.
    fn bracket_atom(&mut self) -> Result<ParsedAtom, String> {
        // Isotope label is accepted and ignored.
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }

        let first = self
            .bump()
            .ok_or_else(|| self.err("unterminated bracket atom"))?;
        if !first.is_ascii_alphabetic() {
            return Err(self.err("bracket atom missing element symbol"));
        }
        let aromatic = first.is_ascii_lowercase();
        let mut symbol = String::new();
        symbol.push((first as char).to_ascii_uppercase());
        // Second letter of a two-letter symbol. Only a lowercase letter
        // can extend it, so the H count in "[NH4+]" stays untouched.
        // Aromatic "se" and "as" also land here via Se and As.
        if let Some(next) = self.peek() {
            let two = format!("{symbol}{}", next as char);
            if next.is_ascii_lowercase() && atomic_number(&two).is_some() {
                symbol = two;
                self.pos += 1;
            }
        }
        let atomic_num = atomic_number(&symbol)
            .ok_or_else(|| self.err(format!("unknown element '{symbol}'")))?;

        let mut chirality = 0u8;
        if self.peek() == Some(b'@') {
            self.pos += 1;
            if self.peek() == Some(b'@') {
                self.pos += 1;
                chirality = 1; // clockwise
            } else {
                chirality = 2; // counterclockwise
            }
        }

        let mut h_count = 0u8;
        if self.peek() == Some(b'H') {
            self.pos += 1;
            h_count = 1;
            if let Some(d) = self.peek().filter(u8::is_ascii_digit) {
                self.pos += 1;
                h_count = d - b'0';
            }
        }

        let mut charge = 0i8;
        match self.peek() {
            Some(sign @ (b'+' | b'-')) => {
                self.pos += 1;
                let unit: i8 = if sign == b'+' { 1 } else { -1 };
                charge = unit;
                if let Some(d) = self.peek().filter(u8::is_ascii_digit) {
                    self.pos += 1;
                    charge = unit * (d - b'0') as i8;
                } else {
                    // Repeated signs: [O--], [Fe+++].
                    while self.peek() == Some(sign) {
                        self.pos += 1;
                        charge += unit;
                    }
                }
            }
            _ => {}
        }

        // Atom-map class label is accepted and ignored.
        if self.peek() == Some(b':') {
            self.pos += 1;
            if !self.peek().is_some_and(|b| b.is_ascii_digit()) {
                return Err(self.err("atom map ':' requires digits"));
            }
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }

        if self.bump() != Some(b']') {
            return Err(self.err("unterminated bracket atom"));
        }

        Ok(ParsedAtom {
            atom: Atom {
                atomic_num,
                formal_charge: charge,
                chirality,
                n_implicit_hs: h_count,
                is_aromatic: aromatic,
                radical_electrons: 0,
            },
            infer_hs: false,
        })
    }

    /// Finish parsing: infer implicit hydrogens and radicals now that
    /// every bond is known.
    fn finish(mut self) -> Result<(Vec<Atom>, Vec<Bond>), String> {
        if self.atoms.is_empty() {
            return Err("notation contains no atoms".into());
        }
        let mut bond_sums = vec![0u8; self.atoms.len()];
        for bond in &self.bonds {
            let contrib = bond.order.valence_contribution();
            bond_sums[bond.a1] = bond_sums[bond.a1].saturating_add(contrib);
            bond_sums[bond.a2] = bond_sums[bond.a2].saturating_add(contrib);
        }

        for (i, atom) in self.atoms.iter_mut().enumerate() {
            // Aromatic atoms hold one electron in the delocalized system.
            let mut used = bond_sums[i];
            if atom.is_aromatic {
                used = used.saturating_add(1);
            }
            if self.infer_hs[i] {
                let valences = default_valences(atom.atomic_num);
                // Charge shifts the target valence: N+ binds four, O- one.
                let target = valences
                    .iter()
                    .map(|&v| (i16::from(v) + i16::from(atom.formal_charge)).max(0) as u8)
                    .find(|&v| v >= used);
                atom.n_implicit_hs = match target {
                    Some(v) => v - used,
                    None => 0,
                };
            } else {
                // Bracket atoms: a filled valence shell short of the
                // default count leaves unpaired electrons.
                let explicit = used.saturating_add(atom.n_implicit_hs);
                if let Some(&v) = default_valences(atom.atomic_num).first() {
                    let target = (i16::from(v) + i16::from(atom.formal_charge)).max(0) as u8;
                    atom.radical_electrons = target.saturating_sub(explicit);
                }
            }
        }

        Ok((self.atoms, self.bonds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms_of(s: &str) -> Vec<Atom> {
        parse(s).unwrap().0
    }

    #[test]
    fn test_single_atoms() {
        assert_eq!(atoms_of("C")[0].atomic_num, 6);
        assert_eq!(atoms_of("N")[0].atomic_num, 7);
        assert_eq!(atoms_of("Cl")[0].atomic_num, 17);
        assert_eq!(atoms_of("Br")[0].atomic_num, 35);
    }

    #[test]
    fn test_implicit_hydrogens() {
        assert_eq!(atoms_of("C")[0].n_implicit_hs, 4);
        assert_eq!(atoms_of("N")[0].n_implicit_hs, 3);
        assert_eq!(atoms_of("O")[0].n_implicit_hs, 2);
        assert_eq!(atoms_of("CC")[0].n_implicit_hs, 3);
        assert_eq!(atoms_of("C=C")[0].n_implicit_hs, 2);
        assert_eq!(atoms_of("C#N")[0].n_implicit_hs, 1);
        assert_eq!(atoms_of("C#N")[1].n_implicit_hs, 0);
    }

    #[test]
    fn test_multivalent_sulfur() {
        // Dimethyl sulfoxide: S carries one double bond to O plus two
        // carbons, landing on the valence-4 form with no hydrogens.
        let atoms = atoms_of("CS(=O)C");
        assert_eq!(atoms[1].atomic_num, 16);
        assert_eq!(atoms[1].n_implicit_hs, 0);
    }

    #[test]
    fn test_branches() {
        // Isobutane: central carbon bonded to three methyls.
        let (atoms, bonds) = parse("CC(C)C").unwrap();
        assert_eq!(atoms.len(), 4);
        assert_eq!(bonds.len(), 3);
        assert!(bonds.iter().all(|b| b.a1 == 1 || b.a2 == 1));
        assert_eq!(atoms[1].n_implicit_hs, 1);
    }

    #[test]
    fn test_ring_closure() {
        let (atoms, bonds) = parse("C1CCCCC1").unwrap();
        assert_eq!(atoms.len(), 6);
        assert_eq!(bonds.len(), 6);
    }

    #[test]
    fn test_percent_ring_label() {
        let (_, bonds) = parse("C%12CC%12").unwrap();
        assert_eq!(bonds.len(), 3);
    }

    #[test]
    fn test_ring_closure_with_bond_order() {
        let (_, bonds) = parse("C=1CCCCC=1").unwrap();
        assert!(bonds.iter().any(|b| b.order == BondOrder::Double));
    }

    #[test]
    fn test_aromatic_ring() {
        let (atoms, bonds) = parse("c1ccccc1").unwrap();
        assert!(atoms.iter().all(|a| a.is_aromatic));
        assert!(atoms.iter().all(|a| a.n_implicit_hs == 1));
        assert!(bonds.iter().all(|b| b.order == BondOrder::Aromatic));
    }

    #[test]
    fn test_pyrrole_nitrogen() {
        // [nH] in pyrrole: explicit H count from the bracket.
        let atoms = atoms_of("c1cc[nH]c1");
        let n = atoms.iter().find(|a| a.atomic_num == 7).unwrap();
        assert_eq!(n.n_implicit_hs, 1);
        assert!(n.is_aromatic);
    }

    #[test]
    fn test_bracket_charges() {
        assert_eq!(atoms_of("[NH4+]")[0].formal_charge, 1);
        assert_eq!(atoms_of("[O-]")[0].formal_charge, -1);
        assert_eq!(atoms_of("[Fe+2]")[0].formal_charge, 2);
        assert_eq!(atoms_of("[O--]")[0].formal_charge, -2);
    }

    #[test]
    fn test_charged_organic_valence() {
        // Protonated amine: N+ in brackets binds four.
        let atoms = atoms_of("C[NH3+]");
        assert_eq!(atoms[1].n_implicit_hs, 3);
        assert_eq!(atoms[1].radical_electrons, 0);
    }

    #[test]
    fn test_chirality_tags() {
        assert_eq!(atoms_of("[C@H](C)(N)O")[0].chirality, 2);
        assert_eq!(atoms_of("[C@@H](C)(N)O")[0].chirality, 1);
        assert_eq!(atoms_of("C")[0].chirality, 0);
    }

    #[test]
    fn test_methyl_radical() {
        // [CH3]: carbon with three hydrogens and one unpaired electron.
        let atoms = atoms_of("[CH3]");
        assert_eq!(atoms[0].n_implicit_hs, 3);
        assert_eq!(atoms[0].radical_electrons, 1);
    }

    #[test]
    fn test_isotope_and_atom_map_ignored() {
        let atoms = atoms_of("[13CH4]");
        assert_eq!(atoms[0].atomic_num, 6);
        assert_eq!(atoms[0].n_implicit_hs, 4);
        let atoms = atoms_of("[CH4:7]");
        assert_eq!(atoms[0].n_implicit_hs, 4);
    }

    #[test]
    fn test_fragments() {
        // Sodium acetate as two fragments.
        let (atoms, bonds) = parse("CC(=O)[O-].[Na+]").unwrap();
        assert_eq!(atoms.len(), 5);
        assert_eq!(bonds.len(), 3);
    }

    #[test]
    fn test_stereo_slashes_parse_as_single() {
        let (_, bonds) = parse("C/C=C/C").unwrap();
        assert_eq!(bonds.len(), 3);
        assert_eq!(
            bonds.iter().filter(|b| b.order == BondOrder::Single).count(),
            2
        );
    }

    #[test]
    fn test_errors() {
        assert!(parse("").is_err());
        assert!(parse(".").is_err());
        assert!(parse("C(").is_err());
        assert!(parse("C)").is_err());
        assert!(parse("C1CC").is_err());
        assert!(parse("C=").is_err());
        assert!(parse("C==C").is_err());
        assert!(parse("[C").is_err());
        assert!(parse("[Xx]").is_err());
        assert!(parse("C11").is_err());
        assert!(parse("C1C1C").is_err());
        assert!(parse("%1").is_err());
        assert!(parse("C=.C").is_err());
    }
}
