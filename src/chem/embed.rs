//! 3D coordinate embedding and MOL (V2000) output.
//!
//! Explicit hydrogens are added, bond lengths come from covalent radii and
//! bond angles from each center's hybridization. The resulting distance
//! restraints are relaxed from a seeded random start (`Standard`) or from the
//! 2D layout lifted into space (`Relaxed`).

use std::fmt::{self, Write as _};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::depict::{is_linear, layout_2d, polygon_angle, ring_size_through};
use super::forcefield::{law_of_cosines, ForceField, Point, Restraint};
use super::molecule::{Atom, BondOrder, Element, Molecule};

/// V2000 counts line has three digits per field.
pub const MAX_MOLFILE_ATOMS: usize = 999;

const CONTACT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedStrategy {
    /// Random start, tight bond tolerance.
    Standard,
    /// 2D layout start, more iterations, looser tolerance.
    Relaxed,
}

impl EmbedStrategy {
    fn max_steps(self) -> usize {
        match self {
            EmbedStrategy::Standard => 3000,
            EmbedStrategy::Relaxed => 6000,
        }
    }

    fn bond_tolerance(self) -> f64 {
        match self {
            EmbedStrategy::Standard => 0.1,
            EmbedStrategy::Relaxed => 0.25,
        }
    }
}

impl fmt::Display for EmbedStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedStrategy::Standard => f.write_str("standard"),
            EmbedStrategy::Relaxed => f.write_str("relaxed"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EmbedError {
    #[error("molecule has no atoms")]
    Empty,

    #[error("{0} atoms with hydrogens exceeds the MOL block limit of 999")]
    TooManyAtoms(usize),

    #[error("{strategy} embedding did not converge (worst bond off by {deviation:.3} Å)")]
    Failed { strategy: EmbedStrategy, deviation: f64 },
}

/// A 3D structure serialized as a MOL block.
#[derive(Debug, Clone, Serialize)]
pub struct StructureBlock {
    pub block: String,
    pub strategy: EmbedStrategy,
    pub seed: u64,
    pub energy: f64,
    pub atom_count: usize,
}

/// Copy of the molecule with every hydrogen as a graph atom. Heavy atoms keep
/// their indices, bonds keep their order.
pub fn with_explicit_hydrogens(mol: &Molecule) -> Molecule {
    let mut out = Molecule::new();
    for atom in mol.atoms() {
        out.add_atom(Atom {
            hydrogens: 0,
            ..atom.clone()
        });
    }
    for bond in mol.bonds() {
        out.add_bond(bond.a, bond.b, bond.order);
    }
    for (idx, atom) in mol.atoms().iter().enumerate() {
        for _ in 0..atom.hydrogens {
            let h = out.add_atom(Atom::new(Element::H));
            out.add_bond(idx, h, BondOrder::Single);
        }
    }
    out
}

fn bond_length(mol: &Molecule, a: usize, b: usize, order: BondOrder) -> f64 {
    let base = mol.atom(a).element.covalent_radius() + mol.atom(b).element.covalent_radius();
    base - match order {
        BondOrder::Single => 0.0,
        BondOrder::Aromatic => 0.1,
        BondOrder::Double => 0.19,
        BondOrder::Triple => 0.32,
    }
}

fn center_angle(mol: &Molecule, idx: usize) -> f64 {
    if is_linear(mol, idx) {
        return 180.0;
    }
    match mol.degree(idx) {
        d if d >= 5 => 90.0,
        4 => 109.47,
        _ if mol.atom(idx).aromatic || mol.has_bond_order(idx, BondOrder::Double) => 120.0,
        _ => 109.47,
    }
}

/// Bond restraints first, then 1-3 restraints.
fn build_force_field(mol: &Molecule) -> (ForceField, usize) {
    let n = mol.atom_count();
    let mut restraints = Vec::new();
    let mut near = vec![vec![false; n]; n];
    let mut lengths = vec![Vec::new(); n];

    for bond in mol.bonds() {
        let target = bond_length(mol, bond.a, bond.b, bond.order);
        restraints.push(Restraint {
            i: bond.a,
            j: bond.b,
            target,
            weight: 2.0,
        });
        lengths[bond.a].push((bond.b, target));
        lengths[bond.b].push((bond.a, target));
        near[bond.a][bond.b] = true;
        near[bond.b][bond.a] = true;
    }
    let bond_restraints = restraints.len();

    for j in 0..n {
        let around = &lengths[j];
        let hybrid = center_angle(mol, j);
        for (x, (i, d_ij)) in around.iter().enumerate() {
            for (k, d_jk) in &around[x + 1..] {
                let angle = match ring_size_through(mol, *i, j, *k) {
                    Some(size) if size <= 5 => polygon_angle(size),
                    _ => hybrid,
                };
                restraints.push(Restraint {
                    i: *i,
                    j: *k,
                    target: law_of_cosines(*d_ij, *d_jk, angle),
                    weight: 1.0,
                });
                near[*i][*k] = true;
                near[*k][*i] = true;
            }
        }
    }

    let contacts = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .filter(|(i, j)| !near[*i][*j])
        .collect();
    (ForceField::new(restraints, contacts, CONTACT), bond_restraints)
}

fn starting_coords(mol: &Molecule, strategy: EmbedStrategy, rng: &mut StdRng) -> Vec<Point> {
    match strategy {
        EmbedStrategy::Standard => {
            let half = ((mol.atom_count() as f64).cbrt() * 1.5).max(2.0);
            (0..mol.atom_count())
                .map(|_| {
                    [
                        rng.gen_range(-half..half),
                        rng.gen_range(-half..half),
                        rng.gen_range(-half..half),
                    ]
                })
                .collect()
        }
        EmbedStrategy::Relaxed => layout_2d(mol)
            .into_iter()
            .map(|p| [p[0] * 1.5, p[1] * 1.5, rng.gen_range(-0.3..0.3)])
            .collect(),
    }
}

/// Embed the molecule in 3D and serialize it as a MOL block.
pub fn embed(
    mol: &Molecule,
    strategy: EmbedStrategy,
    seed: u64,
    title: &str,
) -> Result<StructureBlock, EmbedError> {
    if mol.is_empty() {
        return Err(EmbedError::Empty);
    }
    let full = with_explicit_hydrogens(mol);
    if full.atom_count() > MAX_MOLFILE_ATOMS {
        return Err(EmbedError::TooManyAtoms(full.atom_count()));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut coords = starting_coords(&full, strategy, &mut rng);
    let (field, bond_restraints) = build_force_field(&full);
    let result = field.minimize(&mut coords, strategy.max_steps(), 1e-4);
    let deviation = field.worst_deviation(&coords, bond_restraints);

    tracing::debug!(
        "{} embedding: {} atoms, energy {:.4}, worst bond deviation {:.3}, converged {}",
        strategy,
        full.atom_count(),
        result.energy,
        deviation,
        result.converged
    );

    if !result.energy.is_finite() || deviation > strategy.bond_tolerance() {
        return Err(EmbedError::Failed {
            strategy,
            deviation,
        });
    }

    Ok(StructureBlock {
        block: mol_block(mol, &full, &coords, title),
        strategy,
        seed,
        energy: result.energy,
        atom_count: full.atom_count(),
    })
}

fn charge_code(charge: i8) -> u8 {
    match charge {
        3 => 1,
        2 => 2,
        1 => 3,
        -1 => 5,
        -2 => 6,
        -3 => 7,
        _ => 0,
    }
}

/// Write `M  CHG`/`M  ISO` property lines, eight entries per line.
fn property_lines(out: &mut String, tag: &str, entries: &[(usize, i32)]) {
    for chunk in entries.chunks(8) {
        let _ = write!(out, "M  {tag}{:>3}", chunk.len());
        for (atom, value) in chunk {
            let _ = write!(out, " {:>3} {:>3}", atom + 1, value);
        }
        out.push('\n');
    }
}

/// Serialize explicit-hydrogen coordinates as a V2000 MOL block. `source`
/// supplies Kekulé orders for the heavy-atom bonds, which come first in
/// `full`.
fn mol_block(source: &Molecule, full: &Molecule, coords: &[Point], title: &str) -> String {
    let heavy_orders = source
        .kekulize()
        .unwrap_or_else(|| source.bonds().iter().map(|b| b.order).collect());

    let mut out = String::new();
    out.push_str(title.lines().next().unwrap_or(""));
    out.push('\n');
    let _ = writeln!(
        out,
        "  chemagnt{}3D",
        chrono::Utc::now().format("%m%d%y%H%M")
    );
    out.push('\n');
    let _ = writeln!(
        out,
        "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000",
        full.atom_count(),
        full.bonds().len()
    );

    for (atom, p) in full.atoms().iter().zip(coords) {
        let _ = writeln!(
            out,
            "{:>10.4}{:>10.4}{:>10.4} {:<3} 0{:>3}  0  0  0  0  0  0  0  0  0  0",
            p[0],
            p[1],
            p[2],
            atom.element.symbol(),
            charge_code(atom.charge)
        );
    }
    for (idx, bond) in full.bonds().iter().enumerate() {
        let order = match heavy_orders.get(idx).copied().unwrap_or(bond.order) {
            BondOrder::Single => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Aromatic => 4,
        };
        let _ = writeln!(
            out,
            "{:>3}{:>3}{:>3}  0  0  0  0",
            bond.a + 1,
            bond.b + 1,
            order
        );
    }

    let charges: Vec<(usize, i32)> = full
        .atoms()
        .iter()
        .enumerate()
        .filter(|(_, a)| a.charge != 0)
        .map(|(i, a)| (i, i32::from(a.charge)))
        .collect();
    property_lines(&mut out, "CHG", &charges);
    let isotopes: Vec<(usize, i32)> = full
        .atoms()
        .iter()
        .enumerate()
        .filter_map(|(i, a)| a.isotope.map(|iso| (i, i32::from(iso))))
        .collect();
    property_lines(&mut out, "ISO", &isotopes);
    out.push_str("M  END\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::forcefield::distance;
    use crate::chem::smiles;

    fn atom_lines(block: &str) -> Vec<&str> {
        let counts = block.lines().nth(3).unwrap();
        let n: usize = counts[..3].trim().parse().unwrap();
        block.lines().skip(4).take(n).collect()
    }

    #[test]
    fn explicit_hydrogens_for_ethanol() {
        let mol = smiles::parse("CCO").unwrap();
        let full = with_explicit_hydrogens(&mol);
        assert_eq!(full.atom_count(), 9);
        assert_eq!(full.bonds().len(), 8);
        assert!(full.atoms().iter().all(|a| a.hydrogens == 0));
        assert_eq!(full.bonds()[0], mol.bonds()[0]);
    }

    #[test]
    fn standard_embedding_of_ethanol() {
        let mol = smiles::parse("CCO").unwrap();
        let result = embed(&mol, EmbedStrategy::Standard, 42, "ethanol").unwrap();
        assert_eq!(result.atom_count, 9);
        assert_eq!(result.strategy, EmbedStrategy::Standard);

        let lines: Vec<&str> = result.block.lines().collect();
        assert_eq!(lines[0], "ethanol");
        assert!(lines[3].starts_with("  9  8"));
        assert!(lines[3].ends_with("V2000"));
        assert_eq!(lines.last().copied(), Some("M  END"));
        assert_eq!(atom_lines(&result.block).len(), 9);
    }

    #[test]
    fn same_seed_gives_same_coordinates() {
        let mol = smiles::parse("CC(=O)O").unwrap();
        let a = embed(&mol, EmbedStrategy::Standard, 7, "").unwrap();
        let b = embed(&mol, EmbedStrategy::Standard, 7, "").unwrap();
        assert_eq!(atom_lines(&a.block), atom_lines(&b.block));
    }

    #[test]
    fn benzene_bonds_are_kekulized() {
        let mol = smiles::parse("c1ccccc1").unwrap();
        let result = embed(&mol, EmbedStrategy::Relaxed, 1, "benzene").unwrap();
        let bond_orders: Vec<&str> = result
            .block
            .lines()
            .skip(4 + 12)
            .take(12)
            .map(|l| l[6..9].trim())
            .collect();
        assert_eq!(bond_orders.iter().filter(|o| **o == "2").count(), 3);
        assert!(!bond_orders.contains(&"4"));
    }

    #[test]
    fn charges_are_written() {
        let mol = smiles::parse("C[N+](C)(C)C").unwrap();
        let result = embed(&mol, EmbedStrategy::Standard, 3, "").unwrap();
        assert!(result.block.contains("M  CHG  1   2   1\n"));
    }

    #[test]
    fn bond_lengths_follow_radii() {
        let mol = smiles::parse("C#N").unwrap();
        let full = with_explicit_hydrogens(&mol);
        let (field, bonds) = build_force_field(&full);
        let mut rng = StdRng::seed_from_u64(5);
        let mut coords = starting_coords(&full, EmbedStrategy::Standard, &mut rng);
        field.minimize(&mut coords, 2000, 1e-6);
        assert!(field.worst_deviation(&coords, bonds) < 0.05);
        assert!((distance(coords[0], coords[1]) - 1.15).abs() < 0.05);
    }

    #[test]
    fn empty_molecule_is_rejected() {
        assert_eq!(
            embed(&Molecule::new(), EmbedStrategy::Standard, 0, "").unwrap_err(),
            EmbedError::Empty
        );
    }
}
