//! Physicochemical descriptors computed from the molecular graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::crippen::crippen_logp;
use super::molecule::{BondOrder, Element, Molecule};

/// Descriptor set reported by `calculate_properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    pub formula: String,
    pub molecular_weight: f64,
    /// Wildman-Crippen logP.
    pub logp: f64,
    pub h_bond_donors: u32,
    pub h_bond_acceptors: u32,
    /// Topological polar surface area (N and O contributions), Å².
    pub tpsa: f64,
    pub num_rotatable_bonds: u32,
    pub heavy_atoms: u32,
    pub rings: u32,
}

impl PropertySet {
    pub fn compute(mol: &Molecule) -> Self {
        Self {
            formula: formula(mol),
            molecular_weight: round4(molecular_weight(mol)),
            logp: round4(crippen_logp(mol)),
            h_bond_donors: h_bond_donors(mol),
            h_bond_acceptors: h_bond_acceptors(mol),
            tpsa: round4(tpsa(mol)),
            num_rotatable_bonds: rotatable_bonds(mol),
            heavy_atoms: mol.heavy_atom_count() as u32,
            rings: mol.ring_count() as u32,
        }
    }

    /// Markdown table for the generator's context.
    pub fn to_table(&self) -> String {
        let rows = [
            ("Formula", self.formula.clone()),
            ("Molecular weight", format!("{:.4} g/mol", self.molecular_weight)),
            ("LogP", format!("{:.4}", self.logp)),
            ("H-bond donors", self.h_bond_donors.to_string()),
            ("H-bond acceptors", self.h_bond_acceptors.to_string()),
            ("TPSA", format!("{:.2} Å²", self.tpsa)),
            ("Rotatable bonds", self.num_rotatable_bonds.to_string()),
            ("Heavy atoms", self.heavy_atoms.to_string()),
            ("Rings", self.rings.to_string()),
        ];
        let mut out = String::from("| Property | Value |\n|---|---|\n");
        for (name, value) in rows {
            out.push_str(&format!("| {} | {} |\n", name, value));
        }
        out
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Hill-order formula with a trailing net charge.
pub fn formula(mol: &Molecule) -> String {
    let mut counts: BTreeMap<&'static str, u32> = BTreeMap::new();
    for atom in mol.atoms() {
        *counts.entry(atom.element.symbol()).or_default() += 1;
        if atom.hydrogens > 0 {
            *counts.entry("H").or_default() += u32::from(atom.hydrogens);
        }
    }

    let mut out = String::new();
    let mut push = |symbol: &str, n: u32| {
        out.push_str(symbol);
        if n > 1 {
            out.push_str(&n.to_string());
        }
    };
    if let Some(c) = counts.remove("C") {
        push("C", c);
        if let Some(h) = counts.remove("H") {
            push("H", h);
        }
    }
    for (symbol, n) in counts {
        push(symbol, n);
    }

    match mol.net_charge() {
        0 => {}
        1 => out.push('+'),
        -1 => out.push('-'),
        c if c > 0 => out.push_str(&format!("+{c}")),
        c => out.push_str(&format!("-{}", -c)),
    }
    out
}

pub fn molecular_weight(mol: &Molecule) -> f64 {
    mol.atoms()
        .iter()
        .map(|a| a.mass() + f64::from(a.hydrogens) * Element::H.mass())
        .sum()
}

fn is_n_or_o(element: Element) -> bool {
    element == Element::N || element == Element::O
}

/// Donors: N-H, neutral O-H/S-H with a single hydrogen, aromatic n-H.
fn h_bond_donors(mol: &Molecule) -> u32 {
    mol.atoms()
        .iter()
        .filter(|a| {
            a.hydrogens > 0
                && match a.element {
                    e if e == Element::N => a.charge >= 0,
                    e if e == Element::O || e == Element::S => a.hydrogens == 1 && a.charge == 0,
                    _ => false,
                }
        })
        .count() as u32
}

/// Acceptors: ether/carbonyl O and S, non-acid hydroxyls, anionic O/S,
/// trivalent N not next to a carbonyl-like center, pyridine-type n,
/// aromatic o/s, and fluorine.
fn h_bond_acceptors(mol: &Molecule) -> u32 {
    let mut count = 0;
    for idx in 0..mol.atom_count() {
        let atom = mol.atom(idx);
        let e = atom.element;
        let accepts = if e == Element::O || e == Element::S {
            if atom.aromatic {
                atom.charge == 0
            } else if atom.charge < 0 {
                true
            } else if atom.charge > 0 {
                false
            } else if atom.hydrogens == 1 && mol.valence(idx) == 2 {
                !mol.neighbors(idx)
                    .iter()
                    .any(|(n, _)| has_double_to_hetero(mol, *n))
            } else {
                atom.hydrogens == 0 && mol.valence(idx) == 2
            }
        } else if e == Element::N {
            if atom.aromatic {
                atom.hydrogens == 0 && atom.charge == 0 && mol.degree(idx) == 2
            } else {
                atom.charge == 0
                    && mol.valence(idx) == 3
                    && !mol.neighbors(idx)
                        .iter()
                        .any(|(n, b)| mol.bonds()[*b].order == BondOrder::Single && has_double_to_hetero(mol, *n))
            }
        } else {
            e == Element::F
        };
        if accepts {
            count += 1;
        }
    }
    count
}

fn has_double_to_hetero(mol: &Molecule, idx: usize) -> bool {
    mol.neighbors(idx).iter().any(|(n, b)| {
        mol.bonds()[*b].order == BondOrder::Double
            && matches!(mol.atom(*n).element.number(), 7 | 8 | 15 | 16)
    })
}

/// Ertl TPSA contributions for nitrogen and oxygen environments.
fn tpsa(mol: &Molecule) -> f64 {
    let ring_bonds = mol.ring_bonds();
    let mut total = 0.0;
    for idx in 0..mol.atom_count() {
        let atom = mol.atom(idx);
        if !is_n_or_o(atom.element) {
            continue;
        }
        let (mut single, mut double, mut triple, mut aromatic) = (0, 0, 0, 0);
        let mut in_three_ring = false;
        for (n, b) in mol.neighbors(idx) {
            match mol.bonds()[*b].order {
                BondOrder::Single => single += 1,
                BondOrder::Double => double += 1,
                BondOrder::Triple => triple += 1,
                BondOrder::Aromatic => aromatic += 1,
            }
            if ring_bonds[*b] && in_small_ring(mol, idx, *n) {
                in_three_ring = true;
            }
        }
        let h = atom.hydrogens;
        let contribution = if atom.element == Element::N {
            match (atom.charge, h, single, double, triple, aromatic) {
                (0, 0, 3, 0, 0, 0) if in_three_ring => 3.01,
                (0, 0, 3, 0, 0, 0) => 3.24,
                (0, 0, 1, 1, 0, 0) => 12.36,
                (0, 0, 0, 0, 1, 0) => 23.79,
                (0, 0, 1, 2, 0, 0) => 11.68,
                (0, 0, 0, 1, 1, 0) => 13.60,
                (0, 1, 2, 0, 0, 0) if in_three_ring => 21.94,
                (0, 1, 2, 0, 0, 0) => 12.03,
                (0, 1, 0, 1, 0, 0) => 23.85,
                (0, 2, 1, 0, 0, 0) => 26.02,
                (1, 0, 4, 0, 0, 0) => 0.00,
                (1, 0, 2, 1, 0, 0) => 3.01,
                (1, 0, 1, 0, 1, 0) => 4.36,
                (1, 1, 3, 0, 0, 0) => 4.44,
                (1, 1, 1, 1, 0, 0) => 13.97,
                (1, 2, 2, 0, 0, 0) => 16.61,
                (1, 2, 0, 1, 0, 0) => 25.59,
                (1, 3, 1, 0, 0, 0) => 27.64,
                (0, 0, 0, 0, 0, 2) => 12.89,
                (0, 0, 0, 0, 0, 3) => 4.41,
                (0, 0, 1, 0, 0, 2) => 4.93,
                (0, 0, 0, 1, 0, 2) => 8.39,
                (0, 1, 0, 0, 0, 2) => 15.79,
                (1, 0, 0, 0, 0, 3) => 4.10,
                (1, 0, 1, 0, 0, 2) => 3.88,
                (1, 1, 0, 0, 0, 2) => 14.14,
                // Nitrogen environments without a tabulated value.
                _ => 0.0,
            }
        } else {
            match (atom.charge, h, single, double, aromatic) {
                (0, 0, 2, 0, 0) if in_three_ring => 12.53,
                (0, 0, 2, 0, 0) => 9.23,
                (0, 0, 0, 1, 0) => 17.07,
                (0, 1, 1, 0, 0) => 20.23,
                (-1, 0, 1, 0, 0) => 23.06,
                (0, 0, 0, 0, 2) => 13.14,
                _ => 0.0,
            }
        };
        total += contribution;
    }
    total
}

/// Whether the bond `a`-`b` closes a three-membered ring.
fn in_small_ring(mol: &Molecule, a: usize, b: usize) -> bool {
    mol.neighbors(a)
        .iter()
        .any(|(n, _)| *n != b && mol.bond_between(*n, b).is_some())
}

/// Single, non-ring bonds between non-terminal heavy atoms, excluding
/// triple-bond neighbors and amide C-N bonds.
fn rotatable_bonds(mol: &Molecule) -> u32 {
    let ring_bonds = mol.ring_bonds();
    let blocked = |idx: usize| mol.degree(idx) < 2 || mol.has_bond_order(idx, BondOrder::Triple);
    let amide_n = |n: usize, c: usize| {
        let n_atom = mol.atom(n);
        n_atom.element == Element::N
            && n_atom.hydrogens == 1
            && mol.atom(c).element == Element::C
            && mol.neighbors(c).iter().any(|(o, b)| {
                mol.atom(*o).element == Element::O && mol.bonds()[*b].order == BondOrder::Double
            })
    };

    mol.bonds()
        .iter()
        .enumerate()
        .filter(|(idx, bond)| {
            bond.order == BondOrder::Single
                && !ring_bonds[*idx]
                && !blocked(bond.a)
                && !blocked(bond.b)
                && !amide_n(bond.a, bond.b)
                && !amide_n(bond.b, bond.a)
        })
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::smiles;

    fn props(smiles: &str) -> PropertySet {
        PropertySet::compute(&smiles::parse(smiles).unwrap())
    }

    #[test]
    fn benzoic_acid_descriptors() {
        let p = props("OC(=O)c1ccccc1");
        assert_eq!(p.formula, "C7H6O2");
        assert!((p.molecular_weight - 122.123).abs() < 0.001);
        assert!((p.logp - 1.3848).abs() < 0.001);
        assert_eq!(p.h_bond_donors, 1);
        assert_eq!(p.h_bond_acceptors, 1);
        assert!((p.tpsa - 37.3).abs() < 0.01);
        assert_eq!(p.num_rotatable_bonds, 1);
        assert_eq!(p.heavy_atoms, 9);
        assert_eq!(p.rings, 1);
    }

    #[test]
    fn ethanol_descriptors() {
        let p = props("CCO");
        assert_eq!(p.formula, "C2H6O");
        assert!((p.molecular_weight - 46.069).abs() < 0.001);
        assert!((p.logp - -0.0014).abs() < 0.001);
        assert_eq!(p.h_bond_donors, 1);
        assert_eq!(p.h_bond_acceptors, 1);
        assert!((p.tpsa - 20.23).abs() < 0.001);
        assert_eq!(p.num_rotatable_bonds, 0);
    }

    #[test]
    fn pyridine_and_amide_polar_area() {
        assert!((props("c1ccncc1").tpsa - 12.89).abs() < 0.001);
        // acetamide: carbonyl O 17.07 + NH2 26.02
        let p = props("CC(N)=O");
        assert!((p.tpsa - 43.09).abs() < 0.001);
        assert_eq!(p.h_bond_acceptors, 1);
    }

    #[test]
    fn formula_without_carbon_is_alphabetical() {
        assert_eq!(formula(&smiles::parse("O").unwrap()), "H2O");
        assert_eq!(formula(&smiles::parse("[NH4+]").unwrap()), "H4N+");
    }

    #[test]
    fn table_lists_every_property() {
        let table = props("CCO").to_table();
        assert!(table.contains("| Formula | C2H6O |"));
        assert!(table.contains("Rotatable bonds"));
        assert!(table.contains("| LogP | -0.0014 |"));
    }
}
