//! Wildman-Crippen logP.
//!
//! Every heavy atom and every hydrogen is assigned one of the published
//! atom types and contributes that type's value. Types are tried in table
//! order, so the first matching environment wins. Elements without a
//! tabulated type contribute nothing.

use super::molecule::{BondOrder, Element, Molecule};

/// One heavy neighbor as seen from the atom being typed.
#[derive(Debug, Clone, Copy)]
struct Neighbor {
    idx: usize,
    element: Element,
    aromatic: bool,
    order: BondOrder,
}

impl Neighbor {
    fn is(&self, element: Element) -> bool {
        self.element == element
    }

    fn aliphatic(&self, element: Element) -> bool {
        self.element == element && !self.aromatic
    }
}

/// Heavy-atom environment: neighbors without hydrogens, hydrogens counted.
struct Site {
    aromatic: bool,
    charge: i8,
    hydrogens: u32,
    neighbors: Vec<Neighbor>,
}

impl Site {
    fn new(mol: &Molecule, idx: usize) -> Self {
        let atom = mol.atom(idx);
        let mut hydrogens = u32::from(atom.hydrogens);
        let mut neighbors = Vec::new();
        for (n, b) in mol.neighbors(idx) {
            let other = mol.atom(*n);
            if other.element == Element::H {
                hydrogens += 1;
            } else {
                neighbors.push(Neighbor {
                    idx: *n,
                    element: other.element,
                    aromatic: other.aromatic,
                    order: mol.bonds()[*b].order,
                });
            }
        }
        Self {
            aromatic: atom.aromatic,
            charge: atom.charge,
            hydrogens,
            neighbors,
        }
    }

    fn all_single(&self) -> bool {
        self.neighbors.iter().all(|n| n.order == BondOrder::Single)
    }

    /// sp3: four single connections.
    fn saturated(&self) -> bool {
        self.all_single() && self.neighbors.len() + self.hydrogens as usize == 4
    }

    fn double(&self) -> Option<&Neighbor> {
        self.neighbors.iter().find(|n| n.order == BondOrder::Double)
    }

    fn has_order(&self, order: BondOrder) -> bool {
        self.neighbors.iter().any(|n| n.order == order)
    }
}

/// Elements of the "N,O,P,S,F,Cl,Br,I" heteroatom class.
fn polar_hetero(element: Element) -> bool {
    matches!(element.number(), 7 | 8 | 15 | 16 | 9 | 17 | 35 | 53)
}

/// Estimated octanol/water partition coefficient.
pub fn crippen_logp(mol: &Molecule) -> f64 {
    (0..mol.atom_count())
        .map(|idx| {
            let atom = mol.atom(idx);
            if atom.element == Element::H {
                let host = mol.neighbors(idx).first().map(|(n, _)| *n);
                return hydrogen(mol, host);
            }
            heavy(mol, idx) + f64::from(atom.hydrogens) * hydrogen(mol, Some(idx))
        })
        .sum()
}

fn heavy(mol: &Molecule, idx: usize) -> f64 {
    let site = Site::new(mol, idx);
    match mol.atom(idx).element.number() {
        6 if site.aromatic => aromatic_carbon(&site),
        6 => carbon(&site),
        7 => nitrogen(&site),
        8 => oxygen(mol, idx, &site),
        9 if site.charge < 0 => -2.996,
        9 => 0.4202,
        17 if site.charge < 0 => -2.996,
        17 => 0.6895,
        35 if site.charge < 0 => -2.996,
        35 => 0.8456,
        53 if site.charge < 0 => -2.996,
        53 => 0.8857,
        15 => 0.8612,
        16 if site.aromatic => 0.6237,
        16 if site.charge != 0 => -0.0024,
        16 => 0.6482,
        _ => 0.0,
    }
}

fn carbon(site: &Site) -> f64 {
    if site.saturated() {
        let n = &site.neighbors;
        if n.iter().all(|x| x.aliphatic(Element::C)) {
            return if site.hydrogens >= 2 { 0.1441 } else { 0.0 };
        }
        if n.iter().all(|x| !x.aromatic) && n.iter().any(|x| polar_hetero(x.element)) {
            return if site.hydrogens >= 2 { -0.2035 } else { -0.2051 };
        }
        if let Some(ring) = n.iter().find(|x| x.aromatic) {
            return match site.hydrogens {
                3 if ring.is(Element::C) => 0.08452,
                3 => -0.1444,
                2 => -0.0516,
                1 => 0.1193,
                _ => -0.0967,
            };
        }
        if n.iter().any(|x| !polar_hetero(x.element) && !x.is(Element::C)) {
            return 0.2148;
        }
        return 0.08129;
    }

    if site
        .neighbors
        .iter()
        .any(|x| x.order == BondOrder::Double && !x.aromatic && !x.is(Element::C))
    {
        return -0.2783;
    }
    if let Some(partner) = site.double() {
        if partner.aromatic {
            return 0.264;
        }
        let substituted_by_ring = site
            .neighbors
            .iter()
            .any(|x| x.idx != partner.idx && x.aromatic);
        return if substituted_by_ring { 0.264 } else { 0.1551 };
    }
    if site.has_order(BondOrder::Triple) && site.neighbors.len() + site.hydrogens as usize == 2 {
        return 0.0017;
    }
    0.08129
}

fn aromatic_carbon(site: &Site) -> f64 {
    let ring = site
        .neighbors
        .iter()
        .filter(|x| x.order == BondOrder::Aromatic)
        .count();
    let exocyclic: Vec<&Neighbor> = site
        .neighbors
        .iter()
        .filter(|x| x.order != BondOrder::Aromatic)
        .collect();

    let single_to = |pred: &dyn Fn(&Neighbor) -> bool| {
        exocyclic
            .iter()
            .any(|x| x.order == BondOrder::Single && pred(*x))
    };

    // Substituents outside C, N, O, S and the halogens (P included).
    if site.hydrogens == 0
        && single_to(&|x| {
            !x.aromatic
                && !x.is(Element::C)
                && (x.is(Element::P) || !polar_hetero(x.element))
        })
    {
        return -0.5443;
    }
    for x in &exocyclic {
        match x.element.number() {
            9 => return 0.0,
            17 => return 0.245,
            35 => return 0.198,
            53 => return 0.0,
            _ => {}
        }
    }
    if site.hydrogens > 0 {
        return 0.1581;
    }
    if ring >= 3 {
        return 0.2955;
    }
    if ring == 2 {
        if single_to(&|x| x.aromatic) {
            return 0.2713;
        }
        if single_to(&|x| x.aliphatic(Element::C)) {
            return 0.136;
        }
        if single_to(&|x| x.aliphatic(Element::N)) {
            return 0.4619;
        }
        if single_to(&|x| x.aliphatic(Element::O)) {
            return 0.5437;
        }
        if single_to(&|x| x.aliphatic(Element::S)) {
            return 0.1893;
        }
        if exocyclic.iter().any(|x| {
            x.order == BondOrder::Double && !x.aromatic && matches!(x.element.number(), 6 | 7 | 8)
        }) {
            return -0.8186;
        }
    }
    0.08129
}

fn nitrogen(site: &Site) -> f64 {
    if site.aromatic {
        return if site.charge > 0 { -1.119 } else { -0.3239 };
    }
    if site.charge < 0 {
        return 0.2887;
    }
    if site.charge > 0 {
        if site.hydrogens > 0 {
            return -1.95;
        }
        if site.has_order(BondOrder::Triple) {
            return 0.2887;
        }
        if site.neighbors.len() >= 3 || site.double().is_some() {
            return -0.3396;
        }
        return -0.4806;
    }

    let any_ring = site.neighbors.iter().any(|x| x.aromatic);
    if site.all_single() {
        return match (site.hydrogens, site.neighbors.len()) {
            (2, 1) if any_ring => -1.027,
            (2, 1) => -1.019,
            (1, 2) if any_ring => -0.5188,
            (1, 2) => -0.7096,
            (0, 3) if any_ring => -0.4458,
            (0, 3) => -0.3187,
            _ => -0.4806,
        };
    }
    if site.has_order(BondOrder::Triple) {
        return 0.01508;
    }
    if site.double().is_some_and(|d| !d.aromatic) {
        return if site.hydrogens == 1 { 0.08387 } else { 0.1836 };
    }
    -0.4806
}

fn oxygen(mol: &Molecule, idx: usize, site: &Site) -> f64 {
    if site.aromatic {
        return 0.1552;
    }
    if site.charge < 0 {
        let carboxylate = |n: &Neighbor| {
            n.is(Element::C) && Site::new(mol, n.idx).double().is_some_and(|d| d.is(Element::O))
        };
        return match site.neighbors.first() {
            Some(n) if n.is(Element::N) => 0.0335,
            Some(n) if n.is(Element::S) => -0.3339,
            Some(n) if carboxylate(n) => -1.326,
            _ => -1.189,
        };
    }
    if site.hydrogens >= 1 {
        return -0.2893;
    }
    if site.all_single() && site.neighbors.len() == 2 {
        return if site.neighbors.iter().any(|x| x.aromatic) {
            -0.4195
        } else {
            -0.0684
        };
    }
    match site.double() {
        Some(d) if d.aromatic => 0.1788,
        Some(d) if d.is(Element::N) || d.is(Element::O) => 0.0335,
        Some(d) if d.is(Element::C) => carbonyl_oxygen(mol, d.idx, idx),
        _ => -0.1188,
    }
}

fn carbonyl_oxygen(mol: &Molecule, carbon: usize, oxygen: usize) -> f64 {
    let site = Site::new(mol, carbon);
    let others: Vec<&Neighbor> = site.neighbors.iter().filter(|x| x.idx != oxygen).collect();

    if others.iter().any(|x| x.aromatic) {
        return 0.1129;
    }
    if others.iter().any(|x| x.is(Element::C)) {
        return -0.1526;
    }
    let formyl = site.hydrogens == 2
        || (site.hydrogens == 1 && others.iter().all(|x| x.is(Element::N) || x.is(Element::O)));
    let dioxide =
        others.len() == 1 && others[0].is(Element::O) && others[0].order == BondOrder::Double;
    if formyl || dioxide {
        return -0.1526;
    }
    if others.len() == 2 {
        return 0.4833;
    }
    -0.1188
}

/// Contribution of one hydrogen attached to `host`.
fn hydrogen(mol: &Molecule, host: Option<usize>) -> f64 {
    let Some(host) = host else {
        return 0.1125;
    };
    match mol.atom(host).element.number() {
        1 | 6 => 0.123,
        7 => 0.2142,
        8 => {
            let site = Site::new(mol, host);
            let Some(other) = site.neighbors.first() else {
                return -0.2677;
            };
            let other_site = Site::new(mol, other.idx);
            match other.element.number() {
                7 => 0.2142,
                6 if other.aromatic || other_site.saturated() => -0.2677,
                6 if other_site.neighbors.iter().any(|x| {
                    x.order == BondOrder::Double && matches!(x.element.number(), 6 | 7 | 8 | 16)
                }) =>
                {
                    0.298
                }
                8 | 16 => 0.298,
                6 => 0.1125,
                _ => -0.2677,
            }
        }
        _ => -0.2677,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::smiles;

    fn logp(s: &str) -> f64 {
        crippen_logp(&smiles::parse(s).unwrap())
    }

    #[test]
    fn reference_values() {
        assert!((logp("OC(=O)c1ccccc1") - 1.3848).abs() < 1e-3);
        assert!((logp("CCO") - -0.0014).abs() < 1e-3);
        assert!((logp("c1ccccc1") - 1.6866).abs() < 1e-3);
        // 2 x CH3 on carbon, 1 x CH2 on carbon, 8 H.
        assert!((logp("CCC") - 1.4163).abs() < 1e-3);
    }

    #[test]
    fn polar_groups_lower_logp() {
        assert!(logp("CCCCCC") > logp("CCCCCO"));
        assert!(logp("c1ccccc1") > logp("c1ccncc1"));
        assert!(logp("CC(=O)[O-]") < logp("CC(=O)O"));
    }

    #[test]
    fn halogens_raise_logp() {
        assert!(logp("Clc1ccccc1") > logp("c1ccccc1"));
    }
}
