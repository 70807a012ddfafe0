//! Molecular graph: atoms, bonds and the element table behind them.

use serde::Serialize;

/// Static data for one element.
#[derive(Debug)]
struct ElementInfo {
    number: u8,
    symbol: &'static str,
    mass: f64,
    /// Allowed neutral valences, ascending. Empty for elements that never
    /// receive implicit hydrogens.
    valences: &'static [u8],
    /// Covalent radius in Ångström.
    radius: f64,
}

const ELEMENTS: &[ElementInfo] = &[
    ElementInfo { number: 1, symbol: "H", mass: 1.008, valences: &[1], radius: 0.31 },
    ElementInfo { number: 2, symbol: "He", mass: 4.003, valences: &[], radius: 0.28 },
    ElementInfo { number: 3, symbol: "Li", mass: 6.94, valences: &[], radius: 1.28 },
    ElementInfo { number: 4, symbol: "Be", mass: 9.012, valences: &[], radius: 0.96 },
    ElementInfo { number: 5, symbol: "B", mass: 10.81, valences: &[3], radius: 0.84 },
    ElementInfo { number: 6, symbol: "C", mass: 12.011, valences: &[4], radius: 0.76 },
    ElementInfo { number: 7, symbol: "N", mass: 14.007, valences: &[3, 5], radius: 0.71 },
    ElementInfo { number: 8, symbol: "O", mass: 15.999, valences: &[2], radius: 0.66 },
    ElementInfo { number: 9, symbol: "F", mass: 18.998, valences: &[1], radius: 0.57 },
    ElementInfo { number: 10, symbol: "Ne", mass: 20.180, valences: &[], radius: 0.58 },
    ElementInfo { number: 11, symbol: "Na", mass: 22.990, valences: &[], radius: 1.66 },
    ElementInfo { number: 12, symbol: "Mg", mass: 24.305, valences: &[], radius: 1.41 },
    ElementInfo { number: 13, symbol: "Al", mass: 26.982, valences: &[], radius: 1.21 },
    ElementInfo { number: 14, symbol: "Si", mass: 28.085, valences: &[], radius: 1.11 },
    ElementInfo { number: 15, symbol: "P", mass: 30.974, valences: &[3, 5], radius: 1.07 },
    ElementInfo { number: 16, symbol: "S", mass: 32.065, valences: &[2, 4, 6], radius: 1.05 },
    ElementInfo { number: 17, symbol: "Cl", mass: 35.453, valences: &[1], radius: 1.02 },
    ElementInfo { number: 18, symbol: "Ar", mass: 39.948, valences: &[], radius: 1.06 },
    ElementInfo { number: 19, symbol: "K", mass: 39.098, valences: &[], radius: 2.03 },
    ElementInfo { number: 20, symbol: "Ca", mass: 40.078, valences: &[], radius: 1.76 },
    ElementInfo { number: 25, symbol: "Mn", mass: 54.938, valences: &[], radius: 1.39 },
    ElementInfo { number: 26, symbol: "Fe", mass: 55.845, valences: &[], radius: 1.32 },
    ElementInfo { number: 27, symbol: "Co", mass: 58.933, valences: &[], radius: 1.26 },
    ElementInfo { number: 28, symbol: "Ni", mass: 58.693, valences: &[], radius: 1.24 },
    ElementInfo { number: 29, symbol: "Cu", mass: 63.546, valences: &[], radius: 1.32 },
    ElementInfo { number: 30, symbol: "Zn", mass: 65.38, valences: &[], radius: 1.22 },
    ElementInfo { number: 32, symbol: "Ge", mass: 72.630, valences: &[], radius: 1.20 },
    ElementInfo { number: 33, symbol: "As", mass: 74.922, valences: &[3, 5], radius: 1.19 },
    ElementInfo { number: 34, symbol: "Se", mass: 78.971, valences: &[2, 4, 6], radius: 1.20 },
    ElementInfo { number: 35, symbol: "Br", mass: 79.904, valences: &[1], radius: 1.20 },
    ElementInfo { number: 47, symbol: "Ag", mass: 107.868, valences: &[], radius: 1.45 },
    ElementInfo { number: 50, symbol: "Sn", mass: 118.710, valences: &[], radius: 1.39 },
    ElementInfo { number: 53, symbol: "I", mass: 126.904, valences: &[1], radius: 1.39 },
    ElementInfo { number: 78, symbol: "Pt", mass: 195.084, valences: &[], radius: 1.36 },
    ElementInfo { number: 79, symbol: "Au", mass: 196.967, valences: &[], radius: 1.36 },
    ElementInfo { number: 80, symbol: "Hg", mass: 200.592, valences: &[], radius: 1.32 },
];

/// A chemical element, identified by atomic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element(u8);

impl Element {
    pub const H: Element = Element(1);
    pub const B: Element = Element(5);
    pub const C: Element = Element(6);
    pub const N: Element = Element(7);
    pub const O: Element = Element(8);
    pub const F: Element = Element(9);
    pub const P: Element = Element(15);
    pub const S: Element = Element(16);

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        ELEMENTS
            .iter()
            .find(|e| e.symbol == symbol)
            .map(|e| Element(e.number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    fn info(self) -> &'static ElementInfo {
        // Elements are only constructed from table entries.
        ELEMENTS
            .iter()
            .find(|e| e.number == self.0)
            .unwrap_or(&ELEMENTS[0])
    }

    pub fn symbol(self) -> &'static str {
        self.info().symbol
    }

    pub fn mass(self) -> f64 {
        self.info().mass
    }

    pub fn covalent_radius(self) -> f64 {
        self.info().radius
    }

    pub fn default_valences(self) -> &'static [u8] {
        self.info().valences
    }

    /// Elements that SMILES may write without brackets.
    pub fn in_organic_subset(self) -> bool {
        matches!(self.0, 5 | 6 | 7 | 8 | 9 | 15 | 16 | 17 | 35 | 53)
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for Element {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// Bond valence in half-units, so aromatic bonds stay integral.
    pub fn valence_x2(self) -> u32 {
        match self {
            BondOrder::Single => 2,
            BondOrder::Double => 4,
            BondOrder::Triple => 6,
            BondOrder::Aromatic => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: Element,
    pub aromatic: bool,
    pub charge: i8,
    pub isotope: Option<u16>,
    /// Attached hydrogens that are not graph atoms (implicit or bracket count).
    pub hydrogens: u8,
    /// Hydrogen count was written explicitly (bracket atom).
    pub bracket: bool,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            aromatic: false,
            charge: 0,
            isotope: None,
            hydrogens: 0,
            bracket: false,
        }
    }

    pub fn mass(&self) -> f64 {
        match self.isotope {
            Some(iso) => f64::from(iso),
            None => self.element.mass(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
    pub order: BondOrder,
}

impl Bond {
    pub fn other(&self, atom: usize) -> usize {
        if self.a == atom {
            self.b
        } else {
            self.a
        }
    }
}

/// An undirected molecular graph with hydrogens folded into atom counts.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    /// Add a bond. Returns `None` if the atoms are already bonded or identical.
    pub fn add_bond(&mut self, a: usize, b: usize, order: BondOrder) -> Option<usize> {
        if a == b || self.bond_between(a, b).is_some() {
            return None;
        }
        let idx = self.bonds.len();
        self.bonds.push(Bond { a, b, order });
        self.adjacency[a].push((b, idx));
        self.adjacency[b].push((a, idx));
        Some(idx)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, idx: usize) -> &Atom {
        &self.atoms[idx]
    }

    pub(crate) fn atom_mut(&mut self, idx: usize) -> &mut Atom {
        &mut self.atoms[idx]
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// `(neighbor, bond index)` pairs for an atom.
    pub fn neighbors(&self, idx: usize) -> &[(usize, usize)] {
        &self.adjacency[idx]
    }

    pub fn degree(&self, idx: usize) -> usize {
        self.adjacency[idx].len()
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<usize> {
        self.adjacency[a]
            .iter()
            .find(|(n, _)| *n == b)
            .map(|(_, bond)| *bond)
    }

    /// Sum of bond valences in half-units.
    pub fn bond_valence_x2(&self, idx: usize) -> u32 {
        self.adjacency[idx]
            .iter()
            .map(|(_, b)| self.bonds[*b].order.valence_x2())
            .sum()
    }

    /// Total valence: bonds plus attached hydrogens. Aromatic atoms count
    /// their pi contribution once.
    pub fn valence(&self, idx: usize) -> u32 {
        self.bonded_valence(idx) + u32::from(self.atoms[idx].hydrogens)
    }

    /// Valence used by bonds alone, with aromatic bonds counted as single
    /// plus one for the aromatic system.
    pub(crate) fn bonded_valence(&self, idx: usize) -> u32 {
        let atom = &self.atoms[idx];
        let mut aromatic_bonds = 0;
        let mut sum = 0;
        for (_, b) in &self.adjacency[idx] {
            match self.bonds[*b].order {
                BondOrder::Aromatic => aromatic_bonds += 1,
                order => sum += order.valence_x2() / 2,
            }
        }
        if aromatic_bonds > 0 || atom.aromatic {
            sum + aromatic_bonds + 1
        } else {
            sum
        }
    }

    /// Hydrogens an unbracketed atom gets from its default valences.
    pub fn implicit_hydrogens(&self, idx: usize) -> u8 {
        let atom = &self.atoms[idx];
        let used = self.bonded_valence(idx);
        atom.element
            .default_valences()
            .iter()
            .map(|v| u32::from(*v))
            .find(|v| *v >= used)
            .map(|v| (v - used) as u8)
            .unwrap_or(0)
    }

    pub fn has_bond_order(&self, idx: usize, order: BondOrder) -> bool {
        self.adjacency[idx]
            .iter()
            .any(|(_, b)| self.bonds[*b].order == order)
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.atoms
            .iter()
            .filter(|a| a.element != Element::H)
            .count()
    }

    pub fn net_charge(&self) -> i32 {
        self.atoms.iter().map(|a| i32::from(a.charge)).sum()
    }

    /// Connected component label for every atom.
    pub fn components(&self) -> Vec<usize> {
        let mut label = vec![usize::MAX; self.atoms.len()];
        let mut next = 0;
        for start in 0..self.atoms.len() {
            if label[start] != usize::MAX {
                continue;
            }
            let mut stack = vec![start];
            label[start] = next;
            while let Some(at) = stack.pop() {
                for (n, _) in &self.adjacency[at] {
                    if label[*n] == usize::MAX {
                        label[*n] = next;
                        stack.push(*n);
                    }
                }
            }
            next += 1;
        }
        label
    }

    pub fn component_count(&self) -> usize {
        self.components().into_iter().max().map_or(0, |m| m + 1)
    }

    /// Smallest set of smallest rings size equals the cyclomatic number.
    pub fn ring_count(&self) -> usize {
        (self.bonds.len() + self.component_count()).saturating_sub(self.atoms.len())
    }

    /// For every bond, whether it lies on a ring (is not a bridge).
    pub fn ring_bonds(&self) -> Vec<bool> {
        let n = self.atoms.len();
        let mut disc = vec![0usize; n];
        let mut low = vec![0usize; n];
        let mut in_ring = vec![true; self.bonds.len()];
        let mut time = 1;

        for root in 0..n {
            if disc[root] != 0 {
                continue;
            }
            // Iterative Tarjan bridge search: (atom, parent bond, next neighbor slot).
            let mut stack: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];
            disc[root] = time;
            low[root] = time;
            time += 1;
            while let Some(&mut (at, parent, ref mut slot)) = stack.last_mut() {
                if *slot < self.adjacency[at].len() {
                    let (next, bond) = self.adjacency[at][*slot];
                    *slot += 1;
                    if Some(bond) == parent {
                        continue;
                    }
                    if disc[next] == 0 {
                        disc[next] = time;
                        low[next] = time;
                        time += 1;
                        stack.push((next, Some(bond), 0));
                    } else {
                        low[at] = low[at].min(disc[next]);
                    }
                } else {
                    stack.pop();
                    if let (Some(bond), Some(&(up, _, _))) = (parent, stack.last()) {
                        low[up] = low[up].min(low[at]);
                        if low[at] > disc[up] {
                            in_ring[bond] = false;
                        }
                    }
                }
            }
        }
        in_ring
    }

    pub fn ring_atoms(&self) -> Vec<bool> {
        let ring_bonds = self.ring_bonds();
        let mut atoms = vec![false; self.atoms.len()];
        for (bond, on_ring) in self.bonds.iter().zip(ring_bonds) {
            if on_ring {
                atoms[bond.a] = true;
                atoms[bond.b] = true;
            }
        }
        atoms
    }

    /// Assign alternating single/double orders to aromatic bonds.
    ///
    /// Returns per-bond orders, or `None` when no Kekulé structure exists.
    pub fn kekulize(&self) -> Option<Vec<BondOrder>> {
        let mut orders: Vec<BondOrder> = self.bonds.iter().map(|b| b.order).collect();
        if !orders.contains(&BondOrder::Aromatic) {
            return Some(orders);
        }

        let needs_double: Vec<bool> = (0..self.atoms.len())
            .map(|i| self.needs_aromatic_double(i))
            .collect();
        let mut mate: Vec<Option<usize>> = vec![None; self.atoms.len()];

        for start in 0..self.atoms.len() {
            if needs_double[start] && mate[start].is_none() {
                let mut visited = vec![false; self.atoms.len()];
                if !self.augment(start, &needs_double, &mut mate, &mut visited) {
                    return None;
                }
            }
        }

        for (idx, bond) in self.bonds.iter().enumerate() {
            if bond.order == BondOrder::Aromatic {
                orders[idx] = if mate[bond.a] == Some(bond.b) {
                    BondOrder::Double
                } else {
                    BondOrder::Single
                };
            }
        }
        Some(orders)
    }

    fn needs_aromatic_double(&self, idx: usize) -> bool {
        let atom = &self.atoms[idx];
        if !atom.aromatic || self.has_bond_order(idx, BondOrder::Double) {
            return false;
        }
        let aromatic_bonds = self.adjacency[idx]
            .iter()
            .filter(|(_, b)| self.bonds[*b].order == BondOrder::Aromatic)
            .count() as u32;
        let single_bonds = self.degree(idx) as u32 - aromatic_bonds;
        let used = aromatic_bonds + single_bonds + u32::from(atom.hydrogens);
        // A double bond must fit in some allowed valence (adjusted for charge).
        let charge_shift = match atom.element {
            e if e == Element::C || e == Element::B => -i32::from(atom.charge).abs(),
            _ => i32::from(atom.charge),
        };
        atom.element.default_valences().iter().any(|v| {
            let allowed = i32::from(*v) + charge_shift;
            allowed >= 0 && used + 1 == allowed as u32
        })
    }

    fn augment(
        &self,
        at: usize,
        needs_double: &[bool],
        mate: &mut [Option<usize>],
        visited: &mut [bool],
    ) -> bool {
        visited[at] = true;
        for (next, bond) in &self.adjacency[at] {
            if self.bonds[*bond].order != BondOrder::Aromatic || !needs_double[*next] {
                continue;
            }
            if visited[*next] {
                continue;
            }
            visited[*next] = true;
            let free = match mate[*next] {
                None => true,
                Some(other) => self.augment(other, needs_double, mate, visited),
            };
            if free {
                mate[at] = Some(*next);
                mate[*next] = Some(at);
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::smiles;

    #[test]
    fn element_lookup_round_trips_symbol() {
        let cl = Element::from_symbol("Cl").unwrap();
        assert_eq!(cl.symbol(), "Cl");
        assert_eq!(cl.number(), 17);
        assert!(Element::from_symbol("Xx").is_none());
    }

    #[test]
    fn ring_bonds_distinguish_chain_from_ring() {
        let mol = smiles::parse("CC1CCCCC1").unwrap();
        let ring = mol.ring_bonds();
        let methyl = mol.bond_between(0, 1).unwrap();
        assert!(!ring[methyl]);
        assert_eq!(ring.iter().filter(|r| **r).count(), 6);
        assert_eq!(mol.ring_count(), 1);
    }

    #[test]
    fn naphthalene_has_two_rings() {
        let mol = smiles::parse("c1ccc2ccccc2c1").unwrap();
        assert_eq!(mol.ring_count(), 2);
        assert!(mol.ring_atoms().iter().all(|r| *r));
    }

    #[test]
    fn kekulize_benzene_alternates() {
        let mol = smiles::parse("c1ccccc1").unwrap();
        let orders = mol.kekulize().unwrap();
        let doubles = orders.iter().filter(|o| **o == BondOrder::Double).count();
        assert_eq!(doubles, 3);
        for atom in 0..mol.atom_count() {
            let around = mol
                .neighbors(atom)
                .iter()
                .filter(|(_, b)| orders[*b] == BondOrder::Double)
                .count();
            assert_eq!(around, 1);
        }
    }

    #[test]
    fn kekulize_pyrrole_leaves_nh_single() {
        let mol = smiles::parse("c1cc[nH]c1").unwrap();
        let orders = mol.kekulize().unwrap();
        assert_eq!(orders.iter().filter(|o| **o == BondOrder::Double).count(), 2);
    }
}
