//! SMILES reading and canonical writing.
//!
//! Stereo markers (`@`, `/`, `\`) are accepted and dropped; the graph keeps
//! constitution only.

use std::collections::HashMap;

use thiserror::Error;

use super::molecule::{Atom, BondOrder, Element, Molecule};
use super::symmetry;

#[derive(Debug, Error, PartialEq)]
pub enum SmilesError {
    #[error("empty SMILES string")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unknown element '{0}'")]
    UnknownElement(String),

    #[error("unterminated bracket atom starting at position {0}")]
    UnterminatedBracket(usize),

    #[error("unbalanced parentheses")]
    UnbalancedBranch,

    #[error("ring closure {0} was never closed")]
    UnclosedRing(u16),

    #[error("bond symbol at position {0} is not followed by an atom")]
    DanglingBond(usize),

    #[error("atoms {0} and {1} are bonded twice")]
    DuplicateBond(usize, usize),

    #[error("atom {atom} ({element}) has valence {valence}, more than {element} allows")]
    Valence {
        atom: usize,
        element: &'static str,
        valence: u32,
    },
}

/// Largest formal charge magnitude accepted on a bracket atom.
const MAX_CHARGE: i8 = 15;

struct Parser {
    chars: Vec<char>,
    pos: usize,
    mol: Molecule,
}

/// Parse a SMILES string into a molecule with hydrogens folded into counts.
pub fn parse(input: &str) -> Result<Molecule, SmilesError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SmilesError::Empty);
    }
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
        mol: Molecule::new(),
    };
    parser.run()?;
    let mut mol = parser.mol;
    assign_implicit_hydrogens(&mut mol);
    check_valences(&mol)?;
    Ok(fold_explicit_hydrogens(mol))
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn run(&mut self) -> Result<(), SmilesError> {
        let mut prev: Option<usize> = None;
        let mut branches: Vec<Option<usize>> = Vec::new();
        let mut pending: Option<(BondOrder, usize)> = None;
        let mut rings: HashMap<u16, (usize, Option<BondOrder>)> = HashMap::new();

        while let Some(ch) = self.peek() {
            match ch {
                '(' => {
                    if prev.is_none() {
                        return Err(SmilesError::UnexpectedChar { ch, pos: self.pos });
                    }
                    branches.push(prev);
                    self.pos += 1;
                }
                ')' => {
                    if pending.is_some() {
                        return Err(SmilesError::DanglingBond(self.pos));
                    }
                    prev = branches.pop().ok_or(SmilesError::UnbalancedBranch)?;
                    self.pos += 1;
                }
                '-' | '=' | '#' | ':' | '/' | '\\' => {
                    if prev.is_none() || pending.is_some() {
                        return Err(SmilesError::UnexpectedChar { ch, pos: self.pos });
                    }
                    let order = match ch {
                        '=' => BondOrder::Double,
                        '#' => BondOrder::Triple,
                        ':' => BondOrder::Aromatic,
                        _ => BondOrder::Single,
                    };
                    pending = Some((order, self.pos));
                    self.pos += 1;
                }
                '.' => {
                    if pending.is_some() {
                        return Err(SmilesError::DanglingBond(self.pos));
                    }
                    prev = None;
                    self.pos += 1;
                }
                '0'..='9' | '%' => {
                    let at = prev.ok_or(SmilesError::UnexpectedChar { ch, pos: self.pos })?;
                    let label = self.ring_label()?;
                    let order = pending.take().map(|(o, _)| o);
                    match rings.remove(&label) {
                        Some((other, open_order)) => {
                            let order = order
                                .or(open_order)
                                .unwrap_or_else(|| self.default_order(other, at));
                            self.mol
                                .add_bond(other, at, order)
                                .ok_or(SmilesError::DuplicateBond(other, at))?;
                        }
                        None => {
                            rings.insert(label, (at, order));
                        }
                    }
                }
                _ => {
                    let atom = self.atom()?;
                    let idx = self.mol.add_atom(atom);
                    if let Some(p) = prev {
                        let order = pending
                            .take()
                            .map(|(o, _)| o)
                            .unwrap_or_else(|| self.default_order(p, idx));
                        self.mol
                            .add_bond(p, idx, order)
                            .ok_or(SmilesError::DuplicateBond(p, idx))?;
                    }
                    prev = Some(idx);
                }
            }
        }

        if let Some((_, pos)) = pending {
            return Err(SmilesError::DanglingBond(pos));
        }
        if !branches.is_empty() {
            return Err(SmilesError::UnbalancedBranch);
        }
        if let Some(label) = rings.keys().min() {
            return Err(SmilesError::UnclosedRing(*label));
        }
        if self.mol.is_empty() {
            return Err(SmilesError::Empty);
        }
        Ok(())
    }

    fn default_order(&self, a: usize, b: usize) -> BondOrder {
        if self.mol.atom(a).aromatic && self.mol.atom(b).aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn ring_label(&mut self) -> Result<u16, SmilesError> {
        let start = self.pos;
        match self.peek() {
            Some('%') => {
                self.pos += 1;
                let digits: String = self.chars[self.pos..]
                    .iter()
                    .take(2)
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                if digits.len() != 2 {
                    return Err(SmilesError::UnexpectedChar { ch: '%', pos: start });
                }
                self.pos += 2;
                digits
                    .parse()
                    .map_err(|_| SmilesError::UnexpectedChar { ch: '%', pos: start })
            }
            Some(c) if c.is_ascii_digit() => {
                self.pos += 1;
                Ok(c as u16 - '0' as u16)
            }
            Some(ch) => Err(SmilesError::UnexpectedChar { ch, pos: start }),
            None => Err(SmilesError::Empty),
        }
    }

    fn atom(&mut self) -> Result<Atom, SmilesError> {
        let start = self.pos;
        let ch = self.peek().ok_or(SmilesError::Empty)?;
        if ch == '[' {
            return self.bracket_atom();
        }
        if ch == '*' {
            return Err(SmilesError::UnknownElement("*".to_string()));
        }

        // Organic subset: two-letter halogens first.
        let two: String = self.chars[self.pos..].iter().take(2).collect();
        if two == "Cl" || two == "Br" {
            self.pos += 2;
            return Ok(Atom::new(Element::from_symbol(&two).ok_or(
                SmilesError::UnknownElement(two.clone()),
            )?));
        }

        let (symbol, aromatic) = match ch {
            'B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I' => (ch.to_string(), false),
            'b' | 'c' | 'n' | 'o' | 'p' | 's' => (ch.to_ascii_uppercase().to_string(), true),
            _ => return Err(SmilesError::UnexpectedChar { ch, pos: start }),
        };
        self.pos += 1;
        let element =
            Element::from_symbol(&symbol).ok_or(SmilesError::UnknownElement(symbol))?;
        let mut atom = Atom::new(element);
        atom.aromatic = aromatic;
        Ok(atom)
    }

    fn bracket_atom(&mut self) -> Result<Atom, SmilesError> {
        let start = self.pos;
        let close = self.chars[start..]
            .iter()
            .position(|c| *c == ']')
            .map(|offset| start + offset)
            .ok_or(SmilesError::UnterminatedBracket(start))?;
        let body: Vec<char> = self.chars[start + 1..close].to_vec();
        self.pos = close + 1;

        let mut i = 0;
        let unexpected = |i: usize, body: &[char]| SmilesError::UnexpectedChar {
            ch: body.get(i).copied().unwrap_or(']'),
            pos: start + 1 + i,
        };

        let iso: String = body.iter().take_while(|c| c.is_ascii_digit()).collect();
        i += iso.len();
        let isotope = if iso.is_empty() {
            None
        } else {
            Some(iso.parse::<u16>().map_err(|_| unexpected(0, &body))?)
        };

        let (element, aromatic, used) = bracket_symbol(&body[i..]).ok_or_else(|| {
            SmilesError::UnknownElement(body[i..].iter().take(2).collect::<String>())
        })?;
        i += used;

        // Chirality: @, @@, @TH1, @SP2, @OH12 ...
        if body.get(i) == Some(&'@') {
            while body.get(i) == Some(&'@') {
                i += 1;
            }
            let tag: String = body[i..].iter().take(2).collect();
            if matches!(tag.as_str(), "TH" | "AL" | "SP" | "TB" | "OH") {
                i += 2;
                while body.get(i).is_some_and(|c| c.is_ascii_digit()) {
                    i += 1;
                }
            }
        }

        let mut hydrogens = 0u8;
        if body.get(i) == Some(&'H') {
            i += 1;
            let digits: String = body[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
            i += digits.len();
            hydrogens = if digits.is_empty() {
                1
            } else {
                digits.parse().map_err(|_| unexpected(i, &body))?
            };
        }

        let mut charge: i8 = 0;
        if let Some(sign @ ('+' | '-')) = body.get(i).copied() {
            let unit = if sign == '+' { 1 } else { -1 };
            i += 1;
            let digits: String = body[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
            if !digits.is_empty() {
                i += digits.len();
                let magnitude: i8 = digits
                    .parse()
                    .ok()
                    .filter(|m| *m <= MAX_CHARGE)
                    .ok_or_else(|| unexpected(i - digits.len(), &body))?;
                charge = unit * magnitude;
            } else {
                charge = unit;
                while body.get(i) == Some(&sign) {
                    charge = charge
                        .checked_add(unit)
                        .filter(|c| c.abs() <= MAX_CHARGE)
                        .ok_or_else(|| unexpected(i, &body))?;
                    i += 1;
                }
            }
        }

        // Atom class (":n") is ignored.
        if body.get(i) == Some(&':') {
            i += 1;
            while body.get(i).is_some_and(|c| c.is_ascii_digit()) {
                i += 1;
            }
        }

        if i != body.len() {
            return Err(unexpected(i, &body));
        }

        Ok(Atom {
            element,
            aromatic,
            charge,
            isotope,
            hydrogens,
            bracket: true,
        })
    }
}

/// Element symbol at the start of a bracket body: `(element, aromatic, chars used)`.
fn bracket_symbol(body: &[char]) -> Option<(Element, bool, usize)> {
    let first = *body.first()?;
    if first.is_ascii_lowercase() {
        let two: String = body.iter().take(2).collect();
        if two == "se" || two == "as" {
            let sym = format!("{}{}", two[..1].to_ascii_uppercase(), &two[1..]);
            return Element::from_symbol(&sym).map(|e| (e, true, 2));
        }
        let sym = first.to_ascii_uppercase().to_string();
        return match first {
            'b' | 'c' | 'n' | 'o' | 'p' | 's' => Element::from_symbol(&sym).map(|e| (e, true, 1)),
            _ => None,
        };
    }
    if !first.is_ascii_uppercase() {
        return None;
    }
    if let Some(second) = body.get(1).filter(|c| c.is_ascii_lowercase()) {
        let two = format!("{first}{second}");
        if let Some(e) = Element::from_symbol(&two) {
            return Some((e, false, 2));
        }
    }
    Element::from_symbol(&first.to_string()).map(|e| (e, false, 1))
}

fn assign_implicit_hydrogens(mol: &mut Molecule) {
    for idx in 0..mol.atom_count() {
        if !mol.atom(idx).bracket {
            let h = mol.implicit_hydrogens(idx);
            mol.atom_mut(idx).hydrogens = h;
        }
    }
}

/// Reject unbracketed atoms bonded beyond their largest default valence.
/// Aromatic bonds count once; an aromatic carbon also needs one unit for
/// the pi system unless it carries an exocyclic double bond.
fn check_valences(mol: &Molecule) -> Result<(), SmilesError> {
    for idx in 0..mol.atom_count() {
        let atom = mol.atom(idx);
        if atom.bracket {
            continue;
        }
        let Some(&max) = atom.element.default_valences().last() else {
            continue;
        };
        let mut used = 0;
        let mut exocyclic_double = false;
        for (_, b) in mol.neighbors(idx) {
            match mol.bonds()[*b].order {
                BondOrder::Aromatic => used += 1,
                order => {
                    exocyclic_double |= order == BondOrder::Double;
                    used += order.valence_x2() / 2;
                }
            }
        }
        if atom.aromatic && atom.element == Element::C && !exocyclic_double {
            used += 1;
        }
        if used > u32::from(max) {
            return Err(SmilesError::Valence {
                atom: idx,
                element: atom.element.symbol(),
                valence: used,
            });
        }
    }
    Ok(())
}

/// Fold plain `[H]` atoms into their heavy neighbor's hydrogen count.
fn fold_explicit_hydrogens(mol: Molecule) -> Molecule {
    let foldable: Vec<bool> = (0..mol.atom_count())
        .map(|i| {
            let atom = mol.atom(i);
            atom.element == Element::H
                && atom.charge == 0
                && atom.isotope.is_none()
                && atom.hydrogens == 0
                && mol.degree(i) == 1
                && mol.atom(mol.neighbors(i)[0].0).element != Element::H
        })
        .collect();
    if !foldable.iter().any(|f| *f) {
        return mol;
    }

    let mut out = Molecule::new();
    let mut remap = vec![usize::MAX; mol.atom_count()];
    for i in 0..mol.atom_count() {
        if !foldable[i] {
            remap[i] = out.add_atom(mol.atom(i).clone());
        }
    }
    for i in 0..mol.atom_count() {
        if foldable[i] {
            let heavy = remap[mol.neighbors(i)[0].0];
            let atom = out.atom_mut(heavy);
            atom.hydrogens = atom.hydrogens.saturating_add(1);
        }
    }
    for bond in mol.bonds() {
        if !foldable[bond.a] && !foldable[bond.b] {
            out.add_bond(remap[bond.a], remap[bond.b], bond.order);
        }
    }
    out
}

/// Write a canonical SMILES: identical graphs give identical strings
/// regardless of input atom order.
pub fn to_canonical(mol: &Molecule) -> String {
    let ranks = symmetry::canonical_ranks(mol);
    let n = mol.atom_count();
    let mut visited = vec![false; n];
    let mut fragments = Vec::new();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|i| ranks[*i]);

    for &start in &order {
        if visited[start] {
            continue;
        }
        let tree = SpanningTree::build(mol, start, &ranks, &mut visited);
        fragments.push(tree.write(mol));
    }
    fragments.join(".")
}

/// DFS tree of one fragment with its ring-closure bonds.
struct SpanningTree {
    root: usize,
    children: HashMap<usize, Vec<usize>>,
    /// Ring-closure bonds per atom, in DFS discovery order.
    closures: HashMap<usize, Vec<usize>>,
}

impl SpanningTree {
    fn build(mol: &Molecule, root: usize, ranks: &[u32], visited: &mut [bool]) -> Self {
        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut closures: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut closure_bonds = std::collections::HashSet::new();
        let mut on_path = vec![false; mol.atom_count()];

        // Iterative DFS: (atom, parent bond, sorted neighbors, cursor).
        let sorted = |at: usize| {
            let mut nbrs: Vec<(usize, usize)> = mol.neighbors(at).to_vec();
            nbrs.sort_by_key(|(n, _)| ranks[*n]);
            nbrs
        };
        visited[root] = true;
        on_path[root] = true;
        let mut stack: Vec<(usize, Option<usize>, Vec<(usize, usize)>, usize)> =
            vec![(root, None, sorted(root), 0)];

        while let Some((at, parent, nbrs, cursor)) = stack.last_mut() {
            if *cursor >= nbrs.len() {
                on_path[*at] = false;
                stack.pop();
                continue;
            }
            let (next, bond) = nbrs[*cursor];
            *cursor += 1;
            let at = *at;
            if Some(bond) == *parent || closure_bonds.contains(&bond) {
                continue;
            }
            if visited[next] {
                if on_path[next] {
                    closure_bonds.insert(bond);
                    closures.entry(next).or_default().push(bond);
                    closures.entry(at).or_default().push(bond);
                }
                continue;
            }
            visited[next] = true;
            on_path[next] = true;
            children.entry(at).or_default().push(next);
            stack.push((next, Some(bond), sorted(next), 0));
        }

        Self {
            root,
            children,
            closures,
        }
    }

    fn write(&self, mol: &Molecule) -> String {
        enum Step {
            /// Atom, incoming tree bond, opens a parenthesized branch.
            Atom(usize, Option<usize>, bool),
            Close,
        }

        let mut out = String::new();
        let mut open: HashMap<usize, u16> = HashMap::new();
        let mut free: Vec<u16> = Vec::new();
        let mut next_label = 1u16;
        let mut stack = vec![Step::Atom(self.root, None, false)];

        while let Some(step) = stack.pop() {
            let (at, incoming, branch) = match step {
                Step::Close => {
                    out.push(')');
                    continue;
                }
                Step::Atom(at, incoming, branch) => (at, incoming, branch),
            };
            if branch {
                out.push('(');
            }
            if let Some(bond) = incoming {
                out.push_str(bond_symbol(mol, bond));
            }
            out.push_str(&atom_symbol(mol, at));

            for bond in self.closures.get(&at).into_iter().flatten() {
                match open.remove(bond) {
                    Some(label) => {
                        out.push_str(bond_symbol(mol, *bond));
                        push_ring_label(&mut out, label);
                        free.push(label);
                        free.sort_unstable_by(|a, b| b.cmp(a));
                    }
                    None => {
                        let label = free.pop().unwrap_or_else(|| {
                            next_label += 1;
                            next_label - 1
                        });
                        open.insert(*bond, label);
                        push_ring_label(&mut out, label);
                    }
                }
            }

            let kids = self.children.get(&at).cloned().unwrap_or_default();
            // Pushed in reverse so the lowest-ranked child is written first;
            // every child but the last goes in parentheses.
            for (i, child) in kids.iter().enumerate().rev() {
                let bond = mol.bond_between(at, *child);
                if i + 1 < kids.len() {
                    stack.push(Step::Close);
                    stack.push(Step::Atom(*child, bond, true));
                } else {
                    stack.push(Step::Atom(*child, bond, false));
                }
            }
        }
        out
    }
}

fn push_ring_label(out: &mut String, label: u16) {
    if label < 10 {
        out.push_str(&label.to_string());
    } else {
        out.push_str(&format!("%{label:02}"));
    }
}

fn bond_symbol(mol: &Molecule, bond: usize) -> &'static str {
    let b = mol.bonds()[bond];
    let both_aromatic = mol.atom(b.a).aromatic && mol.atom(b.b).aromatic;
    match b.order {
        BondOrder::Double => "=",
        BondOrder::Triple => "#",
        BondOrder::Aromatic if both_aromatic => "",
        BondOrder::Aromatic => ":",
        BondOrder::Single if both_aromatic => "-",
        BondOrder::Single => "",
    }
}

fn atom_symbol(mol: &Molecule, idx: usize) -> String {
    let atom = mol.atom(idx);
    let symbol = if atom.aromatic {
        atom.element.symbol().to_ascii_lowercase()
    } else {
        atom.element.symbol().to_string()
    };
    let plain = atom.element.in_organic_subset()
        && atom.charge == 0
        && atom.isotope.is_none()
        && atom.hydrogens == mol.implicit_hydrogens(idx);
    if plain {
        return symbol;
    }

    let mut out = String::from("[");
    if let Some(iso) = atom.isotope {
        out.push_str(&iso.to_string());
    }
    out.push_str(&symbol);
    match atom.hydrogens {
        0 => {}
        1 => out.push('H'),
        h => out.push_str(&format!("H{h}")),
    }
    match atom.charge {
        0 => {}
        1 => out.push('+'),
        -1 => out.push('-'),
        c if c > 0 => out.push_str(&format!("+{c}")),
        c => out.push_str(&format!("-{}", -c)),
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ethanol_with_implicit_hydrogens() {
        let mol = parse("CCO").unwrap();
        assert_eq!(mol.atom_count(), 3);
        let hs: Vec<u8> = mol.atoms().iter().map(|a| a.hydrogens).collect();
        assert_eq!(hs, vec![3, 2, 1]);
    }

    #[test]
    fn parses_aromatic_ring_and_branch() {
        let mol = parse("OC(=O)c1ccccc1").unwrap();
        assert_eq!(mol.atom_count(), 9);
        assert_eq!(mol.ring_count(), 1);
        let aromatic = mol.atoms().iter().filter(|a| a.aromatic).count();
        assert_eq!(aromatic, 6);
        let total_h: u32 = mol.atoms().iter().map(|a| u32::from(a.hydrogens)).sum();
        assert_eq!(total_h, 6);
    }

    #[test]
    fn parses_bracket_atoms() {
        let mol = parse("[NH4+].[Cl-]").unwrap();
        assert_eq!(mol.atom(0).hydrogens, 4);
        assert_eq!(mol.atom(0).charge, 1);
        assert_eq!(mol.atom(1).charge, -1);
        assert_eq!(mol.component_count(), 2);

        let mol = parse("[13CH3][C@@H](O)C").unwrap();
        assert_eq!(mol.atom(0).isotope, Some(13));
        assert_eq!(mol.atom(1).hydrogens, 1);
    }

    #[test]
    fn folds_explicit_hydrogens() {
        let mol = parse("[H]C([H])([H])[H]").unwrap();
        assert_eq!(mol.atom_count(), 1);
        assert_eq!(mol.atom(0).hydrogens, 4);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(parse(""), Err(SmilesError::Empty)));
        assert!(matches!(parse("C1CC"), Err(SmilesError::UnclosedRing(1))));
        assert!(matches!(parse("C(C"), Err(SmilesError::UnbalancedBranch)));
        assert!(matches!(parse("C="), Err(SmilesError::DanglingBond(1))));
        assert!(parse("xyzabc123").is_err());
        assert!(parse("benzoic acid").is_err());
        assert!(matches!(parse("[CH3"), Err(SmilesError::UnterminatedBracket(0))));
    }

    #[test]
    fn rejects_runaway_charges() {
        let many_plus = format!("[C{}]", "+".repeat(130));
        assert!(matches!(
            parse(&many_plus),
            Err(SmilesError::UnexpectedChar { .. })
        ));
        assert!(parse("[Fe+99]").is_err());
        assert_eq!(parse("[Fe+++]").unwrap().atom(0).charge, 3);
        assert_eq!(parse("[O-2]").unwrap().atom(0).charge, -2);
    }

    #[test]
    fn rejects_hypervalent_atoms() {
        assert!(matches!(
            parse("C(C)(C)(C)(C)C"),
            Err(SmilesError::Valence { atom: 0, element: "C", valence: 5 })
        ));
        assert!(matches!(parse("CO(C)C"), Err(SmilesError::Valence { .. })));
        assert!(matches!(parse("c1ccccc1(C)C"), Err(SmilesError::Valence { .. })));
        for ok in [
            "CC(C)(C)C",
            "CS(C)(=O)=O",
            "OP(O)(O)=O",
            "O=c1cccc[nH]1",
            "o1cccc1",
            "c1ccc2ccccc2c1",
            "C[N+](C)(C)C",
        ] {
            assert!(parse(ok).is_ok(), "{ok} should parse");
        }
    }

    #[test]
    fn canonical_form_ignores_atom_order() {
        let a = to_canonical(&parse("OC(=O)c1ccccc1").unwrap());
        let b = to_canonical(&parse("c1ccc(cc1)C(O)=O").unwrap());
        let c = to_canonical(&parse("C1=CC=CC=C1C(=O)O").unwrap());
        assert_eq!(a, b);
        // Kekulé input keeps explicit bond orders, so it is a different string.
        assert_ne!(a, c);
        assert_eq!(
            to_canonical(&parse("C(C)O").unwrap()),
            to_canonical(&parse("OCC").unwrap())
        );
    }

    #[test]
    fn canonical_form_round_trips() {
        for smiles in [
            "CCO",
            "OC(=O)c1ccccc1",
            "c1ccc2ccccc2c1",
            "CC(C)(C)C#N",
            "[NH4+].[Cl-]",
            "C1CC2CCC1CC2",
            "O=C1CCCCC1",
        ] {
            let first = to_canonical(&parse(smiles).unwrap());
            let second = to_canonical(&parse(&first).unwrap());
            assert_eq!(first, second, "round trip of {smiles}");
        }
    }
}
