//! Symmetry classes and canonical atom ranks.
//!
//! Atoms start from a local invariant (element, connectivity, hydrogens,
//! charge, isotope, valence, ring membership) and are refined by their
//! neighbors' classes until the partition stops splitting. Bond orders are
//! deliberately left out of the refinement: the valence term already carries
//! them, and leaving them out keeps Kekulé and aromatic spellings of one ring
//! symmetric.

use super::molecule::Molecule;

/// Symmetry class per atom. Atoms that are equivalent under the molecule's
/// automorphisms share a class; class numbers are canonical (independent of
/// input order).
pub fn symmetry_classes(mol: &Molecule) -> Vec<u32> {
    refine(mol, initial_ranks(mol))
}

/// Number of distinct symmetry classes among the selected atoms.
pub fn count_classes<F>(mol: &Molecule, mut select: F) -> usize
where
    F: FnMut(usize) -> bool,
{
    let classes = symmetry_classes(mol);
    let mut seen: Vec<u32> = (0..mol.atom_count())
        .filter(|i| select(*i))
        .map(|i| classes[i])
        .collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

/// A total canonical order of the atoms: symmetry classes with ties broken
/// one at a time, re-refining after every split.
pub fn canonical_ranks(mol: &Molecule) -> Vec<u32> {
    let mut ranks = symmetry_classes(mol);
    loop {
        let Some(tied) = lowest_tied_rank(&ranks) else {
            return ranks;
        };
        // Any member of an automorphism class gives the same final order;
        // take the first one.
        let pick = ranks.iter().position(|r| *r == tied).unwrap_or(0);
        let split: Vec<(u32, u32)> = ranks
            .iter()
            .enumerate()
            .map(|(i, r)| (*r, u32::from(i != pick || *r != tied)))
            .collect();
        ranks = refine(mol, dense_rank(&split));
    }
}

fn initial_ranks(mol: &Molecule) -> Vec<u32> {
    let ring = mol.ring_atoms();
    let keys: Vec<_> = (0..mol.atom_count())
        .map(|i| {
            let atom = mol.atom(i);
            (
                atom.element.number(),
                mol.degree(i),
                atom.hydrogens,
                atom.charge,
                atom.isotope.unwrap_or(0),
                mol.valence(i),
                ring[i],
                atom.aromatic,
            )
        })
        .collect();
    dense_rank(&keys)
}

fn refine(mol: &Molecule, mut ranks: Vec<u32>) -> Vec<u32> {
    let mut count = distinct(&ranks);
    loop {
        let keys: Vec<(u32, Vec<u32>)> = (0..mol.atom_count())
            .map(|i| {
                let mut around: Vec<u32> = mol.neighbors(i).iter().map(|(n, _)| ranks[*n]).collect();
                around.sort_unstable();
                (ranks[i], around)
            })
            .collect();
        let next = dense_rank(&keys);
        let next_count = distinct(&next);
        ranks = next;
        if next_count == count {
            return ranks;
        }
        count = next_count;
    }
}

/// Rank keys densely: equal keys share a rank, ranks follow key order.
fn dense_rank<K: Ord>(keys: &[K]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|a, b| keys[*a].cmp(&keys[*b]));
    let mut ranks = vec![0u32; keys.len()];
    let mut rank = 0u32;
    for (pos, idx) in order.iter().enumerate() {
        if pos > 0 && keys[order[pos - 1]] != keys[*idx] {
            rank += 1;
        }
        ranks[*idx] = rank;
    }
    ranks
}

fn distinct(ranks: &[u32]) -> usize {
    let mut sorted = ranks.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

fn lowest_tied_rank(ranks: &[u32]) -> Option<u32> {
    let mut sorted = ranks.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).find(|w| w[0] == w[1]).map(|w| w[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::molecule::Element;
    use crate::chem::smiles;

    fn carbon_classes(smiles: &str) -> usize {
        let mol = smiles::parse(smiles).unwrap();
        count_classes(&mol, |i| mol.atom(i).element == Element::C)
    }

    #[test]
    fn benzene_is_fully_symmetric() {
        assert_eq!(carbon_classes("c1ccccc1"), 1);
        assert_eq!(carbon_classes("C1=CC=CC=C1"), 1);
    }

    #[test]
    fn benzoic_acid_has_five_carbon_environments() {
        // carboxyl, ipso, ortho, meta, para
        assert_eq!(carbon_classes("OC(=O)c1ccccc1"), 5);
        assert_eq!(carbon_classes("OC(=O)C1=CC=CC=C1"), 5);
    }

    #[test]
    fn common_symmetry_counts() {
        assert_eq!(carbon_classes("CCO"), 2);
        assert_eq!(carbon_classes("CC(C)=O"), 2);
        assert_eq!(carbon_classes("CC(C)(C)C"), 2);
        assert_eq!(carbon_classes("Cc1ccc(C)cc1"), 3);
        assert_eq!(carbon_classes("CCCC(=O)O"), 4);
        assert_eq!(carbon_classes("c1ccc2ccccc2c1"), 3);
    }

    #[test]
    fn classes_do_not_depend_on_atom_order() {
        let a = smiles::parse("OC(=O)c1ccccc1").unwrap();
        let b = smiles::parse("c1cc(ccc1)C(=O)O").unwrap();
        let mut ca = symmetry_classes(&a);
        let mut cb = symmetry_classes(&b);
        ca.sort_unstable();
        cb.sort_unstable();
        assert_eq!(ca, cb);
    }

    #[test]
    fn canonical_ranks_are_a_total_order() {
        let mol = smiles::parse("c1ccccc1").unwrap();
        let mut ranks = canonical_ranks(&mol);
        ranks.sort_unstable();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4, 5]);
    }
}
