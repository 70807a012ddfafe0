//! 2D structure depiction rendered as SVG.

use std::collections::VecDeque;
use std::fmt::Write as _;

use super::forcefield::{law_of_cosines, ForceField, Point, Restraint};
use super::molecule::{BondOrder, Element, Molecule};

const MARGIN: f64 = 30.0;
const MAX_BOND_PX: f64 = 45.0;

/// Size of the smallest ring that contains the path `i - j - k`.
pub(crate) fn ring_size_through(mol: &Molecule, i: usize, j: usize, k: usize) -> Option<usize> {
    // Shortest path from i to k that avoids j.
    let mut dist = vec![usize::MAX; mol.atom_count()];
    let mut queue = VecDeque::new();
    dist[i] = 0;
    queue.push_back(i);
    while let Some(at) = queue.pop_front() {
        if at == k {
            return Some(dist[at] + 2);
        }
        for (n, _) in mol.neighbors(at) {
            if *n == j || dist[*n] != usize::MAX {
                continue;
            }
            dist[*n] = dist[at] + 1;
            queue.push_back(*n);
        }
    }
    None
}

/// Interior angle of a regular polygon with `n` corners.
pub(crate) fn polygon_angle(n: usize) -> f64 {
    (n as f64 - 2.0) * 180.0 / n as f64
}

/// Whether the bonds around an atom make it linear (sp).
pub(crate) fn is_linear(mol: &Molecule, idx: usize) -> bool {
    let doubles = mol
        .neighbors(idx)
        .iter()
        .filter(|(_, b)| mol.bonds()[*b].order == BondOrder::Double)
        .count();
    mol.has_bond_order(idx, BondOrder::Triple) || (mol.degree(idx) == 2 && doubles == 2)
}

/// Atoms in breadth-first order, component by component.
fn bfs_order(mol: &Molecule) -> Vec<usize> {
    let mut seen = vec![false; mol.atom_count()];
    let mut order = Vec::with_capacity(mol.atom_count());
    for start in 0..mol.atom_count() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut queue = VecDeque::from([start]);
        while let Some(at) = queue.pop_front() {
            order.push(at);
            for (n, _) in mol.neighbors(at) {
                if !seen[*n] {
                    seen[*n] = true;
                    queue.push_back(*n);
                }
            }
        }
    }
    order
}

/// Planar coordinates in bond-length units.
pub(crate) fn layout_2d(mol: &Molecule) -> Vec<Point> {
    let n = mol.atom_count();
    let mut coords = vec![[0.0; 3]; n];
    for (slot, idx) in bfs_order(mol).into_iter().enumerate() {
        let angle = slot as f64 * 2.399_963;
        let radius = ((slot + 1) as f64).sqrt() * 0.9;
        coords[idx] = [radius * angle.cos(), radius * angle.sin(), 0.0];
    }
    if n < 2 {
        return coords;
    }

    let mut restraints = Vec::new();
    let mut near = vec![vec![false; n]; n];
    for bond in mol.bonds() {
        restraints.push(Restraint {
            i: bond.a,
            j: bond.b,
            target: 1.0,
            weight: 1.0,
        });
        near[bond.a][bond.b] = true;
        near[bond.b][bond.a] = true;
    }
    for j in 0..n {
        let nbrs = mol.neighbors(j);
        for (x, (i, _)) in nbrs.iter().enumerate() {
            for (k, _) in &nbrs[x + 1..] {
                let angle = match ring_size_through(mol, *i, j, *k) {
                    Some(size) if size <= 8 => polygon_angle(size),
                    _ if is_linear(mol, j) => 180.0,
                    _ if nbrs.len() > 3 => 90.0,
                    _ => 120.0,
                };
                restraints.push(Restraint {
                    i: *i,
                    j: *k,
                    target: law_of_cosines(1.0, 1.0, angle),
                    weight: 0.5,
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

    ForceField::new(restraints, contacts, 1.2)
        .planar()
        .minimize(&mut coords, 4000, 1e-5);
    coords
}

fn label(mol: &Molecule, idx: usize) -> Option<String> {
    let atom = mol.atom(idx);
    let show = atom.element != Element::C
        || atom.charge != 0
        || atom.isotope.is_some()
        || mol.degree(idx) == 0;
    if !show {
        return None;
    }
    let mut text = String::new();
    if let Some(iso) = atom.isotope {
        let _ = write!(text, "<tspan baseline-shift=\"super\" font-size=\"9\">{iso}</tspan>");
    }
    text.push_str(atom.element.symbol());
    match atom.hydrogens {
        0 => {}
        1 => text.push('H'),
        h => {
            let _ = write!(text, "H<tspan baseline-shift=\"sub\" font-size=\"10\">{h}</tspan>");
        }
    }
    let charge = match atom.charge {
        0 => String::new(),
        1 => "+".to_string(),
        -1 => "−".to_string(),
        c if c > 0 => format!("{c}+"),
        c => format!("{}−", -c),
    };
    if !charge.is_empty() {
        let _ = write!(text, "<tspan baseline-shift=\"super\" font-size=\"10\">{charge}</tspan>");
    }
    Some(text)
}

fn color(element: Element) -> &'static str {
    match element.number() {
        7 => "#3050F8",
        8 => "#E00000",
        9 | 17 => "#1E9E1E",
        15 => "#FF8000",
        16 => "#C8A000",
        35 => "#A62929",
        53 => "#940094",
        _ => "#000000",
    }
}

/// Render the molecule as a standalone SVG document.
pub fn depict_svg(mol: &Molecule, width: u32, height: u32) -> String {
    let coords = layout_2d(mol);
    let (w, h) = (f64::from(width), f64::from(height));

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for p in &coords {
        min_x = min_x.min(p[0]);
        max_x = max_x.max(p[0]);
        min_y = min_y.min(p[1]);
        max_y = max_y.max(p[1]);
    }
    let span_x = (max_x - min_x).max(1e-6);
    let span_y = (max_y - min_y).max(1e-6);
    let scale = ((w - 2.0 * MARGIN) / span_x)
        .min((h - 2.0 * MARGIN) / span_y)
        .min(MAX_BOND_PX);
    let off_x = (w - span_x * scale) / 2.0;
    let off_y = (h - span_y * scale) / 2.0;
    let px: Vec<(f64, f64)> = coords
        .iter()
        .map(|p| (off_x + (p[0] - min_x) * scale, off_y + (max_y - p[1]) * scale))
        .collect();
    let labels: Vec<Option<String>> = (0..mol.atom_count()).map(|i| label(mol, i)).collect();

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
    );
    svg.push_str("<rect width=\"100%\" height=\"100%\" fill=\"white\"/>");

    let orders = mol.kekulize();
    for (idx, bond) in mol.bonds().iter().enumerate() {
        let order = orders.as_ref().map_or(bond.order, |o| o[idx]);
        let (mut x1, mut y1) = px[bond.a];
        let (mut x2, mut y2) = px[bond.b];
        let (dx, dy) = (x2 - x1, y2 - y1);
        let len = (dx * dx + dy * dy).sqrt().max(1e-6);
        let (ux, uy) = (dx / len, dy / len);
        // Leave room for atom labels.
        if labels[bond.a].is_some() {
            x1 += ux * 9.0;
            y1 += uy * 9.0;
        }
        if labels[bond.b].is_some() {
            x2 -= ux * 9.0;
            y2 -= uy * 9.0;
        }
        let (nx, ny) = (-uy, ux);
        let offsets: &[(f64, bool)] = match order {
            BondOrder::Single => &[(0.0, false)],
            BondOrder::Double => &[(-2.5, false), (2.5, false)],
            BondOrder::Triple => &[(-4.0, false), (0.0, false), (4.0, false)],
            BondOrder::Aromatic => &[(0.0, false), (4.0, true)],
        };
        for (offset, dashed) in offsets {
            let dash = if *dashed {
                " stroke-dasharray=\"4,3\""
            } else {
                ""
            };
            let _ = write!(
                svg,
                "<line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"#000000\" stroke-width=\"1.8\"{dash}/>",
                x1 + nx * offset,
                y1 + ny * offset,
                x2 + nx * offset,
                y2 + ny * offset,
            );
        }
    }

    for (idx, text) in labels.iter().enumerate() {
        if let Some(text) = text {
            let (x, y) = px[idx];
            let _ = write!(
                svg,
                "<text x=\"{x:.1}\" y=\"{y:.1}\" font-family=\"sans-serif\" font-size=\"14\" text-anchor=\"middle\" dominant-baseline=\"central\" fill=\"{}\">{text}</text>",
                color(mol.atom(idx).element),
            );
        }
    }
    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chem::forcefield::distance;
    use crate::chem::smiles;

    #[test]
    fn benzene_layout_has_even_bonds() {
        let mol = smiles::parse("c1ccccc1").unwrap();
        let coords = layout_2d(&mol);
        for bond in mol.bonds() {
            let d = distance(coords[bond.a], coords[bond.b]);
            assert!((d - 1.0).abs() < 0.15, "bond length {d}");
        }
    }

    #[test]
    fn ring_size_through_finds_six_ring() {
        let mol = smiles::parse("C1CCCCC1C").unwrap();
        assert_eq!(ring_size_through(&mol, 0, 5, 4), Some(6));
        assert_eq!(ring_size_through(&mol, 4, 5, 6), None);
    }

    #[test]
    fn svg_labels_heteroatoms() {
        let mol = smiles::parse("OC(=O)c1ccccc1").unwrap();
        let svg = depict_svg(&mol, 400, 300);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("width=\"400\""));
        assert!(svg.contains(">OH</text>"));
        assert!(svg.contains(">O</text>"));
        // 9 bonds, three of them drawn twice (C=O plus the aromatic ring
        // kekulized into three doubles) -> 13 lines.
        assert_eq!(svg.matches("<line").count(), 13);
    }
}
