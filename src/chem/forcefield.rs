//! Distance-restraint force field shared by 2D layout and 3D embedding.

pub(crate) type Point = [f64; 3];

#[derive(Debug, Clone, Copy)]
pub(crate) struct Restraint {
    pub i: usize,
    pub j: usize,
    pub target: f64,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct ForceField {
    restraints: Vec<Restraint>,
    /// Pairs kept at least `contact` apart.
    contacts: Vec<(usize, usize)>,
    contact: f64,
    /// Keep z at zero.
    planar: bool,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Minimized {
    pub energy: f64,
    pub converged: bool,
}

impl ForceField {
    pub fn new(restraints: Vec<Restraint>, contacts: Vec<(usize, usize)>, contact: f64) -> Self {
        Self {
            restraints,
            contacts,
            contact,
            planar: false,
        }
    }

    pub fn planar(mut self) -> Self {
        self.planar = true;
        self
    }

    fn evaluate(&self, coords: &[Point], grad: &mut [Point]) -> f64 {
        for g in grad.iter_mut() {
            *g = [0.0; 3];
        }
        let mut energy = 0.0;

        let mut add = |i: usize, j: usize, d: f64, dv: [f64; 3], de_dd: f64| {
            if d < 1e-9 {
                return;
            }
            for k in 0..3 {
                let f = de_dd * dv[k] / d;
                grad[i][k] += f;
                grad[j][k] -= f;
            }
        };

        for r in &self.restraints {
            let (d, dv) = delta(coords, r.i, r.j);
            let diff = d - r.target;
            energy += r.weight * diff * diff;
            add(r.i, r.j, d, dv, 2.0 * r.weight * diff);
        }
        for &(i, j) in &self.contacts {
            let (d, dv) = delta(coords, i, j);
            if d < self.contact {
                let diff = d - self.contact;
                energy += 0.5 * diff * diff;
                add(i, j, d, dv, diff);
            }
        }
        if self.planar {
            for g in grad.iter_mut() {
                g[2] = 0.0;
            }
        }
        energy
    }

    /// Steepest descent with an adaptive step.
    pub fn minimize(&self, coords: &mut [Point], max_steps: usize, tolerance: f64) -> Minimized {
        let mut grad = vec![[0.0; 3]; coords.len()];
        let mut trial_grad = grad.clone();
        let mut energy = self.evaluate(coords, &mut grad);
        let mut step = 0.1;

        for _ in 0..max_steps {
            let norm = grad
                .iter()
                .flat_map(|g| g.iter())
                .map(|v| v * v)
                .sum::<f64>()
                .sqrt();
            if norm < tolerance {
                return Minimized {
                    energy,
                    converged: true,
                };
            }

            let trial: Vec<Point> = coords
                .iter()
                .zip(&grad)
                .map(|(c, g)| {
                    [
                        c[0] - step * g[0] / norm,
                        c[1] - step * g[1] / norm,
                        c[2] - step * g[2] / norm,
                    ]
                })
                .collect();
            let trial_energy = self.evaluate(&trial, &mut trial_grad);
            if trial_energy.is_finite() && trial_energy < energy {
                coords.copy_from_slice(&trial);
                std::mem::swap(&mut grad, &mut trial_grad);
                energy = trial_energy;
                step = (step * 1.2).min(1.0);
            } else {
                step *= 0.5;
                if step < 1e-8 {
                    break;
                }
            }
        }

        Minimized {
            energy,
            converged: energy.is_finite() && energy < tolerance,
        }
    }

    /// Largest absolute deviation from a bond-type restraint target.
    pub fn worst_deviation(&self, coords: &[Point], limit_to: usize) -> f64 {
        self.restraints
            .iter()
            .take(limit_to)
            .map(|r| (delta(coords, r.i, r.j).0 - r.target).abs())
            .fold(0.0, f64::max)
    }
}

fn delta(coords: &[Point], i: usize, j: usize) -> (f64, [f64; 3]) {
    let dv = [
        coords[i][0] - coords[j][0],
        coords[i][1] - coords[j][1],
        coords[i][2] - coords[j][2],
    ];
    let d = (dv[0] * dv[0] + dv[1] * dv[1] + dv[2] * dv[2]).sqrt();
    (d, dv)
}

pub(crate) fn distance(a: Point, b: Point) -> f64 {
    let dv = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    (dv[0] * dv[0] + dv[1] * dv[1] + dv[2] * dv[2]).sqrt()
}

/// 1-3 distance for two bonds of length `a` and `b` meeting at `angle_deg`.
pub(crate) fn law_of_cosines(a: f64, b: f64, angle_deg: f64) -> f64 {
    let theta = angle_deg.to_radians();
    (a * a + b * b - 2.0 * a * b * theta.cos()).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimize_pulls_pair_to_target() {
        let ff = ForceField::new(
            vec![Restraint {
                i: 0,
                j: 1,
                target: 1.5,
                weight: 1.0,
            }],
            vec![],
            0.0,
        );
        let mut coords = vec![[0.0, 0.0, 0.0], [3.0, 0.0, 0.0]];
        let result = ff.minimize(&mut coords, 1000, 1e-6);
        assert!(result.energy < 1e-6);
        assert!((distance(coords[0], coords[1]) - 1.5).abs() < 1e-3);
    }

    #[test]
    fn planar_field_keeps_z() {
        let ff = ForceField::new(
            vec![Restraint {
                i: 0,
                j: 1,
                target: 1.0,
                weight: 1.0,
            }],
            vec![],
            0.0,
        )
        .planar();
        let mut coords = vec![[0.0, 0.0, 0.0], [2.0, 1.0, 0.0]];
        ff.minimize(&mut coords, 500, 1e-6);
        assert_eq!(coords[1][2], 0.0);
    }

    #[test]
    fn tetrahedral_one_three_distance() {
        let d = law_of_cosines(1.0, 1.0, 109.47);
        assert!((d - 1.633).abs() < 1e-3);
    }
}
