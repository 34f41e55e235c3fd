//! Reduction of the global Newton system to the free dof.
//!
//! Row/column elimination: prescribed dof are removed from the unknowns and
//! their known correction moves to the right-hand side,
//!
//! ```text
//! K_ff δu_f = -(r_f + K_fp δu_p),    δu_p = λ ū_p - u_p
//! ```
//!
//! so the prescribed values are reached in the first iteration of an
//! increment and held afterwards.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

/// Free/prescribed split of the global dof
#[derive(Debug, Clone)]
pub struct DofPartition {
    num_dofs: usize,
    free: Vec<usize>,
    /// `(dof, value at load factor 1)`, ascending dof
    prescribed: Vec<(usize, f64)>,
}

/// Reduced system on the free dof
#[derive(Debug, Clone)]
pub struct ReducedSystem {
    pub k_ff: DMatrix<f64>,
    /// `r_f + K_fp δu_p`
    pub r_reduced: DVector<f64>,
    /// Correction that moves every prescribed dof onto its target
    pub prescribed_correction: Vec<(usize, f64)>,
}

impl DofPartition {
    pub fn new(num_dofs: usize, prescribed: &BTreeMap<usize, f64>) -> Self {
        let free = (0..num_dofs).filter(|d| !prescribed.contains_key(d)).collect();
        Self {
            num_dofs,
            free,
            prescribed: prescribed.iter().map(|(&d, &v)| (d, v)).collect(),
        }
    }

    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    pub fn free_dofs(&self) -> &[usize] {
        &self.free
    }

    pub fn num_free(&self) -> usize {
        self.free.len()
    }

    pub fn prescribed_dofs(&self) -> impl Iterator<Item = usize> + '_ {
        self.prescribed.iter().map(|&(d, _)| d)
    }

    /// Prescribed values at load factor `lambda`.
    pub fn targets(&self, lambda: f64) -> Vec<(usize, f64)> {
        self.prescribed.iter().map(|&(d, v)| (d, lambda * v)).collect()
    }

    /// Reduce `(K_T, r)` to the free dof for the current total displacement `u`.
    pub fn partition(
        &self,
        k_t: &DMatrix<f64>,
        r: &DVector<f64>,
        u: &DVector<f64>,
        lambda: f64,
    ) -> ReducedSystem {
        let prescribed_correction: Vec<(usize, f64)> = self
            .targets(lambda)
            .into_iter()
            .map(|(d, target)| (d, target - u[d]))
            .collect();

        let n = self.free.len();
        let k_ff = DMatrix::from_fn(n, n, |i, j| k_t[(self.free[i], self.free[j])]);
        let r_reduced = DVector::from_fn(n, |i, _| {
            let row = self.free[i];
            r[row]
                + prescribed_correction
                    .iter()
                    .map(|&(p, du_p)| k_t[(row, p)] * du_p)
                    .sum::<f64>()
        });

        ReducedSystem {
            k_ff,
            r_reduced,
            prescribed_correction,
        }
    }

    /// Full-length correction from the free solution and the prescribed part.
    pub fn expand(&self, du_free: &DVector<f64>, prescribed_correction: &[(usize, f64)]) -> DVector<f64> {
        let mut full = DVector::zeros(self.num_dofs);
        for (i, &dof) in self.free.iter().enumerate() {
            full[dof] = du_free[i];
        }
        for &(dof, value) in prescribed_correction {
            full[dof] = value;
        }
        full
    }

    /// Euclidean norm of a global vector restricted to the free dof.
    pub fn free_norm(&self, v: &DVector<f64>) -> f64 {
        self.free.iter().map(|&d| v[d] * v[d]).sum::<f64>().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spring_chain() -> DMatrix<f64> {
        // Three springs of stiffness 1 in series: nodes 0-1-2-3
        DMatrix::from_row_slice(
            4,
            4,
            &[
                1.0, -1.0, 0.0, 0.0, //
                -1.0, 2.0, -1.0, 0.0, //
                0.0, -1.0, 2.0, -1.0, //
                0.0, 0.0, -1.0, 1.0,
            ],
        )
    }

    #[test]
    fn eliminates_rows_and_columns() {
        let prescribed: BTreeMap<usize, f64> = [(0, 0.0), (3, 0.3)].into_iter().collect();
        let partition = DofPartition::new(4, &prescribed);
        assert_eq!(partition.free_dofs(), &[1, 2]);

        let k = spring_chain();
        let u = DVector::zeros(4);
        let r = DVector::zeros(4);
        let reduced = partition.partition(&k, &r, &u, 1.0);

        assert_eq!(reduced.k_ff, DMatrix::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 2.0]));
        // K_fp δu_p: only dof 3 moves, coupling -1 with dof 2
        assert_eq!(reduced.r_reduced.as_slice(), &[0.0, -0.3]);

        let solution = reduced.k_ff.clone().lu().solve(&(-&reduced.r_reduced)).unwrap();
        let full = partition.expand(&solution, &reduced.prescribed_correction);
        for (i, expected) in [0.0, 0.1, 0.2, 0.3].iter().enumerate() {
            assert!((full[i] - expected).abs() < 1e-14, "dof {i}: {}", full[i]);
        }
    }

    #[test]
    fn targets_scale_with_load_factor() {
        let prescribed: BTreeMap<usize, f64> = [(1, 2.0)].into_iter().collect();
        let partition = DofPartition::new(2, &prescribed);
        assert_eq!(partition.targets(0.25), vec![(1, 0.5)]);

        // Already at the target: nothing left to prescribe
        let u = DVector::from_vec(vec![0.0, 0.5]);
        let reduced = partition.partition(&DMatrix::identity(2, 2), &DVector::zeros(2), &u, 0.25);
        assert_eq!(reduced.prescribed_correction, vec![(1, 0.0)]);
    }

    #[test]
    fn fully_restrained_system_is_empty() {
        let prescribed: BTreeMap<usize, f64> = [(0, 0.0), (1, 0.0)].into_iter().collect();
        let partition = DofPartition::new(2, &prescribed);
        let reduced = partition.partition(&DMatrix::identity(2, 2), &DVector::zeros(2), &DVector::zeros(2), 1.0);
        assert_eq!(partition.num_free(), 0);
        assert_eq!(reduced.k_ff.nrows(), 0);
        assert_eq!(reduced.r_reduced.len(), 0);
    }

    #[test]
    fn free_norm_ignores_reactions() {
        let prescribed: BTreeMap<usize, f64> = [(0, 0.0)].into_iter().collect();
        let partition = DofPartition::new(3, &prescribed);
        let r = DVector::from_vec(vec![100.0, 3.0, 4.0]);
        assert!((partition.free_norm(&r) - 5.0).abs() < 1e-14);
    }
}
