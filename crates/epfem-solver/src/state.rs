//! Path-dependent state of the incremental run.
//!
//! Integration-point history lives in two maps keyed by
//! `(element id, integration point index)`: the committed map, visible to
//! everyone, and the candidate map produced by each assembly. The driver swaps
//! the candidate in only when a load increment converges.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

/// `(element id, integration point index)`
pub type PointKey = (i32, usize);

/// History variables of one integration point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GaussPointState {
    /// `[εxx, εyy, εzz, γxy]`
    pub elastic_strain: [f64; 4],
    /// Accumulated plastic strain ε̄p, never decreasing
    pub plastic_strain: f64,
    /// Δγ of the step that produced this state
    pub dgamma: f64,
}

/// Integration-point state for every `(element, point)` of the mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateMap {
    points: HashMap<PointKey, GaussPointState>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map with a zero state for every key.
    pub fn zeroed(keys: impl IntoIterator<Item = PointKey>) -> Self {
        Self {
            points: keys
                .into_iter()
                .map(|key| (key, GaussPointState::default()))
                .collect(),
        }
    }

    /// State of a point; points never visited are in their virgin state.
    pub fn get(&self, element: i32, point: usize) -> GaussPointState {
        self.points
            .get(&(element, point))
            .copied()
            .unwrap_or_default()
    }

    pub fn insert(&mut self, element: i32, point: usize, state: GaussPointState) {
        self.points.insert((element, point), state);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PointKey, &GaussPointState)> {
        self.points.iter()
    }

    /// Mean accumulated plastic strain over the points of one element.
    pub fn element_average_plastic_strain(&self, element: i32) -> f64 {
        let (sum, count) = self
            .points
            .iter()
            .filter(|((e, _), _)| *e == element)
            .fold((0.0, 0usize), |(sum, count), (_, s)| {
                (sum + s.plastic_strain, count + 1)
            });
        if count == 0 { 0.0 } else { sum / count as f64 }
    }

    /// Largest accumulated plastic strain in the map.
    pub fn max_plastic_strain(&self) -> f64 {
        self.points
            .values()
            .map(|s| s.plastic_strain)
            .fold(0.0, f64::max)
    }
}

/// Displacement state owned by the driver
#[derive(Debug, Clone)]
pub struct RunState {
    /// Total displacement
    pub u: DVector<f64>,
    /// Displacement increment of the current load step
    pub du: DVector<f64>,
}

impl RunState {
    pub fn new(num_dofs: usize) -> Self {
        Self {
            u: DVector::zeros(num_dofs),
            du: DVector::zeros(num_dofs),
        }
    }

    /// INIT of a load increment
    pub fn begin_increment(&mut self) {
        self.du.fill(0.0);
    }

    /// Add a Newton correction to both `u` and `du`.
    pub fn apply_correction(&mut self, correction: &DVector<f64>) {
        self.u += correction;
        self.du += correction;
    }
}

/// Converged displacements, one column per load increment
#[derive(Debug, Clone)]
pub struct SolutionHistory {
    pub load_factors: Vec<f64>,
    pub displacements: DMatrix<f64>,
}

impl SolutionHistory {
    pub fn new(num_dofs: usize, load_factors: Vec<f64>) -> Self {
        let n = load_factors.len();
        Self {
            load_factors,
            displacements: DMatrix::zeros(num_dofs, n),
        }
    }

    pub fn store(&mut self, increment: usize, u: &DVector<f64>) {
        self.displacements.set_column(increment, u);
    }

    pub fn column(&self, increment: usize) -> DVector<f64> {
        self.displacements.column(increment).into_owned()
    }

    /// Portable copy for JSON persistence, keeping the first `converged` columns.
    pub fn to_record(&self, converged: usize) -> epfem_io::Result<epfem_io::SolutionHistory> {
        let mut record = epfem_io::SolutionHistory::new(self.displacements.nrows());
        for increment in 0..converged.min(self.load_factors.len()) {
            let column: Vec<f64> = self.displacements.column(increment).iter().copied().collect();
            record.push(self.load_factors[increment], column)?;
        }
        Ok(record)
    }
}
