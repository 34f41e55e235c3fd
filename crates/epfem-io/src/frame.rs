//! Plain result frames exchanged between the solver and the writers.
//!
//! A frame is one converged load increment: point coordinates, cell
//! connectivity by point index, and the fields attached to either.

use serde::{Deserialize, Serialize};

use crate::error::{IoError, Result};

/// Vector field sampled at points (2 components per point).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointField {
    pub name: String,
    pub values: Vec<[f64; 2]>,
}

/// Scalar field sampled per cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellField {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub title: String,
    pub increment: usize,
    pub load_factor: f64,
    pub points: Vec<[f64; 2]>,
    pub cells: Vec<Vec<usize>>,
    pub point_vectors: Vec<PointField>,
    pub cell_scalars: Vec<CellField>,
}

impl Frame {
    /// Check that every field matches the point/cell counts and every cell
    /// references an existing point.
    pub fn validate(&self) -> Result<()> {
        for cell in &self.cells {
            if let Some(&bad) = cell.iter().find(|&&p| p >= self.points.len()) {
                return Err(IoError::InvalidData(format!(
                    "cell references point {} but frame has {} points",
                    bad,
                    self.points.len()
                )));
            }
        }
        for field in &self.point_vectors {
            if field.values.len() != self.points.len() {
                return Err(IoError::InvalidData(format!(
                    "point field '{}' has {} values for {} points",
                    field.name,
                    field.values.len(),
                    self.points.len()
                )));
            }
        }
        for field in &self.cell_scalars {
            if field.values.len() != self.cells.len() {
                return Err(IoError::InvalidData(format!(
                    "cell field '{}' has {} values for {} cells",
                    field.name,
                    field.values.len(),
                    self.cells.len()
                )));
            }
        }
        Ok(())
    }
}
