//! JSON persistence of the solution history.
//!
//! The history stores the total displacement vector of every converged load
//! increment, i.e. the dense `[dof, increment]` array, one column per entry
//! of `displacements`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoError, Result};

pub const HISTORY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolutionHistory {
    pub schema_version: u32,
    pub num_dofs: usize,
    pub load_factors: Vec<f64>,
    /// One column per converged increment, each of length `num_dofs`.
    pub displacements: Vec<Vec<f64>>,
    pub metadata: BTreeMap<String, String>,
}

impl SolutionHistory {
    pub fn new(num_dofs: usize) -> Self {
        Self {
            schema_version: HISTORY_SCHEMA_VERSION,
            num_dofs,
            load_factors: Vec::new(),
            displacements: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, load_factor: f64, displacement: Vec<f64>) -> Result<()> {
        if displacement.len() != self.num_dofs {
            return Err(IoError::InvalidData(format!(
                "displacement column has {} entries, expected {}",
                displacement.len(),
                self.num_dofs
            )));
        }
        self.load_factors.push(load_factor);
        self.displacements.push(displacement);
        Ok(())
    }

    pub fn num_increments(&self) -> usize {
        self.displacements.len()
    }
}

pub fn save_history(path: impl AsRef<Path>, history: &SolutionHistory) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let bytes = serde_json::to_vec_pretty(history)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn load_history(path: impl AsRef<Path>) -> Result<SolutionHistory> {
    let bytes = fs::read(path)?;
    let history: SolutionHistory = serde_json::from_slice(&bytes)?;
    if history.schema_version != HISTORY_SCHEMA_VERSION {
        return Err(IoError::SchemaVersion {
            found: history.schema_version,
            expected: HISTORY_SCHEMA_VERSION,
        });
    }
    if history.load_factors.len() != history.displacements.len() {
        return Err(IoError::InvalidData(format!(
            "{} load factors for {} displacement columns",
            history.load_factors.len(),
            history.displacements.len()
        )));
    }
    Ok(history)
}
