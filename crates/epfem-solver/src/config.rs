//! Run configuration for the incremental solver.
//!
//! Every field has a default, so a JSON file only needs the options it
//! changes:
//!
//! ```json
//! { "load_increments": [0.0, 0.5, 1.0], "plane": "strain", "verbose": true }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// Out-of-plane assumption of the 2D model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaneCondition {
    /// σ_zz = 0
    #[default]
    Stress,
    /// ε_zz = 0
    Strain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Explicit load program. When absent, `num_load_increments` equal steps from 0 to 1.
    pub load_increments: Option<Vec<f64>>,
    /// Number of load factors generated when no explicit program is given
    pub num_load_increments: usize,
    /// Newton iterations allowed per load increment
    pub max_global_iterations: usize,
    /// Absolute tolerance on the free-dof residual norm
    pub global_tolerance: f64,
    /// Scalar Newton iterations allowed in the return mapping
    pub max_local_iterations: usize,
    /// Return-mapping tolerance, relative to the initial yield stress
    pub local_tolerance: f64,
    /// Out-of-plane thickness
    pub thickness: f64,
    pub plane: PlaneCondition,
    /// Gauss points per direction for quadrilaterals (1, 2 or 3)
    pub quadrature_order: usize,
    /// Compute element contributions on the rayon thread pool
    pub parallel_assembly: bool,
    /// Print increment and iteration progress
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            load_increments: None,
            num_load_increments: 10,
            max_global_iterations: 5,
            global_tolerance: 1e-6,
            max_local_iterations: 100,
            local_tolerance: 1e-10,
            thickness: 1.0,
            plane: PlaneCondition::Stress,
            quadrature_order: 2,
            parallel_assembly: false,
            verbose: false,
        }
    }
}

impl SolverConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: SolverConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// The ordered load factors applied by the driver.
    pub fn load_program(&self) -> Vec<f64> {
        match &self.load_increments {
            Some(factors) => factors.clone(),
            None => linspace(0.0, 1.0, self.num_load_increments),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_load_program(&self.load_program())?;
        if self.max_global_iterations == 0 {
            return Err(SolverError::Configuration(
                "max_global_iterations must be at least 1".to_string(),
            ));
        }
        if self.max_local_iterations == 0 {
            return Err(SolverError::Configuration(
                "max_local_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.global_tolerance > 0.0) || !(self.local_tolerance > 0.0) {
            return Err(SolverError::Configuration(
                "tolerances must be positive".to_string(),
            ));
        }
        if !(self.thickness > 0.0) || !self.thickness.is_finite() {
            return Err(SolverError::Configuration(format!(
                "thickness must be positive, got {}",
                self.thickness
            )));
        }
        if !(1..=3).contains(&self.quadrature_order) {
            return Err(SolverError::Configuration(format!(
                "quadrature_order must be 1, 2 or 3, got {}",
                self.quadrature_order
            )));
        }
        Ok(())
    }
}

/// A load program needs at least one factor, each finite and in [0, 1].
pub fn validate_load_program(program: &[f64]) -> Result<()> {
    if program.is_empty() {
        return Err(SolverError::Configuration(
            "load program has no increments".to_string(),
        ));
    }
    if let Some(bad) = program.iter().find(|l| !l.is_finite() || **l < 0.0 || **l > 1.0) {
        return Err(SolverError::Configuration(format!(
            "load factor {bad} outside [0, 1]"
        )));
    }
    Ok(())
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}
