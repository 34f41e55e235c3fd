//! Error taxonomy of the solver.
//!
//! Every failure is fatal for the run: there is no retry at this layer. The
//! variants carry enough context (increment, iteration, element, residual) to
//! reproduce the failure.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("material '{material}' used by element {element} is missing {property}")]
    MissingMaterialProperty {
        material: String,
        element: i32,
        property: &'static str,
    },

    #[error("mesh error: {0}")]
    Mesh(String),

    #[error("element {element}: {message}")]
    Element { element: i32, message: String },

    #[error("input error: {0}")]
    Input(#[from] epfem_inp::ParseError),

    #[error(
        "return mapping did not converge at element {element}, integration point {point} \
         after {iterations} iterations (residual {residual:.3e})"
    )]
    LocalNonConvergence {
        element: i32,
        point: usize,
        iterations: usize,
        residual: f64,
    },

    #[error(
        "solution did not converge at load increment {increment} after {iterations} \
         iterations (residual {residual:.3e})"
    )]
    GlobalNonConvergence {
        increment: usize,
        iterations: usize,
        residual: f64,
    },

    #[error("linear solve failed: {0}")]
    LinearSolve(String),

    #[error("load increment {increment}, iteration {iteration}: {source}")]
    Iteration {
        increment: usize,
        iteration: usize,
        #[source]
        source: Box<SolverError>,
    },

    #[error("output error: {0}")]
    Output(#[from] epfem_io::IoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SolverError {
    /// Attach the Newton context of the iteration the error surfaced in.
    pub fn at_iteration(self, increment: usize, iteration: usize) -> Self {
        SolverError::Iteration {
            increment,
            iteration,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping iteration context wrappers.
    pub fn root(&self) -> &SolverError {
        match self {
            SolverError::Iteration { source, .. } => source.root(),
            other => other,
        }
    }
}
