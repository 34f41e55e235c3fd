//! Output support for the epfem solver.
//!
//! This crate provides:
//! - **Result frames**: plain per-increment point/cell data independent of the solver types
//! - **VTK export** (legacy ASCII) for ParaView visualization
//! - **Solution history** persistence as JSON

pub mod error;
pub mod frame;
mod history;
pub mod vtk_writer;

pub use error::{IoError, Result};
pub use frame::{CellField, Frame, PointField};
pub use history::{HISTORY_SCHEMA_VERSION, SolutionHistory, load_history, save_history};
pub use vtk_writer::VtkWriter;
