//! Small-strain elastoplastic finite element solver for 2D continua.
//!
//! Von Mises plasticity with linear isotropic hardening on plane stress or
//! plane strain meshes of 3-node triangles and 4-node quadrilaterals. The
//! load program is applied in increments, each solved by Newton iterations
//! with a lagged consistent tangent.

pub mod assembly;
pub mod backend;
pub mod bc_builder;
pub mod boundary_conditions;
pub mod config;
pub mod constitutive;
pub mod elements;
pub mod error;
pub mod external_loads;
pub mod materials;
pub mod mesh;
pub mod mesh_builder;
pub mod partition;
pub mod postprocess;
pub mod problem;
pub mod reporting;
pub mod sets;
pub mod solver;
pub mod state;

pub use assembly::{Assembler, Assembly};
pub use backend::{BackendError, DenseLu, LinearSolver, SolveInfo};
pub use bc_builder::{BCBuilder, load_program_from_deck};
pub use boundary_conditions::{
    BCStatistics, BcLocation, BoundaryConditions, ConcentratedLoad, Direction, DisplacementBC,
    EdgeLoad, EdgeLoadKind,
};
pub use config::{PlaneCondition, SolverConfig};
pub use constitutive::{LocalSettings, StressUpdate, consistent_tangent, return_mapping};
pub use elements::{ElementKernel, PlaneElement};
pub use error::{Result, SolverError};
pub use materials::{Material, MaterialConstants, MaterialLibrary, MaterialStatistics};
pub use mesh::{Element, ElementType, Mesh, MeshStatistics, Node};
pub use mesh_builder::MeshBuilder;
pub use partition::{DofPartition, ReducedSystem};
pub use postprocess::{
    FieldStatistics, displacement_table, element_von_mises, field_statistics,
    node_displacements, results_at_fixed_y,
};
pub use problem::Problem;
pub use reporting::{
    ElementField, FieldLocation, IncrementReport, MemorySink, NullSink, PLASTIC_STRAIN_FIELD,
    ResultSink, STRESS_XX_FIELD, VtkSink,
};
pub use sets::{ElementSet, NodeSet, Sets};
pub use solver::{IncrementalResults, IncrementalSolver};
pub use state::{GaussPointState, PointKey, RunState, SolutionHistory, StateMap};
