//! Constitutive update for von Mises plasticity with linear isotropic hardening.

pub mod elastic;
pub mod return_mapping;
pub mod tangent;

pub use elastic::{effective_constants, elastic_matrix, plane_compliance_matrix, plane_elastic_matrix};
pub use return_mapping::{LocalFailure, LocalSettings, StressUpdate, return_mapping, von_mises};
pub use tangent::{consistent_tangent, on_yield_surface};
