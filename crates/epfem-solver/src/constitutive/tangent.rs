//! Algorithmic tangent of the von Mises return mapping.
//!
//! The plastic multiplier entering the correction is the one of the previous
//! converged load step, not the one just computed: the tangent lags one step
//! behind the stress update. Newton convergence is therefore linear rather
//! than quadratic once points yield.

use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

use crate::config::PlaneCondition;
use crate::constitutive::elastic::{
    deviatoric_projector, elastic_matrix_4, plane_compliance_matrix, plane_elastic_matrix,
};
use crate::constitutive::return_mapping::{StressUpdate, deviator, deviator_norm, von_mises};
use crate::materials::MaterialConstants;

/// In-plane components `[xx, yy, xy]` of the four component ordering
const IN_PLANE: [usize; 3] = [0, 1, 3];

/// Relative distance to the yield surface below which a point counts as on it
const YIELD_SURFACE_TOLERANCE: f64 = 1e-8;

/// 4 × 4 tangent over `[xx, yy, zz, xy]`:
///
/// ```text
/// D = D_e - (6G²Δγ / q_tr) I_dev - 2G (3G / (3G + H) - 3GΔγ / q_tr) n̂ ⊗ n̂
/// ```
///
/// with `n̂ = s / ‖s‖` and `q_tr = q(σ) + 3GΔγ` rebuilt from the returned stress.
pub fn plastic_tangent_4(
    constants: &MaterialConstants,
    stress: &[f64; 4],
    dgamma: f64,
) -> Matrix4<f64> {
    let g = constants.shear_modulus();
    let h = constants.h;
    let d_e = elastic_matrix_4(constants);

    let dev = deviator(stress);
    let norm = deviator_norm(&dev);
    if norm <= f64::EPSILON * constants.sigma_y0 {
        return d_e;
    }
    let q = 1.5_f64.sqrt() * norm;
    let q_trial = q + 3.0 * g * dgamma;

    let n = Vector4::from(dev) / norm;
    let ratio = 3.0 * g * dgamma / q_trial;

    d_e - deviatoric_projector() * (2.0 * g * ratio)
        - n * n.transpose() * (2.0 * g * (3.0 * g / (3.0 * g + h) - ratio))
}

/// Plane stress projector P with `ξ = σᵀ P σ = 2q²/3` over `[xx, yy, xy]`.
pub fn plane_stress_projector() -> Matrix3<f64> {
    Matrix3::new(2.0, -1.0, 0.0, -1.0, 2.0, 0.0, 0.0, 0.0, 6.0) / 3.0
}

/// Plane stress tangent of the projected return:
///
/// ```text
/// Ξ = (C + Δγ P)⁻¹,  n = Ξ P σ
/// D = Ξ - n nᵀ / (σᵀ P n + 2Hξ / (3 - 2HΔγ))
/// ```
pub fn plane_stress_tangent(
    constants: &MaterialConstants,
    stress: &[f64; 3],
    dgamma: f64,
) -> Matrix3<f64> {
    let d_e = plane_elastic_matrix(constants, PlaneCondition::Stress);
    let p = plane_stress_projector();
    let Some(xi_matrix) = (plane_compliance_matrix(constants, PlaneCondition::Stress)
        + p * dgamma)
        .try_inverse()
    else {
        return d_e;
    };

    let sigma = Vector3::from(*stress);
    let p_sigma = p * sigma;
    let xi = sigma.dot(&p_sigma);
    if xi <= f64::EPSILON * constants.sigma_y0 * constants.sigma_y0 {
        return xi_matrix;
    }

    let n = xi_matrix * p_sigma;
    let alpha = 2.0 * constants.h * xi / (3.0 - 2.0 * constants.h * dgamma);
    xi_matrix - n * n.transpose() / (p_sigma.dot(&n) + alpha)
}

/// In-plane rows and columns of a four component tangent.
pub fn restrict_to_plane(full: &Matrix4<f64>) -> Matrix3<f64> {
    let mut reduced = Matrix3::zeros();
    for (a, &i) in IN_PLANE.iter().enumerate() {
        for (b, &j) in IN_PLANE.iter().enumerate() {
            reduced[(a, b)] = full[(i, j)];
        }
    }
    reduced
}

/// Whether the returned stress sits on the current yield surface.
pub fn on_yield_surface(constants: &MaterialConstants, update: &StressUpdate) -> bool {
    let yield_stress = constants.sigma_y0 + constants.h * update.plastic_strain;
    (von_mises(&update.full_stress()) - yield_stress).abs()
        <= YIELD_SURFACE_TOLERANCE * yield_stress
}

/// In-plane tangent for an integration point.
///
/// `dgamma_prev` is the committed Δγ of the last converged step. A point
/// that flowed in that step and still sits on the yield surface is treated
/// as loading, even when the current strain increment has not pushed it
/// past the surface yet. Other elastic updates get D_e exactly.
pub fn consistent_tangent(
    constants: &MaterialConstants,
    plane: PlaneCondition,
    update: &StressUpdate,
    dgamma_prev: f64,
) -> Matrix3<f64> {
    let loading = update.plastic || (dgamma_prev > 0.0 && on_yield_surface(constants, update));
    if !loading {
        return plane_elastic_matrix(constants, plane);
    }
    match plane {
        PlaneCondition::Strain => {
            restrict_to_plane(&plastic_tangent_4(constants, &update.full_stress(), dgamma_prev))
        }
        PlaneCondition::Stress => plane_stress_tangent(constants, &update.stress, dgamma_prev),
    }
}
