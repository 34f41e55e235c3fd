//! Isotropic linear elasticity in plane stress and plane strain.
//!
//! Voigt order is `[xx, yy, xy]` with engineering shear strain. The four
//! component helpers add the out-of-plane normal component as `[xx, yy, zz, xy]`.

use nalgebra::{Matrix3, Matrix4};

use crate::config::PlaneCondition;
use crate::materials::MaterialConstants;

/// Effective `(E*, ν*)` that turn the plane stress matrix into the plane strain one.
///
/// Plane strain: E* = E / (1 - ν²), ν* = ν / (1 - ν).
pub fn effective_constants(constants: &MaterialConstants, plane: PlaneCondition) -> (f64, f64) {
    let (e, nu) = (constants.e, constants.nu);
    match plane {
        PlaneCondition::Stress => (e, nu),
        PlaneCondition::Strain => (e / (1.0 - nu * nu), nu / (1.0 - nu)),
    }
}

/// Plane stress form of D_e:
///
/// ```text
///          E    [1   ν   0      ]
///  D_e = ────── [ν   1   0      ]
///        1 - ν² [0   0   (1-ν)/2]
/// ```
pub fn elastic_matrix(e: f64, nu: f64) -> Matrix3<f64> {
    let c = e / (1.0 - nu * nu);
    Matrix3::new(
        c,
        c * nu,
        0.0,
        c * nu,
        c,
        0.0,
        0.0,
        0.0,
        c * (1.0 - nu) / 2.0,
    )
}

/// In-plane D_e for the given plane condition.
pub fn plane_elastic_matrix(constants: &MaterialConstants, plane: PlaneCondition) -> Matrix3<f64> {
    let (e, nu) = effective_constants(constants, plane);
    elastic_matrix(e, nu)
}

/// D_e⁻¹ for the given plane condition, in closed form.
pub fn plane_compliance_matrix(
    constants: &MaterialConstants,
    plane: PlaneCondition,
) -> Matrix3<f64> {
    let (e, nu) = effective_constants(constants, plane);
    Matrix3::new(
        1.0 / e,
        -nu / e,
        0.0,
        -nu / e,
        1.0 / e,
        0.0,
        0.0,
        0.0,
        2.0 * (1.0 + nu) / e,
    )
}

/// Elastic strain `[xx, yy, zz, xy]` (engineering shear) carrying a stress
/// `[xx, yy, zz, xy]`.
pub fn elastic_strain_4(constants: &MaterialConstants, stress: &[f64; 4]) -> [f64; 4] {
    let (e, nu) = (constants.e, constants.nu);
    let [sxx, syy, szz, sxy] = *stress;
    [
        (sxx - nu * (syy + szz)) / e,
        (syy - nu * (sxx + szz)) / e,
        (szz - nu * (sxx + syy)) / e,
        sxy / constants.shear_modulus(),
    ]
}

/// 4 × 4 elastic matrix `K m mᵀ + 2G I_dev` over `[xx, yy, zz, xy]`.
pub fn elastic_matrix_4(constants: &MaterialConstants) -> Matrix4<f64> {
    let k = constants.bulk_modulus();
    let g = constants.shear_modulus();
    let m = volumetric_vector();
    m * m.transpose() * k + deviatoric_projector() * (2.0 * g)
}

/// `m = [1, 1, 1, 0]`
pub fn volumetric_vector() -> nalgebra::Vector4<f64> {
    nalgebra::Vector4::new(1.0, 1.0, 1.0, 0.0)
}

/// Deviatoric projector for engineering shear: `diag(1, 1, 1, ½) - ⅓ m mᵀ`.
pub fn deviatoric_projector() -> Matrix4<f64> {
    let m = volumetric_vector();
    Matrix4::from_diagonal(&nalgebra::Vector4::new(1.0, 1.0, 1.0, 0.5))
        - m * m.transpose() / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steel() -> MaterialConstants {
        MaterialConstants::new(200000.0, 0.3, 0.0, 250.0)
    }

    #[test]
    fn plane_strain_matches_direct_formula() {
        let c = steel();
        let d = plane_elastic_matrix(&c, PlaneCondition::Strain);
        let (e, nu) = (c.e, c.nu);
        let f = e / ((1.0 + nu) * (1.0 - 2.0 * nu));
        assert!((d[(0, 0)] - f * (1.0 - nu)).abs() / d[(0, 0)] < 1e-12);
        assert!((d[(0, 1)] - f * nu).abs() / d[(0, 1)] < 1e-12);
        assert!((d[(2, 2)] - c.shear_modulus()).abs() / d[(2, 2)] < 1e-12);
    }

    #[test]
    fn compliance_inverts_stiffness() {
        for plane in [PlaneCondition::Stress, PlaneCondition::Strain] {
            let product = plane_elastic_matrix(&steel(), plane)
                * plane_compliance_matrix(&steel(), plane);
            let err = (product - Matrix3::identity()).abs().max();
            assert!(err < 1e-12, "{plane:?}: {err}");
        }
    }

    #[test]
    fn four_component_matrix_restricts_to_plane_strain() {
        let c = steel();
        let full = elastic_matrix_4(&c);
        let plane = plane_elastic_matrix(&c, PlaneCondition::Strain);
        let idx = [0, 1, 3];
        for (a, &i) in idx.iter().enumerate() {
            for (b, &j) in idx.iter().enumerate() {
                let rel = (full[(i, j)] - plane[(a, b)]).abs() / plane[(0, 0)];
                assert!(rel < 1e-12, "({i}, {j})");
            }
        }
    }

    #[test]
    fn strain_of_stress_inverts_four_component_matrix() {
        let c = steel();
        let eps = [1e-3, -2e-4, 3e-4, 5e-4];
        let sigma = elastic_matrix_4(&c) * nalgebra::Vector4::from(eps);
        let back = elastic_strain_4(&c, &[sigma[0], sigma[1], sigma[2], sigma[3]]);
        for i in 0..4 {
            assert!((back[i] - eps[i]).abs() < 1e-15, "component {i}: {:?}", back);
        }
    }
}
