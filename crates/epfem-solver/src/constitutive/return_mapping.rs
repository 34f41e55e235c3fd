//! Von Mises return mapping with linear isotropic hardening.
//!
//! Stresses and elastic strains carry four components `[xx, yy, zz, xy]` so
//! that the von Mises norm sees the out-of-plane stress.
//!
//! - Plane strain: εzz of the elastic strain is part of the history (the
//!   plastic flow has a zz component while the total εzz stays zero). The
//!   trial state is `D_e ε_e` on all four components and the return is radial.
//! - Plane stress: σzz = 0 throughout. The return solves the projected yield
//!   condition in the in-plane stress space, so the returned in-plane stress
//!   lies on the yield surface with σzz = 0.

use nalgebra::{Vector3, Vector4};

use crate::config::PlaneCondition;
use crate::constitutive::elastic::{elastic_matrix_4, elastic_strain_4, plane_elastic_matrix};
use crate::materials::MaterialConstants;

/// Budget and tolerance of the scalar Newton loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalSettings {
    pub max_iterations: usize,
    /// Absolute tolerance is `tolerance * σ_y0`
    pub tolerance: f64,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-10,
        }
    }
}

/// Result of one integration point update. Every field is a candidate value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StressUpdate {
    /// `[σxx, σyy, τxy]`
    pub stress: [f64; 3],
    /// σzz of the returned state, zero in plane stress
    pub stress_zz: f64,
    /// `[εxx, εyy, εzz, γxy]` elastic strain, D_e⁻¹ σ
    pub elastic_strain: [f64; 4],
    /// Accumulated plastic strain ε̄p
    pub plastic_strain: f64,
    /// Plastic multiplier increment Δγ. In plane strain Δγ = Δε̄p; in plane
    /// stress it multiplies the projected flow direction `P σ`.
    pub dgamma: f64,
    pub plastic: bool,
    /// Newton iterations spent (0 for an elastic update)
    pub iterations: usize,
}

impl StressUpdate {
    /// `[σxx, σyy, σzz, τxy]`
    pub fn full_stress(&self) -> [f64; 4] {
        [self.stress[0], self.stress[1], self.stress_zz, self.stress[2]]
    }
}

/// Scalar Newton loop that ran out of iterations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFailure {
    pub iterations: usize,
    pub residual: f64,
}

/// Mean stress p of `[xx, yy, zz, xy]`.
pub fn mean_stress(s: &[f64; 4]) -> f64 {
    (s[0] + s[1] + s[2]) / 3.0
}

/// Deviatoric part of `[xx, yy, zz, xy]`.
pub fn deviator(s: &[f64; 4]) -> [f64; 4] {
    let p = mean_stress(s);
    [s[0] - p, s[1] - p, s[2] - p, s[3]]
}

/// ‖s‖ including both off-diagonal shear entries.
pub fn deviator_norm(dev: &[f64; 4]) -> f64 {
    (dev[0] * dev[0] + dev[1] * dev[1] + dev[2] * dev[2] + 2.0 * dev[3] * dev[3]).sqrt()
}

/// q = √(3/2) ‖s‖
pub fn von_mises(s: &[f64; 4]) -> f64 {
    (1.5_f64).sqrt() * deviator_norm(&deviator(s))
}

/// Elastic trial stress `[xx, yy, zz, xy]` for an elastic trial strain.
///
/// Plane stress ignores the zz strain and keeps σzz = 0.
pub fn trial_stress(
    constants: &MaterialConstants,
    plane: PlaneCondition,
    eps_e_trial: &[f64; 4],
) -> [f64; 4] {
    match plane {
        PlaneCondition::Strain => {
            let s = elastic_matrix_4(constants) * Vector4::from(*eps_e_trial);
            [s[0], s[1], s[2], s[3]]
        }
        PlaneCondition::Stress => {
            let [exx, eyy, _, gxy] = *eps_e_trial;
            let s = plane_elastic_matrix(constants, plane) * Vector3::new(exx, eyy, gxy);
            [s[0], s[1], 0.0, s[2]]
        }
    }
}

/// Integrate one strain increment at an integration point.
///
/// `eps_e_trial` is the committed elastic strain plus the strain increment of
/// the current load step (the zz component is the committed one, since the
/// total εzz does not change in plane strain); `plastic_strain_prev` is the
/// committed ε̄p.
///
/// The update is elastic when `f_trial` does not exceed the local tolerance,
/// so a committed state on the yield surface re-evaluates as elastic.
///
/// # Errors
/// [`LocalFailure`] when the residual is still above tolerance after
/// `settings.max_iterations` Newton updates.
pub fn return_mapping(
    constants: &MaterialConstants,
    plane: PlaneCondition,
    eps_e_trial: &[f64; 4],
    plastic_strain_prev: f64,
    settings: &LocalSettings,
) -> Result<StressUpdate, LocalFailure> {
    let sigma_trial = trial_stress(constants, plane, eps_e_trial);
    let q_trial = von_mises(&sigma_trial);
    let f_trial = q_trial - (constants.sigma_y0 + constants.h * plastic_strain_prev);
    let tolerance = settings.tolerance * constants.sigma_y0;

    if f_trial <= tolerance {
        let elastic_strain = match plane {
            PlaneCondition::Strain => *eps_e_trial,
            PlaneCondition::Stress => {
                let [exx, eyy, _, gxy] = *eps_e_trial;
                let nu = constants.nu;
                [exx, eyy, -nu / (1.0 - nu) * (exx + eyy), gxy]
            }
        };
        return Ok(StressUpdate {
            stress: [sigma_trial[0], sigma_trial[1], sigma_trial[3]],
            stress_zz: sigma_trial[2],
            elastic_strain,
            plastic_strain: plastic_strain_prev,
            dgamma: 0.0,
            plastic: false,
            iterations: 0,
        });
    }

    let (sigma, plastic_strain, dgamma, iterations) = match plane {
        PlaneCondition::Strain => {
            radial_return(constants, &sigma_trial, q_trial, f_trial, plastic_strain_prev, settings)?
        }
        PlaneCondition::Stress => {
            plane_stress_return(constants, &sigma_trial, f_trial, plastic_strain_prev, settings)?
        }
    };

    Ok(StressUpdate {
        stress: [sigma[0], sigma[1], sigma[3]],
        stress_zz: sigma[2],
        elastic_strain: elastic_strain_4(constants, &sigma),
        plastic_strain,
        dgamma,
        plastic: true,
        iterations,
    })
}

/// Radial return on the four component stress.
///
/// Solves `q_trial - 3GΔγ - (σ_y0 + H(ε̄p + Δγ)) = 0` and scales the trial
/// deviator by `1 - 3GΔγ/q_trial`, leaving the mean stress unchanged.
fn radial_return(
    constants: &MaterialConstants,
    sigma_trial: &[f64; 4],
    q_trial: f64,
    f_trial: f64,
    plastic_strain_prev: f64,
    settings: &LocalSettings,
) -> Result<([f64; 4], f64, f64, usize), LocalFailure> {
    let g = constants.shear_modulus();
    let h = constants.h;
    let tolerance = settings.tolerance * constants.sigma_y0;

    let mut dgamma = 0.0;
    let mut residual = f_trial;
    let mut converged = None;
    for iteration in 1..=settings.max_iterations {
        // d(residual)/d(Δγ) = -(3G + H)
        dgamma += residual / (3.0 * g + h);
        residual = q_trial
            - 3.0 * g * dgamma
            - (constants.sigma_y0 + h * (plastic_strain_prev + dgamma));
        if residual.abs() <= tolerance {
            converged = Some(iteration);
            break;
        }
    }
    let Some(iterations) = converged else {
        return Err(LocalFailure {
            iterations: settings.max_iterations,
            residual,
        });
    };

    let p = mean_stress(sigma_trial);
    let dev = deviator(sigma_trial);
    let factor = 1.0 - 3.0 * g * dgamma / q_trial;
    let sigma = [
        factor * dev[0] + p,
        factor * dev[1] + p,
        factor * dev[2] + p,
        factor * dev[3],
    ];
    Ok((sigma, plastic_strain_prev + dgamma, dgamma, iterations))
}

/// Plane stress return in the in-plane stress space.
///
/// With `ξ = σᵀ P σ` (P the plane stress deviatoric projector, q² = 3ξ/2)
/// the returned stress is `(C + Δγ P)⁻¹ ε_trial`, which is diagonal in the
/// basis `(σxx + σyy, σyy - σxx, τxy)`:
///
/// ```text
/// ξ(Δγ) = (σxx + σyy)²_tr / (6 a²) + ((σyy - σxx)²_tr / 2 + 2 τ²_tr) / b²
/// a = 1 + EΔγ / (3(1 - ν)),  b = 1 + 2GΔγ
/// ```
///
/// Newton on `ξ/2 - σ_y²/3 = 0` with `σ_y = σ_y0 + H(ε̄p + Δγ √(2ξ/3))`.
/// Convergence is measured on `√(3ξ/2) - σ_y`, in stress units.
fn plane_stress_return(
    constants: &MaterialConstants,
    sigma_trial: &[f64; 4],
    f_trial: f64,
    plastic_strain_prev: f64,
    settings: &LocalSettings,
) -> Result<([f64; 4], f64, f64, usize), LocalFailure> {
    let (e, nu) = (constants.e, constants.nu);
    let g = constants.shear_modulus();
    let h = constants.h;
    let tolerance = settings.tolerance * constants.sigma_y0;

    let sum_trial = sigma_trial[0] + sigma_trial[1];
    let diff_trial = sigma_trial[1] - sigma_trial[0];
    let shear_trial = sigma_trial[3];
    let a1 = sum_trial * sum_trial;
    let a2 = diff_trial * diff_trial;
    let a3 = shear_trial * shear_trial;

    let factors = |dgamma: f64| {
        (
            1.0 + e * dgamma / (3.0 * (1.0 - nu)),
            1.0 + 2.0 * g * dgamma,
        )
    };
    // ξ and dξ/dΔγ
    let xi = |dgamma: f64| {
        let (a, b) = factors(dgamma);
        let value = a1 / (6.0 * a * a) + (0.5 * a2 + 2.0 * a3) / (b * b);
        let slope = -a1 * e / (9.0 * (1.0 - nu) * a * a * a)
            - 2.0 * g * (a2 + 4.0 * a3) / (b * b * b);
        (value, slope)
    };
    let hardening_arg = |dgamma: f64, xi: f64| dgamma * (2.0 * xi / 3.0).sqrt();

    let mut dgamma = 0.0;
    let mut residual = f_trial;
    let mut converged = None;
    for iteration in 1..=settings.max_iterations {
        let (value, slope) = xi(dgamma);
        let root = value.sqrt();
        let sigma_y = constants.sigma_y0 + h * (plastic_strain_prev + hardening_arg(dgamma, value));
        let phi = 0.5 * value - sigma_y * sigma_y / 3.0;
        let d_phi = 0.5 * slope
            - 2.0 / 3.0 * sigma_y * h * (2.0_f64 / 3.0).sqrt() * (root + dgamma * slope / (2.0 * root));
        dgamma -= phi / d_phi;

        let (value, _) = xi(dgamma);
        residual = (1.5 * value).sqrt()
            - (constants.sigma_y0 + h * (plastic_strain_prev + hardening_arg(dgamma, value)));
        if residual.abs() <= tolerance {
            converged = Some(iteration);
            break;
        }
    }
    let Some(iterations) = converged else {
        return Err(LocalFailure {
            iterations: settings.max_iterations,
            residual,
        });
    };

    let (a, b) = factors(dgamma);
    let sum = sum_trial / a;
    let diff = diff_trial / b;
    let sigma = [0.5 * (sum - diff), 0.5 * (sum + diff), 0.0, shear_trial / b];
    let (value, _) = xi(dgamma);
    Ok((
        sigma,
        plastic_strain_prev + hardening_arg(dgamma, value),
        dgamma,
        iterations,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material() -> MaterialConstants {
        MaterialConstants::new(1000.0, 0.3, 100.0, 10.0)
    }

    const PLANES: [PlaneCondition; 2] = [PlaneCondition::Stress, PlaneCondition::Strain];

    fn update(plane: PlaneCondition, eps: [f64; 4], prev: f64) -> StressUpdate {
        return_mapping(&material(), plane, &eps, prev, &LocalSettings::default()).unwrap()
    }

    #[test]
    fn elastic_level_returns_trial_state() {
        let c = material();
        let eps = [0.002, -0.001, 0.0, 0.001];
        for plane in PLANES {
            let update = update(plane, eps, 0.0);
            assert!(!update.plastic);
            assert_eq!(update.dgamma, 0.0);
            assert_eq!(
                [update.elastic_strain[0], update.elastic_strain[1], update.elastic_strain[3]],
                [eps[0], eps[1], eps[3]]
            );
            let expected =
                plane_elastic_matrix(&c, plane) * Vector3::new(eps[0], eps[1], eps[3]);
            for i in 0..3 {
                assert!((update.stress[i] - expected[i]).abs() < 1e-12);
            }
        }
        assert_eq!(update(PlaneCondition::Stress, eps, 0.0).stress_zz, 0.0);
    }

    #[test]
    fn hardened_point_stays_elastic_below_current_yield() {
        // q ≈ 10.75: above σ_y0 = 10, below σ_y0 + H * 0.05 = 15
        let eps = [0.011, 0.0, 0.0, 0.0];
        assert!(update(PlaneCondition::Stress, eps, 0.0).plastic);
        let hardened = update(PlaneCondition::Stress, eps, 0.05);
        assert!(!hardened.plastic);
        assert_eq!(hardened.plastic_strain, 0.05);
    }

    #[test]
    fn returned_stress_satisfies_yield_condition() {
        let c = material();
        let prev = 0.01;
        for plane in PLANES {
            for eps in [[0.03, -0.01, 0.0, 0.02], [0.03, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.05]] {
                let update = update(plane, eps, prev);
                assert!(update.plastic);
                assert!(update.dgamma > 0.0);
                assert!(update.plastic_strain > prev);

                // q of the full stress, σzz = 0 in plane stress
                let q = von_mises(&update.full_stress());
                let target = c.sigma_y0 + c.h * update.plastic_strain;
                assert!((q - target).abs() / target < 1e-9, "{plane:?}: q={q} target={target}");
            }
        }
    }

    #[test]
    fn plane_stress_return_keeps_out_of_plane_stress_zero() {
        let update = update(PlaneCondition::Stress, [0.03, 0.0, 0.0, 0.0], 0.0);
        assert_eq!(update.stress_zz, 0.0);
        let q = von_mises(&[update.stress[0], update.stress[1], 0.0, update.stress[2]]);
        assert!((q - (10.0 + 100.0 * update.plastic_strain)).abs() < 1e-8);
    }

    #[test]
    fn plane_strain_return_is_radial() {
        let eps = [0.03, -0.01, 0.0, 0.02];
        let update = update(PlaneCondition::Strain, eps, 0.01);
        let trial = trial_stress(&material(), PlaneCondition::Strain, &eps);
        let dev_trial = deviator(&trial);
        let dev_new = deviator(&update.full_stress());
        let ratio = deviator_norm(&dev_new) / deviator_norm(&dev_trial);
        assert!(ratio > 0.0 && ratio < 1.0);
        for i in 0..4 {
            assert!((dev_new[i] - ratio * dev_trial[i]).abs() < 1e-9 * deviator_norm(&dev_trial));
        }
        assert!((mean_stress(&update.full_stress()) - mean_stress(&trial)).abs() < 1e-9);
        assert!((update.plastic_strain - (0.01 + update.dgamma)).abs() < 1e-15);
    }

    #[test]
    fn committed_plastic_state_re_evaluates_as_elastic() {
        for plane in PLANES {
            let first = update(plane, [0.03, 0.0, 0.0, 0.01], 0.0);
            assert!(first.plastic);

            // Zero strain increment from the returned state
            let again = update(plane, first.elastic_strain, first.plastic_strain);
            assert!(!again.plastic, "{plane:?}: dgamma = {}", again.dgamma);
            assert_eq!(again.plastic_strain, first.plastic_strain);
            for i in 0..3 {
                assert!(
                    (again.stress[i] - first.stress[i]).abs() < 1e-9,
                    "{plane:?}: {:?} vs {:?}",
                    again.stress,
                    first.stress
                );
            }
        }
    }

    #[test]
    fn elastic_strain_is_compliance_times_stress() {
        let c = material();
        let update = update(PlaneCondition::Strain, [0.02, 0.0, 0.0, 0.0], 0.0);
        assert!(update.plastic);
        // Plastic flow leaves an out-of-plane elastic strain behind
        assert!(update.elastic_strain[2].abs() > 0.0);
        let back = elastic_matrix_4(&c) * Vector4::from(update.elastic_strain);
        let full = update.full_stress();
        for i in 0..4 {
            assert!((back[i] - full[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn re_evaluation_is_idempotent() {
        let eps = [0.02, 0.005, 0.0, -0.01];
        for plane in PLANES {
            assert_eq!(update(plane, eps, 0.0), update(plane, eps, 0.0));
        }
    }

    #[test]
    fn linear_hardening_converges_in_one_radial_update() {
        let settings = LocalSettings {
            max_iterations: 1,
            tolerance: 1e-10,
        };
        let update = return_mapping(
            &material(),
            PlaneCondition::Strain,
            &[0.05, 0.0, 0.0, 0.0],
            0.0,
            &settings,
        )
        .unwrap();
        assert_eq!(update.iterations, 1);
    }

    #[test]
    fn plane_stress_newton_needs_several_updates() {
        let settings = LocalSettings {
            max_iterations: 1,
            tolerance: 1e-12,
        };
        let failure = return_mapping(
            &material(),
            PlaneCondition::Stress,
            &[0.05, 0.0, 0.0, 0.0],
            0.0,
            &settings,
        )
        .unwrap_err();
        assert_eq!(failure.iterations, 1);
        assert!(failure.residual.abs() > 1e-12 * 10.0);
    }

    #[test]
    fn non_finite_trial_strain_exhausts_budget() {
        let settings = LocalSettings {
            max_iterations: 7,
            tolerance: 1e-10,
        };
        for plane in PLANES {
            let failure =
                return_mapping(&material(), plane, &[f64::NAN, 0.0, 0.0, 0.0], 0.0, &settings)
                    .unwrap_err();
            assert_eq!(failure.iterations, 7);
        }
    }
}
