//! Global internal force and tangent assembly.
//!
//! For every element and integration point:
//!
//! 1. B and det J from the element kernel
//! 2. Δε = B Δu_e, trial elastic strain = committed ε_e + Δε
//! 3. Return mapping (candidate state) and lagged consistent tangent
//! 4. `f_e += Bᵀ σ det J w t`, `K_e += Bᵀ D B det J w t`
//!
//! Element contributions are independent and may be computed on the rayon
//! pool; the scatter into the global arrays always runs serially in
//! ascending element order.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector, Vector3};
use rayon::prelude::*;

use crate::config::{PlaneCondition, SolverConfig};
use crate::constitutive::{LocalSettings, consistent_tangent, return_mapping};
use crate::elements::{ElementKernel, PlaneElement};
use crate::error::{Result, SolverError};
use crate::materials::{MaterialConstants, MaterialLibrary};
use crate::mesh::Mesh;
use crate::state::{GaussPointState, PointKey, StateMap};

/// Everything the assembler needs about one element, resolved once per run
#[derive(Debug, Clone)]
pub struct PreparedElement {
    pub id: i32,
    pub kernel: ElementKernel,
    pub dofs: Vec<usize>,
    pub coords: Vec<[f64; 2]>,
    pub constants: MaterialConstants,
    pub thickness: f64,
}

/// Output of one assembly pass
#[derive(Debug, Clone)]
pub struct Assembly {
    pub f_int: DVector<f64>,
    pub k_t: DMatrix<f64>,
    /// Candidate integration-point state; committed only on convergence
    pub candidate: StateMap,
    /// Element stress `[σxx, σyy, τxy]`, averaged over integration points
    pub element_stress: HashMap<i32, [f64; 3]>,
    /// Averaged out-of-plane stress, zero under plane stress
    pub element_stress_zz: HashMap<i32, f64>,
    /// Integration points that returned to the yield surface
    pub plastic_points: usize,
}

struct ElementContribution {
    dofs: Vec<usize>,
    f_e: DVector<f64>,
    k_e: DMatrix<f64>,
    points: Vec<(usize, GaussPointState)>,
    stress: [f64; 3],
    stress_zz: f64,
    plastic_points: usize,
}

/// Element assembler over an immutable model
#[derive(Debug, Clone)]
pub struct Assembler {
    elements: Vec<PreparedElement>,
    num_dofs: usize,
    plane: PlaneCondition,
    local: LocalSettings,
    parallel: bool,
}

impl Assembler {
    /// Resolve kernels, dof, coordinates and material constants of every element.
    ///
    /// # Errors
    /// Missing or invalid material data for any element, unsupported
    /// quadrature order, or dangling node references. All of these surface
    /// here, before the first load increment.
    pub fn new(
        mesh: &Mesh,
        materials: &MaterialLibrary,
        plane: PlaneCondition,
        config: &SolverConfig,
    ) -> Result<Self> {
        let mut elements = Vec::with_capacity(mesh.elements.len());
        for id in mesh.sorted_element_ids() {
            let Some(element) = mesh.get_element(id) else {
                continue;
            };
            let kernel = ElementKernel::for_type(element.element_type, config.quadrature_order)?;
            elements.push(PreparedElement {
                id,
                dofs: kernel.global_dof_indices(mesh, element)?,
                coords: mesh.element_coords(element)?,
                constants: materials.element_constants(id)?,
                thickness: materials.element_thickness(id).unwrap_or(config.thickness),
                kernel,
            });
        }

        Ok(Self {
            elements,
            num_dofs: mesh.num_dofs,
            plane,
            local: LocalSettings {
                max_iterations: config.max_local_iterations,
                tolerance: config.local_tolerance,
            },
            parallel: config.parallel_assembly,
        })
    }

    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    pub fn plane(&self) -> PlaneCondition {
        self.plane
    }

    pub fn elements(&self) -> &[PreparedElement] {
        &self.elements
    }

    /// Every `(element, integration point)` key of the model.
    pub fn integration_points(&self) -> Vec<PointKey> {
        self.elements
            .iter()
            .flat_map(|e| (0..e.kernel.quadrature().len()).map(move |p| (e.id, p)))
            .collect()
    }

    /// Assemble `f_int` and `K_T` for the increment displacement `du`.
    ///
    /// Reads `committed` only; the updated state comes back as
    /// [`Assembly::candidate`].
    pub fn assemble(&self, committed: &StateMap, du: &DVector<f64>) -> Result<Assembly> {
        if du.len() != self.num_dofs {
            return Err(SolverError::Configuration(format!(
                "increment vector has {} entries, model has {} dof",
                du.len(),
                self.num_dofs
            )));
        }

        let contributions: Vec<ElementContribution> = if self.parallel {
            self.elements
                .par_iter()
                .map(|e| self.element_contribution(e, committed, du))
                .collect::<Result<_>>()?
        } else {
            self.elements
                .iter()
                .map(|e| self.element_contribution(e, committed, du))
                .collect::<Result<_>>()?
        };

        let mut f_int = DVector::zeros(self.num_dofs);
        let mut k_t = DMatrix::zeros(self.num_dofs, self.num_dofs);
        let mut candidate = StateMap::new();
        let mut element_stress = HashMap::with_capacity(self.elements.len());
        let mut element_stress_zz = HashMap::with_capacity(self.elements.len());
        let mut plastic_points = 0;

        for (element, contribution) in self.elements.iter().zip(contributions) {
            for (i_local, &i_global) in contribution.dofs.iter().enumerate() {
                f_int[i_global] += contribution.f_e[i_local];
                for (j_local, &j_global) in contribution.dofs.iter().enumerate() {
                    k_t[(i_global, j_global)] += contribution.k_e[(i_local, j_local)];
                }
            }
            for (point, state) in contribution.points {
                candidate.insert(element.id, point, state);
            }
            element_stress.insert(element.id, contribution.stress);
            element_stress_zz.insert(element.id, contribution.stress_zz);
            plastic_points += contribution.plastic_points;
        }

        Ok(Assembly {
            f_int,
            k_t,
            candidate,
            element_stress,
            element_stress_zz,
            plastic_points,
        })
    }

    fn element_contribution(
        &self,
        element: &PreparedElement,
        committed: &StateMap,
        du: &DVector<f64>,
    ) -> Result<ElementContribution> {
        let n = element.dofs.len();
        let du_e = DVector::from_iterator(n, element.dofs.iter().map(|&d| du[d]));
        let rule = element.kernel.quadrature();

        let mut f_e = DVector::zeros(n);
        let mut k_e = DMatrix::zeros(n, n);
        let mut points = Vec::with_capacity(rule.len());
        let mut stress_sum = [0.0; 3];
        let mut stress_zz_sum = 0.0;
        let mut plastic_points = 0;

        for (point, ip) in rule.iter().enumerate() {
            let (b, det_j) = element
                .kernel
                .strain_displacement(&element.coords, ip)
                .map_err(|message| SolverError::Element {
                    element: element.id,
                    message,
                })?;

            let previous = committed.get(element.id, point);
            let deps = &b * &du_e;
            // Total εzz is fixed, so the committed zz component carries over
            let eps_e_trial = [
                previous.elastic_strain[0] + deps[0],
                previous.elastic_strain[1] + deps[1],
                previous.elastic_strain[2],
                previous.elastic_strain[3] + deps[2],
            ];

            let update = return_mapping(
                &element.constants,
                self.plane,
                &eps_e_trial,
                previous.plastic_strain,
                &self.local,
            )
            .map_err(|failure| SolverError::LocalNonConvergence {
                element: element.id,
                point,
                iterations: failure.iterations,
                residual: failure.residual,
            })?;

            // Lagged tangent: Δγ of the last converged step
            let d = consistent_tangent(&element.constants, self.plane, &update, previous.dgamma);

            let scale = det_j * ip.weight * element.thickness;
            let sigma = Vector3::from(update.stress);
            f_e += b.transpose() * sigma * scale;
            k_e += b.transpose() * d * &b * scale;

            for (sum, s) in stress_sum.iter_mut().zip(update.stress) {
                *sum += s;
            }
            if self.plane == PlaneCondition::Strain {
                stress_zz_sum += update.stress_zz;
            }
            if update.plastic {
                plastic_points += 1;
            }
            points.push((
                point,
                GaussPointState {
                    elastic_strain: update.elastic_strain,
                    plastic_strain: update.plastic_strain,
                    dgamma: update.dgamma,
                },
            ));
        }

        let count = rule.len().max(1) as f64;
        Ok(ElementContribution {
            dofs: element.dofs.clone(),
            f_e,
            k_e,
            points,
            stress: stress_sum.map(|s| s / count),
            stress_zz: stress_zz_sum / count,
            plastic_points,
        })
    }
}
