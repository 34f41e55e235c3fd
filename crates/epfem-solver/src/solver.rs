//! Incremental-iterative elastoplastic solver.
//!
//! Applies the load program `λ_0, λ_1, ...` and solves equilibrium
//!
//! ```text
//! r(u) = f_int(u) - λ f_ext_ref = 0
//! ```
//!
//! at every load factor with Newton iterations on the free dof.
//!
//! # Load increment
//!
//! 1. INIT: Δu = 0, assemble at the committed state
//! 2. Reduce `(K_T, r)` to the free dof, prescribed dof move to `λ ū`
//! 3. Solve `K_ff δu_f = -r_reduced`, add `δu` to `u` and `Δu`
//! 4. Reassemble at the new Δu; error = ‖r_f‖, energy = Δu · r
//! 5. Converged when error ≤ `global_tolerance`: commit the candidate
//!    integration-point state, store `u`, report the increment
//! 6. Otherwise repeat from 2 until `max_global_iterations`, then fail
//!
//! A failed increment commits nothing and ends the run.
//!
//! # Example
//!
//! ```no_run
//! use epfem_solver::{IncrementalSolver, MemorySink, Problem, SolverConfig};
//!
//! # fn example() -> epfem_solver::Result<()> {
//! let problem = Problem::from_file("plate.inp")?;
//! let solver = IncrementalSolver::new(&problem, SolverConfig::default())?;
//!
//! let mut sink = MemorySink::new();
//! let results = solver.solve(&mut sink)?;
//! println!("max plastic strain: {:.4e}", results.max_plastic_strain());
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use nalgebra::DVector;

use crate::assembly::{Assembler, Assembly};
use crate::backend::{DenseLu, LinearSolver};
use crate::config::{PlaneCondition, SolverConfig, validate_load_program};
use crate::error::{Result, SolverError};
use crate::external_loads::reference_load_vector;
use crate::partition::DofPartition;
use crate::problem::Problem;
use crate::reporting::{
    ElementField, IncrementReport, PLASTIC_STRAIN_FIELD, ResultSink, STRESS_XX_FIELD,
};
use crate::state::{RunState, SolutionHistory, StateMap};

/// Results of a completed run
#[derive(Debug, Clone)]
pub struct IncrementalResults {
    pub load_factors: Vec<f64>,
    /// Converged displacement per increment, one column each
    pub history: SolutionHistory,
    /// Newton iterations per increment
    pub iterations: Vec<usize>,
    /// Residual norm at convergence per increment
    pub residuals: Vec<f64>,
    /// Total displacement after the last increment
    pub displacement: DVector<f64>,
    /// Committed integration-point state after the last increment
    pub state: StateMap,
    /// Element stress `[σxx, σyy, τxy]` after the last increment
    pub element_stress: HashMap<i32, [f64; 3]>,
    /// Element σzz after the last increment, zero under plane stress
    pub element_stress_zz: HashMap<i32, f64>,
}

impl IncrementalResults {
    pub fn num_increments(&self) -> usize {
        self.load_factors.len()
    }

    pub fn total_iterations(&self) -> usize {
        self.iterations.iter().sum()
    }

    pub fn max_plastic_strain(&self) -> f64 {
        self.state.max_plastic_strain()
    }
}

struct ConvergedIncrement {
    iterations: usize,
    residual: f64,
    assembly: Assembly,
}

/// Incremental Newton driver over an immutable [`Problem`]
pub struct IncrementalSolver<'a> {
    problem: &'a Problem,
    config: SolverConfig,
    program: Vec<f64>,
    assembler: Assembler,
    partition: DofPartition,
    f_ext_ref: DVector<f64>,
    backend: Box<dyn LinearSolver>,
}

impl<'a> IncrementalSolver<'a> {
    /// Prepare a run: validate the inputs, resolve every element and build
    /// the reference load vector and the dof partition.
    ///
    /// # Errors
    /// Invalid configuration or load program, mesh errors, missing material
    /// data and unresolvable constraints. Nothing is solved yet.
    pub fn new(problem: &'a Problem, config: SolverConfig) -> Result<Self> {
        config.validate()?;
        problem.validate()?;

        let plane = problem.plane_condition(&config);
        let program = problem.load_program(&config);
        validate_load_program(&program)?;

        let assembler = Assembler::new(&problem.mesh, &problem.materials, plane, &config)?;
        let partition = DofPartition::new(
            problem.mesh.num_dofs,
            &problem.bcs.prescribed_dofs(&problem.mesh)?,
        );
        let f_ext_ref = reference_load_vector(
            &problem.mesh,
            &problem.bcs,
            &problem.materials,
            config.thickness,
        )?;

        Ok(Self {
            problem,
            config,
            program,
            assembler,
            partition,
            f_ext_ref,
            backend: Box::new(DenseLu),
        })
    }

    /// Replace the linear solver of the reduced system.
    pub fn with_backend(mut self, backend: Box<dyn LinearSolver>) -> Self {
        self.backend = backend;
        self
    }

    pub fn plane(&self) -> PlaneCondition {
        self.assembler.plane()
    }

    pub fn load_program(&self) -> &[f64] {
        &self.program
    }

    pub fn assembler(&self) -> &Assembler {
        &self.assembler
    }

    pub fn partition(&self) -> &DofPartition {
        &self.partition
    }

    pub fn reference_load(&self) -> &DVector<f64> {
        &self.f_ext_ref
    }

    /// Run the whole load program, reporting every converged increment.
    ///
    /// # Errors
    /// The first local or global non-convergence, linear-solve failure or
    /// sink error ends the run.
    pub fn solve(&self, sink: &mut dyn ResultSink) -> Result<IncrementalResults> {
        let start = Instant::now();
        let num_dofs = self.assembler.num_dofs();
        let mut run = RunState::new(num_dofs);
        let mut committed = StateMap::zeroed(self.assembler.integration_points());
        let mut history = SolutionHistory::new(num_dofs, self.program.clone());
        let mut iterations = Vec::with_capacity(self.program.len());
        let mut residuals = Vec::with_capacity(self.program.len());
        let mut element_stress = HashMap::new();
        let mut element_stress_zz = HashMap::new();

        if self.config.verbose {
            println!(
                "Incremental solve: {} dof ({} free), {} elements, {} load increments, plane {:?}",
                num_dofs,
                self.partition.num_free(),
                self.assembler.elements().len(),
                self.program.len(),
                self.plane()
            );
        }

        for (increment, &lambda) in self.program.iter().enumerate() {
            if self.config.verbose {
                println!("Increment {}: load factor {:.6}", increment, lambda);
            }

            let converged = self.solve_increment(increment, lambda, &mut run, &committed)?;

            // COMMIT
            committed = converged.assembly.candidate;
            history.store(increment, &run.u);
            iterations.push(converged.iterations);
            residuals.push(converged.residual);
            element_stress = converged.assembly.element_stress;
            element_stress_zz = converged.assembly.element_stress_zz;

            let report = self.report(
                increment,
                lambda,
                converged.iterations,
                converged.residual,
                &run.u,
                &committed,
                &element_stress,
            );
            sink.record(&report)?;

            if self.config.verbose {
                println!(
                    "  converged in {} iterations, max plastic strain {:.4e}",
                    converged.iterations,
                    committed.max_plastic_strain()
                );
            }
        }

        if self.config.verbose {
            println!(
                "Finished {} increments, {} Newton iterations in {:.3} s",
                self.program.len(),
                iterations.iter().sum::<usize>(),
                start.elapsed().as_secs_f64()
            );
        }

        Ok(IncrementalResults {
            load_factors: self.program.clone(),
            history,
            iterations,
            residuals,
            displacement: run.u,
            state: committed,
            element_stress,
            element_stress_zz,
        })
    }

    /// Newton iterations of one load increment. Reads `committed` only.
    fn solve_increment(
        &self,
        increment: usize,
        lambda: f64,
        run: &mut RunState,
        committed: &StateMap,
    ) -> Result<ConvergedIncrement> {
        run.begin_increment();
        let f_ext = &self.f_ext_ref * lambda;
        let mut assembly = self
            .assembler
            .assemble(committed, &run.du)
            .map_err(|e| e.at_iteration(increment, 0))?;

        let mut residual = f64::INFINITY;
        for iteration in 1..=self.config.max_global_iterations {
            let r = &assembly.f_int - &f_ext;
            let reduced = self.partition.partition(&assembly.k_t, &r, &run.u, lambda);

            let du_free = if self.partition.num_free() == 0 {
                DVector::zeros(0)
            } else {
                let (solution, _info) = self
                    .backend
                    .solve_linear(&reduced.k_ff, &(-&reduced.r_reduced))
                    .map_err(|e| {
                        SolverError::LinearSolve(e.0).at_iteration(increment, iteration)
                    })?;
                solution
            };
            let correction = self.partition.expand(&du_free, &reduced.prescribed_correction);
            run.apply_correction(&correction);

            assembly = self
                .assembler
                .assemble(committed, &run.du)
                .map_err(|e| e.at_iteration(increment, iteration))?;

            let r = &assembly.f_int - &f_ext;
            residual = self.partition.free_norm(&r);
            let energy = run.du.dot(&r);

            if self.config.verbose {
                println!(
                    "  iteration {}: error = {:.6e}, energy = {:.6e}, plastic points = {}",
                    iteration, residual, energy, assembly.plastic_points
                );
            }

            if residual <= self.config.global_tolerance {
                return Ok(ConvergedIncrement {
                    iterations: iteration,
                    residual,
                    assembly,
                });
            }
        }

        Err(SolverError::GlobalNonConvergence {
            increment,
            iterations: self.config.max_global_iterations,
            residual,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn report(
        &self,
        increment: usize,
        load_factor: f64,
        iterations: usize,
        residual: f64,
        u: &DVector<f64>,
        committed: &StateMap,
        element_stress: &HashMap<i32, [f64; 3]>,
    ) -> IncrementReport {
        let mesh = &self.problem.mesh;
        let node_displacements = mesh
            .sorted_node_ids()
            .into_iter()
            .filter_map(|id| mesh.node_dofs(id).map(|[dx, dy]| (id, [u[dx], u[dy]])))
            .collect();

        let mut plastic_strain = BTreeMap::new();
        let mut stress_xx = BTreeMap::new();
        for element in self.assembler.elements() {
            plastic_strain.insert(
                element.id,
                committed.element_average_plastic_strain(element.id),
            );
            stress_xx.insert(
                element.id,
                element_stress.get(&element.id).map_or(0.0, |s| s[0]),
            );
        }

        IncrementReport {
            increment,
            load_factor,
            iterations,
            residual,
            node_displacements,
            element_fields: vec![
                ElementField::element_average(PLASTIC_STRAIN_FIELD, plastic_strain),
                ElementField::element_average(STRESS_XX_FIELD, stress_xx),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary_conditions::{BcLocation, BoundaryConditions, DisplacementBC, EdgeLoad};
    use crate::materials::{Material, MaterialLibrary};
    use crate::mesh::{Element, ElementType, Mesh, Node};
    use crate::reporting::{MemorySink, NullSink};

    /// Unit square pulled in x on its right edge, rollers on the left.
    fn patch(traction: f64, element_type: ElementType) -> Problem {
        let mut mesh = Mesh::new();
        mesh.add_node(Node::new(1, 0.0, 0.0));
        mesh.add_node(Node::new(2, 1.0, 0.0));
        mesh.add_node(Node::new(3, 1.0, 1.0));
        mesh.add_node(Node::new(4, 0.0, 1.0));
        mesh.add_element(Element::new(1, element_type, vec![1, 2, 3, 4]))
            .unwrap();

        let mut materials = MaterialLibrary::new();
        materials.add_material(Material::elastoplastic("STEEL", 1000.0, 0.3, 500.0, 10.0));
        materials.assign_material(1, "STEEL");

        let mut bcs = BoundaryConditions::new();
        bcs.add_displacement_bc(DisplacementBC::fixed(BcLocation::Node(1)));
        bcs.add_displacement_bc(DisplacementBC::new(BcLocation::Node(4), Some(0.0), None));
        bcs.add_edge_load(EdgeLoad::traction([2, 3], [traction, 0.0]));

        Problem::new(mesh, materials, bcs)
    }

    fn config(program: Vec<f64>) -> SolverConfig {
        SolverConfig {
            load_increments: Some(program),
            ..Default::default()
        }
    }

    #[test]
    fn elastic_patch_converges_in_one_iteration() {
        let problem = patch(5.0, ElementType::CPS4);
        let solver = IncrementalSolver::new(&problem, config(vec![0.5, 1.0])).unwrap();
        let mut sink = MemorySink::new();
        let results = solver.solve(&mut sink).unwrap();

        assert_eq!(results.iterations, vec![1, 1]);
        assert_eq!(results.max_plastic_strain(), 0.0);

        let ux = sink.last().unwrap().node_displacements[&3][0];
        let expected = 5.0 / 1000.0;
        assert!(
            (ux - expected).abs() / expected < 1e-8,
            "ux = {ux}, expected {expected}"
        );
        let half = results.history.column(0);
        assert!((half[2] - 0.5 * expected).abs() < 1e-12);
    }

    #[test]
    fn zero_load_program_is_trivially_converged() {
        let problem = patch(5.0, ElementType::CPS4);
        let solver = IncrementalSolver::new(&problem, config(vec![0.0])).unwrap();
        let results = solver.solve(&mut NullSink).unwrap();

        assert_eq!(results.iterations, vec![1]);
        assert_eq!(results.residuals, vec![0.0]);
        assert!(results.displacement.iter().all(|v| *v == 0.0));
        assert_eq!(results.max_plastic_strain(), 0.0);
    }

    #[test]
    fn reports_every_increment_with_fields() {
        let problem = patch(5.0, ElementType::CPE4);
        let solver = IncrementalSolver::new(&problem, config(vec![0.0, 0.5, 1.0])).unwrap();
        let mut sink = MemorySink::new();
        solver.solve(&mut sink).unwrap();

        assert_eq!(sink.reports.len(), 3);
        let last = sink.last().unwrap();
        assert_eq!(last.increment, 2);
        assert_eq!(last.load_factor, 1.0);
        assert_eq!(last.node_displacements.len(), 4);

        let sxx = last.field(STRESS_XX_FIELD).unwrap().values[&1];
        assert!((sxx - 5.0).abs() < 1e-8, "σxx = {sxx}");
        assert_eq!(last.field(PLASTIC_STRAIN_FIELD).unwrap().values[&1], 0.0);
    }

    #[test]
    fn exhausted_iterations_fail_without_commit() {
        let problem = patch(13.0, ElementType::CPS4);
        let cfg = SolverConfig {
            load_increments: Some(vec![1.0]),
            max_global_iterations: 1,
            ..Default::default()
        };
        let solver = IncrementalSolver::new(&problem, cfg).unwrap();
        let mut sink = MemorySink::new();
        let err = solver.solve(&mut sink).unwrap_err();

        assert!(matches!(
            err,
            SolverError::GlobalNonConvergence {
                increment: 0,
                iterations: 1,
                ..
            }
        ));
        assert!(sink.reports.is_empty());
    }

    #[test]
    fn invalid_program_is_rejected_up_front() {
        let problem = patch(5.0, ElementType::CPS4);
        assert!(IncrementalSolver::new(&problem, config(vec![0.5, 2.0])).is_err());
    }
}
