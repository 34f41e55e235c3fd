//! Immutable problem definition.
//!
//! Everything the driver reads but never changes: mesh, sets, materials,
//! boundary conditions and the optional load program and plane condition
//! declared by an input deck.

use std::path::Path;

use epfem_inp::Deck;

use crate::bc_builder::{BCBuilder, load_program_from_deck};
use crate::boundary_conditions::BoundaryConditions;
use crate::config::{PlaneCondition, SolverConfig};
use crate::error::{Result, SolverError};
use crate::materials::MaterialLibrary;
use crate::mesh::Mesh;
use crate::mesh_builder::MeshBuilder;
use crate::sets::Sets;

#[derive(Debug, Clone)]
pub struct Problem {
    pub mesh: Mesh,
    pub sets: Sets,
    pub materials: MaterialLibrary,
    pub bcs: BoundaryConditions,
    /// Plane condition fixed by the element types, if any
    pub plane: Option<PlaneCondition>,
    /// Load program from `*STATIC`, if any
    pub load_program: Option<Vec<f64>>,
}

impl Problem {
    /// Assemble a problem from parts built in code. Dof are (re)numbered and
    /// the plane condition follows the element types.
    pub fn new(mut mesh: Mesh, materials: MaterialLibrary, bcs: BoundaryConditions) -> Self {
        mesh.calculate_dofs();
        let plane = mesh.plane_condition().ok().flatten();
        Self {
            mesh,
            sets: Sets::new(),
            materials,
            bcs,
            plane,
            load_program: None,
        }
    }

    pub fn with_plane(mut self, plane: PlaneCondition) -> Self {
        self.plane = Some(plane);
        self
    }

    pub fn from_deck(deck: &Deck) -> Result<Self> {
        let sets = Sets::build_from_deck(deck)?;
        let mesh = MeshBuilder::build_from_deck(deck)?;
        let materials = MaterialLibrary::build_from_deck(deck, &sets)?;
        let bcs = BCBuilder::build_from_deck(deck, &sets, &mesh)?;
        let plane = mesh.plane_condition()?;
        let load_program = load_program_from_deck(deck)?;

        Ok(Self {
            mesh,
            sets,
            materials,
            bcs,
            plane,
            load_program,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let deck = Deck::parse_file(path)?;
        Self::from_deck(&deck)
    }

    /// Plane condition of the run: the one implied by the model wins over
    /// the configuration.
    pub fn plane_condition(&self, config: &SolverConfig) -> PlaneCondition {
        match self.plane {
            Some(plane) => {
                if plane != config.plane && config.plane != PlaneCondition::default() {
                    eprintln!(
                        "warning: element types imply plane {:?}, ignoring configured {:?}",
                        plane, config.plane
                    );
                }
                plane
            }
            None => config.plane,
        }
    }

    /// Load program of the run: configuration first, then `*STATIC`, then the
    /// configured default of equal steps.
    pub fn load_program(&self, config: &SolverConfig) -> Vec<f64> {
        match (&config.load_increments, &self.load_program) {
            (Some(program), _) => program.clone(),
            (None, Some(program)) => program.clone(),
            (None, None) => config.load_program(),
        }
    }

    /// Check the model before a run: mesh references, a material for every
    /// element and resolvable constraints and loads.
    pub fn validate(&self) -> Result<()> {
        if self.mesh.elements.is_empty() {
            return Err(SolverError::Mesh("model has no elements".to_string()));
        }
        self.mesh.validate()?;
        self.mesh.plane_condition()?;
        for id in self.mesh.sorted_element_ids() {
            self.materials.element_constants(id)?;
        }
        self.bcs.prescribed_dofs(&self.mesh)?;
        for load in &self.bcs.concentrated_loads {
            if self.mesh.get_node(load.node).is_none() {
                return Err(SolverError::Mesh(format!(
                    "load references non-existent node {}",
                    load.node
                )));
            }
        }
        for load in &self.bcs.edge_loads {
            if let Some(&missing) = load.nodes.iter().find(|n| self.mesh.get_node(**n).is_none()) {
                return Err(SolverError::Mesh(format!(
                    "edge load references non-existent node {}",
                    missing
                )));
            }
        }
        Ok(())
    }

    /// Human-readable model summary
    pub fn statistics(&self) -> String {
        let materials = self.materials.statistics();
        let mut lines = vec![self.mesh.statistics().format()];
        lines.push(format!(
            "Materials: {} ({} complete), {} element assignments",
            materials.num_materials, materials.num_complete, materials.num_element_assignments
        ));
        lines.push(self.bcs.statistics().format());
        lines.push(format!(
            "Node sets: {}, element sets: {}",
            self.sets.node_sets.len(),
            self.sets.element_sets.len()
        ));
        if let Some(plane) = self.plane {
            lines.push(format!("Plane condition: {:?}", plane));
        }
        if let Some(program) = &self.load_program {
            lines.push(format!("Load program: {} increments", program.len()));
        }
        lines.join("\n")
    }
}
