//! Boundary conditions and loading for plane analysis.
//!
//! This module handles:
//! - Displacement constraints on points and edges, per direction (*BOUNDARY)
//! - Concentrated nodal loads (*CLOAD)
//! - Edge loads: pressure (*DLOAD Pn) and traction vectors
//!
//! Prescribed displacement values and loads are reference values at load
//! factor 1; the driver scales both by the current load factor.

use std::collections::BTreeMap;

use crate::error::{Result, SolverError};
use crate::mesh::Mesh;

/// In-plane direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    X,
    Y,
}

impl Direction {
    /// Offset within the node's dof pair
    pub fn offset(&self) -> usize {
        match self {
            Direction::X => 0,
            Direction::Y => 1,
        }
    }

    /// Map a 1-based deck dof number; 3 and above have no in-plane meaning.
    pub fn from_deck_dof(dof: usize) -> Option<Self> {
        match dof {
            1 => Some(Direction::X),
            2 => Some(Direction::Y),
            _ => None,
        }
    }
}

/// Where a displacement constraint acts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BcLocation {
    Node(i32),
    /// Straight edge between two nodes; both end nodes are constrained
    Edge(i32, i32),
}

impl BcLocation {
    pub fn nodes(&self) -> Vec<i32> {
        match *self {
            BcLocation::Node(n) => vec![n],
            BcLocation::Edge(a, b) => vec![a, b],
        }
    }
}

/// A displacement constraint, each direction restrained independently
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementBC {
    pub location: BcLocation,
    /// Prescribed ux at load factor 1, `None` leaves x free
    pub ux: Option<f64>,
    /// Prescribed uy at load factor 1, `None` leaves y free
    pub uy: Option<f64>,
}

impl DisplacementBC {
    pub fn new(location: BcLocation, ux: Option<f64>, uy: Option<f64>) -> Self {
        Self { location, ux, uy }
    }

    /// Both directions held at zero
    pub fn fixed(location: BcLocation) -> Self {
        Self::new(location, Some(0.0), Some(0.0))
    }

    pub fn value(&self, direction: Direction) -> Option<f64> {
        match direction {
            Direction::X => self.ux,
            Direction::Y => self.uy,
        }
    }

    pub fn num_restrained_directions(&self) -> usize {
        self.ux.is_some() as usize + self.uy.is_some() as usize
    }
}

/// A concentrated load on a node
#[derive(Debug, Clone, PartialEq)]
pub struct ConcentratedLoad {
    pub node: i32,
    pub direction: Direction,
    pub magnitude: f64,
}

impl ConcentratedLoad {
    pub fn new(node: i32, direction: Direction, magnitude: f64) -> Self {
        Self {
            node,
            direction,
            magnitude,
        }
    }
}

/// Distribution of an edge load
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeLoadKind {
    /// Uniform pressure, positive when pushing into the element
    Pressure(f64),
    /// Uniform traction vector `[tx, ty]` (force per unit length and thickness)
    Traction([f64; 2]),
}

/// A uniform load on the straight edge `nodes[0] -> nodes[1]`
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLoad {
    /// Owning element, whose section thickness applies when present
    pub element: Option<i32>,
    /// Edge end nodes, in the element's counter-clockwise order for pressure
    pub nodes: [i32; 2],
    pub kind: EdgeLoadKind,
}

impl EdgeLoad {
    pub fn traction(nodes: [i32; 2], traction: [f64; 2]) -> Self {
        Self {
            element: None,
            nodes,
            kind: EdgeLoadKind::Traction(traction),
        }
    }

    pub fn pressure(element: i32, nodes: [i32; 2], pressure: f64) -> Self {
        Self {
            element: Some(element),
            nodes,
            kind: EdgeLoadKind::Pressure(pressure),
        }
    }
}

/// Constraints and loads of a model
#[derive(Debug, Clone, Default)]
pub struct BoundaryConditions {
    pub displacement_bcs: Vec<DisplacementBC>,
    pub concentrated_loads: Vec<ConcentratedLoad>,
    pub edge_loads: Vec<EdgeLoad>,
}

impl BoundaryConditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_displacement_bc(&mut self, bc: DisplacementBC) {
        self.displacement_bcs.push(bc);
    }

    pub fn add_concentrated_load(&mut self, load: ConcentratedLoad) {
        self.concentrated_loads.push(load);
    }

    pub fn add_edge_load(&mut self, load: EdgeLoad) {
        self.edge_loads.push(load);
    }

    /// Global dof -> prescribed value at load factor 1.
    ///
    /// A dof named by several constraints must get the same value from all
    /// of them.
    pub fn prescribed_dofs(&self, mesh: &Mesh) -> Result<BTreeMap<usize, f64>> {
        let mut prescribed = BTreeMap::new();

        for bc in &self.displacement_bcs {
            for node in bc.location.nodes() {
                let dofs = mesh.node_dofs(node).ok_or_else(|| {
                    SolverError::Mesh(format!(
                        "displacement constraint references non-existent node {}",
                        node
                    ))
                })?;
                for direction in [Direction::X, Direction::Y] {
                    let Some(value) = bc.value(direction) else {
                        continue;
                    };
                    let dof = dofs[direction.offset()];
                    match prescribed.insert(dof, value) {
                        Some(previous) if previous != value => {
                            return Err(SolverError::Configuration(format!(
                                "node {} direction {:?} prescribed both {} and {}",
                                node, direction, previous, value
                            )));
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(prescribed)
    }

    pub fn statistics(&self) -> BCStatistics {
        BCStatistics {
            num_displacement_bcs: self.displacement_bcs.len(),
            num_restrained_directions: self
                .displacement_bcs
                .iter()
                .map(|bc| bc.location.nodes().len() * bc.num_restrained_directions())
                .sum(),
            num_concentrated_loads: self.concentrated_loads.len(),
            num_edge_loads: self.edge_loads.len(),
        }
    }
}

/// Boundary condition statistics
#[derive(Debug, Clone)]
pub struct BCStatistics {
    pub num_displacement_bcs: usize,
    /// Node-direction pairs named by constraints (duplicates counted)
    pub num_restrained_directions: usize,
    pub num_concentrated_loads: usize,
    pub num_edge_loads: usize,
}

impl BCStatistics {
    /// Format as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "BCs: {} displacement entries ({} restrained directions), {} concentrated loads, {} edge loads",
            self.num_displacement_bcs,
            self.num_restrained_directions,
            self.num_concentrated_loads,
            self.num_edge_loads
        )
    }
}
