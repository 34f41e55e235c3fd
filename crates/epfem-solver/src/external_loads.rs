//! Reference external load vector.
//!
//! Built once per run at load factor 1. Uniform edge loads on straight edges
//! are lumped consistently: each end node receives half of `t · L · thickness`.

use nalgebra::DVector;

use crate::boundary_conditions::{BoundaryConditions, EdgeLoadKind};
use crate::error::{Result, SolverError};
use crate::materials::MaterialLibrary;
use crate::mesh::Mesh;

/// Nodal forces `[f_a, f_b]` of a uniform load on the edge `a -> b`.
///
/// Pressure acts along the inward normal of a counter-clockwise element,
/// i.e. to the left of `a -> b`.
pub fn edge_nodal_forces(a: [f64; 2], b: [f64; 2], kind: EdgeLoadKind, thickness: f64) -> [[f64; 2]; 2] {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let length = (dx * dx + dy * dy).sqrt();

    let traction = match kind {
        EdgeLoadKind::Traction(t) => t,
        EdgeLoadKind::Pressure(p) if length > 0.0 => [-p * dy / length, p * dx / length],
        EdgeLoadKind::Pressure(_) => [0.0, 0.0],
    };

    let half = 0.5 * length * thickness;
    let f = [traction[0] * half, traction[1] * half];
    [f, f]
}

/// Assemble f_ext at load factor 1.
///
/// Edge loads use the section thickness of their element, the same one the
/// internal forces are integrated with. A load without an element takes the
/// element that owns its edge in the mesh. Without a section thickness,
/// `default_thickness` applies.
pub fn reference_load_vector(
    mesh: &Mesh,
    bcs: &BoundaryConditions,
    materials: &MaterialLibrary,
    default_thickness: f64,
) -> Result<DVector<f64>> {
    let mut f_ext = DVector::zeros(mesh.num_dofs);

    let dofs_of = |node: i32| {
        mesh.node_dofs(node).ok_or_else(|| {
            SolverError::Mesh(format!("load references non-existent node {}", node))
        })
    };

    for load in &bcs.concentrated_loads {
        let dofs = dofs_of(load.node)?;
        f_ext[dofs[load.direction.offset()]] += load.magnitude;
    }

    for load in &bcs.edge_loads {
        let [a, b] = load.nodes;
        let coords = |id: i32| {
            mesh.get_node(id).map(|n| n.coords()).ok_or_else(|| {
                SolverError::Mesh(format!("edge load references non-existent node {}", id))
            })
        };
        let thickness = load
            .element
            .or_else(|| mesh.edge_owner(a, b))
            .and_then(|e| materials.element_thickness(e))
            .unwrap_or(default_thickness);

        let forces = edge_nodal_forces(coords(a)?, coords(b)?, load.kind, thickness);
        for (node, force) in [a, b].into_iter().zip(forces) {
            let dofs = dofs_of(node)?;
            f_ext[dofs[0]] += force[0];
            f_ext[dofs[1]] += force[1];
        }
    }

    Ok(f_ext)
}
