//! Plane continuum elements.
//!
//! Elements supply the kinematic operator only: the strain-displacement matrix
//! B (3 × 2n, engineering shear strain) and the Jacobian determinant at an
//! integration point. Constitutive work happens in the assembler.

use nalgebra::DMatrix;

use crate::error::{Result, SolverError};
use crate::mesh::{DOFS_PER_NODE, Element, ElementType, Mesh};

pub mod quad4;
pub mod quadrature;
pub mod tri3;

pub use quad4::Quad4;
pub use quadrature::IntegrationPoint;
pub use tri3::Tri3;

/// Kinematic interface of an isoparametric plane element
pub trait PlaneElement {
    fn num_nodes(&self) -> usize;

    /// Integration rule in natural coordinates
    fn quadrature(&self) -> &[IntegrationPoint];

    /// `[dN_i/dξ, dN_i/dη]` for every node at a natural point
    fn natural_derivatives(&self, xi: f64, eta: f64) -> Vec<[f64; 2]>;

    /// Strain-displacement matrix and Jacobian determinant at an integration point.
    ///
    /// Strain components are `[εxx, εyy, γxy]`; columns follow the element dof
    /// order `[u1x, u1y, u2x, u2y, ...]`.
    ///
    /// # Errors
    /// Wrong number of coordinates, or a non-positive Jacobian determinant
    /// (inverted or degenerate element).
    fn strain_displacement(
        &self,
        coords: &[[f64; 2]],
        ip: &IntegrationPoint,
    ) -> std::result::Result<(DMatrix<f64>, f64), String> {
        let n = self.num_nodes();
        if coords.len() != n {
            return Err(format!("expected {} node coordinates, got {}", n, coords.len()));
        }

        let dn = self.natural_derivatives(ip.xi, ip.eta);

        // J = [dx/dξ dy/dξ; dx/dη dy/dη]
        let mut j = [[0.0; 2]; 2];
        for (d, x) in dn.iter().zip(coords) {
            j[0][0] += d[0] * x[0];
            j[0][1] += d[0] * x[1];
            j[1][0] += d[1] * x[0];
            j[1][1] += d[1] * x[1];
        }
        let det = j[0][0] * j[1][1] - j[0][1] * j[1][0];
        if !det.is_finite() || det <= 0.0 {
            return Err(format!(
                "non-positive Jacobian determinant {:.3e} at (ξ, η) = ({:.4}, {:.4}); check node ordering",
                det, ip.xi, ip.eta
            ));
        }

        let inv = [
            [j[1][1] / det, -j[0][1] / det],
            [-j[1][0] / det, j[0][0] / det],
        ];

        let mut b = DMatrix::zeros(3, n * DOFS_PER_NODE);
        for (i, d) in dn.iter().enumerate() {
            let dn_dx = inv[0][0] * d[0] + inv[0][1] * d[1];
            let dn_dy = inv[1][0] * d[0] + inv[1][1] * d[1];
            let col = i * DOFS_PER_NODE;

            b[(0, col)] = dn_dx;
            b[(1, col + 1)] = dn_dy;
            b[(2, col)] = dn_dy;
            b[(2, col + 1)] = dn_dx;
        }

        Ok((b, det))
    }

    /// Global dof of the element in local order.
    fn global_dof_indices(&self, mesh: &Mesh, element: &Element) -> Result<Vec<usize>> {
        let dofs = mesh.element_dofs(element)?;
        if dofs.len() != self.num_nodes() * DOFS_PER_NODE {
            return Err(SolverError::Element {
                element: element.id,
                message: format!("connectivity gives {} dof", dofs.len()),
            });
        }
        Ok(dofs)
    }
}

/// Element kernel chosen from the mesh element type
#[derive(Debug, Clone)]
pub enum ElementKernel {
    Quad4(Quad4),
    Tri3(Tri3),
}

impl ElementKernel {
    /// `quadrature_order` is the number of Gauss points per direction for quadrilaterals.
    pub fn for_type(element_type: ElementType, quadrature_order: usize) -> Result<Self> {
        match element_type {
            ElementType::CPS4 | ElementType::CPE4 => Quad4::new(quadrature_order)
                .map(ElementKernel::Quad4)
                .map_err(SolverError::Configuration),
            ElementType::CPS3 | ElementType::CPE3 => Ok(ElementKernel::Tri3(Tri3::new())),
        }
    }

    fn inner(&self) -> &dyn PlaneElement {
        match self {
            ElementKernel::Quad4(e) => e,
            ElementKernel::Tri3(e) => e,
        }
    }
}

impl PlaneElement for ElementKernel {
    fn num_nodes(&self) -> usize {
        self.inner().num_nodes()
    }

    fn quadrature(&self) -> &[IntegrationPoint] {
        self.inner().quadrature()
    }

    fn natural_derivatives(&self, xi: f64, eta: f64) -> Vec<[f64; 2]> {
        self.inner().natural_derivatives(xi, eta)
    }
}
