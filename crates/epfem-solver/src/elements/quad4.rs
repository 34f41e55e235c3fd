//! 4-node bilinear quadrilateral.

use crate::elements::PlaneElement;
use crate::elements::quadrature::{IntegrationPoint, quadrilateral_rule};

/// Natural coordinates of the corner nodes
const CORNERS: [[f64; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

/// Bilinear quadrilateral
///
/// Node ordering (counter-clockwise):
/// ```text
///     4-----------3
///     |           |
///     |           |
///     1-----------2
/// ```
///
/// - Shape functions: N_i = (1 + ξξ_i)(1 + ηη_i) / 4
/// - Integration: n×n Gauss-Legendre, n = 1, 2 or 3
#[derive(Debug, Clone)]
pub struct Quad4 {
    rule: Vec<IntegrationPoint>,
}

impl Quad4 {
    pub fn new(order: usize) -> Result<Self, String> {
        Ok(Self {
            rule: quadrilateral_rule(order)?,
        })
    }

    pub fn shape_functions(xi: f64, eta: f64) -> [f64; 4] {
        CORNERS.map(|[xi_i, eta_i]| (1.0 + xi * xi_i) * (1.0 + eta * eta_i) / 4.0)
    }
}

impl PlaneElement for Quad4 {
    fn num_nodes(&self) -> usize {
        4
    }

    fn quadrature(&self) -> &[IntegrationPoint] {
        &self.rule
    }

    fn natural_derivatives(&self, xi: f64, eta: f64) -> Vec<[f64; 2]> {
        CORNERS
            .iter()
            .map(|&[xi_i, eta_i]| {
                [
                    xi_i * (1.0 + eta * eta_i) / 4.0,
                    eta_i * (1.0 + xi * xi_i) / 4.0,
                ]
            })
            .collect()
    }
}
