//! 3-node constant-strain triangle.

use crate::elements::PlaneElement;
use crate::elements::quadrature::{IntegrationPoint, triangle_rule};

/// Linear triangle, nodes counter-clockwise.
///
/// N1 = 1 - ξ - η, N2 = ξ, N3 = η. B is constant over the element, so a
/// single centroid point integrates the stiffness exactly.
#[derive(Debug, Clone)]
pub struct Tri3 {
    rule: Vec<IntegrationPoint>,
}

impl Tri3 {
    pub fn new() -> Self {
        Self {
            rule: triangle_rule(),
        }
    }
}

impl Default for Tri3 {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaneElement for Tri3 {
    fn num_nodes(&self) -> usize {
        3
    }

    fn quadrature(&self) -> &[IntegrationPoint] {
        &self.rule
    }

    fn natural_derivatives(&self, _xi: f64, _eta: f64) -> Vec<[f64; 2]> {
        vec![[-1.0, -1.0], [1.0, 0.0], [0.0, 1.0]]
    }
}
