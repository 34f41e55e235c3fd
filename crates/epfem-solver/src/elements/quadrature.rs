//! Gauss integration rules on the reference quadrilateral and triangle.

/// One integration point in natural coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationPoint {
    pub xi: f64,
    pub eta: f64,
    pub weight: f64,
}

/// 1D Gauss-Legendre points and weights on [-1, 1].
pub fn gauss_legendre(order: usize) -> Result<Vec<(f64, f64)>, String> {
    match order {
        1 => Ok(vec![(0.0, 2.0)]),
        2 => {
            let a = 1.0 / 3.0_f64.sqrt();
            Ok(vec![(-a, 1.0), (a, 1.0)])
        }
        3 => {
            let a = (3.0_f64 / 5.0).sqrt();
            Ok(vec![(-a, 5.0 / 9.0), (0.0, 8.0 / 9.0), (a, 5.0 / 9.0)])
        }
        _ => Err(format!("Gauss-Legendre order {} not supported (1-3)", order)),
    }
}

/// Tensor-product rule on [-1, 1]², `order` points per direction.
///
/// Points run along ξ first, then η.
pub fn quadrilateral_rule(order: usize) -> Result<Vec<IntegrationPoint>, String> {
    let line = gauss_legendre(order)?;
    let mut points = Vec::with_capacity(line.len() * line.len());
    for &(eta, w_eta) in &line {
        for &(xi, w_xi) in &line {
            points.push(IntegrationPoint {
                xi,
                eta,
                weight: w_xi * w_eta,
            });
        }
    }
    Ok(points)
}

/// Centroid rule on the reference triangle (area 1/2).
pub fn triangle_rule() -> Vec<IntegrationPoint> {
    vec![IntegrationPoint {
        xi: 1.0 / 3.0,
        eta: 1.0 / 3.0,
        weight: 0.5,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_reference_area() {
        for order in 1..=3 {
            let rule = quadrilateral_rule(order).unwrap();
            assert_eq!(rule.len(), order * order);
            let total: f64 = rule.iter().map(|p| p.weight).sum();
            assert!((total - 4.0).abs() < 1e-14, "order {order}: {total}");
        }
        let tri: f64 = triangle_rule().iter().map(|p| p.weight).sum();
        assert!((tri - 0.5).abs() < 1e-15);
    }

    #[test]
    fn three_point_rule_integrates_quintic_exactly() {
        // ∫ x^4 dx over [-1, 1] = 2/5
        let sum: f64 = gauss_legendre(3)
            .unwrap()
            .iter()
            .map(|(x, w)| w * x.powi(4))
            .sum();
        assert!((sum - 0.4).abs() < 1e-14);
    }

    #[test]
    fn unsupported_order_is_an_error() {
        assert!(gauss_legendre(0).is_err());
        assert!(quadrilateral_rule(4).is_err());
    }
}
