//! Post-processing of converged results.
//!
//! Nodal displacement tables, line extraction along a fixed y and summary
//! statistics of element fields.

use std::collections::{BTreeMap, HashMap};

use nalgebra::DVector;

use crate::constitutive::von_mises;
use crate::mesh::Mesh;

/// Statistical summary of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: usize,
}

/// Node id -> `[ux, uy]` for a global displacement vector.
pub fn node_displacements(mesh: &Mesh, u: &DVector<f64>) -> BTreeMap<i32, [f64; 2]> {
    mesh.sorted_node_ids()
        .into_iter()
        .filter_map(|id| {
            let [dx, dy] = mesh.node_dofs(id)?;
            Some((id, [*u.get(dx)?, *u.get(dy)?]))
        })
        .collect()
}

/// Rows `[x, y, ux, uy]` in ascending node-id order.
pub fn displacement_table(mesh: &Mesh, u: &DVector<f64>) -> Vec<[f64; 4]> {
    node_displacements(mesh, u)
        .into_iter()
        .filter_map(|(id, [ux, uy])| {
            let node = mesh.get_node(id)?;
            Some([node.x, node.y, ux, uy])
        })
        .collect()
}

/// Rows of `table` whose y rounds to `y` at `decimals` places, sorted by x.
pub fn results_at_fixed_y(table: &[[f64; 4]], y: f64, decimals: u32) -> Vec<[f64; 4]> {
    let scale = 10f64.powi(decimals as i32);
    let target = (y * scale).round();
    let mut rows: Vec<[f64; 4]> = table
        .iter()
        .filter(|row| (row[1] * scale).round() == target)
        .copied()
        .collect();
    rows.sort_by(|a, b| a[0].total_cmp(&b[0]));
    rows
}

/// Von Mises stress of each element from its averaged stress. Elements
/// missing from `stress_zz` are taken as σzz = 0.
pub fn element_von_mises(
    element_stress: &HashMap<i32, [f64; 3]>,
    stress_zz: &HashMap<i32, f64>,
) -> BTreeMap<i32, f64> {
    element_stress
        .iter()
        .map(|(&id, s)| {
            let szz = stress_zz.get(&id).copied().unwrap_or(0.0);
            (id, von_mises(&[s[0], s[1], szz, s[2]]))
        })
        .collect()
}

/// Min, max and mean of the values; `None` when empty.
pub fn field_statistics<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<FieldStatistics> {
    let mut count = 0usize;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &v in values {
        count += 1;
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    (count > 0).then(|| FieldStatistics {
        min,
        max,
        mean: sum / count as f64,
        count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Node;

    fn strip() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_node(Node::new(5, 2.0, 0.0));
        mesh.add_node(Node::new(1, 0.0, 0.0));
        mesh.add_node(Node::new(3, 1.0, 0.0));
        mesh.add_node(Node::new(2, 0.0, 1.0000001));
        mesh.calculate_dofs();
        mesh
    }

    #[test]
    fn table_follows_node_order() {
        let mesh = strip();
        let u = DVector::from_vec(vec![0.0, 0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        let table = displacement_table(&mesh, &u);

        assert_eq!(table.len(), 4);
        assert_eq!(table[0], [0.0, 0.0, 0.0, 0.0]);
        assert_eq!(table[1], [0.0, 1.0000001, 0.1, 0.2]);
        assert_eq!(table[3], [2.0, 0.0, 0.5, 0.6]);
        assert_eq!(node_displacements(&mesh, &u)[&3], [0.3, 0.4]);
    }

    #[test]
    fn fixed_y_rows_sorted_by_x() {
        let table = vec![
            [2.0, 0.0, 0.5, 0.0],
            [0.0, 0.0004, 0.0, 0.0],
            [1.0, 0.0, 0.3, 0.0],
            [0.0, 1.0, 0.1, 0.0],
        ];
        let rows = results_at_fixed_y(&table, 0.0, 3);
        let xs: Vec<f64> = rows.iter().map(|r| r[0]).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);

        assert_eq!(results_at_fixed_y(&table, 0.0, 4).len(), 2);
        assert_eq!(results_at_fixed_y(&table, 1.0, 0).len(), 1);
    }

    #[test]
    fn von_mises_of_uniaxial_and_shear_states() {
        let stress = HashMap::from([(1, [100.0, 0.0, 0.0]), (2, [0.0, 0.0, 10.0])]);
        let vm = element_von_mises(&stress, &HashMap::new());
        assert!((vm[&1] - 100.0).abs() < 1e-10);
        assert!((vm[&2] - 10.0 * 3f64.sqrt()).abs() < 1e-10);

        let szz = HashMap::from([(1, 100.0)]);
        let vm = element_von_mises(&stress, &szz);
        assert!((vm[&1] - 100.0).abs() < 1e-10);
    }

    #[test]
    fn statistics_of_field() {
        let stats = field_statistics(&[1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.count, 3);
        assert!(field_statistics(&[]).is_none());
    }
}
