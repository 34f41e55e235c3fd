//! Mesh data structures for plane finite element analysis.
//!
//! Nodes, elements and the node-to-dof numbering. Every node carries two
//! translational dof (ux, uy), numbered in ascending node-id order so node ids
//! need not be contiguous.

use std::collections::HashMap;

use crate::config::PlaneCondition;
use crate::error::{Result, SolverError};

/// Degrees of freedom per node
pub const DOFS_PER_NODE: usize = 2;

/// A node in the finite element mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node ID (from input, need not be contiguous)
    pub id: i32,
    pub x: f64,
    pub y: f64,
}

impl Node {
    pub fn new(id: i32, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }

    pub fn coords(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

/// Plane element type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// 3-node plane stress triangle
    CPS3,
    /// 4-node plane stress quadrilateral
    CPS4,
    /// 3-node plane strain triangle
    CPE3,
    /// 4-node plane strain quadrilateral
    CPE4,
}

impl ElementType {
    pub fn num_nodes(&self) -> usize {
        match self {
            ElementType::CPS3 | ElementType::CPE3 => 3,
            ElementType::CPS4 | ElementType::CPE4 => 4,
        }
    }

    pub fn num_dofs(&self) -> usize {
        self.num_nodes() * DOFS_PER_NODE
    }

    /// Plane condition implied by the type name
    pub fn plane_condition(&self) -> PlaneCondition {
        match self {
            ElementType::CPS3 | ElementType::CPS4 => PlaneCondition::Stress,
            ElementType::CPE3 | ElementType::CPE4 => PlaneCondition::Strain,
        }
    }

    /// Parse element type from a deck TYPE parameter
    pub fn from_deck_type(type_str: &str) -> Option<Self> {
        match type_str.to_ascii_uppercase().as_str() {
            "CPS3" => Some(ElementType::CPS3),
            "CPS4" | "CPS4R" => Some(ElementType::CPS4),
            "CPE3" => Some(ElementType::CPE3),
            "CPE4" | "CPE4R" => Some(ElementType::CPE4),
            _ => None,
        }
    }
}

/// An element in the finite element mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: i32,
    pub element_type: ElementType,
    /// Node connectivity, counter-clockwise
    pub nodes: Vec<i32>,
}

impl Element {
    pub fn new(id: i32, element_type: ElementType, nodes: Vec<i32>) -> Self {
        Self {
            id,
            element_type,
            nodes,
        }
    }

    /// Validate that the element has the correct number of nodes
    pub fn validate(&self) -> Result<()> {
        let expected = self.element_type.num_nodes();
        let actual = self.nodes.len();
        if actual != expected {
            return Err(SolverError::Mesh(format!(
                "Element {} of type {:?} has {} nodes but expected {}",
                self.id, self.element_type, actual, expected
            )));
        }
        Ok(())
    }
}

/// Complete finite element mesh
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub nodes: HashMap<i32, Node>,
    pub elements: HashMap<i32, Element>,
    /// Total number of degrees of freedom (set by `calculate_dofs`)
    pub num_dofs: usize,
    /// First global dof of each node
    dof_map: HashMap<i32, usize>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    pub fn add_element(&mut self, element: Element) -> Result<()> {
        element.validate()?;
        self.elements.insert(element.id, element);
        Ok(())
    }

    pub fn get_node(&self, id: i32) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_element(&self, id: i32) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Number nodes in ascending id order, two dof each.
    pub fn calculate_dofs(&mut self) {
        self.dof_map = self
            .sorted_node_ids()
            .into_iter()
            .enumerate()
            .map(|(index, id)| (id, index * DOFS_PER_NODE))
            .collect();
        self.num_dofs = self.nodes.len() * DOFS_PER_NODE;
    }

    /// Global dof `[ux, uy]` of a node.
    pub fn node_dofs(&self, node_id: i32) -> Option<[usize; 2]> {
        self.dof_map.get(&node_id).map(|&base| [base, base + 1])
    }

    /// Global dof of an element in local order `[u1x, u1y, u2x, u2y, ...]`.
    pub fn element_dofs(&self, element: &Element) -> Result<Vec<usize>> {
        let mut dofs = Vec::with_capacity(element.element_type.num_dofs());
        for &node_id in &element.nodes {
            let [ux, uy] = self.node_dofs(node_id).ok_or_else(|| {
                SolverError::Mesh(format!(
                    "Element {} references node {} without dof (call calculate_dofs after adding nodes)",
                    element.id, node_id
                ))
            })?;
            dofs.push(ux);
            dofs.push(uy);
        }
        Ok(dofs)
    }

    /// Nodal coordinates of an element, in connectivity order.
    pub fn element_coords(&self, element: &Element) -> Result<Vec<[f64; 2]>> {
        element
            .nodes
            .iter()
            .map(|id| {
                self.nodes.get(id).map(Node::coords).ok_or_else(|| {
                    SolverError::Mesh(format!(
                        "Element {} references non-existent node {}",
                        element.id, id
                    ))
                })
            })
            .collect()
    }

    /// Lowest-id element having `a`-`b` as one of its edges, in either direction.
    pub fn edge_owner(&self, a: i32, b: i32) -> Option<i32> {
        self.sorted_element_ids().into_iter().find(|id| {
            self.elements.get(id).is_some_and(|element| {
                let nodes = &element.nodes;
                (0..nodes.len()).any(|i| {
                    let (p, q) = (nodes[i], nodes[(i + 1) % nodes.len()]);
                    (p, q) == (a, b) || (p, q) == (b, a)
                })
            })
        })
    }

    pub fn sorted_node_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn sorted_element_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.elements.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Validate the mesh
    pub fn validate(&self) -> Result<()> {
        for (elem_id, element) in &self.elements {
            for &node_id in &element.nodes {
                if !self.nodes.contains_key(&node_id) {
                    return Err(SolverError::Mesh(format!(
                        "Element {} references non-existent node {}",
                        elem_id, node_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Plane condition shared by all element types, `None` for an empty mesh.
    pub fn plane_condition(&self) -> Result<Option<PlaneCondition>> {
        let mut found: Option<PlaneCondition> = None;
        for element in self.elements.values() {
            let condition = element.element_type.plane_condition();
            match found {
                None => found = Some(condition),
                Some(existing) if existing != condition => {
                    return Err(SolverError::Configuration(
                        "mesh mixes plane stress and plane strain elements".to_string(),
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(found)
    }

    pub fn statistics(&self) -> MeshStatistics {
        let mut element_type_counts = HashMap::new();
        for element in self.elements.values() {
            *element_type_counts.entry(element.element_type).or_insert(0) += 1;
        }

        MeshStatistics {
            num_nodes: self.nodes.len(),
            num_elements: self.elements.len(),
            num_dofs: self.num_dofs,
            element_type_counts,
        }
    }
}

/// Mesh statistics for reporting
#[derive(Debug, Clone)]
pub struct MeshStatistics {
    pub num_nodes: usize,
    pub num_elements: usize,
    pub num_dofs: usize,
    pub element_type_counts: HashMap<ElementType, usize>,
}

impl MeshStatistics {
    /// Format as a human-readable string
    pub fn format(&self) -> String {
        let mut lines = vec![
            format!("Nodes: {}", self.num_nodes),
            format!("Elements: {}", self.num_elements),
            format!("DOFs: {}", self.num_dofs),
        ];

        if !self.element_type_counts.is_empty() {
            lines.push("Element types:".to_string());
            let mut types: Vec<_> = self.element_type_counts.iter().collect();
            types.sort_by_key(|(k, _)| format!("{:?}", k));
            for (elem_type, count) in types {
                lines.push(format!("  {:?}: {}", elem_type, count));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_type_parsing() {
        assert_eq!(ElementType::from_deck_type("cps4"), Some(ElementType::CPS4));
        assert_eq!(ElementType::from_deck_type("CPE4R"), Some(ElementType::CPE4));
        assert_eq!(ElementType::from_deck_type("C3D8"), None);
        assert_eq!(ElementType::CPE3.plane_condition(), PlaneCondition::Strain);
        assert_eq!(ElementType::CPS4.num_dofs(), 8);
    }

    #[test]
    fn element_validation() {
        assert!(Element::new(1, ElementType::CPS4, vec![1, 2, 3, 4]).validate().is_ok());
        assert!(Element::new(2, ElementType::CPS4, vec![1, 2, 3]).validate().is_err());
    }

    #[test]
    fn edge_owner_matches_consecutive_nodes_only() {
        let mut mesh = Mesh::new();
        mesh.add_element(Element::new(1, ElementType::CPS3, vec![1, 2, 3])).unwrap();
        mesh.add_element(Element::new(2, ElementType::CPS3, vec![1, 3, 4])).unwrap();

        assert_eq!(mesh.edge_owner(2, 3), Some(1));
        assert_eq!(mesh.edge_owner(4, 3), Some(2));
        // Shared diagonal goes to the lower id, closing edge wraps around
        assert_eq!(mesh.edge_owner(3, 1), Some(1));
        assert_eq!(mesh.edge_owner(4, 1), Some(2));
        assert_eq!(mesh.edge_owner(2, 4), None);
    }

    #[test]
    fn dofs_follow_sorted_node_ids() {
        let mut mesh = Mesh::new();
        mesh.add_node(Node::new(30, 1.0, 1.0));
        mesh.add_node(Node::new(10, 0.0, 0.0));
        mesh.add_node(Node::new(20, 1.0, 0.0));
        mesh.calculate_dofs();

        assert_eq!(mesh.num_dofs, 6);
        assert_eq!(mesh.node_dofs(10), Some([0, 1]));
        assert_eq!(mesh.node_dofs(20), Some([2, 3]));
        assert_eq!(mesh.node_dofs(30), Some([4, 5]));
        assert_eq!(mesh.node_dofs(40), None);

        let tri = Element::new(1, ElementType::CPS3, vec![10, 20, 30]);
        assert_eq!(mesh.element_dofs(&tri).unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn mesh_validates_element_nodes() {
        let mut mesh = Mesh::new();
        mesh.add_node(Node::new(1, 0.0, 0.0));
        mesh.add_node(Node::new(2, 1.0, 0.0));
        mesh.add_element(Element::new(1, ElementType::CPS3, vec![1, 2, 3]))
            .unwrap();

        let err = mesh.validate().unwrap_err();
        assert!(err.to_string().contains("non-existent node 3"));
    }

    #[test]
    fn mixed_plane_conditions_are_rejected() {
        let mut mesh = Mesh::new();
        mesh.add_element(Element::new(1, ElementType::CPS3, vec![1, 2, 3]))
            .unwrap();
        assert_eq!(mesh.plane_condition().unwrap(), Some(PlaneCondition::Stress));
        mesh.add_element(Element::new(2, ElementType::CPE3, vec![1, 2, 3]))
            .unwrap();
        assert!(mesh.plane_condition().is_err());
    }

    #[test]
    fn mesh_statistics() {
        let mut mesh = Mesh::new();
        for (i, (x, y)) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)].iter().enumerate() {
            mesh.add_node(Node::new(i as i32 + 1, *x, *y));
        }
        mesh.add_element(Element::new(1, ElementType::CPE4, vec![1, 2, 3, 4]))
            .unwrap();
        mesh.calculate_dofs();

        let stats = mesh.statistics();
        assert_eq!(stats.num_nodes, 4);
        assert_eq!(stats.num_dofs, 8);
        assert_eq!(stats.element_type_counts.get(&ElementType::CPE4), Some(&1));
        assert!(stats.format().contains("CPE4: 1"));
    }
}
