//! Mesh builder for constructing plane meshes from input decks.
//!
//! Extracts `*NODE` and `*ELEMENT` data and numbers the dof. A third node
//! coordinate is accepted and ignored. Element connectivity may continue on
//! the following data line.

use epfem_inp::{Card, Deck};

use crate::error::{Result, SolverError};
use crate::mesh::{Element, ElementType, Mesh, Node};

/// Builds a mesh from a parsed input deck
pub struct MeshBuilder {
    mesh: Mesh,
    errors: Vec<String>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self {
            mesh: Mesh::new(),
            errors: Vec::new(),
        }
    }

    /// Build a mesh from the given deck
    pub fn build_from_deck(deck: &Deck) -> Result<Mesh> {
        let mut builder = Self::new();
        builder.process_deck(deck)?;
        Ok(builder.mesh)
    }

    fn process_deck(&mut self, deck: &Deck) -> Result<()> {
        for card in &deck.cards {
            match card.keyword.as_str() {
                "NODE" => self.process_node_card(card),
                "ELEMENT" => self.process_element_card(card)?,
                _ => {}
            }
        }

        if !self.errors.is_empty() {
            return Err(SolverError::Mesh(format!(
                "mesh building encountered {} errors:\n{}",
                self.errors.len(),
                self.errors.join("\n")
            )));
        }

        self.mesh.validate()?;
        self.mesh.calculate_dofs();
        Ok(())
    }

    /// `id, x, y[, z]`
    fn process_node_card(&mut self, card: &Card) {
        for (offset, fields) in card.data_fields().into_iter().enumerate() {
            if fields.len() < 3 {
                self.errors.push(format!(
                    "*NODE (line {}) data line {}: expected id, x, y but got '{}'",
                    card.line_start,
                    offset + 1,
                    fields.join(", ")
                ));
                continue;
            }

            let Ok(id) = fields[0].parse::<i32>() else {
                self.errors.push(format!("Invalid node ID: {}", fields[0]));
                continue;
            };
            let (Ok(x), Ok(y)) = (fields[1].parse::<f64>(), fields[2].parse::<f64>()) else {
                self.errors.push(format!(
                    "Invalid coordinates for node {}: {}, {}",
                    id, fields[1], fields[2]
                ));
                continue;
            };

            if self.mesh.get_node(id).is_some() {
                eprintln!("warning: node {} defined twice, keeping the last definition", id);
            }
            self.mesh.add_node(Node::new(id, x, y));
        }
    }

    fn process_element_card(&mut self, card: &Card) -> Result<()> {
        let type_value = card.required_parameter("TYPE")?;
        let element_type = ElementType::from_deck_type(type_value).ok_or_else(|| {
            SolverError::Mesh(format!(
                "Unknown element type: {} (supported: CPS3, CPS4, CPE3, CPE4)",
                type_value
            ))
        })?;
        let expected_nodes = element_type.num_nodes();

        // Accumulate connectivity across continuation lines
        let mut current: Option<(i32, Vec<i32>)> = None;

        for fields in card.data_fields() {
            let fields: Vec<&str> = fields.into_iter().filter(|f| !f.is_empty()).collect();
            if fields.is_empty() {
                continue;
            }

            let mut node_fields = &fields[..];
            if current.is_none() {
                let Ok(id) = fields[0].parse::<i32>() else {
                    self.errors.push(format!("Invalid element ID: {}", fields[0]));
                    continue;
                };
                current = Some((id, Vec::with_capacity(expected_nodes)));
                node_fields = &fields[1..];
            }

            let Some((id, nodes)) = current.as_mut() else {
                continue;
            };
            for field in node_fields {
                match field.parse::<i32>() {
                    Ok(node) => nodes.push(node),
                    Err(_) => self
                        .errors
                        .push(format!("Invalid node ID in element {}: {}", id, field)),
                }
            }

            if nodes.len() >= expected_nodes
                && let Some((id, nodes)) = current.take()
            {
                self.finish_element(id, element_type, nodes);
            }
        }

        if let Some((id, nodes)) = current {
            self.finish_element(id, element_type, nodes);
        }
        Ok(())
    }

    fn finish_element(&mut self, id: i32, element_type: ElementType, nodes: Vec<i32>) {
        if self.mesh.get_element(id).is_some() {
            eprintln!("warning: element {} defined twice, keeping the last definition", id);
        }
        if let Err(err) = self.mesh.add_element(Element::new(id, element_type, nodes)) {
            self.errors.push(err.to_string());
        }
    }
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}
