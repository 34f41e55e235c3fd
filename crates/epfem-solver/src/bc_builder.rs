//! Builder for extracting boundary conditions, loads and the load program
//! from input decks.
//!
//! - `*BOUNDARY`: `node or nset, first dof[, last dof[, value]]`
//! - `*CLOAD`: `node or nset, dof, magnitude`
//! - `*DLOAD`: `element or elset, Pn, pressure`
//! - `*STATIC`: `initial increment, total time`
//!
//! Dof 3 and above have no in-plane meaning and are ignored.

use epfem_inp::{Card, Deck, parse_field};

use crate::boundary_conditions::{
    BcLocation, BoundaryConditions, ConcentratedLoad, Direction, DisplacementBC, EdgeLoad,
};
use crate::error::{Result, SolverError};
use crate::mesh::Mesh;
use crate::sets::Sets;

/// Builds boundary conditions from a parsed input deck
pub struct BCBuilder<'a> {
    bcs: BoundaryConditions,
    sets: &'a Sets,
    mesh: &'a Mesh,
    errors: Vec<String>,
}

impl<'a> BCBuilder<'a> {
    pub fn new(sets: &'a Sets, mesh: &'a Mesh) -> Self {
        Self {
            bcs: BoundaryConditions::new(),
            sets,
            mesh,
            errors: Vec::new(),
        }
    }

    /// Build boundary conditions from the given deck
    pub fn build_from_deck(deck: &Deck, sets: &'a Sets, mesh: &'a Mesh) -> Result<BoundaryConditions> {
        let mut builder = Self::new(sets, mesh);
        builder.process_deck(deck)?;
        Ok(builder.bcs)
    }

    fn process_deck(&mut self, deck: &Deck) -> Result<()> {
        for card in &deck.cards {
            match card.keyword.as_str() {
                "BOUNDARY" => self.process_boundary_card(card)?,
                "CLOAD" => self.process_cload_card(card)?,
                "DLOAD" => self.process_dload_card(card)?,
                _ => {}
            }
        }

        if !self.errors.is_empty() {
            return Err(SolverError::Configuration(format!(
                "BC building encountered {} errors:\n{}",
                self.errors.len(),
                self.errors.join("\n")
            )));
        }
        Ok(())
    }

    /// A node id or the members of a node set.
    fn resolve_nodes(&mut self, field: &str, keyword: &str) -> Option<Vec<i32>> {
        if let Ok(id) = field.parse::<i32>() {
            return Some(vec![id]);
        }
        match self.sets.get_nodes(field) {
            Some(nodes) => Some(nodes.to_vec()),
            None => {
                self.errors
                    .push(format!("Unknown node or node set in {}: {}", keyword, field));
                None
            }
        }
    }

    fn resolve_elements(&mut self, field: &str, keyword: &str) -> Option<Vec<i32>> {
        if let Ok(id) = field.parse::<i32>() {
            return Some(vec![id]);
        }
        match self.sets.get_elements(field) {
            Some(elements) => Some(elements.to_vec()),
            None => {
                self.errors
                    .push(format!("Unknown element or element set in {}: {}", keyword, field));
                None
            }
        }
    }

    fn process_boundary_card(&mut self, card: &Card) -> Result<()> {
        for fields in card.data_fields() {
            if fields.len() < 2 {
                self.errors.push(format!(
                    "Invalid BOUNDARY line (expected at least 2 fields): {}",
                    fields.join(", ")
                ));
                continue;
            }

            let Some(nodes) = self.resolve_nodes(fields[0], "BOUNDARY") else {
                continue;
            };
            let first_dof: usize = parse_field(card, fields[1], "first dof")?;
            let last_dof: usize = match fields.get(2) {
                Some(f) if !f.is_empty() => parse_field(card, f, "last dof")?,
                _ => first_dof,
            };
            let value: f64 = match fields.get(3) {
                Some(f) if !f.is_empty() => parse_field(card, f, "prescribed value")?,
                _ => 0.0,
            };

            let mut ux = None;
            let mut uy = None;
            for dof in first_dof..=last_dof {
                match Direction::from_deck_dof(dof) {
                    Some(Direction::X) => ux = Some(value),
                    Some(Direction::Y) => uy = Some(value),
                    None => {}
                }
            }
            if ux.is_none() && uy.is_none() {
                continue;
            }

            for node in nodes {
                self.bcs
                    .add_displacement_bc(DisplacementBC::new(BcLocation::Node(node), ux, uy));
            }
        }
        Ok(())
    }

    fn process_cload_card(&mut self, card: &Card) -> Result<()> {
        for fields in card.data_fields() {
            if fields.len() < 3 {
                self.errors.push(format!(
                    "Invalid CLOAD line (expected at least 3 fields): {}",
                    fields.join(", ")
                ));
                continue;
            }

            let Some(nodes) = self.resolve_nodes(fields[0], "CLOAD") else {
                continue;
            };
            let dof: usize = parse_field(card, fields[1], "dof")?;
            let magnitude: f64 = parse_field(card, fields[2], "magnitude")?;
            let Some(direction) = Direction::from_deck_dof(dof) else {
                continue;
            };

            for node in nodes {
                self.bcs
                    .add_concentrated_load(ConcentratedLoad::new(node, direction, magnitude));
            }
        }
        Ok(())
    }

    /// Edge pressure `Pn` on face `n` of the element. Faces follow the
    /// connectivity: quads 1-2, 2-3, 3-4, 4-1; triangles 1-2, 2-3, 3-1.
    fn process_dload_card(&mut self, card: &Card) -> Result<()> {
        for fields in card.data_fields() {
            if fields.len() < 3 {
                self.errors.push(format!(
                    "Invalid DLOAD line (expected at least 3 fields): {}",
                    fields.join(", ")
                ));
                continue;
            }

            let Some(elements) = self.resolve_elements(fields[0], "DLOAD") else {
                continue;
            };
            let label = fields[1].to_ascii_uppercase();
            let Some(face) = label
                .strip_prefix('P')
                .and_then(|n| n.parse::<usize>().ok())
            else {
                self.errors.push(format!(
                    "Unsupported DLOAD label {} (only edge pressure Pn)",
                    fields[1]
                ));
                continue;
            };
            let pressure: f64 = parse_field(card, fields[2], "pressure")?;

            for id in elements {
                let Some(element) = self.mesh.get_element(id) else {
                    self.errors
                        .push(format!("DLOAD references non-existent element {}", id));
                    continue;
                };
                let n = element.nodes.len();
                if face == 0 || face > n {
                    self.errors.push(format!(
                        "DLOAD face P{} does not exist on element {} with {} nodes",
                        face, id, n
                    ));
                    continue;
                }
                let edge = [element.nodes[face - 1], element.nodes[face % n]];
                self.bcs.add_edge_load(EdgeLoad::pressure(id, edge, pressure));
            }
        }
        Ok(())
    }
}

/// Load program from the first `*STATIC` card: `[0, dt/T, 2 dt/T, ..., 1]`.
///
/// Returns `None` when the deck has no `*STATIC` data line. A total time that
/// is not a multiple of the increment ends with a shorter last step.
pub fn load_program_from_deck(deck: &Deck) -> Result<Option<Vec<f64>>> {
    let mut cards = deck.cards_named("STATIC");
    let Some(card) = cards.next() else {
        return Ok(None);
    };
    if cards.next().is_some() {
        eprintln!("warning: several *STATIC steps found, only the first defines the load program");
    }

    let Some(fields) = card.data_fields().into_iter().next() else {
        return Ok(None);
    };
    let initial: f64 = match fields.first() {
        Some(f) if !f.is_empty() => parse_field(card, f, "initial increment")?,
        _ => return Ok(None),
    };
    let total: f64 = match fields.get(1) {
        Some(f) if !f.is_empty() => parse_field(card, f, "total time")?,
        _ => 1.0,
    };

    if !(initial > 0.0) || !(total > 0.0) || !initial.is_finite() || !total.is_finite() {
        return Err(SolverError::Configuration(format!(
            "*STATIC increment {} and total time {} must be positive",
            initial, total
        )));
    }

    let steps = ((total / initial) - 1e-9).ceil().max(1.0) as usize;
    let mut program: Vec<f64> = (0..steps).map(|i| i as f64 * initial / total).collect();
    program.push(1.0);
    Ok(Some(program))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_builder::MeshBuilder;

    const MESH: &str = r#"
*NODE, NSET=NALL
1, 0.0, 0.0
2, 2.0, 0.0
3, 2.0, 1.0
4, 0.0, 1.0
*NSET, NSET=LEFT
1, 4
*ELEMENT, TYPE=CPS4, ELSET=PLATE
1, 1, 2, 3, 4
"#;

    fn build(extra: &str) -> Result<BoundaryConditions> {
        let deck = Deck::parse_str(&format!("{MESH}{extra}")).unwrap();
        let sets = Sets::build_from_deck(&deck).unwrap();
        let mesh = MeshBuilder::build_from_deck(&deck).unwrap();
        BCBuilder::build_from_deck(&deck, &sets, &mesh)
    }

    #[test]
    fn boundary_dof_ranges_map_to_directions() {
        let bcs = build("*BOUNDARY\nLEFT, 1\n1, 1, 3\n2, 2, 2, 0.05\n4, 3, 6\n").unwrap();

        // LEFT expands to two entries, node 4 dof 3-6 is ignored
        assert_eq!(bcs.displacement_bcs.len(), 4);
        assert_eq!(
            bcs.displacement_bcs[0],
            DisplacementBC::new(BcLocation::Node(1), Some(0.0), None)
        );
        assert_eq!(bcs.displacement_bcs[2], DisplacementBC::fixed(BcLocation::Node(1)));
        assert_eq!(
            bcs.displacement_bcs[3],
            DisplacementBC::new(BcLocation::Node(2), None, Some(0.05))
        );
    }

    #[test]
    fn cload_resolves_sets() {
        let bcs = build("*CLOAD\nLEFT, 2, -1.5\n3, 1, 10.0\n3, 3, 1.0\n").unwrap();
        assert_eq!(bcs.concentrated_loads.len(), 3);
        assert_eq!(bcs.concentrated_loads[2], ConcentratedLoad::new(3, Direction::X, 10.0));
    }

    #[test]
    fn dload_picks_element_edges() {
        let bcs = build("*DLOAD\nPLATE, P2, 4.0\n1, P4, 1.0\n").unwrap();
        assert_eq!(bcs.edge_loads[0], EdgeLoad::pressure(1, [2, 3], 4.0));
        assert_eq!(bcs.edge_loads[1], EdgeLoad::pressure(1, [4, 1], 1.0));

        assert!(build("*DLOAD\n1, P5, 1.0\n").is_err());
        assert!(build("*DLOAD\n1, BX, 1.0\n").is_err());
    }

    #[test]
    fn unknown_sets_are_reported() {
        let err = build("*BOUNDARY\nRIGHT, 1, 2\n").unwrap_err();
        assert!(err.to_string().contains("Unknown node or node set in BOUNDARY: RIGHT"));
    }

    #[test]
    fn static_card_defines_load_program() {
        let deck = Deck::parse_str("*STEP\n*STATIC\n0.25, 1.0\n*END STEP\n").unwrap();
        assert_eq!(
            load_program_from_deck(&deck).unwrap(),
            Some(vec![0.0, 0.25, 0.5, 0.75, 1.0])
        );

        let uneven = Deck::parse_str("*STATIC\n0.4, 1.0\n").unwrap();
        let program = load_program_from_deck(&uneven).unwrap().unwrap();
        assert_eq!(program.len(), 4);
        assert!((program[2] - 0.8).abs() < 1e-12);
        assert_eq!(program[3], 1.0);

        let none = Deck::parse_str("*STEP\n*STATIC\n").unwrap();
        assert_eq!(load_program_from_deck(&none).unwrap(), None);

        let bad = Deck::parse_str("*STATIC\n-0.1, 1.0\n").unwrap();
        assert!(load_program_from_deck(&bad).is_err());
    }
}
