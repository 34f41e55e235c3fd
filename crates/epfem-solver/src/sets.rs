//! Node sets and element sets for grouping entities.
//!
//! Set names are case-insensitive and stored upper-case. Sets can also be
//! declared inline through the `NSET=` / `ELSET=` parameters of `*NODE` and
//! `*ELEMENT` cards.

use std::collections::HashMap;

use epfem_inp::{Card, Deck, ParseError, parse_field};

/// A named set of nodes
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSet {
    pub name: String,
    pub nodes: Vec<i32>,
}

/// A named set of elements
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSet {
    pub name: String,
    pub elements: Vec<i32>,
}

/// Collection of all sets in the model
#[derive(Debug, Clone, Default)]
pub struct Sets {
    pub node_sets: HashMap<String, NodeSet>,
    pub element_sets: HashMap<String, ElementSet>,
}

impl Sets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add ids to a node set, creating it on first use.
    pub fn extend_node_set(&mut self, name: &str, ids: impl IntoIterator<Item = i32>) {
        let key = name.to_ascii_uppercase();
        self.node_sets
            .entry(key.clone())
            .or_insert_with(|| NodeSet {
                name: key,
                nodes: Vec::new(),
            })
            .nodes
            .extend(ids);
    }

    /// Add ids to an element set, creating it on first use.
    pub fn extend_element_set(&mut self, name: &str, ids: impl IntoIterator<Item = i32>) {
        let key = name.to_ascii_uppercase();
        self.element_sets
            .entry(key.clone())
            .or_insert_with(|| ElementSet {
                name: key,
                elements: Vec::new(),
            })
            .elements
            .extend(ids);
    }

    pub fn get_nodes(&self, set_name: &str) -> Option<&[i32]> {
        self.node_sets
            .get(&set_name.to_ascii_uppercase())
            .map(|s| s.nodes.as_slice())
    }

    pub fn get_elements(&self, set_name: &str) -> Option<&[i32]> {
        self.element_sets
            .get(&set_name.to_ascii_uppercase())
            .map(|s| s.elements.as_slice())
    }

    /// Build sets from a deck
    pub fn build_from_deck(deck: &Deck) -> Result<Self, ParseError> {
        let mut sets = Self::new();

        for card in &deck.cards {
            match card.keyword.as_str() {
                "NSET" => {
                    let name = card.required_parameter("NSET")?;
                    let ids = Self::parse_ids(card, "node id")?;
                    sets.extend_node_set(name, ids);
                }
                "ELSET" => {
                    let name = card.required_parameter("ELSET")?;
                    let ids = Self::parse_ids(card, "element id")?;
                    sets.extend_element_set(name, ids);
                }
                "NODE" => {
                    if let Some(name) = card.parameter("NSET") {
                        let ids = Self::first_column(card, "node id")?;
                        sets.extend_node_set(name, ids);
                    }
                }
                "ELEMENT" => {
                    if let Some(name) = card.parameter("ELSET") {
                        let ids = Self::first_column(card, "element id")?;
                        sets.extend_element_set(name, ids);
                    }
                }
                _ => {}
            }
        }

        Ok(sets)
    }

    /// Ids listed on a set card, expanding `GENERATE` ranges (`first, last, step`).
    fn parse_ids(card: &Card, what: &str) -> Result<Vec<i32>, ParseError> {
        let mut ids = Vec::new();

        if card.has_parameter("GENERATE") {
            for fields in card.data_fields() {
                if fields.len() < 2 {
                    return Err(ParseError::new(
                        card.line_start,
                        format!("*{} GENERATE needs first and last id", card.keyword),
                    ));
                }
                let first: i32 = parse_field(card, fields[0], what)?;
                let last: i32 = parse_field(card, fields[1], what)?;
                let step: i32 = match fields.get(2) {
                    Some(f) if !f.is_empty() => parse_field(card, f, "increment")?,
                    _ => 1,
                };
                if step <= 0 {
                    return Err(ParseError::new(
                        card.line_start,
                        format!("*{} GENERATE increment must be positive", card.keyword),
                    ));
                }
                ids.extend((first..=last).step_by(step as usize));
            }
            return Ok(ids);
        }

        for fields in card.data_fields() {
            for field in fields.into_iter().filter(|f| !f.is_empty()) {
                ids.push(parse_field(card, field, what)?);
            }
        }
        Ok(ids)
    }

    fn first_column(card: &Card, what: &str) -> Result<Vec<i32>, ParseError> {
        card.data_fields()
            .into_iter()
            .filter_map(|fields| fields.first().copied())
            .map(|field| parse_field(card, field, what))
            .collect()
    }
}
