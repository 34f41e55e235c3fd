//! Keyword input deck parser for plane elastoplastic models.
//!
//! The deck format is the familiar `*KEYWORD, PARAM=VALUE` layout: a card
//! header line starting with `*`, followed by comma separated data lines.
//! Lines starting with `**` are comments. A header may continue on following
//! lines that start with a comma.

use std::fs;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub keyword: String,
    pub parameters: Vec<Parameter>,
    pub data_lines: Vec<String>,
    pub line_start: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl Deck {
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| ParseError::new(0, format!("failed to read {}: {e}", path.display())))?;
        Self::parse_str(&raw)
    }

    pub fn parse_str(raw: &str) -> Result<Self, ParseError> {
        let lines: Vec<&str> = raw.lines().collect();
        let mut cards = Vec::new();
        let mut i = 0usize;

        while i < lines.len() {
            let trimmed = lines[i].trim();

            if trimmed.is_empty() || is_comment(trimmed) {
                i += 1;
                continue;
            }

            if !trimmed.starts_with('*') {
                return Err(ParseError::new(i + 1, "expected card starting with '*'"));
            }

            let line_start = i + 1;
            let mut header = trimmed.trim_start_matches('*').trim().to_string();
            i += 1;

            while i < lines.len() {
                let next = lines[i].trim();
                if next.starts_with(',') {
                    header.push_str(next);
                    i += 1;
                    continue;
                }
                break;
            }

            let (keyword, parameters) = parse_header(&header, line_start)?;

            let mut data_lines = Vec::new();
            while i < lines.len() {
                let candidate = lines[i].trim();
                if candidate.is_empty() || is_comment(candidate) {
                    i += 1;
                    continue;
                }
                if candidate.starts_with('*') {
                    break;
                }
                data_lines.push(candidate.to_string());
                i += 1;
            }

            cards.push(Card {
                keyword,
                parameters,
                data_lines,
                line_start,
            });
        }

        Ok(Deck { cards })
    }

    /// All cards with the given keyword, in deck order.
    pub fn cards_named<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Card> + 'a {
        self.cards
            .iter()
            .filter(move |card| card.keyword.eq_ignore_ascii_case(keyword))
    }

    pub fn has_card(&self, keyword: &str) -> bool {
        self.cards_named(keyword).next().is_some()
    }
}

impl Card {
    /// Value of a `KEY=VALUE` header parameter, matched case-insensitively.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(key))
            .and_then(|p| p.value.as_deref())
    }

    /// Whether a flag parameter (with or without value) is present.
    pub fn has_parameter(&self, key: &str) -> bool {
        self.parameters.iter().any(|p| p.key.eq_ignore_ascii_case(key))
    }

    /// Like [`Card::parameter`] but a missing parameter is a parse error.
    pub fn required_parameter(&self, key: &str) -> Result<&str, ParseError> {
        self.parameter(key).ok_or_else(|| {
            ParseError::new(
                self.line_start,
                format!("*{} card missing {} parameter", self.keyword, key),
            )
        })
    }

    /// Data lines split into trimmed fields. Trailing empty fields are dropped.
    pub fn data_fields(&self) -> Vec<Vec<&str>> {
        self.data_lines
            .iter()
            .map(|line| {
                let mut fields: Vec<&str> = line.split(',').map(str::trim).collect();
                while fields.last().is_some_and(|f| f.is_empty()) {
                    fields.pop();
                }
                fields
            })
            .collect()
    }
}

/// Parse one numeric data field, attributing failures to the card.
pub fn parse_field<T: std::str::FromStr>(card: &Card, field: &str, what: &str) -> Result<T, ParseError> {
    field.trim().parse::<T>().map_err(|_| {
        ParseError::new(
            card.line_start,
            format!("*{}: invalid {what} '{}'", card.keyword, field.trim()),
        )
    })
}

fn is_comment(line: &str) -> bool {
    line.starts_with("**")
}

fn parse_header(header: &str, line: usize) -> Result<(String, Vec<Parameter>), ParseError> {
    let mut parts = header.split(',');
    let keyword_raw = parts.next().unwrap_or_default().trim();
    if keyword_raw.is_empty() {
        return Err(ParseError::new(line, "empty card keyword"));
    }
    let keyword = keyword_raw.to_ascii_uppercase();
    let mut parameters = Vec::new();

    for part in parts {
        let item = part.trim();
        if item.is_empty() {
            continue;
        }
        match item.split_once('=') {
            Some((k, v)) => parameters.push(Parameter {
                key: k.trim().to_ascii_uppercase(),
                value: Some(v.trim().to_string()),
            }),
            None => parameters.push(Parameter {
                key: item.to_ascii_uppercase(),
                value: None,
            }),
        }
    }

    Ok((keyword, parameters))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plane_model_cards() {
        let src = r#"
** unit square, one bilinear quad
*NODE, NSET=NALL
1, 0.0, 0.0
2, 1.0, 0.0
3, 1.0, 1.0
4, 0.0, 1.0
*ELEMENT, TYPE=CPS4, ELSET=PLATE
1, 1, 2, 3, 4
*MATERIAL, NAME=STEEL
*ELASTIC
210000, 0.3
"#;

        let deck = Deck::parse_str(src).expect("parser should succeed");
        assert_eq!(deck.cards.len(), 4);
        assert_eq!(deck.cards[0].keyword, "NODE");
        assert_eq!(deck.cards[0].data_lines.len(), 4);
        assert_eq!(deck.cards[1].parameter("type"), Some("CPS4"));
        assert_eq!(deck.cards[1].parameter("ELSET"), Some("PLATE"));
        assert_eq!(deck.cards_named("elastic").count(), 1);
    }

    #[test]
    fn parses_header_continuation() {
        let src = r#"
*ELSET, ELSET=BODY
, GENERATE
1, 10, 1
"#;

        let deck = Deck::parse_str(src).expect("parser should succeed");
        assert_eq!(deck.cards.len(), 1);
        assert!(deck.cards[0].has_parameter("generate"));
        assert_eq!(deck.cards[0].parameter("GENERATE"), None);
    }

    #[test]
    fn data_fields_drop_trailing_commas() {
        let deck = Deck::parse_str("*BOUNDARY\n1, 1, 2,\n").expect("parse");
        let fields = deck.cards[0].data_fields();
        assert_eq!(fields, vec![vec!["1", "1", "2"]]);
    }

    #[test]
    fn missing_parameter_reports_card_line() {
        let deck = Deck::parse_str("\n\n*MATERIAL\n").expect("parse");
        let err = deck.cards[0]
            .required_parameter("NAME")
            .expect_err("NAME is missing");
        assert_eq!(err.line, 3);
        assert!(err.message.contains("NAME"));
    }

    #[test]
    fn field_parse_errors_name_the_value() {
        let deck = Deck::parse_str("*ELASTIC\nabc, 0.3\n").expect("parse");
        let card = &deck.cards[0];
        let err = parse_field::<f64>(card, "abc", "Young's modulus").expect_err("not a number");
        assert!(err.message.contains("abc"));
    }

    #[test]
    fn fails_on_orphan_data_before_first_card() {
        let src = "1,2,3\n*NODE\n1,0,0\n";
        let err = Deck::parse_str(src).expect_err("should fail");
        assert_eq!(err.line, 1);
    }
}
