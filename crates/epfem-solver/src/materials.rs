//! Material properties for elastoplastic analysis.
//!
//! A material is a von Mises solid with linear isotropic hardening. Elements
//! reach their material through a section assignment (the surface tag), which
//! may also carry an out-of-plane thickness.

use std::collections::HashMap;

use epfem_inp::{Card, Deck, ParseError, parse_field};

use crate::error::{Result, SolverError};
use crate::sets::Sets;

/// A material definition as read from input; any property may still be missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Material {
    pub name: String,
    /// Young's modulus (E)
    pub elastic_modulus: Option<f64>,
    /// Poisson's ratio (ν)
    pub poissons_ratio: Option<f64>,
    /// Linear isotropic hardening modulus (H)
    pub hardening_modulus: Option<f64>,
    /// Initial yield stress (σ_y0)
    pub yield_stress: Option<f64>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            ..Default::default()
        }
    }

    /// Fully specified elastoplastic material.
    pub fn elastoplastic(name: impl Into<String>, e: f64, nu: f64, h: f64, sigma_y0: f64) -> Self {
        Self {
            elastic_modulus: Some(e),
            poissons_ratio: Some(nu),
            hardening_modulus: Some(h),
            yield_stress: Some(sigma_y0),
            ..Self::new(name)
        }
    }

    /// Check if all four constants are present
    pub fn is_complete(&self) -> bool {
        self.elastic_modulus.is_some()
            && self.poissons_ratio.is_some()
            && self.hardening_modulus.is_some()
            && self.yield_stress.is_some()
    }

    /// Resolve the constants for use by `element`, failing on the first missing one.
    pub fn constants(&self, element: i32) -> Result<MaterialConstants> {
        let require = |value: Option<f64>, property: &'static str| {
            value.ok_or_else(|| SolverError::MissingMaterialProperty {
                material: self.name.clone(),
                element,
                property,
            })
        };

        let constants = MaterialConstants {
            e: require(self.elastic_modulus, "E")?,
            nu: require(self.poissons_ratio, "nu")?,
            h: require(self.hardening_modulus, "H")?,
            sigma_y0: require(self.yield_stress, "sigma_y0")?,
        };
        constants.validate(&self.name)?;
        Ok(constants)
    }
}

/// Validated material constants, constant for the whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialConstants {
    pub e: f64,
    pub nu: f64,
    pub h: f64,
    pub sigma_y0: f64,
}

impl MaterialConstants {
    pub fn new(e: f64, nu: f64, h: f64, sigma_y0: f64) -> Self {
        Self { e, nu, h, sigma_y0 }
    }

    /// G = E / (2(1 + ν))
    pub fn shear_modulus(&self) -> f64 {
        self.e / (2.0 * (1.0 + self.nu))
    }

    /// K = E / (3(1 - 2ν))
    pub fn bulk_modulus(&self) -> f64 {
        self.e / (3.0 * (1.0 - 2.0 * self.nu))
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        let invalid = |what: String| {
            Err(SolverError::Configuration(format!(
                "material '{name}': {what}"
            )))
        };
        if !self.e.is_finite() || self.e <= 0.0 {
            return invalid(format!("Young's modulus must be positive, got {}", self.e));
        }
        if !(self.nu > -1.0 && self.nu < 0.5) {
            return invalid(format!(
                "Poisson's ratio must lie in (-1, 0.5), got {}",
                self.nu
            ));
        }
        if !self.sigma_y0.is_finite() || self.sigma_y0 <= 0.0 {
            return invalid(format!(
                "yield stress must be positive, got {}",
                self.sigma_y0
            ));
        }
        if !self.h.is_finite() || 3.0 * self.shear_modulus() + self.h <= 0.0 {
            return invalid(format!(
                "hardening modulus {} gives 3G + H <= 0",
                self.h
            ));
        }
        Ok(())
    }
}

/// Material library containing all materials and their assignments
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: HashMap<String, Material>,
    /// element_id -> material name
    element_materials: HashMap<i32, String>,
    /// element_id -> section thickness, where a section gives one
    element_thickness: HashMap<i32, f64>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    pub fn get_material(&self, name: &str) -> Option<&Material> {
        self.materials.get(&name.to_ascii_uppercase())
    }

    pub fn material_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.materials.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn assign_material(&mut self, element_id: i32, material_name: &str) {
        self.element_materials
            .insert(element_id, material_name.to_ascii_uppercase());
    }

    pub fn assign_thickness(&mut self, element_id: i32, thickness: f64) {
        self.element_thickness.insert(element_id, thickness);
    }

    pub fn get_element_material(&self, element_id: i32) -> Option<&Material> {
        self.element_materials
            .get(&element_id)
            .and_then(|name| self.materials.get(name))
    }

    pub fn element_thickness(&self, element_id: i32) -> Option<f64> {
        self.element_thickness.get(&element_id).copied()
    }

    /// Validated constants for an element.
    pub fn element_constants(&self, element_id: i32) -> Result<MaterialConstants> {
        let name = self.element_materials.get(&element_id).ok_or_else(|| {
            SolverError::Configuration(format!(
                "element {element_id} has no material assignment"
            ))
        })?;
        let material = self.materials.get(name).ok_or_else(|| {
            SolverError::Configuration(format!(
                "element {element_id} is assigned undefined material '{name}'"
            ))
        })?;
        material.constants(element_id)
    }

    /// Build material library from a deck.
    ///
    /// `*PLASTIC` rows are `(yield stress, plastic strain)`. The first row gives
    /// σ_y0 and the slope to the second row gives H; further rows are ignored
    /// since hardening is linear.
    pub fn build_from_deck(deck: &Deck, sets: &Sets) -> Result<Self> {
        let mut library = Self::new();
        let mut current_material: Option<String> = None;

        for card in &deck.cards {
            match card.keyword.as_str() {
                "MATERIAL" => {
                    let material = Material::new(card.required_parameter("NAME")?);
                    current_material = Some(material.name.clone());
                    library.add_material(material);
                }
                "ELASTIC" => {
                    if let Some(material) = library.current(&current_material) {
                        Self::parse_elastic(card, material)?;
                    }
                }
                "PLASTIC" => {
                    if let Some(material) = library.current(&current_material) {
                        Self::parse_plastic(card, material)?;
                    }
                }
                "SOLID SECTION" => {
                    current_material = None;
                    library.parse_section(card, sets)?;
                }
                // Any other keyword closes the material block
                _ => current_material = None,
            }
        }

        Ok(library)
    }

    fn current(&mut self, name: &Option<String>) -> Option<&mut Material> {
        name.as_ref().and_then(|n| self.materials.get_mut(n))
    }

    fn first_row<'a>(card: &'a Card) -> std::result::Result<Vec<&'a str>, ParseError> {
        card.data_fields().into_iter().next().ok_or_else(|| {
            ParseError::new(card.line_start, format!("*{} card has no data lines", card.keyword))
        })
    }

    fn parse_elastic(card: &Card, material: &mut Material) -> Result<()> {
        let fields = Self::first_row(card)?;
        if fields.len() < 2 {
            return Err(ParseError::new(
                card.line_start,
                "*ELASTIC data line needs E and nu",
            )
            .into());
        }
        material.elastic_modulus = Some(parse_field(card, fields[0], "elastic modulus")?);
        material.poissons_ratio = Some(parse_field(card, fields[1], "Poisson's ratio")?);
        Ok(())
    }

    fn parse_plastic(card: &Card, material: &mut Material) -> Result<()> {
        let mut rows = Vec::new();
        for fields in card.data_fields().into_iter().take(2) {
            let stress: f64 =
                parse_field(card, fields.first().copied().unwrap_or_default(), "yield stress")?;
            let strain: f64 = match fields.get(1) {
                Some(f) if !f.is_empty() => parse_field(card, f, "plastic strain")?,
                _ => 0.0,
            };
            rows.push((stress, strain));
        }

        let Some(&(sigma_y0, strain0)) = rows.first() else {
            return Err(ParseError::new(card.line_start, "*PLASTIC card has no data lines").into());
        };
        let hardening = match rows.get(1) {
            Some(&(stress1, strain1)) => {
                if strain1 <= strain0 {
                    return Err(ParseError::new(
                        card.line_start,
                        "*PLASTIC plastic strains must increase",
                    )
                    .into());
                }
                (stress1 - sigma_y0) / (strain1 - strain0)
            }
            None => 0.0,
        };

        material.yield_stress = Some(sigma_y0);
        material.hardening_modulus = Some(hardening);
        Ok(())
    }

    /// `*SOLID SECTION, ELSET=..., MATERIAL=...` with an optional thickness line.
    fn parse_section(&mut self, card: &Card, sets: &Sets) -> Result<()> {
        let elset = card.required_parameter("ELSET")?;
        let material = card.required_parameter("MATERIAL")?;
        let elements = sets.get_elements(elset).ok_or_else(|| {
            ParseError::new(
                card.line_start,
                format!("*SOLID SECTION references undefined element set '{elset}'"),
            )
        })?;

        let thickness: Option<f64> = match card.data_fields().first().and_then(|f| f.first()) {
            Some(field) if !field.is_empty() => Some(parse_field(card, field, "thickness")?),
            _ => None,
        };
        if let Some(t) = thickness
            && !(t > 0.0)
        {
            return Err(ParseError::new(
                card.line_start,
                format!("*SOLID SECTION thickness must be positive, got {t}"),
            )
            .into());
        }

        for &element in elements {
            self.assign_material(element, material);
            if let Some(t) = thickness {
                self.assign_thickness(element, t);
            }
        }
        Ok(())
    }

    pub fn statistics(&self) -> MaterialStatistics {
        MaterialStatistics {
            num_materials: self.materials.len(),
            num_complete: self.materials.values().filter(|m| m.is_complete()).count(),
            num_element_assignments: self.element_materials.len(),
        }
    }
}

/// Material library statistics
#[derive(Debug, Clone)]
pub struct MaterialStatistics {
    pub num_materials: usize,
    /// Materials with all four constants
    pub num_complete: usize,
    pub num_element_assignments: usize,
}
