//! Per-increment result reporting.
//!
//! After every converged load increment the driver hands an
//! [`IncrementReport`] to a [`ResultSink`]. Sinks may keep the reports in
//! memory, drop them, or write them to disk as VTK frames.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use epfem_io::{CellField, Frame, PointField, VtkWriter};

use crate::error::{Result, SolverError};
use crate::mesh::Mesh;

/// Field names used by the driver
pub const PLASTIC_STRAIN_FIELD: &str = "plastic_strain";
pub const STRESS_XX_FIELD: &str = "stress_xx";

/// Where a field is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLocation {
    /// One value per element, averaged over its integration points
    ElementAverage,
}

/// A named scalar field, one value per element
#[derive(Debug, Clone, PartialEq)]
pub struct ElementField {
    pub name: String,
    pub location: FieldLocation,
    pub values: BTreeMap<i32, f64>,
}

impl ElementField {
    pub fn element_average(name: impl Into<String>, values: BTreeMap<i32, f64>) -> Self {
        Self {
            name: name.into(),
            location: FieldLocation::ElementAverage,
            values,
        }
    }
}

/// Results of one converged load increment
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementReport {
    /// 0-based index into the load program
    pub increment: usize,
    pub load_factor: f64,
    /// Newton iterations used
    pub iterations: usize,
    /// Free-dof residual norm at convergence
    pub residual: f64,
    /// Node id -> `[ux, uy]`
    pub node_displacements: BTreeMap<i32, [f64; 2]>,
    pub element_fields: Vec<ElementField>,
}

impl IncrementReport {
    pub fn field(&self, name: &str) -> Option<&ElementField> {
        self.element_fields.iter().find(|f| f.name == name)
    }
}

/// Receiver of converged increments
pub trait ResultSink {
    fn record(&mut self, report: &IncrementReport) -> Result<()>;
}

/// Discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn record(&mut self, _report: &IncrementReport) -> Result<()> {
        Ok(())
    }
}

/// Keeps every report in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub reports: Vec<IncrementReport>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&IncrementReport> {
        self.reports.last()
    }
}

impl ResultSink for MemorySink {
    fn record(&mut self, report: &IncrementReport) -> Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }
}

/// Writes one legacy VTK file per converged increment
#[derive(Debug, Clone)]
pub struct VtkSink {
    directory: PathBuf,
    stem: String,
    node_ids: Vec<i32>,
    element_ids: Vec<i32>,
    points: Vec<[f64; 2]>,
    cells: Vec<Vec<usize>>,
    written: Vec<PathBuf>,
}

impl VtkSink {
    /// Snapshot the mesh geometry; files are named `<stem>_<increment>.vtk`.
    ///
    /// # Errors
    /// Returns an error if the output directory cannot be created.
    pub fn new(mesh: &Mesh, directory: impl AsRef<Path>, stem: &str) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;

        let node_ids = mesh.sorted_node_ids();
        let index: BTreeMap<i32, usize> = node_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();
        let points = node_ids
            .iter()
            .filter_map(|id| mesh.get_node(*id).map(|n| n.coords()))
            .collect();

        let element_ids = mesh.sorted_element_ids();
        let mut cells = Vec::with_capacity(element_ids.len());
        for id in &element_ids {
            let Some(element) = mesh.get_element(*id) else {
                continue;
            };
            let cell = element
                .nodes
                .iter()
                .map(|n| {
                    index.get(n).copied().ok_or_else(|| {
                        SolverError::Mesh(format!(
                            "Element {} references non-existent node {}",
                            id, n
                        ))
                    })
                })
                .collect::<Result<Vec<usize>>>()?;
            cells.push(cell);
        }

        Ok(Self {
            directory,
            stem: stem.to_string(),
            node_ids,
            element_ids,
            points,
            cells,
            written: Vec::new(),
        })
    }

    /// Files written so far, in increment order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn frame(&self, report: &IncrementReport) -> Frame {
        let displacement = self
            .node_ids
            .iter()
            .map(|id| report.node_displacements.get(id).copied().unwrap_or([0.0, 0.0]))
            .collect();

        let cell_scalars = report
            .element_fields
            .iter()
            .map(|field| CellField {
                name: field.name.clone(),
                values: self
                    .element_ids
                    .iter()
                    .map(|id| field.values.get(id).copied().unwrap_or(0.0))
                    .collect(),
            })
            .collect();

        Frame {
            title: self.stem.clone(),
            increment: report.increment,
            load_factor: report.load_factor,
            points: self.points.clone(),
            cells: self.cells.clone(),
            point_vectors: vec![PointField {
                name: "displacement".to_string(),
                values: displacement,
            }],
            cell_scalars,
        }
    }
}

impl ResultSink for VtkSink {
    fn record(&mut self, report: &IncrementReport) -> Result<()> {
        let frame = self.frame(report);
        let path = self
            .directory
            .join(format!("{}_{:04}.vtk", self.stem, report.increment));
        VtkWriter::new(&frame).write_vtk(&path)?;
        self.written.push(path);
        Ok(())
    }
}
