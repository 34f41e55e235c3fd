//! Legacy VTK writer for ParaView visualization.
//!
//! Each converged load increment becomes one ASCII `.vtk` file holding an
//! unstructured grid with the displacement vectors as POINT_DATA and the
//! element fields (accumulated plastic strain, stress components) as
//! CELL_DATA. ParaView groups `name_0000.vtk`, `name_0001.vtk`, ... into a
//! time series automatically.
//!
//! ```rust,no_run
//! use epfem_io::{Frame, VtkWriter};
//!
//! # fn example(frame: Frame) -> epfem_io::Result<()> {
//! VtkWriter::new(&frame).write_vtk("plate_0003.vtk")?;
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{IoError, Result};
use crate::frame::Frame;

/// VTK cell type codes for the supported plane cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VtkCellType {
    Triangle = 5,
    Quad = 9,
}

impl VtkCellType {
    fn from_point_count(count: usize) -> Result<Self> {
        match count {
            3 => Ok(VtkCellType::Triangle),
            4 => Ok(VtkCellType::Quad),
            n => Err(IoError::UnsupportedCell(n)),
        }
    }
}

/// VTK writer for a single result frame
pub struct VtkWriter<'a> {
    frame: &'a Frame,
}

impl<'a> VtkWriter<'a> {
    pub fn new(frame: &'a Frame) -> Self {
        Self { frame }
    }

    /// Write the frame to a legacy `.vtk` file.
    pub fn write_vtk<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Write the frame to any sink.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        self.frame.validate()?;
        self.write_header(out)?;
        self.write_points(out)?;
        self.write_cells(out)?;
        self.write_point_data(out)?;
        self.write_cell_data(out)?;
        Ok(())
    }

    fn write_header<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "# vtk DataFile Version 3.0")?;
        writeln!(
            out,
            "{} increment {} load factor {:.6}",
            self.frame.title, self.frame.increment, self.frame.load_factor
        )?;
        writeln!(out, "ASCII")?;
        writeln!(out, "DATASET UNSTRUCTURED_GRID")?;
        Ok(())
    }

    fn write_points<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "POINTS {} double", self.frame.points.len())?;
        for [x, y] in &self.frame.points {
            writeln!(out, "{} {} 0", x, y)?;
        }
        Ok(())
    }

    fn write_cells<W: Write>(&self, out: &mut W) -> Result<()> {
        let cells = &self.frame.cells;
        let total_size: usize = cells.iter().map(|c| 1 + c.len()).sum();

        writeln!(out, "CELLS {} {}", cells.len(), total_size)?;
        for cell in cells {
            write!(out, "{}", cell.len())?;
            for point in cell {
                write!(out, " {}", point)?;
            }
            writeln!(out)?;
        }

        writeln!(out, "CELL_TYPES {}", cells.len())?;
        for cell in cells {
            let cell_type = VtkCellType::from_point_count(cell.len())?;
            writeln!(out, "{}", cell_type as i32)?;
        }
        Ok(())
    }

    fn write_point_data<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.frame.point_vectors.is_empty() {
            return Ok(());
        }
        writeln!(out, "POINT_DATA {}", self.frame.points.len())?;
        for field in &self.frame.point_vectors {
            writeln!(out, "VECTORS {} double", sanitize(&field.name))?;
            for [ux, uy] in &field.values {
                writeln!(out, "{} {} 0", ux, uy)?;
            }
        }
        Ok(())
    }

    fn write_cell_data<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.frame.cell_scalars.is_empty() {
            return Ok(());
        }
        writeln!(out, "CELL_DATA {}", self.frame.cells.len())?;
        for field in &self.frame.cell_scalars {
            writeln!(out, "SCALARS {} double 1", sanitize(&field.name))?;
            writeln!(out, "LOOKUP_TABLE default")?;
            for value in &field.values {
                writeln!(out, "{}", value)?;
            }
        }
        Ok(())
    }
}

/// VTK legacy field names cannot contain whitespace.
fn sanitize(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{CellField, PointField};

    fn frame() -> Frame {
        Frame {
            title: "plate".to_string(),
            increment: 2,
            load_factor: 0.5,
            points: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [2.0, 0.0]],
            cells: vec![vec![0, 1, 2, 3], vec![1, 4, 2]],
            point_vectors: vec![PointField {
                name: "Displacement".to_string(),
                values: vec![[0.0, 0.0], [0.1, 0.0], [0.1, -0.01], [0.0, -0.01], [0.2, 0.0]],
            }],
            cell_scalars: vec![CellField {
                name: "Accumulated plastic strain".to_string(),
                values: vec![0.0, 0.002],
            }],
        }
    }

    #[test]
    fn writes_grid_and_fields() {
        let mut buf = Vec::new();
        VtkWriter::new(&frame()).write_to(&mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");

        assert!(text.starts_with("# vtk DataFile Version 3.0"));
        assert!(text.contains("POINTS 5 double"));
        assert!(text.contains("CELLS 2 9"));
        assert!(text.contains("CELL_TYPES 2\n9\n5\n"));
        assert!(text.contains("VECTORS Displacement double"));
        assert!(text.contains("SCALARS Accumulated_plastic_strain double 1"));
        assert!(text.contains("CELL_DATA 2"));
    }

    #[test]
    fn rejects_unsupported_cells() {
        let mut f = frame();
        f.cells = vec![vec![0, 1]];
        f.cell_scalars.clear();
        let mut buf = Vec::new();
        let err = VtkWriter::new(&f).write_to(&mut buf).expect_err("line cells");
        assert!(matches!(err, IoError::UnsupportedCell(2)));
    }

    #[test]
    fn writes_file_to_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("plate_0002.vtk");
        VtkWriter::new(&frame()).write_vtk(&path).expect("write file");
        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.contains("DATASET UNSTRUCTURED_GRID"));
    }
}
