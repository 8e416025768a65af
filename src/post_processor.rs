use std::{fs::File, io::Write, path::Path};

use tracing::info;

use crate::{
    datatypes::{Point2D, Segment},
    error::LegscopeError,
};

fn create(path: &Path) -> Result<File, LegscopeError> {
    match File::create(path) {
        Ok(f) => Ok(f),
        Err(err) => Err(LegscopeError::PostProcessor(format!(
            "Failed to create {}: {err}",
            path.display()
        ))),
    }
}

fn write_rows(path: &Path, header: &str, rows: impl Iterator<Item = String>) -> Result<(), LegscopeError> {
    let mut file = create(path)?;

    let mut write_line = |line: &str| match writeln!(file, "{line}") {
        Ok(()) => Ok(()),
        Err(err) => Err(LegscopeError::PostProcessor(format!(
            "Failed to write {}: {err}",
            path.display()
        ))),
    };

    write_line(header)?;
    for row in rows {
        write_line(&row)?;
    }

    Ok(())
}

/// Writes scanned foot positions to a CSV file
///
/// # Arguments
/// * `points` - Foot positions from a workspace scan
/// * `output` - Path of the CSV to create
pub fn points_csv(points: &[Point2D], output: &Path) -> Result<(), LegscopeError> {
    write_rows(
        output,
        "x,y",
        points.iter().map(|p| format!("{x},{y}", x = p.x, y = p.y)),
    )?;

    info!("wrote {} points to {}", points.len(), output.display());
    Ok(())
}

/// Writes workspace boundary segments to a CSV file, one segment per row
///
/// # Arguments
/// * `boundary` - Boundary segments from the alpha shape
/// * `output` - Path of the CSV to create
pub fn boundary_csv(boundary: &[Segment], output: &Path) -> Result<(), LegscopeError> {
    write_rows(
        output,
        "x1,y1,x2,y2",
        boundary.iter().map(|s| {
            format!(
                "{x1},{y1},{x2},{y2}",
                x1 = s.p1.x,
                y1 = s.p1.y,
                x2 = s.p2.x,
                y2 = s.p2.y
            )
        }),
    )?;

    info!("wrote {} boundary segments to {}", boundary.len(), output.display());
    Ok(())
}
