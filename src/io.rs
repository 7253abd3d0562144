use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::{ReprojectError, Result};
use crate::types::{GridSize, PointCloudFrame, RawDepthFrame};

/// Extension of recorded raw depth frames.
pub const RAW_DEPTH_EXT: &str = "depth";

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &Path, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    let mut file = File::create(output_path)?;
    file.write_all(j.as_bytes())?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Writes a raw frame as `width:u32 height:u32` followed by little-endian `u16` samples.
pub fn write_raw_depth(path: &Path, frame: &RawDepthFrame) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(&frame.grid.width.to_le_bytes())?;
    w.write_all(&frame.grid.height.to_le_bytes())?;
    for d in &frame.data {
        w.write_all(&d.to_le_bytes())?;
    }
    w.flush()?;
    Ok(())
}

pub fn read_raw_depth(path: &Path) -> Result<RawDepthFrame> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
    if bytes.len() < 8 {
        return Err(ReprojectError::MalformedFrame(format!(
            "{}: header truncated",
            path.display()
        )));
    }
    let width = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let height = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let grid = GridSize::new(width, height)?;
    let body = &bytes[8..];
    if body.len() != grid.len() * 2 {
        return Err(ReprojectError::MalformedFrame(format!(
            "{}: {} bytes of samples for a {} grid",
            path.display(),
            body.len(),
            grid
        )));
    }
    let data = body
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect();
    RawDepthFrame::from_vec(grid, data)
}

/// Writes an ASCII PLY point cloud. Non-finite points are skipped.
pub fn write_ply(path: &Path, cloud: &PointCloudFrame) -> Result<usize> {
    let finite: Vec<_> = cloud.points.iter().filter(|p| p.is_finite()).collect();
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "ply")?;
    writeln!(w, "format ascii 1.0")?;
    writeln!(w, "element vertex {}", finite.len())?;
    writeln!(w, "property float x")?;
    writeln!(w, "property float y")?;
    writeln!(w, "property float z")?;
    writeln!(w, "end_header")?;
    for p in &finite {
        writeln!(w, "{} {} {}", p.x, p.y, p.z)?;
    }
    w.flush()?;
    Ok(finite.len())
}
