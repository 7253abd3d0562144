use std::path::Path;

use image::{Rgb, RgbImage};

use crate::error::Result;
use crate::types::{RawDepthPublishFrame, SATURATED_DEPTH};

/// Colorizes raw depth over the 11-bit sensor range. Saturated pixels are black.
pub fn depth_preview(depth: &RawDepthPublishFrame) -> RgbImage {
    let grid = depth.grid;
    RgbImage::from_fn(grid.width, grid.height, |x, y| {
        let d = depth.data[grid.index(x, y)];
        if d >= SATURATED_DEPTH as u32 {
            return Rgb([0, 0, 0]);
        }
        let c = colorous::TURBO.eval_continuous(d as f64 / SATURATED_DEPTH as f64);
        Rgb([c.r, c.g, c.b])
    })
}

pub fn write_depth_preview(path: &Path, depth: &RawDepthPublishFrame) -> Result<()> {
    depth_preview(depth).save(path)?;
    Ok(())
}

#[cfg(feature = "visualization")]
mod rerun_log {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat};
    use rerun::RecordingStream;

    use super::depth_preview;
    use crate::types::{ColorFrame, PointCloudFrame, RawDepthPublishFrame};

    pub fn log_image_as_compressed(
        recording: &RecordingStream,
        topic: &str,
        img: &DynamicImage,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut bytes: Vec<u8> = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        recording.log(
            format!("{}/image", topic),
            &rerun::EncodedImage::from_file_contents(bytes),
        )?;
        Ok(())
    }

    /// Logs a cloud, colored from `color` when given.
    pub fn log_point_cloud(
        recording: &RecordingStream,
        topic: &str,
        seq: u64,
        cloud: &PointCloudFrame,
        color: Option<&ColorFrame>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        recording.set_time("frame", rerun::TimeCell::from_sequence(seq as i64));
        let pts: Vec<[f32; 3]> = cloud.points.iter().map(|p| [p.x, p.y, p.z]).collect();
        let mut points = rerun::Points3D::new(pts);
        if let Some(color) = color {
            let colors: Vec<rerun::Color> = color
                .data
                .chunks_exact(3)
                .map(|c| rerun::Color::from_rgb(c[0], c[1], c[2]))
                .collect();
            points = points.with_colors(colors);
        }
        recording.log(format!("{}/cloud", topic), &points)?;
        Ok(())
    }

    pub fn log_depth(
        recording: &RecordingStream,
        topic: &str,
        depth: &RawDepthPublishFrame,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let img = DynamicImage::ImageRgb8(depth_preview(depth));
        log_image_as_compressed(recording, topic, &img)
    }
}

#[cfg(feature = "visualization")]
pub use rerun_log::*;
