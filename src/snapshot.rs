// SPDX-License-Identifier: GPL-3.0-only

//! Saving processed frames to disk

use chrono::Local;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::processing::ProcessedFrame;

/// File name for a snapshot taken now
pub fn snapshot_file_name() -> String {
    format!(
        "snapshot_{}.png",
        Local::now().format("%Y%m%d_%H%M%S%.3f")
    )
}

/// Write `frame` as a PNG into `dir`, creating it if needed
pub fn save_png(frame: &ProcessedFrame, dir: &Path) -> AppResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let image = RgbaImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .ok_or_else(|| {
            AppError::Storage(format!(
                "frame buffer does not match {}x{}",
                frame.width, frame.height
            ))
        })?;

    let path = dir.join(snapshot_file_name());
    image.save(&path)?;
    info!(path = %path.display(), sequence = frame.sequence, "Snapshot saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_shape() {
        let name = snapshot_file_name();
        assert!(name.starts_with("snapshot_"));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn test_save_png_round_trip() {
        let dir = std::env::temp_dir().join(format!("edge-viewer-snap-{}", std::process::id()));
        let pixels = vec![10, 20, 30, 255, 40, 50, 60, 255];
        let frame = ProcessedFrame::new(2, 1, pixels.clone(), 7).unwrap();

        let path = save_png(&frame, &dir).unwrap();
        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (2, 1));
        assert_eq!(loaded.into_raw(), pixels);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
