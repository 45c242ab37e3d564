// SPDX-License-Identifier: GPL-3.0-only

//! Built-in frame transforms

use image::GrayImage;
use serde::{Deserialize, Serialize};

use super::{FrameTransform, TransformOutput};
use crate::config::Config;
use crate::errors::ProcessingError;
use crate::media::ConvertedFrame;

/// Transform selected in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    /// Canny edge detection on the luma plane
    #[default]
    Canny,
    /// Luma plane shown as grayscale
    Luma,
    /// Inverted luma
    Invert,
    /// Full colour NV21 to RGBA
    Color,
}

impl ProcessorKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProcessorKind::Canny => "Canny edges",
            ProcessorKind::Luma => "Luma",
            ProcessorKind::Invert => "Inverted luma",
            ProcessorKind::Color => "Colour",
        }
    }
}

impl std::str::FromStr for ProcessorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "canny" | "edges" => Ok(ProcessorKind::Canny),
            "luma" | "gray" | "grey" => Ok(ProcessorKind::Luma),
            "invert" => Ok(ProcessorKind::Invert),
            "color" | "colour" => Ok(ProcessorKind::Color),
            other => Err(format!("unknown processor '{}'", other)),
        }
    }
}

/// Build the transform named by the configuration
pub fn build_transform(config: &Config) -> Box<dyn FrameTransform> {
    match config.processor {
        ProcessorKind::Canny => Box::new(CannyEdges::new(config.canny_low, config.canny_high)),
        ProcessorKind::Luma => Box::new(LumaPassthrough),
        ProcessorKind::Invert => Box::new(InvertLuma),
        ProcessorKind::Color => Box::new(ColorPreview),
    }
}

/// Luma plane as a grayscale image
#[derive(Debug, Default, Clone, Copy)]
pub struct LumaPassthrough;

impl FrameTransform for LumaPassthrough {
    fn transform(&mut self, frame: &ConvertedFrame) -> Result<TransformOutput, ProcessingError> {
        Ok(TransformOutput::gray(
            frame.width,
            frame.height,
            frame.luma().to_vec(),
        ))
    }

    fn name(&self) -> &str {
        "luma"
    }
}

/// Negated luma
#[derive(Debug, Default, Clone, Copy)]
pub struct InvertLuma;

impl FrameTransform for InvertLuma {
    fn transform(&mut self, frame: &ConvertedFrame) -> Result<TransformOutput, ProcessingError> {
        let inverted = frame.luma().iter().map(|&y| 255 - y).collect();
        Ok(TransformOutput::gray(frame.width, frame.height, inverted))
    }

    fn name(&self) -> &str {
        "invert"
    }
}

/// Canny edge detector over the luma plane
#[derive(Debug, Clone, Copy)]
pub struct CannyEdges {
    low: f32,
    high: f32,
}

impl CannyEdges {
    /// Hysteresis thresholds; `high` is raised to `low` if given lower
    pub fn new(low: f32, high: f32) -> Self {
        Self {
            low,
            high: high.max(low),
        }
    }
}

impl Default for CannyEdges {
    fn default() -> Self {
        Self::new(50.0, 100.0)
    }
}

impl FrameTransform for CannyEdges {
    fn transform(&mut self, frame: &ConvertedFrame) -> Result<TransformOutput, ProcessingError> {
        let luma = GrayImage::from_raw(frame.width, frame.height, frame.luma().to_vec())
            .ok_or_else(|| {
                ProcessingError::Transform("luma plane shorter than frame".to_string())
            })?;

        let edges = imageproc::edges::canny(&luma, self.low, self.high);
        Ok(TransformOutput::gray(
            frame.width,
            frame.height,
            edges.into_raw(),
        ))
    }

    fn name(&self) -> &str {
        "canny"
    }
}

/// BT.601 limited-range NV21 to RGBA
#[derive(Debug, Default, Clone, Copy)]
pub struct ColorPreview;

impl FrameTransform for ColorPreview {
    fn transform(&mut self, frame: &ConvertedFrame) -> Result<TransformOutput, ProcessingError> {
        let (w, h) = (frame.width as usize, frame.height as usize);
        let cw = w.div_ceil(2);
        let luma = frame.luma();
        let vu = frame.chroma();

        let mut rgba = vec![0u8; w * h * 4];
        for row in 0..h {
            let vu_row = (row / 2) * cw * 2;
            for col in 0..w {
                let pair = vu_row + (col / 2) * 2;
                let v = vu[pair] as i32 - 128;
                let u = vu[pair + 1] as i32 - 128;
                let y = ((luma[row * w + col] as i32 - 16) * 149) >> 7;

                let out = (row * w + col) * 4;
                rgba[out] = (y + ((179 * v) >> 7)).clamp(0, 255) as u8;
                rgba[out + 1] = (y - ((44 * u) >> 7) - ((91 * v) >> 7)).clamp(0, 255) as u8;
                rgba[out + 2] = (y + ((227 * u) >> 7)).clamp(0, 255) as u8;
                rgba[out + 3] = 255;
            }
        }

        Ok(TransformOutput::rgba(frame.width, frame.height, rgba))
    }

    fn name(&self) -> &str {
        "color"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::nv21_len;
    use crate::processing::Pixels;

    fn frame(width: u32, height: u32, luma: impl Fn(usize, usize) -> u8) -> ConvertedFrame {
        let mut data = vec![128u8; nv21_len(width, height)];
        for row in 0..height as usize {
            for col in 0..width as usize {
                data[row * width as usize + col] = luma(row, col);
            }
        }
        ConvertedFrame {
            width,
            height,
            data,
            sequence: 0,
        }
    }

    #[test]
    fn test_canny_finds_vertical_step() {
        let input = frame(32, 32, |_, col| if col < 16 { 0 } else { 255 });
        let out = CannyEdges::default().transform(&input).unwrap();
        let Pixels::Gray(edges) = out.pixels else {
            panic!("canny should produce grayscale");
        };
        assert_eq!(edges.len(), 32 * 32);
        // Edge pixels along the step in a middle row, none in the flat area
        let row = &edges[16 * 32..17 * 32];
        assert!(row[14..18].iter().any(|&p| p == 255));
        assert!(row[..8].iter().all(|&p| p == 0));
    }

    #[test]
    fn test_canny_flat_image_has_no_edges() {
        let input = frame(16, 16, |_, _| 90);
        let out = CannyEdges::default().transform(&input).unwrap();
        let Pixels::Gray(edges) = out.pixels else {
            panic!("canny should produce grayscale");
        };
        assert!(edges.iter().all(|&p| p == 0));
    }

    #[test]
    fn test_invert() {
        let input = frame(2, 2, |r, c| (r * 2 + c) as u8);
        let out = InvertLuma.transform(&input).unwrap();
        assert_eq!(out.pixels, Pixels::Gray(vec![255, 254, 253, 252]));
    }

    #[test]
    fn test_color_neutral_chroma_is_gray() {
        let input = frame(4, 2, |_, _| 128);
        let out = ColorPreview.transform(&input).unwrap();
        let Pixels::Rgba(px) = out.pixels else {
            panic!("color should produce rgba");
        };
        assert_eq!(px.len(), 4 * 2 * 4);
        for chunk in px.chunks(4) {
            assert_eq!(chunk[0], chunk[1]);
            assert_eq!(chunk[1], chunk[2]);
            assert_eq!(chunk[3], 255);
        }
    }

    #[test]
    fn test_processor_kind_parse() {
        assert_eq!("Canny".parse::<ProcessorKind>(), Ok(ProcessorKind::Canny));
        assert_eq!("colour".parse::<ProcessorKind>(), Ok(ProcessorKind::Color));
        assert!("sobel".parse::<ProcessorKind>().is_err());
    }

    #[test]
    fn test_canny_thresholds_ordered() {
        let canny = CannyEdges::new(80.0, 20.0);
        assert!(canny.high >= canny.low);
    }
}
