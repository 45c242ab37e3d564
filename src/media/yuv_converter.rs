// SPDX-License-Identifier: MPL-2.0

//! Repack multi-plane 4:2:0 captures into NV21
//!
//! Sensors report luma and two half-resolution chroma planes, each with its
//! own row stride and pixel stride. The processing stage wants one buffer
//! with the luma plane (no row padding) followed by interleaved chroma pairs
//! in V,U order:
//!
//! ```text
//! ┌──────────────────────────┐
//! │ Y  (width x height)      │
//! ├──────────────────────────┤
//! │ V U V U ... (cw x ch x 2)│
//! └──────────────────────────┘
//! ```
//!
//! The chroma order of the source is never assumed. Each plane is read
//! through its own offset and strides, so planar (I420, YV12) and
//! interleaved (NV12, NV21) sources convert the same way.

use crate::backends::camera::types::{PlaneKind, RawFrame, chroma_extent};
use crate::errors::ConversionError;

/// An NV21 frame ready for processing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertedFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Sequence number of the capture this was converted from
    pub sequence: u64,
}

impl ConvertedFrame {
    /// Luma samples
    pub fn luma(&self) -> &[u8] {
        let len = (self.width as usize) * (self.height as usize);
        &self.data[..len.min(self.data.len())]
    }

    /// Interleaved V,U samples
    pub fn chroma(&self) -> &[u8] {
        let len = (self.width as usize) * (self.height as usize);
        &self.data[len.min(self.data.len())..]
    }
}

/// Size in bytes of an NV21 buffer for the given dimensions
pub fn nv21_len(width: u32, height: u32) -> usize {
    let (cw, ch) = chroma_extent(width, height);
    (width as usize) * (height as usize) + 2 * (cw as usize) * (ch as usize)
}

/// Convert a raw capture into a newly allocated NV21 frame
pub fn convert(frame: &RawFrame) -> Result<ConvertedFrame, ConversionError> {
    let mut out = ConvertedFrame::default();
    convert_into(frame, &mut out)?;
    Ok(out)
}

/// Convert a raw capture into `out`, reusing its allocation
///
/// `out` is fully overwritten. Calling this twice with the same frame
/// produces identical output.
pub fn convert_into(frame: &RawFrame, out: &mut ConvertedFrame) -> Result<(), ConversionError> {
    let (width, height) = (frame.width, frame.height);
    if width == 0 || height == 0 {
        return Err(ConversionError::InvalidDimensions { width, height });
    }

    let (w, h) = (width as usize, height as usize);
    let (cw, ch) = chroma_extent(width, height);
    let (cw, ch) = (cw as usize, ch as usize);
    let src = frame.data();

    out.width = width;
    out.height = height;
    out.sequence = frame.sequence;
    out.data.clear();
    out.data.reserve(nv21_len(width, height));

    copy_luma(frame, src, w, h, &mut out.data)?;

    let v = frame.plane(PlaneKind::ChromaV);
    let u = frame.plane(PlaneKind::ChromaU);
    let already_vu = v.pixel_stride == 2 && u.pixel_stride == 2 && u.offset == v.offset + 1;

    for row in 0..ch {
        let v_row = v.offset + row * v.row_stride;
        if already_vu {
            // Source rows are V,U pairs already
            let run = sample_run(src, v_row, cw * 2, "Chroma V")?;
            out.data.extend_from_slice(run);
            continue;
        }

        let u_row = u.offset + row * u.row_stride;
        let v_samples = sample_run(src, v_row, (cw - 1) * v.pixel_stride + 1, "Chroma V")?;
        let u_samples = sample_run(src, u_row, (cw - 1) * u.pixel_stride + 1, "Chroma U")?;
        for col in 0..cw {
            out.data.push(v_samples[col * v.pixel_stride]);
            out.data.push(u_samples[col * u.pixel_stride]);
        }
    }

    Ok(())
}

fn copy_luma(
    frame: &RawFrame,
    src: &[u8],
    w: usize,
    h: usize,
    dst: &mut Vec<u8>,
) -> Result<(), ConversionError> {
    let y = frame.plane(PlaneKind::Luma);

    if y.pixel_stride == 1 && y.row_stride == w {
        dst.extend_from_slice(sample_run(src, y.offset, w * h, "Luma")?);
        return Ok(());
    }

    for row in 0..h {
        let start = y.offset + row * y.row_stride;
        if y.pixel_stride == 1 {
            dst.extend_from_slice(sample_run(src, start, w, "Luma")?);
        } else {
            let run = sample_run(src, start, (w - 1) * y.pixel_stride + 1, "Luma")?;
            dst.extend(run.iter().step_by(y.pixel_stride));
        }
    }
    Ok(())
}

fn sample_run<'a>(
    src: &'a [u8],
    start: usize,
    len: usize,
    plane: &'static str,
) -> Result<&'a [u8], ConversionError> {
    src.get(start..start + len)
        .ok_or(ConversionError::PlaneOutOfBounds {
            plane,
            required: start + len,
            available: src.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::synthetic::{ChromaLayout, frame_from_planes};

    #[test]
    fn test_nv21_len_even_and_odd() {
        assert_eq!(nv21_len(4, 4), 24);
        assert_eq!(nv21_len(1280, 720), 1280 * 720 * 3 / 2);
        // 3x3 luma, 2x2 chroma
        assert_eq!(nv21_len(3, 3), 9 + 8);
    }

    #[test]
    fn test_odd_dimensions_round_chroma_up() {
        let y: Vec<u8> = (0..15).collect();
        let u = [10u8, 11, 12, 13, 14, 15];
        let v = [20u8, 21, 22, 23, 24, 25];
        let frame = frame_from_planes(5, 3, &y, &u, &v, ChromaLayout::Planar, 0, 0).unwrap();
        let out = convert(&frame).unwrap();
        assert_eq!(out.data.len(), nv21_len(5, 3));
        assert_eq!(out.luma(), &y[..]);
        assert_eq!(&out.chroma()[..4], &[20, 10, 21, 11]);
    }

    #[test]
    fn test_convert_into_reuses_and_overwrites() {
        let y: Vec<u8> = (0..16).collect();
        let u = [1u8, 2, 3, 4];
        let v = [5u8, 6, 7, 8];
        let frame = frame_from_planes(4, 4, &y, &u, &v, ChromaLayout::Planar, 3, 9).unwrap();

        let mut out = ConvertedFrame {
            width: 99,
            height: 99,
            data: vec![0xAA; 1024],
            sequence: 0,
        };
        convert_into(&frame, &mut out).unwrap();
        let first = out.clone();
        convert_into(&frame, &mut out).unwrap();

        assert_eq!(first, out);
        assert_eq!(out.data.len(), 24);
        assert_eq!(out.sequence, 9);
    }
}
