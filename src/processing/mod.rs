// SPDX-License-Identifier: GPL-3.0-only

//! Processing stage
//!
//! The edge transform is an opaque capability: one NV21 frame in, one image
//! out. [`ProcessingBridge`] wraps whichever transform is configured,
//! validates its input and output, contains its failures to the frame that
//! caused them, expands single-channel output to RGBA and publishes the
//! result into the [`FrameBufferExchange`].
//!
//! The bridge is driven only from the capture thread and `process` takes
//! `&mut self`, so a transform is never entered concurrently with itself.

pub mod transforms;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::constants::{render::BYTES_PER_PIXEL, timing};
use crate::errors::ProcessingError;
use crate::media::{ConvertedFrame, nv21_len};
use crate::pipeline::exchange::FrameBufferExchange;

pub use transforms::{
    CannyEdges, ColorPreview, InvertLuma, LumaPassthrough, ProcessorKind, build_transform,
};

/// Pixels produced by a transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pixels {
    /// One byte per pixel, expanded to (p, p, p, 255) before display
    Gray(Vec<u8>),
    /// Four bytes per pixel
    Rgba(Vec<u8>),
}

/// Result of one transform call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub width: u32,
    pub height: u32,
    pub pixels: Pixels,
}

impl TransformOutput {
    pub fn gray(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: Pixels::Gray(data),
        }
    }

    pub fn rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: Pixels::Rgba(data),
        }
    }
}

/// Image-processing capability plugged into the bridge
pub trait FrameTransform: Send {
    /// Compute the processed image for one NV21 frame
    fn transform(&mut self, frame: &ConvertedFrame) -> Result<TransformOutput, ProcessingError>;

    /// Name used in logs
    fn name(&self) -> &str {
        "transform"
    }
}

impl<F> FrameTransform for F
where
    F: FnMut(&ConvertedFrame) -> Result<TransformOutput, ProcessingError> + Send,
{
    fn transform(&mut self, frame: &ConvertedFrame) -> Result<TransformOutput, ProcessingError> {
        self(frame)
    }
}

/// A complete RGBA image ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFrame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8, no padding
    pub pixels: Vec<u8>,
    /// Sequence number of the capture this came from
    pub sequence: u64,
}

impl ProcessedFrame {
    pub fn new(
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        sequence: u64,
    ) -> Result<Self, ProcessingError> {
        if width == 0 || height == 0 {
            return Err(ProcessingError::InvalidDimensions { width, height });
        }
        let expected = rgba_len(width, height);
        if pixels.len() != expected {
            return Err(ProcessingError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            sequence,
        })
    }
}

/// Bytes in a tightly packed RGBA image
pub fn rgba_len(width: u32, height: u32) -> usize {
    (width as usize) * (height as usize) * BYTES_PER_PIXEL
}

/// Expand grayscale to opaque RGBA, writing into `dst`
pub fn expand_gray_into(gray: &[u8], dst: &mut Vec<u8>) {
    dst.clear();
    dst.reserve(gray.len() * BYTES_PER_PIXEL);
    for &p in gray {
        dst.extend_from_slice(&[p, p, p, 255]);
    }
}

/// Runs the configured transform and publishes its results
pub struct ProcessingBridge {
    transform: Box<dyn FrameTransform>,
    exchange: FrameBufferExchange,
    /// Allocation reclaimed from the frame the last publish displaced
    spare: Option<Vec<u8>>,
    processed: u64,
    failed: u64,
}

impl ProcessingBridge {
    pub fn new(transform: Box<dyn FrameTransform>, exchange: FrameBufferExchange) -> Self {
        Self {
            transform,
            exchange,
            spare: None,
            processed: 0,
            failed: 0,
        }
    }

    /// Process one frame and publish the result
    ///
    /// Returns the exchange generation of the published frame. On error the
    /// exchange is left untouched.
    pub fn process(&mut self, frame: &ConvertedFrame) -> Result<u64, ProcessingError> {
        let result = self.process_inner(frame);
        match &result {
            Ok(generation) => {
                self.processed += 1;
                if self.processed % timing::FRAME_LOG_INTERVAL == 0 {
                    debug!(
                        frame = frame.sequence,
                        generation,
                        transform = self.transform.name(),
                        processed = self.processed,
                        failed = self.failed,
                        "Frame processed"
                    );
                }
            }
            Err(e) => {
                self.failed += 1;
                warn!(
                    frame = frame.sequence,
                    transform = self.transform.name(),
                    error = %e,
                    "Frame dropped by processing"
                );
            }
        }
        result
    }

    fn process_inner(&mut self, frame: &ConvertedFrame) -> Result<u64, ProcessingError> {
        let (width, height) = (frame.width, frame.height);
        if width == 0 || height == 0 {
            return Err(ProcessingError::InvalidDimensions { width, height });
        }
        let expected = nv21_len(width, height);
        if frame.data.len() != expected {
            return Err(ProcessingError::BufferSizeMismatch {
                expected,
                actual: frame.data.len(),
            });
        }

        let transform = &mut self.transform;
        let output = panic::catch_unwind(AssertUnwindSafe(|| transform.transform(frame)))
            .map_err(|payload| ProcessingError::Panicked(panic_message(payload.as_ref())))??;

        let pixels = match output.pixels {
            Pixels::Rgba(data) => data,
            Pixels::Gray(gray) => {
                let gray_len = (output.width as usize) * (output.height as usize);
                if gray.len() != gray_len {
                    return Err(ProcessingError::BufferSizeMismatch {
                        expected: gray_len,
                        actual: gray.len(),
                    });
                }
                let mut rgba = self.spare.take().unwrap_or_default();
                expand_gray_into(&gray, &mut rgba);
                rgba
            }
        };

        let processed = ProcessedFrame::new(output.width, output.height, pixels, frame.sequence)?;
        let (generation, displaced) = self.exchange.publish(processed);

        // Reuse the old pixel buffer when the display no longer holds it
        if let Some(old) = displaced.and_then(|old| Arc::try_unwrap(old).ok()) {
            self.spare = Some(old.pixels);
        }

        Ok(generation)
    }

    /// Frames published so far
    pub fn processed_count(&self) -> u64 {
        self.processed
    }

    /// Frames dropped because of processing errors
    pub fn failed_count(&self) -> u64 {
        self.failed
    }

    pub fn transform_name(&self) -> &str {
        self.transform.name()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
