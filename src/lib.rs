// SPDX-License-Identifier: MPL-2.0

//! Edge Viewer - live edge detection on a camera stream
//!
//! Frames flow from a camera session through a YUV to NV21 converter and a
//! pluggable transform (Canny edges by default) into a single-slot exchange
//! that the display reads on every draw tick.
//!
//! # Architecture
//!
//! - [`backends`]: Camera abstraction, GStreamer and synthetic sources
//! - [`media`]: YUV plane normalization
//! - [`processing`]: Frame transforms and the processing bridge
//! - [`pipeline`]: Exchange, capture worker and lifecycle controller
//! - [`render`]: Texture management and the wgpu renderer
//! - [`app`]: winit window that ties it together
//! - [`config`]: User configuration handling

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod pipeline;
pub mod processing;
pub mod render;
pub mod snapshot;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use pipeline::{FrameBufferExchange, PipelineController, PipelineEvent, PipelineState};
pub use processing::{ProcessedFrame, ProcessorKind};
