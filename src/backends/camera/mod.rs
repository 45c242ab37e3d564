// SPDX-License-Identifier: MPL-2.0
//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ PipelineController   │  ← Lifecycle, permission, notices
//! └──────────┬───────────┘
//!            │ open()
//!            ▼
//! ┌──────────────────────┐
//! │  CameraBackend Trait │  ← Enumeration, permission, session factory
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ CaptureSession Trait │  ← start / acquire latest / stop / close
//! └──────────┬───────────┘
//!       ┌────┴──────┐
//!       ▼           ▼
//!  ┌─────────┐ ┌─────────┐
//!  │GStreamer│ │Synthetic│
//!  └─────────┘ └─────────┘
//! ```
//!
//! Sessions are opened and driven on the capture thread managed by
//! [`frame_loop::CaptureLoopController`].

pub mod frame_loop;
pub mod gst_source;
pub mod synthetic;
pub mod types;

pub use types::*;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{Config, SourceKind};

/// Camera backend trait
///
/// A backend knows which devices exist and whether the process may use
/// them, and produces capture sessions. It holds no per-session state so one
/// instance can serve every start/stop cycle of the pipeline.
pub trait CameraBackend: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Check whether the given device may be opened
    fn check_permission(&self, device: &CameraDevice) -> PermissionStatus;

    /// Open the device and configure a capture session for `format`
    ///
    /// Fails with [`BackendError::FormatNotSupported`] when the device cannot
    /// deliver the requested size in a multi-plane 4:2:0 layout.
    fn open(
        &self,
        device: &CameraDevice,
        format: &CaptureFormat,
    ) -> BackendResult<Box<dyn CaptureSession>>;

    /// Pick the device to open
    ///
    /// An explicit path must match an enumerated device. Otherwise the first
    /// back-facing camera wins, falling back to the first device listed.
    fn select_device(&self, requested: Option<&str>) -> BackendResult<CameraDevice> {
        let cameras = self.enumerate_cameras();
        debug!(backend = self.name(), count = cameras.len(), "Selecting camera");

        if let Some(path) = requested {
            return cameras
                .into_iter()
                .find(|c| c.path == path)
                .ok_or_else(|| BackendError::DeviceNotFound(path.to_string()));
        }

        let back = cameras
            .iter()
            .position(|c| c.location.as_deref() == Some("back"));
        match back {
            Some(idx) => Ok(cameras[idx].clone()),
            None => cameras
                .into_iter()
                .next()
                .ok_or_else(|| BackendError::DeviceNotFound("No camera found".to_string())),
        }
    }
}

/// A configured capture session on one device
///
/// All methods are called from the capture thread only.
pub trait CaptureSession: Send {
    /// Begin the repeating capture request. Success confirms the session is
    /// configured and streaming.
    fn start_repeating(&mut self) -> BackendResult<()>;

    /// Wait up to `timeout` for a capture-ready event and return the most
    /// recent frame, dropping any older frames still queued.
    ///
    /// An `Err` means the device disconnected or reported a streaming error.
    fn acquire_latest(&mut self, timeout: Duration) -> BackendResult<AcquireOutcome>;

    /// Stop the repeating request. Frames already acquired stay valid until
    /// released.
    fn stop_repeating(&mut self);

    /// Close the session and device. Safe to call more than once.
    fn close(&mut self);
}

/// Create the backend selected by the configuration
pub fn create_backend(config: &Config) -> Arc<dyn CameraBackend> {
    info!(source = ?config.source, "Creating camera backend");
    match config.source {
        SourceKind::Camera => Arc::new(gst_source::GStreamerBackend::new()),
        SourceKind::Synthetic => Arc::new(synthetic::SyntheticBackend::new(
            synthetic::SyntheticOptions::default(),
        )),
    }
}
