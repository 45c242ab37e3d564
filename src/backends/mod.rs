// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for frame capture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Pipeline Layer                │
//! └────────────────────┬────────────────────────┘
//!                      │ CameraBackend / CaptureSession
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                  │
//! │  ┌──────────────────┐ ┌──────────────────┐  │
//! │  │     Camera       │ │    Synthetic     │  │
//! │  │   (GStreamer)    │ │  (test pattern)  │  │
//! │  └──────────────────┘ └──────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```

pub mod camera;
