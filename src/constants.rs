// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Capture format requested from the camera
pub mod capture {
    /// Sensor frame width requested from the device
    pub const WIDTH: u32 = 1280;

    /// Sensor frame height requested from the device
    pub const HEIGHT: u32 = 720;

    /// Requested frame rate
    pub const FRAMERATE: u32 = 30;

    /// Multi-plane 4:2:0 format negotiated with the device
    pub const PIXEL_FORMAT: &str = "I420";
}

/// GStreamer pipeline constants
pub mod pipeline {
    use super::Duration;

    /// Appsink queue depth. One slot: stale frames are dropped by the sink.
    pub const APPSINK_MAX_BUFFERS: u32 = 1;

    /// How long a single acquire waits for a capture-ready sample
    pub const ACQUIRE_TIMEOUT: Duration = Duration::from_millis(50);

    /// Get number of threads for videoconvert based on available CPU threads
    pub fn videoconvert_threads() -> u32 {
        std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(4)
    }
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// Pipeline state change timeout on stop
    pub const STOP_TIMEOUT_SECS: u64 = 2;

    /// Pipeline playing state timeout on start
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// Averaging window for the frame-rate counters
    pub const FPS_WINDOW: Duration = Duration::from_secs(1);

    /// Tick period of the simulated display in headless mode (60 Hz)
    pub const HEADLESS_DRAW_INTERVAL: Duration = Duration::from_micros(16_667);
}

/// Presentation constants
pub mod render {
    /// Colour used when no processed frame exists yet
    pub const CLEAR_COLOR: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

    /// Base window title
    pub const WINDOW_TITLE: &str = "Edge Viewer";

    /// Bytes per pixel of a processed frame (RGBA8)
    pub const BYTES_PER_PIXEL: usize = 4;
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }

    /// Directory name used under the XDG config and pictures directories
    pub const APP_DIR: &str = "edge-viewer";
}
