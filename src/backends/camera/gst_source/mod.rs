// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer camera backend
//!
//! Devices are discovered with a GStreamer device monitor and opened through
//! a `v4l2src` (or `autovideosrc`) pipeline that terminates in an appsink.
//! The appsink is pulled from the capture thread instead of pushing through
//! callbacks, so the capture context decides when the next frame is taken.

mod pipeline;

pub use pipeline::GStreamerSession;

use super::types::*;
use super::{CameraBackend, CaptureSession};
use gstreamer::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Pseudo device path that lets GStreamer pick a source automatically
pub const AUTO_DEVICE: &str = "auto";

/// Camera backend built on GStreamer
#[derive(Debug, Default)]
pub struct GStreamerBackend;

impl GStreamerBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CameraBackend for GStreamerBackend {
    fn name(&self) -> &'static str {
        "gstreamer"
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        if let Err(e) = gstreamer::init() {
            warn!(error = %e, "GStreamer unavailable, no cameras listed");
            return Vec::new();
        }

        let mut cameras = enumerate_with_device_monitor();
        if cameras.is_empty() {
            debug!("Device monitor found nothing, scanning /dev");
            cameras = enumerate_dev_nodes(Path::new("/dev"));
        }
        if cameras.is_empty() && gstreamer::ElementFactory::find("autovideosrc").is_some() {
            cameras.push(CameraDevice {
                name: "Default camera".to_string(),
                path: AUTO_DEVICE.to_string(),
                location: None,
            });
        }

        info!(count = cameras.len(), "Enumerated cameras");
        cameras
    }

    fn check_permission(&self, device: &CameraDevice) -> PermissionStatus {
        if device.path == AUTO_DEVICE || !device.path.starts_with('/') {
            return PermissionStatus::Granted;
        }

        match std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&device.path)
        {
            Ok(_) => PermissionStatus::Granted,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                warn!(path = %device.path, "No access to camera device");
                PermissionStatus::Denied
            }
            // Missing or busy devices surface when the session opens
            Err(e) => {
                debug!(path = %device.path, error = %e, "Permission check inconclusive");
                PermissionStatus::Granted
            }
        }
    }

    fn open(
        &self,
        device: &CameraDevice,
        format: &CaptureFormat,
    ) -> BackendResult<Box<dyn CaptureSession>> {
        let session = GStreamerSession::open(device, format)?;
        Ok(Box::new(session))
    }
}

fn enumerate_with_device_monitor() -> Vec<CameraDevice> {
    let monitor = gstreamer::DeviceMonitor::new();
    monitor.add_filter(Some("Video/Source"), None);

    if let Err(e) = monitor.start() {
        debug!(error = %e, "Failed to start device monitor");
        return Vec::new();
    }
    let devices = monitor.devices();
    monitor.stop();

    devices
        .iter()
        .filter_map(|device| {
            let props = device.properties()?;
            let path = ["api.v4l2.path", "device.path"]
                .iter()
                .find_map(|key| props.get::<String>(*key).ok())?;
            let location = props.get::<String>("api.libcamera.location").ok();
            Some(CameraDevice {
                name: device.display_name().to_string(),
                path,
                location,
            })
        })
        .fold(Vec::new(), |mut acc, cam| {
            // PipeWire and V4L2 providers can report the same node twice
            if !acc.iter().any(|c: &CameraDevice| c.path == cam.path) {
                acc.push(cam);
            }
            acc
        })
}

fn enumerate_dev_nodes(dev: &Path) -> Vec<CameraDevice> {
    let Ok(entries) = std::fs::read_dir(dev) else {
        return Vec::new();
    };

    let mut nodes: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| name.starts_with("video"))
        .collect();
    nodes.sort_by_key(|name| {
        name.trim_start_matches("video")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    nodes
        .into_iter()
        .map(|name| CameraDevice {
            path: dev.join(&name).to_string_lossy().into_owned(),
            name,
            location: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_device_always_permitted() {
        let backend = GStreamerBackend::new();
        let device = CameraDevice {
            name: "auto".into(),
            path: AUTO_DEVICE.into(),
            location: None,
        };
        assert_eq!(backend.check_permission(&device), PermissionStatus::Granted);
    }

    #[test]
    fn test_dev_scan_of_missing_dir_is_empty() {
        assert!(enumerate_dev_nodes(Path::new("/nonexistent-edge-viewer-dir")).is_empty());
    }
}
