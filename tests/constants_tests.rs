// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use edge_viewer::backends::camera::CaptureFormat;
use edge_viewer::constants::{capture, pipeline, render, timing};

#[test]
fn test_capture_format_default_matches_constants() {
    let format = CaptureFormat::default();
    assert_eq!(
        (format.width, format.height, format.framerate),
        (capture::WIDTH, capture::HEIGHT, capture::FRAMERATE)
    );
    assert_eq!(format.to_string(), "1280x720 @ 30fps");
}

#[test]
fn test_appsink_keeps_only_latest() {
    assert_eq!(pipeline::APPSINK_MAX_BUFFERS, 1);
}

#[test]
fn test_acquire_timeout_shorter_than_stop_timeout() {
    assert!(pipeline::ACQUIRE_TIMEOUT < std::time::Duration::from_secs(timing::STOP_TIMEOUT_SECS));
}

#[test]
fn test_headless_draw_interval_near_60hz() {
    let hz = 1.0 / timing::HEADLESS_DRAW_INTERVAL.as_secs_f64();
    assert!((hz - 60.0).abs() < 0.5);
}

#[test]
fn test_clear_color_is_opaque() {
    assert_eq!(render::CLEAR_COLOR[3], 1.0);
    assert_eq!(render::BYTES_PER_PIXEL, 4);
}

#[test]
fn test_version_is_set_at_build_time() {
    let version = edge_viewer::constants::app_info::version();
    assert!(!version.is_empty());
    assert!(!version.starts_with('v'));
}
