// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer capture session

use super::AUTO_DEVICE;
use crate::backends::camera::CaptureSession;
use crate::backends::camera::types::*;
use crate::constants::{capture, pipeline, timing};
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::{VideoFormat, VideoInfo};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// One open camera pipeline
pub struct GStreamerSession {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
    format: CaptureFormat,
    sequence: u64,
    dropped_stale: u64,
    closed: bool,
}

impl GStreamerSession {
    /// Build the pipeline and bring it to PAUSED so the device is opened
    pub fn open(device: &CameraDevice, format: &CaptureFormat) -> BackendResult<Self> {
        info!(device = %device.name, path = %device.path, format = %format, "Opening camera");

        gstreamer::init().map_err(|e| BackendError::NotAvailable(e.to_string()))?;

        let pipeline_str = build_pipeline_string(&device.path, format);
        debug!(pipeline = %pipeline_str, "Launching pipeline");

        let pipeline = gstreamer::parse::launch(&pipeline_str)
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?
            .dynamic_cast::<gstreamer::Pipeline>()
            .map_err(|_| {
                BackendError::InitializationFailed("Launch result is not a pipeline".to_string())
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| BackendError::InitializationFailed("Failed to get appsink".to_string()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| {
                BackendError::InitializationFailed("Failed to cast appsink".to_string())
            })?;

        // Pull mode with a one-slot queue that keeps only the newest frame
        appsink.set_property("emit-signals", false);
        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", pipeline::APPSINK_MAX_BUFFERS);
        appsink.set_property("drop", true);
        appsink.set_property("enable-last-sample", false);

        if let Err(e) = pipeline.set_state(gstreamer::State::Paused) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(map_bus_error(&pipeline).unwrap_or_else(|| {
                BackendError::InitializationFailed(format!("Failed to open device: {}", e))
            }));
        }

        Ok(Self {
            pipeline,
            appsink,
            format: *format,
            sequence: 0,
            dropped_stale: 0,
            closed: false,
        })
    }

    fn frame_from_sample(&mut self, sample: gstreamer::Sample) -> BackendResult<RawFrame> {
        let caps = sample
            .caps()
            .ok_or_else(|| BackendError::Other("No caps in sample".to_string()))?;
        let info = VideoInfo::from_caps(caps)
            .map_err(|e| BackendError::Other(format!("Failed to get video info: {}", e)))?;

        if info.width() != self.format.width || info.height() != self.format.height {
            return Err(BackendError::FormatNotSupported(format!(
                "device delivered {}x{}, expected {}x{}",
                info.width(),
                info.height(),
                self.format.width,
                self.format.height
            )));
        }

        let planes = planes_from_info(&info)?;
        let buffer = sample
            .buffer_owned()
            .ok_or_else(|| BackendError::Other("No buffer in sample".to_string()))?;
        let mapped = buffer
            .into_mapped_buffer_readable()
            .map_err(|_| BackendError::Other("Failed to map buffer".to_string()))?;

        let sequence = self.sequence;
        self.sequence += 1;

        if sequence % timing::FRAME_LOG_INTERVAL == 0 {
            debug!(
                frame = sequence,
                width = info.width(),
                height = info.height(),
                stride_y = planes.y.row_stride,
                stride_u = planes.u.row_stride,
                stride_v = planes.v.row_stride,
                dropped_stale = self.dropped_stale,
                "Frame layout"
            );
        }

        RawFrame::new(
            info.width(),
            info.height(),
            FrameData::from_mapped_buffer(mapped),
            planes,
            sequence,
        )
        .map_err(|e| BackendError::Other(e.to_string()))
    }
}

impl CaptureSession for GStreamerSession {
    fn start_repeating(&mut self) -> BackendResult<()> {
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| {
                map_bus_error(&self.pipeline).unwrap_or_else(|| {
                    BackendError::InitializationFailed(format!("Failed to start pipeline: {}", e))
                })
            })?;

        let (result, state, pending) = self.pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::START_TIMEOUT_SECS,
        ));
        debug!(result = ?result, state = ?state, pending = ?pending, "Pipeline state");

        if let Some(err) = map_bus_error(&self.pipeline) {
            return Err(err);
        }
        if state != gstreamer::State::Playing {
            warn!("Pipeline is not in PLAYING state yet");
        }

        info!("Repeating capture started");
        Ok(())
    }

    fn acquire_latest(&mut self, timeout: Duration) -> BackendResult<AcquireOutcome> {
        if let Some(err) = map_bus_error(&self.pipeline) {
            return Err(err);
        }

        let wait = gstreamer::ClockTime::from_nseconds(timeout.as_nanos() as u64);
        let Some(mut sample) = self.appsink.try_pull_sample(wait) else {
            if self.appsink.is_eos() {
                return Err(BackendError::Disconnected("end of stream".to_string()));
            }
            return Ok(AcquireOutcome::NoFrame);
        };

        // Keep only the newest sample
        while let Some(newer) = self.appsink.try_pull_sample(gstreamer::ClockTime::ZERO) {
            self.dropped_stale += 1;
            sample = newer;
        }

        self.frame_from_sample(sample).map(AcquireOutcome::Frame)
    }

    fn stop_repeating(&mut self) {
        if self.closed {
            return;
        }
        debug!("Stopping repeating capture");
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Paused) {
            debug!(error = %e, "Pause on stop failed");
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        info!("Closing camera pipeline");

        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            error!(error = %e, "Failed to stop pipeline");
            return;
        }

        let (result, state, _) = self.pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::STOP_TIMEOUT_SECS,
        ));
        match result {
            Ok(_) => info!(state = ?state, "Camera pipeline stopped"),
            Err(e) => debug!(error = ?e, state = ?state, "Pipeline state change had issues"),
        }
    }
}

impl Drop for GStreamerSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_pipeline_string(device_path: &str, format: &CaptureFormat) -> String {
    let source = if device_path == AUTO_DEVICE || device_path.is_empty() {
        "autovideosrc".to_string()
    } else {
        format!("v4l2src device={}", device_path)
    };

    format!(
        "{source} ! decodebin ! videoconvert n-threads={threads} ! \
         video/x-raw,format={pix},width={w},height={h} ! \
         appsink name=sink",
        source = source,
        threads = pipeline::videoconvert_threads(),
        pix = capture::PIXEL_FORMAT,
        w = format.width,
        h = format.height,
    )
}

/// Describe the 4:2:0 planes of a negotiated buffer
fn planes_from_info(info: &VideoInfo) -> BackendResult<YuvPlanes> {
    let offset = info.offset();
    let stride = info.stride();
    let plane = |idx: usize, pixel_stride: usize| {
        Plane::new(offset[idx], stride[idx] as usize, pixel_stride)
    };

    match info.format() {
        VideoFormat::I420 => Ok(YuvPlanes {
            y: plane(0, 1),
            u: plane(1, 1),
            v: plane(2, 1),
        }),
        VideoFormat::Yv12 => Ok(YuvPlanes {
            y: plane(0, 1),
            v: plane(1, 1),
            u: plane(2, 1),
        }),
        VideoFormat::Nv12 => {
            let uv = plane(1, 2);
            Ok(YuvPlanes {
                y: plane(0, 1),
                u: uv,
                v: Plane::new(uv.offset + 1, uv.row_stride, 2),
            })
        }
        VideoFormat::Nv21 => {
            let vu = plane(1, 2);
            Ok(YuvPlanes {
                y: plane(0, 1),
                v: vu,
                u: Plane::new(vu.offset + 1, vu.row_stride, 2),
            })
        }
        other => Err(BackendError::FormatNotSupported(format!(
            "{:?} is not a 4:2:0 multi-plane format",
            other
        ))),
    }
}

/// Drain pending error/EOS messages from the bus
fn map_bus_error(pipeline: &gstreamer::Pipeline) -> Option<BackendError> {
    let bus = pipeline.bus()?;
    let msg = bus.pop_filtered(&[gstreamer::MessageType::Error, gstreamer::MessageType::Eos])?;

    match msg.view() {
        gstreamer::MessageView::Error(err) => {
            let debug_info = err.debug().map(|d| d.to_string()).unwrap_or_default();
            error!(
                error = %err.error(),
                debug = %debug_info,
                source = ?err.src().map(|s| s.name()),
                "GStreamer error"
            );
            if err.error().matches(gstreamer::StreamError::Format)
                || debug_info.contains("not-negotiated")
            {
                Some(BackendError::FormatNotSupported(err.error().to_string()))
            } else if err.error().matches(gstreamer::ResourceError::OpenReadWrite)
                || err.error().matches(gstreamer::ResourceError::OpenRead)
            {
                Some(BackendError::InitializationFailed(err.error().to_string()))
            } else {
                Some(BackendError::Disconnected(err.error().to_string()))
            }
        }
        gstreamer::MessageView::Eos(_) => {
            Some(BackendError::Disconnected("end of stream".to_string()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_string_for_device() {
        let s = build_pipeline_string("/dev/video2", &CaptureFormat::default());
        assert!(s.starts_with("v4l2src device=/dev/video2"));
        assert!(s.contains("format=I420,width=1280,height=720"));
        assert!(s.ends_with("appsink name=sink"));
    }

    #[test]
    fn test_pipeline_string_auto() {
        let s = build_pipeline_string(AUTO_DEVICE, &CaptureFormat::default());
        assert!(s.starts_with("autovideosrc"));
    }

    #[test]
    fn test_nv21_planes_point_into_shared_buffer() {
        gstreamer::init().unwrap();
        let info = VideoInfo::builder(VideoFormat::Nv21, 8, 4).build().unwrap();
        let planes = planes_from_info(&info).unwrap();
        assert_eq!(planes.v.pixel_stride, 2);
        assert_eq!(planes.u.offset, planes.v.offset + 1);
    }

    #[test]
    fn test_i420_planes_are_separate() {
        gstreamer::init().unwrap();
        let info = VideoInfo::builder(VideoFormat::I420, 8, 4).build().unwrap();
        let planes = planes_from_info(&info).unwrap();
        assert_eq!(planes.u.pixel_stride, 1);
        assert!(planes.v.offset > planes.u.offset);
    }
}
