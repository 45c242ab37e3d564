// SPDX-License-Identifier: GPL-3.0-only

//! Capture-thread frame handler
//!
//! One [`CaptureWorker`] exists per start/stop cycle. It is created on the
//! capture thread, runs one acquire/convert/process/release step per loop
//! iteration and closes its session when dropped on that same thread.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::controller::{Notice, PipelineEvent, PipelineObserver};
use super::exchange::FrameBufferExchange;
use crate::backends::camera::frame_loop::{LoopAction, StopSignal};
use crate::backends::camera::{
    AcquireOutcome, BackendResult, CameraBackend, CameraDevice, CaptureFormat, CaptureSession,
};
use crate::constants::{pipeline, timing};
use crate::media::{ConvertedFrame, convert_into};
use crate::processing::{FrameTransform, ProcessingBridge};

/// Everything the capture thread owns for one cycle
pub struct CaptureWorker {
    session: Box<dyn CaptureSession>,
    bridge: ProcessingBridge,
    converted: ConvertedFrame,
    observer: Arc<dyn PipelineObserver>,
    cycle: u64,
    frames: u64,
}

impl CaptureWorker {
    /// Open the device, configure the session and start repeating capture
    pub fn open(
        backend: &dyn CameraBackend,
        device: &CameraDevice,
        format: &CaptureFormat,
        transform: Box<dyn FrameTransform>,
        exchange: FrameBufferExchange,
        observer: Arc<dyn PipelineObserver>,
        cycle: u64,
    ) -> BackendResult<Self> {
        let mut session = backend.open(device, format)?;
        observer.on_event(PipelineEvent::Notice(Notice::info("Camera opened")));

        if let Err(e) = session.start_repeating() {
            session.close();
            return Err(e);
        }

        let bridge = ProcessingBridge::new(transform, exchange);
        info!(
            cycle,
            device = %device.name,
            format = %format,
            processor = bridge.transform_name(),
            "Capture session running"
        );
        Ok(Self {
            session,
            bridge,
            converted: ConvertedFrame::default(),
            observer,
            cycle,
            frames: 0,
        })
    }

    /// Handle one capture-ready event
    pub fn step(&mut self, stop: &StopSignal) -> LoopAction {
        let frame = match self.session.acquire_latest(pipeline::ACQUIRE_TIMEOUT) {
            Ok(AcquireOutcome::Frame(frame)) => frame,
            Ok(AcquireOutcome::NoFrame) => return LoopAction::Continue,
            Err(e) => {
                error!(cycle = self.cycle, error = %e, "Capture session failed");
                self.observer.on_event(PipelineEvent::SessionFailed {
                    cycle: self.cycle,
                    error: e,
                });
                return LoopAction::Stop;
            }
        };

        if stop.is_set() {
            debug!(frame = frame.sequence, "Stop requested, frame released unprocessed");
            frame.release();
            return LoopAction::Stop;
        }

        self.frames += 1;
        let result = match convert_into(&frame, &mut self.converted) {
            Ok(()) => self.bridge.process(&self.converted).map(Some),
            Err(e) => {
                warn!(frame = frame.sequence, error = %e, "Frame conversion failed");
                Ok(None)
            }
        };
        let sequence = frame.sequence;
        let captured_at = frame.captured_at;
        frame.release();

        if let Ok(Some(generation)) = result {
            if self.frames % timing::FRAME_LOG_INTERVAL == 0 {
                debug!(
                    cycle = self.cycle,
                    generation,
                    frame = sequence,
                    frames = self.frames,
                    latency_ms = captured_at.elapsed().as_secs_f64() * 1000.0,
                    "Frame ready"
                );
            }
            self.observer
                .on_event(PipelineEvent::FrameReady { generation });
        }

        LoopAction::Continue
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        debug!(
            cycle = self.cycle,
            frames = self.frames,
            processed = self.bridge.processed_count(),
            failed = self.bridge.failed_count(),
            "Closing capture session"
        );
        self.session.stop_repeating();
        self.session.close();
    }
}
