// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline lifecycle
//!
//! ```text
//!            surface + permission            session configured
//!  Stopped ───────────────────────▶ Starting ──────────────────▶ Running
//!     ▲                                │                            │
//!     │          session error         │           pause            │
//!     ├────────────────────────────────┘                            ▼
//!     └──────────────────────────── teardown joined ◀────────── Pausing
//! ```
//!
//! The controller lives on the UI context. It starts the capture thread,
//! learns about the session through [`PipelineEvent`]s delivered by its
//! observer and feeds those events back in through
//! [`PipelineController::handle_event`]. Capture errors become notices and a
//! return to `Stopped`; they never reach the render side.

use std::sync::{Arc, mpsc};
use tracing::{debug, error, info, warn};

use super::exchange::FrameBufferExchange;
use super::worker::CaptureWorker;
use crate::backends::camera::frame_loop::CaptureLoopController;
use crate::backends::camera::{
    BackendError, CameraBackend, CaptureFormat, PermissionStatus, create_backend,
};
use crate::config::Config;
use crate::processing::{FrameTransform, build_transform};

/// Capture thread name
const CAPTURE_THREAD: &str = "camera-capture";

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Stopped,
    Starting,
    Running,
    Pausing,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineState::Stopped => "Stopped",
            PipelineState::Starting => "Starting",
            PipelineState::Running => "Running",
            PipelineState::Pausing => "Pausing",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// User-visible status message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// Signals sent from the pipeline to the UI context
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A processed frame was published; request a redraw
    FrameReady { generation: u64 },
    /// The session of `cycle` accepted the repeating request
    SessionConfigured { cycle: u64 },
    /// The session of `cycle` failed to configure or stopped with an error
    SessionFailed { cycle: u64, error: BackendError },
    Notice(Notice),
}

/// Receives pipeline events, possibly from the capture thread
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: PipelineEvent);
}

impl PipelineObserver for mpsc::Sender<PipelineEvent> {
    fn on_event(&self, event: PipelineEvent) {
        // Receiver gone means the UI is shutting down
        let _ = self.send(event);
    }
}

/// Builds a fresh transform for every capture cycle
pub type TransformFactory = Arc<dyn Fn() -> Box<dyn FrameTransform> + Send + Sync>;

/// What to open when the pipeline starts
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    /// Explicit device path, or `None` for automatic selection
    pub device: Option<String>,
    pub format: CaptureFormat,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            device: config.device_path.clone(),
            format: CaptureFormat {
                width: config.capture.width,
                height: config.capture.height,
                framerate: config.capture.framerate,
            },
        }
    }
}

/// Owns the capture lifecycle
pub struct PipelineController {
    backend: Arc<dyn CameraBackend>,
    settings: PipelineSettings,
    exchange: FrameBufferExchange,
    transform_factory: TransformFactory,
    observer: Arc<dyn PipelineObserver>,
    state: PipelineState,
    surface_ready: bool,
    wants_running: bool,
    /// Incremented on every start so events from an old session are ignored
    cycle: u64,
    capture: Option<CaptureLoopController>,
}

impl PipelineController {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        settings: PipelineSettings,
        exchange: FrameBufferExchange,
        transform_factory: TransformFactory,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            backend,
            settings,
            exchange,
            transform_factory,
            observer,
            state: PipelineState::Stopped,
            surface_ready: false,
            wants_running: true,
            cycle: 0,
            capture: None,
        }
    }

    /// Controller for the backend and transform named by `config`
    pub fn from_config(
        config: &Config,
        exchange: FrameBufferExchange,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        let transform_config = config.clone();
        let factory: TransformFactory = Arc::new(move || build_transform(&transform_config));
        Self::new(
            create_backend(config),
            PipelineSettings::from_config(config),
            exchange,
            factory,
            observer,
        )
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn exchange(&self) -> &FrameBufferExchange {
        &self.exchange
    }

    /// True while the capture thread is alive
    pub fn is_capture_active(&self) -> bool {
        self.capture.as_ref().is_some_and(|c| c.is_running())
    }

    /// The display surface exists; start if the user wants capture
    pub fn surface_created(&mut self) {
        debug!("Display surface created");
        self.surface_ready = true;
        self.notify(Notice::info("Surface ready"));
        self.try_start();
    }

    /// The display surface is gone; capture has nowhere to go
    pub fn surface_destroyed(&mut self) {
        debug!("Display surface destroyed");
        self.surface_ready = false;
        self.teardown();
    }

    /// Request capture. Starts immediately when the surface is ready.
    pub fn resume(&mut self) {
        info!("Resume requested");
        self.wants_running = true;
        self.try_start();
    }

    /// Stop capture and wait for the capture thread to exit
    ///
    /// A processing call already in flight completes; its frame may still
    /// be published. No frame acquired after this call is processed.
    pub fn pause(&mut self) {
        info!("Pause requested");
        self.wants_running = false;
        self.teardown();
    }

    /// Toggle between paused and running
    pub fn toggle(&mut self) {
        match self.state {
            PipelineState::Stopped => self.resume(),
            _ => self.pause(),
        }
    }

    /// Stop capture and drop the last processed frame
    pub fn shutdown(&mut self) {
        self.pause();
        self.exchange.clear();
    }

    /// Apply an event produced by the capture thread
    pub fn handle_event(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::SessionConfigured { cycle } => {
                if *cycle != self.cycle || self.state != PipelineState::Starting {
                    debug!(cycle, current = self.cycle, "Ignoring stale session event");
                    return;
                }
                info!(cycle, "Capture running");
                self.state = PipelineState::Running;
                self.notify(Notice::info("Camera started"));
            }
            PipelineEvent::SessionFailed { cycle, error } => {
                if *cycle != self.cycle
                    || !matches!(self.state, PipelineState::Starting | PipelineState::Running)
                {
                    debug!(cycle, current = self.cycle, "Ignoring stale session failure");
                    return;
                }
                warn!(cycle, error = %error, "Capture session ended with error");
                // No automatic retry; the user resumes explicitly
                self.wants_running = false;
                self.teardown();
                self.notify(Notice::error(error.to_string()));
            }
            PipelineEvent::FrameReady { .. } | PipelineEvent::Notice(_) => {}
        }
    }

    fn try_start(&mut self) {
        if self.state != PipelineState::Stopped || !self.surface_ready || !self.wants_running {
            return;
        }

        let device = match self.backend.select_device(self.settings.device.as_deref()) {
            Ok(device) => device,
            Err(e) => {
                warn!(error = %e, "No camera to open");
                self.wants_running = false;
                self.notify(Notice::error(match e {
                    BackendError::DeviceNotFound(_) if self.settings.device.is_none() => {
                        "No camera found".to_string()
                    }
                    other => other.to_string(),
                }));
                return;
            }
        };

        if self.backend.check_permission(&device) == PermissionStatus::Denied {
            warn!(device = %device.path, "Camera permission denied");
            self.wants_running = false;
            self.notify(Notice::error("Camera permission denied"));
            return;
        }

        self.cycle += 1;
        let cycle = self.cycle;
        self.state = PipelineState::Starting;
        info!(cycle, device = %device.name, backend = self.backend.name(), "Starting capture");

        let backend = Arc::clone(&self.backend);
        let format = self.settings.format;
        let factory = Arc::clone(&self.transform_factory);
        let exchange = self.exchange.clone();
        let observer = Arc::clone(&self.observer);
        let init_observer = Arc::clone(&self.observer);

        let started = CaptureLoopController::start_with_init(
            CAPTURE_THREAD,
            move || {
                let opened = CaptureWorker::open(
                    backend.as_ref(),
                    &device,
                    &format,
                    factory(),
                    exchange,
                    observer,
                    cycle,
                );
                match &opened {
                    Ok(_) => init_observer.on_event(PipelineEvent::SessionConfigured { cycle }),
                    Err(e) => init_observer.on_event(PipelineEvent::SessionFailed {
                        cycle,
                        error: e.clone(),
                    }),
                }
                opened
            },
            |worker, stop| worker.step(stop),
        );

        match started {
            Ok(capture) => self.capture = Some(capture),
            Err(e) => {
                error!(error = %e, "Failed to start capture thread");
                self.state = PipelineState::Stopped;
                self.wants_running = false;
                self.notify(Notice::error(e.to_string()));
            }
        }
    }

    fn teardown(&mut self) {
        let Some(mut capture) = self.capture.take() else {
            self.state = PipelineState::Stopped;
            return;
        };

        self.state = PipelineState::Pausing;
        debug!(cycle = self.cycle, "Stopping capture thread");
        capture.stop();
        self.state = PipelineState::Stopped;
        info!(cycle = self.cycle, "Capture stopped");
    }

    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Info => info!(message = %notice.message, "Notice"),
            NoticeKind::Error => warn!(message = %notice.message, "Notice"),
        }
        self.observer.on_event(PipelineEvent::Notice(notice));
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        if self.capture.is_some() {
            debug!("PipelineController dropped, stopping capture");
            self.shutdown();
        }
    }
}
