// SPDX-License-Identifier: GPL-3.0-only

//! Windowed viewer
//!
//! The winit event loop is the UI context: it owns the
//! [`PipelineController`] and the [`Display`]. Capture-thread events arrive
//! as user events through an [`EventLoopProxy`]; a published frame turns
//! into a redraw request.

use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::config::Config;
use crate::constants::{capture, render};
use crate::errors::{AppError, AppResult};
use crate::pipeline::{
    FrameBufferExchange, FrameRateCounter, Notice, NoticeKind, PipelineController,
    PipelineEvent, PipelineObserver, PipelineState,
};
use crate::processing::ProcessorKind;
use crate::render::{Display, DrawOutcome, WgpuRenderer};
use crate::snapshot;

/// Title text: state, processor, frame size, optional rates and the last notice
fn window_title(
    state: PipelineState,
    processor: ProcessorKind,
    frame_size: Option<(u32, u32)>,
    rates: Option<(Option<f32>, Option<f32>)>,
    notice: Option<&Notice>,
) -> String {
    let mut title = format!(
        "{} [{}] {}",
        render::WINDOW_TITLE,
        state,
        processor.display_name()
    );
    if let Some((width, height)) = frame_size {
        title.push_str(&format!(" {}x{}", width, height));
    }
    if let Some((processed, drawn)) = rates {
        let fps = |rate: Option<f32>| rate.map_or_else(|| "-".to_string(), |r| format!("{:.1}", r));
        title.push_str(&format!(
            " | processed {} fps | drawn {} fps",
            fps(processed),
            fps(drawn)
        ));
    }
    if let Some(notice) = notice {
        let marker = match notice.kind {
            NoticeKind::Info => "",
            NoticeKind::Error => "error: ",
        };
        title.push_str(&format!(" | {}{}", marker, notice.message));
    }
    title
}

/// Forwards pipeline events into the winit event loop
struct ProxyObserver {
    proxy: Mutex<EventLoopProxy<PipelineEvent>>,
}

impl PipelineObserver for ProxyObserver {
    fn on_event(&self, event: PipelineEvent) {
        let proxy = match self.proxy.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if proxy.send_event(event).is_err() {
            debug!("Event loop closed, dropping pipeline event");
        }
    }
}

pub struct ViewerApp {
    config: Config,
    controller: PipelineController,
    display: Display<WgpuRenderer>,
    window: Option<Arc<Window>>,
    processed_fps: FrameRateCounter,
    draw_fps: FrameRateCounter,
    last_notice: Option<Notice>,
    exit_error: Option<AppError>,
}

impl ViewerApp {
    fn new(config: Config, observer: Arc<dyn PipelineObserver>) -> Self {
        let exchange = FrameBufferExchange::new();
        let controller = PipelineController::from_config(&config, exchange.clone(), observer);
        Self {
            config,
            controller,
            display: Display::new(exchange),
            window: None,
            processed_fps: FrameRateCounter::default(),
            draw_fps: FrameRateCounter::default(),
            last_notice: None,
            exit_error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        error!(error = %err, "Viewer failed");
        self.controller.shutdown();
        self.display.release_gpu_resources();
        self.exit_error = Some(err);
        event_loop.exit();
    }

    fn update_title(&self) {
        let Some(window) = self.window.as_ref() else {
            return;
        };

        let rates = self
            .config
            .show_stats
            .then(|| (self.processed_fps.rate(), self.draw_fps.rate()));
        let title = window_title(
            self.controller.state(),
            self.config.processor,
            self.controller.exchange().current_size(),
            rates,
            self.last_notice.as_ref(),
        );
        window.set_title(&title);
    }

    fn save_snapshot(&mut self) {
        let Some(current) = self.controller.exchange().latest() else {
            self.last_notice = Some(Notice::error("No frame to save"));
            self.update_title();
            return;
        };
        let notice = match snapshot::save_png(&current.frame, &self.config.snapshot_dir()) {
            Ok(path) => Notice::info(format!("Saved {}", path.display())),
            Err(e) => {
                warn!(error = %e, "Snapshot failed");
                Notice::error(format!("Snapshot failed: {}", e))
            }
        };
        self.last_notice = Some(notice);
        self.update_title();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::Space) => {
                self.controller.toggle();
                self.processed_fps.reset();
                self.update_title();
            }
            PhysicalKey::Code(KeyCode::KeyS) => self.save_snapshot(),
            PhysicalKey::Code(KeyCode::Escape) => self.close(event_loop),
            _ => {}
        }
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        info!("Closing viewer");
        self.controller.shutdown();
        self.display.release_gpu_resources();
        self.window = None;
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        match self.display.on_draw_frame() {
            Ok(DrawOutcome::NoSurface) => {}
            Ok(outcome) => {
                let ticked = self.draw_fps.tick(Instant::now()).is_some();
                // A reallocation means the frame size changed
                if ticked || outcome == DrawOutcome::Reallocated {
                    self.update_title();
                }
            }
            Err(e) => self.fail(event_loop, e.into()),
        }
    }
}

impl ApplicationHandler<PipelineEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(render::WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(capture::WIDTH, capture::HEIGHT));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, AppError::Other(format!("Failed to create window: {}", e)));
                return;
            }
        };

        let renderer = match pollster::block_on(WgpuRenderer::new(Arc::clone(&window))) {
            Ok(renderer) => renderer,
            Err(e) => {
                self.fail(event_loop, e.into());
                return;
            }
        };
        info!(adapter = renderer.adapter_name(), "Renderer ready");

        let size = window.inner_size();
        self.window = Some(window);
        self.display.on_surface_created(renderer);
        self.display.on_surface_changed(size.width, size.height);
        self.controller.surface_created();
        self.update_title();
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        debug!("Viewer suspended");
        self.controller.surface_destroyed();
        self.display.release_gpu_resources();
        self.window = None;
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: PipelineEvent) {
        self.controller.handle_event(&event);
        match event {
            PipelineEvent::FrameReady { .. } => {
                if self.processed_fps.tick(Instant::now()).is_some() {
                    self.update_title();
                }
                if let Some(window) = self.window.as_ref() {
                    window.request_redraw();
                }
            }
            PipelineEvent::Notice(notice) => {
                self.last_notice = Some(notice);
                self.update_title();
            }
            PipelineEvent::SessionConfigured { .. } | PipelineEvent::SessionFailed { .. } => {
                self.update_title();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.close(event_loop),
            WindowEvent::Resized(size) => {
                self.display.on_surface_changed(size.width, size.height);
                if let Some(window) = self.window.as_ref() {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.controller.shutdown();
    }
}

/// Open the viewer window and run until it is closed
pub fn run(config: Config) -> AppResult<()> {
    let event_loop = EventLoop::<PipelineEvent>::with_user_event()
        .build()
        .map_err(|e| AppError::Other(format!("Failed to create event loop: {}", e)))?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let observer = Arc::new(ProxyObserver {
        proxy: Mutex::new(event_loop.create_proxy()),
    });
    let mut app = ViewerApp::new(config, observer);

    event_loop
        .run_app(&mut app)
        .map_err(|e| AppError::Other(format!("Event loop error: {}", e)))?;

    match app.exit_error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
