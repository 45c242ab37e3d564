// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for the capture context
//!
//! Every capture-ready wait, conversion and processing call happens on one
//! dedicated background thread owned by a [`CaptureLoopController`]. Because
//! the loop body runs sequentially on that thread, the frame handler is never
//! entered concurrently with itself.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use super::types::{BackendError, BackendResult};

/// Action returned by the capture loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Shared flag used to ask the capture thread to wind down
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Controller for a capture loop running in a separate thread
///
/// ```ignore
/// let controller = CaptureLoopController::start_with_init(
///     "capture",
///     || open_session(),
///     |session, stop| {
///         if let Some(frame) = session.next() {
///             if !stop.is_set() {
///                 handle(frame);
///             }
///         }
///         LoopAction::Continue
///     },
/// )?;
///
/// controller.stop();
/// ```
pub struct CaptureLoopController {
    /// Thread handle for joining
    thread_handle: Option<JoinHandle<()>>,
    /// Signal to stop the loop
    stop_signal: StopSignal,
    /// Name for logging
    name: String,
}

impl CaptureLoopController {
    /// Start a capture loop with initialization
    ///
    /// `init_fn` runs once on the new thread to open resources. If it fails
    /// the thread exits without running the loop. The state it returns is
    /// dropped on the capture thread when the loop ends, so teardown of
    /// device resources happens on the same context that created them.
    ///
    /// `loop_fn` is called repeatedly until it returns [`LoopAction::Stop`] or
    /// the stop signal is raised. It receives the stop signal so it can skip
    /// work for a frame that arrived after a stop request.
    pub fn start_with_init<S, E, I, F>(
        name: &str,
        init_fn: I,
        mut loop_fn: F,
    ) -> BackendResult<Self>
    where
        S: Send + 'static,
        E: fmt::Display,
        I: FnOnce() -> Result<S, E> + Send + 'static,
        F: FnMut(&mut S, &StopSignal) -> LoopAction + Send + 'static,
    {
        let stop_signal = StopSignal::new();
        let thread_stop = stop_signal.clone();
        let name_clone = name.to_string();

        info!(name = %name, "Starting capture loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(name = %name_clone, "Capture loop thread started, initializing...");

                let mut state = match init_fn() {
                    Ok(s) => {
                        debug!(name = %name_clone, "Initialization successful");
                        s
                    }
                    Err(e) => {
                        warn!(name = %name_clone, error = %e, "Initialization failed");
                        return;
                    }
                };

                loop {
                    if thread_stop.is_set() {
                        debug!(name = %name_clone, "Stop signal received");
                        break;
                    }

                    match loop_fn(&mut state, &thread_stop) {
                        LoopAction::Continue => {}
                        LoopAction::Stop => {
                            debug!(name = %name_clone, "Loop requested stop");
                            break;
                        }
                    }
                }

                drop(state);
                info!(name = %name_clone, "Capture loop thread exiting");
            })
            .map_err(|e| {
                BackendError::InitializationFailed(format!("failed to spawn {}: {}", name, e))
            })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop (non-blocking)
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting capture loop stop");
        self.stop_signal.set();
    }

    /// Stop the loop and wait for the thread to finish
    ///
    /// An iteration already in progress runs to completion before the
    /// thread observes the signal.
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.thread().id() == thread::current().id() {
                // Dropped from inside its own loop; joining would deadlock
                warn!(name = %self.name, "Capture loop stopped from its own thread, detaching");
                return;
            }
            debug!(name = %self.name, "Waiting for capture loop thread to finish");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Capture loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Capture loop thread finished");
            }
        }
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}
