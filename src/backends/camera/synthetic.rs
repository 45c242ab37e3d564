// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic camera backend
//!
//! Produces a moving test pattern in any 4:2:0 plane layout a real sensor
//! might report. Used by `--synthetic`, by headless runs on machines without
//! a camera, and by the pipeline tests, which rely on its counters to check
//! open/close pairing and buffer release.

use super::types::*;
use super::{CameraBackend, CaptureSession};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How the two chroma planes are laid out in the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaLayout {
    /// Separate U and V planes (I420)
    Planar,
    /// One interleaved plane, V first (NV21)
    SemiPlanarVu,
    /// One interleaved plane, U first (NV12)
    SemiPlanarUv,
}

/// Behaviour knobs for the synthetic source
#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    /// Result reported by the permission check
    pub permission: PermissionStatus,
    pub layout: ChromaLayout,
    /// Extra bytes appended to every row of every plane
    pub row_padding: usize,
    /// Simulated sensor frame period; zero delivers a frame on every acquire
    pub frame_interval: Duration,
    /// Frame sizes to cycle through instead of the requested format
    pub sizes: Vec<(u32, u32)>,
    /// Fail `start_repeating` as a rejected session configuration
    pub fail_configure: bool,
    /// Report a disconnect after this many delivered frames
    pub disconnect_after: Option<u64>,
    /// Devices reported by enumeration
    pub devices: Vec<CameraDevice>,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            layout: ChromaLayout::Planar,
            row_padding: 0,
            frame_interval: Duration::from_secs(1) / crate::constants::capture::FRAMERATE,
            sizes: Vec::new(),
            fail_configure: false,
            disconnect_after: None,
            devices: vec![CameraDevice {
                name: "Synthetic test pattern".to_string(),
                path: "synthetic:0".to_string(),
                location: Some("back".to_string()),
            }],
        }
    }
}

/// Counters shared between the backend and every session it opened
#[derive(Debug, Default)]
pub struct SyntheticStats {
    pub opened: AtomicU64,
    pub closed: AtomicU64,
    pub started: AtomicU64,
    pub delivered: AtomicU64,
    pub released: AtomicU64,
    pub dropped_stale: AtomicU64,
    /// Frames acquired but not yet released
    pub outstanding: AtomicU64,
    /// Highest value `outstanding` ever reached
    pub max_outstanding: AtomicU64,
    /// Set while any session is open
    pub session_open: AtomicBool,
}

impl SyntheticStats {
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::SeqCst)
    }
}

/// Test-pattern camera backend
#[derive(Debug)]
pub struct SyntheticBackend {
    options: SyntheticOptions,
    stats: Arc<SyntheticStats>,
}

impl SyntheticBackend {
    pub fn new(options: SyntheticOptions) -> Self {
        Self {
            options,
            stats: Arc::new(SyntheticStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<SyntheticStats> {
        Arc::clone(&self.stats)
    }
}

impl CameraBackend for SyntheticBackend {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.options.devices.clone()
    }

    fn check_permission(&self, _device: &CameraDevice) -> PermissionStatus {
        self.options.permission
    }

    fn open(
        &self,
        device: &CameraDevice,
        format: &CaptureFormat,
    ) -> BackendResult<Box<dyn CaptureSession>> {
        if !self.options.devices.iter().any(|d| d.path == device.path) {
            return Err(BackendError::DeviceNotFound(device.path.clone()));
        }

        info!(device = %device.name, format = %format, "Opening synthetic camera");
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        self.stats.session_open.store(true, Ordering::SeqCst);

        let sizes = if self.options.sizes.is_empty() {
            vec![(format.width, format.height)]
        } else {
            self.options.sizes.clone()
        };

        Ok(Box::new(SyntheticSession {
            options: self.options.clone(),
            sizes,
            stats: Arc::clone(&self.stats),
            started_at: None,
            next_index: 0,
            sequence: 0,
            closed: false,
        }))
    }
}

struct SyntheticSession {
    options: SyntheticOptions,
    sizes: Vec<(u32, u32)>,
    stats: Arc<SyntheticStats>,
    started_at: Option<Instant>,
    /// Index of the next sensor frame that has not been consumed or dropped
    next_index: u64,
    sequence: u64,
    closed: bool,
}

impl SyntheticSession {
    fn due_index(&self, now: Instant) -> Option<u64> {
        let started = self.started_at?;
        if self.options.frame_interval.is_zero() {
            return Some(self.next_index);
        }
        let elapsed = now.duration_since(started).as_nanos();
        Some((elapsed / self.options.frame_interval.as_nanos()) as u64)
    }

    fn make_frame(&mut self) -> BackendResult<RawFrame> {
        let (width, height) = self.sizes[(self.sequence as usize) % self.sizes.len()];
        let (y, u, v) = test_pattern(width, height, self.sequence);
        let frame = frame_from_planes(
            width,
            height,
            &y,
            &u,
            &v,
            self.options.layout,
            self.options.row_padding,
            self.sequence,
        )
        .map_err(|e| BackendError::Other(e.to_string()))?;

        self.sequence += 1;
        self.stats.delivered.fetch_add(1, Ordering::SeqCst);
        let outstanding = self.stats.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats
            .max_outstanding
            .fetch_max(outstanding, Ordering::SeqCst);

        let stats = Arc::clone(&self.stats);
        Ok(frame.with_release(move || {
            stats.outstanding.fetch_sub(1, Ordering::SeqCst);
            stats.released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

impl CaptureSession for SyntheticSession {
    fn start_repeating(&mut self) -> BackendResult<()> {
        if self.options.fail_configure {
            return Err(BackendError::InitializationFailed(
                "synthetic session rejected configuration".to_string(),
            ));
        }
        self.started_at = Some(Instant::now());
        self.stats.started.fetch_add(1, Ordering::SeqCst);
        debug!("Synthetic repeating capture started");
        Ok(())
    }

    fn acquire_latest(&mut self, timeout: Duration) -> BackendResult<AcquireOutcome> {
        if self.started_at.is_none() || self.closed {
            return Ok(AcquireOutcome::NoFrame);
        }
        if let Some(limit) = self.options.disconnect_after
            && self.sequence >= limit
        {
            return Err(BackendError::Disconnected(
                "synthetic device unplugged".to_string(),
            ));
        }

        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            let due = self.due_index(now).unwrap_or(0);
            if due >= self.next_index {
                let skipped = due - self.next_index;
                if skipped > 0 {
                    self.stats.dropped_stale.fetch_add(skipped, Ordering::SeqCst);
                }
                self.next_index = due + 1;
                return self.make_frame().map(AcquireOutcome::Frame);
            }
            if now >= deadline {
                return Ok(AcquireOutcome::NoFrame);
            }
            let started = self.started_at.unwrap_or(now);
            let next_due = started + self.options.frame_interval * self.next_index as u32;
            std::thread::sleep(next_due.min(deadline).saturating_duration_since(now));
        }
    }

    fn stop_repeating(&mut self) {
        debug!("Synthetic repeating capture stopped");
        self.started_at = None;
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        self.stats.session_open.store(false, Ordering::SeqCst);
        info!("Synthetic camera closed");
    }
}

impl Drop for SyntheticSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Moving diagonal gradient with a bright square, so edge transforms have
/// something to find
pub fn test_pattern(width: u32, height: u32, sequence: u64) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let (w, h) = (width as usize, height as usize);
    let (cw, ch) = chroma_extent(width, height);
    let (cw, ch) = (cw as usize, ch as usize);

    let side = (w.min(h) / 4).max(1);
    let sx = (sequence as usize * 4) % w.max(1);
    let sy = h / 2 - side.min(h / 2) / 2;

    let mut y = Vec::with_capacity(w * h);
    for row in 0..h {
        for col in 0..w {
            let inside = col >= sx && col < sx + side && row >= sy && row < sy + side;
            let value = if inside {
                235
            } else {
                ((col + row) * 96 / (w + h).max(1)) as u8 + 16
            };
            y.push(value);
        }
    }

    let u: Vec<u8> = (0..cw * ch).map(|i| 128u8.wrapping_add((i % 32) as u8)).collect();
    let v: Vec<u8> = (0..cw * ch).map(|i| 128u8.wrapping_sub((i % 32) as u8)).collect();
    (y, u, v)
}

/// Pack tightly-ordered Y, U and V samples into a buffer with the requested
/// chroma layout and row padding, and describe it as a [`RawFrame`].
#[allow(clippy::too_many_arguments)]
pub fn frame_from_planes(
    width: u32,
    height: u32,
    y: &[u8],
    u: &[u8],
    v: &[u8],
    layout: ChromaLayout,
    row_padding: usize,
    sequence: u64,
) -> Result<RawFrame, crate::errors::ConversionError> {
    let (w, h) = (width as usize, height as usize);
    let (cw, ch) = chroma_extent(width, height);
    let (cw, ch) = (cw as usize, ch as usize);

    let y_stride = w + row_padding;
    let mut data = Vec::new();
    for row in 0..h {
        data.extend_from_slice(&y[row * w..(row + 1) * w]);
        data.resize(data.len() + row_padding, 0);
    }

    let planes = match layout {
        ChromaLayout::Planar => {
            let c_stride = cw + row_padding;
            let u_offset = data.len();
            for row in 0..ch {
                data.extend_from_slice(&u[row * cw..(row + 1) * cw]);
                data.resize(data.len() + row_padding, 0);
            }
            let v_offset = data.len();
            for row in 0..ch {
                data.extend_from_slice(&v[row * cw..(row + 1) * cw]);
                data.resize(data.len() + row_padding, 0);
            }
            YuvPlanes {
                y: Plane::new(0, y_stride, 1),
                u: Plane::new(u_offset, c_stride, 1),
                v: Plane::new(v_offset, c_stride, 1),
            }
        }
        ChromaLayout::SemiPlanarVu | ChromaLayout::SemiPlanarUv => {
            let c_stride = cw * 2 + row_padding;
            let base = data.len();
            let (first, second) = if layout == ChromaLayout::SemiPlanarVu {
                (v, u)
            } else {
                (u, v)
            };
            for row in 0..ch {
                for col in 0..cw {
                    data.push(first[row * cw + col]);
                    data.push(second[row * cw + col]);
                }
                data.resize(data.len() + row_padding, 0);
            }
            let (u_offset, v_offset) = if layout == ChromaLayout::SemiPlanarVu {
                (base + 1, base)
            } else {
                (base, base + 1)
            };
            YuvPlanes {
                y: Plane::new(0, y_stride, 1),
                u: Plane::new(u_offset, c_stride, 2),
                v: Plane::new(v_offset, c_stride, 2),
            }
        }
    };

    RawFrame::new(width, height, data.into(), planes, sequence)
}
