// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use gstreamer::buffer::{MappedBuffer, Readable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::errors::ConversionError;

/// Frame data storage - either pre-copied bytes or zero-copy GStreamer buffer
///
/// The `Mapped` variant keeps the GStreamer buffer mapped and alive until the
/// owning [`RawFrame`] is released.
#[derive(Clone)]
pub enum FrameData {
    /// Owned bytes (synthetic source, tests)
    Copied(Arc<[u8]>),
    /// Zero-copy mapped GStreamer buffer
    Mapped(Arc<MappedBuffer<Readable>>),
}

impl FrameData {
    /// Create FrameData from a mapped GStreamer buffer (zero-copy)
    pub fn from_mapped_buffer(buffer: MappedBuffer<Readable>) -> Self {
        FrameData::Mapped(Arc::new(buffer))
    }

    /// Get the length of the frame data in bytes
    pub fn len(&self) -> usize {
        match self {
            FrameData::Copied(data) => data.len(),
            FrameData::Mapped(buf) => buf.len(),
        }
    }

    /// Check if the frame data is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<u8>> for FrameData {
    fn from(bytes: Vec<u8>) -> Self {
        FrameData::Copied(Arc::from(bytes))
    }
}

impl std::fmt::Debug for FrameData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameData::Copied(data) => write!(f, "FrameData::Copied({} bytes)", data.len()),
            FrameData::Mapped(buf) => write!(f, "FrameData::Mapped({} bytes)", buf.len()),
        }
    }
}

impl AsRef<[u8]> for FrameData {
    fn as_ref(&self) -> &[u8] {
        match self {
            FrameData::Copied(data) => data.as_ref(),
            FrameData::Mapped(buf) => buf.as_slice(),
        }
    }
}

impl std::ops::Deref for FrameData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_ref()
    }
}

/// Identifies one plane of a 4:2:0 capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneKind {
    Luma,
    ChromaU,
    ChromaV,
}

impl PlaneKind {
    pub fn name(&self) -> &'static str {
        match self {
            PlaneKind::Luma => "Luma",
            PlaneKind::ChromaU => "Chroma U",
            PlaneKind::ChromaV => "Chroma V",
        }
    }
}

/// Location and layout of one plane inside a frame buffer
///
/// `pixel_stride` is the distance in bytes between two consecutive samples of
/// the same row. It is 1 for planar data and 2 when U and V share one
/// interleaved buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plane {
    /// Offset of the first sample in bytes from the start of the buffer
    pub offset: usize,
    /// Bytes between the start of two consecutive rows
    pub row_stride: usize,
    /// Bytes between two consecutive samples in a row
    pub pixel_stride: usize,
}

impl Plane {
    pub fn new(offset: usize, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            offset,
            row_stride,
            pixel_stride,
        }
    }

    /// Number of bytes from `offset` that must be addressable for a plane
    /// of `width` x `height` samples. The last row need not be padded.
    pub fn required_len(&self, width: usize, height: usize) -> usize {
        if width == 0 || height == 0 {
            return 0;
        }
        (height - 1) * self.row_stride + (width - 1) * self.pixel_stride + 1
    }
}

/// Planes of a 4:2:0 capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YuvPlanes {
    pub y: Plane,
    pub u: Plane,
    pub v: Plane,
}

impl YuvPlanes {
    pub fn get(&self, kind: PlaneKind) -> &Plane {
        match kind {
            PlaneKind::Luma => &self.y,
            PlaneKind::ChromaU => &self.u,
            PlaneKind::ChromaV => &self.v,
        }
    }
}

/// Half-resolution chroma extent for a luma size (rounded up)
pub fn chroma_extent(width: u32, height: u32) -> (u32, u32) {
    (width.div_ceil(2), height.div_ceil(2))
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// One capture from the device
///
/// The frame borrows device memory until [`RawFrame::release`] is called.
/// Release consumes the frame, so planes cannot be read afterwards. A frame
/// that is dropped without an explicit release is released on drop, which
/// keeps the release exactly-once on every path.
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// Monotonic capture counter assigned by the session
    pub sequence: u64,
    /// Timestamp when the frame was acquired
    pub captured_at: Instant,
    data: Option<FrameData>,
    planes: YuvPlanes,
    release: Option<ReleaseHook>,
}

impl RawFrame {
    /// Build a frame after checking every plane fits inside `data`.
    pub fn new(
        width: u32,
        height: u32,
        data: FrameData,
        planes: YuvPlanes,
        sequence: u64,
    ) -> Result<Self, ConversionError> {
        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions { width, height });
        }

        let (cw, ch) = chroma_extent(width, height);
        let extents = [
            (PlaneKind::Luma, width as usize, height as usize),
            (PlaneKind::ChromaU, cw as usize, ch as usize),
            (PlaneKind::ChromaV, cw as usize, ch as usize),
        ];

        for (kind, w, h) in extents {
            let plane = planes.get(kind);
            if plane.pixel_stride == 0 || plane.row_stride < (w - 1) * plane.pixel_stride + 1 {
                return Err(ConversionError::InvalidStride {
                    plane: kind.name(),
                    stride: plane.row_stride,
                });
            }
            let required = plane.offset + plane.required_len(w, h);
            if required > data.len() {
                return Err(ConversionError::PlaneOutOfBounds {
                    plane: kind.name(),
                    required,
                    available: data.len(),
                });
            }
        }

        Ok(Self {
            width,
            height,
            sequence,
            captured_at: Instant::now(),
            data: Some(data),
            planes,
            release: None,
        })
    }

    /// Attach the callback that hands the buffer back to the device.
    pub fn with_release(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(hook));
        self
    }

    pub fn planes(&self) -> &YuvPlanes {
        &self.planes
    }

    pub fn plane(&self, kind: PlaneKind) -> &Plane {
        self.planes.get(kind)
    }

    /// Whole backing buffer. Plane offsets index into this slice.
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    /// Return the buffer to the device.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        // Unmap before notifying the device so the buffer is free on return
        self.data = None;
        if let Some(hook) = self.release.take() {
            hook();
        }
    }
}

impl Drop for RawFrame {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("planes", &self.planes)
            .field("data", &self.data)
            .finish()
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    /// Device node (e.g. `/dev/video0`) or backend-specific identifier
    pub path: String,
    /// Camera location: "front", "back", or "external", when known
    pub location: Option<String>,
}

/// Capture format requested when opening a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            width: crate::constants::capture::WIDTH,
            height: crate::constants::capture::HEIGHT,
            framerate: crate::constants::capture::FRAMERATE,
        }
    }
}

impl std::fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} @ {}fps", self.width, self.height, self.framerate)
    }
}

/// Result of checking whether the process may use the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Result of one capture-ready wait
#[derive(Debug)]
pub enum AcquireOutcome {
    /// The most recent frame; older queued frames were dropped
    Frame(RawFrame),
    /// Nothing arrived within the timeout
    NoFrame,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// The user or system refused camera access
    PermissionDenied(String),
    /// Failed to initialize backend
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// Device went away or reported a streaming error
    Disconnected(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::PermissionDenied(msg) => write!(f, "Camera permission denied: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Camera config failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::Disconnected(msg) => write!(f, "Camera disconnected: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn planar_4x4() -> (FrameData, YuvPlanes) {
        let data: Vec<u8> = (0..24).collect();
        let planes = YuvPlanes {
            y: Plane::new(0, 4, 1),
            u: Plane::new(16, 2, 1),
            v: Plane::new(20, 2, 1),
        };
        (data.into(), planes)
    }

    #[test]
    fn test_release_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let (data, planes) = planar_4x4();
        let c = Arc::clone(&count);
        let frame = RawFrame::new(4, 4, data, planes, 0)
            .unwrap()
            .with_release(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        frame.release();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let count = Arc::new(AtomicUsize::new(0));
        let (data, planes) = planar_4x4();
        let c = Arc::clone(&count);
        {
            let _frame = RawFrame::new(4, 4, data, planes, 0)
                .unwrap()
                .with_release(move || {
                    c.fetch_add(1, Ordering::SeqCst);
                });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_plane_out_of_bounds_rejected() {
        let (_, planes) = planar_4x4();
        let short: FrameData = vec![0u8; 20].into();
        let err = RawFrame::new(4, 4, short, planes, 0).unwrap_err();
        assert!(matches!(err, ConversionError::PlaneOutOfBounds { .. }));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let (data, planes) = planar_4x4();
        assert!(matches!(
            RawFrame::new(0, 4, data, planes, 0),
            Err(ConversionError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_required_len_skips_last_row_padding() {
        let plane = Plane::new(0, 8, 2);
        // 3 rows, 2 samples wide: two full rows plus (1 * 2 + 1) bytes
        assert_eq!(plane.required_len(2, 3), 19);
    }
}
