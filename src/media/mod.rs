// SPDX-License-Identifier: MPL-2.0

//! Media processing utilities
//!
//! # Color Space Conversion
//!
//! Camera frames arrive as multi-plane YUV 4:2:0 with device-specific
//! strides. The [`yuv_converter`] module repacks them into the single NV21
//! buffer the processing stage consumes.

pub mod yuv_converter;

pub use yuv_converter::{ConvertedFrame, convert, convert_into, nv21_len};
