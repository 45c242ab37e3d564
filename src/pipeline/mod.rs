// SPDX-License-Identifier: GPL-3.0-only

//! Frame pipeline
//!
//! ```text
//!  capture thread                                   render context
//!  ─────────────────────────────────────────────    ─────────────────
//!  acquire latest ─▶ convert ─▶ process ─▶ publish ─▶ FrameBufferExchange ─▶ draw
//!        ▲                                   │
//!        └──────── release RawFrame ◀────────┘
//! ```
//!
//! - [`controller`]: lifecycle state machine on the UI context
//! - [`worker`]: per-cycle capture-thread handler
//! - [`exchange`]: single-slot latest-wins hand-off
//! - [`stats`]: frame-rate counters

pub mod controller;
pub mod exchange;
pub mod stats;
pub mod worker;

pub use controller::{
    Notice, NoticeKind, PipelineController, PipelineEvent, PipelineObserver, PipelineSettings,
    PipelineState, TransformFactory,
};
pub use exchange::{ExchangeStats, FrameBufferExchange, FrameDescriptor};
pub use stats::FrameRateCounter;
