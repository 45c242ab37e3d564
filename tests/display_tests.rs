// SPDX-License-Identifier: GPL-3.0-only

//! Texture lifecycle tests for the display, using a recording GPU backend

use edge_viewer::errors::RenderError;
use edge_viewer::pipeline::FrameBufferExchange;
use edge_viewer::processing::ProcessedFrame;
use edge_viewer::render::{Display, DrawOutcome, GpuBackend};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Create { id: u32, width: u32, height: u32 },
    Update { id: u32, width: u32, height: u32, first: u8 },
    Resize { width: u32, height: u32 },
    Clear,
    Draw { id: u32 },
}

#[derive(Debug)]
struct FakeTexture {
    id: u32,
}

#[derive(Default, Clone)]
struct RecordingGpu {
    calls: Arc<Mutex<Vec<Call>>>,
    next_id: u32,
}

impl RecordingGpu {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl GpuBackend for RecordingGpu {
    type Texture = FakeTexture;

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<FakeTexture, RenderError> {
        assert_eq!(rgba.len(), (width * height * 4) as usize);
        self.next_id += 1;
        self.record(Call::Create {
            id: self.next_id,
            width,
            height,
        });
        Ok(FakeTexture { id: self.next_id })
    }

    fn update_texture(
        &mut self,
        texture: &mut FakeTexture,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<(), RenderError> {
        self.record(Call::Update {
            id: texture.id,
            width,
            height,
            first: rgba[0],
        });
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.record(Call::Resize { width, height });
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        self.record(Call::Clear);
        Ok(())
    }

    fn draw_textured_quad(&mut self, texture: &FakeTexture) -> Result<(), RenderError> {
        self.record(Call::Draw { id: texture.id });
        Ok(())
    }
}

fn solid(width: u32, height: u32, value: u8, sequence: u64) -> ProcessedFrame {
    let pixels = vec![value; (width * height * 4) as usize];
    ProcessedFrame::new(width, height, pixels, sequence).unwrap()
}

fn display() -> (Display<RecordingGpu>, RecordingGpu, FrameBufferExchange) {
    let exchange = FrameBufferExchange::new();
    let gpu = RecordingGpu::default();
    let mut display = Display::new(exchange.clone());
    display.on_surface_created(gpu.clone());
    (display, gpu, exchange)
}

#[test]
fn test_draw_without_surface_does_nothing() {
    let exchange = FrameBufferExchange::new();
    exchange.publish(solid(4, 4, 1, 0));
    let mut display: Display<RecordingGpu> = Display::new(exchange);
    assert_eq!(display.on_draw_frame().unwrap(), DrawOutcome::NoSurface);
    assert_eq!(display.texture_size(), None);
}

#[test]
fn test_empty_exchange_clears_without_texture_work() {
    let (mut display, gpu, _exchange) = display();

    assert_eq!(display.on_draw_frame().unwrap(), DrawOutcome::Cleared);
    assert_eq!(display.on_draw_frame().unwrap(), DrawOutcome::Cleared);

    assert_eq!(gpu.calls(), vec![Call::Clear, Call::Clear]);
    assert_eq!(display.texture_size(), None);
    assert_eq!(display.reallocations(), 0);
}

#[test]
fn test_same_size_frames_update_in_place() {
    let (mut display, gpu, exchange) = display();

    exchange.publish(solid(100, 100, 10, 0));
    assert_eq!(display.on_draw_frame().unwrap(), DrawOutcome::Reallocated);
    exchange.publish(solid(100, 100, 20, 1));
    assert_eq!(display.on_draw_frame().unwrap(), DrawOutcome::Updated);

    assert_eq!(
        gpu.calls(),
        vec![
            Call::Create {
                id: 1,
                width: 100,
                height: 100
            },
            Call::Draw { id: 1 },
            Call::Update {
                id: 1,
                width: 100,
                height: 100,
                first: 20
            },
            Call::Draw { id: 1 },
        ]
    );
    assert_eq!(display.reallocations(), 1);
}

#[test]
fn test_size_change_reallocates() {
    let (mut display, gpu, exchange) = display();

    exchange.publish(solid(100, 100, 10, 0));
    display.on_draw_frame().unwrap();
    exchange.publish(solid(200, 150, 30, 1));
    assert_eq!(display.on_draw_frame().unwrap(), DrawOutcome::Reallocated);

    assert_eq!(display.texture_size(), Some((200, 150)));
    assert_eq!(display.reallocations(), 2);
    let calls = gpu.calls();
    assert_eq!(
        calls[2],
        Call::Create {
            id: 2,
            width: 200,
            height: 150
        }
    );
    assert_eq!(calls[3], Call::Draw { id: 2 });
    assert!(!calls.iter().any(|c| matches!(c, Call::Update { .. })));
}

#[test]
fn test_unchanged_frame_is_not_uploaded_again() {
    let (mut display, gpu, exchange) = display();

    exchange.publish(solid(8, 8, 5, 0));
    display.on_draw_frame().unwrap();
    assert_eq!(display.on_draw_frame().unwrap(), DrawOutcome::Reused);
    assert_eq!(display.on_draw_frame().unwrap(), DrawOutcome::Reused);

    let calls = gpu.calls();
    let uploads = calls
        .iter()
        .filter(|c| matches!(c, Call::Create { .. } | Call::Update { .. }))
        .count();
    let draws = calls
        .iter()
        .filter(|c| matches!(c, Call::Draw { .. }))
        .count();
    assert_eq!(uploads, 1);
    assert_eq!(draws, 3);
}

#[test]
fn test_only_latest_of_many_publishes_is_drawn() {
    let (mut display, gpu, exchange) = display();

    for (i, value) in [1u8, 2, 3, 4].into_iter().enumerate() {
        exchange.publish(solid(4, 4, value, i as u64));
    }
    display.on_draw_frame().unwrap();

    assert_eq!(
        gpu.calls()[0],
        Call::Create {
            id: 1,
            width: 4,
            height: 4
        }
    );
    assert_eq!(exchange.stats().overwritten_unread, 3);
}

#[test]
fn test_surface_change_forwards_resize() {
    let (mut display, gpu, _exchange) = display();
    display.on_surface_changed(640, 480);
    assert_eq!(display.surface_size(), (640, 480));
    assert_eq!(
        gpu.calls(),
        vec![Call::Resize {
            width: 640,
            height: 480
        }]
    );
}

#[test]
fn test_new_surface_recreates_texture() {
    let (mut display, _gpu, exchange) = display();
    exchange.publish(solid(4, 4, 1, 0));
    display.on_draw_frame().unwrap();

    display.release_gpu_resources();
    assert_eq!(display.texture_size(), None);
    assert_eq!(display.on_draw_frame().unwrap(), DrawOutcome::NoSurface);

    let replacement = RecordingGpu::default();
    display.on_surface_created(replacement.clone());
    assert_eq!(display.on_draw_frame().unwrap(), DrawOutcome::Reallocated);
    assert_eq!(
        replacement.calls()[0],
        Call::Create {
            id: 1,
            width: 4,
            height: 4
        }
    );
}
