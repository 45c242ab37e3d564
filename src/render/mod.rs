// SPDX-License-Identifier: GPL-3.0-only

//! Presentation of processed frames
//!
//! [`Display`] runs on the render context. On every draw tick it reads the
//! latest descriptor from the [`FrameBufferExchange`] without waiting for a
//! new one, keeps a single GPU texture in sync with it and draws a textured
//! full-screen quad. GPU work goes through the [`GpuBackend`] seam; the
//! real implementation is [`wgpu_backend::WgpuRenderer`].

pub mod quad;
pub mod wgpu_backend;

use tracing::{debug, info};

use crate::errors::RenderError;
use crate::pipeline::exchange::FrameBufferExchange;

pub use quad::{FULLSCREEN_QUAD, QUAD_SHADER, QuadVertex};
pub use wgpu_backend::WgpuRenderer;

/// GPU operations the display needs
pub trait GpuBackend {
    /// Device-resident RGBA8 texture
    type Texture;

    /// Allocate a texture and upload its full contents
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<Self::Texture, RenderError>;

    /// Overwrite an existing texture of the same size in place
    fn update_texture(
        &mut self,
        texture: &mut Self::Texture,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<(), RenderError>;

    /// Track a new surface size
    fn resize(&mut self, width: u32, height: u32);

    /// Present an empty surface
    fn clear(&mut self) -> Result<(), RenderError>;

    /// Present `texture` stretched over the whole surface
    fn draw_textured_quad(&mut self, texture: &Self::Texture) -> Result<(), RenderError>;
}

/// What a draw tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// No surface yet
    NoSurface,
    /// No processed frame exists; surface cleared, no texture work
    Cleared,
    /// Same frame as the previous tick; drawn without an upload
    Reused,
    /// New frame of the same size uploaded in place
    Updated,
    /// Size changed (or first frame); texture recreated
    Reallocated,
}

struct UploadedTexture<T> {
    texture: T,
    width: u32,
    height: u32,
    generation: u64,
}

/// Draw-side consumer of the frame exchange
pub struct Display<B: GpuBackend> {
    exchange: FrameBufferExchange,
    gpu: Option<B>,
    texture: Option<UploadedTexture<B::Texture>>,
    surface_size: (u32, u32),
    reallocations: u64,
}

impl<B: GpuBackend> Display<B> {
    pub fn new(exchange: FrameBufferExchange) -> Self {
        Self {
            exchange,
            gpu: None,
            texture: None,
            surface_size: (0, 0),
            reallocations: 0,
        }
    }

    /// A GPU context exists. Textures from any previous context are gone.
    pub fn on_surface_created(&mut self, gpu: B) {
        info!("Display surface created");
        self.texture = None;
        self.gpu = Some(gpu);
    }

    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        debug!(width, height, "Display surface changed");
        self.surface_size = (width, height);
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(width, height);
        }
    }

    /// Draw the latest processed frame
    pub fn on_draw_frame(&mut self) -> Result<DrawOutcome, RenderError> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(DrawOutcome::NoSurface);
        };

        let Some(current) = self.exchange.latest() else {
            gpu.clear()?;
            return Ok(DrawOutcome::Cleared);
        };
        let (width, height) = (current.width(), current.height());

        let outcome = match self.texture.as_mut() {
            Some(tex) if tex.width == width && tex.height == height => {
                if tex.generation == current.generation {
                    DrawOutcome::Reused
                } else {
                    gpu.update_texture(&mut tex.texture, width, height, current.pixels())?;
                    tex.generation = current.generation;
                    DrawOutcome::Updated
                }
            }
            _ => DrawOutcome::Reallocated,
        };

        if outcome == DrawOutcome::Reallocated {
            // Release the old texture before allocating the new one
            if let Some(old) = self.texture.take() {
                debug!(
                    from_width = old.width,
                    from_height = old.height,
                    width,
                    height,
                    "Frame size changed, reallocating texture"
                );
            }
            let texture = gpu.create_texture(width, height, current.pixels())?;
            self.texture = Some(UploadedTexture {
                texture,
                width,
                height,
                generation: current.generation,
            });
            self.reallocations += 1;
        }

        if let Some(tex) = self.texture.as_ref() {
            gpu.draw_textured_quad(&tex.texture)?;
        }
        Ok(outcome)
    }

    /// Drop the texture and the GPU context
    pub fn release_gpu_resources(&mut self) {
        debug!("Releasing display GPU resources");
        self.texture = None;
        self.gpu = None;
    }

    /// Dimensions of the allocated texture
    pub fn texture_size(&self) -> Option<(u32, u32)> {
        self.texture.as_ref().map(|t| (t.width, t.height))
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    /// Number of texture allocations since creation
    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }
}
