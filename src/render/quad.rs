// SPDX-License-Identifier: GPL-3.0-only

//! Full-screen textured quad

use bytemuck::{Pod, Zeroable};

/// WGSL source for the quad pipeline
pub const QUAD_SHADER: &str = include_str!("quad.wgsl");

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    /// Normalized device coordinates
    pub position: [f32; 2],
    /// Texture coordinates; v = 0 is the first pixel row
    pub tex_coord: [f32; 2],
}

/// Four corners drawn as a triangle strip. The top of the surface samples
/// the first row of the frame.
pub const FULLSCREEN_QUAD: [QuadVertex; 4] = [
    QuadVertex {
        position: [-1.0, -1.0],
        tex_coord: [0.0, 1.0],
    },
    QuadVertex {
        position: [1.0, -1.0],
        tex_coord: [1.0, 1.0],
    },
    QuadVertex {
        position: [-1.0, 1.0],
        tex_coord: [0.0, 0.0],
    },
    QuadVertex {
        position: [1.0, 1.0],
        tex_coord: [1.0, 0.0],
    },
];
