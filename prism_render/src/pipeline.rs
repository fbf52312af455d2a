use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use glam::UVec2;

use crate::blend::BlendDescriptor;
use crate::depth_stencil::{DepthState, StencilState};
use crate::rect::Rect;
use crate::shader::Shader;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrontFace {
    Cw,
    Ccw,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    Front,
    Back,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float2,
    Float3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    /// Returns the number of bytes needed to represent an index.
    pub const fn size(self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// How vertex positions and indices are laid out in their buffer views.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexDescriptor {
    /// Distance in bytes between consecutive vertices.
    pub stride: usize,
    /// Byte offset of the position within one vertex.
    pub position_offset: usize,
    pub position_format: VertexFormat,
    /// Element type of the index view. `None` for non-indexed draws.
    pub index_format: Option<IndexFormat>,
}

impl Default for VertexDescriptor {
    fn default() -> Self {
        Self {
            stride: 0,
            position_offset: 0,
            position_format: VertexFormat::Float3,
            index_format: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ColorAttachmentDescriptor {
    pub blend: BlendDescriptor,
}

/// The immutable draw-time configuration of the pipeline.
///
/// Cloning is cheap; the shader is shared.
#[derive(Clone)]
pub struct Pipeline {
    pub shader: Arc<dyn Shader>,
    pub vertex_descriptor: VertexDescriptor,
    pub color: ColorAttachmentDescriptor,
    pub depth: DepthState,
    pub stencil: StencilState,
    pub front_face: FrontFace,
    pub cull_mode: Option<Face>,
    pub scissor: Option<Rect>,
    pub viewport: Option<UVec2>,
}

impl Pipeline {
    pub fn new(shader: Arc<dyn Shader>) -> Self {
        Self {
            shader,
            vertex_descriptor: VertexDescriptor::default(),
            color: ColorAttachmentDescriptor::default(),
            depth: DepthState::default(),
            stencil: StencilState::default(),
            front_face: FrontFace::Cw,
            cull_mode: None,
            scissor: None,
            viewport: None,
        }
    }
}

impl Debug for Pipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("varyings_size", &self.shader.varyings_size())
            .field("vertex_descriptor", &self.vertex_descriptor)
            .field("color", &self.color)
            .field("depth", &self.depth)
            .field("stencil", &self.stencil)
            .field("front_face", &self.front_face)
            .field("cull_mode", &self.cull_mode)
            .field("scissor", &self.scissor)
            .field("viewport", &self.viewport)
            .finish()
    }
}
