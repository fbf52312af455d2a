//! Built-in shaders for solid colors and textured geometry.

use std::mem::offset_of;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

use crate::shader::{FragmentInvocation, Shader, VertexInvocation};

/// Shades every fragment with a single uniform color.
#[derive(Copy, Clone, Debug, Default)]
pub struct ColorShader;

#[derive(Copy, Clone, Debug, Zeroable, Pod)]
#[repr(C)]
pub struct ColorShaderVertex {
    pub position: Vec3,
}

#[derive(Copy, Clone, Debug, Zeroable, Pod)]
#[repr(C)]
pub struct ColorShaderUniforms {
    pub color: Vec4,
}

impl Shader for ColorShader {
    fn varyings_size(&self) -> usize {
        0
    }

    fn process_vertex(&self, invocation: &mut VertexInvocation<'_>) -> Vec4 {
        invocation.position().extend(1.0)
    }

    fn process_fragment(&self, invocation: &FragmentInvocation<'_>) -> Vec4 {
        invocation.load_uniform(offset_of!(ColorShaderUniforms, color))
    }
}

/// Samples the image bound at slot 0, modulated by a uniform alpha, with an
/// optional position offset.
#[derive(Copy, Clone, Debug, Default)]
pub struct TextureShader;

#[derive(Copy, Clone, Debug, Zeroable, Pod)]
#[repr(C)]
pub struct TextureShaderVertex {
    pub texture_coords: Vec2,
    pub position: Vec3,
}

#[derive(Copy, Clone, Debug, Zeroable, Pod)]
#[repr(C)]
pub struct TextureShaderUniforms {
    pub alpha: f32,
    pub offset: Vec2,
}

#[derive(Copy, Clone, Debug, Zeroable, Pod)]
#[repr(C)]
pub struct TextureShaderVaryings {
    pub texture_coords: Vec2,
}

impl Shader for TextureShader {
    fn varyings_size(&self) -> usize {
        size_of::<TextureShaderVaryings>()
    }

    fn process_vertex(&self, invocation: &mut VertexInvocation<'_>) -> Vec4 {
        let coords: Vec2 =
            invocation.load_vertex(offset_of!(TextureShaderVertex, texture_coords));
        invocation.store_varying(coords, offset_of!(TextureShaderVaryings, texture_coords));

        let offset: Vec2 = invocation.load_uniform(offset_of!(TextureShaderUniforms, offset));

        (invocation.position() + offset.extend(0.0)).extend(1.0)
    }

    fn process_fragment(&self, invocation: &FragmentInvocation<'_>) -> Vec4 {
        let coords: Vec2 =
            invocation.load_varying(offset_of!(TextureShaderVaryings, texture_coords));
        let alpha: f32 = invocation.load_uniform(offset_of!(TextureShaderUniforms, alpha));

        let mut color = invocation.image(0).sample(coords);
        color.w *= alpha.clamp(0.0, 1.0);
        color
    }
}
