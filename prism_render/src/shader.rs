use bytemuck::Pod;
use glam::{Vec2, Vec3, Vec4};

use crate::image::Image;
use crate::stage::{FragmentResources, VertexResources};

/// The programmable stages of a pipeline.
///
/// A shader declares the size of one varyings slot and is invoked once per
/// vertex and (at most) once per covered pixel. Varyings are marshaled as
/// opaque bytes: the shader is responsible for using consistent
/// `(type, offset)` pairs when storing and loading them.
pub trait Shader: Send + Sync {
    /// Size in bytes of the varyings one vertex invocation may store.
    fn varyings_size(&self) -> usize;

    /// Returns the clip-space position of the vertex as a homogeneous
    /// 4-D vector.
    fn process_vertex(&self, invocation: &mut VertexInvocation<'_>) -> Vec4;

    /// Returns the unpremultiplied linear color of the fragment.
    fn process_fragment(&self, invocation: &FragmentInvocation<'_>) -> Vec4;
}

/// A value that can be interpolated across a triangle.
pub trait Varying: Pod {
    fn interpolate(p0: Self, p1: Self, p2: Self, barycentric: Vec3) -> Self;
}

impl Varying for f32 {
    fn interpolate(p0: Self, p1: Self, p2: Self, barycentric: Vec3) -> Self {
        barycentric.x * p0 + barycentric.y * p1 + barycentric.z * p2
    }
}

impl Varying for Vec2 {
    fn interpolate(p0: Self, p1: Self, p2: Self, barycentric: Vec3) -> Self {
        barycentric.x * p0 + barycentric.y * p1 + barycentric.z * p2
    }
}

impl Varying for Vec3 {
    fn interpolate(p0: Self, p1: Self, p2: Self, barycentric: Vec3) -> Self {
        barycentric.x * p0 + barycentric.y * p1 + barycentric.z * p2
    }
}

impl Varying for Vec4 {
    fn interpolate(p0: Self, p1: Self, p2: Self, barycentric: Vec3) -> Self {
        barycentric.x * p0 + barycentric.y * p1 + barycentric.z * p2
    }
}

/// The execution context of one vertex shader invocation.
pub struct VertexInvocation<'a> {
    resources: &'a VertexResources,
    varyings: &'a mut [u8],
    vertex_id: usize,
}

impl<'a> VertexInvocation<'a> {
    pub(crate) fn new(
        resources: &'a VertexResources,
        varyings: &'a mut [u8],
        vertex_id: usize,
    ) -> Self {
        Self {
            resources,
            varyings,
            vertex_id,
        }
    }

    pub fn vertex_id(&self) -> usize {
        self.vertex_id
    }

    /// The vertex position, fetched via the pipeline's vertex descriptor.
    pub fn position(&self) -> Vec3 {
        self.resources.position(self.vertex_id)
    }

    pub fn load_vertex<T: Pod>(&self, offset: usize) -> T {
        self.resources.load_vertex(self.vertex_id, offset)
    }

    pub fn load_uniform<T: Pod>(&self, offset: usize) -> T {
        self.resources.resources.load_uniform(offset)
    }

    /// Stores a varying for this vertex at `offset` within the slot.
    pub fn store_varying<T: Pod>(&mut self, value: T, offset: usize) {
        let stride = self.varyings.len() / 3;
        let start = offset + (self.vertex_id % 3) * stride;

        self.varyings[start..start + size_of::<T>()].copy_from_slice(bytemuck::bytes_of(&value));
    }
}

/// The execution context of one fragment shader invocation.
pub struct FragmentInvocation<'a> {
    barycentric: Vec3,
    resources: &'a FragmentResources,
}

impl<'a> FragmentInvocation<'a> {
    pub(crate) fn new(barycentric: Vec3, resources: &'a FragmentResources) -> Self {
        Self {
            barycentric,
            resources,
        }
    }

    /// The barycentric coordinates of the fragment relative to the
    /// triangle's screen-space vertices.
    pub fn barycentric(&self) -> Vec3 {
        self.barycentric
    }

    /// Loads the varying at `offset`, interpolated across the three vertex
    /// slots.
    ///
    /// Interpolation is linear in screen space; it is not
    /// perspective-correct.
    pub fn load_varying<T: Varying>(&self, offset: usize) -> T {
        self.resources.load_varying(self.barycentric, offset)
    }

    pub fn load_uniform<T: Pod>(&self, offset: usize) -> T {
        self.resources.resources.load_uniform(offset)
    }

    /// The image bound at `slot`. Panics when the slot is unbound.
    pub fn image(&self, slot: usize) -> &Image {
        self.resources.image(slot)
    }
}
