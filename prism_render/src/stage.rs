use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::Pod;
use glam::Vec3;

use crate::buffer::BufferView;
use crate::image::Image;
use crate::pipeline::{IndexFormat, Pipeline, VertexFormat};
use crate::rect::Rect;
use crate::shader::Varying;

/// The uniform resources bound once per draw call.
#[derive(Clone, Debug, Default)]
pub struct Uniforms {
    pub buffer: BufferView,
    pub images: HashMap<usize, Arc<Image>>,
}

impl Uniforms {
    pub fn new(buffer: BufferView) -> Self {
        Self {
            buffer,
            images: HashMap::new(),
        }
    }
}

/// Everything one draw call hands to its primitives. Shared by all fragment
/// work items the draw produces.
#[derive(Clone, Debug)]
pub struct DispatchResources {
    pub vertex: BufferView,
    pub index: Option<BufferView>,
    pub uniforms: Uniforms,
}

impl DispatchResources {
    pub(crate) fn load_uniform<T: Pod>(&self, offset: usize) -> T {
        let data = self.buffer_slice();
        bytemuck::pod_read_unaligned(&data[offset..offset + size_of::<T>()])
    }

    fn buffer_slice(&self) -> &[u8] {
        self.uniforms.buffer.as_slice()
    }
}

/// The per-primitive bundle consumed by the vertex stage.
#[derive(Clone, Debug)]
pub(crate) struct VertexResources {
    pub pipeline: Arc<Pipeline>,
    pub resources: Arc<DispatchResources>,
    pub stencil_reference: u32,
    pub base_vertex_id: usize,
}

impl VertexResources {
    /// Resolves the index buffer indirection, if any.
    pub fn vertex_index(&self, vertex_id: usize) -> usize {
        let Some(indices) = &self.resources.index else {
            return vertex_id;
        };

        let data = indices.as_slice();
        match self.pipeline.vertex_descriptor.index_format {
            Some(IndexFormat::U16) => {
                let offset = vertex_id * 2;
                bytemuck::pod_read_unaligned::<u16>(&data[offset..offset + 2]) as usize
            }
            Some(IndexFormat::U32) => {
                let offset = vertex_id * 4;
                bytemuck::pod_read_unaligned::<u32>(&data[offset..offset + 4]) as usize
            }
            None => {
                debug_assert!(false, "index view bound without an index format");
                vertex_id
            }
        }
    }

    pub fn load_vertex<T: Pod>(&self, vertex_id: usize, offset: usize) -> T {
        let stride = self.pipeline.vertex_descriptor.stride;
        let start = offset + self.vertex_index(vertex_id) * stride;

        let data = self.resources.vertex.as_slice();
        bytemuck::pod_read_unaligned(&data[start..start + size_of::<T>()])
    }

    pub fn position(&self, vertex_id: usize) -> Vec3 {
        let offset = self.pipeline.vertex_descriptor.position_offset;

        match self.pipeline.vertex_descriptor.position_format {
            VertexFormat::Float2 => {
                let [x, y] = self.load_vertex::<[f32; 2]>(vertex_id, offset);
                Vec3::new(x, y, 0.0)
            }
            VertexFormat::Float3 => self.load_vertex::<[f32; 3]>(vertex_id, offset).into(),
        }
    }
}

/// One fragment work item: a screen-mapped primitive plus everything needed
/// to shade it.
///
/// Items are immutable after emission and own (or share) all referenced
/// state, because dispatch happens after the submitting draw call returns.
#[derive(Clone, Debug)]
pub(crate) struct FragmentResources {
    pub bounds: Rect,
    pub ndc: [Vec3; 3],
    pub pipeline: Arc<Pipeline>,
    pub resources: Arc<DispatchResources>,
    pub stencil_reference: u32,
    /// One slot per triangle vertex, `varyings_size` bytes each.
    pub varyings: Vec<u8>,
}

impl FragmentResources {
    pub fn varyings_stride(&self) -> usize {
        self.varyings.len() / 3
    }

    pub fn load_varying<T: Varying>(&self, barycentric: Vec3, offset: usize) -> T {
        let stride = self.varyings_stride();

        let slot = |index: usize| {
            let start = offset + index * stride;
            bytemuck::pod_read_unaligned(&self.varyings[start..start + size_of::<T>()])
        };

        T::interpolate(slot(0), slot(1), slot(2), barycentric)
    }

    pub fn image(&self, slot: usize) -> &Image {
        &self.resources.uniforms.images[&slot]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{Vec2, Vec3};

    use crate::buffer::{Buffer, BufferView};
    use crate::pipeline::{IndexFormat, Pipeline, VertexFormat};
    use crate::rect::Rect;
    use crate::shaders::ColorShader;
    use crate::stage::Uniforms;

    use super::{DispatchResources, FragmentResources, VertexResources};

    fn resources(pipeline: Pipeline, vertex: BufferView, index: Option<BufferView>) -> VertexResources {
        VertexResources {
            pipeline: Arc::new(pipeline),
            resources: Arc::new(DispatchResources {
                vertex,
                index,
                uniforms: Uniforms::default(),
            }),
            stencil_reference: 0,
            base_vertex_id: 0,
        }
    }

    #[test]
    fn vertex_position_honors_the_descriptor() {
        let mut buffer = Buffer::new();
        buffer.push_slice(&[0.0f32, 0.0, /* vertex 1 */ 2.0, 3.0]);

        let mut pipeline = Pipeline::new(Arc::new(ColorShader));
        pipeline.vertex_descriptor.stride = 8;
        pipeline.vertex_descriptor.position_format = VertexFormat::Float2;

        let resources = resources(pipeline, BufferView::new(Arc::new(buffer)), None);
        assert_eq!(resources.position(1), Vec3::new(2.0, 3.0, 0.0));
    }

    #[test]
    fn vertex_index_reads_the_index_view() {
        let mut buffer = Buffer::new();
        let vertices = buffer.push_slice(&[[0.0f32, 0.0, 0.0], [5.0, 6.0, 7.0]]);
        let indices = buffer.push_slice(&[1u16, 0u16]);
        let buffer = Arc::new(buffer);

        let mut pipeline = Pipeline::new(Arc::new(ColorShader));
        pipeline.vertex_descriptor.stride = 12;
        pipeline.vertex_descriptor.index_format = Some(IndexFormat::U16);

        let resources = resources(
            pipeline,
            BufferView::with_range(buffer.clone(), vertices),
            Some(BufferView::with_range(buffer, indices)),
        );

        assert_eq!(resources.vertex_index(0), 1);
        assert_eq!(resources.position(0), Vec3::new(5.0, 6.0, 7.0));
    }

    #[test]
    fn varyings_interpolate_across_slots() {
        let pipeline = Arc::new(Pipeline::new(Arc::new(ColorShader)));
        let mut item = FragmentResources {
            bounds: Rect::ZERO,
            ndc: [Vec3::ZERO; 3],
            pipeline: pipeline.clone(),
            resources: Arc::new(DispatchResources {
                vertex: BufferView::default(),
                index: None,
                uniforms: Uniforms::default(),
            }),
            stencil_reference: 0,
            varyings: vec![0; 3 * size_of::<Vec2>()],
        };

        let stride = item.varyings_stride();
        for (slot, value) in [Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0)]
            .into_iter()
            .enumerate()
        {
            item.varyings[slot * stride..slot * stride + 8]
                .copy_from_slice(bytemuck::bytes_of(&value));
        }

        let center: Vec2 = item.load_varying(Vec3::splat(1.0 / 3.0), 0);
        assert!((center - Vec2::new(2.0 / 3.0, 2.0 / 3.0)).abs().max_element() < 1e-6);

        let first: Vec2 = item.load_varying(Vec3::new(1.0, 0.0, 0.0), 0);
        assert_eq!(first, Vec2::new(1.0, 0.0));
    }
}
