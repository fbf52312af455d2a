use std::num::NonZeroUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use glam::{IVec2, UVec2, Vec2, Vec3, Vec4};
use prism_tracing::trace_span;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::buffer::BufferView;
use crate::color::Color;
use crate::image::Image;
use crate::metrics::{MetricCounters, RasterizerMetrics};
use crate::pipeline::{Face, FrontFace, Pipeline};
use crate::rect::Rect;
use crate::render_pass::{LoadOp, RenderPass};
use crate::sample::{sample_location, SampleCount, SAMPLE_MIDPOINT};
use crate::shader::{FragmentInvocation, VertexInvocation};
use crate::stage::{DispatchResources, FragmentResources, Uniforms, VertexResources};
use crate::tiler::Tiler;

/// Tolerance of the edge-function coverage tests.
///
/// Samples within this distance of an edge count as lying on it and are
/// resolved by the top-left rule. Too small a value opens cracks between
/// adjacent triangles; too large double-blends their shared edge.
pub(crate) const COVERAGE_EPSILON: f32 = 1e-5;

/// A tile-based software rasterizer.
///
/// `draw` runs the geometry front-end on the calling thread and bins
/// fragment work by screen region; `finish` replays the binned work across
/// a worker pool (one task per tile, submission order within a tile) and
/// resolves multi-sampled color into the resolve target.
pub struct Rasterizer {
    pass: RenderPass,
    size: UVec2,
    metrics: MetricCounters,
    tiler: Tiler,
    pool: ThreadPool,
    /// Grid granularity of the parallel resolve.
    tile_factor: u32,
    finished: bool,
}

impl Rasterizer {
    pub fn new(size: UVec2, sample_count: SampleCount) -> Self {
        let workers = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(2);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .expect("failed to build the worker pool");

        let tile_factor = ((workers as f32).log2().ceil() as u32 + 1).max(2);

        Self {
            pass: RenderPass::new(size, sample_count),
            size,
            metrics: MetricCounters::default(),
            tiler: Tiler::new(),
            pool,
            tile_factor,
            finished: false,
        }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn render_pass(&self) -> &RenderPass {
        &self.pass
    }

    pub fn render_pass_mut(&mut self) -> &mut RenderPass {
        &mut self.pass
    }

    /// Resets the attachments with their configured clear values and empties
    /// the tiler.
    pub fn clear(&mut self, color: Color) {
        self.pass.color.load_op = LoadOp::Clear(color);
        self.pass.load();
        self.metrics.area = self.pass.size();
        self.tiler.reset();
        self.finished = false;
    }

    pub fn draw(
        &mut self,
        pipeline: Arc<Pipeline>,
        vertices: BufferView,
        uniforms: Uniforms,
        count: usize,
        stencil_reference: u32,
    ) {
        self.draw_internal(pipeline, vertices, None, uniforms, count, stencil_reference);
    }

    pub fn draw_indexed(
        &mut self,
        pipeline: Arc<Pipeline>,
        vertices: BufferView,
        indices: BufferView,
        uniforms: Uniforms,
        count: usize,
        stencil_reference: u32,
    ) {
        self.draw_internal(
            pipeline,
            vertices,
            Some(indices),
            uniforms,
            count,
            stencil_reference,
        );
    }

    fn draw_internal(
        &mut self,
        pipeline: Arc<Pipeline>,
        vertices: BufferView,
        indices: Option<BufferView>,
        uniforms: Uniforms,
        count: usize,
        stencil_reference: u32,
    ) {
        let _span = trace_span!("Rasterizer::draw").entered();

        debug_assert!(!self.finished, "draw submitted after finish without a clear");

        self.metrics.draw_count += 1;

        // A malformed draw is skipped, not surfaced; the frame stays live.
        if let Some(indices) = &indices {
            let Some(format) = pipeline.vertex_descriptor.index_format else {
                tracing::debug!("skipping indexed draw without an index format");
                return;
            };
            if indices.len() < count * format.size() {
                tracing::debug!(
                    len = indices.len(),
                    count,
                    "skipping draw with out of bounds index view"
                );
                return;
            }
        } else {
            let stride = pipeline.vertex_descriptor.stride;
            if stride != 0 && vertices.len() < count * stride {
                tracing::debug!(
                    len = vertices.len(),
                    count,
                    "skipping draw with out of bounds vertex view"
                );
                return;
            }
        }

        let resources = Arc::new(DispatchResources {
            vertex: vertices,
            index: indices,
            uniforms,
        });

        for triangle in 0..count / 3 {
            self.draw_triangle(&VertexResources {
                pipeline: pipeline.clone(),
                resources: resources.clone(),
                stencil_reference,
                base_vertex_id: triangle * 3,
            });
        }
    }

    fn draw_triangle(&mut self, data: &VertexResources) {
        self.metrics.primitive_count += 1;

        let pipeline = &data.pipeline;
        let mut varyings = vec![0u8; 3 * pipeline.shader.varyings_size()];

        // The clip-space coordinates returned by the vertex shader are
        // homogeneous 4-D vectors.
        let mut clip = [Vec4::ZERO; 3];
        for (vertex, position) in clip.iter_mut().enumerate() {
            let mut invocation =
                VertexInvocation::new(data, &mut varyings, data.base_vertex_id + vertex);
            *position = pipeline.shader.process_vertex(&mut invocation);
        }
        self.metrics.vertex_invocations += 3;

        let ndc = clip.map(to_ndc);

        if let Some(face) = pipeline.cull_mode {
            if should_cull_face(face, pipeline.front_face, ndc) {
                self.metrics.face_culling += 1;
                return;
            }
        }

        let viewport = pipeline.viewport.unwrap_or(self.size);
        let screen = ndc.map(|point| to_screen(point, viewport));

        let bounds = bounding_box(screen);
        if bounds.is_empty() {
            self.metrics.empty_primitive += 1;
            return;
        }

        let clip_rect = pipeline.scissor.unwrap_or_else(|| Rect::from_size(self.size));
        let Some(bounds) = bounds.intersection(clip_rect) else {
            self.metrics.scissor_culling += 1;
            return;
        };

        // Sample point culling, from
        // https://developer.arm.com/documentation/102540/0100/Primitive-culling
        if bounds.width() < 2.0 && bounds.height() < 2.0 {
            self.metrics.sample_point_culling += 1;
            return;
        }

        self.metrics.primitives_processed += 1;

        self.tiler.add(FragmentResources {
            bounds,
            ndc,
            pipeline: data.pipeline.clone(),
            resources: data.resources.clone(),
            stencil_reference: data.stencil_reference,
            varyings,
        });
    }

    /// Dispatches all binned fragment work and resolves the color
    /// attachment.
    pub fn finish(&mut self) {
        let _span = trace_span!("Rasterizer::finish").entered();

        {
            let this: &Self = self;
            this.tiler.dispatch(this, &this.pool);
        }
        self.finished = true;

        if let Some(resolve) = &self.pass.color.resolve {
            let _resolved =
                self.pass
                    .color
                    .texture
                    .resolve_into(resolve, &self.pool, self.tile_factor);
            debug_assert!(_resolved, "resolve target out of sync with the color attachment");
        }
    }

    /// Shades every covered sample of `item` within `tile`.
    ///
    /// Pixels are iterated half-open against the tile, so two tiles never
    /// shade the same pixel even when an item's bounds straddle them.
    pub(crate) fn shade_fragments(&self, item: &FragmentResources, tile: Rect) {
        let x0 = (item.bounds.min.x.floor() as i32).max(tile.min.x as i32);
        let y0 = (item.bounds.min.y.floor() as i32).max(tile.min.y as i32);
        let x1 = (item.bounds.max.x.floor() as i32).min(tile.max.x as i32 - 1);
        let y1 = (item.bounds.max.y.floor() as i32).min(tile.max.y as i32 - 1);

        if x1 < x0 || y1 < y0 {
            return;
        }

        let pipeline = &item.pipeline;
        let sample_count = self.pass.sample_count();
        let viewport = pipeline.viewport.unwrap_or(self.size);

        let p0 = to_screen(item.ndc[0], viewport);
        let p1 = to_screen(item.ndc[1], viewport);
        let p2 = to_screen(item.ndc[2], viewport);

        for y in y0..=y1 {
            for x in x0..=x1 {
                let pixel = Vec2::new(x as f32, y as f32);
                let mut samples_found = 0u32;

                for sample in 0..sample_count.get() {
                    let frag = pixel + sample_location(sample_count, sample);

                    if !point_inside(p0, p1, p2, frag) {
                        continue;
                    }

                    let barycentric = barycentric_coordinates(frag, p0, p1, p2);
                    let depth = barycentric.x * item.ndc[0].z
                        + barycentric.y * item.ndc[1].z
                        + barycentric.z * item.ndc[2].z;
                    let pos = frag.as_ivec2();

                    let depth_passes = self.depth_test_passes(pipeline, pos, depth, sample);
                    let stencil_passes = self.update_stencil(
                        pipeline,
                        pos,
                        depth_passes,
                        item.stencil_reference,
                        sample,
                    );

                    if !depth_passes || !stencil_passes {
                        self.metrics.early_fragment_tests.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }

                    self.write_depth(pipeline, pos, depth, sample);
                    samples_found |= 1 << sample;
                }

                if samples_found == 0 {
                    continue;
                }

                // Shade once at the pixel center; coverage stays per sample.
                let center = pixel + SAMPLE_MIDPOINT;
                let invocation =
                    FragmentInvocation::new(barycentric_coordinates(center, p0, p1, p2), item);
                let color = Color::from(pipeline.shader.process_fragment(&invocation));
                self.metrics.fragment_invocations.fetch_add(1, Ordering::Relaxed);

                for sample in 0..sample_count.get() {
                    if samples_found & (1 << sample) != 0 {
                        let pos = (pixel + sample_location(sample_count, sample)).as_ivec2();
                        self.write_color(pipeline, pos, color, sample);
                    }
                }
            }
        }
    }

    fn depth_test_passes(&self, pipeline: &Pipeline, pos: IVec2, depth: f32, sample: u32) -> bool {
        if is_oob(pos, self.size) {
            return false;
        }
        if !pipeline.depth.test_enabled {
            return true;
        }

        // SAFETY: `pos` is in bounds and this worker's tile owns the pixel.
        let current = unsafe { self.pass.depth.texture.load(pos.as_uvec2(), sample) };

        pipeline.depth.compare.passes(depth, current)
    }

    /// Runs the stencil test and writes the updated stencil value back.
    ///
    /// The update is performed even when the test fails, per the selected
    /// operation, so later primitives in the frame observe it.
    fn update_stencil(
        &self,
        pipeline: &Pipeline,
        pos: IVec2,
        depth_passes: bool,
        reference: u32,
        sample: u32,
    ) -> bool {
        if is_oob(pos, self.size) {
            return false;
        }

        let stencil = &pipeline.stencil;
        if !stencil.test_enabled {
            return true;
        }

        let pos = pos.as_uvec2();

        // SAFETY: `pos` is in bounds and this worker's tile owns the pixel.
        let current = unsafe { self.pass.stencil.texture.load(pos, sample) } as u32;

        let masked_current = stencil.read_mask & current;
        let masked_reference = stencil.read_mask & reference;

        let passes = stencil.compare.passes(masked_current, masked_reference);

        let operation = stencil.select_operation(depth_passes, passes);
        let updated = operation.apply(masked_current, masked_reference) & stencil.write_mask;

        // SAFETY: Same as the load above.
        unsafe { self.pass.stencil.texture.store(updated as u8, pos, sample) };

        passes
    }

    fn write_depth(&self, pipeline: &Pipeline, pos: IVec2, depth: f32, sample: u32) {
        if is_oob(pos, self.size) {
            return;
        }
        if !pipeline.depth.test_enabled || !pipeline.depth.write_enabled {
            return;
        }

        // SAFETY: `pos` is in bounds and this worker's tile owns the pixel.
        unsafe { self.pass.depth.texture.store(depth, pos.as_uvec2(), sample) };
    }

    fn write_color(&self, pipeline: &Pipeline, pos: IVec2, color: Color, sample: u32) {
        if is_oob(pos, self.size) {
            return;
        }

        let pos = pos.as_uvec2();
        let blend = &pipeline.color.blend;
        let texture = &self.pass.color.texture;

        // SAFETY: `pos` is in bounds and this worker's tile owns the pixel.
        let dst = unsafe { texture.load(pos, sample) };
        let blended = Color::from(blend.blend(color.to_linear(), dst.to_linear()));

        // SAFETY: Same as the load above.
        unsafe { texture.store(blended, pos, sample) };
    }

    #[must_use]
    pub fn resize(&mut self, size: UVec2) -> bool {
        if size == self.size {
            return true;
        }
        if !self.pass.resize(size) {
            return false;
        }

        self.size = size;
        true
    }

    #[must_use]
    pub fn set_sample_count(&mut self, sample_count: SampleCount) -> bool {
        self.pass.set_sample_count(sample_count)
    }

    pub fn metrics(&self) -> RasterizerMetrics {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// A grayscale snapshot of the depth attachment, normalized over its
    /// value range. `None` while the attachment is multi-sampled.
    pub fn capture_debug_depth_texture(&self) -> Option<Image> {
        let texture = &self.pass.depth.texture;
        let (min, max) = texture.min_max()?;

        texture.to_image(|depth| debug_color(depth, min, max))
    }

    /// A grayscale snapshot of the stencil attachment, normalized over its
    /// value range. `None` while the attachment is multi-sampled.
    pub fn capture_debug_stencil_texture(&self) -> Option<Image> {
        let texture = &self.pass.stencil.texture;
        let (min, max) = texture.min_max()?;

        texture.to_image(|stencil| debug_color(stencil as f32, min as f32, max as f32))
    }
}

fn to_ndc(clip: Vec4) -> Vec3 {
    clip.truncate() / clip.w
}

fn to_screen(ndc: Vec3, viewport: UVec2) -> Vec2 {
    let viewport = viewport.as_vec2();

    Vec2::new(
        (viewport.x / 2.0) * (ndc.x + 1.0),
        (viewport.y / 2.0) * (ndc.y + 1.0),
    )
}

/// Inclusive bounding box of the three screen points, on texel boundaries.
fn bounding_box(points: [Vec2; 3]) -> Rect {
    let p0 = points[0].as_ivec2();
    let p1 = points[1].as_ivec2();
    let p2 = points[2].as_ivec2();

    let min = p0.min(p1).min(p2);
    let max = p0.max(p1).max(p2);

    Rect::new(min.as_vec2(), max.as_vec2())
}

fn should_cull_face(face: Face, front_face: FrontFace, ndc: [Vec3; 3]) -> bool {
    let mut direction = (ndc[1] - ndc[0]).cross(ndc[2] - ndc[0]).z;

    if face != Face::Front {
        direction = -direction;
    }
    if front_face != FrontFace::Cw {
        direction = -direction;
    }

    direction < 0.0
}

/// Signed parallelogram area of `p` against the edge from `v0` to `v1`.
fn edge_function(v0: Vec2, v1: Vec2, p: Vec2) -> f32 {
    (p.x - v0.x) * (v1.y - v0.y) - (p.y - v0.y) * (v1.x - v0.x)
}

// Top edges are flat (y == 0) and point right; left edges point down the
// screen (y > 0).
fn is_top_left_edge(edge: Vec2) -> bool {
    let is_top = edge.y.abs() < COVERAGE_EPSILON && edge.x > 0.0;
    let is_left = edge.y > 0.0;

    is_top || is_left
}

fn point_inside(a: Vec2, b: Vec2, c: Vec2, p: Vec2) -> bool {
    let edge_ab = edge_function(a, b, p);
    let edge_bc = edge_function(b, c, p);
    let edge_ca = edge_function(c, a, p);

    // Clearly outside the triangle.
    if edge_ab < -COVERAGE_EPSILON || edge_bc < -COVERAGE_EPSILON || edge_ca < -COVERAGE_EPSILON {
        return false;
    }

    // On an edge the top-left rule decides which of the adjacent triangles
    // owns the sample.
    // https://learn.microsoft.com/en-us/windows/win32/direct3d11/d3d10-graphics-programming-guide-rasterizer-stage-rules
    let on_ab = edge_ab.abs() < COVERAGE_EPSILON;
    let on_bc = edge_bc.abs() < COVERAGE_EPSILON;
    let on_ca = edge_ca.abs() < COVERAGE_EPSILON;

    if on_ab && !is_top_left_edge(b - a) {
        return false;
    }
    if on_bc && !is_top_left_edge(c - b) {
        return false;
    }
    if on_ca && !is_top_left_edge(a - c) {
        return false;
    }

    true
}

fn barycentric_coordinates(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let one_over_den = 1.0 / (ab.x * ac.y - ab.y * ac.x);
    let s = (ac.y * ap.x - ac.x * ap.y) * one_over_den;
    let t = (ab.x * ap.y - ab.y * ap.x) * one_over_den;

    Vec3::new(1.0 - s - t, s, t)
}

fn is_oob(pos: IVec2, size: UVec2) -> bool {
    pos.x < 0 || pos.y < 0 || pos.x >= size.x as i32 || pos.y >= size.y as i32
}

fn debug_color(value: f32, min: f32, max: f32) -> Color {
    let range = max - min;
    if range == 0.0 {
        return Color::RED;
    }

    Color::gray((value - min) / range)
}
