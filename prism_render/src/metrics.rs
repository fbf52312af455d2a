use std::sync::atomic::{AtomicU64, Ordering};

use glam::UVec2;

/// Per-frame counters, reset by the client via
/// [`Rasterizer::reset_metrics`](crate::Rasterizer::reset_metrics).
///
/// For every draw call,
/// `primitive_count == primitives_processed + face_culling + empty_primitive
/// + scissor_culling + sample_point_culling`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RasterizerMetrics {
    /// Size of the attachments at the last clear.
    pub area: UVec2,
    pub draw_count: u64,
    pub primitive_count: u64,
    pub face_culling: u64,
    pub empty_primitive: u64,
    pub scissor_culling: u64,
    pub sample_point_culling: u64,
    pub primitives_processed: u64,
    pub vertex_invocations: u64,
    pub fragment_invocations: u64,
    pub early_fragment_tests: u64,
}

/// The live counters.
///
/// Front-end counters are only touched by `draw` on the submitting thread.
/// The fragment counters are atomic because tile workers increment them
/// concurrently during dispatch.
#[derive(Debug, Default)]
pub(crate) struct MetricCounters {
    pub area: UVec2,
    pub draw_count: u64,
    pub primitive_count: u64,
    pub face_culling: u64,
    pub empty_primitive: u64,
    pub scissor_culling: u64,
    pub sample_point_culling: u64,
    pub primitives_processed: u64,
    pub vertex_invocations: u64,
    pub fragment_invocations: AtomicU64,
    pub early_fragment_tests: AtomicU64,
}

impl MetricCounters {
    pub fn snapshot(&self) -> RasterizerMetrics {
        RasterizerMetrics {
            area: self.area,
            draw_count: self.draw_count,
            primitive_count: self.primitive_count,
            face_culling: self.face_culling,
            empty_primitive: self.empty_primitive,
            scissor_culling: self.scissor_culling,
            sample_point_culling: self.sample_point_culling,
            primitives_processed: self.primitives_processed,
            vertex_invocations: self.vertex_invocations,
            fragment_invocations: self.fragment_invocations.load(Ordering::Relaxed),
            early_fragment_tests: self.early_fragment_tests.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
