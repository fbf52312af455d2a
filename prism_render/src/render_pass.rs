use glam::UVec2;

use crate::color::Color;
use crate::sample::SampleCount;
use crate::texture::Texture;

/// What happens to an attachment when the pass begins.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LoadOp<T> {
    DontCare,
    Load,
    Clear(T),
}

/// What happens to an attachment when the pass ends.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Discard,
    Store,
}

#[derive(Debug)]
pub struct ColorAttachment {
    pub texture: Texture<Color>,
    /// The single-sampled resolve target. Present exactly when the texture
    /// is multi-sampled.
    pub resolve: Option<Texture<Color>>,
    pub load_op: LoadOp<Color>,
    pub store_op: StoreOp,
}

impl ColorAttachment {
    pub fn new(size: UVec2, sample_count: SampleCount) -> Self {
        let resolve = if sample_count != SampleCount::One {
            Some(Texture::new(size, SampleCount::One))
        } else {
            None
        };

        Self {
            texture: Texture::new(size, sample_count),
            resolve,
            load_op: LoadOp::Clear(Color::BLACK),
            store_op: StoreOp::Store,
        }
    }

    pub fn is_valid(&self) -> bool {
        if self.texture.sample_count() != SampleCount::One {
            return self
                .resolve
                .as_ref()
                .is_some_and(|resolve| resolve.sample_count() == SampleCount::One);
        }

        true
    }

    pub fn load(&mut self) {
        match self.load_op {
            LoadOp::DontCare | LoadOp::Load => {}
            LoadOp::Clear(color) => self.texture.clear(color),
        }
    }

    #[must_use]
    pub fn resize(&mut self, size: UVec2) -> bool {
        if !self.texture.resize(size) {
            return false;
        }
        if let Some(resolve) = &mut self.resolve {
            return resolve.resize(size);
        }

        true
    }

    #[must_use]
    pub fn set_sample_count(&mut self, sample_count: SampleCount) -> bool {
        if !self.texture.set_sample_count(sample_count) {
            return false;
        }

        self.resolve = if sample_count != SampleCount::One {
            Some(Texture::new(self.texture.size(), SampleCount::One))
        } else {
            None
        };

        true
    }
}

#[derive(Debug)]
pub struct DepthAttachment {
    pub texture: Texture<f32>,
    pub load_op: LoadOp<f32>,
    pub store_op: StoreOp,
}

impl DepthAttachment {
    pub fn new(size: UVec2, sample_count: SampleCount) -> Self {
        Self {
            texture: Texture::new(size, sample_count),
            load_op: LoadOp::Clear(1.0),
            store_op: StoreOp::Discard,
        }
    }

    pub fn load(&mut self) {
        match self.load_op {
            LoadOp::DontCare | LoadOp::Load => {}
            LoadOp::Clear(depth) => self.texture.clear(depth),
        }
    }
}

#[derive(Debug)]
pub struct StencilAttachment {
    pub texture: Texture<u8>,
    pub load_op: LoadOp<u8>,
    pub store_op: StoreOp,
}

impl StencilAttachment {
    pub fn new(size: UVec2, sample_count: SampleCount) -> Self {
        Self {
            texture: Texture::new(size, sample_count),
            load_op: LoadOp::Clear(0),
            store_op: StoreOp::Discard,
        }
    }

    pub fn load(&mut self) {
        match self.load_op {
            LoadOp::DontCare | LoadOp::Load => {}
            LoadOp::Clear(stencil) => self.texture.clear(stencil),
        }
    }
}

/// The color, depth and stencil attachments of one render pass.
///
/// All three attachments share the same size and sample count.
#[derive(Debug)]
pub struct RenderPass {
    pub color: ColorAttachment,
    pub depth: DepthAttachment,
    pub stencil: StencilAttachment,
}

impl RenderPass {
    pub fn new(size: UVec2, sample_count: SampleCount) -> Self {
        Self {
            color: ColorAttachment::new(size, sample_count),
            depth: DepthAttachment::new(size, sample_count),
            stencil: StencilAttachment::new(size, sample_count),
        }
    }

    pub fn size(&self) -> UVec2 {
        self.color.texture.size()
    }

    pub fn sample_count(&self) -> SampleCount {
        self.color.texture.sample_count()
    }

    /// The texture presentation should read from: the resolve target when
    /// multi-sampled, the color texture itself otherwise.
    pub fn resolved_color(&self) -> &Texture<Color> {
        self.color.resolve.as_ref().unwrap_or(&self.color.texture)
    }

    pub fn is_valid(&self) -> bool {
        if !self.color.is_valid() {
            return false;
        }

        let size = self.color.texture.size();
        let sample_count = self.color.texture.sample_count();

        self.depth.texture.size() == size
            && self.stencil.texture.size() == size
            && self.depth.texture.sample_count() == sample_count
            && self.stencil.texture.sample_count() == sample_count
    }

    /// Applies the load actions of all attachments.
    pub fn load(&mut self) {
        self.color.load();
        self.depth.load();
        self.stencil.load();
    }

    /// Reallocates every attachment for `size`.
    ///
    /// Fails without touching any attachment if `size` has a zero dimension.
    #[must_use]
    pub fn resize(&mut self, size: UVec2) -> bool {
        if size.x == 0 || size.y == 0 {
            return false;
        }

        self.color.resize(size)
            && self.depth.texture.resize(size)
            && self.stencil.texture.resize(size)
    }

    /// Reallocates every attachment with `sample_count`. Either all
    /// attachments are updated or none are.
    #[must_use]
    pub fn set_sample_count(&mut self, sample_count: SampleCount) -> bool {
        if sample_count == self.sample_count() {
            return true;
        }

        self.color.set_sample_count(sample_count)
            && self.depth.texture.set_sample_count(sample_count)
            && self.stencil.texture.set_sample_count(sample_count)
    }
}

#[cfg(test)]
mod tests {
    use glam::UVec2;

    use crate::sample::SampleCount;

    use super::RenderPass;

    #[test]
    fn render_pass_attachments_share_size_and_samples() {
        let pass = RenderPass::new(UVec2::new(8, 8), SampleCount::Four);

        assert!(pass.is_valid());
        assert_eq!(pass.depth.texture.sample_count(), SampleCount::Four);
        assert_eq!(pass.stencil.texture.sample_count(), SampleCount::Four);
        assert!(pass.color.resolve.is_some());
    }

    #[test]
    fn render_pass_single_sampled_has_no_resolve() {
        let pass = RenderPass::new(UVec2::new(8, 8), SampleCount::One);

        assert!(pass.is_valid());
        assert!(pass.color.resolve.is_none());
    }

    #[test]
    fn render_pass_resize_rejects_empty() {
        let mut pass = RenderPass::new(UVec2::new(8, 8), SampleCount::Four);

        assert!(!pass.resize(UVec2::new(0, 4)));
        assert_eq!(pass.size(), UVec2::new(8, 8));
        assert!(pass.is_valid());
    }

    #[test]
    fn render_pass_set_sample_count_is_idempotent() {
        let mut pass = RenderPass::new(UVec2::new(8, 8), SampleCount::One);

        assert!(pass.set_sample_count(SampleCount::Eight));
        assert!(pass.set_sample_count(SampleCount::Eight));
        assert!(pass.is_valid());
        assert_eq!(pass.sample_count(), SampleCount::Eight);
        assert!(pass.color.resolve.is_some());

        assert!(pass.set_sample_count(SampleCount::One));
        assert!(pass.color.resolve.is_none());
    }
}
