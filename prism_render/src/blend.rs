use bitflags::bitflags;
use glam::{Vec3, Vec4};

bitflags! {
    /// Which channels of the color attachment a draw may write.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct ColorWrites: u8 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SourceColor,
    OneMinusSourceColor,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestinationColor,
    OneMinusDestinationColor,
    DestinationAlpha,
    OneMinusDestinationAlpha,
    SourceAlphaSaturated,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// One factor/factor/op triple, applied to either the color channels or the
/// alpha channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub operation: BlendOp,
}

impl Default for BlendComponent {
    fn default() -> Self {
        Self {
            src_factor: BlendFactor::SourceAlpha,
            dst_factor: BlendFactor::OneMinusSourceAlpha,
            operation: BlendOp::Add,
        }
    }
}

/// Specify how new (src) fragments are combined with fragments already in
/// the framebuffer (dst).
///
/// ```text
/// if enabled {
///     new.rgb = (src_color_factor * src.rgb) <color op> (dst_color_factor * dst.rgb);
///     new.a   = (src_alpha_factor * src.a)   <alpha op> (dst_alpha_factor * dst.a);
/// } else {
///     new = src;
/// }
/// new &= write_mask;
/// ```
///
/// The write mask is applied whether or not blending is enabled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlendDescriptor {
    pub enabled: bool,
    pub color: BlendComponent,
    pub alpha: BlendComponent,
    pub write_mask: ColorWrites,
}

impl Default for BlendDescriptor {
    fn default() -> Self {
        Self {
            enabled: false,
            color: BlendComponent::default(),
            alpha: BlendComponent::default(),
            write_mask: ColorWrites::ALL,
        }
    }
}

impl BlendDescriptor {
    /// Standard straight-alpha blending: source color weighted by its
    /// alpha, destination by one minus it.
    pub const ALPHA_BLENDING: Self = Self {
        enabled: true,
        color: BlendComponent {
            src_factor: BlendFactor::SourceAlpha,
            dst_factor: BlendFactor::OneMinusSourceAlpha,
            operation: BlendOp::Add,
        },
        alpha: BlendComponent {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::OneMinusSourceAlpha,
            operation: BlendOp::Add,
        },
        write_mask: ColorWrites::ALL,
    };

    pub fn blend(&self, src: Vec4, dst: Vec4) -> Vec4 {
        if !self.enabled {
            return self.masked(src);
        }

        let color = apply_color_op(
            self.color.operation,
            color_factor(self.color.src_factor, src, dst) * src.truncate(),
            color_factor(self.color.dst_factor, src, dst) * dst.truncate(),
        );
        let alpha = apply_alpha_op(
            self.alpha.operation,
            alpha_factor(self.alpha.src_factor, src, dst) * src.w,
            alpha_factor(self.alpha.dst_factor, src, dst) * dst.w,
        );

        self.masked(color.extend(alpha))
    }

    fn masked(&self, color: Vec4) -> Vec4 {
        let channel = |mask, value| {
            if self.write_mask.contains(mask) {
                value
            } else {
                0.0
            }
        };

        Vec4::new(
            channel(ColorWrites::RED, color.x),
            channel(ColorWrites::GREEN, color.y),
            channel(ColorWrites::BLUE, color.z),
            channel(ColorWrites::ALPHA, color.w),
        )
    }
}

fn color_factor(factor: BlendFactor, src: Vec4, dst: Vec4) -> Vec3 {
    match factor {
        BlendFactor::Zero => Vec3::ZERO,
        BlendFactor::One => Vec3::ONE,
        BlendFactor::SourceColor => src.truncate(),
        BlendFactor::OneMinusSourceColor => Vec3::ONE - src.truncate(),
        BlendFactor::SourceAlpha => Vec3::splat(src.w),
        BlendFactor::OneMinusSourceAlpha => Vec3::splat(1.0 - src.w),
        BlendFactor::DestinationColor => dst.truncate(),
        BlendFactor::OneMinusDestinationColor => Vec3::ONE - dst.truncate(),
        BlendFactor::DestinationAlpha => Vec3::splat(dst.w),
        BlendFactor::OneMinusDestinationAlpha => Vec3::splat(1.0 - dst.w),
        BlendFactor::SourceAlphaSaturated => Vec3::splat(src.w.min(1.0 - dst.w)),
    }
}

fn alpha_factor(factor: BlendFactor, src: Vec4, dst: Vec4) -> f32 {
    match factor {
        BlendFactor::Zero => 0.0,
        BlendFactor::One => 1.0,
        BlendFactor::SourceColor => src.w,
        BlendFactor::OneMinusSourceColor => 1.0 - src.w,
        BlendFactor::SourceAlpha => src.w,
        BlendFactor::OneMinusSourceAlpha => 1.0 - src.w,
        BlendFactor::DestinationColor => dst.w,
        BlendFactor::OneMinusDestinationColor => 1.0 - dst.w,
        BlendFactor::DestinationAlpha => dst.w,
        BlendFactor::OneMinusDestinationAlpha => 1.0 - dst.w,
        BlendFactor::SourceAlphaSaturated => 1.0,
    }
}

fn apply_color_op(op: BlendOp, src: Vec3, dst: Vec3) -> Vec3 {
    match op {
        BlendOp::Add => src + dst,
        BlendOp::Subtract => src - dst,
        BlendOp::ReverseSubtract => dst - src,
        BlendOp::Min => src.min(dst),
        BlendOp::Max => src.max(dst),
    }
}

fn apply_alpha_op(op: BlendOp, src: f32, dst: f32) -> f32 {
    match op {
        BlendOp::Add => src + dst,
        BlendOp::Subtract => src - dst,
        BlendOp::ReverseSubtract => dst - src,
        BlendOp::Min => src.min(dst),
        BlendOp::Max => src.max(dst),
    }
}

/// The Porter-Duff compositing operators, for premultiplied colors.
///
/// <https://www.w3.org/TR/compositing-1/#porterduffcompositingoperators>
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Clear,
    Copy,
    Destination,
    SourceOver,
    DestinationOver,
    SourceIn,
    DestinationIn,
    SourceOut,
    DestinationOut,
    SourceAtop,
    DestinationAtop,
    Xor,
}

impl BlendMode {
    pub fn descriptor(self) -> BlendDescriptor {
        let (src_factor, dst_factor) = match self {
            Self::Clear => (BlendFactor::Zero, BlendFactor::Zero),
            Self::Copy => (BlendFactor::One, BlendFactor::Zero),
            Self::Destination => (BlendFactor::Zero, BlendFactor::One),
            Self::SourceOver => (BlendFactor::One, BlendFactor::OneMinusSourceAlpha),
            Self::DestinationOver => (BlendFactor::OneMinusDestinationAlpha, BlendFactor::One),
            Self::SourceIn => (BlendFactor::DestinationAlpha, BlendFactor::Zero),
            Self::DestinationIn => (BlendFactor::Zero, BlendFactor::SourceAlpha),
            Self::SourceOut => (BlendFactor::OneMinusDestinationAlpha, BlendFactor::Zero),
            Self::DestinationOut => (BlendFactor::Zero, BlendFactor::OneMinusSourceAlpha),
            Self::SourceAtop => (
                BlendFactor::DestinationAlpha,
                BlendFactor::OneMinusSourceAlpha,
            ),
            Self::DestinationAtop => (
                BlendFactor::OneMinusDestinationAlpha,
                BlendFactor::SourceAlpha,
            ),
            Self::Xor => (
                BlendFactor::OneMinusDestinationAlpha,
                BlendFactor::OneMinusSourceAlpha,
            ),
        };

        let component = BlendComponent {
            src_factor,
            dst_factor,
            operation: BlendOp::Add,
        };

        BlendDescriptor {
            enabled: true,
            color: component,
            alpha: component,
            write_mask: ColorWrites::ALL,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::{BlendDescriptor, BlendMode, ColorWrites};

    // Premultiplied test colors: red at 50% over green at 40%.
    const SRC: Vec4 = Vec4::new(0.5, 0.0, 0.0, 0.5);
    const DST: Vec4 = Vec4::new(0.0, 0.4, 0.0, 0.4);

    fn assert_blend(mode: BlendMode, expected: Vec4) {
        let result = mode.descriptor().blend(SRC, DST);
        assert!(
            (result - expected).abs().max_element() < 1e-6,
            "{mode:?}: {result} != {expected}"
        );
    }

    #[test]
    fn porter_duff_operators_match_w3c() {
        assert_blend(BlendMode::Clear, Vec4::new(0.0, 0.0, 0.0, 0.0));
        assert_blend(BlendMode::Copy, Vec4::new(0.5, 0.0, 0.0, 0.5));
        assert_blend(BlendMode::Destination, Vec4::new(0.0, 0.4, 0.0, 0.4));
        assert_blend(BlendMode::SourceOver, Vec4::new(0.5, 0.2, 0.0, 0.7));
        assert_blend(BlendMode::DestinationOver, Vec4::new(0.3, 0.4, 0.0, 0.7));
        assert_blend(BlendMode::SourceIn, Vec4::new(0.2, 0.0, 0.0, 0.2));
        assert_blend(BlendMode::DestinationIn, Vec4::new(0.0, 0.2, 0.0, 0.2));
        assert_blend(BlendMode::SourceOut, Vec4::new(0.3, 0.0, 0.0, 0.3));
        assert_blend(BlendMode::DestinationOut, Vec4::new(0.0, 0.2, 0.0, 0.2));
        assert_blend(BlendMode::SourceAtop, Vec4::new(0.2, 0.2, 0.0, 0.4));
        assert_blend(BlendMode::DestinationAtop, Vec4::new(0.3, 0.2, 0.0, 0.5));
        assert_blend(BlendMode::Xor, Vec4::new(0.3, 0.2, 0.0, 0.5));
    }

    #[test]
    fn disabled_blend_passes_source_through_the_mask() {
        let descriptor = BlendDescriptor::default();
        assert_eq!(descriptor.blend(SRC, DST), SRC);

        let masked = BlendDescriptor {
            write_mask: ColorWrites::RED | ColorWrites::ALPHA,
            ..Default::default()
        };
        assert_eq!(
            masked.blend(Vec4::new(0.5, 0.6, 0.7, 0.8), DST),
            Vec4::new(0.5, 0.0, 0.0, 0.8)
        );
    }

    #[test]
    fn default_blend_is_source_over_for_unpremultiplied_colors() {
        let descriptor = BlendDescriptor {
            enabled: true,
            ..Default::default()
        };

        // Green at 50% alpha over opaque red.
        let result = descriptor.blend(
            Vec4::new(0.0, 1.0, 0.0, 0.5),
            Vec4::new(1.0, 0.0, 0.0, 1.0),
        );
        assert!((result - Vec4::new(0.5, 0.5, 0.0, 1.0)).abs().max_element() < 1e-6);
    }
}
