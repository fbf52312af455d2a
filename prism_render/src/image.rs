use glam::{IVec2, UVec2, Vec2, Vec4};
use image::load_from_memory;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image data length {len} does not match {size:?} RGBA8 dimensions")]
    SizeMismatch { len: usize, size: UVec2 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    MirrorRepeat,
    ClampToEdge,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sampler {
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub filter: FilterMode,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            filter: FilterMode::Nearest,
        }
    }
}

/// An immutable decoded RGBA8 image with sampling state.
#[derive(Clone, Debug)]
pub struct Image {
    data: Vec<u8>,
    size: UVec2,
    sampler: Sampler,
}

impl Image {
    /// Decodes an encoded (PNG, JPEG, ...) image into RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let img = load_from_memory(bytes)?;
        let data = img.to_rgba8();
        let size = UVec2::new(data.width(), data.height());

        Ok(Self {
            data: data.into_raw(),
            size,
            sampler: Sampler::default(),
        })
    }

    /// Wraps an already decoded RGBA8 buffer.
    pub fn from_raw(data: Vec<u8>, size: UVec2) -> Result<Self, ImageError> {
        if data.len() != (size.x * size.y * 4) as usize {
            return Err(ImageError::SizeMismatch {
                len: data.len(),
                size,
            });
        }

        Ok(Self {
            data,
            size,
            sampler: Sampler::default(),
        })
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn sampler(&self) -> Sampler {
        self.sampler
    }

    pub fn set_sampler(&mut self, sampler: Sampler) {
        self.sampler = sampler;
    }

    /// Samples the image at `uv`, applying the sampler's address modes and
    /// filter. Out-of-range coordinates are defined by the address mode.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        if self.size.x * self.size.y == 0 {
            return Vec4::new(0.0, 0.0, 0.0, 1.0);
        }

        let uv = Vec2::new(
            wrap(uv.x, self.sampler.address_mode_u),
            wrap(uv.y, self.sampler.address_mode_v),
        );

        match self.sampler.filter {
            FilterMode::Nearest => self.sample_unit_nearest(uv),
            FilterMode::Linear => self.sample_unit_linear(uv),
        }
    }

    fn sample_unit_nearest(&self, uv: Vec2) -> Vec4 {
        let size = self.size.as_vec2();

        self.texel(IVec2::new(
            (uv.x * size.x).clamp(0.0, size.x - 1.0) as i32,
            (uv.y * size.y).clamp(0.0, size.y - 1.0) as i32,
        ))
    }

    // Section 3.7.7 "Texture Minification"
    // https://registry.khronos.org/OpenGL/specs/es/2.0/es_full_spec_2.0.pdf
    fn sample_unit_linear(&self, uv: Vec2) -> Vec4 {
        let size = self.size.as_vec2();

        let x = uv.x * size.x;
        let y = uv.y * size.y;

        let mut i0 = (x - 0.5).floor();
        let mut j0 = (y - 0.5).floor();

        if self.sampler.address_mode_u == AddressMode::Repeat {
            i0 = i0.rem_euclid(size.x);
        }
        if self.sampler.address_mode_v == AddressMode::Repeat {
            j0 = j0.rem_euclid(size.y);
        }

        let mut i1 = i0 + 1.0;
        let mut j1 = j0 + 1.0;

        if self.sampler.address_mode_u == AddressMode::Repeat {
            i1 = i1.rem_euclid(size.x);
        }
        if self.sampler.address_mode_v == AddressMode::Repeat {
            j1 = j1.rem_euclid(size.y);
        }

        let a = fract(x - 0.5);
        let b = fract(y - 0.5);

        let t00 = self.texel(IVec2::new(i0 as i32, j0 as i32));
        let t10 = self.texel(IVec2::new(i1 as i32, j0 as i32));
        let t01 = self.texel(IVec2::new(i0 as i32, j1 as i32));
        let t11 = self.texel(IVec2::new(i1 as i32, j1 as i32));

        ((1.0 - a) * (1.0 - b) * t00)
            + (a * (1.0 - b) * t10)
            + ((1.0 - a) * b * t01)
            + (a * b * t11)
    }

    fn texel(&self, xy: IVec2) -> Vec4 {
        let xy = xy.clamp(IVec2::ZERO, self.size.as_ivec2() - 1);
        let offset = ((self.size.x as i32 * xy.y + xy.x) * 4) as usize;

        let texel = &self.data[offset..offset + 4];
        Vec4::new(
            texel[0] as f32 / 255.0,
            texel[1] as f32 / 255.0,
            texel[2] as f32 / 255.0,
            texel[3] as f32 / 255.0,
        )
    }
}

// Section 3.7.6 "Texture Wrap Modes"
// https://registry.khronos.org/OpenGL/specs/es/2.0/es_full_spec_2.0.pdf
fn wrap(location: f32, mode: AddressMode) -> f32 {
    match mode {
        AddressMode::ClampToEdge => location.clamp(0.0, 1.0),
        AddressMode::Repeat => fract(location),
        AddressMode::MirrorRepeat => {
            let is_even = (location.floor() as i64) % 2 == 0;
            let fract = fract(location);
            if is_even {
                fract
            } else {
                1.0 - fract
            }
        }
    }
}

/// `x - floor(x)`, which unlike `f32::fract` is non-negative for negative
/// inputs.
fn fract(x: f32) -> f32 {
    x - x.floor()
}

#[cfg(test)]
mod tests {
    use glam::{UVec2, Vec2, Vec4};

    use super::{AddressMode, FilterMode, Image, Sampler};

    /// 2x2 image: red, green over blue, white.
    fn checker() -> Image {
        let data = vec![
            255, 0, 0, 255, /**/ 0, 255, 0, 255, //
            0, 0, 255, 255, /**/ 255, 255, 255, 255, //
        ];
        Image::from_raw(data, UVec2::new(2, 2)).unwrap()
    }

    #[test]
    fn image_from_raw_validates_length() {
        assert!(Image::from_raw(vec![0; 16], UVec2::new(2, 2)).is_ok());
        assert!(Image::from_raw(vec![0; 15], UVec2::new(2, 2)).is_err());
    }

    #[test]
    fn sample_nearest_hits_texel_centers() {
        let image = checker();

        assert_eq!(
            image.sample(Vec2::new(0.25, 0.25)),
            Vec4::new(1.0, 0.0, 0.0, 1.0)
        );
        assert_eq!(
            image.sample(Vec2::new(0.75, 0.25)),
            Vec4::new(0.0, 1.0, 0.0, 1.0)
        );
        assert_eq!(
            image.sample(Vec2::new(0.25, 0.75)),
            Vec4::new(0.0, 0.0, 1.0, 1.0)
        );
    }

    #[test]
    fn sample_repeat_is_periodic() {
        let image = checker();

        for k in [-2.0, -1.0, 1.0, 3.0] {
            assert_eq!(
                image.sample(Vec2::new(0.25 + k, 0.75)),
                image.sample(Vec2::new(0.25, 0.75))
            );
        }
    }

    #[test]
    fn sample_mirror_reflects_odd_periods() {
        let mut image = checker();
        image.set_sampler(Sampler {
            address_mode_u: AddressMode::MirrorRepeat,
            address_mode_v: AddressMode::MirrorRepeat,
            filter: FilterMode::Nearest,
        });

        // u = -0.25 lies in an odd period: mirrored back to 1 - 0.75 = 0.25.
        assert_eq!(
            image.sample(Vec2::new(-0.25, 0.25)),
            image.sample(Vec2::new(0.25, 0.25))
        );
    }

    #[test]
    fn sample_clamp_saturates() {
        let mut image = checker();
        image.set_sampler(Sampler {
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            filter: FilterMode::Nearest,
        });

        assert_eq!(
            image.sample(Vec2::new(4.0, -3.0)),
            image.sample(Vec2::new(1.0, 0.0))
        );
    }

    #[test]
    fn sample_linear_blends_neighbors() {
        let mut image = checker();
        image.set_sampler(Sampler {
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            filter: FilterMode::Linear,
        });

        // Dead center of the image blends all four texels equally.
        let center = image.sample(Vec2::new(0.5, 0.5));
        assert!((center - Vec4::new(0.5, 0.5, 0.5, 1.0)).abs().max_element() < 1e-6);
    }

    #[test]
    fn empty_image_samples_black() {
        let image = Image::from_raw(Vec::new(), UVec2::ZERO).unwrap();
        assert_eq!(image.sample(Vec2::new(0.3, 0.3)), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }
}
