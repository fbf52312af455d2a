use std::cell::UnsafeCell;

use bytemuck::Pod;
use glam::UVec2;
use rayon::ThreadPool;

use crate::color::Color;
use crate::image::Image;
use crate::sample::SampleCount;

/// A single texel slot that tile workers may write through a shared
/// reference.
///
/// Interior mutability is required because fragment dispatch runs tiles in
/// parallel against `&Texture`. All such access goes through the `unsafe`
/// [`Texture::load`]/[`Texture::store`] pair, whose contract is that callers
/// operate on disjoint texels.
#[repr(transparent)]
#[derive(Debug)]
struct Texel<T>(UnsafeCell<T>);

// SAFETY: Shared access is governed by the load/store contract below; a
// texel is never read and written from two threads at once.
unsafe impl<T: Send + Sync> Sync for Texel<T> {}

/// A typed, optionally multi-sampled 2-D pixel grid.
///
/// Storage is one contiguous allocation of `width * height * samples`
/// elements, indexed `(y * width + x) * samples + sample`.
#[derive(Debug)]
pub struct Texture<T: Pod> {
    texels: Vec<Texel<T>>,
    size: UVec2,
    sample_count: SampleCount,
}

impl<T: Pod> Texture<T> {
    pub fn new(size: UVec2, sample_count: SampleCount) -> Self {
        let len = (size.x * size.y * sample_count.get()) as usize;

        Self {
            texels: (0..len).map(|_| Texel(UnsafeCell::new(T::zeroed()))).collect(),
            size,
            sample_count,
        }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn sample_count(&self) -> SampleCount {
        self.sample_count
    }

    pub fn len(&self) -> usize {
        self.texels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    fn index(&self, pos: UVec2, sample: u32) -> usize {
        let samples = self.sample_count.get();
        ((pos.y * self.size.x + pos.x) * samples + sample % samples) as usize
    }

    pub fn get(&self, pos: UVec2, sample: u32) -> T {
        assert!(pos.x < self.size.x && pos.y < self.size.y);

        // SAFETY: The index is in bounds and the caller holds a shared
        // reference, so no `&mut self` writer exists. Racing unsafe writers
        // are excluded by the `store` contract.
        unsafe { self.load(pos, sample) }
    }

    pub fn set(&mut self, value: T, pos: UVec2, sample: u32) {
        assert!(pos.x < self.size.x && pos.y < self.size.y);

        let index = self.index(pos, sample);
        *self.texels[index].0.get_mut() = value;
    }

    /// Reads a texel through a shared reference.
    ///
    /// # Safety
    ///
    /// `pos` must be within the texture size and no other thread may be
    /// concurrently writing the same texel.
    pub(crate) unsafe fn load(&self, pos: UVec2, sample: u32) -> T {
        let index = self.index(pos, sample);
        debug_assert!(index < self.texels.len());

        // SAFETY: In bounds per the caller contract.
        unsafe { *self.texels.get_unchecked(index).0.get() }
    }

    /// Writes a texel through a shared reference.
    ///
    /// # Safety
    ///
    /// `pos` must be within the texture size and the caller must have
    /// exclusive access to the texel, i.e. no other thread may concurrently
    /// read or write it. Tile dispatch guarantees this by assigning disjoint
    /// screen regions to workers.
    pub(crate) unsafe fn store(&self, value: T, pos: UVec2, sample: u32) {
        let index = self.index(pos, sample);
        debug_assert!(index < self.texels.len());

        // SAFETY: In bounds and exclusive per the caller contract.
        unsafe { *self.texels.get_unchecked(index).0.get() = value };
    }

    pub fn clear(&mut self, value: T) {
        for texel in &mut self.texels {
            *texel.0.get_mut() = value;
        }
    }

    /// Reallocates the texture for `size`, preserving the sample count.
    ///
    /// Returns `false` (leaving the old allocation untouched) if `size` has
    /// a zero dimension. Texel contents are zeroed on success.
    #[must_use]
    pub fn resize(&mut self, size: UVec2) -> bool {
        if size.x == 0 || size.y == 0 {
            return false;
        }

        *self = Self::new(size, self.sample_count);
        true
    }

    /// Reallocates the texture with a new sample count.
    #[must_use]
    pub fn set_sample_count(&mut self, sample_count: SampleCount) -> bool {
        if sample_count == self.sample_count {
            return true;
        }

        *self = Self::new(self.size, sample_count);
        true
    }

    /// The smallest and largest texel values of a single-sampled texture.
    pub fn min_max(&self) -> Option<(T, T)>
    where
        T: PartialOrd,
    {
        if self.sample_count != SampleCount::One || self.texels.is_empty() {
            return None;
        }

        let mut min = self.get(UVec2::ZERO, 0);
        let mut max = min;
        for y in 0..self.size.y {
            for x in 0..self.size.x {
                let value = self.get(UVec2::new(x, y), 0);
                if value < min {
                    min = value;
                }
                if value > max {
                    max = value;
                }
            }
        }

        Some((min, max))
    }

    /// Snapshots a single-sampled texture into an [`Image`], mapping each
    /// texel through `transform`.
    pub fn to_image<F>(&self, transform: F) -> Option<Image>
    where
        F: Fn(T) -> Color,
    {
        if self.sample_count != SampleCount::One {
            return None;
        }

        let mut data = Vec::with_capacity(self.texels.len() * 4);
        for y in 0..self.size.y {
            for x in 0..self.size.x {
                let color = transform(self.get(UVec2::new(x, y), 0));
                data.extend_from_slice(&[color.r(), color.g(), color.b(), color.a()]);
            }
        }

        Image::from_raw(data, self.size).ok()
    }
}

impl Texture<Color> {
    /// The texels of a single-sampled texture as a contiguous RGBA8 buffer
    /// with stride `width * 4`.
    pub fn rgba8(&self) -> &[u8] {
        // SAFETY: `Texel<Color>` is `repr(transparent)` over `Color`, which
        // is plain old data. The returned borrow is tied to `&self`, so no
        // `&mut self` writer can exist while it is alive.
        let texels: &[Color] = unsafe {
            std::slice::from_raw_parts(self.texels.as_ptr().cast(), self.texels.len())
        };
        bytemuck::cast_slice(texels)
    }

    /// Reduces all samples of each pixel into the single-sampled `dst` with
    /// an averaging box filter.
    #[must_use]
    pub fn resolve_into(&self, dst: &Texture<Color>, pool: &ThreadPool, slices: u32) -> bool {
        if dst.size() != self.size {
            return false;
        }
        if dst.sample_count() != SampleCount::One {
            return false;
        }

        let slices = slices.max(1);
        let span = (self.size / slices).max(UVec2::ONE);

        pool.scope(|scope| {
            for sy in 0..slices {
                for sx in 0..slices {
                    let min = UVec2::new(span.x * sx, span.y * sy).min(self.size);
                    // The last slice on each axis absorbs the remainder.
                    let mut max = min + span;
                    if sx == slices - 1 {
                        max.x = self.size.x;
                    }
                    if sy == slices - 1 {
                        max.y = self.size.y;
                    }
                    let max = max.min(self.size);

                    scope.spawn(move |_| self.resolve_region(dst, min, max));
                }
            }
        });

        true
    }

    fn resolve_region(&self, dst: &Texture<Color>, min: UVec2, max: UVec2) {
        let count = self.sample_count.get();

        for y in min.y..max.y {
            for x in min.x..max.x {
                let pos = UVec2::new(x, y);

                let mut samples = [Color::TRANSPARENT; 16];
                for sample in 0..count {
                    // SAFETY: `pos` is within both textures and resolve
                    // regions are disjoint; nothing writes `self` during
                    // resolve.
                    samples[sample as usize] = unsafe { self.load(pos, sample) };
                }

                // SAFETY: Same as above; each `dst` texel belongs to exactly
                // one region.
                unsafe { dst.store(resolve_samples(&samples[..count as usize]), pos, 0) };
            }
        }
    }
}

/// Pairwise reduction of a power-of-two number of samples.
fn resolve_samples(samples: &[Color]) -> Color {
    debug_assert!(samples.len().is_power_of_two() && samples.len() <= 16);

    let mut scratch = [Color::TRANSPARENT; 16];
    let mut len = samples.len();
    scratch[..len].copy_from_slice(samples);

    while len > 1 {
        for i in 0..len / 2 {
            scratch[i] = scratch[2 * i].average_with(scratch[2 * i + 1]);
        }
        len /= 2;
    }

    scratch[0]
}

#[cfg(test)]
mod tests {
    use glam::UVec2;

    use crate::color::Color;
    use crate::sample::SampleCount;

    use super::{resolve_samples, Texture};

    fn pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    #[test]
    fn texture_set_get() {
        let mut texture = Texture::<f32>::new(UVec2::new(4, 3), SampleCount::One);

        texture.set(0.25, UVec2::new(3, 2), 0);
        assert_eq!(texture.get(UVec2::new(3, 2), 0), 0.25);
        assert_eq!(texture.get(UVec2::new(0, 0), 0), 0.0);
    }

    #[test]
    fn texture_samples_are_independent() {
        let mut texture = Texture::<u8>::new(UVec2::new(2, 2), SampleCount::Four);

        texture.set(7, UVec2::new(1, 1), 2);
        assert_eq!(texture.get(UVec2::new(1, 1), 2), 7);
        assert_eq!(texture.get(UVec2::new(1, 1), 0), 0);
        assert_eq!(texture.get(UVec2::new(1, 1), 1), 0);
        assert_eq!(texture.get(UVec2::new(1, 1), 3), 0);
    }

    #[test]
    fn texture_clear() {
        let mut texture = Texture::<Color>::new(UVec2::new(2, 2), SampleCount::Two);

        texture.clear(Color::RED);
        for sample in 0..2 {
            assert_eq!(texture.get(UVec2::new(1, 0), sample), Color::RED);
        }
    }

    #[test]
    fn texture_resize_preserves_sample_count() {
        let mut texture = Texture::<Color>::new(UVec2::new(4, 4), SampleCount::Four);

        assert!(texture.resize(UVec2::new(8, 8)));
        assert_eq!(texture.size(), UVec2::new(8, 8));
        assert_eq!(texture.sample_count(), SampleCount::Four);
        assert_eq!(texture.len(), 8 * 8 * 4);

        assert!(!texture.resize(UVec2::new(0, 8)));
        assert_eq!(texture.size(), UVec2::new(8, 8));
    }

    #[test]
    fn texture_resize_is_idempotent() {
        let mut texture = Texture::<f32>::new(UVec2::new(4, 4), SampleCount::One);

        assert!(texture.resize(UVec2::new(6, 6)));
        assert!(texture.resize(UVec2::new(6, 6)));
        assert_eq!(texture.len(), 36);
    }

    #[test]
    fn resolve_constant_color_is_exact() {
        let mut src = Texture::<Color>::new(UVec2::new(7, 5), SampleCount::Four);
        let dst = Texture::<Color>::new(UVec2::new(7, 5), SampleCount::One);

        src.clear(Color::FIREBRICK);
        assert!(src.resolve_into(&dst, &pool(), 3));

        for y in 0..5 {
            for x in 0..7 {
                assert_eq!(dst.get(UVec2::new(x, y), 0), Color::FIREBRICK);
            }
        }
    }

    #[test]
    fn resolve_requires_single_sampled_target() {
        let src = Texture::<Color>::new(UVec2::new(4, 4), SampleCount::Four);
        let dst = Texture::<Color>::new(UVec2::new(4, 4), SampleCount::Two);
        assert!(!src.resolve_into(&dst, &pool(), 2));

        let dst = Texture::<Color>::new(UVec2::new(8, 4), SampleCount::One);
        assert!(!src.resolve_into(&dst, &pool(), 2));
    }

    #[test]
    fn resolve_samples_averages() {
        let samples = [Color::WHITE, Color::BLACK, Color::WHITE, Color::BLACK];
        assert_eq!(
            resolve_samples(&samples),
            Color::from_rgba8(128, 128, 128, 255)
        );

        assert_eq!(resolve_samples(&[Color::BLUE]), Color::BLUE);
    }
}
