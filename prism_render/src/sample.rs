use glam::Vec2;
use thiserror::Error;

/// The number of coverage/depth/stencil samples per pixel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SampleCount {
    #[default]
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
    Sixteen = 16,
}

impl SampleCount {
    pub const fn get(self) -> u32 {
        self as u32
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("{0} is not a supported sample count")]
pub struct InvalidSampleCount(pub u32);

impl TryFrom<u32> for SampleCount {
    type Error = InvalidSampleCount;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            16 => Ok(Self::Sixteen),
            _ => Err(InvalidSampleCount(value)),
        }
    }
}

/// The center of a pixel, where the fragment shader is invoked.
pub const SAMPLE_MIDPOINT: Vec2 = Vec2::new(0.5, 0.5);

const LOCATIONS_ONE: [Vec2; 1] = [Vec2::new(0.5, 0.5)];

const LOCATIONS_TWO: [Vec2; 2] = [Vec2::new(0.75, 0.75), Vec2::new(0.25, 0.25)];

const LOCATIONS_FOUR: [Vec2; 4] = [
    Vec2::new(0.375, 0.125),
    Vec2::new(0.875, 0.375),
    Vec2::new(0.125, 0.625),
    Vec2::new(0.625, 0.875),
];

const LOCATIONS_EIGHT: [Vec2; 8] = [
    Vec2::new(0.5625, 0.3125),
    Vec2::new(0.4375, 0.6875),
    Vec2::new(0.8125, 0.5625),
    Vec2::new(0.3125, 0.1875),
    Vec2::new(0.1875, 0.8125),
    Vec2::new(0.0625, 0.4375),
    Vec2::new(0.6875, 0.9375),
    Vec2::new(0.9375, 0.0625),
];

const LOCATIONS_SIXTEEN: [Vec2; 16] = [
    Vec2::new(0.5625, 0.5625),
    Vec2::new(0.4375, 0.3125),
    Vec2::new(0.3125, 0.625),
    Vec2::new(0.75, 0.4375),
    Vec2::new(0.1875, 0.375),
    Vec2::new(0.625, 0.8125),
    Vec2::new(0.8125, 0.6875),
    Vec2::new(0.6875, 0.1875),
    Vec2::new(0.375, 0.875),
    Vec2::new(0.5, 0.0625),
    Vec2::new(0.25, 0.125),
    Vec2::new(0.125, 0.75),
    Vec2::new(0.0, 0.5),
    Vec2::new(0.9375, 0.25),
    Vec2::new(0.875, 0.9375),
    Vec2::new(0.0625, 0.0),
];

/// The standard sample location within a pixel.
///
/// From "Multisampling: Standard sample locations"
/// <https://registry.khronos.org/vulkan/specs/1.3-khr-extensions/html/vkspec.html#primsrast-multisampling>
pub fn sample_location(sample_count: SampleCount, index: u32) -> Vec2 {
    match sample_count {
        SampleCount::One => LOCATIONS_ONE[0],
        SampleCount::Two => LOCATIONS_TWO[index as usize % 2],
        SampleCount::Four => LOCATIONS_FOUR[index as usize % 4],
        SampleCount::Eight => LOCATIONS_EIGHT[index as usize % 8],
        SampleCount::Sixteen => LOCATIONS_SIXTEEN[index as usize % 16],
    }
}

#[cfg(test)]
mod tests {
    use super::{sample_location, SampleCount};

    #[test]
    fn sample_count_conversion() {
        for count in [1, 2, 4, 8, 16] {
            assert_eq!(SampleCount::try_from(count).unwrap().get(), count);
        }

        for count in [0, 3, 5, 32] {
            assert!(SampleCount::try_from(count).is_err());
        }
    }

    #[test]
    fn sample_locations_are_within_the_pixel() {
        for count in [
            SampleCount::One,
            SampleCount::Two,
            SampleCount::Four,
            SampleCount::Eight,
            SampleCount::Sixteen,
        ] {
            for index in 0..count.get() {
                let location = sample_location(count, index);
                assert!(location.x >= 0.0 && location.x < 1.0);
                assert!(location.y >= 0.0 && location.y < 1.0);
            }
        }
    }
}
