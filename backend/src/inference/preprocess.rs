use image::DynamicImage;
use image::imageops::FilterType;
use ndarray::Array4;

/// Channels-last (NHWC) batch of one image: `[1, height, width, 3]`.
pub type PreprocessedTensor = Array4<f32>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// Pixel / 255.0
    UnitScale,
    /// Pixel * scale[c] + offset[c]
    ChannelAffine { scale: [f32; 3], offset: [f32; 3] },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recipe {
    pub width: u32,
    pub height: u32,
    pub normalization: Normalization,
}

// These pairs are fixed by how the artifacts were trained. Keras'
// EfficientNetV2 and ConvNeXt `preprocess_input` are pass-through: both
// graphs start with their own rescaling layer and expect raw [0, 255] input.
pub const AUTHENTICITY: Recipe = Recipe {
    width: 224,
    height: 224,
    normalization: Normalization::UnitScale,
};

pub const STYLE_EFFNET: Recipe = Recipe {
    width: 260,
    height: 260,
    normalization: Normalization::ChannelAffine {
        scale: [1.0; 3],
        offset: [0.0; 3],
    },
};

pub const STYLE_CONVNEXT: Recipe = Recipe {
    width: 224,
    height: 224,
    normalization: Normalization::ChannelAffine {
        scale: [1.0; 3],
        offset: [0.0; 3],
    },
};

impl Recipe {
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, 3]
    }

    /// Inclusive bounds every value of the output lies within.
    pub fn value_range(&self) -> (f32, f32) {
        match self.normalization {
            Normalization::UnitScale => (0.0, 1.0),
            Normalization::ChannelAffine { scale, offset } => {
                let mut lo = f32::INFINITY;
                let mut hi = f32::NEG_INFINITY;
                for c in 0..3 {
                    let a = offset[c];
                    let b = 255.0 * scale[c] + offset[c];
                    lo = lo.min(a.min(b));
                    hi = hi.max(a.max(b));
                }
                (lo, hi)
            }
        }
    }

    /// Resizes a copy of `image`, forces RGB and normalizes into a fresh tensor.
    pub fn apply(&self, image: &DynamicImage) -> PreprocessedTensor {
        let rgb = image
            .resize_exact(self.width, self.height, FilterType::CatmullRom)
            .to_rgb8();

        let mut tensor = Array4::<f32>::zeros(self.shape());
        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, y as usize, x as usize, c]] = self.normalize(pixel.0[c], c);
            }
        }
        tensor
    }

    fn normalize(&self, value: u8, channel: usize) -> f32 {
        let value = value as f32;
        match self.normalization {
            Normalization::UnitScale => value / 255.0,
            Normalization::ChannelAffine { scale, offset } => value * scale[channel] + offset[channel],
        }
    }
}
