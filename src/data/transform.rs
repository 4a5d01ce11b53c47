//! Image → tensor transforms, the augmentation strategies' products.

use std::sync::Arc;

use image::{imageops::FilterType, Rgb, RgbImage};
use rand::{rngs::StdRng, Rng};
use serde::{Serialize, Deserialize};

/// Channel-first layout of one image tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl ImageShape {
    pub fn rgb(height: usize, width: usize) -> Self {
        ImageShape { channels: 3, height, width }
    }

    pub fn numel(&self) -> usize {
        self.channels * self.height * self.width
    }

    pub fn index(&self, c: usize, y: usize, x: usize) -> usize {
        (c * self.height + y) * self.width + x
    }
}

/// Turns a decoded image into a normalized CHW tensor.
///
/// `rng` is the per-batch stream; deterministic transforms ignore it.
pub trait Transform: Send + Sync {
    fn apply(&self, image: &RgbImage, rng: &mut StdRng) -> Vec<f64>;

    fn output_shape(&self) -> ImageShape;
}

/// The `{train, val}` pair an augmentation strategy produces.
#[derive(Clone)]
pub struct TransformPair {
    pub train: Arc<dyn Transform>,
    pub val: Arc<dyn Transform>,
}

/// What every augmentation constructor receives.
#[derive(Debug, Clone, Copy)]
pub struct AugmentationArgs {
    /// `(height, width)` after resizing.
    pub resize: (u32, u32),
    pub mean: [f64; 3],
    pub std: [f64; 3],
}

fn resize(image: &RgbImage, (height, width): (u32, u32)) -> RgbImage {
    if image.dimensions() == (width, height) {
        image.clone()
    } else {
        image::imageops::resize(image, width, height, FilterType::Triangle)
    }
}

fn to_tensor(image: &RgbImage, mean: &[f64; 3], std: &[f64; 3]) -> Vec<f64> {
    let (w, h) = image.dimensions();
    let shape = ImageShape::rgb(h as usize, w as usize);
    let mut out = vec![0.0; shape.numel()];
    for (x, y, px) in image.enumerate_pixels() {
        for c in 0..3 {
            let v = px.0[c] as f64 / 255.0;
            out[shape.index(c, y as usize, x as usize)] = (v - mean[c]) / std[c];
        }
    }
    out
}

/// Inverse of the normalization, back to 8-bit RGB. Used for result grids.
pub fn denormalize(tensor: &[f64], shape: ImageShape, mean: &[f64; 3], std: &[f64; 3]) -> RgbImage {
    RgbImage::from_fn(shape.width as u32, shape.height as u32, |x, y| {
        let mut px = [0u8; 3];
        for (c, out) in px.iter_mut().enumerate() {
            let v = tensor[shape.index(c, y as usize, x as usize)] * std[c] + mean[c];
            *out = (v * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        Rgb(px)
    })
}

// ---------------------------------------------------------------------------
// BaseAugmentation
// ---------------------------------------------------------------------------

/// Resize + normalize, nothing random.
pub struct ResizeNormalize {
    pub args: AugmentationArgs,
}

impl Transform for ResizeNormalize {
    fn apply(&self, image: &RgbImage, _rng: &mut StdRng) -> Vec<f64> {
        to_tensor(&resize(image, self.args.resize), &self.args.mean, &self.args.std)
    }

    fn output_shape(&self) -> ImageShape {
        ImageShape::rgb(self.args.resize.0 as usize, self.args.resize.1 as usize)
    }
}

pub fn base_augmentation(args: AugmentationArgs) -> TransformPair {
    let t: Arc<dyn Transform> = Arc::new(ResizeNormalize { args });
    TransformPair { train: t.clone(), val: t }
}

// ---------------------------------------------------------------------------
// CustomAugmentation
// ---------------------------------------------------------------------------

/// Resize, random horizontal flip (p = 0.5), then brightness/contrast
/// jitter of up to ±`jitter`.
pub struct FlipJitter {
    pub args: AugmentationArgs,
    pub jitter: f64,
}

impl Transform for FlipJitter {
    fn apply(&self, image: &RgbImage, rng: &mut StdRng) -> Vec<f64> {
        let mut img = resize(image, self.args.resize);
        if rng.gen_bool(0.5) {
            image::imageops::flip_horizontal_in_place(&mut img);
        }

        let brightness = rng.gen_range(-self.jitter..=self.jitter);
        let contrast = 1.0 + rng.gen_range(-self.jitter..=self.jitter);
        for px in img.pixels_mut() {
            for c in px.0.iter_mut() {
                let v = *c as f64 / 255.0;
                let v = ((v - 0.5) * contrast + 0.5 + brightness).clamp(0.0, 1.0);
                *c = (v * 255.0).round() as u8;
            }
        }

        to_tensor(&img, &self.args.mean, &self.args.std)
    }

    fn output_shape(&self) -> ImageShape {
        ImageShape::rgb(self.args.resize.0 as usize, self.args.resize.1 as usize)
    }
}

pub fn custom_augmentation(args: AugmentationArgs) -> TransformPair {
    TransformPair {
        train: Arc::new(FlipJitter { args, jitter: 0.2 }),
        val: Arc::new(ResizeNormalize { args }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn args() -> AugmentationArgs {
        AugmentationArgs { resize: (4, 6), mean: [0.5; 3], std: [0.25; 3] }
    }

    #[test]
    fn base_resizes_and_normalizes() {
        let img = RgbImage::from_pixel(12, 8, Rgb([255, 0, 128]));
        let pair = base_augmentation(args());
        let t = pair.train.apply(&img, &mut StdRng::seed_from_u64(0));
        let shape = pair.train.output_shape();
        assert_eq!(t.len(), shape.numel());
        assert!((t[shape.index(0, 0, 0)] - 2.0).abs() < 0.02);
        assert!((t[shape.index(1, 3, 5)] + 2.0).abs() < 0.02);
    }

    #[test]
    fn denormalize_inverts_normalize() {
        let img = RgbImage::from_fn(6, 4, |x, y| Rgb([(x * 40) as u8, (y * 60) as u8, 7]));
        let a = args();
        let t = to_tensor(&img, &a.mean, &a.std);
        assert_eq!(denormalize(&t, ImageShape::rgb(4, 6), &a.mean, &a.std), img);
    }

    #[test]
    fn custom_train_is_seed_deterministic() {
        let img = RgbImage::from_fn(6, 4, |x, _| Rgb([(x * 40) as u8, 10, 200]));
        let pair = custom_augmentation(args());
        let a = pair.train.apply(&img, &mut StdRng::seed_from_u64(9));
        let b = pair.train.apply(&img, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
