//! Crop-leaf classification.
//!
//! Wraps a pretrained ONNX classifier behind the [`LeafClassifier`] trait so
//! the handlers never care whether the real model or the brightness-heuristic
//! demo predictor is serving. Input geometry is discovered from the loaded
//! model rather than hardcoded.

use image::{DynamicImage, RgbImage, imageops::FilterType};
use std::path::Path;
use thiserror::Error;
use tract_onnx::prelude::*;

/// Class names in the exact order of the model's output vector.
pub const CLASS_NAMES: [&str; 4] = [
    "Healthy",
    "Disease-damaged",
    "Pest-damaged",
    "Drought-damaged",
];

/// Input size used when the model does not declare a concrete shape.
const DEFAULT_INPUT_SIZE: u32 = 224;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("invalid image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("model load failed: {0}")]
    Load(anyhow::Error),

    #[error("inference failed: {0}")]
    Inference(anyhow::Error),

    #[error("unsupported model input shape {0:?}")]
    UnsupportedShape(Vec<usize>),
}

/// A classifier mapping an RGB image (already resized to `input_size`) to a
/// raw score vector over [`CLASS_NAMES`].
pub trait LeafClassifier: Send + Sync {
    /// Expected input dimensions as (width, height).
    fn input_size(&self) -> (u32, u32);

    /// Produce one score per class. Callers normalize via
    /// [`normalize_probabilities`].
    fn predict(&self, image: &RgbImage) -> Result<Vec<f32>, ClassifierError>;
}

/// Decode uploaded bytes into an image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ClassifierError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Resize to the classifier's input dimensions and drop alpha.
pub fn prepare_input(image: &DynamicImage, (width, height): (u32, u32)) -> RgbImage {
    image
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgb8()
}

/// Rescale raw scores into a probability vector summing to 1.
///
/// A degenerate all-zero output becomes a uniform distribution so downstream
/// arithmetic stays well-defined.
pub fn normalize_probabilities(mut scores: Vec<f32>) -> Vec<f32> {
    for s in scores.iter_mut() {
        if !s.is_finite() || *s < 0.0 {
            *s = 0.0;
        }
    }
    let total: f32 = scores.iter().sum();
    if total > 0.0 {
        for s in scores.iter_mut() {
            *s /= total;
        }
    } else {
        let uniform = 1.0 / scores.len().max(1) as f32;
        for s in scores.iter_mut() {
            *s = uniform;
        }
    }
    scores
}

/// Index and value of the highest-probability class.
pub fn argmax(probabilities: &[f32]) -> (usize, f32) {
    probabilities
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::MIN), |best, (i, p)| {
            if p > best.1 { (i, p) } else { best }
        })
}

/// Derive the 0-100 severity score from the predicted class and confidence.
///
/// A confident "Healthy" call means little damage; for damaged classes the
/// confidence itself is read as damage intensity.
pub fn severity_for(class_name: &str, confidence: f64) -> f64 {
    let severity = if class_name == "Healthy" {
        (1.0 - confidence) * 100.0
    } else {
        confidence * 100.0
    };
    severity.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy)]
enum TensorLayout {
    Nchw,
    Nhwc,
}

type OnnxPlan = TypedRunnableModel<TypedModel>;

/// The pretrained CNN, loaded once at startup.
pub struct OnnxClassifier {
    plan: OnnxPlan,
    width: u32,
    height: u32,
    layout: TensorLayout,
}

impl OnnxClassifier {
    /// Load an ONNX model and discover its input geometry.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(ClassifierError::Load)?;

        // Prefer the shape the model declares; exports with a symbolic batch
        // dimension get pinned to a single NCHW frame instead.
        let typed = match model.clone().into_typed() {
            Ok(t)
                if t.input_fact(0)
                    .map(|f| f.shape.as_concrete().is_some())
                    .unwrap_or(false) =>
            {
                t
            }
            _ => model
                .with_input_fact(
                    0,
                    InferenceFact::dt_shape(
                        f32::datum_type(),
                        tvec!(
                            1,
                            3,
                            DEFAULT_INPUT_SIZE as usize,
                            DEFAULT_INPUT_SIZE as usize
                        ),
                    ),
                )
                .map_err(ClassifierError::Load)?
                .into_typed()
                .map_err(ClassifierError::Load)?,
        };

        let shape = typed
            .input_fact(0)
            .map_err(ClassifierError::Load)?
            .shape
            .as_concrete()
            .map(|s| s.to_vec())
            .unwrap_or_default();

        let (layout, height, width) = match shape.as_slice() {
            [_, 3, h, w] => (TensorLayout::Nchw, *h, *w),
            [_, h, w, 3] => (TensorLayout::Nhwc, *h, *w),
            _ => return Err(ClassifierError::UnsupportedShape(shape)),
        };

        if let Some(out) = typed.output_fact(0).ok().and_then(|f| f.shape.as_concrete()) {
            if out.last().copied() != Some(CLASS_NAMES.len()) {
                tracing::warn!(
                    output_shape = ?out,
                    labels = CLASS_NAMES.len(),
                    "Model output arity does not match the label set; extra scores are ignored"
                );
            }
        }

        let plan = typed
            .into_optimized()
            .map_err(ClassifierError::Load)?
            .into_runnable()
            .map_err(ClassifierError::Load)?;

        tracing::info!(
            path = %path.display(),
            width,
            height,
            layout = ?layout,
            "Loaded crop classifier"
        );

        Ok(Self {
            plan,
            width: width as u32,
            height: height as u32,
            layout,
        })
    }
}

/// MobileNetV2 input scaling: [0, 255] -> [-1, 1].
fn mobilenet_scale(value: u8) -> f32 {
    value as f32 / 127.5 - 1.0
}

impl LeafClassifier for OnnxClassifier {
    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn predict(&self, image: &RgbImage) -> Result<Vec<f32>, ClassifierError> {
        let (h, w) = (self.height as usize, self.width as usize);

        let tensor = match self.layout {
            TensorLayout::Nchw => {
                tract_ndarray::Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
                    mobilenet_scale(image.get_pixel(x as u32, y as u32)[c])
                })
                .into_tensor()
            }
            TensorLayout::Nhwc => {
                tract_ndarray::Array4::from_shape_fn((1, h, w, 3), |(_, y, x, c)| {
                    mobilenet_scale(image.get_pixel(x as u32, y as u32)[c])
                })
                .into_tensor()
            }
        };

        let result = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(ClassifierError::Inference)?;

        let scores = result[0]
            .to_array_view::<f32>()
            .map_err(ClassifierError::Inference)?;

        Ok(scores.iter().copied().collect())
    }
}

/// Demo predictor used when the real model fails to load.
///
/// Buckets the image's mean brightness into fixed score vectors so the rest
/// of the pipeline (threshold, fallback, severity) can be exercised without
/// model weights.
pub struct BrightnessClassifier;

impl LeafClassifier for BrightnessClassifier {
    fn input_size(&self) -> (u32, u32) {
        (128, 128)
    }

    fn predict(&self, image: &RgbImage) -> Result<Vec<f32>, ClassifierError> {
        let gray = image::imageops::grayscale(image);
        let pixels = gray.as_raw();
        let mean = pixels.iter().map(|&p| p as f64).sum::<f64>() / pixels.len().max(1) as f64;

        let scores = if mean < 80.0 {
            vec![0.15, 0.25, 0.35, 0.25]
        } else if mean > 180.0 {
            vec![0.65, 0.15, 0.10, 0.10]
        } else {
            vec![0.30, 0.40, 0.15, 0.15]
        };

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn flat_image(value: u8) -> RgbImage {
        RgbImage::from_pixel(128, 128, Rgb([value, value, value]))
    }

    #[test]
    fn severity_is_inverted_for_healthy() {
        assert!((severity_for("Healthy", 0.9) - 10.0).abs() < 1e-9);
        assert!((severity_for("Healthy", 0.65) - 35.0).abs() < 1e-9);
    }

    #[test]
    fn severity_tracks_confidence_for_damage() {
        assert!((severity_for("Pest-damaged", 0.8) - 80.0).abs() < 1e-9);
        assert!((severity_for("Drought-damaged", 0.61) - 61.0).abs() < 1e-9);
    }

    #[test]
    fn severity_is_clamped() {
        assert_eq!(severity_for("Disease-damaged", 1.5), 100.0);
        assert_eq!(severity_for("Healthy", 1.5), 0.0);
    }

    #[test]
    fn normalization_sums_to_one() {
        let probs = normalize_probabilities(vec![2.0, 1.0, 1.0]);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!((probs[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn normalization_handles_degenerate_scores() {
        let probs = normalize_probabilities(vec![0.0, 0.0, 0.0, 0.0]);
        assert!(probs.iter().all(|&p| (p - 0.25).abs() < 1e-6));

        let probs = normalize_probabilities(vec![f32::NAN, -1.0, 3.0, 0.0]);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!((probs[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn argmax_picks_highest() {
        assert_eq!(argmax(&[0.1, 0.6, 0.2, 0.1]), (1, 0.6));
    }

    #[test]
    fn brightness_buckets_dark_image_as_pest() {
        let probs = BrightnessClassifier.predict(&flat_image(10)).unwrap();
        let probs = normalize_probabilities(probs);
        let (idx, conf) = argmax(&probs);
        assert_eq!(CLASS_NAMES[idx], "Pest-damaged");
        assert!(conf < 0.60);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn brightness_buckets_bright_image_as_healthy() {
        let probs = BrightnessClassifier.predict(&flat_image(250)).unwrap();
        let probs = normalize_probabilities(probs);
        let (idx, conf) = argmax(&probs);
        assert_eq!(CLASS_NAMES[idx], "Healthy");
        assert!(conf >= 0.60);
    }

    #[test]
    fn brightness_buckets_medium_image_as_disease() {
        let probs = BrightnessClassifier.predict(&flat_image(128)).unwrap();
        let (idx, _) = argmax(&probs);
        assert_eq!(CLASS_NAMES[idx], "Disease-damaged");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_image(b"definitely not an image"),
            Err(ClassifierError::Decode(_))
        ));
    }

    #[test]
    fn prepare_input_resizes_to_target() {
        let img = DynamicImage::ImageRgb8(flat_image(90));
        let prepared = prepare_input(&img, (64, 48));
        assert_eq!(prepared.dimensions(), (64, 48));
    }
}
