//! Attention overlay rendering.
//!
//! Not a gradient saliency method: a blurred-intensity map is colorized and
//! blended onto the input so the UI has something to show where the model
//! "looked". The file is overwritten on every confident prediction and served
//! back with a cache-busting query parameter.

use image::{Rgb, RgbImage};
use std::path::PathBuf;
use thiserror::Error;

/// Filename the overlay is written to inside the static directory.
const HEATMAP_FILENAME: &str = "heatmap.png";

/// Blur radius approximating the original 21x21 Gaussian kernel.
const BLUR_SIGMA: f32 = 3.5;

/// Blend weights: original image vs colorized attention map.
const ORIGINAL_WEIGHT: f32 = 0.6;
const HEATMAP_WEIGHT: f32 = 0.4;

#[derive(Debug, Error)]
pub enum HeatmapError {
    #[error("failed to write heatmap: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode heatmap: {0}")]
    Encode(#[from] image::ImageError),
}

/// Writes attention overlays into the shared static directory.
#[derive(Debug, Clone)]
pub struct HeatmapRenderer {
    static_dir: PathBuf,
}

impl HeatmapRenderer {
    /// Create the renderer, ensuring the static directory exists.
    pub fn new(static_dir: impl Into<PathBuf>) -> Result<Self, HeatmapError> {
        let static_dir = static_dir.into();
        std::fs::create_dir_all(&static_dir)?;
        Ok(Self { static_dir })
    }

    /// Render the overlay for `image` and return its versioned URL.
    pub fn render(&self, image: &RgbImage) -> Result<String, HeatmapError> {
        let overlay = attention_overlay(image);
        let path = self.static_dir.join(HEATMAP_FILENAME);
        overlay.save(&path)?;

        // Cache-bust so the browser refetches the overwritten file.
        Ok(format!(
            "/api/static/{}?v={}",
            HEATMAP_FILENAME,
            rand::random::<f64>()
        ))
    }

    /// Best-effort variant: a rendering failure downgrades to "no heatmap"
    /// instead of failing the whole prediction.
    pub fn render_or_none(&self, image: &RgbImage) -> Option<String> {
        match self.render(image) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Heatmap rendering failed: {}", e);
                None
            }
        }
    }
}

/// Build the blended attention overlay for an RGB image.
fn attention_overlay(image: &RgbImage) -> RgbImage {
    let gray = image::imageops::grayscale(image);
    let blurred = image::imageops::blur(&gray, BLUR_SIGMA);

    // Min-max normalize the blurred intensity to [0, 1].
    let pixels = blurred.as_raw();
    let min = pixels.iter().copied().min().unwrap_or(0) as f32;
    let max = pixels.iter().copied().max().unwrap_or(0) as f32;
    let range = (max - min).max(1e-8);

    let (width, height) = image.dimensions();
    let mut overlay = RgbImage::new(width, height);

    for (x, y, pixel) in overlay.enumerate_pixels_mut() {
        let attention = (blurred.get_pixel(x, y)[0] as f32 - min) / range;
        let heat = jet(attention);
        let original = image.get_pixel(x, y);

        let mut blended = [0u8; 3];
        for c in 0..3 {
            let value =
                original[c] as f32 * ORIGINAL_WEIGHT + heat[c] as f32 * HEATMAP_WEIGHT;
            blended[c] = value.round().clamp(0.0, 255.0) as u8;
        }
        *pixel = Rgb(blended);
    }

    overlay
}

/// Jet colormap: t in [0, 1] -> RGB, blue through green to red.
fn jet(t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let r = (1.5 - (4.0 * t - 3.0).abs()).clamp(0.0, 1.0);
    let g = (1.5 - (4.0 * t - 2.0).abs()).clamp(0.0, 1.0);
    let b = (1.5 - (4.0 * t - 1.0).abs()).clamp(0.0, 1.0);
    [
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image() -> RgbImage {
        RgbImage::from_fn(64, 64, |x, _| {
            let v = (x * 4).min(255) as u8;
            Rgb([v, v, v])
        })
    }

    #[test]
    fn jet_endpoints_are_blue_and_red() {
        let cold = jet(0.0);
        let hot = jet(1.0);
        assert!(cold[2] > cold[0], "low attention should be blue");
        assert!(hot[0] > hot[2], "high attention should be red");
    }

    #[test]
    fn jet_midpoint_is_green() {
        let mid = jet(0.5);
        assert!(mid[1] >= mid[0] && mid[1] >= mid[2]);
    }

    #[test]
    fn overlay_preserves_dimensions() {
        let overlay = attention_overlay(&gradient_image());
        assert_eq!(overlay.dimensions(), (64, 64));
    }

    #[test]
    fn render_writes_file_and_returns_versioned_url() {
        let dir = std::env::temp_dir().join(format!("heatmap-test-{}", rand::random::<u64>()));
        let renderer = HeatmapRenderer::new(&dir).unwrap();

        let url = renderer.render(&gradient_image()).unwrap();
        assert!(url.starts_with("/api/static/heatmap.png?v="));
        assert!(dir.join("heatmap.png").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn render_or_none_swallows_failures() {
        // Point at a path that cannot be a directory.
        let file = std::env::temp_dir().join(format!("heatmap-file-{}", rand::random::<u64>()));
        std::fs::write(&file, b"occupied").unwrap();
        let renderer = HeatmapRenderer {
            static_dir: file.join("nested"),
        };
        assert!(renderer.render_or_none(&gradient_image()).is_none());
        std::fs::remove_file(&file).ok();
    }
}
