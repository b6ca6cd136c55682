//! Foreground/saliency model as a [`RegionSegmenter`].

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, anyhow, bail};
use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::CowArray;
use ort::session::Session;
use ort::value::TensorRef;
use outfit_common::{Mask, RegionSegmenter};
use serde::{Deserialize, Serialize};

use crate::preprocess::image_to_array;
use crate::session::load_session;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Square model input resolution.
    pub input_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    /// Probability above which a pixel is foreground.
    pub threshold: f32,
    /// Set when the model emits logits instead of probabilities.
    pub apply_sigmoid: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            input_size: 320,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            threshold: 0.5,
            apply_sigmoid: false,
        }
    }
}

pub struct OnnxSegmenter {
    session: Mutex<Session>,
    config: SegmenterConfig,
}

impl OnnxSegmenter {
    pub fn new(session: Session, config: SegmenterConfig) -> anyhow::Result<Self> {
        if config.input_size == 0 {
            bail!("Segmenter input size must be positive");
        }
        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    pub fn from_file(model: &Path, config: SegmenterConfig) -> anyhow::Result<Self> {
        let session = load_session(model)?;
        log::info!("Loaded segmenter from {model:?}");
        Self::new(session, config)
    }
}

impl RegionSegmenter for OnnxSegmenter {
    fn segment(&self, crop: &RgbImage) -> anyhow::Result<Mask> {
        let size = self.config.input_size;
        let resized = imageops::resize(crop, size, size, FilterType::Triangle);
        let input_array = image_to_array(&resized, self.config.mean, self.config.std);

        let input_array_dyn = CowArray::from(input_array).into_dyn();
        let input = ort::inputs![TensorRef::from_array_view(&input_array_dyn)?];
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Segmenter session lock poisoned"))?;
        let outputs = session.run(input)?;
        let (shape, output) = outputs[0].try_extract_tensor::<f32>()?;
        let shape: Vec<i64> = shape.iter().copied().collect();

        let (width, height) = crop.dimensions();
        probabilities_to_mask(&shape, output, &self.config, width, height)
            .context("Unexpected segmenter output")
    }
}

/// Thresholds the first `H x W` plane of a `[..., H, W]` output and samples
/// it (nearest neighbour) to `width` x `height`.
pub fn probabilities_to_mask(
    shape: &[i64],
    output: &[f32],
    config: &SegmenterConfig,
    width: u32,
    height: u32,
) -> anyhow::Result<Mask> {
    let [.., rows, cols] = shape else {
        bail!("expected at least a 2-d output, got shape {shape:?}");
    };
    if *rows <= 0 || *cols <= 0 {
        bail!("empty output plane {shape:?}");
    }
    let (rows, cols) = (*rows as u64, *cols as u64);
    if (output.len() as u64) < rows * cols {
        bail!("output has {} values, shape {shape:?} needs {}", output.len(), rows * cols);
    }

    let foreground = |v: f32| {
        let p = if config.apply_sigmoid { 1.0 / (1.0 + (-v).exp()) } else { v };
        p > config.threshold
    };
    Ok(Mask::from_fn(width, height, |x, y| {
        let sx = u64::from(x) * cols / u64::from(width);
        let sy = u64::from(y) * rows / u64::from(height);
        foreground(output[(sy * cols + sx) as usize])
    }))
}
