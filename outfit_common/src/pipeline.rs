//! Locate → crop → segment → cluster → describe, per detected region.

use std::panic::{self, AssertUnwindSafe};

use image::RgbImage;

use crate::bbox::{BoundingBox, CropRegion};
use crate::color_names::ColorNamer;
use crate::config::AnalyzerConfig;
use crate::describe::describe_outfit;
use crate::dominant_colors::extract_dominant_colors;
use crate::error::{AnalysisError, RegionError};
use crate::mask::Mask;
use crate::results::{AnalysisResult, NamedColor, RegionOutcome, RegionResult};
use crate::stage_times::{timed, StageTimes};

/// Finds subjects in a whole image.
pub trait ObjectLocator: Send + Sync {
    fn locate(&self, image: &RgbImage) -> anyhow::Result<Vec<BoundingBox>>;
}

/// Separates the subject from the background inside a crop.
/// The returned mask must have the crop's dimensions.
pub trait RegionSegmenter: Send + Sync {
    fn segment(&self, crop: &RgbImage) -> anyhow::Result<Mask>;
}

/// Immutable analysis handle: collaborators plus configuration.
/// Holds no per-call state, so one instance can serve concurrent callers.
pub struct ClothingAnalyzer {
    locator: Box<dyn ObjectLocator>,
    segmenter: Option<Box<dyn RegionSegmenter>>,
    namer: ColorNamer,
    config: AnalyzerConfig,
}

impl ClothingAnalyzer {
    pub fn new(locator: impl ObjectLocator + 'static, config: AnalyzerConfig) -> Self {
        Self {
            locator: Box::new(locator),
            segmenter: None,
            namer: ColorNamer::default(),
            config,
        }
    }

    pub fn with_segmenter(mut self, segmenter: impl RegionSegmenter + 'static) -> Self {
        self.segmenter = Some(Box::new(segmenter));
        self
    }

    pub fn with_namer(mut self, namer: ColorNamer) -> Self {
        self.namer = namer;
        self
    }

    pub fn has_segmenter(&self) -> bool {
        self.segmenter.is_some()
    }

    /// Analyzes one image. Never fails: errors are reported in the result.
    pub fn analyze(&self, image: &RgbImage) -> AnalysisResult {
        let mut times = StageTimes::default();
        let result = self.analyze_timed(image, &mut times);
        log::debug!("{times:?} (total {:?})", times.total());
        result
    }

    /// Analyzes independent images, one result per image in input order.
    pub fn analyze_batch(&self, images: &[RgbImage]) -> Vec<AnalysisResult> {
        images.iter().map(|image| self.analyze(image)).collect()
    }

    fn analyze_timed(&self, image: &RgbImage, times: &mut StageTimes) -> AnalysisResult {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return AnalysisResult::Failed(AnalysisError::InvalidImage { width, height });
        }

        let located = timed(&mut times.locate, || {
            panic::catch_unwind(AssertUnwindSafe(|| self.locator.locate(image)))
        });
        let boxes = match located {
            Ok(Ok(boxes)) => boxes,
            Ok(Err(err)) => {
                log::error!("Object locator failed: {err:#}");
                return AnalysisResult::Failed(AnalysisError::Locator(format!("{err:#}")));
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                log::error!("Object locator panicked: {msg}");
                return AnalysisResult::Failed(AnalysisError::Locator(msg));
            }
        };
        if boxes.is_empty() {
            log::info!("No regions found in {width}x{height} image");
            return AnalysisResult::Failed(AnalysisError::NoRegionsFound);
        }

        let regions: Vec<CropRegion> = boxes
            .iter()
            .filter_map(|bbox| {
                let clipped = bbox.clip(width, height);
                if clipped.is_none() {
                    log::debug!("Dropping {bbox:?}: empty after clipping to {width}x{height}");
                }
                clipped
            })
            .collect();
        log::info!(
            "Analyzing {} region(s) ({} located, {} dropped)",
            regions.len(),
            boxes.len(),
            boxes.len() - regions.len()
        );

        let detections = regions
            .iter()
            .enumerate()
            .map(|(index, region)| {
                let crop = region.crop(image);
                let outcome = match panic::catch_unwind(AssertUnwindSafe(|| {
                    self.process_region(&crop, times)
                })) {
                    Ok(Ok((description, colors))) => RegionOutcome::Described {
                        description,
                        colors,
                    },
                    Ok(Err(err)) => {
                        log::warn!("Region {index} failed: {err}");
                        RegionOutcome::Failed(err)
                    }
                    Err(payload) => {
                        let msg = panic_message(payload.as_ref());
                        log::warn!("Region {index} panicked: {msg}");
                        RegionOutcome::Failed(RegionError::Panicked(msg))
                    }
                };
                RegionResult {
                    index,
                    region: *region,
                    outcome,
                }
            })
            .collect();

        AnalysisResult::Completed(detections)
    }

    fn process_region(
        &self,
        crop: &RgbImage,
        times: &mut StageTimes,
    ) -> Result<(String, Vec<NamedColor>), RegionError> {
        let mask = timed(&mut times.segment, || self.mask_for(crop));
        let clusters = timed(&mut times.cluster, || {
            extract_dominant_colors(crop, Some(&mask), &self.config.clustering)
        })?;

        timed(&mut times.describe, || {
            let description = describe_outfit(&clusters, &self.namer);
            let colors = clusters
                .iter()
                .map(|c| NamedColor {
                    name: self.namer.name(c.rgb).to_string(),
                    rgb: c.rgb,
                    fraction: c.fraction,
                })
                .collect();
            Ok((description, colors))
        })
    }

    /// Segmenter mask, or a full-crop mask when segmentation is unavailable.
    fn mask_for(&self, crop: &RgbImage) -> Mask {
        let (width, height) = crop.dimensions();
        let Some(segmenter) = &self.segmenter else {
            log::debug!("No segmenter configured, using full {width}x{height} mask");
            return Mask::full(width, height);
        };
        match panic::catch_unwind(AssertUnwindSafe(|| segmenter.segment(crop))) {
            Ok(Ok(mask)) => mask,
            Ok(Err(err)) => {
                log::warn!("Segmentation failed, using full {width}x{height} mask: {err:#}");
                Mask::full(width, height)
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                log::warn!("Segmenter panicked, using full {width}x{height} mask: {msg}");
                Mask::full(width, height)
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
