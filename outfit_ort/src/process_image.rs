use std::path::Path;

use anyhow::Context;
use image::RgbImage;
use outfit_common::{AnalysisResult, ClothingAnalyzer};

use crate::annotate::draw_regions;

/// Decodes an image file to RGB, converting other color modes.
pub fn load_rgb(path: &Path) -> anyhow::Result<RgbImage> {
    let image = image::open(path).with_context(|| format!("Could not load image from {path:?}"))?;
    Ok(image.to_rgb8())
}

/// Analyzes a single image file, optionally writing the JSON report and an
/// annotated copy next to it.
pub fn process_image(
    path: &Path,
    analyzer: &ClothingAnalyzer,
    write_outputs: bool,
) -> anyhow::Result<AnalysisResult> {
    let image = load_rgb(path)?;
    let result = analyzer.analyze(&image);

    for detection in result.detections() {
        match detection.description() {
            Some(description) => log::info!("{path:?} #{}: {description}", detection.index),
            None => log::warn!(
                "{path:?} #{}: {}",
                detection.index,
                detection
                    .error()
                    .map(ToString::to_string)
                    .unwrap_or_default()
            ),
        }
    }
    if let Some(err) = result.error() {
        log::warn!("{path:?}: {err}");
    }

    if write_outputs {
        let report_path = path.with_extension("out.json");
        serde_json::to_writer_pretty(std::fs::File::create(&report_path)?, &result)?;

        let mut annotated = image;
        draw_regions(&mut annotated, &result);
        let img_output_path = path.with_extension("out.jpg");
        annotated.save(&img_output_path)?;
        log::info!("Saved {report_path:?} and {img_output_path:?}");
    }

    Ok(result)
}
