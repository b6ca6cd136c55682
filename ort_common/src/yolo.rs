//! YOLOv8 detection model as an [`ObjectLocator`].

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, anyhow, bail};
use image::RgbImage;
use ndarray::CowArray;
use ort::session::Session;
use ort::value::TensorRef;
use outfit_common::{BoundingBox, ObjectLocator, coco_classes};
use serde::{Deserialize, Serialize};

use crate::preprocess::{Letterbox, image_to_array, letterbox};
use crate::session::load_session;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Square model input resolution.
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// COCO class names to keep.
    pub classes: Vec<String>,
    pub max_detections: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            classes: vec!["person".to_string()],
            max_detections: 300,
        }
    }
}

impl LocatorConfig {
    /// Resolves class names to model output indices.
    pub fn class_indices(&self) -> anyhow::Result<Vec<usize>> {
        self.classes
            .iter()
            .map(|name| {
                coco_classes::index_of(name).ok_or_else(|| anyhow!("Unknown COCO class {name:?}"))
            })
            .collect()
    }
}

/// Candidate box in model input coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    pub class: usize,
    pub score: f32,
}

impl Detection {
    pub fn area(&self) -> f32 {
        (self.xmax - self.xmin).max(0.0) * (self.ymax - self.ymin).max(0.0)
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        let ix = (self.xmax.min(other.xmax) - self.xmin.max(other.xmin)).max(0.0);
        let iy = (self.ymax.min(other.ymax) - self.ymin.max(other.ymin)).max(0.0);
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

pub struct YoloLocator {
    // ort needs `&mut` to run; the locator trait hands out `&self`.
    session: Mutex<Session>,
    config: LocatorConfig,
    class_indices: Vec<usize>,
}

impl YoloLocator {
    pub fn new(session: Session, config: LocatorConfig) -> anyhow::Result<Self> {
        let class_indices = config.class_indices()?;
        if config.input_size == 0 {
            bail!("Locator input size must be positive");
        }
        Ok(Self {
            session: Mutex::new(session),
            config,
            class_indices,
        })
    }

    pub fn from_file(model: &Path, config: LocatorConfig) -> anyhow::Result<Self> {
        let session = load_session(model)?;
        log::info!("Loaded YOLO locator from {model:?}, classes {:?}", config.classes);
        Self::new(session, config)
    }
}

impl ObjectLocator for YoloLocator {
    fn locate(&self, image: &RgbImage) -> anyhow::Result<Vec<BoundingBox>> {
        let (boxed, geometry) = letterbox(image, self.config.input_size);
        let input_array = image_to_array(&boxed, [0.0; 3], [1.0; 3]);

        let input_array_dyn = CowArray::from(input_array).into_dyn();
        let input = ort::inputs![TensorRef::from_array_view(&input_array_dyn)?];
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("YOLO session lock poisoned"))?;
        let outputs = session.run(input)?;
        let (shape, output) = outputs[0].try_extract_tensor::<f32>()?;
        let shape: Vec<i64> = shape.iter().copied().collect();

        let candidates = decode_predictions(
            &shape,
            output,
            &self.class_indices,
            self.config.confidence_threshold,
        )
        .context("Unexpected YOLO output")?;
        let mut kept = non_max_suppression(candidates, self.config.iou_threshold);
        kept.truncate(self.config.max_detections);

        let (width, height) = image.dimensions();
        let boxes: Vec<BoundingBox> = kept
            .iter()
            .map(|det| to_source_box(det, &geometry, width, height))
            .collect();
        log::debug!("YOLO kept {} box(es): {boxes:?}", boxes.len());
        Ok(boxes)
    }
}

/// Parses a `[1, 4 + C, N]` YOLOv8 output: per anchor `cx, cy, w, h`
/// followed by C class scores. An anchor is kept when its best class is one
/// of `classes` and scores at least `confidence`.
pub fn decode_predictions(
    shape: &[i64],
    output: &[f32],
    classes: &[usize],
    confidence: f32,
) -> anyhow::Result<Vec<Detection>> {
    let [batch, rows, anchors] = shape else {
        bail!("expected a 3-d output, got shape {shape:?}");
    };
    if *batch != 1 || *rows < 5 || *anchors < 0 {
        bail!("unsupported output shape {shape:?}");
    }
    let (rows, anchors) = (*rows as usize, *anchors as usize);
    if output.len() < rows * anchors {
        bail!("output has {} values, shape {shape:?} needs {}", output.len(), rows * anchors);
    }
    let at = |row: usize, anchor: usize| output[row * anchors + anchor];

    let mut detections = Vec::new();
    for i in 0..anchors {
        let (class, score) = (0..rows - 4)
            .map(|c| (c, at(4 + c, i)))
            .fold((0, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
        if score < confidence || !classes.contains(&class) {
            continue;
        }
        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        detections.push(Detection {
            xmin: cx - w / 2.0,
            ymin: cy - h / 2.0,
            xmax: cx + w / 2.0,
            ymax: cy + h / 2.0,
            class,
            score,
        });
    }
    Ok(detections)
}

/// Class-wise greedy NMS. Output is ordered by descending score.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Detection> = Vec::new();
    for det in detections {
        let suppressed = kept
            .iter()
            .any(|k| k.class == det.class && k.iou(&det) > iou_threshold);
        if !suppressed {
            kept.push(det);
        }
    }
    kept
}

/// Undoes the letterbox, clamps to the image and truncates to pixels.
fn to_source_box(det: &Detection, geometry: &Letterbox, width: u32, height: u32) -> BoundingBox {
    let (x1, y1) = geometry.to_source(det.xmin, det.ymin);
    let (x2, y2) = geometry.to_source(det.xmax, det.ymax);
    let (w, h) = (width as f32, height as f32);
    BoundingBox::new(
        x1.clamp(0.0, w) as i32,
        y1.clamp(0.0, h) as i32,
        x2.clamp(0.0, w) as i32,
        y2.clamp(0.0, h) as i32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(xmin: f32, ymin: f32, xmax: f32, ymax: f32, class: usize, score: f32) -> Detection {
        Detection {
            xmin,
            ymin,
            xmax,
            ymax,
            class,
            score,
        }
    }

    /// Builds a `[1, 4 + classes, anchors]` buffer from per-anchor rows.
    fn output_buffer(anchors: &[([f32; 4], Vec<f32>)]) -> (Vec<i64>, Vec<f32>) {
        let classes = anchors[0].1.len();
        let rows = 4 + classes;
        let n = anchors.len();
        let mut data = vec![0.0; rows * n];
        for (i, (bbox, scores)) in anchors.iter().enumerate() {
            for (r, v) in bbox.iter().chain(scores.iter()).enumerate() {
                data[r * n + i] = *v;
            }
        }
        (vec![1, rows as i64, n as i64], data)
    }

    #[test]
    fn test_decode_filters_class_and_confidence() {
        let (shape, data) = output_buffer(&[
            ([50.0, 50.0, 20.0, 40.0], vec![0.9, 0.1]),
            ([10.0, 10.0, 4.0, 4.0], vec![0.1, 0.8]),
            ([30.0, 30.0, 10.0, 10.0], vec![0.2, 0.05]),
        ]);
        let dets = decode_predictions(&shape, &data, &[0], 0.25).unwrap();
        assert_eq!(dets, vec![det(40.0, 30.0, 60.0, 70.0, 0, 0.9)]);

        let both = decode_predictions(&shape, &data, &[0, 1], 0.15).unwrap();
        assert_eq!(both.len(), 3);
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        assert!(decode_predictions(&[1, 84], &[], &[0], 0.25).is_err());
        assert!(decode_predictions(&[2, 84, 1], &[0.0; 168], &[0], 0.25).is_err());
        assert!(decode_predictions(&[1, 84, 10], &[0.0; 10], &[0], 0.25).is_err());
    }

    #[test]
    fn test_iou() {
        let a = det(0.0, 0.0, 10.0, 10.0, 0, 1.0);
        let b = det(5.0, 0.0, 15.0, 10.0, 0, 1.0);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(a.iou(&det(20.0, 20.0, 30.0, 30.0, 0, 1.0)), 0.0);
        assert_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_nms_is_classwise_and_sorted() {
        let kept = non_max_suppression(
            vec![
                det(0.0, 0.0, 10.0, 10.0, 0, 0.6),
                det(1.0, 1.0, 11.0, 11.0, 0, 0.9),
                det(1.0, 1.0, 11.0, 11.0, 1, 0.5),
                det(50.0, 50.0, 60.0, 60.0, 0, 0.7),
            ],
            0.45,
        );
        let scores: Vec<f32> = kept.iter().map(|d| d.score).collect();
        assert_eq!(scores, vec![0.9, 0.7, 0.5]);
    }

    #[test]
    fn test_to_source_box() {
        let geometry = Letterbox {
            scale: 0.5,
            pad_x: 0.0,
            pad_y: 25.0,
        };
        let b = to_source_box(&det(10.0, 20.0, 60.5, 90.0, 0, 1.0), &geometry, 200, 100);
        assert_eq!(b, BoundingBox::new(20, 0, 121, 100));
    }

    #[test]
    fn test_class_indices() {
        let config = LocatorConfig {
            classes: vec!["person".to_string(), "handbag".to_string()],
            ..LocatorConfig::default()
        };
        assert_eq!(config.class_indices().unwrap(), vec![0, 26]);

        let bad = LocatorConfig {
            classes: vec!["dragon".to_string()],
            ..LocatorConfig::default()
        };
        assert!(bad.class_indices().is_err());
    }
}
