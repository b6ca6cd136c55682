//! Dominant color extraction by weighted k-means over the RGB cube.
//!
//! Pixels are reduced to a histogram of distinct colors first, each distinct
//! color clustered with its pixel count as weight. The result is identical to
//! clustering every pixel, but flat regions collapse to a handful of points.

use std::collections::BTreeMap;

use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::ClusterParams;
use crate::error::ExtractError;
use crate::mask::Mask;
use crate::Rgb;

/// Cluster centroid with its share of the participating pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorCluster {
    pub rgb: Rgb,
    /// In [0, 1].
    pub fraction: f64,
}

/// Clusters the masked pixels of `crop` into at most `params.clusters` colors.
///
/// Without a mask every pixel participates. An all-background mask gives an
/// empty result. Output is ordered by descending fraction.
pub fn extract_dominant_colors(
    crop: &RgbImage,
    mask: Option<&Mask>,
    params: &ClusterParams,
) -> Result<Vec<ColorCluster>, ExtractError> {
    if params.clusters == 0 {
        return Err(ExtractError::InvalidClusterCount);
    }
    if let Some(mask) = mask {
        if mask.dimensions() != crop.dimensions() {
            return Err(ExtractError::MaskShapeMismatch {
                mask_width: mask.width(),
                mask_height: mask.height(),
                crop_width: crop.width(),
                crop_height: crop.height(),
            });
        }
    }

    let points = color_histogram(crop, mask);
    if points.is_empty() {
        return Ok(Vec::new());
    }

    let k = params.clusters.min(points.len());
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<KMeansRun> = None;
    for _ in 0..params.restarts.max(1) {
        let run = lloyd(&points, k, params, &mut rng);
        match &best {
            Some(b) if b.inertia <= run.inertia => {}
            _ => best = Some(run),
        }
    }
    let Some(best) = best else {
        return Ok(Vec::new());
    };

    let total: f64 = points.iter().map(|p| p.weight).sum();
    let mut clusters: Vec<ColorCluster> = best
        .centroids
        .iter()
        .zip(best.weights.iter())
        .filter(|(_, w)| **w > 0.0)
        .map(|(c, &w)| ColorCluster {
            rgb: truncate_centroid(c),
            fraction: w / total,
        })
        .collect();
    // stable sort keeps centroid order among equal fractions
    clusters.sort_by(|a, b| b.fraction.total_cmp(&a.fraction));

    log::debug!(
        "Clustered {} distinct colors ({} px) into {} clusters",
        points.len(),
        total,
        clusters.len()
    );
    Ok(clusters)
}

#[derive(Debug, Clone, Copy)]
struct WeightedPoint {
    color: [f64; 3],
    weight: f64,
}

struct KMeansRun {
    centroids: Vec<[f64; 3]>,
    weights: Vec<f64>,
    inertia: f64,
}

/// Distinct participating colors with their pixel counts, ordered by RGB.
fn color_histogram(crop: &RgbImage, mask: Option<&Mask>) -> Vec<WeightedPoint> {
    let mut counts: BTreeMap<Rgb, u64> = BTreeMap::new();
    for (x, y, pixel) in crop.enumerate_pixels() {
        if mask.is_some_and(|m| !m.get(x, y)) {
            continue;
        }
        *counts.entry(pixel.0).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(rgb, count)| WeightedPoint {
            color: [rgb[0] as f64, rgb[1] as f64, rgb[2] as f64],
            weight: count as f64,
        })
        .collect()
}

fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

/// Index of the nearest centroid, lowest index on ties.
fn nearest(point: &[f64; 3], centroids: &[[f64; 3]]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// Weighted k-means++ seeding. `k` must not exceed `points.len()`.
fn kmeans_plus_plus(points: &[WeightedPoint], k: usize, rng: &mut StdRng) -> Vec<[f64; 3]> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[sample_index(points.iter().map(|p| p.weight), rng)].color);

    while centroids.len() < k {
        let scores: Vec<f64> = points
            .iter()
            .map(|p| p.weight * nearest(&p.color, &centroids).1)
            .collect();
        if scores.iter().sum::<f64>() <= 0.0 {
            break;
        }
        centroids.push(points[sample_index(scores.iter().copied(), rng)].color);
    }
    centroids
}

/// Draws an index with probability proportional to its score.
fn sample_index(scores: impl Iterator<Item = f64> + Clone, rng: &mut StdRng) -> usize {
    let total: f64 = scores.clone().sum();
    let mut target = rng.gen::<f64>() * total;
    let mut last_positive = 0;
    for (i, s) in scores.enumerate() {
        if s <= 0.0 {
            continue;
        }
        last_positive = i;
        if target < s {
            return i;
        }
        target -= s;
    }
    last_positive
}

fn lloyd(
    points: &[WeightedPoint],
    k: usize,
    params: &ClusterParams,
    rng: &mut StdRng,
) -> KMeansRun {
    let mut centroids = kmeans_plus_plus(points, k, rng);
    let mut labels = vec![usize::MAX; points.len()];

    for _ in 0..params.max_iterations.max(1) {
        let mut changed = false;
        for (label, p) in labels.iter_mut().zip(points) {
            let (idx, _) = nearest(&p.color, &centroids);
            if *label != idx {
                *label = idx;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![[0.0f64; 3]; centroids.len()];
        let mut weights = vec![0.0f64; centroids.len()];
        for (&label, p) in labels.iter().zip(points) {
            for ch in 0..3 {
                sums[label][ch] += p.color[ch] * p.weight;
            }
            weights[label] += p.weight;
        }

        let mut max_shift = 0.0f64;
        for (i, c) in centroids.iter_mut().enumerate() {
            // an empty cluster keeps its previous centroid
            if weights[i] > 0.0 {
                let updated = [
                    sums[i][0] / weights[i],
                    sums[i][1] / weights[i],
                    sums[i][2] / weights[i],
                ];
                max_shift = max_shift.max(squared_distance(c, &updated).sqrt());
                *c = updated;
            }
        }
        if max_shift <= params.tolerance {
            break;
        }
    }

    // final assignment against the final centroids
    let mut weights = vec![0.0f64; centroids.len()];
    let mut inertia = 0.0;
    for p in points {
        let (idx, d) = nearest(&p.color, &centroids);
        weights[idx] += p.weight;
        inertia += d * p.weight;
    }

    KMeansRun {
        centroids,
        weights,
        inertia,
    }
}

fn truncate_centroid(c: &[f64; 3]) -> Rgb {
    [
        c[0].clamp(0.0, 255.0) as u8,
        c[1].clamp(0.0, 255.0) as u8,
        c[2].clamp(0.0, 255.0) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_image(width: u32, height: u32, split_row: u32, top: Rgb, bottom: Rgb) -> RgbImage {
        RgbImage::from_fn(width, height, |_, y| {
            image::Rgb(if y < split_row { top } else { bottom })
        })
    }

    fn fraction_of(clusters: &[ColorCluster], rgb: Rgb) -> Option<f64> {
        clusters.iter().find(|c| c.rgb == rgb).map(|c| c.fraction)
    }

    #[test]
    fn test_two_color_split_collapses_extra_cluster() {
        let image = split_image(400, 400, 280, [255, 0, 0], [0, 0, 0]);
        let clusters =
            extract_dominant_colors(&image, Some(&Mask::full(400, 400)), &ClusterParams::default())
                .unwrap();

        assert_eq!(clusters.len(), 2);
        assert!((fraction_of(&clusters, [255, 0, 0]).unwrap() - 0.7).abs() < 1e-9);
        assert!((fraction_of(&clusters, [0, 0, 0]).unwrap() - 0.3).abs() < 1e-9);
        // descending order
        assert_eq!(clusters[0].rgb, [255, 0, 0]);
    }

    #[test]
    fn test_empty_mask_gives_no_clusters() {
        let image = split_image(10, 10, 5, [1, 2, 3], [4, 5, 6]);
        let clusters =
            extract_dominant_colors(&image, Some(&Mask::empty(10, 10)), &ClusterParams::default())
                .unwrap();
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_mask_restricts_pixels() {
        let image = split_image(10, 10, 5, [200, 10, 10], [10, 10, 200]);
        let mask = Mask::from_fn(10, 10, |_, y| y >= 5);
        let clusters = extract_dominant_colors(&image, Some(&mask), &ClusterParams::default()).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].rgb, [10, 10, 200]);
        assert_eq!(clusters[0].fraction, 1.0);
    }

    #[test]
    fn test_no_mask_uses_every_pixel() {
        let image = split_image(10, 10, 2, [0, 255, 0], [0, 0, 255]);
        let clusters = extract_dominant_colors(&image, None, &ClusterParams::default()).unwrap();
        assert!((fraction_of(&clusters, [0, 255, 0]).unwrap() - 0.2).abs() < 1e-9);
        assert!((fraction_of(&clusters, [0, 0, 255]).unwrap() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_more_colors_than_clusters() {
        // four flat quadrants, two clusters: the two reds and the two blues merge
        let image = RgbImage::from_fn(20, 20, |x, y| {
            image::Rgb(match (x < 10, y < 10) {
                (true, true) => [250, 0, 0],
                (false, true) => [240, 10, 0],
                (true, false) => [0, 0, 250],
                (false, false) => [0, 10, 240],
            })
        });
        let params = ClusterParams {
            clusters: 2,
            ..ClusterParams::default()
        };
        let clusters = extract_dominant_colors(&image, None, &params).unwrap();
        assert_eq!(clusters.len(), 2);
        let mut rgbs: Vec<Rgb> = clusters.iter().map(|c| c.rgb).collect();
        rgbs.sort();
        assert_eq!(rgbs, vec![[0, 5, 245], [245, 5, 0]]);
        for c in &clusters {
            assert!((c.fraction - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_centroids_are_truncated() {
        // mean of 10 and 11 is 10.5, truncated to 10
        let image = RgbImage::from_fn(2, 1, |x, _| image::Rgb([10 + x as u8, 0, 0]));
        let params = ClusterParams {
            clusters: 1,
            ..ClusterParams::default()
        };
        let clusters = extract_dominant_colors(&image, None, &params).unwrap();
        assert_eq!(clusters, vec![ColorCluster { rgb: [10, 0, 0], fraction: 1.0 }]);
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let image = RgbImage::from_fn(32, 32, |x, y| {
            image::Rgb([(x * 8) as u8, (y * 8) as u8, ((x + y) * 4) as u8])
        });
        let params = ClusterParams::default();
        let a = extract_dominant_colors(&image, None, &params).unwrap();
        let b = extract_dominant_colors(&image, None, &params).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        let sum: f64 = a.iter().map(|c| c.fraction).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let image = RgbImage::new(2, 2);
        let params = ClusterParams {
            clusters: 0,
            ..ClusterParams::default()
        };
        assert_eq!(
            extract_dominant_colors(&image, None, &params),
            Err(ExtractError::InvalidClusterCount)
        );
    }

    #[test]
    fn test_mask_shape_mismatch_rejected() {
        let image = RgbImage::new(4, 4);
        let err = extract_dominant_colors(&image, Some(&Mask::full(4, 5)), &ClusterParams::default())
            .unwrap_err();
        assert!(matches!(err, ExtractError::MaskShapeMismatch { mask_height: 5, .. }));
    }
}
