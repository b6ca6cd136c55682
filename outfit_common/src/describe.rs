use crate::color_names::ColorNamer;
use crate::dominant_colors::ColorCluster;

/// Rendered when a region has no participating pixels.
pub const NO_CLOTHING_DESCRIPTION: &str = "No clothing detected.";

/// Renders clusters as e.g. `The clothing item contains: 70% red, 30% black.`
///
/// Percentages are truncated, not rounded, so 0.499 reads as 49%.
pub fn describe_outfit(clusters: &[ColorCluster], namer: &ColorNamer) -> String {
    if clusters.is_empty() {
        return NO_CLOTHING_DESCRIPTION.to_string();
    }

    let parts: Vec<String> = clusters
        .iter()
        .map(|c| format!("{}% {}", whole_percent(c.fraction), namer.name(c.rgb)))
        .collect();

    format!("The clothing item contains: {}.", parts.join(", "))
}

fn whole_percent(fraction: f64) -> i64 {
    (fraction * 100.0).trunc() as i64
}
