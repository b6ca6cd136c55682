use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use outfit_common::AnalysisResult;

const FAILED_REGION_COLOR: Rgb<u8> = Rgb([255, 0, 255]);
const BORDER: u32 = 3;

/// Draws each region's rectangle in its dominant color (magenta for
/// failed regions).
pub fn draw_regions(image: &mut RgbImage, result: &AnalysisResult) {
    for detection in result.detections() {
        let color = detection
            .colors()
            .first()
            .map_or(FAILED_REGION_COLOR, |c| Rgb(c.rgb));
        let region = detection.region;

        // nested rectangles for a thicker outline
        for inset in 0..BORDER {
            if region.width <= 2 * inset || region.height <= 2 * inset {
                break;
            }
            let rect = Rect::at((region.x + inset) as i32, (region.y + inset) as i32)
                .of_size(region.width - 2 * inset, region.height - 2 * inset);
            draw_hollow_rect_mut(image, rect, color);
        }
    }
}
