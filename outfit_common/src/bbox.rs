use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates, as reported by a locator.
/// May extend past the image; clip before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Non-empty rectangle fully inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Clamp to `width` x `height`; `None` if nothing is left.
    pub fn clip(&self, width: u32, height: u32) -> Option<CropRegion> {
        let x1 = i64::from(self.x1).max(0);
        let y1 = i64::from(self.y1).max(0);
        let x2 = i64::from(self.x2).min(i64::from(width));
        let y2 = i64::from(self.y2).min(i64::from(height));

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(CropRegion {
            x: x1 as u32,
            y: y1 as u32,
            width: (x2 - x1) as u32,
            height: (y2 - y1) as u32,
        })
    }
}

impl CropRegion {
    /// `[x1, y1, x2, y2]`
    pub fn corners(&self) -> [u32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Copies the region out of `image`.
    pub fn crop(&self, image: &RgbImage) -> RgbImage {
        image::imageops::crop_imm(image, self.x, self.y, self.width, self.height).to_image()
    }
}
