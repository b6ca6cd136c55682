use image::GrayImage;

/// Per-pixel foreground flags aligned to a crop, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl Mask {
    /// Everything is foreground. Used when no segmentation is available.
    pub fn full(width: u32, height: u32) -> Self {
        Self::filled(width, height, true)
    }

    pub fn empty(width: u32, height: u32) -> Self {
        Self::filled(width, height, false)
    }

    fn filled(width: u32, height: u32, value: bool) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Foreground wherever the luma value is strictly above `threshold`.
    pub fn from_luma(image: &GrayImage, threshold: u8) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            cells: image.as_raw().iter().map(|&v| v > threshold).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.cells[(y as usize) * (self.width as usize) + x as usize]
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    pub fn foreground_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_and_empty() {
        let full = Mask::full(4, 3);
        assert_eq!(full.dimensions(), (4, 3));
        assert_eq!(full.foreground_count(), 12);
        assert_eq!(Mask::empty(4, 3).foreground_count(), 0);
    }

    #[test]
    fn test_from_fn_is_row_major() {
        let mask = Mask::from_fn(3, 2, |x, y| x == 2 && y == 1);
        assert_eq!(mask.cells(), &[false, false, false, false, false, true]);
        assert!(mask.get(2, 1));
        assert!(!mask.get(1, 1));
    }

    #[test]
    fn test_from_luma_threshold() {
        let gray = GrayImage::from_raw(2, 2, vec![0, 1, 127, 255]).unwrap();
        assert_eq!(Mask::from_luma(&gray, 0).foreground_count(), 3);
        assert_eq!(Mask::from_luma(&gray, 127).foreground_count(), 1);
    }
}
