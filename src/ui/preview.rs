//! Image to terminal-cell conversion.
//!
//! Each cell shows two vertically stacked pixels with the upper half block
//! (`▀`): the foreground paints the top pixel and the background the bottom
//! one. Terminal cells are about twice as tall as wide, so this keeps the
//! image's aspect ratio.

use image::imageops::FilterType;
use std::path::Path;

/// Default preview width in cells.
pub const PREVIEW_WIDTH: u32 = 80;

/// Tallest preview in cells.
const MAX_ROWS: u32 = 48;

/// One terminal cell of a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfBlock {
    pub top: [u8; 3],
    pub bottom: [u8; 3],
}

/// A converted image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewArt {
    pub rows: Vec<Vec<HalfBlock>>,
}

impl PreviewArt {
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

fn scaled(value: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = u64::from(value) * u64::from(numerator) / u64::from(denominator.max(1));
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

/// Target pixel size for a source of `width`×`height`.
fn fit(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    let mut out_w = width.min(max_width).max(1);
    let mut out_h = scaled(height, out_w, width);
    let max_h = MAX_ROWS * 2;
    if out_h > max_h {
        out_w = scaled(width, max_h, height);
        out_h = max_h;
    }
    (out_w, out_h + out_h % 2)
}

/// Loads the image at `path` and converts it to half-block cells at most
/// `max_width` cells wide.
///
/// # Errors
///
/// A readable message when the file cannot be opened or decoded.
pub fn render(path: &Path, max_width: u32) -> Result<PreviewArt, String> {
    let img = image::open(path).map_err(|e| format!("Cannot preview {}: {e}", path.display()))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(format!("Cannot preview {}: empty image", path.display()));
    }

    let (width, height) = fit(img.width(), img.height(), max_width);
    let pixels = img.resize_exact(width, height, FilterType::Triangle).to_rgb8();
    tracing::debug!(path = %path.display(), width, height, "image converted");

    let rows = (0..height)
        .step_by(2)
        .map(|y| {
            (0..width)
                .map(|x| HalfBlock {
                    top: pixels.get_pixel(x, y).0,
                    bottom: pixels.get_pixel(x, (y + 1).min(height - 1)).0,
                })
                .collect()
        })
        .collect();
    Ok(PreviewArt { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_fit_keeps_aspect_ratio() {
        assert_eq!(fit(160, 80, 80), (80, 40));
        assert_eq!(fit(10, 5, 80), (10, 6));
    }

    #[test]
    fn test_fit_limits_tall_images() {
        let (w, h) = fit(100, 1000, 80);
        assert_eq!(h, MAX_ROWS * 2);
        assert!(w < 80);
    }

    #[test]
    fn test_render_splits_rows_into_half_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stripes.png");
        let img = RgbImage::from_fn(4, 4, |_, y| if y < 2 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) });
        img.save(&path).unwrap();

        let art = render(&path, 80).unwrap();
        assert_eq!(art.width(), 4);
        assert_eq!(art.height(), 2);
        assert_eq!(art.rows[0][0].top, [255, 0, 0]);
        assert_eq!(art.rows[1][3].bottom, [0, 0, 255]);
    }

    #[test]
    fn test_render_reports_undecodable_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = render(&path, 80).unwrap_err();
        assert!(err.starts_with("Cannot preview"));
    }
}
