//! Vertical page stacking.

use image::{imageops, DynamicImage, Rgba, RgbaImage};

/// Background for canvas areas not covered by a page.
const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Bytes per RGBA pixel.
const CHANNELS: usize = 4;

/// Stack pages top to bottom, in slice order, separated by `gap` pixels.
///
/// The canvas is as wide as the widest page; narrower pages are left
/// aligned. Uncovered areas (gaps, right margins) are white.
///
/// Returns `None` when the canvas size does not fit in memory addressing
/// (a `u32` height or a `usize` buffer length).
pub fn stack_pages(pages: &[DynamicImage], gap: u32) -> Option<DynamicImage> {
    let width = pages.iter().map(|p| p.width()).max().unwrap_or(0);
    let content_height = pages
        .iter()
        .try_fold(0u32, |total, page| total.checked_add(page.height()))?;
    let gap_count = u32::try_from(pages.len().saturating_sub(1)).ok()?;
    let height = gap.checked_mul(gap_count)?.checked_add(content_height)?;

    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(CHANNELS)?;

    let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

    let mut y: i64 = 0;
    for page in pages {
        imageops::replace(&mut canvas, &page.to_rgba8(), 0, y);
        y += i64::from(page.height()) + i64::from(gap);
    }

    Some(DynamicImage::ImageRgba8(canvas))
}
