//! Frame-to-cell-grid conversion and compositing.
//!
//! Frames are averaged down to a grid of colored cells sized for the
//! terminal; two cell rows become one character row of half blocks.
//! Compositing (live preview over the last captured frame) happens on
//! the cell grid, not on full frames, so a toggle of the transparency
//! costs nothing extra.

use crate::camera::Frame;

/// RGB color of one grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Downsample an RGB frame to average colors per grid cell.
///
/// Maps image pixels to grid cells by averaging all pixels within each
/// cell's bounds. Writes into an existing buffer to avoid allocation in
/// the refresh loop.
///
/// # Returns
/// The number of cells written (`grid_width * grid_height`, or 0 when
/// either dimension or the frame is empty).
pub fn downsample_into(
    frame: &Frame,
    grid_width: u16,
    grid_height: u16,
    buffer: &mut Vec<CellColor>,
) -> usize {
    buffer.clear();

    let img_width = frame.width;
    let img_height = frame.height;

    if grid_width == 0
        || grid_height == 0
        || img_width == 0
        || img_height == 0
        || frame.data.is_empty()
    {
        return 0;
    }

    let output_size = (grid_width as usize) * (grid_height as usize);
    buffer.reserve(output_size);

    // Cell bounds in pixels, as floats for accurate mapping
    let cell_w = img_width as f32 / grid_width as f32;
    let cell_h = img_height as f32 / grid_height as f32;

    for cy in 0..grid_height {
        for cx in 0..grid_width {
            let start_x = (cx as f32 * cell_w) as u32;
            let end_x = ((cx + 1) as f32 * cell_w) as u32;
            let start_y = (cy as f32 * cell_h) as u32;
            let end_y = ((cy + 1) as f32 * cell_h) as u32;

            let mut sum_r = 0u32;
            let mut sum_g = 0u32;
            let mut sum_b = 0u32;
            let mut count = 0u32;

            for py in start_y..end_y {
                for px in start_x..end_x {
                    let idx = ((py * img_width + px) * 3) as usize;
                    if idx + 2 < frame.data.len() {
                        sum_r += frame.data[idx] as u32;
                        sum_g += frame.data[idx + 1] as u32;
                        sum_b += frame.data[idx + 2] as u32;
                        count += 1;
                    }
                }
            }

            buffer.push(if count > 0 {
                CellColor {
                    r: (sum_r / count) as u8,
                    g: (sum_g / count) as u8,
                    b: (sum_b / count) as u8,
                }
            } else {
                CellColor::default()
            });
        }
    }

    output_size
}

/// Blend an overlay grid onto a base grid in place.
///
/// `alpha` is the overlay's weight: 255 replaces the base entirely,
/// 0 leaves it untouched. Grids shorter than the base leave the tail
/// of the base as is.
pub fn blend_into(base: &mut [CellColor], overlay: &[CellColor], alpha: u8) {
    let a = alpha as u16;
    let inv = 255 - a;

    for (dst, src) in base.iter_mut().zip(overlay.iter()) {
        dst.r = ((src.r as u16 * a + dst.r as u16 * inv) / 255) as u8;
        dst.g = ((src.g as u16 * a + dst.g as u16 * inv) / 255) as u8;
        dst.b = ((src.b as u16 * a + dst.b as u16 * inv) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downsample_uniform_frame() {
        let frame = Frame::filled(8, 8, [100, 150, 200]);
        let mut cells = Vec::new();
        let written = downsample_into(&frame, 4, 4, &mut cells);

        assert_eq!(written, 16);
        assert_eq!(cells.len(), 16);
        for cell in &cells {
            assert_eq!(*cell, CellColor { r: 100, g: 150, b: 200 });
        }
    }

    #[test]
    fn test_downsample_averages_within_cell() {
        // 2x1 image, one black and one white pixel, into a single cell
        let frame = Frame {
            data: vec![0, 0, 0, 255, 255, 255],
            width: 2,
            height: 1,
            format: crate::camera::FrameFormat::Rgb,
            timestamp: std::time::Instant::now(),
        };
        let mut cells = Vec::new();
        downsample_into(&frame, 1, 1, &mut cells);

        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0], CellColor { r: 127, g: 127, b: 127 });
    }

    #[test]
    fn test_downsample_empty_dimensions() {
        let frame = Frame::filled(8, 8, [1, 2, 3]);
        let mut cells = vec![CellColor::default(); 4];
        assert_eq!(downsample_into(&frame, 0, 4, &mut cells), 0);
        assert!(cells.is_empty());
    }

    #[test]
    fn test_downsample_reuses_buffer() {
        let frame = Frame::filled(8, 8, [9, 9, 9]);
        let mut cells = Vec::new();
        downsample_into(&frame, 2, 2, &mut cells);
        downsample_into(&frame, 3, 3, &mut cells);
        assert_eq!(cells.len(), 9);
    }

    #[test]
    fn test_blend_opaque_replaces_base() {
        let mut base = vec![CellColor { r: 10, g: 10, b: 10 }; 2];
        let overlay = vec![CellColor { r: 200, g: 100, b: 50 }; 2];
        blend_into(&mut base, &overlay, 255);
        assert_eq!(base[0], CellColor { r: 200, g: 100, b: 50 });
    }

    #[test]
    fn test_blend_zero_keeps_base() {
        let mut base = vec![CellColor { r: 10, g: 20, b: 30 }; 2];
        let overlay = vec![CellColor { r: 200, g: 200, b: 200 }; 2];
        blend_into(&mut base, &overlay, 0);
        assert_eq!(base[0], CellColor { r: 10, g: 20, b: 30 });
    }

    #[test]
    fn test_blend_half_mixes() {
        let mut base = vec![CellColor { r: 0, g: 0, b: 0 }];
        let overlay = vec![CellColor { r: 255, g: 255, b: 255 }];
        blend_into(&mut base, &overlay, 128);
        // 128/255 of white over black lands just above mid-gray
        assert!((120..=135).contains(&base[0].r), "got {}", base[0].r);
    }

    #[test]
    fn test_blend_shorter_overlay_leaves_tail() {
        let mut base = vec![CellColor { r: 7, g: 7, b: 7 }; 3];
        let overlay = vec![CellColor { r: 255, g: 255, b: 255 }; 1];
        blend_into(&mut base, &overlay, 255);
        assert_eq!(base[1], CellColor { r: 7, g: 7, b: 7 });
        assert_eq!(base[2], CellColor { r: 7, g: 7, b: 7 });
    }
}
