// src/imaging.rs
//
// Pixel primitives for the detection pipeline, operating on raw row-major
// buffers. Everything here is scene-independent; the calibrated geometry
// lives in the config and the stage modules.

use crate::types::Rect;

/// Single-channel 8-bit image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![0u8; width * height],
            width,
            height,
        }
    }

    pub fn from_raw(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }

    /// Crop to `rect`, clamped to the image bounds. Degenerate rectangles
    /// yield an empty image.
    pub fn crop(&self, rect: Rect) -> GrayImage {
        let x0 = rect.x.max(0) as usize;
        let y0 = rect.y.max(0) as usize;
        let x1 = ((rect.x + rect.width).max(0) as usize).min(self.width);
        let y1 = ((rect.y + rect.height).max(0) as usize).min(self.height);

        if x0 >= x1 || y0 >= y1 {
            return GrayImage::new(0, 0);
        }

        let w = x1 - x0;
        let h = y1 - y0;
        let mut data = Vec::with_capacity(w * h);
        for y in y0..y1 {
            let row = y * self.width;
            data.extend_from_slice(&self.data[row + x0..row + x1]);
        }
        GrayImage::from_raw(data, w, h)
    }
}

/// Three-channel 8-bit RGB image, row-major HWC.
#[derive(Debug, Clone)]
pub struct RgbImage {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl RgbImage {
    pub fn from_raw(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height * 3);
        Self {
            data,
            width,
            height,
        }
    }
}

/// Luma conversion, BT.601 weights.
pub fn grayscale(rgb: &[u8], width: usize, height: usize) -> GrayImage {
    let mut out = Vec::with_capacity(width * height);
    for px in rgb.chunks_exact(3).take(width * height) {
        let y = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
        out.push(y.round().min(255.0) as u8);
    }
    GrayImage::from_raw(out, width, height)
}

/// Convert RGB to HSV.
/// Returns (H: 0-360, S: 0-100, V: 0-255).
#[inline]
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let r_n = r / 255.0;
    let g_n = g / 255.0;
    let b_n = b / 255.0;

    let max = r_n.max(g_n).max(b_n);
    let min = r_n.min(g_n).min(b_n);
    let delta = max - min;

    let h = if delta < 1e-6 {
        0.0
    } else if (max - r_n).abs() < 1e-6 {
        60.0 * (((g_n - b_n) / delta) % 6.0)
    } else if (max - g_n).abs() < 1e-6 {
        60.0 * (((b_n - r_n) / delta) + 2.0)
    } else {
        60.0 * (((r_n - g_n) / delta) + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let s = if max < 1e-6 {
        0.0
    } else {
        (delta / max) * 100.0
    };

    let v = max * 255.0;

    (h, s, v)
}

/// Binary threshold: values strictly above `thresh` become 255, the rest 0.
pub fn threshold_binary(src: &GrayImage, thresh: u8) -> GrayImage {
    let data = src
        .data
        .iter()
        .map(|&v| if v > thresh { 255 } else { 0 })
        .collect();
    GrayImage::from_raw(data, src.width, src.height)
}

/// Gaussian blur with an odd `ksize`, separable passes, replicated borders.
pub fn gaussian_blur(src: &GrayImage, ksize: usize) -> GrayImage {
    if src.width == 0 || src.height == 0 || ksize < 3 {
        return src.clone();
    }
    let ksize = if ksize % 2 == 0 { ksize + 1 } else { ksize };
    let sigma = 0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (ksize / 2) as isize;

    let mut kernel = Vec::with_capacity(ksize);
    let mut sum = 0.0f32;
    for i in 0..ksize {
        let d = i as f32 - half as f32;
        let w = (-d * d / (2.0 * sigma * sigma)).exp();
        kernel.push(w);
        sum += w;
    }
    for w in kernel.iter_mut() {
        *w /= sum;
    }

    let w = src.width as isize;
    let h = src.height as isize;

    // Horizontal pass
    let mut tmp = vec![0.0f32; src.data.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, k) in kernel.iter().enumerate() {
                let sx = (x + i as isize - half).clamp(0, w - 1);
                acc += k * src.data[(y * w + sx) as usize] as f32;
            }
            tmp[(y * w + x) as usize] = acc;
        }
    }

    // Vertical pass
    let mut out = vec![0u8; src.data.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, k) in kernel.iter().enumerate() {
                let sy = (y + i as isize - half).clamp(0, h - 1);
                acc += k * tmp[(sy * w + x) as usize];
            }
            out[(y * w + x) as usize] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }

    GrayImage::from_raw(out, src.width, src.height)
}

/// Contrast-limited adaptive histogram equalization over a `tiles` x `tiles`
/// grid, bilinear interpolation between the per-tile mappings.
pub fn clahe(src: &GrayImage, clip_limit: f32, tiles: usize) -> GrayImage {
    if src.width == 0 || src.height == 0 {
        return src.clone();
    }
    let tiles = tiles.max(1);
    let tile_w = src.width.div_ceil(tiles).max(1);
    let tile_h = src.height.div_ceil(tiles).max(1);
    let grid_x = src.width.div_ceil(tile_w);
    let grid_y = src.height.div_ceil(tile_h);

    let mut luts = vec![[0u8; 256]; grid_x * grid_y];
    for ty in 0..grid_y {
        for tx in 0..grid_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(src.width);
            let y1 = (y0 + tile_h).min(src.height);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                let row = y * src.width;
                for x in x0..x1 {
                    hist[src.data[row + x] as usize] += 1;
                }
            }

            let area = ((x1 - x0) * (y1 - y0)) as u32;
            let clip = ((clip_limit * area as f32 / 256.0).max(1.0)) as u32;
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > clip {
                    excess += *bin - clip;
                    *bin = clip;
                }
            }
            let bonus = excess / 256;
            for bin in hist.iter_mut() {
                *bin += bonus;
            }

            let lut = &mut luts[ty * grid_x + tx];
            let mut cdf = 0u32;
            for v in 0..256 {
                cdf += hist[v];
                lut[v] = ((cdf as f32 * 255.0) / area as f32).round().min(255.0) as u8;
            }
        }
    }

    let tile_index = |f: f32, grid: usize| -> (usize, usize, f32) {
        let mut t0 = f.floor() as isize;
        let mut w = f - t0 as f32;
        if t0 < 0 {
            t0 = 0;
            w = 0.0;
        }
        let mut t0 = t0 as usize;
        if t0 >= grid - 1 {
            t0 = grid - 1;
            w = 0.0;
        }
        (t0, (t0 + 1).min(grid - 1), w)
    };

    let mut out = GrayImage::new(src.width, src.height);
    for y in 0..src.height {
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let (ty0, ty1, wy) = tile_index(fy, grid_y);
        for x in 0..src.width {
            let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
            let (tx0, tx1, wx) = tile_index(fx, grid_x);

            let v = src.get(x, y) as usize;
            let p00 = luts[ty0 * grid_x + tx0][v] as f32;
            let p10 = luts[ty0 * grid_x + tx1][v] as f32;
            let p01 = luts[ty1 * grid_x + tx0][v] as f32;
            let p11 = luts[ty1 * grid_x + tx1][v] as f32;

            let val = p00 * (1.0 - wx) * (1.0 - wy)
                + p10 * wx * (1.0 - wy)
                + p01 * (1.0 - wx) * wy
                + p11 * wx * wy;
            out.set(x, y, val.round().clamp(0.0, 255.0) as u8);
        }
    }

    out
}

/// Morphological erosion: minimum over a `ksize` x `ksize` neighborhood.
pub fn erode(src: &GrayImage, ksize: usize, iterations: usize) -> GrayImage {
    morph(src, ksize, iterations, false)
}

/// Morphological dilation: maximum over a `ksize` x `ksize` neighborhood.
pub fn dilate(src: &GrayImage, ksize: usize, iterations: usize) -> GrayImage {
    morph(src, ksize, iterations, true)
}

fn morph(src: &GrayImage, ksize: usize, iterations: usize, take_max: bool) -> GrayImage {
    if src.width == 0 || src.height == 0 || ksize < 2 || iterations == 0 {
        return src.clone();
    }
    let anchor = (ksize / 2) as isize;
    let lo = -anchor;
    let hi = ksize as isize - 1 - anchor;
    let w = src.width as isize;
    let h = src.height as isize;

    let mut cur = src.data.clone();
    for _ in 0..iterations {
        let mut next = vec![0u8; cur.len()];
        for y in 0..h {
            for x in 0..w {
                let mut best: u8 = if take_max { 0 } else { 255 };
                for dy in lo..=hi {
                    for dx in lo..=hi {
                        let sx = (x + dx).clamp(0, w - 1);
                        let sy = (y + dy).clamp(0, h - 1);
                        let v = cur[(sy * w + sx) as usize];
                        best = if take_max { best.max(v) } else { best.min(v) };
                    }
                }
                next[(y * w + x) as usize] = best;
            }
        }
        cur = next;
    }
    GrayImage::from_raw(cur, src.width, src.height)
}

/// Bounding box of all non-zero pixels, or None for an all-zero image.
pub fn non_zero_bounding_box(src: &GrayImage) -> Option<Rect> {
    let mut min_x = usize::MAX;
    let mut min_y = usize::MAX;
    let mut max_x = 0usize;
    let mut max_y = 0usize;
    let mut any = false;

    for y in 0..src.height {
        let row = y * src.width;
        for x in 0..src.width {
            if src.data[row + x] != 0 {
                any = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }

    if !any {
        return None;
    }
    Some(Rect::new(
        min_x as i32,
        min_y as i32,
        (max_x - min_x + 1) as i32,
        (max_y - min_y + 1) as i32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_weights() {
        let rgb = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let gray = grayscale(&rgb, 4, 1);
        assert_eq!(gray.data, vec![76, 150, 29, 255]);
    }

    #[test]
    fn test_rgb_to_hsv_primaries() {
        let (h, s, v) = rgb_to_hsv(255.0, 0.0, 0.0);
        assert!((h - 0.0).abs() < 1.0);
        assert!((s - 100.0).abs() < 1.0);
        assert!((v - 255.0).abs() < 1.0);

        let (h, _, _) = rgb_to_hsv(255.0, 255.0, 0.0);
        assert!((h - 60.0).abs() < 1.0);

        let (_, s, v) = rgb_to_hsv(255.0, 255.0, 255.0);
        assert!(s < 1.0);
        assert!((v - 255.0).abs() < 1.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let img = GrayImage::from_raw(vec![0, 119, 120, 121, 255], 5, 1);
        let bin = threshold_binary(&img, 120);
        assert_eq!(bin.data, vec![0, 0, 0, 255, 255]);
    }

    #[test]
    fn test_blur_keeps_constant_image() {
        let img = GrayImage::from_raw(vec![200u8; 32 * 16], 32, 16);
        let out = gaussian_blur(&img, 7);
        assert_eq!(out.width, 32);
        assert_eq!(out.height, 16);
        assert!(out.data.iter().all(|&v| (v as i32 - 200).abs() <= 1));
    }

    #[test]
    fn test_clahe_keeps_uniform_image_uniform() {
        let img = GrayImage::from_raw(vec![128u8; 64 * 64], 64, 64);
        let out = clahe(&img, 2.0, 8);
        assert_eq!(out.width, 64);
        let first = out.data[0];
        assert!(out.data.iter().all(|&v| v == first));
    }

    #[test]
    fn test_erode_shrinks_dilate_grows() {
        let mut img = GrayImage::new(9, 9);
        for y in 3..6 {
            for x in 3..6 {
                img.set(x, y, 255);
            }
        }
        let eroded = erode(&img, 3, 1);
        assert_eq!(eroded.get(4, 4), 255);
        assert_eq!(eroded.get(3, 3), 0);

        let dilated = dilate(&img, 3, 1);
        assert_eq!(dilated.get(2, 2), 255);
        assert_eq!(dilated.get(1, 1), 0);
    }

    #[test]
    fn test_non_zero_bounding_box() {
        let mut img = GrayImage::new(20, 10);
        img.set(4, 2, 10);
        img.set(15, 7, 90);
        let rect = non_zero_bounding_box(&img).unwrap();
        assert_eq!(rect, Rect::new(4, 2, 12, 6));

        let empty = GrayImage::new(20, 10);
        assert!(non_zero_bounding_box(&empty).is_none());
    }

    #[test]
    fn test_crop_clamps_to_bounds() {
        let mut img = GrayImage::new(10, 10);
        img.set(9, 9, 7);
        let cropped = img.crop(Rect::new(8, 8, 50, 50));
        assert_eq!(cropped.width, 2);
        assert_eq!(cropped.height, 2);
        assert_eq!(cropped.get(1, 1), 7);

        let degenerate = img.crop(Rect::new(12, 0, 5, 5));
        assert_eq!(degenerate.width, 0);
    }
}
