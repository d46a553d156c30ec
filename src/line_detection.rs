// src/line_detection.rs
//
// Classical edge and line-segment detection used by the stop-line
// estimator: Sobel/Canny edges and a Hough transform that walks the voted
// lines back into concrete segments with gap tolerance.

use crate::imaging::GrayImage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct HoughParams {
    pub threshold: usize,
    pub min_line_length: f64,
    pub max_line_gap: f64,
}

/// Canny edge detection: Sobel gradients, non-maximum suppression along the
/// gradient direction, then double-threshold hysteresis. Returns a binary
/// edge map (0 / 255). The input is expected to be pre-smoothed.
pub fn canny(src: &GrayImage, low: f32, high: f32) -> GrayImage {
    let w = src.width;
    let h = src.height;
    if w < 3 || h < 3 {
        return GrayImage::new(w, h);
    }

    let at = |x: isize, y: isize| -> f32 {
        let x = x.clamp(0, w as isize - 1) as usize;
        let y = y.clamp(0, h as isize - 1) as usize;
        src.data[y * w + x] as f32
    };

    let mut mag = vec![0.0f32; w * h];
    let mut dir = vec![0u8; w * h];
    for y in 0..h as isize {
        for x in 0..w as isize {
            let gx = -at(x - 1, y - 1) + at(x + 1, y - 1) - 2.0 * at(x - 1, y)
                + 2.0 * at(x + 1, y)
                - at(x - 1, y + 1)
                + at(x + 1, y + 1);
            let gy = -at(x - 1, y - 1) - 2.0 * at(x, y - 1) - at(x + 1, y - 1)
                + at(x - 1, y + 1)
                + 2.0 * at(x, y + 1)
                + at(x + 1, y + 1);

            let idx = y as usize * w + x as usize;
            mag[idx] = (gx * gx + gy * gy).sqrt();

            let mut angle = gy.atan2(gx).to_degrees();
            if angle < 0.0 {
                angle += 180.0;
            }
            dir[idx] = if angle < 22.5 || angle >= 157.5 {
                0 // horizontal gradient, vertical edge
            } else if angle < 67.5 {
                45
            } else if angle < 112.5 {
                90
            } else {
                135
            };
        }
    }

    // Non-maximum suppression: a pixel survives only if it is at least as
    // strong as its two neighbors along the gradient direction.
    let mut thin = vec![0.0f32; w * h];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let idx = y * w + x;
            let m = mag[idx];
            let (a, b) = match dir[idx] {
                0 => (mag[idx - 1], mag[idx + 1]),
                45 => (mag[idx - w - 1], mag[idx + w + 1]),
                90 => (mag[idx - w], mag[idx + w]),
                _ => (mag[idx - w + 1], mag[idx + w - 1]),
            };
            if m >= a && m >= b {
                thin[idx] = m;
            }
        }
    }

    // Hysteresis: grow from strong pixels through connected weak pixels.
    let mut edges = GrayImage::new(w, h);
    let mut stack = Vec::new();
    for idx in 0..thin.len() {
        if thin[idx] >= high && edges.data[idx] == 0 {
            edges.data[idx] = 255;
            stack.push(idx);
            while let Some(p) = stack.pop() {
                let px = (p % w) as isize;
                let py = (p / w) as isize;
                for dy in -1..=1isize {
                    for dx in -1..=1isize {
                        let nx = px + dx;
                        let ny = py + dy;
                        if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                            continue;
                        }
                        let n = ny as usize * w + nx as usize;
                        if edges.data[n] == 0 && thin[n] >= low {
                            edges.data[n] = 255;
                            stack.push(n);
                        }
                    }
                }
            }
        }
    }

    edges
}

/// Hough line-segment detection over a binary edge map.
///
/// Votes every edge pixel into a 1px x 1 degree (rho, theta) accumulator,
/// then walks each over-threshold line through its supporting pixels in
/// order along the line, splitting at gaps larger than `max_line_gap` and
/// keeping runs of at least `min_line_length`. Pixels consumed by an
/// emitted segment stop supporting weaker lines.
pub fn detect_segments(edges: &GrayImage, params: &HoughParams) -> Vec<LineSegment> {
    let w = edges.width;
    let h = edges.height;

    let mut points: Vec<(usize, usize)> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if edges.data[y * w + x] != 0 {
                points.push((x, y));
            }
        }
    }
    if points.is_empty() {
        return Vec::new();
    }

    const THETA_BINS: usize = 180;
    let mut cos_t = [0.0f64; THETA_BINS];
    let mut sin_t = [0.0f64; THETA_BINS];
    for (t, (c, s)) in cos_t.iter_mut().zip(sin_t.iter_mut()).enumerate() {
        let theta = t as f64 * std::f64::consts::PI / THETA_BINS as f64;
        *c = theta.cos();
        *s = theta.sin();
    }

    let diag = ((w * w + h * h) as f64).sqrt().ceil() as isize;
    let rho_bins = (2 * diag + 1) as usize;
    let mut acc = vec![0u32; THETA_BINS * rho_bins];

    for &(x, y) in &points {
        for t in 0..THETA_BINS {
            let rho = (x as f64 * cos_t[t] + y as f64 * sin_t[t]).round() as isize;
            acc[t * rho_bins + (rho + diag) as usize] += 1;
        }
    }

    let mut peaks: Vec<(u32, usize, usize)> = acc
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v as usize >= params.threshold)
        .map(|(i, &v)| (v, i / rho_bins, i % rho_bins))
        .collect();
    peaks.sort_by(|a, b| b.0.cmp(&a.0));

    let mut used = vec![false; w * h];
    let mut segments = Vec::new();

    for (_, t, r) in peaks {
        let rho = r as isize - diag;
        let (c, s) = (cos_t[t], sin_t[t]);

        // Supporting pixels still unclaimed, ordered along the line.
        let mut on_line: Vec<(f64, usize, usize)> = points
            .iter()
            .filter(|&&(x, y)| !used[y * w + x])
            .filter(|&&(x, y)| (x as f64 * c + y as f64 * s - rho as f64).abs() <= 1.0)
            .map(|&(x, y)| (-(x as f64) * s + y as f64 * c, x, y))
            .collect();
        if on_line.len() < 2 {
            continue;
        }
        on_line.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut run_start = 0usize;
        let mut prev_t = on_line[0].0;
        for i in 1..=on_line.len() {
            let gap = if i < on_line.len() {
                on_line[i].0 - prev_t
            } else {
                f64::INFINITY
            };
            if gap > params.max_line_gap {
                let run = &on_line[run_start..i];
                let length = run[run.len() - 1].0 - run[0].0;
                if length >= params.min_line_length {
                    let (_, x1, y1) = run[0];
                    let (_, x2, y2) = run[run.len() - 1];
                    segments.push(LineSegment {
                        x1: x1 as i32,
                        y1: y1 as i32,
                        x2: x2 as i32,
                        y2: y2 as i32,
                    });
                    for &(_, x, y) in run {
                        used[y * w + x] = true;
                    }
                }
                run_start = i;
            }
            if i < on_line.len() {
                prev_t = on_line[i].0;
            }
        }
    }

    segments
}
