// ============================================================
// Layer 6 — Loss Plot
// ============================================================
// Renders the training and validation loss curves to a PNG after
// every epoch:
//
//   ┌───────────────────────────────────┐
//   │ ■ train  ■ val                    │
//   │ \                                 │
//   │  \__                              │
//   │     \____________                 │
//   └───────────────────────────────────┘
//      x = epoch, y = loss (shared scale)
//
// Training loss is blue, validation loss orange. Both series
// share one y-range. Non-finite points break the line.
// Numeric values live in metrics.csv.

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use std::path::Path;

pub const WIDTH: u32 = 1000;
pub const HEIGHT: u32 = 600;

const MARGIN_LEFT: i64 = 60;
const MARGIN_RIGHT: i64 = 30;
const MARGIN_TOP: i64 = 40;
const MARGIN_BOTTOM: i64 = 50;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const AXIS: Rgb<u8> = Rgb([40, 40, 40]);
pub const TRAIN_COLOR: Rgb<u8> = Rgb([31, 119, 180]);
pub const VAL_COLOR: Rgb<u8> = Rgb([255, 127, 14]);

/// Draw both loss curves and write them to `path` as PNG.
pub fn plot_losses(train: &[f64], val: &[f64], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }

    render(train, val)
        .save(path)
        .with_context(|| format!("Cannot write loss plot '{}'", path.display()))?;

    tracing::info!("Loss plot saved at {}", path.display());
    Ok(())
}

/// Rasterise the chart in memory.
pub fn render(train: &[f64], val: &[f64]) -> RgbImage {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    let area = PlotArea::new();

    // ── Grid ──────────────────────────────────────────────────────────────────
    for i in 0..=5 {
        let y = area.top + (area.height() * i) / 5;
        draw_line(&mut img, (area.left, y), (area.right, y), GRID, 1);
    }
    let epochs = train.len().max(val.len());
    let v_lines = epochs.clamp(1, 10) as i64;
    for i in 0..=v_lines {
        let x = area.left + (area.width() * i) / v_lines;
        draw_line(&mut img, (x, area.top), (x, area.bottom), GRID, 1);
    }

    // ── Axes ──────────────────────────────────────────────────────────────────
    draw_line(&mut img, (area.left, area.bottom), (area.right, area.bottom), AXIS, 2);
    draw_line(&mut img, (area.left, area.top), (area.left, area.bottom), AXIS, 2);

    // ── Legend ────────────────────────────────────────────────────────────────
    fill_rect(&mut img, area.right - 60, 12, 16, 16, TRAIN_COLOR);
    fill_rect(&mut img, area.right - 30, 12, 16, 16, VAL_COLOR);

    // ── Series ────────────────────────────────────────────────────────────────
    if let Some((lo, hi)) = value_range(train.iter().chain(val.iter()).copied()) {
        let scale = Scale { area, epochs, lo, hi };
        draw_series(&mut img, train, &scale, TRAIN_COLOR);
        draw_series(&mut img, val, &scale, VAL_COLOR);
    }

    img
}

#[derive(Debug, Clone, Copy)]
struct PlotArea {
    left:   i64,
    right:  i64,
    top:    i64,
    bottom: i64,
}

impl PlotArea {
    fn new() -> Self {
        Self {
            left:   MARGIN_LEFT,
            right:  WIDTH as i64 - MARGIN_RIGHT,
            top:    MARGIN_TOP,
            bottom: HEIGHT as i64 - MARGIN_BOTTOM,
        }
    }

    fn width(&self) -> i64 {
        self.right - self.left
    }

    fn height(&self) -> i64 {
        self.bottom - self.top
    }
}

struct Scale {
    area:   PlotArea,
    epochs: usize,
    lo:     f64,
    hi:     f64,
}

impl Scale {
    fn point(&self, index: usize, value: f64) -> (i64, i64) {
        let fx = if self.epochs > 1 {
            index as f64 / (self.epochs - 1) as f64
        } else {
            0.0
        };
        let fy = (value - self.lo) / (self.hi - self.lo);
        let x = self.area.left + (fx * self.area.width() as f64).round() as i64;
        let y = self.area.bottom - (fy * self.area.height() as f64).round() as i64;
        (x, y)
    }
}

/// Min/max over the finite values, widened when flat.
fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return None;
    }
    if hi - lo < 1e-12 {
        let pad = if lo.abs() > 0.0 { lo.abs() * 0.1 } else { 0.5 };
        return Some((lo - pad, hi + pad));
    }
    let pad = (hi - lo) * 0.05;
    Some((lo - pad, hi + pad))
}

fn draw_series(img: &mut RgbImage, values: &[f64], scale: &Scale, color: Rgb<u8>) {
    let mut prev: Option<(i64, i64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            prev = None;
            continue;
        }
        let p = scale.point(i, v);
        match prev {
            Some(q) => draw_line(img, q, p, color, 2),
            None => fill_rect(img, p.0 - 1, p.1 - 1, 3, 3, color),
        }
        prev = Some(p);
    }
}

/// Bresenham line, `thickness` pixels wide.
fn draw_line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>, thickness: i64) {
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        fill_rect(img, x0, y0, thickness, thickness, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn fill_rect(img: &mut RgbImage, x: i64, y: i64, w: i64, h: i64, color: Rgb<u8>) {
    for py in y..y + h {
        for px in x..x + w {
            if px >= 0 && py >= 0 && px < img.width() as i64 && py < img.height() as i64 {
                img.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn count(img: &RgbImage, color: Rgb<u8>) -> usize {
        img.pixels().filter(|p| **p == color).count()
    }

    #[test]
    fn test_writes_png_with_both_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots").join("loss_plot.png");
        plot_losses(&[3.0, 2.0, 1.5], &[3.2, 2.4, 2.0], &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
        // Legend swatch alone is 256 pixels; the curve adds more
        assert!(count(&img, TRAIN_COLOR) > 256);
        assert!(count(&img, VAL_COLOR) > 256);
    }

    #[test]
    fn test_empty_history_renders_axes_only() {
        let img = render(&[], &[]);
        assert_eq!(count(&img, TRAIN_COLOR), 256);
        assert!(count(&img, AXIS) > 0);
    }

    #[test]
    fn test_flat_and_nan_values_do_not_panic() {
        let img = render(&[1.0, 1.0, f64::NAN], &[f64::INFINITY]);
        assert!(count(&img, TRAIN_COLOR) > 256);
    }

    #[test]
    fn test_value_range_pads() {
        assert_eq!(value_range([0.0, 0.0].into_iter()), Some((-0.5, 0.5)));
        assert_eq!(value_range([f64::NAN].into_iter()), None);
        let (lo, hi) = value_range([1.0, 3.0].into_iter()).unwrap();
        assert!(lo < 1.0 && hi > 3.0);
    }
}
