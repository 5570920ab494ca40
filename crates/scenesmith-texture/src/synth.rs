//! Map synthesis per style.
//!
//! Deliberately simple generators: a checkerboard, bilinearly interpolated
//! value noise (not Perlin), and a flat metal set. Enough surface variety
//! to stand in for a real generation backend while staying fully
//! deterministic.

use crate::buffer::{GrayBuffer, RgbBuffer};
use crate::rng::DeterministicRng;
use crate::style::Style;

/// The full map set for one style, in pixel form.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleMaps {
    pub albedo: RgbBuffer,
    pub roughness: GrayBuffer,
    pub metalness: GrayBuffer,
    /// Fake surface detail, not a tangent-space normal map.
    pub normal: GrayBuffer,
}

/// Synthesizes the maps for a style. Same style, size, and seed always
/// produce the same pixels.
pub fn synthesize(style: Style, size: u32, seed: u32) -> StyleMaps {
    match style {
        Style::Checker => checker_maps(size),
        Style::Stone => stone_maps(size, seed),
        Style::Metal => metal_maps(size),
    }
}

fn checker_maps(size: u32) -> StyleMaps {
    StyleMaps {
        albedo: checkerboard(size, 8, [220, 220, 220], [40, 40, 40]),
        roughness: GrayBuffer::new(size, 160),
        metalness: GrayBuffer::new(size, 0),
        normal: GrayBuffer::new(size, 128),
    }
}

fn stone_maps(size: u32, seed: u32) -> StyleMaps {
    let base = value_noise(size, 4, seed);
    let mut albedo = RgbBuffer::new(size, [0, 0, 0]);
    for y in 0..size {
        for x in 0..size {
            let v = base.get(x, y);
            // Slight green lift reads as moss under most lighting.
            albedo.set(x, y, [v, v.saturating_add(15), v]);
        }
    }
    StyleMaps {
        albedo,
        roughness: base.box_blur(),
        metalness: GrayBuffer::new(size, 0),
        normal: edge_detail(&base),
    }
}

fn metal_maps(size: u32) -> StyleMaps {
    StyleMaps {
        albedo: RgbBuffer::new(size, [128, 128, 128]),
        roughness: GrayBuffer::new(size, 50),
        metalness: GrayBuffer::new(size, 200),
        normal: GrayBuffer::new(size, 128),
    }
}

/// Checkerboard with `squares` blocks per edge.
pub fn checkerboard(size: u32, squares: u32, color_a: [u8; 3], color_b: [u8; 3]) -> RgbBuffer {
    let block = (size / squares).max(1);
    let mut out = RgbBuffer::new(size, color_a);
    for y in 0..size {
        for x in 0..size {
            if ((x / block) + (y / block)) % 2 != 0 {
                out.set(x, y, color_b);
            }
        }
    }
    out
}

/// Simple value noise: random grid values bilinearly interpolated,
/// summed over `octaves` with halving amplitude, normalized to 0..255.
pub fn value_noise(size: u32, octaves: u32, seed: u32) -> GrayBuffer {
    let mut rng = DeterministicRng::new(seed);
    let n = size as usize;
    let mut field = vec![0.0f32; n * n];

    let mut amplitude = 1.0f32;
    let mut frequency = 1u32;
    for _ in 0..octaves {
        let step = (size / (4 * frequency)).max(1) as usize;
        let grid: Vec<Vec<f32>> = (0..=step)
            .map(|_| (0..=step).map(|_| rng.gen_f32()).collect())
            .collect();
        let span = (n - 1).max(1) as f32;
        for yi in 0..n {
            let y = yi as f32 * step as f32 / span;
            let y0 = y.floor() as usize;
            let y1 = (y0 + 1).min(step);
            let ty = y - y0 as f32;
            for xi in 0..n {
                let x = xi as f32 * step as f32 / span;
                let x0 = x.floor() as usize;
                let x1 = (x0 + 1).min(step);
                let tx = x - x0 as f32;
                let a = lerp(grid[y0][x0], grid[y0][x1], tx);
                let b = lerp(grid[y1][x0], grid[y1][x1], tx);
                field[yi * n + xi] += amplitude * lerp(a, b, ty);
            }
        }
        amplitude *= 0.5;
        frequency *= 2;
    }

    let min = field.iter().copied().fold(f32::INFINITY, f32::min);
    let max = field.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let scale = 255.0 / (max - min + 1e-6);
    let mut out = GrayBuffer::new(size, 0);
    for yi in 0..n {
        for xi in 0..n {
            let v = ((field[yi * n + xi] - min) * scale) as u8;
            out.set(xi as u32, yi as u32, v);
        }
    }
    out
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Horizontal-plus-vertical gradient magnitude, scaled down so the detail
/// stays subtle.
fn edge_detail(base: &GrayBuffer) -> GrayBuffer {
    let size = base.size;
    let mut out = GrayBuffer::new(size, 0);
    for y in 0..size {
        for x in 0..size {
            let here = base.get(x, y) as i32;
            let right = base.get((x + 1).min(size - 1), y) as i32;
            let below = base.get(x, (y + 1).min(size - 1)) as i32;
            let magnitude = (here - right).abs() + (here - below).abs();
            out.set(x, y, ((magnitude * 4 / 5).min(255)) as u8);
        }
    }
    out
}
