use ndarray::{s, Array2, Array4, ArrayView2};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Output size of a bilinear rescale by `scale`, floored, never zero.
pub fn scaled_size(size: usize, scale: f64) -> usize {
    ((size as f64 * scale).floor() as usize).max(1)
}

/// Bilinear resize with half-pixel centers (no corner alignment): output
/// pixel `o` samples source coordinate `(o + 0.5) * in/out - 0.5`, with
/// out-of-range corners clamped to the edge.
pub fn resize_bilinear(input: &Array4<f32>, out_h: usize, out_w: usize) -> Array4<f32> {
    let (batch, channels, in_h, in_w) = input.dim();
    if out_h == in_h && out_w == in_w {
        return input.clone();
    }
    let scale_y = in_h as f32 / out_h as f32;
    let scale_x = in_w as f32 / out_w as f32;
    let mut out = Array4::zeros((batch, channels, out_h, out_w));

    let parallel = channels * out_h * out_w >= PARALLEL_PIXEL_THRESHOLD;
    for b in 0..batch {
        if parallel {
            let planes: Vec<Array2<f32>> = (0..channels)
                .into_par_iter()
                .map(|c| {
                    resize_plane(input.slice(s![b, c, .., ..]), out_h, out_w, scale_y, scale_x)
                })
                .collect();
            for (c, plane) in planes.into_iter().enumerate() {
                out.slice_mut(s![b, c, .., ..]).assign(&plane);
            }
        } else {
            for c in 0..channels {
                let plane =
                    resize_plane(input.slice(s![b, c, .., ..]), out_h, out_w, scale_y, scale_x);
                out.slice_mut(s![b, c, .., ..]).assign(&plane);
            }
        }
    }
    out
}

fn resize_plane(
    src: ArrayView2<'_, f32>,
    out_h: usize,
    out_w: usize,
    scale_y: f32,
    scale_x: f32,
) -> Array2<f32> {
    let mut plane = Array2::<f32>::zeros((out_h, out_w));
    for oy in 0..out_h {
        let sy = (oy as f32 + 0.5) * scale_y - 0.5;
        for ox in 0..out_w {
            let sx = (ox as f32 + 0.5) * scale_x - 0.5;
            plane[[oy, ox]] = bilinear_sample(src, sy, sx);
        }
    }
    plane
}

/// Bilinear lookup at a fractional (y, x); corner indices clamp to the
/// image edge, so out-of-range coordinates replicate the border.
pub(crate) fn bilinear_sample(src: ArrayView2<'_, f32>, y: f32, x: f32) -> f32 {
    let (h, w) = src.dim();
    let y0f = y.floor();
    let x0f = x.floor();
    let ty = y - y0f;
    let tx = x - x0f;

    let y0 = (y0f as isize).clamp(0, h as isize - 1) as usize;
    let y1 = (y0f as isize + 1).clamp(0, h as isize - 1) as usize;
    let x0 = (x0f as isize).clamp(0, w as isize - 1) as usize;
    let x1 = (x0f as isize + 1).clamp(0, w as isize - 1) as usize;

    let top = src[[y0, x0]] * (1.0 - tx) + src[[y0, x1]] * tx;
    let bottom = src[[y1, x0]] * (1.0 - tx) + src[[y1, x1]] * tx;
    top * (1.0 - ty) + bottom * ty
}
