use ndarray::{s, Array2, Array4, ArrayView2};
use rayon::prelude::*;

use crate::consts::{BLUR_KERNEL_RADIUS, PARALLEL_PIXEL_THRESHOLD};

/// Fixed 5×5 Gaussian pre-filter, applied as separable 1-D passes with
/// border replication. Only the sigma varies; the kernel support does not.
/// A non-positive sigma leaves the input unchanged.
pub fn gaussian_blur(input: &Array4<f32>, sigma: f32) -> Array4<f32> {
    if sigma <= 0.0 {
        return input.clone();
    }
    let kernel = make_gaussian_kernel(sigma);
    let (batch, channels, h, w) = input.dim();
    let mut out = Array4::zeros(input.raw_dim());

    let parallel = channels * h * w >= PARALLEL_PIXEL_THRESHOLD;
    for b in 0..batch {
        if parallel {
            let planes: Vec<Array2<f32>> = (0..channels)
                .into_par_iter()
                .map(|c| blur_plane(input.slice(s![b, c, .., ..]), &kernel))
                .collect();
            for (c, plane) in planes.into_iter().enumerate() {
                out.slice_mut(s![b, c, .., ..]).assign(&plane);
            }
        } else {
            for c in 0..channels {
                let plane = blur_plane(input.slice(s![b, c, .., ..]), &kernel);
                out.slice_mut(s![b, c, .., ..]).assign(&plane);
            }
        }
    }
    out
}

fn make_gaussian_kernel(sigma: f32) -> [f32; 2 * BLUR_KERNEL_RADIUS + 1] {
    let mut kernel = [0.0f32; 2 * BLUR_KERNEL_RADIUS + 1];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;

    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - BLUR_KERNEL_RADIUS as f32;
        *k = (-x * x / s2).exp();
        sum += *k;
    }
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

fn blur_plane(src: ArrayView2<'_, f32>, kernel: &[f32]) -> Array2<f32> {
    let (h, w) = src.dim();
    let radius = kernel.len() / 2;

    let mut row_pass = Array2::<f32>::zeros((h, w));
    for row in 0..h {
        for col in 0..w {
            let mut sum = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let src_col =
                    (col as isize + ki as isize - radius as isize).clamp(0, w as isize - 1) as usize;
                sum += src[[row, src_col]] * kv;
            }
            row_pass[[row, col]] = sum;
        }
    }

    let mut result = Array2::<f32>::zeros((h, w));
    for row in 0..h {
        for col in 0..w {
            let mut sum = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let src_row =
                    (row as isize + ki as isize - radius as isize).clamp(0, h as isize - 1) as usize;
                sum += row_pass[[src_row, col]] * kv;
            }
            result[[row, col]] = sum;
        }
    }
    result
}
