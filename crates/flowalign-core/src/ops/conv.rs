use ndarray::{s, Array1, Array2, Array4};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Direct 2-D convolution with zero padding.
/// `weight` has shape (out_channels, in_channels, kh, kw).
pub fn conv2d(
    input: &Array4<f32>,
    weight: &Array4<f32>,
    bias: &Array1<f32>,
    stride: usize,
    padding: usize,
    dilation: usize,
) -> Array4<f32> {
    let (batch, in_channels, in_h, in_w) = input.dim();
    let (out_channels, weight_in, kh, kw) = weight.dim();
    debug_assert_eq!(in_channels, weight_in, "conv2d: input/weight channel mismatch");
    debug_assert_eq!(out_channels, bias.len(), "conv2d: bias length mismatch");

    let out_h = conv_output_size(in_h, kh, stride, padding, dilation);
    let out_w = conv_output_size(in_w, kw, stride, padding, dilation);
    let mut out = Array4::zeros((batch, out_channels, out_h, out_w));

    let parallel = out_channels * out_h * out_w >= PARALLEL_PIXEL_THRESHOLD;
    for b in 0..batch {
        if parallel {
            let planes: Vec<Array2<f32>> = (0..out_channels)
                .into_par_iter()
                .map(|oc| {
                    conv_plane(
                        input, weight, bias[oc], b, oc, out_h, out_w, stride, padding, dilation,
                    )
                })
                .collect();
            for (oc, plane) in planes.into_iter().enumerate() {
                out.slice_mut(s![b, oc, .., ..]).assign(&plane);
            }
        } else {
            for oc in 0..out_channels {
                let plane = conv_plane(
                    input, weight, bias[oc], b, oc, out_h, out_w, stride, padding, dilation,
                );
                out.slice_mut(s![b, oc, .., ..]).assign(&plane);
            }
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn conv_plane(
    input: &Array4<f32>,
    weight: &Array4<f32>,
    bias: f32,
    b: usize,
    oc: usize,
    out_h: usize,
    out_w: usize,
    stride: usize,
    padding: usize,
    dilation: usize,
) -> Array2<f32> {
    let (_, in_channels, in_h, in_w) = input.dim();
    let (_, _, kh, kw) = weight.dim();
    let mut plane = Array2::<f32>::zeros((out_h, out_w));

    for ic in 0..in_channels {
        let src = input.slice(s![b, ic, .., ..]);
        let ker = weight.slice(s![oc, ic, .., ..]);
        for ky in 0..kh {
            for kx in 0..kw {
                let kv = ker[[ky, kx]];
                for oy in 0..out_h {
                    let iy = (oy * stride + ky * dilation) as isize - padding as isize;
                    if iy < 0 || iy >= in_h as isize {
                        continue;
                    }
                    for ox in 0..out_w {
                        let ix = (ox * stride + kx * dilation) as isize - padding as isize;
                        if ix < 0 || ix >= in_w as isize {
                            continue;
                        }
                        plane[[oy, ox]] += src[[iy as usize, ix as usize]] * kv;
                    }
                }
            }
        }
    }
    plane += bias;
    plane
}

/// Transposed 2-D convolution (the stride-2 upsampling layer).
/// `weight` has shape (in_channels, out_channels, kh, kw).
pub fn conv_transpose2d(
    input: &Array4<f32>,
    weight: &Array4<f32>,
    bias: &Array1<f32>,
    stride: usize,
    padding: usize,
) -> Array4<f32> {
    let (batch, in_channels, in_h, in_w) = input.dim();
    let (weight_in, out_channels, kh, kw) = weight.dim();
    debug_assert_eq!(in_channels, weight_in, "conv_transpose2d: input/weight channel mismatch");
    debug_assert_eq!(out_channels, bias.len(), "conv_transpose2d: bias length mismatch");

    let out_h = (in_h - 1) * stride + kh - 2 * padding;
    let out_w = (in_w - 1) * stride + kw - 2 * padding;
    let mut out = Array4::zeros((batch, out_channels, out_h, out_w));

    let parallel = out_channels * out_h * out_w >= PARALLEL_PIXEL_THRESHOLD;
    for b in 0..batch {
        if parallel {
            let planes: Vec<Array2<f32>> = (0..out_channels)
                .into_par_iter()
                .map(|oc| deconv_plane(input, weight, bias[oc], b, oc, out_h, out_w, stride, padding))
                .collect();
            for (oc, plane) in planes.into_iter().enumerate() {
                out.slice_mut(s![b, oc, .., ..]).assign(&plane);
            }
        } else {
            for oc in 0..out_channels {
                let plane =
                    deconv_plane(input, weight, bias[oc], b, oc, out_h, out_w, stride, padding);
                out.slice_mut(s![b, oc, .., ..]).assign(&plane);
            }
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn deconv_plane(
    input: &Array4<f32>,
    weight: &Array4<f32>,
    bias: f32,
    b: usize,
    oc: usize,
    out_h: usize,
    out_w: usize,
    stride: usize,
    padding: usize,
) -> Array2<f32> {
    let (_, in_channels, in_h, in_w) = input.dim();
    let (_, _, kh, kw) = weight.dim();
    let mut plane = Array2::<f32>::from_elem((out_h, out_w), bias);

    // Gather form: each output pixel sums the input positions whose
    // stride-spread kernel footprint covers it.
    for oy in 0..out_h {
        for ox in 0..out_w {
            let mut sum = 0.0f32;
            for ky in 0..kh {
                let ny = oy + padding;
                if ny < ky || (ny - ky) % stride != 0 {
                    continue;
                }
                let iy = (ny - ky) / stride;
                if iy >= in_h {
                    continue;
                }
                for kx in 0..kw {
                    let nx = ox + padding;
                    if nx < kx || (nx - kx) % stride != 0 {
                        continue;
                    }
                    let ix = (nx - kx) / stride;
                    if ix >= in_w {
                        continue;
                    }
                    for ic in 0..in_channels {
                        sum += input[[b, ic, iy, ix]] * weight[[ic, oc, ky, kx]];
                    }
                }
            }
            plane[[oy, ox]] += sum;
        }
    }
    plane
}

/// Rearranges channel blocks of size r² into r×r spatial blocks:
/// (B, C·r², H, W) → (B, C, H·r, W·r), channel order c·r² + dy·r + dx.
pub fn pixel_shuffle(input: &Array4<f32>, upscale: usize) -> Array4<f32> {
    let (batch, channels, h, w) = input.dim();
    let r2 = upscale * upscale;
    debug_assert_eq!(channels % r2, 0, "pixel_shuffle: channels not divisible by r^2");
    let out_c = channels / r2;
    let mut out = Array4::zeros((batch, out_c, h * upscale, w * upscale));

    for b in 0..batch {
        for oc in 0..out_c {
            for y in 0..h * upscale {
                let sy = y / upscale;
                let dy = y % upscale;
                for x in 0..w * upscale {
                    let sx = x / upscale;
                    let dx = x % upscale;
                    out[[b, oc, y, x]] = input[[b, oc * r2 + dy * upscale + dx, sy, sx]];
                }
            }
        }
    }
    out
}

/// Leaky rectifier, in place.
pub fn leaky_relu(x: &mut Array4<f32>, negative_slope: f32) {
    x.mapv_inplace(|v| if v >= 0.0 { v } else { v * negative_slope });
}

fn conv_output_size(size: usize, kernel: usize, stride: usize, padding: usize, dilation: usize) -> usize {
    (size + 2 * padding - dilation * (kernel - 1) - 1) / stride + 1
}
