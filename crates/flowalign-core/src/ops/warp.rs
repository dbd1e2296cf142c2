use ndarray::{s, Array2, Array4, ArrayView2, ArrayView4};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::ops::resize::bilinear_sample;

/// Resamples `input` along a displacement field: output pixel (x, y) reads
/// the source at (x + u, y + v), where `flow_half` is a (batch, 2, h, w)
/// field carrying u in channel 0 and v in channel 1, in pixel units.
/// Sampling is bilinear with border replication; works for any channel
/// count whose spatial size matches the flow.
pub fn warp(input: &Array4<f32>, flow_half: ArrayView4<'_, f32>) -> Array4<f32> {
    let (batch, channels, h, w) = input.dim();
    debug_assert_eq!(flow_half.dim().1, 2, "warp: flow half must have 2 channels");
    debug_assert_eq!(
        (flow_half.dim().2, flow_half.dim().3),
        (h, w),
        "warp: flow/input spatial mismatch"
    );

    let mut out = Array4::zeros((batch, channels, h, w));
    let parallel = channels * h * w >= PARALLEL_PIXEL_THRESHOLD;
    for b in 0..batch {
        let u = flow_half.slice(s![b, 0, .., ..]);
        let v = flow_half.slice(s![b, 1, .., ..]);
        if parallel {
            let planes: Vec<Array2<f32>> = (0..channels)
                .into_par_iter()
                .map(|c| warp_plane(input.slice(s![b, c, .., ..]), u, v))
                .collect();
            for (c, plane) in planes.into_iter().enumerate() {
                out.slice_mut(s![b, c, .., ..]).assign(&plane);
            }
        } else {
            for c in 0..channels {
                let plane = warp_plane(input.slice(s![b, c, .., ..]), u, v);
                out.slice_mut(s![b, c, .., ..]).assign(&plane);
            }
        }
    }
    out
}

fn warp_plane(
    src: ArrayView2<'_, f32>,
    u: ArrayView2<'_, f32>,
    v: ArrayView2<'_, f32>,
) -> Array2<f32> {
    let (h, w) = src.dim();
    let mut plane = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let sx = x as f32 + u[[y, x]];
            let sy = y as f32 + v[[y, x]];
            plane[[y, x]] = bilinear_sample(src, sy, sx);
        }
    }
    plane
}
