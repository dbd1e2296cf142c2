use ndarray::Array4;

use flowalign_core::ops::warp;
use flowalign_core::tensor::{flow_backward, flow_forward};

fn ramp(h: usize, w: usize) -> Array4<f32> {
    Array4::from_shape_fn((1, 1, h, w), |(_, _, y, x)| (y * w + x) as f32)
}

fn flow_field(h: usize, w: usize, u: f32, v: f32) -> Array4<f32> {
    let mut flow = Array4::zeros((1, 4, h, w));
    flow.slice_mut(ndarray::s![0, 0, .., ..]).fill(u);
    flow.slice_mut(ndarray::s![0, 1, .., ..]).fill(v);
    // Backward half carries junk to prove the forward slice ignores it.
    flow.slice_mut(ndarray::s![0, 2, .., ..]).fill(99.0);
    flow.slice_mut(ndarray::s![0, 3, .., ..]).fill(-99.0);
    flow
}

// ---------------------------------------------------------------------------
// warp
// ---------------------------------------------------------------------------

#[test]
fn test_warp_zero_flow_is_identity() {
    let src = ramp(6, 6);
    let flow = flow_field(6, 6, 0.0, 0.0);
    let out = warp(&src, flow_forward(&flow));
    assert_eq!(out, src);
}

#[test]
fn test_warp_integer_shift_right() {
    // u = 1: output (y, x) reads source (y, x+1); the last column
    // replicates the border.
    let src = ramp(4, 4);
    let flow = flow_field(4, 4, 1.0, 0.0);
    let out = warp(&src, flow_forward(&flow));
    for y in 0..4 {
        for x in 0..3 {
            assert!((out[[0, 0, y, x]] - src[[0, 0, y, x + 1]]).abs() < 1e-6);
        }
        assert!((out[[0, 0, y, 3]] - src[[0, 0, y, 3]]).abs() < 1e-6);
    }
}

#[test]
fn test_warp_negative_vertical_shift_replicates_top() {
    // v = -1: output row 0 samples above the image and replicates row 0.
    let src = ramp(4, 4);
    let flow = flow_field(4, 4, 0.0, -1.0);
    let out = warp(&src, flow_forward(&flow));
    for x in 0..4 {
        assert!((out[[0, 0, 0, x]] - src[[0, 0, 0, x]]).abs() < 1e-6);
    }
    for y in 1..4 {
        for x in 0..4 {
            assert!((out[[0, 0, y, x]] - src[[0, 0, y - 1, x]]).abs() < 1e-6);
        }
    }
}

#[test]
fn test_warp_fractional_shift_interpolates() {
    // u = 0.5: interior pixels average their two horizontal neighbors.
    let src = ramp(4, 4);
    let flow = flow_field(4, 4, 0.5, 0.0);
    let out = warp(&src, flow_forward(&flow));
    for y in 0..4 {
        for x in 0..3 {
            let expected = 0.5 * (src[[0, 0, y, x]] + src[[0, 0, y, x + 1]]);
            assert!(
                (out[[0, 0, y, x]] - expected).abs() < 1e-6,
                "({y},{x}): expected {expected}, got {}",
                out[[0, 0, y, x]]
            );
        }
    }
}

#[test]
fn test_warp_moves_every_channel() {
    // A 5-channel input (feature-map shaped) shifts coherently.
    let src = Array4::from_shape_fn((1, 5, 4, 4), |(_, c, y, x)| {
        (c * 100 + y * 4 + x) as f32
    });
    let flow = flow_field(4, 4, 1.0, 0.0);
    let out = warp(&src, flow_forward(&flow));
    assert_eq!(out.dim(), (1, 5, 4, 4));
    for c in 0..5 {
        assert!((out[[0, c, 2, 0]] - src[[0, c, 2, 1]]).abs() < 1e-6);
    }
}

#[test]
fn test_warp_backward_half_selects_other_direction() {
    // Warping by the backward half (channels 2..4) must use those values,
    // not the forward ones.
    let src = ramp(4, 4);
    let mut flow = Array4::zeros((1, 4, 4, 4));
    flow.slice_mut(ndarray::s![0, 2, .., ..]).fill(1.0);
    let out = warp(&src, flow_backward(&flow));
    assert!((out[[0, 0, 0, 0]] - src[[0, 0, 0, 1]]).abs() < 1e-6);
}

#[test]
fn test_warp_batched_flows_stay_separate() {
    // Batch 0 shifts right by one, batch 1 is static.
    let src = Array4::from_shape_fn((2, 1, 4, 4), |(b, _, y, x)| {
        (b * 1000 + y * 4 + x) as f32
    });
    let mut flow = Array4::zeros((2, 4, 4, 4));
    flow.slice_mut(ndarray::s![0, 0, .., ..]).fill(1.0);
    let out = warp(&src, flow_forward(&flow));
    assert!((out[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
    assert!((out[[1, 0, 0, 0]] - 1000.0).abs() < 1e-6);
}
