use ndarray::{s, Array4};

use flowalign_core::error::FlowAlignError;
use flowalign_core::tensor::{
    clamp_unit, concat_channels, crop_spatial, flow_backward, flow_forward, pad_to_multiple,
    swap_flow_halves, validate_image_pair, validate_same_shape, Timestep,
};

// ---------------------------------------------------------------------------
// Timestep
// ---------------------------------------------------------------------------

#[test]
fn test_uniform_timestep_fills_plane() {
    let plane = Timestep::Uniform(0.25).to_plane(2, 8, 8).unwrap();
    assert_eq!(plane.dim(), (2, 1, 8, 8));
    for v in plane.iter() {
        assert_eq!(*v, 0.25);
    }
}

#[test]
fn test_per_pixel_timestep_passes_through() {
    let map = Array4::from_shape_fn((1, 1, 4, 4), |(_, _, y, x)| (y * 4 + x) as f32 / 16.0);
    let plane = Timestep::PerPixel(map.clone()).to_plane(1, 4, 4).unwrap();
    assert_eq!(plane, map);
}

#[test]
fn test_per_pixel_timestep_shape_is_checked() {
    let map = Array4::zeros((1, 1, 4, 4));
    let err = Timestep::PerPixel(map).to_plane(1, 8, 8).unwrap_err();
    assert!(matches!(err, FlowAlignError::ShapeMismatch(_)));
}

// ---------------------------------------------------------------------------
// Channel concatenation and flow halves
// ---------------------------------------------------------------------------

#[test]
fn test_concat_channels_stacks_in_order() {
    let a = Array4::from_elem((1, 2, 3, 3), 1.0);
    let b = Array4::from_elem((1, 3, 3, 3), 2.0);
    let joined = concat_channels(&[a.view(), b.view()]);
    assert_eq!(joined.dim(), (1, 5, 3, 3));
    assert_eq!(joined[[0, 1, 0, 0]], 1.0);
    assert_eq!(joined[[0, 2, 0, 0]], 2.0);
}

#[test]
fn test_flow_halves_select_directions() {
    let flow = Array4::from_shape_fn((1, 4, 2, 2), |(_, c, _, _)| c as f32);
    let forward = flow_forward(&flow);
    let backward = flow_backward(&flow);
    assert_eq!(forward.dim(), (1, 2, 2, 2));
    assert_eq!(backward.dim(), (1, 2, 2, 2));
    assert_eq!(forward[[0, 0, 0, 0]], 0.0);
    assert_eq!(forward[[0, 1, 0, 0]], 1.0);
    assert_eq!(backward[[0, 0, 0, 0]], 2.0);
    assert_eq!(backward[[0, 1, 0, 0]], 3.0);
}

#[test]
fn test_swap_flow_halves_is_an_involution() {
    let flow = Array4::from_shape_fn((1, 4, 2, 2), |(_, c, y, x)| (c * 10 + y * 2 + x) as f32);
    let swapped = swap_flow_halves(&flow);
    assert_eq!(swapped[[0, 0, 0, 0]], 20.0);
    assert_eq!(swapped[[0, 2, 0, 0]], 0.0);
    assert_eq!(swap_flow_halves(&swapped), flow);
}

// ---------------------------------------------------------------------------
// clamp_unit
// ---------------------------------------------------------------------------

#[test]
fn test_clamp_unit_limits_range() {
    let mut x = Array4::zeros((1, 1, 1, 4));
    x[[0, 0, 0, 0]] = -0.5;
    x[[0, 0, 0, 1]] = 0.5;
    x[[0, 0, 0, 2]] = 1.5;
    x[[0, 0, 0, 3]] = 1.0;
    clamp_unit(&mut x);
    assert_eq!(x[[0, 0, 0, 0]], 0.0);
    assert_eq!(x[[0, 0, 0, 1]], 0.5);
    assert_eq!(x[[0, 0, 0, 2]], 1.0);
    assert_eq!(x[[0, 0, 0, 3]], 1.0);
}

// ---------------------------------------------------------------------------
// validate_image_pair
// ---------------------------------------------------------------------------

#[test]
fn test_validate_accepts_conforming_pair() {
    let a = Array4::zeros((1, 3, 32, 48));
    let b = Array4::zeros((1, 3, 32, 48));
    assert!(validate_image_pair(&a, &b).is_ok());
}

#[test]
fn test_validate_rejects_shape_mismatch() {
    let a = Array4::zeros((1, 3, 32, 32));
    let b = Array4::zeros((1, 3, 32, 48));
    assert!(matches!(
        validate_image_pair(&a, &b),
        Err(FlowAlignError::ShapeMismatch(_))
    ));
}

#[test]
fn test_validate_rejects_wrong_channel_count() {
    let a = Array4::zeros((1, 4, 32, 32));
    let b = Array4::zeros((1, 4, 32, 32));
    assert!(matches!(
        validate_image_pair(&a, &b),
        Err(FlowAlignError::ShapeMismatch(_))
    ));
}

#[test]
fn test_validate_rejects_indivisible_dimensions() {
    let a = Array4::zeros((1, 3, 20, 20));
    let b = Array4::zeros((1, 3, 20, 20));
    assert!(matches!(
        validate_image_pair(&a, &b),
        Err(FlowAlignError::InvalidDimensions { width: 20, height: 20 })
    ));
}

#[test]
fn test_validate_rejects_empty_spatial_dimensions() {
    // 0 % 16 == 0, so divisibility alone would let an empty image through
    // to the encoder.
    let a = Array4::zeros((1, 3, 0, 0));
    assert!(matches!(
        validate_image_pair(&a, &a),
        Err(FlowAlignError::InvalidDimensions { width: 0, height: 0 })
    ));

    let b = Array4::zeros((1, 3, 32, 0));
    assert!(matches!(
        validate_image_pair(&b, &b),
        Err(FlowAlignError::InvalidDimensions { width: 0, height: 32 })
    ));
}

#[test]
fn test_same_shape_check_catches_pairs_that_pad_alike() {
    // 17x17 and 20x20 both pad to 32x32, so shape checks have to run on
    // the originals.
    let a = Array4::zeros((1, 3, 17, 17));
    let b = Array4::zeros((1, 3, 20, 20));
    let (padded_a, _) = pad_to_multiple(&a, 16);
    let (padded_b, _) = pad_to_multiple(&b, 16);
    assert_eq!(padded_a.dim(), padded_b.dim());
    assert!(validate_image_pair(&padded_a, &padded_b).is_ok());

    assert!(matches!(
        validate_same_shape(&a, &b),
        Err(FlowAlignError::ShapeMismatch(_))
    ));
    assert!(validate_same_shape(&a, &a).is_ok());
}

// ---------------------------------------------------------------------------
// pad_to_multiple / crop_spatial
// ---------------------------------------------------------------------------

#[test]
fn test_pad_rounds_up_and_crop_restores() {
    let original = Array4::from_shape_fn((1, 3, 20, 28), |(_, c, y, x)| {
        (c * 1000 + y * 28 + x) as f32
    });
    let (padded, (h, w)) = pad_to_multiple(&original, 16);
    assert_eq!(padded.dim(), (1, 3, 32, 32));
    assert_eq!((h, w), (20, 28));

    let cropped = crop_spatial(&padded, h, w);
    assert_eq!(cropped, original);
}

#[test]
fn test_pad_reflects_bottom_and_right() {
    let original = Array4::from_shape_fn((1, 3, 20, 28), |(_, _, y, x)| (y * 28 + x) as f32);
    let (padded, _) = pad_to_multiple(&original, 16);
    // Row 20 mirrors row 18, row 31 mirrors row 7 (mirror without edge
    // repeat: index 2*size - i - 2).
    assert_eq!(padded[[0, 0, 20, 5]], original[[0, 0, 18, 5]]);
    assert_eq!(padded[[0, 0, 31, 5]], original[[0, 0, 7, 5]]);
    // Column 28 mirrors column 26.
    assert_eq!(padded[[0, 0, 10, 28]], original[[0, 0, 10, 26]]);
}

#[test]
fn test_pad_is_a_no_op_on_conforming_sizes() {
    let original = Array4::from_elem((1, 3, 32, 32), 0.7);
    let (padded, (h, w)) = pad_to_multiple(&original, 16);
    assert_eq!(padded, original);
    assert_eq!((h, w), (32, 32));
}

#[test]
fn test_crop_takes_top_left_window() {
    let x = Array4::from_shape_fn((1, 1, 8, 8), |(_, _, y, xx)| (y * 8 + xx) as f32);
    let cropped = crop_spatial(&x, 3, 5);
    assert_eq!(cropped.dim(), (1, 1, 3, 5));
    assert_eq!(cropped[[0, 0, 2, 4]], x[[0, 0, 2, 4]]);
    assert_eq!(cropped, x.slice(s![.., .., 0..3, 0..5]).to_owned());
}
