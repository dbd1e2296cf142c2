use ndarray::Array4;

use flowalign_core::io::image_io::{load_image, save_image, save_png, save_tiff};

fn suffixed_temp(suffix: &str) -> tempfile::NamedTempFile {
    tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file")
}

/// Values centered between 8-bit steps so truncation is unambiguous.
fn quantized_tensor(h: usize, w: usize) -> Array4<f32> {
    Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
        ((c * 64 + y * w + x) as f32 + 0.5) / 255.0
    })
}

// ---------------------------------------------------------------------------
// PNG round trip
// ---------------------------------------------------------------------------

#[test]
fn test_png_round_trip_within_8bit_precision() {
    let tensor = quantized_tensor(8, 8);
    let file = suffixed_temp(".png");
    save_png(&tensor, file.path()).unwrap();

    let loaded = load_image(file.path()).unwrap();
    assert_eq!(loaded.dim(), (1, 3, 8, 8));
    for (a, b) in tensor.iter().zip(loaded.iter()) {
        assert!(
            (a - b).abs() <= 1.0 / 255.0,
            "round trip drifted: wrote {a}, read {b}"
        );
    }
}

#[test]
fn test_png_save_clamps_out_of_range_values() {
    let mut tensor = Array4::from_elem((1, 3, 2, 2), 0.5);
    tensor[[0, 0, 0, 0]] = -0.5;
    tensor[[0, 1, 0, 0]] = 1.5;
    let file = suffixed_temp(".png");
    save_png(&tensor, file.path()).unwrap();

    let loaded = load_image(file.path()).unwrap();
    assert!((loaded[[0, 0, 0, 0]] - 0.0).abs() < 1e-6);
    assert!((loaded[[0, 1, 0, 0]] - 1.0).abs() < 1e-6);
}

// ---------------------------------------------------------------------------
// TIFF round trip
// ---------------------------------------------------------------------------

#[test]
fn test_tiff_round_trip_keeps_16bit_precision() {
    let tensor = Array4::from_shape_fn((1, 3, 4, 4), |(_, c, y, x)| {
        ((c * 16 + y * 4 + x) as f32 * 1000.0 + 0.5) / 65535.0
    });
    let file = suffixed_temp(".tiff");
    save_tiff(&tensor, file.path()).unwrap();

    let loaded = load_image(file.path()).unwrap();
    for (a, b) in tensor.iter().zip(loaded.iter()) {
        assert!(
            (a - b).abs() <= 1.0 / 65535.0,
            "16-bit round trip drifted: wrote {a}, read {b}"
        );
    }
}

// ---------------------------------------------------------------------------
// Extension dispatch
// ---------------------------------------------------------------------------

#[test]
fn test_save_image_picks_tiff_for_tif_extension() {
    // A value between 8-bit steps survives only if the file is 16-bit.
    let tensor = Array4::from_elem((1, 3, 4, 4), 5000.5 / 65535.0);
    let file = suffixed_temp(".tif");
    save_image(&tensor, file.path()).unwrap();

    let loaded = load_image(file.path()).unwrap();
    assert!((loaded[[0, 0, 0, 0]] - tensor[[0, 0, 0, 0]]).abs() <= 1.0 / 65535.0);
}

#[test]
fn test_save_image_defaults_to_png() {
    let tensor = quantized_tensor(4, 4);
    let file = suffixed_temp(".png");
    save_image(&tensor, file.path()).unwrap();

    let loaded = load_image(file.path()).unwrap();
    assert_eq!(loaded.dim(), (1, 3, 4, 4));
    for (a, b) in tensor.iter().zip(loaded.iter()) {
        assert!((a - b).abs() <= 1.0 / 255.0);
    }
}
