use ndarray::{concatenate, s, Array4, ArrayView4, Axis};

use crate::consts::{COLOR_CHANNEL_COUNT, SIZE_MULTIPLE};
use crate::error::{FlowAlignError, Result};

/// Temporal position at which the alignment is evaluated:
/// 0 = at the input image, 1 = at the target image.
#[derive(Clone, Debug)]
pub enum Timestep {
    /// Same temporal position at every pixel.
    Uniform(f32),
    /// Per-pixel temporal positions, shape (batch, 1, height, width).
    PerPixel(Array4<f32>),
}

impl Default for Timestep {
    fn default() -> Self {
        Timestep::Uniform(1.0)
    }
}

impl Timestep {
    /// Materializes the timestep as a (batch, 1, height, width) plane.
    pub fn to_plane(&self, batch: usize, height: usize, width: usize) -> Result<Array4<f32>> {
        match self {
            Timestep::Uniform(t) => Ok(Array4::from_elem((batch, 1, height, width), *t)),
            Timestep::PerPixel(map) => {
                let expected = [batch, 1, height, width];
                if map.shape() != expected {
                    return Err(FlowAlignError::ShapeMismatch(format!(
                        "timestep map has shape {:?}, expected {:?}",
                        map.shape(),
                        expected
                    )));
                }
                Ok(map.clone())
            }
        }
    }
}

/// Concatenates tensors along the channel axis.
pub fn concat_channels(parts: &[ArrayView4<f32>]) -> Array4<f32> {
    concatenate(Axis(1), parts).expect("channel concat requires matching batch and spatial dims")
}

/// Channels [0:2]: displacement of the input image toward the target.
pub fn flow_forward(flow: &Array4<f32>) -> ArrayView4<'_, f32> {
    flow.slice(s![.., 0..2, .., ..])
}

/// Channels [2:4]: displacement of the target image toward the input.
pub fn flow_backward(flow: &Array4<f32>) -> ArrayView4<'_, f32> {
    flow.slice(s![.., 2..4, .., ..])
}

/// Exchanges the two direction halves of a 4-channel flow field.
pub fn swap_flow_halves(flow: &Array4<f32>) -> Array4<f32> {
    concat_channels(&[flow_backward(flow), flow_forward(flow)])
}

/// Clamps every element into [0, 1] in place.
pub fn clamp_unit(x: &mut Array4<f32>) {
    x.mapv_inplace(|v| v.clamp(0.0, 1.0));
}

/// Checks two images share one shape. Callers that pad to a size multiple
/// run this on the originals first, since padding can round two different
/// sizes to the same bucket.
pub fn validate_same_shape(a: &Array4<f32>, b: &Array4<f32>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(FlowAlignError::ShapeMismatch(format!(
            "input images have different shapes: {:?} vs {:?}",
            a.shape(),
            b.shape()
        )));
    }
    Ok(())
}

/// Checks the caller contract for an image pair: equal shapes, 3 color
/// channels, nonzero spatial dims divisible by [`SIZE_MULTIPLE`].
pub fn validate_image_pair(a: &Array4<f32>, b: &Array4<f32>) -> Result<()> {
    validate_same_shape(a, b)?;
    let (_, channels, height, width) = a.dim();
    if channels != COLOR_CHANNEL_COUNT {
        return Err(FlowAlignError::ShapeMismatch(format!(
            "expected {} color channels, got {}",
            COLOR_CHANNEL_COUNT, channels
        )));
    }
    if height == 0 || width == 0 || height % SIZE_MULTIPLE != 0 || width % SIZE_MULTIPLE != 0 {
        return Err(FlowAlignError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Pads the bottom/right spatial edges by reflection so that height and
/// width become multiples of `multiple`. Returns the padded tensor and the
/// original (height, width) for a later [`crop_spatial`].
pub fn pad_to_multiple(x: &Array4<f32>, multiple: usize) -> (Array4<f32>, (usize, usize)) {
    let (batch, channels, height, width) = x.dim();
    let padded_h = (height + multiple - 1) / multiple * multiple;
    let padded_w = (width + multiple - 1) / multiple * multiple;
    if padded_h == height && padded_w == width {
        return (x.clone(), (height, width));
    }

    let mut out = Array4::zeros((batch, channels, padded_h, padded_w));
    for b in 0..batch {
        for c in 0..channels {
            for y in 0..padded_h {
                let sy = reflect_index(y, height);
                for xx in 0..padded_w {
                    let sx = reflect_index(xx, width);
                    out[[b, c, y, xx]] = x[[b, c, sy, sx]];
                }
            }
        }
    }
    (out, (height, width))
}

/// Crops the top-left (height, width) window, undoing [`pad_to_multiple`].
pub fn crop_spatial(x: &Array4<f32>, height: usize, width: usize) -> Array4<f32> {
    x.slice(s![.., .., 0..height, 0..width]).to_owned()
}

// Mirror index for out-of-range coordinates, without repeating the edge.
fn reflect_index(i: usize, size: usize) -> usize {
    if i < size {
        i
    } else {
        (2 * size).saturating_sub(i + 2)
    }
}
