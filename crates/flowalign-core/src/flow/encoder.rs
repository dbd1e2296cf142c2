use ndarray::Array4;

use crate::consts::LEAKY_SLOPE;
use crate::flow::params::EncoderParams;
use crate::ops::{conv2d, conv_transpose2d, leaky_relu};

/// Extracts the (B, 8, H, W) feature map the flow cascade consumes:
/// stride-2 downsample to 32 channels, two 3×3 convs, stride-2 transposed
/// upsample back to full resolution. The final layer is left un-activated.
pub fn encode(params: &EncoderParams, image: &Array4<f32>) -> Array4<f32> {
    let mut x = conv2d(image, &params.down.weight, &params.down.bias, 2, 1, 1);
    leaky_relu(&mut x, LEAKY_SLOPE);
    let mut x = conv2d(&x, &params.mid0.weight, &params.mid0.bias, 1, 1, 1);
    leaky_relu(&mut x, LEAKY_SLOPE);
    let mut x = conv2d(&x, &params.mid1.weight, &params.mid1.bias, 1, 1, 1);
    leaky_relu(&mut x, LEAKY_SLOPE);
    conv_transpose2d(&x, &params.up.weight, &params.up.bias, 2, 1)
}

/// Runs the same four layers but returns each layer's raw (pre-activation)
/// output, for inspection of the intermediate maps.
pub fn encode_stages(params: &EncoderParams, image: &Array4<f32>) -> [Array4<f32>; 4] {
    let x0 = conv2d(image, &params.down.weight, &params.down.bias, 2, 1, 1);
    let mut x = x0.clone();
    leaky_relu(&mut x, LEAKY_SLOPE);
    let x1 = conv2d(&x, &params.mid0.weight, &params.mid0.bias, 1, 1, 1);
    let mut x = x1.clone();
    leaky_relu(&mut x, LEAKY_SLOPE);
    let x2 = conv2d(&x, &params.mid1.weight, &params.mid1.bias, 1, 1, 1);
    let mut x = x2.clone();
    leaky_relu(&mut x, LEAKY_SLOPE);
    let x3 = conv_transpose2d(&x, &params.up.weight, &params.up.bias, 2, 1);
    [x0, x1, x2, x3]
}
