use ndarray::{s, Array4};

use crate::consts::LEAKY_SLOPE;
use crate::flow::params::ResidualParams;
use crate::ops::{conv2d, leaky_relu};

/// One refinement step: `leaky_relu(conv(x) * gain + x)` with the gain
/// broadcast per channel. Padding equals the dilation, so the output keeps
/// the input's shape.
pub fn refine(params: &ResidualParams, x: &Array4<f32>, dilation: usize) -> Array4<f32> {
    let mut y = conv2d(x, &params.conv.weight, &params.conv.bias, 1, dilation, dilation);
    let (batch, channels, _, _) = y.dim();
    for b in 0..batch {
        for c in 0..channels {
            let gain = params.gain[c];
            let mut lane = y.slice_mut(s![b, c, .., ..]);
            lane.zip_mut_with(&x.slice(s![b, c, .., ..]), |v, &input| {
                *v = *v * gain + input;
            });
        }
    }
    leaky_relu(&mut y, LEAKY_SLOPE);
    y
}
