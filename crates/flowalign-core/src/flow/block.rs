use ndarray::{s, Array4};

use crate::consts::{BLOCK_OUTPUT_CHANNELS, FLOW_CHANNEL_COUNT, LEAKY_SLOPE};
use crate::flow::params::BlockParams;
use crate::flow::residual;
use crate::ops::{
    conv2d, conv_transpose2d, leaky_relu, pixel_shuffle, resize_bilinear, scaled_size,
};
use crate::tensor::concat_channels;

/// One stage's output, at the stage input's native resolution.
pub struct BlockOutput {
    pub flow: Array4<f32>,
    pub mask: Array4<f32>,
}

/// Runs one flow-estimation block at scale factor `scale`.
///
/// The block works at 1/scale resolution: context (and prior flow, with
/// its displacement values divided by the scale to stay in the coarse
/// coordinate system) is downsampled, reduced by two stride-2 convs,
/// refined by the residual stack, projected back up by a transposed conv
/// plus pixel shuffle, then restored to the input resolution. Flow
/// channels are multiplied by the scale on the way out so the result is in
/// full-resolution pixel units.
pub fn run_block(
    params: &BlockParams,
    context: &Array4<f32>,
    prior_flow: Option<&Array4<f32>>,
    scale: f32,
) -> BlockOutput {
    let (_, _, height, width) = context.dim();
    let down_h = scaled_size(height, 1.0 / scale as f64);
    let down_w = scaled_size(width, 1.0 / scale as f64);

    let mut x = resize_bilinear(context, down_h, down_w);
    if let Some(flow) = prior_flow {
        let mut coarse = resize_bilinear(flow, down_h, down_w);
        coarse.mapv_inplace(|v| v / scale);
        x = concat_channels(&[x.view(), coarse.view()]);
    }

    let mut feat = conv2d(&x, &params.reduce.weight, &params.reduce.bias, 2, 1, 1);
    leaky_relu(&mut feat, LEAKY_SLOPE);
    let mut feat = conv2d(&feat, &params.expand.weight, &params.expand.bias, 2, 1, 1);
    leaky_relu(&mut feat, LEAKY_SLOPE);
    for unit in &params.refine {
        feat = residual::refine(unit, &feat, 1);
    }

    let projected = conv_transpose2d(&feat, &params.project.weight, &params.project.bias, 2, 1);
    let shuffled = pixel_shuffle(&projected, 2);
    debug_assert_eq!(shuffled.dim().1, BLOCK_OUTPUT_CHANNELS);
    let restored = resize_bilinear(&shuffled, height, width);

    // Channels [0:4] are the flow, [4:5] the mask; the last channel is
    // unused by every consumer.
    let mut flow = restored.slice(s![.., 0..FLOW_CHANNEL_COUNT, .., ..]).to_owned();
    flow.mapv_inplace(|v| v * scale);
    let mask = restored
        .slice(s![.., FLOW_CHANNEL_COUNT..FLOW_CHANNEL_COUNT + 1, .., ..])
        .to_owned();
    BlockOutput { flow, mask }
}
