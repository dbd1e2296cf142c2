use ndarray::Array4;

use flowalign_core::consts::COLOR_CHANNEL_COUNT;
use flowalign_core::flow::params::{ConvParams, DeconvParams};
use flowalign_core::flow::ModelWeights;

/// Deterministic pseudo-random image with values in [0, 1).
pub fn noise_image(batch: usize, height: usize, width: usize, seed: u64) -> Array4<f32> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    Array4::from_shape_simple_fn((batch, COLOR_CHANNEL_COUNT, height, width), move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 40) as f32 / (1u64 << 24) as f32
    })
}

/// Ramp image: values rise left-to-right, top-to-bottom, offset per channel.
pub fn gradient_image(batch: usize, height: usize, width: usize) -> Array4<f32> {
    Array4::from_shape_fn((batch, COLOR_CHANNEL_COUNT, height, width), |(_, c, y, x)| {
        let base = (y * width + x) as f32 / (height * width) as f32;
        (0.8 * base + 0.05 * c as f32).min(1.0)
    })
}

/// Uniform image.
pub fn flat_image(batch: usize, height: usize, width: usize, value: f32) -> Array4<f32> {
    Array4::from_elem((batch, COLOR_CHANNEL_COUNT, height, width), value)
}

/// Full parameter bundle with every weight and bias zeroed and unit gains.
/// Running it produces all-zero outputs everywhere.
pub fn zeroed_weights() -> ModelWeights {
    let mut weights = ModelWeights::seeded(0);
    zero_conv(&mut weights.encoder.down);
    zero_conv(&mut weights.encoder.mid0);
    zero_conv(&mut weights.encoder.mid1);
    zero_deconv(&mut weights.encoder.up);
    for block in &mut weights.blocks {
        zero_conv(&mut block.reduce);
        zero_conv(&mut block.expand);
        for unit in &mut block.refine {
            zero_conv(&mut unit.conv);
            unit.gain.fill(1.0);
        }
        zero_deconv(&mut block.project);
    }
    weights
}

/// Zeroed bundle whose blocks emit spatially constant raw outputs: every
/// stage's raw flow channels carry `flow_bias` and the mask channel
/// `mask_bias`, before the per-stage flow scaling.
///
/// Works through the projection bias alone: the pixel shuffle folds input
/// channels {4c..4c+3} into output channel c, so giving all four slots the
/// same bias makes the shuffled plane constant.
pub fn constant_flow_weights(flow_bias: [f32; 4], mask_bias: f32) -> ModelWeights {
    let mut weights = zeroed_weights();
    let channel_bias = [
        flow_bias[0],
        flow_bias[1],
        flow_bias[2],
        flow_bias[3],
        mask_bias,
        0.0,
    ];
    for block in &mut weights.blocks {
        for (slot, value) in block.project.bias.iter_mut().enumerate() {
            *value = channel_bias[slot / 4];
        }
    }
    weights
}

fn zero_conv(p: &mut ConvParams) {
    p.weight.fill(0.0);
    p.bias.fill(0.0);
}

fn zero_deconv(p: &mut DeconvParams) {
    p.weight.fill(0.0);
    p.bias.fill(0.0);
}
