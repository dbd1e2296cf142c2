use ndarray::{Array4, ArrayView4};
use tracing::debug;

use crate::consts::CASCADE_STAGE_COUNT;
use crate::error::{FlowAlignError, Result};
use crate::flow::block::run_block;
use crate::flow::encoder::encode;
use crate::flow::params::ModelWeights;
use crate::ops::warp;
use crate::tensor::{
    concat_channels, flow_backward, flow_forward, swap_flow_halves, validate_image_pair,
};

/// Result of a cascade run. The orchestrator only consumes the flow; the
/// mask rides along for callers that want it.
#[derive(Debug)]
pub struct FlowEstimate {
    pub flow: Array4<f32>,
    pub mask: Array4<f32>,
}

/// Runs the four-stage coarse-to-fine estimator on an image pair.
///
/// `timestep` is a materialized (B,1,H,W) plane and `scales` the per-stage
/// scale factors, coarse to fine. Stage 0 estimates from scratch; later
/// stages warp the encoded features by the accumulated flow and refine it
/// with a delta. With `ensemble`, every stage also runs with the operand
/// roles reversed and the two estimates are averaged under the direction
/// swap.
pub fn estimate_flow(
    weights: &ModelWeights,
    img0: &Array4<f32>,
    img1: &Array4<f32>,
    timestep: &Array4<f32>,
    scales: &[f32; CASCADE_STAGE_COUNT],
    ensemble: bool,
) -> Result<FlowEstimate> {
    validate_image_pair(img0, img1)?;
    let (batch, _, height, width) = img0.dim();
    if timestep.shape() != [batch, 1, height, width] {
        return Err(FlowAlignError::ShapeMismatch(format!(
            "timestep plane has shape {:?}, expected {:?}",
            timestep.shape(),
            [batch, 1, height, width]
        )));
    }
    if scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(FlowAlignError::InvalidConfig(format!(
            "stage scales must be positive and finite, got {:?}",
            scales
        )));
    }

    let f0 = encode(&weights.encoder, img0);
    let f1 = encode(&weights.encoder, img1);
    let timestep_rev = timestep.mapv(|t| 1.0 - t);

    let mut state: Option<(Array4<f32>, Array4<f32>)> = None;
    for (stage, block) in weights.blocks.iter().enumerate() {
        let scale = scales[stage];
        state = Some(match state.take() {
            None => {
                let forward = run_block(
                    block,
                    &stage_context(img0, img1, &f0, &f1, timestep, None),
                    None,
                    scale,
                );
                if ensemble {
                    let reverse = run_block(
                        block,
                        &stage_context(img1, img0, &f1, &f0, &timestep_rev, None),
                        None,
                        scale,
                    );
                    (
                        average_swapped(&forward.flow, &reverse.flow),
                        average_negated(&forward.mask, &reverse.mask),
                    )
                } else {
                    (forward.flow, forward.mask)
                }
            }
            Some((prior_flow, prior_mask)) => {
                let warped0 = warp(&f0, flow_forward(&prior_flow));
                let warped1 = warp(&f1, flow_backward(&prior_flow));
                let forward = run_block(
                    block,
                    &stage_context(img0, img1, &warped0, &warped1, timestep, Some(&prior_mask)),
                    Some(&prior_flow),
                    scale,
                );
                if ensemble {
                    let negated_mask = prior_mask.mapv(|v| -v);
                    let swapped_prior = swap_flow_halves(&prior_flow);
                    let reverse = run_block(
                        block,
                        &stage_context(
                            img1,
                            img0,
                            &warped1,
                            &warped0,
                            &timestep_rev,
                            Some(&negated_mask),
                        ),
                        Some(&swapped_prior),
                        scale,
                    );
                    let delta = average_swapped(&forward.flow, &reverse.flow);
                    let mask = average_negated(&forward.mask, &reverse.mask);
                    (prior_flow + delta, mask)
                } else {
                    (prior_flow + forward.flow, forward.mask)
                }
            }
        });
        debug!(stage, scale = scale as f64, "cascade stage complete");
    }

    let (flow, mask) = state.expect("cascade ran at least one stage");
    Ok(FlowEstimate { flow, mask })
}

// Assembles one stage's input: images, features, timestep, and (past
// stage 0) the running mask. Direction is purely the argument order.
fn stage_context(
    img_a: &Array4<f32>,
    img_b: &Array4<f32>,
    feat_a: &Array4<f32>,
    feat_b: &Array4<f32>,
    timestep: &Array4<f32>,
    mask: Option<&Array4<f32>>,
) -> Array4<f32> {
    let mut parts: Vec<ArrayView4<f32>> = vec![
        img_a.view(),
        img_b.view(),
        feat_a.view(),
        feat_b.view(),
        timestep.view(),
    ];
    if let Some(mask) = mask {
        parts.push(mask.view());
    }
    concat_channels(&parts)
}

// Ensemble combine: own estimate averaged with the reversed-role estimate
// brought back into own orientation by the half swap.
fn average_swapped(own: &Array4<f32>, reversed: &Array4<f32>) -> Array4<f32> {
    let mut combined = own + &swap_flow_halves(reversed);
    combined.mapv_inplace(|v| v * 0.5);
    combined
}

// Masks negate under the direction swap.
fn average_negated(own: &Array4<f32>, reversed: &Array4<f32>) -> Array4<f32> {
    let mut combined = own - reversed;
    combined.mapv_inplace(|v| v * 0.5);
    combined
}
