use ndarray::Array4;
use tracing::{debug, info};

use crate::align::config::AlignmentConfig;
use crate::error::{FlowAlignError, Result};
use crate::flow::cascade::estimate_flow;
use crate::flow::params::ModelWeights;
use crate::ops::{gaussian_blur, warp};
use crate::tensor::{clamp_unit, flow_forward, validate_image_pair, Timestep};

/// Output of one compensation pass, including the intermediates a caller
/// reuses across iterations.
#[derive(Debug)]
pub struct AlignmentPass {
    /// Input image warped by the compensated flow, clamped to [0, 1].
    pub aligned: Array4<f32>,
    /// Cross flow minus self flow.
    pub compensated_flow: Array4<f32>,
    /// Zero-motion baseline of the target; constant across passes on the
    /// same target.
    pub self_flow: Array4<f32>,
    /// Pre-blurred target, present when the blur pre-filter is active.
    pub blurred_target: Option<Array4<f32>>,
}

/// Final result of [`align_pair`].
#[derive(Debug)]
pub struct AlignmentOutput {
    /// Aligned input image, clamped to [0, 1].
    pub aligned: Array4<f32>,
    /// Compensated flow of the last pass.
    pub flow: Array4<f32>,
}

/// One bias-compensated alignment pass:
/// 1. Optionally pre-blur both images (a prior pass's blurred target is
///    reused when supplied).
/// 2. Estimate the cross flow, input → target.
/// 3. Estimate the self flow, target → target, unless a prior pass's value
///    is supplied. With identical operands the estimator reports the
///    displacement it hallucinates at zero motion.
/// 4. Subtract the self flow from the cross flow, full field.
/// 5. Warp the unfiltered input by the forward half of the result; clamp
///    into [0, 1].
pub fn compensate_once(
    weights: &ModelWeights,
    input: &Array4<f32>,
    target: &Array4<f32>,
    timestep: &Array4<f32>,
    config: &AlignmentConfig,
    prior_self_flow: Option<Array4<f32>>,
    blurred_target: Option<Array4<f32>>,
) -> Result<AlignmentPass> {
    validate_image_pair(input, target)?;
    config.validate()?;
    let (batch, _, height, width) = input.dim();
    if timestep.shape() != [batch, 1, height, width] {
        return Err(FlowAlignError::ShapeMismatch(format!(
            "timestep plane has shape {:?}, expected {:?}",
            timestep.shape(),
            [batch, 1, height, width]
        )));
    }
    let scales = config.scale_list();

    let (blurred_input, blurred_target) = if config.blur_strength > 0.0 {
        let input_blur = gaussian_blur(input, config.blur_strength);
        let target_blur =
            blurred_target.unwrap_or_else(|| gaussian_blur(target, config.blur_strength));
        (Some(input_blur), Some(target_blur))
    } else {
        (None, None)
    };
    let flow_input = blurred_input.as_ref().unwrap_or(input);
    let flow_target = blurred_target.as_ref().unwrap_or(target);

    let (cross, self_flow) = match prior_self_flow {
        Some(prior) => {
            let cross = estimate_flow(
                weights,
                flow_input,
                flow_target,
                timestep,
                &scales,
                config.ensemble,
            )?;
            (cross, prior)
        }
        None => {
            // The two cascades are independent; run them side by side.
            let (cross, own) = rayon::join(
                || {
                    estimate_flow(
                        weights,
                        flow_input,
                        flow_target,
                        timestep,
                        &scales,
                        config.ensemble,
                    )
                },
                || {
                    estimate_flow(
                        weights,
                        flow_target,
                        flow_target,
                        timestep,
                        &scales,
                        config.ensemble,
                    )
                },
            );
            (cross?, own?.flow)
        }
    };

    let compensated_flow = &cross.flow - &self_flow;
    let mut aligned = warp(input, flow_forward(&compensated_flow));
    clamp_unit(&mut aligned);

    Ok(AlignmentPass {
        aligned,
        compensated_flow,
        self_flow,
        blurred_target,
    })
}

/// Aligns `input` onto `target`: runs [`compensate_once`] the configured
/// number of times, feeding each pass's aligned output back in as the next
/// input while reusing the target's self flow and pre-blurred form.
pub fn align_pair(
    weights: &ModelWeights,
    input: &Array4<f32>,
    target: &Array4<f32>,
    timestep: &Timestep,
    config: &AlignmentConfig,
) -> Result<AlignmentOutput> {
    align_pair_with_progress(weights, input, target, timestep, config, |_| {})
}

/// [`align_pair`] with progress reporting: `on_pass_done` is called with
/// the completed pass count after each pass, for UI updates.
pub fn align_pair_with_progress<F>(
    weights: &ModelWeights,
    input: &Array4<f32>,
    target: &Array4<f32>,
    timestep: &Timestep,
    config: &AlignmentConfig,
    mut on_pass_done: F,
) -> Result<AlignmentOutput>
where
    F: FnMut(usize),
{
    validate_image_pair(input, target)?;
    config.validate()?;
    let (batch, _, height, width) = input.dim();
    let timestep_plane = timestep.to_plane(batch, height, width)?;

    info!(
        batch,
        height,
        width,
        iterations = config.iterations,
        ensemble = config.ensemble,
        multiplier = config.multiplier as f64,
        "Starting alignment"
    );

    let mut current = input.clone();
    let mut flow: Option<Array4<f32>> = None;
    let mut self_flow: Option<Array4<f32>> = None;
    let mut blurred_target: Option<Array4<f32>> = None;

    for iteration in 0..config.iterations {
        let pass = compensate_once(
            weights,
            &current,
            target,
            &timestep_plane,
            config,
            self_flow.take(),
            blurred_target.take(),
        )?;
        debug!(
            iteration = iteration + 1,
            mean_displacement = mean_abs(&pass.compensated_flow),
            "alignment pass complete"
        );
        current = pass.aligned;
        flow = Some(pass.compensated_flow);
        self_flow = Some(pass.self_flow);
        blurred_target = pass.blurred_target;
        on_pass_done(iteration + 1);
    }

    Ok(AlignmentOutput {
        aligned: current,
        flow: flow.expect("iterations is validated to be at least 1"),
    })
}

// ---- Helpers ----

fn mean_abs(flow: &Array4<f32>) -> f64 {
    let len = flow.len().max(1);
    flow.iter().map(|v| v.abs() as f64).sum::<f64>() / len as f64
}
