use serde::{Deserialize, Serialize};

use crate::consts::{CASCADE_STAGE_COUNT, DEFAULT_MULTIPLIER};
use crate::error::{FlowAlignError, Result};

/// Parameters of one alignment run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Scale multiplier m; the cascade stages run at {8m, 4m, 2m, m}.
    /// Larger values reach bigger displacements, smaller values refine
    /// finer detail.
    #[serde(default = "default_multiplier")]
    pub multiplier: f32,
    /// Average every stage with its direction-swapped counterpart. Roughly
    /// doubles the work, cancels directional estimation bias.
    #[serde(default = "default_ensemble")]
    pub ensemble: bool,
    /// Number of compensation passes; each pass feeds its aligned output
    /// back in as the next input image.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Sigma of the 5×5 Gaussian pre-filter applied to both images before
    /// flow estimation; 0 disables it. The final warp always samples the
    /// unfiltered input.
    #[serde(default)]
    pub blur_strength: f32,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            multiplier: default_multiplier(),
            ensemble: default_ensemble(),
            iterations: default_iterations(),
            blur_strength: 0.0,
        }
    }
}

impl AlignmentConfig {
    /// Stage scale factors, coarse to fine.
    pub fn scale_list(&self) -> [f32; CASCADE_STAGE_COUNT] {
        let m = self.multiplier;
        [8.0 * m, 4.0 * m, 2.0 * m, m]
    }

    /// Fail-fast check of the caller contract.
    pub fn validate(&self) -> Result<()> {
        if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
            return Err(FlowAlignError::InvalidConfig(format!(
                "multiplier must be positive and finite, got {}",
                self.multiplier
            )));
        }
        if self.iterations == 0 {
            return Err(FlowAlignError::InvalidConfig(
                "iterations must be at least 1".into(),
            ));
        }
        if !self.blur_strength.is_finite() || self.blur_strength < 0.0 {
            return Err(FlowAlignError::InvalidConfig(format!(
                "blur_strength must be non-negative, got {}",
                self.blur_strength
            )));
        }
        Ok(())
    }
}

fn default_multiplier() -> f32 {
    DEFAULT_MULTIPLIER
}

fn default_ensemble() -> bool {
    true
}

fn default_iterations() -> usize {
    1
}
