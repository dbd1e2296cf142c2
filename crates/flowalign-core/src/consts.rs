/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Number of channels in a color image (R, G, B).
pub const COLOR_CHANNEL_COUNT: usize = 3;

/// Number of channels produced by the feature encoder.
pub const FEATURE_CHANNEL_COUNT: usize = 8;

/// Number of channels in a bidirectional flow field (two 2-channel halves).
pub const FLOW_CHANNEL_COUNT: usize = 4;

/// Number of refinement stages in the flow cascade.
pub const CASCADE_STAGE_COUNT: usize = 4;

/// Working width (channel count) of each cascade stage, coarse to fine.
pub const STAGE_WIDTHS: [usize; CASCADE_STAGE_COUNT] = [192, 128, 96, 64];

/// Input channels of each stage's reduction convolution: 3+3 image,
/// 8+8 feature and 1 timestep channels at stage 0; later stages add the
/// 1-channel mask and the 4-channel prior flow.
pub const STAGE_INPUT_CHANNELS: [usize; CASCADE_STAGE_COUNT] = [23, 28, 28, 28];

/// Number of residual refinement units stacked inside each flow block.
pub const RESIDUAL_UNIT_COUNT: usize = 8;

/// Channel width of the feature encoder's intermediate layers.
pub const ENCODER_WIDTH: usize = 32;

/// Channels emitted by a flow block's transposed convolution, before the
/// factor-2 pixel shuffle folds them to [`BLOCK_OUTPUT_CHANNELS`].
pub const BLOCK_PROJECT_CHANNELS: usize = 24;

/// Channels of a flow block's raw output: 4 flow + 1 mask + 1 unused.
pub const BLOCK_OUTPUT_CHANNELS: usize = 6;

/// Negative slope of the leaky rectifier used throughout the estimator.
pub const LEAKY_SLOPE: f32 = 0.2;

/// Radius of the fixed Gaussian pre-filter kernel (5 taps).
pub const BLUR_KERNEL_RADIUS: usize = 2;

/// Input height and width must divide evenly by this. It is the coarsest
/// total stride the cascade applies at multiplier 1 (scale 8 downsample
/// times the block's internal stride-4 reduction, restored in two steps).
pub const SIZE_MULTIPLE: usize = 16;

/// Default scale multiplier; the stage scales are {8m, 4m, 2m, m}.
pub const DEFAULT_MULTIPLIER: f32 = 0.5;
