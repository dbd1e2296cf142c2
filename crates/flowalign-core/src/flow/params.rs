use std::path::Path;

use ndarray::{Array1, Array4};

use crate::consts::{
    BLOCK_PROJECT_CHANNELS, CASCADE_STAGE_COUNT, COLOR_CHANNEL_COUNT, ENCODER_WIDTH,
    FEATURE_CHANNEL_COUNT, RESIDUAL_UNIT_COUNT, STAGE_INPUT_CHANNELS, STAGE_WIDTHS,
};
use crate::error::{FlowAlignError, Result};
use crate::io::weights::WeightsStore;

/// Parameters of one convolution layer; weight shape (out, in, kh, kw).
#[derive(Clone, Debug)]
pub struct ConvParams {
    pub weight: Array4<f32>,
    pub bias: Array1<f32>,
}

/// Parameters of one transposed-convolution layer; weight shape
/// (in, out, kh, kw).
#[derive(Clone, Debug)]
pub struct DeconvParams {
    pub weight: Array4<f32>,
    pub bias: Array1<f32>,
}

/// One residual refinement unit: a same-width 3×3 conv plus a learned
/// per-channel gain on the residual branch.
#[derive(Clone, Debug)]
pub struct ResidualParams {
    pub conv: ConvParams,
    pub gain: Array1<f32>,
}

/// Feature encoder layers: stride-2 downsample, two stride-1 convs,
/// stride-2 transposed upsample back to full resolution.
#[derive(Clone, Debug)]
pub struct EncoderParams {
    pub down: ConvParams,
    pub mid0: ConvParams,
    pub mid1: ConvParams,
    pub up: DeconvParams,
}

/// One flow-estimation block: two stride-2 reduction convs, the residual
/// refinement stack, and the transposed projection feeding the pixel
/// shuffle.
#[derive(Clone, Debug)]
pub struct BlockParams {
    pub reduce: ConvParams,
    pub expand: ConvParams,
    pub refine: Vec<ResidualParams>,
    pub project: DeconvParams,
}

/// The complete learned-parameter bundle. Immutable once assembled; every
/// estimator call borrows it, so independent bundles can serve concurrent
/// calls.
#[derive(Clone, Debug)]
pub struct ModelWeights {
    pub encoder: EncoderParams,
    pub blocks: Vec<BlockParams>,
}

impl ModelWeights {
    /// Load and assemble a bundle from a weights file.
    pub fn load(path: &Path) -> Result<Self> {
        let store = WeightsStore::open(path)?;
        Self::from_store(&store)
    }

    /// Assemble the typed bundle, validating every tensor's shape against
    /// the architecture constants.
    pub fn from_store(store: &WeightsStore) -> Result<Self> {
        let encoder = EncoderParams {
            down: load_conv(store, "encoder.down", ENCODER_WIDTH, COLOR_CHANNEL_COUNT, 3)?,
            mid0: load_conv(store, "encoder.mid0", ENCODER_WIDTH, ENCODER_WIDTH, 3)?,
            mid1: load_conv(store, "encoder.mid1", ENCODER_WIDTH, ENCODER_WIDTH, 3)?,
            up: load_deconv(store, "encoder.up", ENCODER_WIDTH, FEATURE_CHANNEL_COUNT, 4)?,
        };

        let mut blocks = Vec::with_capacity(CASCADE_STAGE_COUNT);
        for stage in 0..CASCADE_STAGE_COUNT {
            let width = STAGE_WIDTHS[stage];
            let prefix = format!("block{stage}");
            let refine = (0..RESIDUAL_UNIT_COUNT)
                .map(|unit| load_residual(store, &format!("{prefix}.res{unit}"), width))
                .collect::<Result<Vec<_>>>()?;
            blocks.push(BlockParams {
                reduce: load_conv(
                    store,
                    &format!("{prefix}.reduce"),
                    width / 2,
                    STAGE_INPUT_CHANNELS[stage],
                    3,
                )?,
                expand: load_conv(store, &format!("{prefix}.expand"), width, width / 2, 3)?,
                refine,
                project: load_deconv(
                    store,
                    &format!("{prefix}.project"),
                    width,
                    BLOCK_PROJECT_CHANNELS,
                    4,
                )?,
            });
        }

        Ok(Self { encoder, blocks })
    }

    /// Flatten the bundle back into a named-tensor store.
    pub fn to_store(&self) -> WeightsStore {
        let mut store = WeightsStore::new();
        store_conv(&mut store, "encoder.down", &self.encoder.down);
        store_conv(&mut store, "encoder.mid0", &self.encoder.mid0);
        store_conv(&mut store, "encoder.mid1", &self.encoder.mid1);
        store_deconv(&mut store, "encoder.up", &self.encoder.up);

        for (stage, block) in self.blocks.iter().enumerate() {
            let prefix = format!("block{stage}");
            store_conv(&mut store, &format!("{prefix}.reduce"), &block.reduce);
            store_conv(&mut store, &format!("{prefix}.expand"), &block.expand);
            for (unit, residual) in block.refine.iter().enumerate() {
                let name = format!("{prefix}.res{unit}");
                store_conv(&mut store, &format!("{name}.conv"), &residual.conv);
                store.insert(format!("{name}.gain"), residual.gain.clone().into_dyn());
            }
            store_deconv(&mut store, &format!("{prefix}.project"), &block.project);
        }
        store
    }

    /// Write the bundle to a weights file.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.to_store().save(path)
    }

    /// Deterministic untrained initialization: uniform ±1/√fan_in weights
    /// and biases, unit gains. Useful for shape checks and smoke runs when
    /// no trained parameter file is at hand.
    pub fn seeded(seed: u64) -> Self {
        let mut rng = SeededRng(seed);
        let encoder = EncoderParams {
            down: seeded_conv(&mut rng, ENCODER_WIDTH, COLOR_CHANNEL_COUNT, 3),
            mid0: seeded_conv(&mut rng, ENCODER_WIDTH, ENCODER_WIDTH, 3),
            mid1: seeded_conv(&mut rng, ENCODER_WIDTH, ENCODER_WIDTH, 3),
            up: seeded_deconv(&mut rng, ENCODER_WIDTH, FEATURE_CHANNEL_COUNT, 4),
        };
        let blocks = (0..CASCADE_STAGE_COUNT)
            .map(|stage| {
                let width = STAGE_WIDTHS[stage];
                BlockParams {
                    reduce: seeded_conv(&mut rng, width / 2, STAGE_INPUT_CHANNELS[stage], 3),
                    expand: seeded_conv(&mut rng, width, width / 2, 3),
                    refine: (0..RESIDUAL_UNIT_COUNT)
                        .map(|_| ResidualParams {
                            conv: seeded_conv(&mut rng, width, width, 3),
                            gain: Array1::ones(width),
                        })
                        .collect(),
                    project: seeded_deconv(&mut rng, width, BLOCK_PROJECT_CHANNELS, 4),
                }
            })
            .collect();
        Self { encoder, blocks }
    }

    /// Total scalar parameter count.
    pub fn parameter_count(&self) -> usize {
        let conv = |p: &ConvParams| p.weight.len() + p.bias.len();
        let deconv = |p: &DeconvParams| p.weight.len() + p.bias.len();
        let mut count = conv(&self.encoder.down)
            + conv(&self.encoder.mid0)
            + conv(&self.encoder.mid1)
            + deconv(&self.encoder.up);
        for block in &self.blocks {
            count += conv(&block.reduce) + conv(&block.expand) + deconv(&block.project);
            for residual in &block.refine {
                count += conv(&residual.conv) + residual.gain.len();
            }
        }
        count
    }
}

fn load_conv(
    store: &WeightsStore,
    name: &str,
    out_c: usize,
    in_c: usize,
    kernel: usize,
) -> Result<ConvParams> {
    let weight = store.array4(&format!("{name}.weight"))?;
    expect_shape(&format!("{name}.weight"), weight.shape(), &[out_c, in_c, kernel, kernel])?;
    let bias = store.array1(&format!("{name}.bias"))?;
    expect_shape(&format!("{name}.bias"), bias.shape(), &[out_c])?;
    Ok(ConvParams { weight, bias })
}

fn load_deconv(
    store: &WeightsStore,
    name: &str,
    in_c: usize,
    out_c: usize,
    kernel: usize,
) -> Result<DeconvParams> {
    let weight = store.array4(&format!("{name}.weight"))?;
    expect_shape(&format!("{name}.weight"), weight.shape(), &[in_c, out_c, kernel, kernel])?;
    let bias = store.array1(&format!("{name}.bias"))?;
    expect_shape(&format!("{name}.bias"), bias.shape(), &[out_c])?;
    Ok(DeconvParams { weight, bias })
}

fn load_residual(store: &WeightsStore, name: &str, width: usize) -> Result<ResidualParams> {
    let conv = load_conv(store, &format!("{name}.conv"), width, width, 3)?;
    let gain = store.array1(&format!("{name}.gain"))?;
    expect_shape(&format!("{name}.gain"), gain.shape(), &[width])?;
    Ok(ResidualParams { conv, gain })
}

fn expect_shape(name: &str, actual: &[usize], expected: &[usize]) -> Result<()> {
    if actual != expected {
        return Err(FlowAlignError::InvalidWeights(format!(
            "tensor '{name}' has shape {actual:?}, expected {expected:?}"
        )));
    }
    Ok(())
}

fn store_conv(store: &mut WeightsStore, name: &str, p: &ConvParams) {
    store.insert(format!("{name}.weight"), p.weight.clone().into_dyn());
    store.insert(format!("{name}.bias"), p.bias.clone().into_dyn());
}

fn store_deconv(store: &mut WeightsStore, name: &str, p: &DeconvParams) {
    store.insert(format!("{name}.weight"), p.weight.clone().into_dyn());
    store.insert(format!("{name}.bias"), p.bias.clone().into_dyn());
}

fn seeded_conv(rng: &mut SeededRng, out_c: usize, in_c: usize, kernel: usize) -> ConvParams {
    let bound = 1.0 / ((in_c * kernel * kernel) as f32).sqrt();
    let weight = Array4::from_shape_simple_fn((out_c, in_c, kernel, kernel), || {
        rng.uniform(bound)
    });
    let bias = Array1::from_shape_simple_fn(out_c, || rng.uniform(bound));
    ConvParams { weight, bias }
}

fn seeded_deconv(rng: &mut SeededRng, in_c: usize, out_c: usize, kernel: usize) -> DeconvParams {
    let bound = 1.0 / ((in_c * kernel * kernel) as f32).sqrt();
    let weight = Array4::from_shape_simple_fn((in_c, out_c, kernel, kernel), || {
        rng.uniform(bound)
    });
    let bias = Array1::from_shape_simple_fn(out_c, || rng.uniform(bound));
    DeconvParams { weight, bias }
}

// SplitMix64; good enough spread for init values, no external entropy.
struct SeededRng(u64);

impl SeededRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn uniform(&mut self, bound: f32) -> f32 {
        let unit = (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32;
        (unit * 2.0 - 1.0) * bound
    }
}
