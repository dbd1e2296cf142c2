use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use flowalign_core::align::{align_pair_with_progress, AlignmentConfig};
use flowalign_core::consts::SIZE_MULTIPLE;
use flowalign_core::flow::ModelWeights;
use flowalign_core::io::image_io::{load_image, save_image};
use flowalign_core::tensor::{crop_spatial, pad_to_multiple, validate_same_shape, Timestep};
use indicatif::{ProgressBar, ProgressStyle};

use crate::summary::print_align_summary;

#[derive(Args)]
pub struct AlignArgs {
    /// Image to align
    pub input: PathBuf,

    /// Target image to align against
    pub target: PathBuf,

    /// Weights file
    #[arg(short, long)]
    pub weights: PathBuf,

    /// Output file, PNG or TIFF by extension
    #[arg(short, long, default_value = "aligned.png")]
    pub output: PathBuf,

    /// Cascade scale multiplier; smaller values search further
    #[arg(long, default_value = "0.5")]
    pub multiplier: f32,

    /// Number of alignment passes
    #[arg(long, default_value = "1")]
    pub iterations: usize,

    /// Gaussian pre-filter sigma applied to the flow inputs, 0 disables
    #[arg(long, default_value = "0")]
    pub blur: f32,

    /// Temporal position of the estimate between input (0) and target (1)
    #[arg(long, default_value = "1")]
    pub timestep: f32,

    /// Disable bidirectional ensemble averaging
    #[arg(long)]
    pub no_ensemble: bool,

    /// TOML configuration file; replaces the individual alignment flags
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &AlignArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        }
        None => AlignmentConfig {
            multiplier: args.multiplier,
            ensemble: !args.no_ensemble,
            iterations: args.iterations,
            blur_strength: args.blur,
        },
    };
    config.validate()?;

    let weights = ModelWeights::load(&args.weights)
        .with_context(|| format!("Failed to load weights from {}", args.weights.display()))?;

    let input = load_image(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    let target = load_image(&args.target)
        .with_context(|| format!("Failed to load {}", args.target.display()))?;
    // Padding can round two different sizes to the same bucket, so the pair
    // is checked on the originals.
    validate_same_shape(&input, &target)?;

    print_align_summary(&args.input, &args.target, &args.output, &config);

    // The cascade halves resolution four times, so both images are
    // reflection-padded up to the next multiple of 16 and cropped back after.
    let (input_padded, (height, width)) = pad_to_multiple(&input, SIZE_MULTIPLE);
    let (target_padded, _) = pad_to_multiple(&target, SIZE_MULTIPLE);
    let (_, _, padded_height, padded_width) = input_padded.dim();
    if (padded_height, padded_width) != (height, width) {
        println!(
            "Padding {}x{} to {}x{} for the cascade",
            width, height, padded_width, padded_height
        );
    }

    let pb = ProgressBar::new(config.iterations as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Aligning [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    let output = align_pair_with_progress(
        &weights,
        &input_padded,
        &target_padded,
        &Timestep::Uniform(args.timestep),
        &config,
        |done| pb.set_position(done as u64),
    )?;
    pb.finish();

    let peak = output.flow.iter().fold(0.0f32, |acc, &v| acc.max(v.abs()));
    println!("Peak displacement: {:.2} px", peak);

    let aligned = crop_spatial(&output.aligned, height, width);
    save_image(&aligned, &args.output)?;
    println!("Saved to {}", args.output.display());

    Ok(())
}
