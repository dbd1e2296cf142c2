use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use flowalign_core::io::WeightsStore;

#[derive(Args)]
pub struct InfoArgs {
    /// Weights file to inspect
    #[arg(short, long)]
    pub weights: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let store = WeightsStore::open(&args.weights)
        .with_context(|| format!("Failed to read {}", args.weights.display()))?;

    let data_bytes = store.total_parameters() * std::mem::size_of::<f32>();
    println!("File:        {}", args.weights.display());
    println!("Tensors:     {}", store.len());
    println!("Parameters:  {}", store.total_parameters());
    println!("Data size:   {:.1} MiB", data_bytes as f64 / (1024.0 * 1024.0));

    println!();
    for (name, tensor) in store.iter() {
        println!("{:<24} {:?}", name, tensor.shape());
    }

    Ok(())
}
