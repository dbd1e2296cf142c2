use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use flowalign_core::align::AlignmentConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the configuration to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Prints the default alignment configuration as TOML, ready to be edited
/// and passed back through `align --config`.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = AlignmentConfig::default();
    let text = toml::to_string_pretty(&config)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("Failed to write config to {}", path.display()))?;
            println!("Default config saved to {}", path.display());
        }
        None => print!("{}", text),
    }

    Ok(())
}
