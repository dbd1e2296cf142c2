use std::path::Path;

use console::Style;
use flowalign_core::align::AlignmentConfig;

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    enabled: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            enabled: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

/// Prints the run banner before alignment starts.
pub fn print_align_summary(input: &Path, target: &Path, output: &Path, config: &AlignmentConfig) {
    let s = Styles::new();
    let title = "Flow Alignment";

    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.len())));
    println!();

    println!("  {:<14}{}", s.label.apply_to("Input"), s.path.apply_to(input.display()));
    println!("  {:<14}{}", s.label.apply_to("Target"), s.path.apply_to(target.display()));
    println!("  {:<14}{}", s.label.apply_to("Output"), s.path.apply_to(output.display()));
    println!();

    println!("  {:<14}{}", s.label.apply_to("Multiplier"), s.value.apply_to(config.multiplier));
    println!("  {:<14}{}", s.label.apply_to("Iterations"), s.value.apply_to(config.iterations));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Ensemble"),
        if config.ensemble {
            s.enabled.apply_to("enabled")
        } else {
            s.disabled.apply_to("disabled")
        }
    );
    if config.blur_strength > 0.0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Pre-blur"),
            s.value.apply_to(format!("sigma {}", config.blur_strength))
        );
    } else {
        println!("  {:<14}{}", s.label.apply_to("Pre-blur"), s.disabled.apply_to("disabled"));
    }
    println!();
}
