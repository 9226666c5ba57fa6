//! Basic usage of PDT-Core
//!
//! Writes a short synthetic ECG/EDA recording, converts it with the example
//! configuration and reads the container back.

use chrono::Local;
use pdt_core::{current_user, ConversionConfig, PdtResult, PhysioContainer};

fn main() -> PdtResult<()> {
    println!("=== PDT-Core Basic Usage ===\n");

    let dir = std::env::temp_dir().join("pdt-basic-usage");
    std::fs::create_dir_all(&dir).map_err(|e| pdt_core::PdtError::io(&dir, e))?;
    let raw = dir.join("subject01.txt");

    // 300 s at 1 kHz would be large; five minutes at 10 Hz is enough to show the layout
    let rows: String = (0..3000)
        .map(|i| {
            let t = i as f64 / 10.0;
            format!("{:.4}\t{:.4}\n", (t * 7.5).sin(), 2.0 + 0.01 * t)
        })
        .collect();
    std::fs::write(&raw, rows).map_err(|e| pdt_core::PdtError::io(&raw, e))?;

    let mut config = ConversionConfig::ecg_eda_example(&raw);
    config.fs = 10.0;

    let info = config.provenance(&Local::now(), &current_user());
    let output = config.convert(info)?;
    println!("   ✓ Wrote {}", output.display());

    let container = PhysioContainer::load(&output)?;
    let signals = container.signals();
    println!(
        "   ✓ {} channels x {} samples at {} Hz",
        signals.channel_count(),
        signals.samples_per_channel(),
        signals.fs()
    );
    println!("   ✓ {} labels, {} epochs", container.labels().len(), container.epoch_data().len());

    println!("\n=== Done ===");
    Ok(())
}
