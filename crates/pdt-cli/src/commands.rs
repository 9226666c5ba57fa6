//! Subcommand implementations

use anyhow::{bail, Context, Result};
use chrono::Local;
use pdt_core::epochs::{END_TIME, EPOCH_NAME, START_TIME};
use pdt_core::{current_user, ensure_distinct_paths, ConversionConfig, PhysioContainer};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub fn convert(
    config_path: &Path,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    user: Option<String>,
) -> Result<()> {
    let mut config = ConversionConfig::from_file(config_path)
        .with_context(|| format!("loading configuration {}", config_path.display()))?;
    if let Some(input) = input {
        config.raw_data_source = input;
    }
    debug!(source = %config.raw_data_source.display(), fs = config.fs, "configuration loaded");

    let destination = output.unwrap_or_else(|| config.output_path());
    ensure_distinct_paths(&config.raw_data_source, &destination)?;

    let user = user.unwrap_or_else(current_user);
    let info = config.provenance(&Local::now(), &user);
    let container = config
        .run(info)
        .with_context(|| format!("converting {}", config.raw_data_source.display()))?;

    container
        .save(&destination)
        .with_context(|| format!("saving {}", destination.display()))?;

    println!("{}", destination.display());
    Ok(())
}

pub fn init(path: &Path, source: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to replace it)", path.display());
    }

    let config = ConversionConfig::ecg_eda_example(source);
    std::fs::write(path, config.to_json()? + "\n")
        .with_context(|| format!("writing {}", path.display()))?;

    info!(path = %path.display(), "wrote example configuration");
    Ok(())
}

pub fn inspect(file: &Path) -> Result<()> {
    let container = PhysioContainer::load(file)
        .with_context(|| format!("reading {}", file.display()))?;
    print!("{}", summary(&container));
    Ok(())
}

fn summary(container: &PhysioContainer) -> String {
    let mut out = String::new();
    let info = container.info();
    let _ = writeln!(out, "Source:  {}", info.raw_data_source);
    let user = match info.pdt_file_creation_user.as_str() {
        "" => "<unknown>",
        user => user,
    };
    let _ = writeln!(out, "Created: {} by {}", info.pdt_file_creation_date, user);
    for (key, value) in &info.extra {
        let _ = writeln!(out, "  {}: {}", key, value);
    }

    let signals = container.signals();
    let _ = writeln!(
        out,
        "Signals: {} channels, {} samples at {} Hz ({:.3} s)",
        signals.channel_count(),
        signals.samples_per_channel(),
        signals.fs(),
        signals.duration()
    );
    for (index, name) in signals.channel_names().iter().enumerate() {
        let unit = &signals.channel_units()[index];
        let description = &signals.channel_description()[index];
        let _ = write!(out, "  {} [{}] {}", name, unit, description);
        if let Some(stats) = signals.channel_stats(index).filter(|_| signals.samples_per_channel() > 0) {
            let _ = write!(out, "  mean={:.4} min={:.4} max={:.4}", stats.mean, stats.min, stats.max);
        }
        out.push('\n');
    }

    let labels = container.labels();
    let _ = writeln!(out, "Labels:  {} events", labels.len());
    for index in 0..labels.len() {
        if let Some(event) = labels.event(index) {
            let _ = writeln!(out, "  {:>10.3} s  {}", event.t, event.value);
        }
    }

    let epochs = container.epoch_data();
    let _ = writeln!(
        out,
        "Epochs:  {} rows, columns: {}",
        epochs.len(),
        epochs.column_names().join(", ")
    );
    for row in epochs.rows() {
        let field = |key: &str| row.get(key).map(|v| v.to_string()).unwrap_or_default();
        let _ = write!(
            out,
            "  {}  {}-{} s",
            field(EPOCH_NAME),
            field(START_TIME),
            field(END_TIME)
        );
        for (key, value) in row.fields() {
            if ![EPOCH_NAME, START_TIME, END_TIME].contains(&key.as_str()) {
                let _ = write!(out, "  {}={}", key, value);
            }
        }
        out.push('\n');
    }

    out
}
