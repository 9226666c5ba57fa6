//! Sampled multi-channel waveform group (`data.signals`)

use crate::error::{PdtError, PdtResult};
use crate::validation_error;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// One named channel handed to [`build_signal_group`]
#[derive(Debug, Clone, PartialEq)]
pub struct SignalColumn {
    pub name: String,
    pub values: Vec<f64>,
    pub unit: String,
    pub description: String,
}

impl SignalColumn {
    pub fn new(
        name: impl Into<String>,
        values: Vec<f64>,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            values,
            unit: unit.into(),
            description: description.into(),
        }
    }
}

/// Channels sharing one sampling frequency.
///
/// The four per-channel sequences are parallel: index `i` in each refers to
/// the same channel. Instances only come out of [`build_signal_group`] or a
/// validated deserialization, so the invariant holds for every value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SignalGroupFields")]
pub struct SignalGroup {
    channels: Vec<Vec<f64>>,
    channel_names: Vec<String>,
    channel_units: Vec<String>,
    channel_description: Vec<String>,
    fs: f64,
}

/// Unchecked wire form of [`SignalGroup`]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignalGroupFields {
    channels: Vec<Vec<f64>>,
    channel_names: Vec<String>,
    channel_units: Vec<String>,
    channel_description: Vec<String>,
    fs: f64,
}

impl TryFrom<SignalGroupFields> for SignalGroup {
    type Error = PdtError;

    fn try_from(fields: SignalGroupFields) -> PdtResult<Self> {
        let group = SignalGroup {
            channels: fields.channels,
            channel_names: fields.channel_names,
            channel_units: fields.channel_units,
            channel_description: fields.channel_description,
            fs: fields.fs,
        };
        group.validate()?;
        Ok(group)
    }
}

/// Build the signal group from ordered channels and a shared sampling rate
pub fn build_signal_group(columns: Vec<SignalColumn>, fs: f64) -> PdtResult<SignalGroup> {
    if !fs.is_finite() || fs <= 0.0 {
        return Err(validation_error!("sampling frequency must be positive, got {}", fs));
    }
    if columns.is_empty() {
        return Err(validation_error!("signal group needs at least one channel"));
    }

    let mut group = SignalGroup {
        channels: Vec::with_capacity(columns.len()),
        channel_names: Vec::with_capacity(columns.len()),
        channel_units: Vec::with_capacity(columns.len()),
        channel_description: Vec::with_capacity(columns.len()),
        fs,
    };

    for column in columns {
        group.channels.push(column.values);
        group.channel_names.push(column.name);
        group.channel_units.push(column.unit);
        group.channel_description.push(column.description);
    }

    group.validate()?;

    debug!(
        channels = group.channel_count(),
        samples = group.samples_per_channel(),
        fs,
        "built signal group"
    );
    Ok(group)
}

impl SignalGroup {
    /// Check the parallel-sequence and equal-length invariants
    pub fn validate(&self) -> PdtResult<()> {
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return Err(validation_error!("sampling frequency must be positive, got {}", self.fs));
        }

        let count = self.channels.len();
        if count == 0 {
            return Err(validation_error!("signal group needs at least one channel"));
        }
        if self.channel_names.len() != count
            || self.channel_units.len() != count
            || self.channel_description.len() != count
        {
            return Err(validation_error!(
                "signal group has {} channels but {} names, {} units and {} descriptions",
                count,
                self.channel_names.len(),
                self.channel_units.len(),
                self.channel_description.len()
            ));
        }

        let mut seen = HashSet::with_capacity(count);
        for name in &self.channel_names {
            if !seen.insert(name.as_str()) {
                return Err(validation_error!("duplicate signal channel name '{}'", name));
            }
        }

        let expected = self.channels[0].len();
        for (name, values) in self.channel_names.iter().zip(&self.channels) {
            if values.len() != expected {
                return Err(validation_error!(
                    "channel '{}' has {} samples, expected {}",
                    name,
                    values.len(),
                    expected
                ));
            }
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(validation_error!(
                    "channel '{}' has a non-finite sample at index {}",
                    name,
                    index
                ));
            }
        }

        Ok(())
    }

    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    pub fn channel_units(&self) -> &[String] {
        &self.channel_units
    }

    pub fn channel_description(&self) -> &[String] {
        &self.channel_description
    }

    /// Sampling frequency in Hz
    pub fn fs(&self) -> f64 {
        self.fs
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Get number of samples per channel
    pub fn samples_per_channel(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Get recording duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples_per_channel() as f64 / self.fs
    }

    /// Look up a channel's samples by name
    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channel_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.channels[i].as_slice())
    }

    /// Calculate basic statistics for a channel
    pub fn channel_stats(&self, channel_index: usize) -> Option<ChannelStats> {
        self.channels
            .get(channel_index)
            .map(|data| ChannelStats::calculate(data))
    }
}

/// Basic statistics for a signal channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub peak_to_peak: f64,
}

impl ChannelStats {
    pub fn calculate(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self {
                mean: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
            };
        }

        let sum: f64 = data.iter().sum();
        let mean = sum / data.len() as f64;

        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            mean,
            min,
            max,
            peak_to_peak: max - min,
        }
    }
}
