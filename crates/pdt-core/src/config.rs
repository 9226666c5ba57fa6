//! Conversion configuration
//!
//! One `ConversionConfig` describes one recording: where the raw samples
//! live, how to name the columns, and the hand-authored labels and epochs.

use crate::container::{
    assemble, ensure_distinct_paths, output_path_for, PhysioContainer, DEFAULT_EXTENSION,
};
use crate::epochs::{build_epoch_table, EpochRow};
use crate::error::{PdtError, PdtResult};
use crate::labels::{build_label_group, sort_label_events, LabelEvent};
use crate::provenance::ProvenanceInfo;
use crate::raw::load_raw_samples;
use crate::signals::build_signal_group;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name, unit and description for one raw column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub description: String,
}

impl ChannelSpec {
    pub fn new(name: &str, unit: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionConfig {
    /// Raw sample file; relative paths are resolved against the config file
    pub raw_data_source: PathBuf,
    /// Column separator of the raw file
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Sampling frequency (Hz) shared by all channels
    pub fs: f64,
    /// One entry per raw column, in file order
    pub channels: Vec<ChannelSpec>,
    #[serde(default)]
    pub labels: Vec<LabelEvent>,
    #[serde(default)]
    pub epochs: Vec<EpochRow>,
    /// Sort labels by timestamp before building the label group
    #[serde(default = "default_sort_labels")]
    pub sort_labels: bool,
    #[serde(default = "default_extension")]
    pub output_extension: String,
}

fn default_delimiter() -> char {
    '\t'
}

fn default_sort_labels() -> bool {
    true
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl ConversionConfig {
    /// ECG/EDA recording at 1 kHz with a baseline, two task epochs and a recovery epoch
    pub fn ecg_eda_example(raw_data_source: impl Into<PathBuf>) -> Self {
        ConversionConfig {
            raw_data_source: raw_data_source.into(),
            delimiter: default_delimiter(),
            fs: 1000.0,
            channels: vec![
                ChannelSpec::new("ECG", "mV", "Electrocardiogram"),
                ChannelSpec::new("EDA", "µS", "Electrodermal activity"),
            ],
            labels: vec![
                LabelEvent::new(30.0, "Start Baseline"),
                LabelEvent::new(60.0, "End Baseline"),
                LabelEvent::new(70.0, "Participant ready"),
            ],
            epochs: vec![
                EpochRow::new("Baseline", 30.0, 60.0).with("condition", "Rest").with("group", 1.0),
                EpochRow::new("Task 1", 75.0, 135.0).with("condition", "Neutral").with("group", 1.0),
                EpochRow::new("Task 2", 150.0, 210.0).with("condition", "Stress").with("group", 1.0),
                EpochRow::new("Recovery", 225.0, 285.0).with("condition", "Rest").with("group", 1.0),
            ],
            sort_labels: default_sort_labels(),
            output_extension: default_extension(),
        }
    }

    /// Validate the parts of the configuration that do not need the raw file
    pub fn validate(&self) -> PdtResult<()> {
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return Err(PdtError::Configuration {
                message: format!("Sampling frequency must be positive, got {}", self.fs),
            });
        }

        if self.channels.is_empty() {
            return Err(PdtError::Configuration {
                message: "At least one channel must be configured".to_string(),
            });
        }

        let mut names = HashSet::new();
        for channel in &self.channels {
            if !names.insert(channel.name.as_str()) {
                return Err(PdtError::Configuration {
                    message: format!("Channel '{}' is configured twice", channel.name),
                });
            }
        }

        self.delimiter_byte()?;

        if self.output_extension.is_empty()
            || self.output_extension.contains(['/', '\\'])
        {
            return Err(PdtError::Configuration {
                message: format!("Invalid output extension '{}'", self.output_extension),
            });
        }

        Ok(())
    }

    /// Delimiter as the single byte the reader expects
    pub fn delimiter_byte(&self) -> PdtResult<u8> {
        match self.delimiter {
            '\n' | '\r' | '"' => {}
            c if c.is_ascii() => return Ok(c as u8),
            _ => {}
        }
        Err(PdtError::Configuration {
            message: format!("Delimiter {:?} must be a single ASCII character", self.delimiter),
        })
    }

    /// Default destination: the source path with the output extension
    pub fn output_path(&self) -> PathBuf {
        output_path_for(&self.raw_data_source, &self.output_extension)
    }

    /// Provenance record for a run of this configuration
    pub fn provenance<Tz>(&self, created_at: &DateTime<Tz>, user: &str) -> ProvenanceInfo
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        ProvenanceInfo::new(self.raw_data_source.display().to_string(), created_at, user)
    }

    /// Load, build and assemble the container without writing it
    pub fn run(&self, info: ProvenanceInfo) -> PdtResult<PhysioContainer> {
        self.validate()?;

        let raw = load_raw_samples(&self.raw_data_source, self.delimiter_byte()?, self.channels.len())?;
        let signals = build_signal_group(raw.name_columns(&self.channels)?, self.fs)?;

        let mut events = self.labels.clone();
        if self.sort_labels {
            sort_label_events(&mut events);
        }
        let labels = build_label_group(events)?;
        let epochs = build_epoch_table(self.epochs.clone())?;

        Ok(assemble(signals, labels, epochs, info))
    }

    /// Run the conversion and save next to the source file.
    ///
    /// Fails with a configuration error, before reading or writing anything,
    /// when the destination is the raw data source itself.
    pub fn convert(&self, info: ProvenanceInfo) -> PdtResult<PathBuf> {
        let destination = self.output_path();
        ensure_distinct_paths(&self.raw_data_source, &destination)?;
        let container = self.run(info)?;
        container.save(&destination)?;
        info!(
            source = %self.raw_data_source.display(),
            destination = %destination.display(),
            "conversion finished"
        );
        Ok(destination)
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> PdtResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PdtError::Configuration {
            message: format!("Failed to serialize configuration: {}", e),
        })
    }

    /// Import configuration from JSON
    pub fn from_json(json: &str) -> PdtResult<Self> {
        serde_json::from_str(json).map_err(|e| PdtError::Configuration {
            message: format!("Failed to deserialize configuration: {}", e),
        })
    }

    /// Read a configuration file, resolving a relative raw data path
    /// against the file's directory
    pub fn from_file(path: &Path) -> PdtResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| PdtError::io(path, e))?;
        let mut config = Self::from_json(&json)?;

        if config.raw_data_source.is_relative() {
            if let Some(dir) = path.parent() {
                config.raw_data_source = dir.join(&config.raw_data_source);
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::Utc;

    #[test]
    fn test_example_config() {
        let config = ConversionConfig::ecg_eda_example("rec/subject01.txt");
        assert!(config.validate().is_ok());
        assert_eq!(config.fs, 1000.0);
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.labels.len(), 3);
        assert_eq!(config.epochs.len(), 4);
        assert_eq!(config.output_path(), PathBuf::from("rec/subject01.pdt"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = ConversionConfig::ecg_eda_example("raw.txt");

        config.fs = 0.0;
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Configuration);
        config.fs = 1000.0;

        config.channels[1].name = "ECG".to_string();
        assert!(config.validate().is_err());
        config.channels[1].name = "EDA".to_string();

        config.delimiter = 'µ';
        assert!(config.validate().is_err());
        config.delimiter = '\n';
        assert!(config.validate().is_err());
        config.delimiter = ',';
        assert_eq!(config.delimiter_byte().unwrap(), b',');

        config.output_extension = "../x".to_string();
        assert!(config.validate().is_err());

        config.output_extension = "pdt".to_string();
        config.channels.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_serialization() {
        let config = ConversionConfig::ecg_eda_example("raw.txt");
        let json = config.to_json().unwrap();
        assert!(json.contains("\"rawDataSource\""));
        assert!(json.contains("\"delimiter\": \"\\t\""));

        let parsed = ConversionConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(
            parsed.epochs[0].keys().collect::<Vec<_>>(),
            ["epochName", "startTime", "endTime", "condition", "group"]
        );
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let json = r#"{
            "rawDataSource": "raw.txt",
            "fs": 500,
            "channels": [{ "name": "ECG", "unit": "mV" }]
        }"#;
        let config = ConversionConfig::from_json(json).unwrap();
        assert_eq!(config.delimiter, '\t');
        assert!(config.sort_labels);
        assert_eq!(config.output_extension, "pdt");
        assert!(config.labels.is_empty());
        assert!(config.epochs.is_empty());
        assert_eq!(config.channels[0].description, "");

        let err = ConversionConfig::from_json("{ \"fs\": 1 }").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_from_file_resolves_relative_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversion.json");
        let config = ConversionConfig::ecg_eda_example("subject01.txt");
        std::fs::write(&path, config.to_json().unwrap()).unwrap();

        let loaded = ConversionConfig::from_file(&path).unwrap();
        assert_eq!(loaded.raw_data_source, dir.path().join("subject01.txt"));

        let missing = ConversionConfig::from_file(&dir.path().join("nope.json")).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_run_sorts_labels_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.txt");
        std::fs::write(&raw, "1\t2\n3\t4\n").unwrap();

        let mut config = ConversionConfig::ecg_eda_example(&raw);
        config.labels.reverse();
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let container = config.run(config.provenance(&created_at, "tester")).unwrap();
        assert_eq!(container.labels().t(), [30.0, 60.0, 70.0]);
        assert_eq!(container.info().raw_data_source, raw.display().to_string());

        config.sort_labels = false;
        let container = config.run(config.provenance(&created_at, "tester")).unwrap();
        assert_eq!(container.labels().t(), [70.0, 60.0, 30.0]);
    }

    #[test]
    fn test_run_reports_raw_column_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.txt");
        std::fs::write(&raw, "1\t2\t3\n").unwrap();

        let config = ConversionConfig::ecg_eda_example(&raw);
        let err = config.run(ProvenanceInfo::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
