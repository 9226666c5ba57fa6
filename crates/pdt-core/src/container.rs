//! The physioData container and its on-disk form
//!
//! A container is written once as pretty-printed JSON with the key layout
//!
//! ```text
//! data.signals   { channels, channelNames, channelUnits, channelDescription, fs }
//! data.labels    { t, channels, channelNames, channelUnits }
//! epochs.epochData  [ { epochName, startTime, endTime, ... }, ... ]
//! physioDataInfo { rawDataSource, pdtFileCreationDate, pdtFileCreationUser }
//! ```

use crate::epochs::EpochTable;
use crate::error::{PdtError, PdtResult};
use crate::labels::LabelGroup;
use crate::provenance::ProvenanceInfo;
use crate::signals::SignalGroup;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Extension substituted into the source file name by default
pub const DEFAULT_EXTENSION: &str = "pdt";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    pub signals: SignalGroup,
    pub labels: LabelGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochSection {
    pub epoch_data: EpochTable,
}

/// Complete physioData record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysioContainer {
    pub data: DataSection,
    pub epochs: EpochSection,
    pub physio_data_info: ProvenanceInfo,
}

/// Compose the container from already-built parts
pub fn assemble(
    signals: SignalGroup,
    labels: LabelGroup,
    epochs: EpochTable,
    info: ProvenanceInfo,
) -> PhysioContainer {
    PhysioContainer {
        data: DataSection { signals, labels },
        epochs: EpochSection { epoch_data: epochs },
        physio_data_info: info,
    }
}

/// Destination for a source file: same directory and stem, new extension
pub fn output_path_for(source: &Path, extension: &str) -> PathBuf {
    source.with_extension(extension)
}

/// Refuse a destination that resolves to the raw source file itself.
///
/// Both paths are canonicalized when they exist. A destination that does not
/// exist yet is compared through its canonical parent directory.
pub fn ensure_distinct_paths(source: &Path, destination: &Path) -> PdtResult<()> {
    if resolve_path(source) == resolve_path(destination) {
        return Err(PdtError::Configuration {
            message: format!(
                "Output {} would overwrite the raw data source {}",
                destination.display(),
                source.display()
            ),
        });
    }
    Ok(())
}

fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
            parent
                .canonicalize()
                .map(|dir| dir.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

impl PhysioContainer {
    pub fn signals(&self) -> &SignalGroup {
        &self.data.signals
    }

    pub fn labels(&self) -> &LabelGroup {
        &self.data.labels
    }

    pub fn epoch_data(&self) -> &EpochTable {
        &self.epochs.epoch_data
    }

    pub fn info(&self) -> &ProvenanceInfo {
        &self.physio_data_info
    }

    /// Re-check the signal, label and provenance invariants. Decoding already
    /// checks the groups and the epoch table; provenance is checked only here.
    pub fn validate(&self) -> PdtResult<()> {
        self.data.signals.validate()?;
        self.data.labels.validate()?;
        self.physio_data_info.validate()?;
        Ok(())
    }

    pub fn to_json(&self) -> PdtResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PdtError::Serialization {
            reason: format!("failed to encode container: {}", e),
        })
    }

    pub fn from_json(json: &str) -> PdtResult<Self> {
        let container: Self = serde_json::from_str(json).map_err(|e| PdtError::Serialization {
            reason: format!("failed to decode container: {}", e),
        })?;
        container.validate()?;
        Ok(container)
    }

    /// Write the container to `destination`, replacing any existing file.
    ///
    /// The bytes go to a temporary file in the destination directory which is
    /// then renamed over the target, so readers never observe a partial file.
    pub fn save(&self, destination: &Path) -> PdtResult<()> {
        self.validate()?;
        let json = self.to_json()?;

        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PdtError::io(dir, e))?;
        if let Err(e) = write_document(&mut tmp, json.as_bytes()) {
            return Err(PdtError::io(tmp.path(), e));
        }
        debug!(bytes = json.len() + 1, tmp = %tmp.path().display(), "wrote container to temporary file");

        tmp.persist(destination)
            .map_err(|e| PdtError::io(destination, e.error))?;

        info!(
            path = %destination.display(),
            channels = self.signals().channel_count(),
            samples = self.signals().samples_per_channel(),
            labels = self.labels().len(),
            epochs = self.epoch_data().len(),
            "saved physioData container"
        );
        Ok(())
    }

    /// Read a container back and check its invariants
    pub fn load(path: &Path) -> PdtResult<Self> {
        let file = File::open(path).map_err(|e| PdtError::io(path, e))?;
        let container: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| {
                if e.is_io() {
                    PdtError::io(path, e)
                } else {
                    PdtError::Serialization {
                        reason: format!("{}: {}", path.display(), e),
                    }
                }
            })?;
        container.validate()?;
        debug!(path = %path.display(), "loaded physioData container");
        Ok(container)
    }
}

fn write_document(out: &mut impl Write, bytes: &[u8]) -> std::io::Result<()> {
    out.write_all(bytes)?;
    out.write_all(b"\n")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epochs::{build_epoch_table, EpochRow};
    use crate::error::ErrorKind;
    use crate::labels::{build_label_group, LabelEvent};
    use crate::signals::{build_signal_group, SignalColumn};
    use chrono::{TimeZone, Utc};

    fn small_container() -> PhysioContainer {
        let signals = build_signal_group(
            vec![
                SignalColumn::new("ECG", vec![0.1, 0.2], "mV", "Electrocardiogram"),
                SignalColumn::new("EDA", vec![0.05, 0.06], "µS", "Electrodermal activity"),
            ],
            1000.0,
        )
        .unwrap();
        let labels = build_label_group(vec![LabelEvent::new(0.5, "go")]).unwrap();
        let epochs = build_epoch_table(vec![EpochRow::new("all", 0.0, 0.002).with("group", 1.0)]).unwrap();
        let created_at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let info = ProvenanceInfo::new("raw.txt", &created_at, "tester");
        assemble(signals, labels, epochs, info)
    }

    #[test]
    fn test_top_level_shape() {
        let value = serde_json::to_value(small_container()).unwrap();

        let signals = &value["data"]["signals"];
        for key in ["channels", "channelNames", "channelUnits", "channelDescription", "fs"] {
            assert!(!signals[key].is_null(), "missing signals.{}", key);
        }
        let labels = &value["data"]["labels"];
        for key in ["t", "channels", "channelNames", "channelUnits"] {
            assert!(!labels[key].is_null(), "missing labels.{}", key);
        }
        assert_eq!(labels["channelNames"][0], "Labels");
        assert_eq!(value["epochs"]["epochData"][0]["epochName"], "all");
        assert_eq!(value["physioDataInfo"]["pdtFileCreationUser"], "tester");
    }

    #[test]
    fn test_json_round_trip() {
        let container = small_container();
        let parsed = PhysioContainer::from_json(&container.to_json().unwrap()).unwrap();
        assert_eq!(parsed, container);
    }

    #[test]
    fn test_load_rejects_broken_invariants() {
        let mut value = serde_json::to_value(small_container()).unwrap();
        value["data"]["labels"]["t"] = serde_json::json!([0.5, 1.0]);
        let err = PhysioContainer::from_json(&value.to_string()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
        assert!(err.to_string().contains("1 values for 2 timestamps"));

        let mut value = serde_json::to_value(small_container()).unwrap();
        value["data"]["signals"]["channelUnits"] = serde_json::json!(["mV"]);
        assert!(PhysioContainer::from_json(&value.to_string()).is_err());

        let err = PhysioContainer::from_json("{\"data\": 1}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn test_shadowing_provenance_is_never_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdt");

        let mut container = small_container();
        container.physio_data_info = container
            .physio_data_info
            .clone()
            .with_extra("rawDataSource", "other.txt");
        container.save(&path).unwrap();
        let loaded = PhysioContainer::load(&path).unwrap();
        assert_eq!(loaded.info().raw_data_source, "raw.txt");

        container
            .physio_data_info
            .extra
            .insert("pdtFileCreationUser".to_string(), "mallory".to_string());
        let err = container.save(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(PhysioContainer::load(&path).unwrap(), loaded);
    }

    #[test]
    fn test_output_path_substitutes_extension() {
        assert_eq!(
            output_path_for(Path::new("/rec/subject01.txt"), DEFAULT_EXTENSION),
            PathBuf::from("/rec/subject01.pdt")
        );
        assert_eq!(
            output_path_for(Path::new("subject01"), DEFAULT_EXTENSION),
            PathBuf::from("subject01.pdt")
        );
        assert_eq!(
            output_path_for(Path::new("data/s.01.tsv"), "json"),
            PathBuf::from("data/s.01.json")
        );
    }

    #[test]
    fn test_destination_must_differ_from_source() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("subject01.txt");
        std::fs::write(&raw, "1\t2\n").unwrap();

        let err = ensure_distinct_paths(&raw, &raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let dotted = dir.path().join(".").join("subject01.txt");
        assert!(ensure_distinct_paths(&raw, &dotted).is_err());

        assert!(ensure_distinct_paths(&raw, &dir.path().join("subject01.pdt")).is_ok());
        assert!(ensure_distinct_paths(&raw, &dir.path().join("missing").join("subject01.txt")).is_ok());
    }

    #[test]
    fn test_save_overwrites_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdt");
        std::fs::write(&path, "stale contents").unwrap();

        let container = small_container();
        container.save(&path).unwrap();
        assert_eq!(PhysioContainer::load(&path).unwrap(), container);

        // no temporary files are left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.pdt");
        let err = small_container().save(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!path.exists());
    }
}
