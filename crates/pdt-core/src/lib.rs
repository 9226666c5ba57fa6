//! PDT-Core: physioData container authoring
//!
//! Builds the hierarchical record consumed by physiological-signal analysis
//! tooling from a raw delimited recording, hand-authored labels and an epoch
//! table, and writes it to disk.

pub mod error;
pub mod signals;
pub mod labels;
pub mod epochs;
pub mod provenance;
pub mod raw;
pub mod container;
pub mod config;

pub use error::{ErrorKind, PdtError, PdtResult};
pub use signals::{build_signal_group, ChannelStats, SignalColumn, SignalGroup};
pub use labels::{build_label_group, sort_label_events, LabelEvent, LabelGroup};
pub use epochs::{build_epoch_table, ColumnValues, EpochColumn, EpochRow, EpochTable, EpochValue};
pub use provenance::{current_user, ProvenanceInfo};
pub use raw::{load_raw_samples, RawTable};
pub use container::{
    assemble, ensure_distinct_paths, output_path_for, PhysioContainer, DEFAULT_EXTENSION,
};
pub use config::{ChannelSpec, ConversionConfig};
