//! Provenance metadata (`physioDataInfo`)
//!
//! Advisory only; nothing downstream processes it. The creation time and user
//! are passed in so that building a container stays deterministic.

use crate::error::{PdtError, PdtResult};
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Timestamp layout of `pdtFileCreationDate`
pub const CREATION_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// JSON keys owned by the fixed fields; `extra` may not use them
pub const RESERVED_KEYS: [&str; 3] = ["rawDataSource", "pdtFileCreationDate", "pdtFileCreationUser"];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceInfo {
    pub raw_data_source: String,
    pub pdt_file_creation_date: String,
    pub pdt_file_creation_user: String,
    /// Any further key/value pairs, written next to the fixed keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ProvenanceInfo {
    pub fn new<Tz>(source: impl Into<String>, created_at: &DateTime<Tz>, user: impl Into<String>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self {
            raw_data_source: source.into(),
            pdt_file_creation_date: created_at.format(CREATION_DATE_FORMAT).to_string(),
            pdt_file_creation_user: user.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Attach an additional key/value pair. Reserved keys are ignored.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            warn!(key = %key, "ignoring extra provenance entry that shadows a fixed field");
            return self;
        }
        self.extra.insert(key, value.into());
        self
    }

    /// Check that no extra entry collides with a fixed field
    pub fn validate(&self) -> PdtResult<()> {
        match self.extra.keys().find(|key| RESERVED_KEYS.contains(&key.as_str())) {
            Some(key) => Err(PdtError::Validation {
                reason: format!("provenance entry '{}' duplicates a fixed field", key),
            }),
            None => Ok(()),
        }
    }
}

/// Account name of the invoking user, or an empty string when unavailable
pub fn current_user() -> String {
    user_from(|key| std::env::var(key).ok())
}

fn user_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    ["USER", "USERNAME"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .find(|name| !name.trim().is_empty())
        .unwrap_or_else(|| {
            warn!("could not determine the current user; leaving pdtFileCreationUser empty");
            String::new()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_provenance_creation() {
        let created_at = Utc.with_ymd_and_hms(2024, 3, 14, 9, 26, 53).unwrap();
        let info = ProvenanceInfo::new("/data/raw.txt", &created_at, "alice");

        assert_eq!(info.raw_data_source, "/data/raw.txt");
        assert_eq!(info.pdt_file_creation_date, "2024-03-14 09:26:53");
        assert_eq!(info.pdt_file_creation_user, "alice");
    }

    #[test]
    fn test_json_keys() {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let info = ProvenanceInfo::new("raw.txt", &created_at, "").with_extra("site", "lab-2");
        let value = serde_json::to_value(&info).unwrap();

        assert_eq!(value["rawDataSource"], "raw.txt");
        assert_eq!(value["pdtFileCreationDate"], "2024-01-01 00:00:00");
        assert_eq!(value["pdtFileCreationUser"], "");
        assert_eq!(value["site"], "lab-2");

        let parsed: ProvenanceInfo = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn test_reserved_keys_stay_unique() {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let info = ProvenanceInfo::new("raw.txt", &created_at, "erin")
            .with_extra("rawDataSource", "elsewhere.txt")
            .with_extra("pdtFileCreationUser", "mallory")
            .with_extra("site", "lab-2");

        assert_eq!(info.extra.len(), 1);
        assert!(info.validate().is_ok());
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(json.matches("\"rawDataSource\"").count(), 1);
        let parsed: ProvenanceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, info);

        let mut forced = info;
        forced.extra.insert("pdtFileCreationDate".to_string(), "never".to_string());
        let err = forced.validate().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert!(err.to_string().contains("pdtFileCreationDate"));
    }

    #[test]
    fn test_user_lookup_falls_back() {
        assert_eq!(user_from(|k| (k == "USER").then(|| "bob".to_string())), "bob");
        assert_eq!(user_from(|k| (k == "USERNAME").then(|| "carol".to_string())), "carol");
        assert_eq!(
            user_from(|k| Some(if k == "USER" { " " } else { "dave" }.to_string())),
            "dave"
        );
        assert_eq!(user_from(|_| None), "");
    }
}
