//! Sparse event annotations (`data.labels`)

use crate::error::{PdtError, PdtResult};
use crate::validation_error;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Name of the single label channel produced by [`build_label_group`]
pub const LABEL_CHANNEL_NAME: &str = "Labels";
/// Unit of the label channel
pub const LABEL_CHANNEL_UNIT: &str = "-";

/// A point-in-time event with its label value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEvent {
    /// Timestamp in seconds
    pub t: f64,
    pub value: String,
}

impl LabelEvent {
    pub fn new(t: f64, value: impl Into<String>) -> Self {
        Self { t, value: value.into() }
    }
}

/// Label channels indexed by explicit timestamps.
///
/// Deserialization runs [`LabelGroup::validate`], so a decoded group is
/// always parallel to `t`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "LabelGroupFields")]
pub struct LabelGroup {
    t: Vec<f64>,
    channels: Vec<Vec<String>>,
    channel_names: Vec<String>,
    channel_units: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelGroupFields {
    t: Vec<f64>,
    channels: Vec<Vec<String>>,
    channel_names: Vec<String>,
    channel_units: Vec<String>,
}

impl TryFrom<LabelGroupFields> for LabelGroup {
    type Error = PdtError;

    fn try_from(fields: LabelGroupFields) -> PdtResult<Self> {
        let group = LabelGroup {
            t: fields.t,
            channels: fields.channels,
            channel_names: fields.channel_names,
            channel_units: fields.channel_units,
        };
        group.validate()?;
        Ok(group)
    }
}

/// Stable sort by timestamp; events sharing a timestamp keep their order
pub fn sort_label_events(events: &mut [LabelEvent]) {
    events.sort_by(|a, b| a.t.total_cmp(&b.t));
}

/// Build a single-channel label group, preserving input order.
///
/// Out-of-order timestamps are accepted but logged, since downstream
/// consumers assume non-decreasing time. Use [`sort_label_events`] first.
pub fn build_label_group(events: Vec<LabelEvent>) -> PdtResult<LabelGroup> {
    let mut t = Vec::with_capacity(events.len());
    let mut values = Vec::with_capacity(events.len());

    for (index, event) in events.into_iter().enumerate() {
        if !event.t.is_finite() {
            return Err(validation_error!(
                "label {} ('{}') has a non-finite timestamp",
                index,
                event.value
            ));
        }
        t.push(event.t);
        values.push(event.value);
    }

    let group = LabelGroup {
        t,
        channels: vec![values],
        channel_names: vec![LABEL_CHANNEL_NAME.to_string()],
        channel_units: vec![LABEL_CHANNEL_UNIT.to_string()],
    };

    if !group.is_monotonic() {
        warn!("label timestamps are not in non-decreasing order");
    }
    debug!(events = group.len(), "built label group");
    Ok(group)
}

impl LabelGroup {
    /// Check that every label channel is parallel to `t`
    pub fn validate(&self) -> PdtResult<()> {
        if self.channels.is_empty() {
            return Err(validation_error!("label group needs at least one label channel"));
        }
        if self.channel_names.len() != self.channels.len()
            || self.channel_units.len() != self.channels.len()
        {
            return Err(validation_error!(
                "label group has {} channels but {} names and {} units",
                self.channels.len(),
                self.channel_names.len(),
                self.channel_units.len()
            ));
        }
        for (name, values) in self.channel_names.iter().zip(&self.channels) {
            if values.len() != self.t.len() {
                return Err(validation_error!(
                    "label channel '{}' has {} values for {} timestamps",
                    name,
                    values.len(),
                    self.t.len()
                ));
            }
        }
        if let Some(index) = self.t.iter().position(|t| !t.is_finite()) {
            return Err(validation_error!("label {} has a non-finite timestamp", index));
        }
        Ok(())
    }

    /// Timestamps in seconds
    pub fn t(&self) -> &[f64] {
        &self.t
    }

    pub fn channels(&self) -> &[Vec<String>] {
        &self.channels
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    pub fn channel_units(&self) -> &[String] {
        &self.channel_units
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn is_monotonic(&self) -> bool {
        self.t.windows(2).all(|w| w[0] <= w[1])
    }

    /// Event `index` of the first label channel
    pub fn event(&self, index: usize) -> Option<LabelEvent> {
        let t = *self.t.get(index)?;
        let value = self.channels.first()?.get(index)?;
        Some(LabelEvent::new(t, value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_events() -> Vec<LabelEvent> {
        vec![
            LabelEvent::new(30.0, "Start Baseline"),
            LabelEvent::new(60.0, "End Baseline"),
            LabelEvent::new(70.0, "Participant ready"),
        ]
    }

    #[test]
    fn test_label_group_creation() {
        let group = build_label_group(example_events()).unwrap();

        assert_eq!(group.t(), [30.0, 60.0, 70.0]);
        assert_eq!(group.channels().len(), 1);
        assert_eq!(
            group.channels()[0],
            ["Start Baseline", "End Baseline", "Participant ready"]
        );
        assert_eq!(group.channel_names(), [LABEL_CHANNEL_NAME]);
        assert_eq!(group.channel_units(), [LABEL_CHANNEL_UNIT]);
        assert!(group.validate().is_ok());
    }

    #[test]
    fn test_pairs_read_back_in_order() {
        let events = example_events();
        let group = build_label_group(events.clone()).unwrap();
        for (i, event) in events.iter().enumerate() {
            assert_eq!(group.event(i).as_ref(), Some(event));
        }
        assert!(group.event(events.len()).is_none());
    }

    #[test]
    fn test_unsorted_input_is_preserved() {
        let mut events = example_events();
        events.swap(0, 2);
        let group = build_label_group(events).unwrap();

        assert_eq!(group.t(), [70.0, 60.0, 30.0]);
        assert!(!group.is_monotonic());
    }

    #[test]
    fn test_sort_is_stable() {
        let mut events = vec![
            LabelEvent::new(5.0, "b"),
            LabelEvent::new(1.0, "a"),
            LabelEvent::new(5.0, "c"),
        ];
        sort_label_events(&mut events);
        let values: Vec<_> = events.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, ["a", "b", "c"]);
    }

    #[test]
    fn test_empty_and_invalid_events() {
        let group = build_label_group(Vec::new()).unwrap();
        assert!(group.is_empty());
        assert_eq!(group.channels()[0].len(), 0);

        let err = build_label_group(vec![LabelEvent::new(f64::NAN, "oops")]).unwrap_err();
        assert!(err.to_string().contains("'oops'"));
    }

    #[test]
    fn test_decoding_checks_invariants() {
        let group = build_label_group(example_events()).unwrap();
        let json = serde_json::to_string(&group).unwrap();
        assert_eq!(serde_json::from_str::<LabelGroup>(&json).unwrap(), group);

        let mut value = serde_json::to_value(&group).unwrap();
        value["t"] = serde_json::json!([30.0, 60.0]);
        let err = serde_json::from_value::<LabelGroup>(value).unwrap_err();
        assert!(err.to_string().contains("3 values for 2 timestamps"));

        let mut value = serde_json::to_value(&group).unwrap();
        value["channelUnits"] = serde_json::json!([]);
        assert!(serde_json::from_value::<LabelGroup>(value).is_err());
    }
}
