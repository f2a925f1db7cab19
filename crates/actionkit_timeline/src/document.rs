// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persisted timeline documents.
//!
//! A document stores the authored data only: length, rate, the ID counter
//! and every event's kind, range and payload. Runtime state is never
//! written. Documents are RON or JSON, picked by file extension.

use crate::error::{DocumentError, TimelineError};
use crate::event::{ActionEvent, EventId, EventKind, EventPayload};
use crate::timeline::{validate_payload, validate_range, ActionTimeline};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current document format version
pub const DOCUMENT_FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    DOCUMENT_FORMAT_VERSION
}

/// On-disk encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Rusty Object Notation (`.ron`)
    Ron,
    /// JSON (`.json`)
    Json,
}

impl DocumentFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("ron") => Ok(Self::Ron),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            _ => Err(DocumentError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// One persisted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Event ID
    pub id: EventId,
    /// Event kind
    pub kind: EventKind,
    /// First active frame
    pub start_frame: u32,
    /// End frame (exclusive)
    pub end_frame: u32,
    /// Kind-specific payload
    #[serde(default)]
    pub payload_ref: Option<EventPayload>,
}

/// Serialized form of an [`ActionTimeline`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDocument {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Action name
    #[serde(default)]
    pub name: String,
    /// Timeline length
    pub total_frames: u32,
    /// Frame rate
    pub frames_per_second: u32,
    /// Next event ID to hand out
    #[serde(default)]
    pub next_event_id: u32,
    /// Events in authoring order
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

impl TimelineDocument {
    /// Capture a timeline's authored data
    pub fn from_timeline(timeline: &ActionTimeline) -> Self {
        Self {
            version: DOCUMENT_FORMAT_VERSION,
            name: timeline.name.clone(),
            total_frames: timeline.total_frames(),
            frames_per_second: timeline.frames_per_second(),
            next_event_id: timeline.next_event_id(),
            events: timeline
                .events()
                .map(|e| EventRecord {
                    id: e.id(),
                    kind: e.kind(),
                    start_frame: e.start_frame(),
                    end_frame: e.end_frame(),
                    payload_ref: e.payload().cloned(),
                })
                .collect(),
        }
    }

    /// Validate and build a stopped timeline
    pub fn into_timeline(self) -> Result<ActionTimeline, DocumentError> {
        if self.version > DOCUMENT_FORMAT_VERSION {
            return Err(DocumentError::UnsupportedVersion {
                found: self.version,
                supported: DOCUMENT_FORMAT_VERSION,
            });
        }
        if self.total_frames < 1 {
            return Err(TimelineError::InvalidTotalFrames.into());
        }
        if self.frames_per_second < 1 {
            return Err(TimelineError::InvalidFrameRate.into());
        }

        let mut events = IndexMap::with_capacity(self.events.len());
        for record in self.events {
            validate_range(record.start_frame, record.end_frame, self.total_frames)?;
            if let Some(payload) = &record.payload_ref {
                validate_payload(record.kind, payload)?;
            }
            if events.contains_key(&record.id) {
                return Err(TimelineError::DuplicateEvent(record.id).into());
            }
            let event = ActionEvent::new(
                record.id,
                record.kind,
                record.payload_ref,
                record.start_frame,
                record.end_frame,
            );
            events.insert(record.id, event);
        }

        let mut floor = 1;
        for id in events.keys() {
            let after = id.0.checked_add(1).ok_or(TimelineError::IdsExhausted)?;
            floor = floor.max(after);
        }
        let next_event_id = if self.next_event_id < floor {
            if !events.is_empty() {
                tracing::warn!(
                    "Document '{}' has stale next event id {}; raised to {}",
                    self.name,
                    self.next_event_id,
                    floor
                );
            }
            floor
        } else {
            self.next_event_id
        };

        Ok(ActionTimeline::from_parts(
            self.name,
            self.total_frames,
            self.frames_per_second,
            next_event_id,
            events,
        ))
    }

    /// Encode as text
    pub fn encode(&self, format: DocumentFormat) -> Result<String, DocumentError> {
        match format {
            DocumentFormat::Ron => {
                let config = ron::ser::PrettyConfig::default().struct_names(true);
                Ok(ron::ser::to_string_pretty(self, config)?)
            }
            DocumentFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    /// Decode from text
    pub fn parse(content: &str, format: DocumentFormat) -> Result<Self, DocumentError> {
        match format {
            DocumentFormat::Ron => Ok(ron::from_str(content)?),
            DocumentFormat::Json => Ok(serde_json::from_str(content)?),
        }
    }
}

impl ActionTimeline {
    /// Load a timeline document from a `.ron` or `.json` file
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let format = DocumentFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let timeline = TimelineDocument::parse(&content, format)?.into_timeline()?;
        tracing::info!(
            "Loaded timeline '{}' ({} events) from {}",
            timeline.name,
            timeline.event_count(),
            path.display()
        );
        Ok(timeline)
    }

    /// Save the authored data to a `.ron` or `.json` file
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let format = DocumentFormat::from_path(path)?;
        let content = TimelineDocument::from_timeline(self).encode(format)?;
        std::fs::write(path, content)?;
        tracing::info!("Saved timeline '{}' to {}", self.name, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DamageFieldEndAction;

    fn sample() -> ActionTimeline {
        let mut timeline = ActionTimeline::with_length("Heavy Slash", 90, 30).unwrap();
        timeline
            .insert_event(EventKind::Animation, Some(EventPayload::animation("Slash", 0)), 0, 45)
            .unwrap();
        timeline
            .insert_event(EventKind::Sound, Some(EventPayload::sound("slash.wav")), 10, 40)
            .unwrap();
        timeline
            .insert_event(
                EventKind::DamageField,
                Some(EventPayload::damage_field("Arc", DamageFieldEndAction::Continues)),
                20,
                30,
            )
            .unwrap();
        let extra = timeline.add_event(EventKind::Effect).unwrap();
        timeline.remove_event(extra).unwrap();
        timeline
    }

    fn record(id: u32, start: u32, end: u32) -> EventRecord {
        EventRecord {
            id: EventId(id),
            kind: EventKind::Effect,
            start_frame: start,
            end_frame: end,
            payload_ref: None,
        }
    }

    fn document(events: Vec<EventRecord>) -> TimelineDocument {
        TimelineDocument {
            version: DOCUMENT_FORMAT_VERSION,
            name: "Test".into(),
            total_frames: 60,
            frames_per_second: 60,
            next_event_id: 1,
            events,
        }
    }

    #[test]
    fn test_ron_serialization() {
        let original = TimelineDocument::from_timeline(&sample());
        let text = original.encode(DocumentFormat::Ron).unwrap();
        let loaded = TimelineDocument::parse(&text, DocumentFormat::Ron).unwrap();
        assert_eq!(loaded, original);

        let timeline = loaded.into_timeline().unwrap();
        assert_eq!(timeline.event_count(), 3);
        assert_eq!(timeline.next_event_id(), 5);
    }

    #[test]
    fn test_json_uses_camel_case_keys() {
        let text = TimelineDocument::from_timeline(&sample())
            .encode(DocumentFormat::Json)
            .unwrap();
        assert!(text.contains("\"totalFrames\": 90"));
        assert!(text.contains("\"framesPerSecond\": 30"));
        assert!(text.contains("\"nextEventId\": 5"));
        assert!(text.contains("\"payloadRef\""));
        assert!(text.contains("\"endAction\": \"Continues\""));
    }

    #[test]
    fn test_stale_id_counter_is_raised() {
        let mut doc = document(vec![record(4, 0, 10), record(9, 5, 15)]);
        doc.next_event_id = 2;
        let mut timeline = doc.into_timeline().unwrap();
        assert_eq!(timeline.next_event_id(), 10);
        assert_eq!(timeline.add_event(EventKind::Sound).unwrap(), EventId(10));
    }

    #[test]
    fn test_max_event_id_is_rejected() {
        let text = r#"{
            "totalFrames": 30,
            "framesPerSecond": 30,
            "events": [{ "id": 4294967295, "kind": "Sound", "startFrame": 0, "endFrame": 30 }]
        }"#;
        let err = TimelineDocument::parse(text, DocumentFormat::Json)
            .unwrap()
            .into_timeline()
            .unwrap_err();
        assert!(matches!(err, DocumentError::Invalid(TimelineError::IdsExhausted)));
    }

    #[test]
    fn test_max_id_counter_refuses_new_events() {
        let mut doc = document(Vec::new());
        doc.next_event_id = u32::MAX;
        let mut timeline = doc.into_timeline().unwrap();
        assert_eq!(timeline.add_event(EventKind::Effect), Err(TimelineError::IdsExhausted));
    }

    #[test]
    fn test_invalid_documents_are_rejected() {
        let err = document(vec![record(1, 10, 70)]).into_timeline().unwrap_err();
        assert!(matches!(err, DocumentError::Invalid(TimelineError::InvalidRange { .. })));

        let err = document(vec![record(1, 0, 5), record(1, 5, 10)])
            .into_timeline()
            .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Invalid(TimelineError::DuplicateEvent(EventId(1)))
        ));

        let mut mismatched = record(1, 0, 5);
        mismatched.payload_ref = Some(EventPayload::sound("beep"));
        let err = document(vec![mismatched]).into_timeline().unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Invalid(TimelineError::PayloadKindMismatch { .. })
        ));

        let mut newer = document(Vec::new());
        newer.version = DOCUMENT_FORMAT_VERSION + 1;
        assert!(matches!(
            newer.into_timeline(),
            Err(DocumentError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_json_without_payloads_loads() {
        let text = r#"{
            "totalFrames": 30,
            "framesPerSecond": 30,
            "events": [{ "id": 1, "kind": "Sound", "startFrame": 0, "endFrame": 30 }]
        }"#;
        let timeline = TimelineDocument::parse(text, DocumentFormat::Json)
            .unwrap()
            .into_timeline()
            .unwrap();
        let event = timeline.event(EventId(1)).unwrap();
        assert!(event.payload().is_none());
        assert_eq!(timeline.next_event_id(), 2);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("combo.ron")).unwrap(),
            DocumentFormat::Ron
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("combo.JSON")).unwrap(),
            DocumentFormat::Json
        );
        assert!(DocumentFormat::from_path(Path::new("combo.yaml")).is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("actionkit_{}.ron", uuid::Uuid::new_v4()));
        let timeline = sample();
        timeline.save(&path).unwrap();
        let loaded = ActionTimeline::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.name, "Heavy Slash");
        assert_eq!(
            TimelineDocument::from_timeline(&loaded),
            TimelineDocument::from_timeline(&timeline)
        );
    }
}
