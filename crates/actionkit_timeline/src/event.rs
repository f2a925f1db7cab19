// SPDX-License-Identifier: MIT OR Apache-2.0
//! Action events and their payloads.

use crate::backend::{AudioHandle, Handle};
use serde::{Deserialize, Serialize};

/// Identifier of an event, unique within its timeline
///
/// IDs are handed out by the timeline in increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u32);

/// What an event drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Animation state on the owner's animator
    Animation,
    /// Particle/effect instance
    Effect,
    /// Sound cue
    Sound,
    /// Area-of-effect damage field
    DamageField,
}

impl EventKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Animation => "Animation",
            Self::Effect => "Effect",
            Self::Sound => "Sound",
            Self::DamageField => "DamageField",
        }
    }
}

/// What happens to damage field instances when their event stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DamageFieldEndAction {
    /// Destroy every instance spawned by the event
    #[default]
    Destroy,
    /// Detach the instances; they outlive the event
    Continues,
}

/// Animation state to play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationPayload {
    /// State name
    pub name: String,
    /// Animator layer
    pub layer: i32,
}

/// Effect template to instantiate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectPayload {
    /// Template (prefab) reference
    pub template: String,
}

/// Audio clip to play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundPayload {
    /// Clip reference
    pub clip: String,
}

/// Damage field template and its end behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageFieldPayload {
    /// Template (prefab) reference
    pub template: String,
    /// Behavior when the event stops
    #[serde(default)]
    pub end_action: DamageFieldEndAction,
}

/// Kind-specific event data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Animation payload
    Animation(AnimationPayload),
    /// Effect payload
    Effect(EffectPayload),
    /// Sound payload
    Sound(SoundPayload),
    /// Damage field payload
    DamageField(DamageFieldPayload),
}

impl EventPayload {
    /// Kind this payload belongs to
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Animation(_) => EventKind::Animation,
            Self::Effect(_) => EventKind::Effect,
            Self::Sound(_) => EventKind::Sound,
            Self::DamageField(_) => EventKind::DamageField,
        }
    }

    /// Animation payload shorthand
    pub fn animation(name: impl Into<String>, layer: i32) -> Self {
        Self::Animation(AnimationPayload {
            name: name.into(),
            layer,
        })
    }

    /// Effect payload shorthand
    pub fn effect(template: impl Into<String>) -> Self {
        Self::Effect(EffectPayload {
            template: template.into(),
        })
    }

    /// Sound payload shorthand
    pub fn sound(clip: impl Into<String>) -> Self {
        Self::Sound(SoundPayload { clip: clip.into() })
    }

    /// Damage field payload shorthand
    pub fn damage_field(template: impl Into<String>, end_action: DamageFieldEndAction) -> Self {
        Self::DamageField(DamageFieldPayload {
            template: template.into(),
            end_action,
        })
    }
}

/// Per-event playback bookkeeping, never persisted
#[derive(Debug, Clone, Default)]
pub(crate) struct EventRuntime {
    pub active: bool,
    pub handles: Vec<Handle>,
    /// Frame of the last update tick while active
    pub last_frame: Option<u32>,
    /// The current audio instance finished a scrub snippet and is silent
    pub silenced: bool,
}

/// One timed effect on a timeline
#[derive(Debug, Clone)]
pub struct ActionEvent {
    id: EventId,
    kind: EventKind,
    payload: Option<EventPayload>,
    start_frame: u32,
    end_frame: u32,
    pub(crate) runtime: EventRuntime,
}

impl ActionEvent {
    pub(crate) fn new(
        id: EventId,
        kind: EventKind,
        payload: Option<EventPayload>,
        start_frame: u32,
        end_frame: u32,
    ) -> Self {
        Self {
            id,
            kind,
            payload,
            start_frame,
            end_frame,
            runtime: EventRuntime::default(),
        }
    }

    /// Event ID
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Event kind
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Kind-specific payload, if authored
    pub fn payload(&self) -> Option<&EventPayload> {
        self.payload.as_ref()
    }

    /// First frame the event is active on
    pub fn start_frame(&self) -> u32 {
        self.start_frame
    }

    /// First frame after the event (exclusive)
    pub fn end_frame(&self) -> u32 {
        self.end_frame
    }

    /// Length in frames
    pub fn duration_frames(&self) -> u32 {
        self.end_frame - self.start_frame
    }

    /// Whether `frame` lies in `[start_frame, end_frame)`
    pub fn covers(&self, frame: u32) -> bool {
        frame >= self.start_frame && frame < self.end_frame
    }

    /// Position of `frame` within the event, `0.0` at the start frame
    pub fn normalized_time(&self, frame: u32) -> f32 {
        frame.saturating_sub(self.start_frame) as f32 / self.duration_frames() as f32
    }

    /// Whether the event is currently started
    pub fn is_active(&self) -> bool {
        self.runtime.active
    }

    /// Backend handles currently owned by this event
    pub fn handles(&self) -> &[Handle] {
        &self.runtime.handles
    }

    /// Current audio instance of a sound event
    pub(crate) fn audio_handle(&self) -> Option<AudioHandle> {
        self.runtime.handles.iter().rev().find_map(|h| match h {
            Handle::Audio(a) => Some(*a),
            _ => None,
        })
    }

    pub(crate) fn replace_audio(&mut self, old: AudioHandle, new: AudioHandle) {
        self.runtime.handles.retain(|h| *h != Handle::Audio(old));
        self.runtime.handles.push(Handle::Audio(new));
    }

    pub(crate) fn set_kind(&mut self, kind: EventKind) {
        if self.kind != kind {
            self.kind = kind;
            self.payload = None;
        }
    }

    pub(crate) fn set_payload(&mut self, payload: Option<EventPayload>) {
        self.payload = payload;
    }

    pub(crate) fn set_range(&mut self, start_frame: u32, end_frame: u32) {
        self.start_frame = start_frame;
        self.end_frame = end_frame;
    }

    pub(crate) fn reset_runtime(&mut self) {
        self.runtime = EventRuntime::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers_is_half_open() {
        let event = ActionEvent::new(EventId(1), EventKind::Sound, None, 10, 20);
        assert!(!event.covers(9));
        assert!(event.covers(10));
        assert!(event.covers(19));
        assert!(!event.covers(20));
    }

    #[test]
    fn test_normalized_time() {
        let event = ActionEvent::new(EventId(1), EventKind::Animation, None, 10, 20);
        assert_eq!(event.normalized_time(10), 0.0);
        assert_eq!(event.normalized_time(15), 0.5);
        assert_eq!(event.normalized_time(5), 0.0);
    }

    #[test]
    fn test_changing_kind_clears_payload() {
        let mut event = ActionEvent::new(
            EventId(1),
            EventKind::Sound,
            Some(EventPayload::sound("swing")),
            0,
            5,
        );
        event.set_kind(EventKind::Sound);
        assert!(event.payload().is_some());

        event.set_kind(EventKind::Effect);
        assert_eq!(event.kind(), EventKind::Effect);
        assert!(event.payload().is_none());
    }
}
