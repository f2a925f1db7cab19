// SPDX-License-Identifier: MIT OR Apache-2.0
//! The action timeline: authoring and frame evaluation.

use crate::backend::DamageFieldHandle;
use crate::crossfade::CrossfadeScheduler;
use crate::dispatch::{EvalScope, EventDispatcher};
use crate::error::TimelineError;
use crate::event::{ActionEvent, EventId, EventKind, EventPayload};
use indexmap::IndexMap;

/// Shortest event the authoring operations will produce
pub const MIN_EVENT_FRAMES: u32 = 1;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimelineState {
    /// Authoring allowed; no event active
    #[default]
    Stopped,
    /// Evaluating frames
    Playing,
}

/// A frame-indexed schedule of events for one character action
///
/// The timeline records the backend handles its events own but does not
/// hold the backends, so dropping it releases nothing. Call
/// [`ActionTimeline::stop`] with the dispatcher before dropping a playing
/// timeline; [`ActionController`](crate::controller::ActionController)
/// does this for the actions it runs.
#[derive(Debug, Clone)]
pub struct ActionTimeline {
    /// Action name
    pub name: String,
    total_frames: u32,
    frames_per_second: u32,
    events: IndexMap<EventId, ActionEvent>,
    next_event_id: u32,
    state: TimelineState,
    current_frame: u32,
    fades: CrossfadeScheduler,
    detached: Vec<DamageFieldHandle>,
}

impl ActionTimeline {
    /// Create an empty one-second timeline at 60 fps
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total_frames: 60,
            frames_per_second: 60,
            events: IndexMap::new(),
            next_event_id: 1,
            state: TimelineState::Stopped,
            current_frame: 0,
            fades: CrossfadeScheduler::new(),
            detached: Vec::new(),
        }
    }

    /// Create an empty timeline with the given length and rate
    pub fn with_length(
        name: impl Into<String>,
        total_frames: u32,
        frames_per_second: u32,
    ) -> Result<Self, TimelineError> {
        let mut timeline = Self::new(name);
        timeline.set_total_frames(total_frames)?;
        timeline.set_frames_per_second(frames_per_second)?;
        Ok(timeline)
    }

    pub(crate) fn from_parts(
        name: String,
        total_frames: u32,
        frames_per_second: u32,
        next_event_id: u32,
        events: IndexMap<EventId, ActionEvent>,
    ) -> Self {
        Self {
            name,
            total_frames,
            frames_per_second,
            events,
            next_event_id,
            state: TimelineState::Stopped,
            current_frame: 0,
            fades: CrossfadeScheduler::new(),
            detached: Vec::new(),
        }
    }

    /// Timeline length in frames
    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    /// Frame rate
    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    /// Next ID `add_event` will hand out
    pub fn next_event_id(&self) -> u32 {
        self.next_event_id
    }

    /// Playback state
    pub fn state(&self) -> TimelineState {
        self.state
    }

    /// Whether the timeline is playing
    pub fn is_playing(&self) -> bool {
        self.state == TimelineState::Playing
    }

    /// Last evaluated frame
    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    /// Get all events
    pub fn events(&self) -> impl Iterator<Item = &ActionEvent> {
        self.events.values()
    }

    /// Get an event
    pub fn event(&self, id: EventId) -> Option<&ActionEvent> {
        self.events.get(&id)
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Events active at the last evaluated frame
    pub fn active_events(&self) -> impl Iterator<Item = &ActionEvent> {
        self.events.values().filter(|e| e.is_active())
    }

    /// Crossfades in flight
    pub fn fades(&self) -> &CrossfadeScheduler {
        &self.fades
    }

    /// Damage fields released by `Continues` events, not yet claimed
    pub fn detached_fields(&self) -> &[DamageFieldHandle] {
        &self.detached
    }

    /// Hand over detached damage fields to the caller
    pub fn take_detached(&mut self) -> Vec<DamageFieldHandle> {
        std::mem::take(&mut self.detached)
    }

    /// Convert frame number to seconds
    pub fn frame_to_time(&self, frame: u32) -> f32 {
        frame as f32 / self.frames_per_second as f32
    }

    /// Convert seconds to the nearest frame number
    pub fn time_to_frame(&self, time: f32) -> u32 {
        (time.max(0.0) * self.frames_per_second as f32).round() as u32
    }

    // ------------------------------------------------------------------
    // Authoring
    // ------------------------------------------------------------------

    fn ensure_stopped(&self) -> Result<(), TimelineError> {
        if self.is_playing() {
            return Err(TimelineError::Playing);
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> Result<EventId, TimelineError> {
        let id = EventId(self.next_event_id);
        self.next_event_id = self
            .next_event_id
            .checked_add(1)
            .ok_or(TimelineError::IdsExhausted)?;
        Ok(id)
    }

    fn event_mut(&mut self, id: EventId) -> Result<&mut ActionEvent, TimelineError> {
        self.events.get_mut(&id).ok_or(TimelineError::EventNotFound(id))
    }

    /// Add an event covering the first half of the timeline
    pub fn add_event(&mut self, kind: EventKind) -> Result<EventId, TimelineError> {
        self.ensure_stopped()?;
        let end = (self.total_frames / 2).max(MIN_EVENT_FRAMES);
        let id = self.allocate_id()?;
        self.events.insert(id, ActionEvent::new(id, kind, None, 0, end));
        Ok(id)
    }

    /// Add a fully specified event
    pub fn insert_event(
        &mut self,
        kind: EventKind,
        payload: Option<EventPayload>,
        start_frame: u32,
        end_frame: u32,
    ) -> Result<EventId, TimelineError> {
        self.ensure_stopped()?;
        validate_range(start_frame, end_frame, self.total_frames)?;
        if let Some(payload) = &payload {
            validate_payload(kind, payload)?;
        }
        let id = self.allocate_id()?;
        self.events
            .insert(id, ActionEvent::new(id, kind, payload, start_frame, end_frame));
        Ok(id)
    }

    /// Remove an event; its ID is not reused
    pub fn remove_event(&mut self, id: EventId) -> Result<ActionEvent, TimelineError> {
        self.ensure_stopped()?;
        self.events
            .shift_remove(&id)
            .ok_or(TimelineError::EventNotFound(id))
    }

    /// Change an event's kind; a different kind drops the payload
    pub fn set_event_kind(&mut self, id: EventId, kind: EventKind) -> Result<(), TimelineError> {
        self.ensure_stopped()?;
        self.event_mut(id)?.set_kind(kind);
        Ok(())
    }

    /// Attach or clear a payload
    pub fn set_payload(
        &mut self,
        id: EventId,
        payload: Option<EventPayload>,
    ) -> Result<(), TimelineError> {
        self.ensure_stopped()?;
        let event = self.event_mut(id)?;
        if let Some(payload) = &payload {
            validate_payload(event.kind(), payload)?;
        }
        event.set_payload(payload);
        Ok(())
    }

    /// Set an event's frame range
    pub fn set_event_range(
        &mut self,
        id: EventId,
        start_frame: u32,
        end_frame: u32,
    ) -> Result<(), TimelineError> {
        self.ensure_stopped()?;
        validate_range(start_frame, end_frame, self.total_frames)?;
        self.event_mut(id)?.set_range(start_frame, end_frame);
        Ok(())
    }

    /// Move an event's start edge by `delta` frames; returns the new start
    pub fn drag_start(&mut self, id: EventId, delta: i64) -> Result<u32, TimelineError> {
        self.ensure_stopped()?;
        let event = self.event_mut(id)?;
        let max_start = event.end_frame().saturating_sub(MIN_EVENT_FRAMES);
        let start = (event.start_frame() as i64 + delta).clamp(0, max_start as i64) as u32;
        let end = event.end_frame();
        event.set_range(start, end);
        Ok(start)
    }

    /// Move an event's end edge by `delta` frames; returns the new end
    pub fn drag_end(&mut self, id: EventId, delta: i64) -> Result<u32, TimelineError> {
        self.ensure_stopped()?;
        let total = self.total_frames;
        let event = self.event_mut(id)?;
        let min_end = event.start_frame() + MIN_EVENT_FRAMES;
        let end = (event.end_frame() as i64 + delta).clamp(min_end as i64, total as i64) as u32;
        let start = event.start_frame();
        event.set_range(start, end);
        Ok(end)
    }

    /// Fit an event to an asset's natural length, clamped to the timeline
    pub fn fit_to_length(&mut self, id: EventId, seconds: f32) -> Result<u32, TimelineError> {
        self.ensure_stopped()?;
        let total = self.total_frames;
        let length = self.time_to_frame(seconds);
        let event = self.event_mut(id)?;
        let start = event.start_frame();
        let end = start
            .saturating_add(length)
            .clamp(start + MIN_EVENT_FRAMES, total);
        event.set_range(start, end);
        Ok(end)
    }

    /// Change the timeline length, clamping events that no longer fit
    pub fn set_total_frames(&mut self, total_frames: u32) -> Result<(), TimelineError> {
        self.ensure_stopped()?;
        if total_frames < 1 {
            return Err(TimelineError::InvalidTotalFrames);
        }
        self.total_frames = total_frames;

        for event in self.events.values_mut() {
            if event.end_frame() > total_frames {
                let end = total_frames;
                let start = event.start_frame().min(end - MIN_EVENT_FRAMES);
                tracing::debug!(
                    "Clamping event {:?} from [{}, {}) to [{}, {})",
                    event.id(),
                    event.start_frame(),
                    event.end_frame(),
                    start,
                    end
                );
                event.set_range(start, end);
            }
        }
        Ok(())
    }

    /// Change the frame rate
    pub fn set_frames_per_second(&mut self, frames_per_second: u32) -> Result<(), TimelineError> {
        self.ensure_stopped()?;
        if frames_per_second < 1 {
            return Err(TimelineError::InvalidFrameRate);
        }
        self.frames_per_second = frames_per_second;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Enter Playing at frame 0; restarts if already playing
    pub fn start(&mut self, dispatcher: &mut EventDispatcher) {
        if self.is_playing() {
            self.stop(dispatcher);
        }

        dispatcher.cancel_fades(&mut self.fades);
        for event in self.events.values_mut() {
            event.reset_runtime();
        }
        self.current_frame = 0;
        self.state = TimelineState::Playing;
        tracing::debug!("Timeline '{}' started", self.name);
    }

    /// Stop every active event, cancel fades and release all handles
    pub fn stop(&mut self, dispatcher: &mut EventDispatcher) {
        if !self.is_playing() {
            return;
        }

        let mut scope = EvalScope {
            frames_per_second: self.frames_per_second,
            fades: &mut self.fades,
            detached: &mut self.detached,
        };
        for event in self.events.values_mut() {
            if event.is_active() {
                dispatcher.stop_event(event, &mut scope);
            }
        }
        dispatcher.cancel_fades(&mut self.fades);

        self.current_frame = 0;
        self.state = TimelineState::Stopped;
        tracing::debug!("Timeline '{}' stopped", self.name);
    }

    /// Evaluate the timeline at `frame`
    ///
    /// Each event's state is a function of its range and `frame` alone, so
    /// repeated or backward calls are safe. Frame 0 starts a stopped
    /// timeline; reaching `total_frames` stops it.
    pub fn advance_to(&mut self, frame: u32, dispatcher: &mut EventDispatcher) {
        if frame == 0 && !self.is_playing() {
            self.start(dispatcher);
        }
        if !self.is_playing() {
            tracing::debug!("Ignoring advance to frame {} on stopped timeline '{}'", frame, self.name);
            return;
        }

        self.current_frame = frame;
        let mut scope = EvalScope {
            frames_per_second: self.frames_per_second,
            fades: &mut self.fades,
            detached: &mut self.detached,
        };

        for event in self.events.values_mut() {
            let should_be_active = event.covers(frame);
            if should_be_active && !event.is_active() {
                dispatcher.start_event(event, &mut scope);
            } else if event.is_active() && !should_be_active {
                dispatcher.stop_event(event, &mut scope);
            }

            if event.is_active() {
                dispatcher.update_event(event, frame, &mut scope);
            }
        }

        if frame >= self.total_frames {
            self.stop(dispatcher);
        }
    }

    /// Advance in-flight crossfades by `delta_time` seconds
    pub fn tick(&mut self, delta_time: f32, dispatcher: &mut EventDispatcher) {
        if self.fades.is_empty() {
            return;
        }
        for (id, incoming) in dispatcher.tick_fades(delta_time, &mut self.fades) {
            if let Some(event) = self.events.get_mut(&id) {
                if event.audio_handle() == Some(incoming) {
                    event.runtime.silenced = true;
                }
            }
        }
    }
}

impl Default for ActionTimeline {
    fn default() -> Self {
        Self::new("Untitled Action")
    }
}

impl Drop for ActionTimeline {
    fn drop(&mut self) {
        if self.is_playing() && self.events.values().any(|e| !e.handles().is_empty()) {
            tracing::warn!(
                "Timeline '{}' dropped while playing; backend handles were not released",
                self.name
            );
        }
    }
}

pub(crate) fn validate_range(start: u32, end: u32, total: u32) -> Result<(), TimelineError> {
    if start >= end || end > total {
        return Err(TimelineError::InvalidRange { start, end, total });
    }
    Ok(())
}

pub(crate) fn validate_payload(kind: EventKind, payload: &EventPayload) -> Result<(), TimelineError> {
    if payload.kind() != kind {
        return Err(TimelineError::PayloadKindMismatch {
            expected: kind,
            found: payload.kind(),
        });
    }
    Ok(())
}
