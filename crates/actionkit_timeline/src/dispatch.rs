// SPDX-License-Identifier: MIT OR Apache-2.0
//! Routing of event start/stop/update to backends.
//!
//! The dispatcher holds no playback state of its own. It matches on the
//! event payload, calls the matching backend, and records the handles it
//! gets back on the event.

use crate::backend::{AudioHandle, BackendSet, DamageFieldHandle, Handle};
use crate::crossfade::{CrossfadeScheduler, CrossfadeSettings, CrossfadeTask};
use crate::event::{ActionEvent, DamageFieldEndAction, EventId, EventPayload};
use crate::owner::Owner;
use serde::{Deserialize, Serialize};

/// Who is driving the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvaluationMode {
    /// Live gameplay; animation and effects run on their own clocks
    #[default]
    Runtime,
    /// Editor preview; animation and effects are posed to the exact frame
    Preview,
}

/// Dispatcher configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Evaluation mode
    pub mode: EvaluationMode,
    /// Sound scrub fade timings
    pub crossfade: CrossfadeSettings,
    /// Largest forward frame step still treated as native playback
    pub natural_advance_frames: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: EvaluationMode::Runtime,
            crossfade: CrossfadeSettings::default(),
            natural_advance_frames: 2,
        }
    }
}

/// Timeline resources a dispatch call may touch
pub(crate) struct EvalScope<'a> {
    pub frames_per_second: u32,
    pub fades: &'a mut CrossfadeScheduler,
    pub detached: &'a mut Vec<DamageFieldHandle>,
}

/// Routes event transitions to a [`BackendSet`]
#[derive(Debug)]
pub struct EventDispatcher {
    backends: BackendSet,
    owner: Owner,
    config: DispatchConfig,
}

impl EventDispatcher {
    /// Create a dispatcher for an owner
    pub fn new(backends: BackendSet, owner: Owner) -> Self {
        Self {
            backends,
            owner,
            config: DispatchConfig::default(),
        }
    }

    /// Set configuration
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Set evaluation mode
    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Current configuration
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Evaluation mode
    pub fn mode(&self) -> EvaluationMode {
        self.config.mode
    }

    /// Switch evaluation mode
    pub fn set_mode(&mut self, mode: EvaluationMode) {
        self.config.mode = mode;
    }

    /// Owning actor
    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Move the owning actor
    pub fn set_owner_position(&mut self, position: [f32; 3]) {
        self.owner.position = position;
    }

    /// Backends
    pub fn backends_mut(&mut self) -> &mut BackendSet {
        &mut self.backends
    }

    pub(crate) fn start_event(&mut self, event: &mut ActionEvent, _scope: &mut EvalScope<'_>) {
        event.runtime.active = true;
        event.runtime.last_frame = None;
        event.runtime.silenced = false;
        tracing::debug!("Starting event {:?} ({})", event.id(), event.kind().name());

        let Some(payload) = event.payload().cloned() else {
            tracing::warn!("Event {:?} has no payload; nothing to start", event.id());
            return;
        };

        match payload {
            EventPayload::Animation(anim) => {
                self.backends.animation.play(&anim.name, anim.layer, 0.0);
            }
            EventPayload::Effect(effect) => {
                match self.backends.effect.spawn(&effect.template, self.owner.position) {
                    Some(handle) => event.runtime.handles.push(Handle::Effect(handle)),
                    None => tracing::warn!(
                        "Failed to spawn effect '{}' for event {:?}",
                        effect.template,
                        event.id()
                    ),
                }
            }
            EventPayload::Sound(sound) => match self.backends.audio.play(&sound.clip) {
                Some(handle) => event.runtime.handles.push(Handle::Audio(handle)),
                None => tracing::warn!(
                    "Failed to play clip '{}' for event {:?}",
                    sound.clip,
                    event.id()
                ),
            },
            EventPayload::DamageField(field) => {
                match self.backends.damage_field.spawn(&field.template, self.owner.actor_id) {
                    Some(handle) => event.runtime.handles.push(Handle::DamageField(handle)),
                    None => tracing::warn!(
                        "Failed to spawn damage field '{}' for event {:?}",
                        field.template,
                        event.id()
                    ),
                }
            }
        }
    }

    pub(crate) fn update_event(
        &mut self,
        event: &mut ActionEvent,
        frame: u32,
        scope: &mut EvalScope<'_>,
    ) {
        let elapsed_frames = frame.saturating_sub(event.start_frame());

        match event.payload() {
            Some(EventPayload::Animation(anim)) => {
                if self.config.mode == EvaluationMode::Preview {
                    let t = event.normalized_time(frame);
                    self.backends.animation.play(&anim.name, anim.layer, t);
                    self.backends.animation.force_evaluate();
                }
            }
            Some(EventPayload::Effect(_)) => {
                if self.config.mode == EvaluationMode::Preview {
                    let seconds = frames_to_seconds(elapsed_frames, scope.frames_per_second);
                    for handle in event.handles() {
                        if let Handle::Effect(h) = *handle {
                            self.backends.effect.simulate(h, seconds);
                            self.backends.effect.pause(h);
                        }
                    }
                }
            }
            Some(EventPayload::Sound(_)) => self.update_sound(event, frame, scope),
            Some(EventPayload::DamageField(_)) => {
                for handle in event.handles() {
                    if let Handle::DamageField(h) = *handle {
                        self.backends.damage_field.advance(h, elapsed_frames);
                    }
                }
            }
            None => {}
        }

        event.runtime.last_frame = Some(frame);
    }

    fn update_sound(&mut self, event: &mut ActionEvent, frame: u32, scope: &mut EvalScope<'_>) {
        let Some(EventPayload::Sound(sound)) = event.payload() else {
            return;
        };
        let clip = sound.clip.clone();
        let Some(current) = event.audio_handle() else {
            return;
        };

        let id = event.id();
        let audio = self.backends.audio.as_mut();
        let normalized = event.normalized_time(frame);
        let clip_length = audio
            .clip_length(&clip)
            .unwrap_or_else(|| frames_to_seconds(event.duration_frames(), scope.frames_per_second));
        let clip_time = normalized * clip_length;

        match event.runtime.last_frame {
            None => {
                // Entered mid-range: the fresh instance just needs to jump
                if frame > event.start_frame() {
                    audio.seek(current, clip_time);
                }
                return;
            }
            Some(last) if last == frame => return,
            Some(last) if frame > last && frame - last <= self.config.natural_advance_frames => {
                if !scope.fades.release(id, audio) && event.runtime.silenced {
                    if let Some(fresh) = audio.play(&clip) {
                        audio.seek(fresh, clip_time);
                        audio.stop(current);
                        audio.destroy(current);
                        event.replace_audio(current, fresh);
                        event.runtime.silenced = false;
                    }
                }
                return;
            }
            Some(_) => {}
        }

        if !(0.0..1.0).contains(&normalized) {
            audio.stop(current);
            return;
        }

        let Some(incoming) = audio.play(&clip) else {
            tracing::warn!("Failed to play clip '{}' for scrub of event {:?}", clip, id);
            return;
        };
        audio.seek(incoming, clip_time);
        scope.fades.cancel(id, audio);

        let outgoing = if event.runtime.silenced {
            audio.destroy(current);
            None
        } else {
            Some(current)
        };
        event.replace_audio(current, incoming);
        event.runtime.silenced = false;

        let task = CrossfadeTask::begin(id, outgoing, incoming, audio);
        scope.fades.schedule(task, audio);
        tracing::trace!("Crossfade scheduled for event {:?} at {:.3}s", id, clip_time);
    }

    pub(crate) fn stop_event(&mut self, event: &mut ActionEvent, scope: &mut EvalScope<'_>) {
        event.runtime.active = false;
        event.runtime.last_frame = None;
        event.runtime.silenced = false;
        tracing::debug!("Stopping event {:?} ({})", event.id(), event.kind().name());

        scope.fades.cancel(event.id(), self.backends.audio.as_mut());

        let end_action = match event.payload() {
            Some(EventPayload::DamageField(field)) => field.end_action,
            _ => DamageFieldEndAction::Destroy,
        };

        for handle in event.runtime.handles.drain(..) {
            match handle {
                Handle::Effect(h) => self.backends.effect.destroy(h),
                Handle::Audio(h) => {
                    self.backends.audio.stop(h);
                    self.backends.audio.destroy(h);
                }
                Handle::DamageField(h) => match end_action {
                    DamageFieldEndAction::Destroy => self.backends.damage_field.destroy(h),
                    DamageFieldEndAction::Continues => scope.detached.push(h),
                },
            }
        }
    }

    /// Advance crossfades by wall time; returns tasks that finished
    pub(crate) fn tick_fades(
        &mut self,
        dt: f32,
        fades: &mut CrossfadeScheduler,
    ) -> Vec<(EventId, AudioHandle)> {
        fades.tick(dt, &self.config.crossfade, self.backends.audio.as_mut())
    }

    pub(crate) fn cancel_fades(&mut self, fades: &mut CrossfadeScheduler) {
        fades.cancel_all(self.backends.audio.as_mut());
    }

    /// Destroy damage fields that outlived their events
    pub fn destroy_detached(&mut self, handles: impl IntoIterator<Item = DamageFieldHandle>) {
        for handle in handles {
            self.backends.destroy_detached(handle);
        }
    }
}

/// Convert a frame count to seconds
pub fn frames_to_seconds(frames: u32, frames_per_second: u32) -> f32 {
    frames as f32 / frames_per_second.max(1) as f32
}
