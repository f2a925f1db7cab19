// SPDX-License-Identifier: MIT OR Apache-2.0
//! Backend traits the evaluator drives.
//!
//! The timeline never plays animation, simulates particles or mixes audio
//! itself. Each event kind is routed to one of these traits, and every
//! resource a backend creates comes back as an opaque handle owned by the
//! event that created it.

use crate::owner::ActorId;

/// Effect instance handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectHandle(pub u64);

/// Audio playback instance handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioHandle(pub u64);

/// Damage field instance handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DamageFieldHandle(pub u64);

/// Any backend resource owned by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    /// Effect instance
    Effect(EffectHandle),
    /// Audio instance
    Audio(AudioHandle),
    /// Damage field instance
    DamageField(DamageFieldHandle),
}

/// Animator of the owning actor
pub trait AnimationBackend: Send {
    /// Play a state on a layer from a normalized time in `[0, 1]`
    fn play(&mut self, name: &str, layer: i32, normalized_time: f32);

    /// Evaluate the animator once without advancing time
    fn force_evaluate(&mut self);
}

/// Particle/effect simulator
pub trait EffectBackend: Send {
    /// Instantiate a template; `None` when it cannot be created
    fn spawn(&mut self, template: &str, position: [f32; 3]) -> Option<EffectHandle>;

    /// Simulate from the beginning up to `seconds`
    fn simulate(&mut self, handle: EffectHandle, seconds: f32);

    /// Pause the instance at its current state
    fn pause(&mut self, handle: EffectHandle);

    /// Destroy the instance
    fn destroy(&mut self, handle: EffectHandle);
}

/// Audio player
pub trait AudioBackend: Send {
    /// Create a playback instance for a clip and start it
    fn play(&mut self, clip: &str) -> Option<AudioHandle>;

    /// Move the playback position
    fn seek(&mut self, handle: AudioHandle, seconds: f32);

    /// Set instance volume in `[0, 1]`
    fn set_volume(&mut self, handle: AudioHandle, volume: f32);

    /// Halt playback, keeping the instance
    fn stop(&mut self, handle: AudioHandle);

    /// Release the instance
    fn destroy(&mut self, handle: AudioHandle);

    /// Natural length of a clip in seconds, if known
    fn clip_length(&self, _clip: &str) -> Option<f32> {
        None
    }
}

/// Damage field spawner
pub trait DamageFieldBackend: Send {
    /// Instantiate a field tagged with its owner
    fn spawn(&mut self, template: &str, owner: ActorId) -> Option<DamageFieldHandle>;

    /// Advance the field's simulation to `elapsed_frames` since its event started
    fn advance(&mut self, handle: DamageFieldHandle, elapsed_frames: u32);

    /// Destroy the field
    fn destroy(&mut self, handle: DamageFieldHandle);
}

/// The four backends a dispatcher routes to
pub struct BackendSet {
    /// Animation backend
    pub animation: Box<dyn AnimationBackend>,
    /// Effect backend
    pub effect: Box<dyn EffectBackend>,
    /// Audio backend
    pub audio: Box<dyn AudioBackend>,
    /// Damage field backend
    pub damage_field: Box<dyn DamageFieldBackend>,
}

impl BackendSet {
    /// Bundle four backends
    pub fn new(
        animation: impl AnimationBackend + 'static,
        effect: impl EffectBackend + 'static,
        audio: impl AudioBackend + 'static,
        damage_field: impl DamageFieldBackend + 'static,
    ) -> Self {
        Self {
            animation: Box::new(animation),
            effect: Box::new(effect),
            audio: Box::new(audio),
            damage_field: Box::new(damage_field),
        }
    }

    /// Backends that accept every call and create nothing
    pub fn null() -> Self {
        Self::new(NullBackend, NullBackend, NullBackend, NullBackend)
    }

    /// Destroy a damage field that was detached from its event
    pub fn destroy_detached(&mut self, handle: DamageFieldHandle) {
        self.damage_field.destroy(handle);
    }
}

impl std::fmt::Debug for BackendSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSet").finish_non_exhaustive()
    }
}

/// Backend that does nothing and never creates resources
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl AnimationBackend for NullBackend {
    fn play(&mut self, _name: &str, _layer: i32, _normalized_time: f32) {}
    fn force_evaluate(&mut self) {}
}

impl EffectBackend for NullBackend {
    fn spawn(&mut self, _template: &str, _position: [f32; 3]) -> Option<EffectHandle> {
        None
    }
    fn simulate(&mut self, _handle: EffectHandle, _seconds: f32) {}
    fn pause(&mut self, _handle: EffectHandle) {}
    fn destroy(&mut self, _handle: EffectHandle) {}
}

impl AudioBackend for NullBackend {
    fn play(&mut self, _clip: &str) -> Option<AudioHandle> {
        None
    }
    fn seek(&mut self, _handle: AudioHandle, _seconds: f32) {}
    fn set_volume(&mut self, _handle: AudioHandle, _volume: f32) {}
    fn stop(&mut self, _handle: AudioHandle) {}
    fn destroy(&mut self, _handle: AudioHandle) {}
}

impl DamageFieldBackend for NullBackend {
    fn spawn(&mut self, _template: &str, _owner: ActorId) -> Option<DamageFieldHandle> {
        None
    }
    fn advance(&mut self, _handle: DamageFieldHandle, _elapsed_frames: u32) {}
    fn destroy(&mut self, _handle: DamageFieldHandle) {}
}

#[cfg(test)]
mod tests {
    use crate::dispatch::{EvaluationMode, EventDispatcher};
    use crate::event::{EventKind, EventPayload};
    use crate::owner::Owner;
    use crate::timeline::ActionTimeline;

    use super::*;

    #[test]
    fn test_null_backends_leave_events_without_handles() {
        let mut dispatcher =
            EventDispatcher::new(BackendSet::null(), Owner::default()).with_mode(EvaluationMode::Preview);
        let mut timeline = ActionTimeline::with_length("Idle", 30, 30).unwrap();
        let id = timeline
            .insert_event(EventKind::Sound, Some(EventPayload::sound("hum.wav")), 0, 30)
            .unwrap();

        timeline.advance_to(0, &mut dispatcher);
        timeline.advance_to(20, &mut dispatcher);
        let event = timeline.event(id).unwrap();
        assert!(event.is_active());
        assert!(event.handles().is_empty());
        assert!(timeline.fades().is_empty());

        timeline.stop(&mut dispatcher);
        assert!(!timeline.event(id).unwrap().is_active());
    }
}
