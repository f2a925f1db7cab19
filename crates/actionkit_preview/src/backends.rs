// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless backends that log every call.
//!
//! Nothing is rendered or mixed. Each backend records the instances it has
//! created in a shared registry so the driver can report what is alive
//! and verify that a stop released everything.

use actionkit_timeline::{
    ActorId, AnimationBackend, AudioBackend, AudioHandle, BackendSet, DamageFieldBackend,
    DamageFieldHandle, EffectBackend, EffectHandle,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// State of a logged audio instance
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInstance {
    /// Clip reference
    pub clip: String,
    /// Current volume
    pub volume: f32,
    /// Last seek position in seconds
    pub position: f32,
    /// Whether the instance is playing
    pub playing: bool,
}

/// Instances alive at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiveCounts {
    /// Effect instances
    pub effects: usize,
    /// Audio instances
    pub audio: usize,
    /// Damage fields
    pub damage_fields: usize,
}

impl LiveCounts {
    /// Whether nothing is alive
    pub fn is_empty(&self) -> bool {
        self.effects == 0 && self.audio == 0 && self.damage_fields == 0
    }
}

#[derive(Debug, Default)]
struct Registry {
    next_handle: u64,
    effects: HashMap<EffectHandle, String>,
    audio: HashMap<AudioHandle, AudioInstance>,
    damage_fields: HashSet<DamageFieldHandle>,
    clip_lengths: BTreeMap<String, f32>,
    last_pose: Option<(String, i32, f32)>,
}

impl Registry {
    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Shared registry behind a set of logging backends
#[derive(Debug, Clone, Default)]
pub struct LogBackends {
    registry: Arc<Mutex<Registry>>,
}

impl LogBackends {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that knows clip lengths
    pub fn with_clip_lengths(clip_lengths: BTreeMap<String, f32>) -> Self {
        let backends = Self::new();
        backends.registry.lock().clip_lengths = clip_lengths;
        backends
    }

    /// Backend set to hand to a dispatcher
    pub fn backend_set(&self) -> BackendSet {
        BackendSet::new(
            LogAnimation(self.clone()),
            LogEffect(self.clone()),
            LogAudio(self.clone()),
            LogDamageField(self.clone()),
        )
    }

    /// Live instance counts
    pub fn live(&self) -> LiveCounts {
        let registry = self.registry.lock();
        LiveCounts {
            effects: registry.effects.len(),
            audio: registry.audio.len(),
            damage_fields: registry.damage_fields.len(),
        }
    }

    /// Audio instances currently heard, as `clip@seconds`
    pub fn audible(&self) -> Vec<String> {
        let registry = self.registry.lock();
        let mut audible: Vec<String> = registry
            .audio
            .values()
            .filter(|a| a.playing && a.volume > 0.0)
            .map(|a| format!("{}@{:.2}s", a.clip, a.position))
            .collect();
        audible.sort();
        audible
    }

    /// Last pose sent to the animator: state, layer and normalized time
    pub fn last_pose(&self) -> Option<(String, i32, f32)> {
        self.registry.lock().last_pose.clone()
    }
}

struct LogAnimation(LogBackends);
struct LogEffect(LogBackends);
struct LogAudio(LogBackends);
struct LogDamageField(LogBackends);

impl AnimationBackend for LogAnimation {
    fn play(&mut self, name: &str, layer: i32, normalized_time: f32) {
        tracing::trace!("anim: play '{}' layer {} at {:.3}", name, layer, normalized_time);
        self.0.registry.lock().last_pose = Some((name.to_string(), layer, normalized_time));
    }

    fn force_evaluate(&mut self) {
        tracing::trace!("anim: evaluate");
    }
}

impl EffectBackend for LogEffect {
    fn spawn(&mut self, template: &str, position: [f32; 3]) -> Option<EffectHandle> {
        let mut registry = self.0.registry.lock();
        let handle = EffectHandle(registry.allocate());
        registry.effects.insert(handle, template.to_string());
        tracing::debug!("effect: spawn '{}' at {:?} -> {:?}", template, position, handle);
        Some(handle)
    }

    fn simulate(&mut self, handle: EffectHandle, seconds: f32) {
        tracing::trace!("effect: simulate {:?} to {:.3}s", handle, seconds);
    }

    fn pause(&mut self, handle: EffectHandle) {
        tracing::trace!("effect: pause {:?}", handle);
    }

    fn destroy(&mut self, handle: EffectHandle) {
        if self.0.registry.lock().effects.remove(&handle).is_none() {
            tracing::warn!("effect: destroy of unknown {:?}", handle);
        }
        tracing::debug!("effect: destroy {:?}", handle);
    }
}

impl AudioBackend for LogAudio {
    fn play(&mut self, clip: &str) -> Option<AudioHandle> {
        let mut registry = self.0.registry.lock();
        let handle = AudioHandle(registry.allocate());
        registry.audio.insert(
            handle,
            AudioInstance {
                clip: clip.to_string(),
                volume: 1.0,
                position: 0.0,
                playing: true,
            },
        );
        tracing::debug!("audio: play '{}' -> {:?}", clip, handle);
        Some(handle)
    }

    fn seek(&mut self, handle: AudioHandle, seconds: f32) {
        if let Some(instance) = self.0.registry.lock().audio.get_mut(&handle) {
            instance.position = seconds;
        }
        tracing::trace!("audio: seek {:?} to {:.3}s", handle, seconds);
    }

    fn set_volume(&mut self, handle: AudioHandle, volume: f32) {
        if let Some(instance) = self.0.registry.lock().audio.get_mut(&handle) {
            instance.volume = volume;
        }
    }

    fn stop(&mut self, handle: AudioHandle) {
        if let Some(instance) = self.0.registry.lock().audio.get_mut(&handle) {
            instance.playing = false;
        }
        tracing::trace!("audio: stop {:?}", handle);
    }

    fn destroy(&mut self, handle: AudioHandle) {
        if self.0.registry.lock().audio.remove(&handle).is_none() {
            tracing::warn!("audio: destroy of unknown {:?}", handle);
        }
        tracing::debug!("audio: destroy {:?}", handle);
    }

    fn clip_length(&self, clip: &str) -> Option<f32> {
        self.0.registry.lock().clip_lengths.get(clip).copied()
    }
}

impl DamageFieldBackend for LogDamageField {
    fn spawn(&mut self, template: &str, owner: ActorId) -> Option<DamageFieldHandle> {
        let mut registry = self.0.registry.lock();
        let handle = DamageFieldHandle(registry.allocate());
        registry.damage_fields.insert(handle);
        tracing::debug!("damage field: spawn '{}' for {:?} -> {:?}", template, owner, handle);
        Some(handle)
    }

    fn advance(&mut self, handle: DamageFieldHandle, elapsed_frames: u32) {
        tracing::trace!("damage field: {:?} at frame {}", handle, elapsed_frames);
    }

    fn destroy(&mut self, handle: DamageFieldHandle) {
        if !self.0.registry.lock().damage_fields.remove(&handle) {
            tracing::warn!("damage field: destroy of unknown {:?}", handle);
        }
        tracing::debug!("damage field: destroy {:?}", handle);
    }
}
