// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recording backends for unit tests.

use crate::backend::{
    AnimationBackend, AudioBackend, AudioHandle, BackendSet, DamageFieldBackend,
    DamageFieldHandle, EffectBackend, EffectHandle,
};
use crate::owner::ActorId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A backend call, as observed by the recorder
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AnimPlay(String, i32, f32),
    AnimEvaluate,
    EffectSpawn(String, EffectHandle),
    EffectSimulate(EffectHandle, f32),
    EffectPause(EffectHandle),
    EffectDestroy(EffectHandle),
    AudioPlay(String, AudioHandle),
    AudioSeek(AudioHandle, f32),
    AudioStop(AudioHandle),
    AudioDestroy(AudioHandle),
    FieldSpawn(String, DamageFieldHandle),
    FieldAdvance(DamageFieldHandle, u32),
    FieldDestroy(DamageFieldHandle),
}

#[derive(Debug, Default)]
struct Journal {
    calls: Vec<Call>,
    volumes: HashMap<AudioHandle, f32>,
    live_effects: HashSet<EffectHandle>,
    live_audio: HashSet<AudioHandle>,
    live_fields: HashSet<DamageFieldHandle>,
    clip_lengths: HashMap<String, f32>,
    fail_spawns: bool,
    next_handle: u64,
}

impl Journal {
    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Shared journal; hands out one recording backend per trait
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Journal>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backends(&self) -> BackendSet {
        BackendSet::new(self.animation(), self.effect(), self.audio(), self.damage_field())
    }

    pub fn animation(&self) -> RecAnimation {
        RecAnimation(self.clone())
    }

    pub fn effect(&self) -> RecEffect {
        RecEffect(self.clone())
    }

    pub fn audio(&self) -> RecAudio {
        RecAudio(self.clone())
    }

    pub fn damage_field(&self) -> RecDamageField {
        RecDamageField(self.clone())
    }

    /// Make every spawn/play return `None`
    pub fn fail_spawns(&self) {
        self.0.lock().fail_spawns = true;
    }

    pub fn set_clip_length(&self, clip: &str, seconds: f32) {
        self.0.lock().clip_lengths.insert(clip.to_string(), seconds);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.0.lock().calls.clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn volume(&self, handle: AudioHandle) -> Option<f32> {
        self.0.lock().volumes.get(&handle).copied()
    }

    pub fn live_effects(&self) -> usize {
        self.0.lock().live_effects.len()
    }

    pub fn live_audio(&self) -> usize {
        self.0.lock().live_audio.len()
    }

    pub fn live_fields(&self) -> usize {
        self.0.lock().live_fields.len()
    }

    fn record(&self, call: Call) {
        self.0.lock().calls.push(call);
    }
}

pub struct RecAnimation(Recorder);
pub struct RecEffect(Recorder);
pub struct RecAudio(Recorder);
pub struct RecDamageField(Recorder);

impl AnimationBackend for RecAnimation {
    fn play(&mut self, name: &str, layer: i32, normalized_time: f32) {
        self.0.record(Call::AnimPlay(name.to_string(), layer, normalized_time));
    }

    fn force_evaluate(&mut self) {
        self.0.record(Call::AnimEvaluate);
    }
}

impl EffectBackend for RecEffect {
    fn spawn(&mut self, template: &str, _position: [f32; 3]) -> Option<EffectHandle> {
        let mut journal = self.0 .0.lock();
        if journal.fail_spawns {
            return None;
        }
        let handle = EffectHandle(journal.next());
        journal.live_effects.insert(handle);
        journal.calls.push(Call::EffectSpawn(template.to_string(), handle));
        Some(handle)
    }

    fn simulate(&mut self, handle: EffectHandle, seconds: f32) {
        self.0.record(Call::EffectSimulate(handle, seconds));
    }

    fn pause(&mut self, handle: EffectHandle) {
        self.0.record(Call::EffectPause(handle));
    }

    fn destroy(&mut self, handle: EffectHandle) {
        let mut journal = self.0 .0.lock();
        journal.live_effects.remove(&handle);
        journal.calls.push(Call::EffectDestroy(handle));
    }
}

impl AudioBackend for RecAudio {
    fn play(&mut self, clip: &str) -> Option<AudioHandle> {
        let mut journal = self.0 .0.lock();
        if journal.fail_spawns {
            return None;
        }
        let handle = AudioHandle(journal.next());
        journal.live_audio.insert(handle);
        journal.volumes.insert(handle, 1.0);
        journal.calls.push(Call::AudioPlay(clip.to_string(), handle));
        Some(handle)
    }

    fn seek(&mut self, handle: AudioHandle, seconds: f32) {
        self.0.record(Call::AudioSeek(handle, seconds));
    }

    fn set_volume(&mut self, handle: AudioHandle, volume: f32) {
        self.0 .0.lock().volumes.insert(handle, volume);
    }

    fn stop(&mut self, handle: AudioHandle) {
        self.0.record(Call::AudioStop(handle));
    }

    fn destroy(&mut self, handle: AudioHandle) {
        let mut journal = self.0 .0.lock();
        journal.live_audio.remove(&handle);
        journal.calls.push(Call::AudioDestroy(handle));
    }

    fn clip_length(&self, clip: &str) -> Option<f32> {
        self.0 .0.lock().clip_lengths.get(clip).copied()
    }
}

impl DamageFieldBackend for RecDamageField {
    fn spawn(&mut self, template: &str, _owner: ActorId) -> Option<DamageFieldHandle> {
        let mut journal = self.0 .0.lock();
        if journal.fail_spawns {
            return None;
        }
        let handle = DamageFieldHandle(journal.next());
        journal.live_fields.insert(handle);
        journal.calls.push(Call::FieldSpawn(template.to_string(), handle));
        Some(handle)
    }

    fn advance(&mut self, handle: DamageFieldHandle, elapsed_frames: u32) {
        self.0.record(Call::FieldAdvance(handle, elapsed_frames));
    }

    fn destroy(&mut self, handle: DamageFieldHandle) {
        let mut journal = self.0 .0.lock();
        journal.live_fields.remove(&handle);
        journal.calls.push(Call::FieldDestroy(handle));
    }
}
