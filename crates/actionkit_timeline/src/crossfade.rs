// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scrub crossfades for sound events.
//!
//! When the playhead jumps inside a sound event, the old audio instance is
//! faded out while a new instance seeked to the new position fades in. The
//! new instance then plays a short snippet and fades to silence, so a
//! paused scrub sounds like a blip instead of a runaway clip.
//!
//! Each task is bounded in time and advanced by [`CrossfadeScheduler::tick`]
//! on the evaluation thread. At most one task exists per event.

use crate::backend::{AudioBackend, AudioHandle};
use crate::event::EventId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Fade timings in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossfadeSettings {
    /// Duration of the dual-playback volume ramp
    pub crossfade: f32,
    /// How long the new instance plays after the crossfade
    pub preview_window: f32,
    /// Fade-out at the end of the preview window
    pub fade_out: f32,
}

impl Default for CrossfadeSettings {
    fn default() -> Self {
        Self {
            crossfade: 0.01,
            preview_window: 0.05,
            fade_out: 0.02,
        }
    }
}

/// Result of advancing a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FadeStep {
    /// Still fading
    Running,
    /// Snippet over; the incoming instance is stopped but not destroyed
    Finished(AudioHandle),
}

/// One in-flight crossfade
#[derive(Debug, Clone)]
pub struct CrossfadeTask {
    event: EventId,
    outgoing: Option<AudioHandle>,
    incoming: AudioHandle,
    elapsed: f32,
    ramped: bool,
}

impl CrossfadeTask {
    /// Start ramping from `outgoing` to `incoming`
    pub(crate) fn begin(
        event: EventId,
        outgoing: Option<AudioHandle>,
        incoming: AudioHandle,
        audio: &mut dyn AudioBackend,
    ) -> Self {
        if let Some(out) = outgoing {
            audio.set_volume(out, 1.0);
        }
        audio.set_volume(incoming, 0.0);
        Self {
            event,
            outgoing,
            incoming,
            elapsed: 0.0,
            ramped: false,
        }
    }

    /// Event that owns the task
    pub fn event(&self) -> EventId {
        self.event
    }

    /// Instance being faded in
    pub fn incoming(&self) -> AudioHandle {
        self.incoming
    }

    /// Instance being faded out, until the crossfade completes
    pub fn outgoing(&self) -> Option<AudioHandle> {
        self.outgoing
    }

    /// Seconds since the task began
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub(crate) fn step(
        &mut self,
        dt: f32,
        settings: &CrossfadeSettings,
        audio: &mut dyn AudioBackend,
    ) -> FadeStep {
        self.elapsed += dt.max(0.0);

        let crossfade = settings.crossfade.max(0.0);
        if self.elapsed < crossfade {
            let t = self.elapsed / crossfade;
            if let Some(out) = self.outgoing {
                audio.set_volume(out, 1.0 - t);
            }
            audio.set_volume(self.incoming, t);
            return FadeStep::Running;
        }

        if !self.ramped {
            self.ramped = true;
            if let Some(out) = self.outgoing.take() {
                audio.stop(out);
                audio.destroy(out);
            }
            audio.set_volume(self.incoming, 1.0);
        }

        let window = self.elapsed - crossfade;
        let preview = settings.preview_window.max(0.0);
        if window >= preview {
            audio.set_volume(self.incoming, 0.0);
            audio.stop(self.incoming);
            return FadeStep::Finished(self.incoming);
        }

        let fade = settings.fade_out.clamp(0.0, preview);
        let fade_start = preview - fade;
        if fade > 0.0 && window > fade_start {
            let t = (window - fade_start) / fade;
            audio.set_volume(self.incoming, 1.0 - t);
        }
        FadeStep::Running
    }

    /// Drop the outgoing instance, leaving the incoming one as it is
    fn cancel(mut self, audio: &mut dyn AudioBackend) -> AudioHandle {
        if let Some(out) = self.outgoing.take() {
            audio.stop(out);
            audio.destroy(out);
        }
        self.incoming
    }
}

/// In-flight crossfades keyed by event
#[derive(Debug, Clone, Default)]
pub struct CrossfadeScheduler {
    tasks: IndexMap<EventId, CrossfadeTask>,
}

impl CrossfadeScheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a task, cancelling the event's previous one first
    pub(crate) fn schedule(&mut self, task: CrossfadeTask, audio: &mut dyn AudioBackend) {
        self.cancel(task.event, audio);
        self.tasks.insert(task.event, task);
    }

    /// Cancel the event's task; returns the instance it was fading in
    pub(crate) fn cancel(
        &mut self,
        event: EventId,
        audio: &mut dyn AudioBackend,
    ) -> Option<AudioHandle> {
        self.tasks
            .shift_remove(&event)
            .map(|task| task.cancel(audio))
    }

    /// Cancel the event's task and bring its incoming instance to full volume
    pub(crate) fn release(&mut self, event: EventId, audio: &mut dyn AudioBackend) -> bool {
        match self.cancel(event, audio) {
            Some(incoming) => {
                audio.set_volume(incoming, 1.0);
                true
            }
            None => false,
        }
    }

    /// Cancel every task
    pub(crate) fn cancel_all(&mut self, audio: &mut dyn AudioBackend) {
        for (_, task) in self.tasks.drain(..) {
            task.cancel(audio);
        }
    }

    /// Advance every task; returns `(event, incoming)` for tasks that finished
    pub(crate) fn tick(
        &mut self,
        dt: f32,
        settings: &CrossfadeSettings,
        audio: &mut dyn AudioBackend,
    ) -> Vec<(EventId, AudioHandle)> {
        let mut finished = Vec::new();
        self.tasks.retain(|event, task| match task.step(dt, settings, audio) {
            FadeStep::Running => true,
            FadeStep::Finished(incoming) => {
                finished.push((*event, incoming));
                false
            }
        });
        finished
    }

    /// Task for an event, if one is in flight
    pub fn task(&self, event: EventId) -> Option<&CrossfadeTask> {
        self.tasks.get(&event)
    }

    /// Whether an event has a task in flight
    pub fn is_scheduled(&self, event: EventId) -> bool {
        self.tasks.contains_key(&event)
    }

    /// Number of tasks in flight
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// No tasks in flight
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, Recorder};

    fn settings() -> CrossfadeSettings {
        CrossfadeSettings {
            crossfade: 0.1,
            preview_window: 0.4,
            fade_out: 0.2,
        }
    }

    #[test]
    fn test_crossfade_ramps_then_destroys_outgoing() {
        let recorder = Recorder::new();
        let mut audio = recorder.audio();
        let old = audio.play("swing").unwrap();
        let new = audio.play("swing").unwrap();

        let mut task = CrossfadeTask::begin(EventId(1), Some(old), new, &mut audio);
        assert_eq!(task.step(0.05, &settings(), &mut audio), FadeStep::Running);
        assert_eq!(recorder.volume(old), Some(0.5));
        assert_eq!(recorder.volume(new), Some(0.5));

        assert_eq!(task.step(0.1, &settings(), &mut audio), FadeStep::Running);
        assert!(task.outgoing().is_none());
        assert!(recorder.calls().contains(&Call::AudioDestroy(old)));
        assert_eq!(recorder.volume(new), Some(1.0));
    }

    #[test]
    fn test_snippet_fades_out_and_stops() {
        let recorder = Recorder::new();
        let mut audio = recorder.audio();
        let new = audio.play("swing").unwrap();

        let mut task = CrossfadeTask::begin(EventId(1), None, new, &mut audio);
        // 0.1 crossfade + 0.3 into the 0.4 window: halfway through the fade-out
        assert_eq!(task.step(0.4, &settings(), &mut audio), FadeStep::Running);
        let volume = recorder.volume(new).unwrap();
        assert!((volume - 0.5).abs() < 1e-4);

        assert_eq!(task.step(0.2, &settings(), &mut audio), FadeStep::Finished(new));
        assert!(recorder.calls().contains(&Call::AudioStop(new)));
        assert!(!recorder.calls().contains(&Call::AudioDestroy(new)));
    }

    #[test]
    fn test_schedule_replaces_previous_task() {
        let recorder = Recorder::new();
        let mut audio = recorder.audio();
        let first_out = audio.play("swing").unwrap();
        let first_in = audio.play("swing").unwrap();
        let second_in = audio.play("swing").unwrap();

        let mut scheduler = CrossfadeScheduler::new();
        let first = CrossfadeTask::begin(EventId(3), Some(first_out), first_in, &mut audio);
        scheduler.schedule(first, &mut audio);

        let second = CrossfadeTask::begin(EventId(3), Some(first_in), second_in, &mut audio);
        scheduler.schedule(second, &mut audio);

        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.task(EventId(3)).map(CrossfadeTask::incoming), Some(second_in));
        assert!(recorder.calls().contains(&Call::AudioDestroy(first_out)));
        assert!(!recorder.calls().contains(&Call::AudioDestroy(first_in)));
    }

    #[test]
    fn test_cancel_all_clears_outgoing_instances() {
        let recorder = Recorder::new();
        let mut audio = recorder.audio();
        let mut scheduler = CrossfadeScheduler::new();
        for id in 1..=3 {
            let out = audio.play("a").unwrap();
            let inc = audio.play("a").unwrap();
            let task = CrossfadeTask::begin(EventId(id), Some(out), inc, &mut audio);
            scheduler.schedule(task, &mut audio);
        }

        scheduler.cancel_all(&mut audio);
        assert!(scheduler.is_empty());
        assert_eq!(recorder.live_audio(), 3);
    }

    #[test]
    fn test_tick_reports_finished_tasks() {
        let recorder = Recorder::new();
        let mut audio = recorder.audio();
        let mut scheduler = CrossfadeScheduler::new();
        let inc = audio.play("a").unwrap();
        scheduler.schedule(CrossfadeTask::begin(EventId(9), None, inc, &mut audio), &mut audio);

        assert!(scheduler.tick(0.2, &settings(), &mut audio).is_empty());
        let finished = scheduler.tick(0.5, &settings(), &mut audio);
        assert_eq!(finished, vec![(EventId(9), inc)]);
        assert!(!scheduler.is_scheduled(EventId(9)));
    }
}
