// SPDX-License-Identifier: MIT OR Apache-2.0
//! Preview session for authoring.
//!
//! This module handles:
//! - Real-time play, pause and resume of one timeline
//! - Scrubbing to explicit frames
//! - Cleanup of damage fields that outlived their events

use actionkit_timeline::{ActionTimeline, EventDispatcher, PlaybackClock};

/// Preview state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewState {
    /// Authoring; nothing is evaluated
    #[default]
    Stop,
    /// Advancing in real time
    Play,
    /// Real-time playback on hold
    Pause,
    /// Posed at a scrubbed frame
    Timeline,
}

impl PreviewState {
    /// Whether the timeline is being evaluated
    pub fn is_active(&self) -> bool {
        !matches!(self, PreviewState::Stop)
    }
}

/// Owns a timeline previewed against one dispatcher
#[derive(Debug)]
pub struct PreviewSession {
    timeline: ActionTimeline,
    dispatcher: EventDispatcher,
    clock: PlaybackClock,
    state: PreviewState,
}

impl PreviewSession {
    /// Create a stopped session
    pub fn new(timeline: ActionTimeline, dispatcher: EventDispatcher) -> Self {
        Self {
            timeline,
            dispatcher,
            clock: PlaybackClock::new(),
            state: PreviewState::Stop,
        }
    }

    /// Wrap around at the end instead of stopping
    pub fn set_looping(&mut self, looping: bool) {
        self.clock.looping = looping;
    }

    /// Playback speed multiplier
    pub fn set_speed(&mut self, speed: f32) {
        self.clock.set_speed(speed);
    }

    /// Current state
    pub fn state(&self) -> PreviewState {
        self.state
    }

    /// Previewed timeline
    pub fn timeline(&self) -> &ActionTimeline {
        &self.timeline
    }

    /// Last evaluated frame
    pub fn frame(&self) -> u32 {
        self.timeline.current_frame()
    }

    /// Start or resume real-time playback
    ///
    /// Returns false if already playing.
    pub fn play(&mut self) -> bool {
        match self.state {
            PreviewState::Stop => {
                self.clock.stop();
                self.timeline.advance_to(0, &mut self.dispatcher);
                tracing::info!("Preview of '{}' started", self.timeline.name);
            }
            PreviewState::Pause => {
                tracing::info!("Preview resumed at frame {}", self.frame());
            }
            PreviewState::Timeline => {
                self.clock.seek(self.frame());
                tracing::info!("Preview playing from scrubbed frame {}", self.frame());
            }
            PreviewState::Play => return false,
        }
        self.clock.run();
        self.state = PreviewState::Play;
        true
    }

    /// Hold the current frame
    pub fn pause(&mut self) -> bool {
        if self.state == PreviewState::Play {
            self.clock.pause();
            self.state = PreviewState::Pause;
            tracing::info!("Preview paused at frame {}", self.frame());
            true
        } else {
            false
        }
    }

    /// Stop, release every instance and rewind
    pub fn stop(&mut self) {
        self.timeline.stop(&mut self.dispatcher);
        self.release_detached();
        self.clock.stop();
        if self.state.is_active() {
            tracing::info!("Preview of '{}' stopped", self.timeline.name);
        }
        self.state = PreviewState::Stop;
    }

    /// Pose the timeline at `frame`, clamped to the last frame
    pub fn scrub(&mut self, frame: u32) {
        let frame = frame.min(self.timeline.total_frames().saturating_sub(1));
        if !self.timeline.is_playing() {
            self.timeline.advance_to(0, &mut self.dispatcher);
        }
        self.timeline.advance_to(frame, &mut self.dispatcher);
        self.clock.pause();
        self.clock.seek(frame);
        self.state = PreviewState::Timeline;
    }

    /// Advance by `delta_time` seconds of wall time
    pub fn update(&mut self, delta_time: f32) {
        if self.state == PreviewState::Play {
            let frame = self.clock.advance(
                delta_time,
                self.timeline.frames_per_second(),
                self.timeline.total_frames(),
            );
            self.timeline.advance_to(frame, &mut self.dispatcher);
        }

        self.timeline.tick(delta_time, &mut self.dispatcher);

        if self.state.is_active() && !self.timeline.is_playing() {
            tracing::info!("Preview of '{}' reached the end", self.timeline.name);
            self.stop();
        }
    }

    fn release_detached(&mut self) {
        let detached = self.timeline.take_detached();
        if !detached.is_empty() {
            tracing::debug!("Destroying {} detached damage fields", detached.len());
            self.dispatcher.destroy_detached(detached);
        }
    }

    /// Get a status string for display
    pub fn status_text(&self) -> &'static str {
        match self.state {
            PreviewState::Stop => "Stopped",
            PreviewState::Play => "Playing",
            PreviewState::Pause => "Paused",
            PreviewState::Timeline => "Scrubbing",
        }
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::LogBackends;
    use actionkit_timeline::{
        DamageFieldEndAction, EvaluationMode, EventKind, EventPayload, Owner,
    };

    fn session(backends: &LogBackends) -> PreviewSession {
        let mut timeline = ActionTimeline::with_length("Uppercut", 60, 60).unwrap();
        timeline
            .insert_event(EventKind::Animation, Some(EventPayload::animation("Uppercut", 0)), 0, 60)
            .unwrap();
        timeline
            .insert_event(EventKind::Effect, Some(EventPayload::effect("Burst")), 10, 30)
            .unwrap();
        timeline
            .insert_event(EventKind::Sound, Some(EventPayload::sound("punch.wav")), 0, 40)
            .unwrap();
        timeline
            .insert_event(
                EventKind::DamageField,
                Some(EventPayload::damage_field("Shockwave", DamageFieldEndAction::Continues)),
                5,
                15,
            )
            .unwrap();
        let dispatcher = EventDispatcher::new(backends.backend_set(), Owner::default())
            .with_mode(EvaluationMode::Preview);
        PreviewSession::new(timeline, dispatcher)
    }

    #[test]
    fn test_play_pause_resume() {
        let backends = LogBackends::new();
        let mut session = session(&backends);

        assert!(session.play());
        assert!(!session.play());
        session.update(0.25);
        assert_eq!(session.frame(), 15);

        assert!(session.pause());
        session.update(0.25);
        assert_eq!(session.frame(), 15);

        assert!(session.play());
        session.update(0.25);
        assert_eq!(session.frame(), 30);
        assert_eq!(session.state(), PreviewState::Play);
    }

    #[test]
    fn test_reaching_end_stops_and_cleans_up() {
        let backends = LogBackends::new();
        let mut session = session(&backends);
        session.play();
        session.update(0.5);
        session.update(0.6);

        assert_eq!(session.state(), PreviewState::Stop);
        assert!(!session.timeline().is_playing());
        assert!(backends.live().is_empty());
    }

    #[test]
    fn test_looping_keeps_playing() {
        let backends = LogBackends::new();
        let mut session = session(&backends);
        session.set_looping(true);
        session.play();
        session.update(0.5);
        session.update(0.6);

        assert_eq!(session.state(), PreviewState::Play);
        assert!(session.timeline().is_playing());
        assert_eq!(session.frame(), 6);
    }

    #[test]
    fn test_scrub_poses_frame() {
        let backends = LogBackends::new();
        let mut session = session(&backends);

        session.scrub(30);
        assert_eq!(session.state(), PreviewState::Timeline);
        assert_eq!(session.frame(), 30);
        assert_eq!(backends.last_pose(), Some(("Uppercut".to_string(), 0, 0.5)));
        assert_eq!(backends.live().effects, 0);

        session.scrub(20);
        assert_eq!(backends.live().effects, 1);
    }

    #[test]
    fn test_scrub_clamps_to_last_frame() {
        let backends = LogBackends::new();
        let mut session = session(&backends);
        session.scrub(500);
        assert_eq!(session.frame(), 59);
        assert!(session.timeline().is_playing());
    }

    #[test]
    fn test_play_after_scrub_continues_from_frame() {
        let backends = LogBackends::new();
        let mut session = session(&backends);
        session.scrub(20);
        session.play();
        session.update(0.1);
        assert_eq!(session.frame(), 26);
    }

    #[test]
    fn test_stop_destroys_detached_fields() {
        let backends = LogBackends::new();
        let mut session = session(&backends);
        session.scrub(10);
        session.scrub(20);
        assert_eq!(backends.live().damage_fields, 1);
        assert_eq!(session.timeline().detached_fields().len(), 1);

        session.stop();
        assert!(backends.live().is_empty());
        assert_eq!(session.frame(), 0);
    }

    #[test]
    fn test_status_text_follows_state() {
        let backends = LogBackends::new();
        let mut session = session(&backends);
        assert_eq!(session.status_text(), "Stopped");
        session.play();
        assert_eq!(session.status_text(), "Playing");
        session.pause();
        assert_eq!(session.status_text(), "Paused");
        session.scrub(5);
        assert_eq!(session.status_text(), "Scrubbing");
    }

    #[test]
    fn test_drop_releases_everything() {
        let backends = LogBackends::new();
        {
            let mut session = session(&backends);
            session.scrub(12);
            assert!(!backends.live().is_empty());
        }
        assert!(backends.live().is_empty());
    }
}
