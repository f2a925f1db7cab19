// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime driver for a character's actions.
//!
//! The controller keeps a list of authored timelines as templates. Firing
//! an action stops whatever is running, clones the template and plays the
//! copy in real time until it reaches its last frame.

use crate::backend::DamageFieldHandle;
use crate::clock::PlaybackClock;
use crate::dispatch::EventDispatcher;
use crate::error::ControllerError;
use crate::timeline::ActionTimeline;

#[derive(Debug)]
struct RunningAction {
    index: usize,
    timeline: ActionTimeline,
}

/// Plays one action at a time for an owner
#[derive(Debug)]
pub struct ActionController {
    actions: Vec<ActionTimeline>,
    current: Option<RunningAction>,
    dispatcher: EventDispatcher,
    clock: PlaybackClock,
    detached: Vec<DamageFieldHandle>,
}

impl ActionController {
    /// Create a controller with no actions
    pub fn new(dispatcher: EventDispatcher) -> Self {
        Self {
            actions: Vec::new(),
            current: None,
            dispatcher,
            clock: PlaybackClock::new(),
            detached: Vec::new(),
        }
    }

    /// Create a controller with action templates
    pub fn with_actions(dispatcher: EventDispatcher, actions: Vec<ActionTimeline>) -> Self {
        let mut controller = Self::new(dispatcher);
        controller.actions = actions;
        controller
    }

    /// Register a template; returns its index
    pub fn add_action(&mut self, timeline: ActionTimeline) -> usize {
        self.actions.push(timeline);
        self.actions.len() - 1
    }

    /// Action templates
    pub fn actions(&self) -> &[ActionTimeline] {
        &self.actions
    }

    /// Index of the running action
    pub fn current_index(&self) -> Option<usize> {
        self.current.as_ref().map(|r| r.index)
    }

    /// The running action
    pub fn current(&self) -> Option<&ActionTimeline> {
        self.current.as_ref().map(|r| &r.timeline)
    }

    /// Whether an action is running
    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Dispatcher
    pub fn dispatcher_mut(&mut self) -> &mut EventDispatcher {
        &mut self.dispatcher
    }

    /// Playback speed multiplier
    pub fn set_speed(&mut self, speed: f32) {
        self.clock.set_speed(speed);
    }

    /// Stop the running action and start a copy of template `index`
    pub fn fire_action(&mut self, index: usize) -> Result<(), ControllerError> {
        let template = self.actions.get(index).ok_or(ControllerError::ActionNotFound {
            index,
            count: self.actions.len(),
        })?;
        let mut timeline = template.clone();

        self.stop_action();

        tracing::info!("Firing action '{}'", timeline.name);
        timeline.advance_to(0, &mut self.dispatcher);
        self.clock.stop();
        self.clock.run();
        self.current = Some(RunningAction { index, timeline });
        Ok(())
    }

    /// Stop the running action, if any
    pub fn stop_action(&mut self) {
        if let Some(mut running) = self.current.take() {
            running.timeline.stop(&mut self.dispatcher);
            self.detached.extend(running.timeline.take_detached());
            tracing::info!("Stopped action '{}'", running.timeline.name);
        }
        self.clock.stop();
    }

    /// Advance the running action by `delta_time` seconds
    pub fn update(&mut self, delta_time: f32) {
        let Some(running) = self.current.as_mut() else {
            return;
        };

        let timeline = &mut running.timeline;
        let frame = self.clock.advance(
            delta_time,
            timeline.frames_per_second(),
            timeline.total_frames(),
        );
        timeline.advance_to(frame, &mut self.dispatcher);
        timeline.tick(delta_time, &mut self.dispatcher);
        self.detached.extend(timeline.take_detached());

        if !timeline.is_playing() {
            tracing::info!("Action '{}' finished", timeline.name);
            self.current = None;
            self.clock.stop();
        }
    }

    /// Damage fields that outlived their actions
    ///
    /// The controller never destroys these; they belong to the host once
    /// taken.
    pub fn take_detached(&mut self) -> Vec<DamageFieldHandle> {
        std::mem::take(&mut self.detached)
    }
}

impl Drop for ActionController {
    fn drop(&mut self) {
        self.stop_action();
    }
}
