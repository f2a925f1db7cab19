// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wall-clock to frame conversion for real-time playback.

/// Playback clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockState {
    /// Not running; frame held at zero
    #[default]
    Stopped,
    /// Advancing with elapsed time
    Running,
    /// Holding the current frame
    Paused,
}

/// Accumulates elapsed seconds into a frame position
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// Clock state
    pub state: ClockState,
    /// Playback speed multiplier
    speed: f32,
    /// Wrap to frame 0 at the end instead of stopping
    pub looping: bool,
    /// Fractional frames accumulated so far
    accumulated: f64,
}

impl PlaybackClock {
    /// Create a stopped clock
    pub fn new() -> Self {
        Self {
            state: ClockState::Stopped,
            speed: 1.0,
            looping: false,
            accumulated: 0.0,
        }
    }

    /// Create a clock that wraps around
    pub fn looping() -> Self {
        Self {
            looping: true,
            ..Self::new()
        }
    }

    /// Start from the current position
    pub fn run(&mut self) {
        self.state = ClockState::Running;
    }

    /// Hold the current frame
    pub fn pause(&mut self) {
        if self.state == ClockState::Running {
            self.state = ClockState::Paused;
        }
    }

    /// Stop and rewind
    pub fn stop(&mut self) {
        self.state = ClockState::Stopped;
        self.accumulated = 0.0;
    }

    /// Rewind without changing state
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }

    /// Jump to a frame
    pub fn seek(&mut self, frame: u32) {
        self.accumulated = frame as f64;
    }

    /// Set speed (clamped to a reasonable range)
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(0.0, 10.0);
    }

    /// Playback speed
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Whether the clock advances on `advance`
    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    /// Current frame
    pub fn frame(&self) -> u32 {
        self.accumulated as u32
    }

    /// Advance by `delta_time` seconds and return the new frame
    ///
    /// A looping clock wraps around once it reaches `total_frames`, keeping
    /// the overshoot; a non-looping clock runs past the end so the caller sees the terminal
    /// frame and can stop the timeline.
    pub fn advance(&mut self, delta_time: f32, frames_per_second: u32, total_frames: u32) -> u32 {
        if self.state != ClockState::Running {
            return self.frame();
        }

        self.accumulated += delta_time.max(0.0) as f64 * frames_per_second as f64 * self.speed as f64;

        if self.looping && total_frames > 0 && self.accumulated >= total_frames as f64 {
            self.accumulated %= total_frames as f64;
        }

        self.frame()
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_clock_does_not_advance() {
        let mut clock = PlaybackClock::new();
        assert_eq!(clock.advance(1.0, 60, 120), 0);
    }

    #[test]
    fn test_advance_converts_seconds_to_frames() {
        let mut clock = PlaybackClock::new();
        clock.run();
        assert_eq!(clock.advance(0.5, 60, 120), 30);
        assert_eq!(clock.advance(0.25, 60, 120), 45);
    }

    #[test]
    fn test_pause_holds_frame() {
        let mut clock = PlaybackClock::new();
        clock.run();
        clock.advance(0.5, 30, 60);
        clock.pause();
        assert_eq!(clock.advance(1.0, 30, 60), 15);
        clock.run();
        assert_eq!(clock.advance(0.5, 30, 60), 30);
    }

    #[test]
    fn test_non_looping_runs_past_end() {
        let mut clock = PlaybackClock::new();
        clock.run();
        assert_eq!(clock.advance(2.0, 30, 30), 60);
    }

    #[test]
    fn test_looping_wraps_to_zero() {
        let mut clock = PlaybackClock::looping();
        clock.run();
        clock.advance(0.9, 10, 10);
        assert_eq!(clock.advance(0.2, 10, 10), 0);
    }

    #[test]
    fn test_looping_keeps_overshoot() {
        let mut clock = PlaybackClock::looping();
        clock.run();
        assert_eq!(clock.advance(1.25, 10, 10), 2);
        assert_eq!(clock.advance(2.0, 10, 10), 2);
        assert_eq!(clock.advance(0.5, 10, 10), 7);
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut clock = PlaybackClock::new();
        clock.set_speed(50.0);
        assert_eq!(clock.speed(), 10.0);
        clock.set_speed(-1.0);
        assert_eq!(clock.speed(), 0.0);
    }
}
