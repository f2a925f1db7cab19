// SPDX-License-Identifier: MIT OR Apache-2.0
//! Preview settings persisted as RON.

use actionkit_timeline::{CrossfadeSettings, DispatchConfig, EvaluationMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default settings file name, looked up in the working directory
pub const SETTINGS_FILE_NAME: &str = "actionkit.ron";

/// Error loading or saving settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed settings file
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Write(#[from] ron::Error),
}

/// Preview driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    /// `tracing` filter directives used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Real-time updates per second
    pub tick_rate: u32,
    /// Playback speed multiplier
    pub speed: f32,
    /// Wrap to frame 0 at the end of the timeline
    pub looping: bool,
    /// Evaluation mode handed to the dispatcher
    pub mode: EvaluationMode,
    /// Position of the previewed actor
    pub owner_position: [f32; 3],
    /// Sound scrub fade timings
    pub crossfade: CrossfadeSettings,
    /// Largest forward frame step treated as native sound playback
    pub natural_advance_frames: u32,
    /// Known clip lengths in seconds, keyed by clip reference
    pub clip_lengths: BTreeMap<String, f32>,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        let dispatch = DispatchConfig::default();
        Self {
            log_filter: "actionkit_preview=info,actionkit_timeline=info".to_string(),
            tick_rate: 60,
            speed: 1.0,
            looping: false,
            mode: EvaluationMode::Preview,
            owner_position: [0.0, 0.0, 0.0],
            crossfade: dispatch.crossfade,
            natural_advance_frames: dispatch.natural_advance_frames,
            clip_lengths: BTreeMap::new(),
        }
    }
}

impl PreviewSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&content)?)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Dispatcher configuration derived from these settings
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            mode: self.mode,
            crossfade: self.crossfade,
            natural_advance_frames: self.natural_advance_frames,
        }
    }

    /// Seconds between real-time updates
    pub fn tick_interval(&self) -> f64 {
        1.0 / self.tick_rate.max(1) as f64
    }
}
