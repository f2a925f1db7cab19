// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame-indexed action timelines for ActionKit.
//!
//! This crate sequences the timed parts of a character action:
//! - Animation states
//! - Particle effects
//! - Sound cues, with scrub crossfades
//! - Damage fields
//!
//! ## Architecture
//!
//! The evaluator is built on:
//! - An [`ActionTimeline`] state machine that decides, per frame, which
//!   events start, stop or update
//! - An [`EventDispatcher`] routing those transitions to backend traits
//! - A [`CrossfadeScheduler`] for cooperative, time-bounded audio fades
//! - An [`ActionController`] that plays authored timelines in real time
//!
//! Timelines never talk to an engine directly. Hosts implement the traits
//! in [`backend`] and hand them to the dispatcher.

pub mod backend;
pub mod clock;
pub mod controller;
pub mod crossfade;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod event;
pub mod owner;
pub mod timeline;

#[cfg(test)]
mod test_support;

pub use backend::{
    AnimationBackend, AudioBackend, AudioHandle, BackendSet, DamageFieldBackend,
    DamageFieldHandle, EffectBackend, EffectHandle, Handle, NullBackend,
};
pub use clock::{ClockState, PlaybackClock};
pub use controller::ActionController;
pub use crossfade::{CrossfadeScheduler, CrossfadeSettings, CrossfadeTask};
pub use dispatch::{frames_to_seconds, DispatchConfig, EvaluationMode, EventDispatcher};
pub use document::{DocumentFormat, EventRecord, TimelineDocument, DOCUMENT_FORMAT_VERSION};
pub use error::{ControllerError, DocumentError, TimelineError};
pub use event::{
    ActionEvent, AnimationPayload, DamageFieldEndAction, DamageFieldPayload, EffectPayload,
    EventId, EventKind, EventPayload, SoundPayload,
};
pub use owner::{ActorId, Owner};
pub use timeline::{ActionTimeline, TimelineState, MIN_EVENT_FRAMES};
