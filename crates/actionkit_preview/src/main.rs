// SPDX-License-Identifier: MIT OR Apache-2.0
//! `ActionKit` preview driver
//!
//! A headless companion for authoring action timelines:
//! - Create and edit timeline documents
//! - Validate and inspect documents
//! - Play a timeline in real time against logging backends
//! - Scrub to explicit frames
//!
//! Real-time playback runs on a single-threaded tokio runtime; every tick
//! evaluates the timeline on that thread.

mod backends;
mod session;
mod settings;

use actionkit_timeline::{
    ActionTimeline, ActorId, DamageFieldEndAction, EventDispatcher, EventId, EventKind,
    EventPayload, Owner, TimelineError,
};
use anyhow::{bail, Context, Result};
use backends::LogBackends;
use clap::{Parser, Subcommand, ValueEnum};
use session::PreviewSession;
use settings::{PreviewSettings, SETTINGS_FILE_NAME};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "actionkit")]
#[command(about = "Author and preview frame-indexed action timelines")]
#[command(version)]
struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = SETTINGS_FILE_NAME)]
    config: PathBuf,

    /// Log filter directives, overriding the settings file
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty timeline document
    New {
        /// Output document (.ron or .json)
        path: PathBuf,

        /// Action name
        #[arg(long, default_value = "New Action")]
        name: String,

        /// Timeline length in frames
        #[arg(long, default_value = "60")]
        frames: u32,

        /// Frame rate
        #[arg(long, default_value = "60")]
        fps: u32,
    },

    /// Validate a document and print its events
    Inspect {
        /// Timeline document
        path: PathBuf,
    },

    /// Add an event to a document
    Add {
        /// Timeline document
        path: PathBuf,

        /// Event kind
        #[arg(long, value_enum)]
        kind: KindArg,

        /// Animation state, effect or damage field template, or sound clip
        #[arg(long)]
        asset: Option<String>,

        /// First frame (inclusive)
        #[arg(long)]
        start: Option<u32>,

        /// Last frame (exclusive)
        #[arg(long)]
        end: Option<u32>,

        /// Animator layer for animation events
        #[arg(long, default_value = "0")]
        layer: i32,

        /// Keep damage fields alive after the event ends
        #[arg(long)]
        continues: bool,
    },

    /// Remove an event from a document
    Remove {
        /// Timeline document
        path: PathBuf,

        /// Event ID
        id: u32,
    },

    /// Change a document's length in frames
    Resize {
        /// Timeline document
        path: PathBuf,

        /// New length in frames
        frames: u32,
    },

    /// Play a timeline in real time
    Play {
        /// Timeline document
        path: PathBuf,

        /// Playback speed multiplier
        #[arg(long)]
        speed: Option<f32>,

        /// Loop until interrupted or the time limit
        #[arg(long = "loop")]
        looping: bool,

        /// Stop after this many seconds of wall time
        #[arg(long)]
        seconds: Option<f64>,
    },

    /// Evaluate a timeline at explicit frames
    Scrub {
        /// Timeline document
        path: PathBuf,

        /// Frames to visit, in order
        #[arg(required = true)]
        frames: Vec<u32>,
    },

    /// Write the default settings file
    InitConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Animation,
    Effect,
    Sound,
    DamageField,
}

impl From<KindArg> for EventKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Animation => EventKind::Animation,
            KindArg::Effect => EventKind::Effect,
            KindArg::Sound => EventKind::Sound,
            KindArg::DamageField => EventKind::DamageField,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = PreviewSettings::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;
    init_tracing(cli.log.as_deref().unwrap_or(&settings.log_filter))?;

    tracing::debug!("ActionKit preview v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::New {
            path,
            name,
            frames,
            fps,
        } => new_document(&path, name, frames, fps)?,
        Commands::Inspect { path } => inspect(&path)?,
        Commands::Add {
            path,
            kind,
            asset,
            start,
            end,
            layer,
            continues,
        } => add_event(&path, kind.into(), asset, start, end, layer, continues)?,
        Commands::Remove { path, id } => edit(&path, |timeline| {
            let event = timeline.remove_event(EventId(id))?;
            println!("Removed {} event {}", event.kind().name(), id);
            Ok(())
        })?,
        Commands::Resize { path, frames } => edit(&path, |timeline| {
            timeline.set_total_frames(frames)?;
            println!("Resized to {} frames", frames);
            Ok(())
        })?,
        Commands::Play {
            path,
            speed,
            looping,
            seconds,
        } => {
            let mut settings = settings;
            if let Some(speed) = speed {
                settings.speed = speed;
            }
            settings.looping |= looping;
            play(&path, &settings, seconds)?;
        }
        Commands::Scrub { path, frames } => scrub(&path, &settings, &frames)?,
        Commands::InitConfig => {
            settings
                .save(&cli.config)
                .with_context(|| format!("Failed to write {}", cli.config.display()))?;
            println!("Wrote {}", cli.config.display());
        }
    }

    Ok(())
}

fn init_tracing(filter: &str) -> Result<()> {
    let env_filter = match std::env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV) {
        Ok(_) => tracing_subscriber::EnvFilter::from_default_env(),
        Err(_) => tracing_subscriber::EnvFilter::try_new(filter)
            .with_context(|| format!("Invalid log filter '{filter}'"))?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    Ok(())
}

fn load(path: &Path) -> Result<ActionTimeline> {
    ActionTimeline::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn save(timeline: &ActionTimeline, path: &Path) -> Result<()> {
    timeline
        .save(path)
        .with_context(|| format!("Failed to save {}", path.display()))
}

fn edit(
    path: &Path,
    apply: impl FnOnce(&mut ActionTimeline) -> Result<(), TimelineError>,
) -> Result<()> {
    let mut timeline = load(path)?;
    apply(&mut timeline)?;
    save(&timeline, path)
}

fn new_document(path: &Path, name: String, frames: u32, fps: u32) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    let timeline = ActionTimeline::with_length(name, frames, fps)?;
    save(&timeline, path)?;
    println!("Created {} ({} frames @ {} fps)", path.display(), frames, fps);
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let timeline = load(path)?;
    println!(
        "'{}': {} frames @ {} fps ({:.2}s), {} events",
        timeline.name,
        timeline.total_frames(),
        timeline.frames_per_second(),
        timeline.frame_to_time(timeline.total_frames()),
        timeline.event_count()
    );
    for event in timeline.events() {
        let asset = match event.payload() {
            Some(EventPayload::Animation(a)) => format!("{} (layer {})", a.name, a.layer),
            Some(EventPayload::Effect(e)) => e.template.clone(),
            Some(EventPayload::Sound(s)) => s.clip.clone(),
            Some(EventPayload::DamageField(d)) => format!("{} ({:?})", d.template, d.end_action),
            None => "<no payload>".to_string(),
        };
        println!(
            "  #{:<3} {:<12} [{:>4}, {:>4})  {}",
            event.id().0,
            event.kind().name(),
            event.start_frame(),
            event.end_frame(),
            asset
        );
    }
    Ok(())
}

fn add_event(
    path: &Path,
    kind: EventKind,
    asset: Option<String>,
    start: Option<u32>,
    end: Option<u32>,
    layer: i32,
    continues: bool,
) -> Result<()> {
    let payload = asset.map(|asset| match kind {
        EventKind::Animation => EventPayload::animation(asset, layer),
        EventKind::Effect => EventPayload::effect(asset),
        EventKind::Sound => EventPayload::sound(asset),
        EventKind::DamageField => {
            let end_action = if continues {
                DamageFieldEndAction::Continues
            } else {
                DamageFieldEndAction::Destroy
            };
            EventPayload::damage_field(asset, end_action)
        }
    });

    edit(path, |timeline| {
        let id = match (start, end) {
            (None, None) => {
                let id = timeline.add_event(kind)?;
                timeline.set_payload(id, payload)?;
                id
            }
            (start, end) => {
                let start = start.unwrap_or(0);
                let end = end.unwrap_or_else(|| timeline.total_frames());
                timeline.insert_event(kind, payload, start, end)?
            }
        };
        println!("Added {} event {}", kind.name(), id.0);
        Ok(())
    })
}

fn preview_session(
    timeline: ActionTimeline,
    settings: &PreviewSettings,
) -> (PreviewSession, LogBackends) {
    let backends = LogBackends::with_clip_lengths(settings.clip_lengths.clone());
    let owner = Owner::at(ActorId::new(), settings.owner_position);
    let dispatcher = EventDispatcher::new(backends.backend_set(), owner)
        .with_config(settings.dispatch_config());
    let mut session = PreviewSession::new(timeline, dispatcher);
    session.set_looping(settings.looping);
    session.set_speed(settings.speed);
    (session, backends)
}

fn play(path: &Path, settings: &PreviewSettings, limit: Option<f64>) -> Result<()> {
    let timeline = load(path)?;
    let (mut session, backends) = preview_session(timeline, settings);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async {
        let mut interval = tokio::time::interval(Duration::from_secs_f64(settings.tick_interval()));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let started = Instant::now();
        let mut last = started;

        session.play();
        tracing::info!("{} '{}'", session.status_text(), session.timeline().name);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!(
                        "Interrupted while {} at frame {}",
                        session.status_text().to_lowercase(),
                        session.frame()
                    );
                    break;
                }
            }

            let now = Instant::now();
            session.update(now.duration_since(last).as_secs_f32());
            last = now;

            if !session.state().is_active() {
                break;
            }
            if limit.is_some_and(|limit| started.elapsed().as_secs_f64() >= limit) {
                tracing::info!("Time limit reached at frame {}", session.frame());
                break;
            }
        }
    });

    session.stop();
    report_release(&backends)
}

fn scrub(path: &Path, settings: &PreviewSettings, frames: &[u32]) -> Result<()> {
    let timeline = load(path)?;
    let (mut session, backends) = preview_session(timeline, settings);

    for &frame in frames {
        session.scrub(frame);
        // Let scrub snippets run out before the next jump
        session.update(settings.crossfade.crossfade + settings.crossfade.preview_window);

        let active: Vec<String> = session
            .timeline()
            .active_events()
            .map(|e| format!("#{} {}", e.id().0, e.kind().name()))
            .collect();
        let live = backends.live();
        println!(
            "frame {:>4}: {} active [{}]  live: {} effects, {} audio, {} fields",
            session.frame(),
            active.len(),
            active.join(", "),
            live.effects,
            live.audio,
            live.damage_fields
        );
        if let Some((state, layer, time)) = backends.last_pose() {
            println!("            pose: {} (layer {}) at {:.3}", state, layer, time);
        }
        let audible = backends.audible();
        if !audible.is_empty() {
            println!("            audible: {}", audible.join(", "));
        }
    }

    session.stop();
    report_release(&backends)
}

fn report_release(backends: &LogBackends) -> Result<()> {
    let live = backends.live();
    if !live.is_empty() {
        bail!("Instances still alive after stop: {:?}", live);
    }
    tracing::info!("All backend instances released");
    Ok(())
}
