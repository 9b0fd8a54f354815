//! Cognitive Signature - behavioral signal engine for live editing sessions
//!
//! The engine turns raw editing activity (keystroke volume, window focus) into
//! a small set of behavioral signals through a deterministic, tick-driven
//! pipeline: rolling-window sampling → signal analysis → profile
//! classification + cognitive state tracking + session aggregation → sink.
//!
//! ## Modules
//!
//! - **Sampling**: [`sampler`] accumulates raw events and reduces them per tick
//! - **Analysis**: [`analyzer`], [`profile`] and [`state`] derive signals, profiles
//!   and cognitive states with edge-triggered transitions and flow episodes
//! - **Sessions**: [`session`] accumulates and periodically flushes summaries
//! - **Delivery**: [`sink`] and [`encoder`] hand results to displays
//! - **Driving**: [`pipeline`] composes a tick, [`scheduler`] runs ticks on a cadence
//!   and [`replay`] feeds recorded activity through the pipeline

pub mod analyzer;
pub mod config;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod profile;
pub mod replay;
pub mod sampler;
pub mod scheduler;
pub mod session;
pub mod sink;
pub mod state;
pub mod types;

pub use config::EngineConfig;
pub use error::SignalError;
pub use pipeline::{snapshot_to_dashboard, SignalProcessor, TickReport};
pub use replay::ActivityRecord;
pub use sampler::{EventCounter, MetricsSampler, MetricsSource};
pub use scheduler::{Clock, ManualClock, SystemClock, TickScheduler};
pub use sink::{CollectingSink, LogSink, Sink};
pub use types::{
    AnalyzedSignals, BurnoutRisk, CognitiveState, DashboardUpdate, Notification, Profile,
    RawSnapshot, SessionSummary,
};

/// Engine version embedded in all encoded records
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for encoded records
pub const PRODUCER_NAME: &str = "cognitive-signature";
