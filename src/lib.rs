//! Turn-synchronized bot runtime
//!
//! Lets bot code issue blocking commands ("move forward 100", "turn the gun
//! 30 degrees left", "fire") against a peer that advances exactly one turn
//! per committed intent:
//! - `motion`: kinematics, remaining amounts and stop snapshots
//! - `scheduler`: the per-turn recompute, the bot thread and its commands
//! - `protocol`: JSON wire types
//! - `loopback`: an in-process lockstep peer for demos and tests

pub mod config;
pub mod loopback;
pub mod motion;
pub mod protocol;
pub mod scheduler;
pub mod util;

pub use config::{ArenaConfig, Config, ConfigError, SchedulerConfig};
pub use motion::TurnKind;
pub use scheduler::{ActionScheduler, BotBehavior, BotControl, BotError, IntentSink, JsonFrameSink};
