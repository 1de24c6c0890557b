//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::motion::kinematics::MotionLimits;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Scheduler settings handed to every bot
    pub scheduler: SchedulerConfig,
    /// Loopback arena used by the demo runner
    pub arena: ArenaConfig,
}

/// Settings for one [`crate::scheduler::ActionScheduler`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// Upper bounds for the bot's own limits, never above the rules
    pub limits: MotionLimits,
    /// How long a cancelled bot thread gets to unwind
    pub teardown_grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            limits: MotionLimits::rules(),
            teardown_grace: Duration::from_millis(100),
        }
    }
}

/// Loopback arena settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArenaConfig {
    pub width: f64,
    pub height: f64,
    pub rounds: u32,
    pub turns_per_round: u32,
    /// How long the arena waits for an intent before skipping the turn
    pub turn_timeout: Duration,
    /// Seed for spawn positions; random when unset
    pub seed: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            rounds: 3,
            turns_per_round: 400,
            turn_timeout: Duration::from_millis(30),
            seed: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load configuration from any key/value source; unset keys use defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let scheduler_defaults = SchedulerConfig::default();
        let arena_defaults = ArenaConfig::default();
        let rules = MotionLimits::rules();

        let limits = MotionLimits {
            max_speed: parse_finite(&lookup, "BOT_MAX_SPEED", rules.max_speed)?,
            max_turn_rate: parse_finite(&lookup, "BOT_MAX_TURN_RATE", rules.max_turn_rate)?,
            max_gun_turn_rate: parse_finite(
                &lookup,
                "BOT_MAX_GUN_TURN_RATE",
                rules.max_gun_turn_rate,
            )?,
            max_radar_turn_rate: parse_finite(
                &lookup,
                "BOT_MAX_RADAR_TURN_RATE",
                rules.max_radar_turn_rate,
            )?,
            ..rules
        }
        .clamped_to_rules();

        let teardown_grace = Duration::from_millis(parse(
            &lookup,
            "BOT_TEARDOWN_GRACE_MS",
            scheduler_defaults.teardown_grace.as_millis() as u64,
        )?);

        let arena = ArenaConfig {
            width: parse_positive(&lookup, "ARENA_WIDTH", arena_defaults.width)?,
            height: parse_positive(&lookup, "ARENA_HEIGHT", arena_defaults.height)?,
            rounds: parse(&lookup, "ARENA_ROUNDS", arena_defaults.rounds)?,
            turns_per_round: parse(&lookup, "ARENA_TURNS_PER_ROUND", arena_defaults.turns_per_round)?,
            turn_timeout: Duration::from_millis(parse(
                &lookup,
                "ARENA_TURN_TIMEOUT_MS",
                arena_defaults.turn_timeout.as_millis() as u64,
            )?),
            seed: match lookup("ARENA_SEED") {
                Some(value) => Some(value.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: "ARENA_SEED",
                    value,
                })?),
                None => None,
            },
        };

        Ok(Self {
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            scheduler: SchedulerConfig {
                limits,
                teardown_grace,
            },
            arena,
        })
    }
}

fn parse<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

fn parse_finite<F>(lookup: &F, var: &'static str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    let parsed = parse(lookup, var, default)?;
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(ConfigError::Invalid {
            var,
            value: parsed.to_string(),
        })
    }
}

fn parse_positive<F>(lookup: &F, var: &'static str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    let parsed = parse_finite(lookup, var, default)?;
    if parsed > 0.0 {
        Ok(parsed)
    } else {
        Err(ConfigError::Invalid {
            var,
            value: parsed.to_string(),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&'static str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.scheduler, SchedulerConfig::default());
        assert_eq!(config.arena, ArenaConfig::default());
    }

    #[test]
    fn limits_are_clamped_to_rules() {
        let config = load(&[("BOT_MAX_SPEED", "12"), ("BOT_MAX_GUN_TURN_RATE", "15")]).unwrap();
        assert_eq!(config.scheduler.limits.max_speed, 8.0);
        assert_eq!(config.scheduler.limits.max_gun_turn_rate, 15.0);
    }

    #[test]
    fn arena_values_are_read() {
        let config = load(&[
            ("ARENA_ROUNDS", "5"),
            ("ARENA_SEED", " 42 "),
            ("ARENA_TURN_TIMEOUT_MS", "250"),
            ("BOT_TEARDOWN_GRACE_MS", "20"),
        ])
        .unwrap();
        assert_eq!(config.arena.rounds, 5);
        assert_eq!(config.arena.seed, Some(42));
        assert_eq!(config.arena.turn_timeout, Duration::from_millis(250));
        assert_eq!(config.scheduler.teardown_grace, Duration::from_millis(20));
    }

    #[test]
    fn garbage_is_reported_with_its_variable() {
        let err = load(&[("ARENA_ROUNDS", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "ARENA_ROUNDS", .. }));

        let err = load(&[("BOT_MAX_SPEED", "NaN")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "BOT_MAX_SPEED", .. }));

        assert!(load(&[("ARENA_WIDTH", "0")]).is_err());
    }
}
