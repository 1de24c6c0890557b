//! In-process lockstep peer
//!
//! Plays the remote simulator for one bot: sends a tick, waits for the
//! intent (or the turn timeout), applies it and moves on. It never advances
//! a turn on its own.

pub mod physics;

pub use physics::{BodyPhysics, StandingOrders, TurnOutcome};

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ArenaConfig;
use crate::protocol::{BotEvent, BotIntent, BotState, ClientMsg, ServerMsg, TickEvent};
use crate::scheduler::ActionScheduler;
use crate::util::time::Timer;

use physics::BOT_RADIUS;

/// Totals for one game
#[derive(Debug, Clone, Default, Serialize)]
pub struct GameSummary {
    pub game_id: Uuid,
    pub rounds: u32,
    pub turns: u32,
    /// Turns that ended without an intent
    pub skipped_turns: u32,
    /// Frames that arrived after their turn had been skipped
    pub late_intents: u32,
    pub malformed_intents: u32,
    pub wall_hits: u32,
    pub shots: u32,
    /// Slowest tick-to-intent round trip
    pub max_turn_micros: u64,
}

/// Lockstep arena driving a single scheduler
pub struct LoopbackArena {
    config: ArenaConfig,
    physics: BodyPhysics,
    rng: ChaCha8Rng,
    game_id: Uuid,
}

impl LoopbackArena {
    pub fn new(config: ArenaConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            physics: BodyPhysics::new(config.width, config.height),
            config,
            rng,
            game_id: Uuid::new_v4(),
        }
    }

    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    /// Play every round against `scheduler`, reading intent frames from `intents`
    pub async fn run(
        mut self,
        scheduler: Arc<ActionScheduler>,
        mut intents: mpsc::UnboundedReceiver<String>,
    ) -> GameSummary {
        let mut summary = GameSummary {
            game_id: self.game_id,
            ..GameSummary::default()
        };
        info!(game_id = %self.game_id, rounds = self.config.rounds, "Game started");

        'rounds: for round in 1..=self.config.rounds {
            deliver(&scheduler, ServerMsg::RoundStarted { round_number: round }).await;
            info!(game_id = %self.game_id, round, "Round started");

            let mut body = self.spawn_body();
            let mut orders = StandingOrders::default();
            let mut events = Vec::new();
            let mut timer = Timer::new();

            for turn in 1..=self.config.turns_per_round {
                // Anything queued now answers a turn that was already skipped
                while let Ok(frame) = intents.try_recv() {
                    summary.late_intents += 1;
                    warn!(game_id = %self.game_id, round, turn, len = frame.len(), "Late intent discarded");
                }

                let tick = TickEvent {
                    round_number: round,
                    turn_number: turn,
                    bot_state: body,
                    events: std::mem::take(&mut events),
                };
                timer.reset();
                deliver(&scheduler, ServerMsg::Tick(tick)).await;

                let mut firepower = None;
                match timeout(self.config.turn_timeout, intents.recv()).await {
                    Ok(Some(frame)) => match parse_intent(&frame) {
                        Ok(intent) => {
                            orders.merge(&intent);
                            firepower = intent.firepower;
                            summary.max_turn_micros =
                                summary.max_turn_micros.max(timer.elapsed_micros());
                        }
                        Err(e) => {
                            summary.malformed_intents += 1;
                            summary.skipped_turns += 1;
                            warn!(game_id = %self.game_id, round, turn, error = %e, "Malformed intent");
                        }
                    },
                    Ok(None) => {
                        error!(game_id = %self.game_id, round, turn, "Intent channel closed");
                        break 'rounds;
                    }
                    Err(_) => {
                        summary.skipped_turns += 1;
                        debug!(game_id = %self.game_id, round, turn, "Turn skipped");
                    }
                }

                let outcome = self.physics.step(&mut body, &orders, firepower);
                if outcome.hit_wall {
                    summary.wall_hits += 1;
                    events.push(BotEvent::HitWall);
                }
                if let Some(firepower) = outcome.fired {
                    summary.shots += 1;
                    events.push(BotEvent::BulletFired { firepower });
                }
                summary.turns += 1;
            }

            deliver(&scheduler, ServerMsg::RoundEnded { round_number: round }).await;
            summary.rounds += 1;
            info!(
                game_id = %self.game_id,
                round,
                energy = body.energy,
                x = body.x,
                y = body.y,
                "Round ended"
            );
        }

        deliver(&scheduler, ServerMsg::GameEnded).await;
        info!(
            game_id = %self.game_id,
            turns = summary.turns,
            skipped = summary.skipped_turns,
            "Game ended"
        );
        summary
    }

    fn spawn_body(&mut self) -> BotState {
        let max_x = (self.config.width - BOT_RADIUS).max(BOT_RADIUS + 1.0);
        let max_y = (self.config.height - BOT_RADIUS).max(BOT_RADIUS + 1.0);
        let x = self.rng.gen_range(BOT_RADIUS..max_x);
        let y = self.rng.gen_range(BOT_RADIUS..max_y);
        let direction = self.rng.gen_range(0.0..360.0);
        let gun = self.rng.gen_range(0.0..360.0);
        let radar = self.rng.gen_range(0.0..360.0);
        self.physics.spawn(x, y, direction, gun, radar)
    }
}

/// Hand a message to the scheduler off the async runtime, since teardown
/// may block for the grace period
pub async fn deliver(scheduler: &Arc<ActionScheduler>, msg: ServerMsg) {
    let scheduler = scheduler.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || scheduler.handle_server_msg(msg)).await {
        error!(error = %e, "Scheduler task failed");
    }
}

fn parse_intent(frame: &str) -> Result<BotIntent, serde_json::Error> {
    let ClientMsg::BotIntent(intent) = serde_json::from_str::<ClientMsg>(frame)?;
    Ok(intent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_arenas_spawn_identically() {
        let config = ArenaConfig {
            seed: Some(7),
            ..ArenaConfig::default()
        };
        let a = LoopbackArena::new(config).spawn_body();
        let b = LoopbackArena::new(config).spawn_body();
        assert_eq!(a, b);
        assert!(a.x >= BOT_RADIUS && a.x <= config.width - BOT_RADIUS);
    }

    #[test]
    fn intent_frames_parse() {
        let intent = parse_intent(r#"{"type":"botIntent","targetSpeed":-3.5}"#).unwrap();
        assert_eq!(intent.target_speed, Some(-3.5));
        assert!(parse_intent(r#"{"type":"botIntent","targetSpeed":"fast"}"#).is_err());
    }
}
