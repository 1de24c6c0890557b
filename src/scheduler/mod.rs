//! Turn-synchronized action scheduler
//!
//! The protocol side feeds [`ActionScheduler::handle_server_msg`] one message
//! at a time. Each tick is folded into the remaining amounts and the pending
//! intent before the bot thread, blocked in a commit-turn call on
//! [`BotControl`], is allowed to continue.

pub mod context;
pub mod control;
pub mod intent;
pub mod lifecycle;
pub mod turn;

pub use context::ExecutionContext;
pub use control::BotControl;
pub use intent::IntentAccumulator;
pub use turn::{CancellationToken, TurnGate};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::SchedulerConfig;
use crate::motion::remaining::{RemainingAmounts, TurnKind};
use crate::motion::snapshot::SnapshotSlot;
use crate::protocol::{BotEvent, BotIntent, BotState, ClientMsg, ServerMsg, TickEvent};

/// Errors surfaced to bot code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BotError {
    #[error("{0} cannot be NaN")]
    InvalidArgument(&'static str),

    #[error("Bot is not running")]
    NotRunning,
}

/// User-authored bot logic, run once per round on its own thread
pub trait BotBehavior: Send + Sync + 'static {
    fn run(&self, bot: &BotControl) -> Result<(), BotError>;
}

impl<F> BotBehavior for F
where
    F: Fn(&BotControl) -> Result<(), BotError> + Send + Sync + 'static,
{
    fn run(&self, bot: &BotControl) -> Result<(), BotError> {
        self(bot)
    }
}

/// Where committed intents go
pub trait IntentSink: Send + Sync {
    fn send_intent(&self, intent: BotIntent);
}

impl<F> IntentSink for F
where
    F: Fn(BotIntent) + Send + Sync,
{
    fn send_intent(&self, intent: BotIntent) {
        self(intent)
    }
}

/// Sends each intent as a JSON text frame over a tokio channel
#[derive(Debug, Clone)]
pub struct JsonFrameSink {
    tx: mpsc::UnboundedSender<String>,
}

impl JsonFrameSink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl IntentSink for JsonFrameSink {
    fn send_intent(&self, intent: BotIntent) {
        let frame = match serde_json::to_string(&ClientMsg::BotIntent(intent)) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to serialize intent");
                return;
            }
        };
        if self.tx.send(frame).is_err() {
            debug!("Intent dropped, transport closed");
        }
    }
}

/// State shared between the protocol side and the bot thread
pub(crate) struct Shared {
    amounts: RemainingAmounts,
    snapshot: SnapshotSlot,
    intent: IntentAccumulator,
    gate: TurnGate,
    /// Latest tick received
    tick: Mutex<Option<TickEvent>>,
    running: AtomicBool,
    /// Next scan event may interrupt the handler that asked for it
    scan_interruptible: AtomicBool,
    sink: Box<dyn IntentSink>,
}

impl Shared {
    fn new(config: &SchedulerConfig, sink: Box<dyn IntentSink>) -> Self {
        Self {
            amounts: RemainingAmounts::new(),
            snapshot: SnapshotSlot::new(),
            intent: IntentAccumulator::new(config.limits),
            gate: TurnGate::new(),
            tick: Mutex::new(None),
            running: AtomicBool::new(false),
            scan_interruptible: AtomicBool::new(false),
            sink,
        }
    }

    fn bot_state(&self) -> BotState {
        self.tick
            .lock()
            .as_ref()
            .map(|tick| tick.bot_state)
            .unwrap_or_default()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Protocol-side handle of one bot's control loop
pub struct ActionScheduler {
    shared: Arc<Shared>,
    behavior: Arc<dyn BotBehavior>,
    context: Mutex<Option<ExecutionContext>>,
    teardown_grace: Duration,
}

impl ActionScheduler {
    pub fn new<B, S>(config: &SchedulerConfig, behavior: B, sink: S) -> Self
    where
        B: BotBehavior,
        S: IntentSink + 'static,
    {
        Self {
            shared: Arc::new(Shared::new(config, Box::new(sink))),
            behavior: Arc::new(behavior),
            context: Mutex::new(None),
            teardown_grace: config.teardown_grace,
        }
    }

    /// Process one message from the peer
    pub fn handle_server_msg(&self, msg: ServerMsg) {
        match msg {
            ServerMsg::RoundStarted { round_number } => {
                debug!(round = round_number, "Round started");
                self.shared.on_round_started();
            }
            ServerMsg::Tick(tick) => self.handle_tick(tick),
            ServerMsg::RoundEnded { round_number } => {
                debug!(round = round_number, "Round ended");
                self.stop_context("round ended");
            }
            ServerMsg::GameEnded => self.stop_context("game ended"),
            ServerMsg::GameAborted => self.stop_context("game aborted"),
            ServerMsg::Disconnected => self.stop_context("disconnected"),
        }
    }

    fn handle_tick(&self, tick: TickEvent) {
        let state = tick.bot_state;
        let round = tick.round_number;
        let turn = tick.turn_number;
        let events: Vec<BotEvent> = tick.events_by_priority().into_iter().cloned().collect();

        let previous_round = self
            .shared
            .tick
            .lock()
            .replace(tick)
            .map(|previous| previous.round_number);
        let first_turn = turn == 1 || previous_round != Some(round);

        if first_turn {
            self.stop_context("stale context");
            self.shared.reset_for_round(&state);
        }

        self.shared.recompute(&state);

        let mut died = false;
        for event in &events {
            match event {
                BotEvent::Death => {
                    died = true;
                    self.stop_context("death");
                }
                BotEvent::HitWall => self.shared.halt_movement(),
                BotEvent::HitBot { rammed: true, .. } => self.shared.halt_movement(),
                BotEvent::HitBot { .. } => {}
                BotEvent::BulletFired { firepower } => {
                    debug!(round, turn, firepower, "Bullet fired");
                }
            }
        }

        self.shared.gate.advance();

        if first_turn && !died {
            self.start_context(round);
        }
    }

    fn start_context(&self, round: u32) {
        let mut context = self.context.lock();
        self.shared.running.store(true, Ordering::SeqCst);
        match ExecutionContext::spawn(round, self.shared.clone(), self.behavior.clone()) {
            Ok(spawned) => *context = Some(spawned),
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                error!(round, error = %e, "Failed to spawn bot thread");
            }
        }
    }

    fn stop_context(&self, reason: &'static str) {
        let context = self.context.lock().take();
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(context) = context {
            context.teardown(&self.shared.gate, self.teardown_grace, reason);
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.snapshot.is_stopped()
    }

    pub fn distance_remaining(&self) -> f64 {
        self.shared.amounts.distance_remaining()
    }

    pub fn turn_remaining(&self, kind: TurnKind) -> f64 {
        self.shared.amounts.turn_remaining(kind)
    }

    /// Copy of the intent that the next commit will send
    pub fn intent(&self) -> BotIntent {
        self.shared.intent.snapshot()
    }

    /// Number of ticks processed so far
    pub fn turns_processed(&self) -> u64 {
        self.shared.gate.sequence()
    }
}

impl Drop for ActionScheduler {
    fn drop(&mut self) {
        if self.context.lock().is_some() {
            info!("Scheduler dropped with a live bot thread");
            self.stop_context("scheduler dropped");
        }
    }
}

impl std::fmt::Debug for ActionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionScheduler")
            .field("running", &self.is_running())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
