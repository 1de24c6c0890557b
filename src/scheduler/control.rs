//! User-facing bot commands
//!
//! `set_*` methods only update the pending intent and the remaining amounts.
//! Their blocking counterparts commit turns until the command has completed,
//! the bot is stopped, or the execution context is cancelled.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::motion::remaining::{Remaining, TurnKind};
use crate::protocol::{BotIntent, BotState};

use super::turn::CancellationToken;
use super::{BotError, Shared};

fn require_number(value: f64, name: &'static str) -> Result<f64, BotError> {
    if value.is_nan() {
        Err(BotError::InvalidArgument(name))
    } else {
        Ok(value)
    }
}

/// Handle given to bot code for the duration of one round
#[derive(Clone)]
pub struct BotControl {
    shared: Arc<Shared>,
    token: CancellationToken,
}

impl BotControl {
    pub(crate) fn new(shared: Arc<Shared>, token: CancellationToken) -> Self {
        Self { shared, token }
    }

    fn ensure_live(&self) -> Result<(), BotError> {
        if self.token.is_cancelled() {
            Err(BotError::NotRunning)
        } else {
            Ok(())
        }
    }

    // === Turn commit ===

    /// Send the pending intent and block until the next tick is processed
    pub fn go(&self) -> Result<(), BotError> {
        self.ensure_live()?;
        let seen = self.shared.gate.sequence();
        let intent = self.shared.intent.commit();
        self.shared.sink.send_intent(intent);
        self.shared.gate.wait_past(seen, &self.token)?;
        Ok(())
    }

    /// Commit turns until `condition` holds or the bot stops running.
    /// At least one turn is committed.
    pub fn wait_for<F>(&self, mut condition: F) -> Result<(), BotError>
    where
        F: FnMut() -> bool,
    {
        loop {
            self.go()?;
            if !self.is_running() || condition() {
                return Ok(());
            }
        }
    }

    // === Movement ===

    pub fn set_forward(&self, distance: f64) -> Result<(), BotError> {
        let distance = require_number(distance, "distance")?;
        self.ensure_live()?;

        let kinematics = self.shared.intent.kinematics();
        let speed = self.speed();
        let mut movement = self.shared.amounts.movement();
        movement.remaining = Remaining::from_value(distance);
        // Already too fast to stop in time: the halt ends the move
        movement.overdriving = kinematics.overdrives(speed, distance);
        movement.rate_driven = false;
        self.shared
            .intent
            .set_target_speed(kinematics.cruise_speed(distance));
        Ok(())
    }

    pub fn set_back(&self, distance: f64) -> Result<(), BotError> {
        self.set_forward(-require_number(distance, "distance")?)
    }

    /// Move `distance` units and come to a halt
    pub fn forward(&self, distance: f64) -> Result<(), BotError> {
        if self.is_stopped() {
            return self.go();
        }
        self.set_forward(distance)?;
        loop {
            self.go()?;
            if !self.is_running() || (self.distance_remaining() == 0.0 && self.speed() == 0.0) {
                return Ok(());
            }
        }
    }

    pub fn back(&self, distance: f64) -> Result<(), BotError> {
        self.forward(-require_number(distance, "distance")?)
    }

    /// Drive at `speed` until told otherwise
    pub fn set_target_speed(&self, speed: f64) -> Result<(), BotError> {
        let speed = require_number(speed, "target speed")?;
        self.ensure_live()?;

        let mut movement = self.shared.amounts.movement();
        movement.remaining = Remaining::from_rate(speed);
        movement.overdriving = false;
        movement.rate_driven = true;
        self.shared.intent.set_target_speed(speed);
        Ok(())
    }

    pub fn set_max_speed(&self, max_speed: f64) -> Result<(), BotError> {
        let max_speed = require_number(max_speed, "max speed")?;
        self.ensure_live()?;
        self.shared.intent.set_max_speed(max_speed);
        Ok(())
    }

    // === Turning ===

    /// Turn a channel `degrees` to the left; negative turns right
    pub fn set_turn(&self, kind: TurnKind, degrees: f64) -> Result<(), BotError> {
        let degrees = require_number(degrees, "degrees")?;
        self.ensure_live()?;

        let mut channel = self.shared.amounts.turn(kind);
        channel.remaining = Remaining::from_value(degrees);
        channel.rate_driven = false;
        self.shared.intent.set_turn_rate(kind, degrees);
        Ok(())
    }

    /// Blocking form of [`BotControl::set_turn`]
    pub fn turn(&self, kind: TurnKind, degrees: f64) -> Result<(), BotError> {
        if self.is_stopped() {
            return self.go();
        }
        self.set_turn(kind, degrees)?;
        loop {
            self.go()?;
            if !self.is_running() || self.turn_remaining(kind) == 0.0 {
                return Ok(());
            }
        }
    }

    /// Turn a channel at `rate` degrees per turn until told otherwise
    pub fn set_rate(&self, kind: TurnKind, rate: f64) -> Result<(), BotError> {
        let rate = require_number(rate, "turn rate")?;
        self.ensure_live()?;

        let mut channel = self.shared.amounts.turn(kind);
        channel.remaining = Remaining::from_rate(rate);
        channel.rate_driven = true;
        self.shared.intent.set_turn_rate(kind, rate);
        Ok(())
    }

    pub fn set_max_rate(&self, kind: TurnKind, rate: f64) -> Result<(), BotError> {
        let rate = require_number(rate, "max turn rate")?;
        self.ensure_live()?;
        self.shared.intent.set_max_turn_rate(kind, rate);
        Ok(())
    }

    pub fn set_turn_left(&self, degrees: f64) -> Result<(), BotError> {
        self.set_turn(TurnKind::Body, degrees)
    }

    pub fn set_turn_right(&self, degrees: f64) -> Result<(), BotError> {
        self.set_turn(TurnKind::Body, -require_number(degrees, "degrees")?)
    }

    pub fn turn_left(&self, degrees: f64) -> Result<(), BotError> {
        self.turn(TurnKind::Body, degrees)
    }

    pub fn turn_right(&self, degrees: f64) -> Result<(), BotError> {
        self.turn(TurnKind::Body, -require_number(degrees, "degrees")?)
    }

    pub fn set_turn_gun_left(&self, degrees: f64) -> Result<(), BotError> {
        self.set_turn(TurnKind::Gun, degrees)
    }

    pub fn set_turn_gun_right(&self, degrees: f64) -> Result<(), BotError> {
        self.set_turn(TurnKind::Gun, -require_number(degrees, "degrees")?)
    }

    pub fn turn_gun_left(&self, degrees: f64) -> Result<(), BotError> {
        self.turn(TurnKind::Gun, degrees)
    }

    pub fn turn_gun_right(&self, degrees: f64) -> Result<(), BotError> {
        self.turn(TurnKind::Gun, -require_number(degrees, "degrees")?)
    }

    pub fn set_turn_radar_left(&self, degrees: f64) -> Result<(), BotError> {
        self.set_turn(TurnKind::Radar, degrees)
    }

    pub fn set_turn_radar_right(&self, degrees: f64) -> Result<(), BotError> {
        self.set_turn(TurnKind::Radar, -require_number(degrees, "degrees")?)
    }

    pub fn turn_radar_left(&self, degrees: f64) -> Result<(), BotError> {
        self.turn(TurnKind::Radar, degrees)
    }

    pub fn turn_radar_right(&self, degrees: f64) -> Result<(), BotError> {
        self.turn(TurnKind::Radar, -require_number(degrees, "degrees")?)
    }

    pub fn set_turn_rate(&self, rate: f64) -> Result<(), BotError> {
        self.set_rate(TurnKind::Body, rate)
    }

    pub fn set_gun_turn_rate(&self, rate: f64) -> Result<(), BotError> {
        self.set_rate(TurnKind::Gun, rate)
    }

    pub fn set_radar_turn_rate(&self, rate: f64) -> Result<(), BotError> {
        self.set_rate(TurnKind::Radar, rate)
    }

    // === Gun and radar ===

    /// Request a shot for the next turn. Refused while the gun is hot or
    /// when energy is short of `firepower`.
    pub fn set_fire(&self, firepower: f64) -> Result<bool, BotError> {
        let firepower = require_number(firepower, "firepower")?;
        self.ensure_live()?;

        let state = self.shared.bot_state();
        if state.energy < firepower || state.gun_heat > 0.0 {
            return Ok(false);
        }
        self.shared.intent.set_firepower(firepower);
        Ok(true)
    }

    /// Fire and commit the turn; returns whether the shot was accepted
    pub fn fire(&self, firepower: f64) -> Result<bool, BotError> {
        let accepted = self.set_fire(firepower)?;
        if accepted {
            self.go()?;
        }
        Ok(accepted)
    }

    pub fn set_rescan(&self) -> Result<(), BotError> {
        self.ensure_live()?;
        self.shared.intent.set_rescan();
        Ok(())
    }

    /// Rescan and let the resulting scan interrupt the current handler
    pub fn rescan(&self) -> Result<(), BotError> {
        self.ensure_live()?;
        self.shared.scan_interruptible.store(true, Ordering::SeqCst);
        self.set_rescan()?;
        self.go()
    }

    pub fn set_fire_assist(&self, enabled: bool) -> Result<(), BotError> {
        self.ensure_live()?;
        self.shared.intent.set_fire_assist(enabled);
        Ok(())
    }

    pub fn set_adjust_gun_for_body_turn(&self, adjust: bool) -> Result<(), BotError> {
        self.ensure_live()?;
        self.shared.intent.set_adjust_gun_for_body_turn(adjust);
        Ok(())
    }

    pub fn set_adjust_radar_for_body_turn(&self, adjust: bool) -> Result<(), BotError> {
        self.ensure_live()?;
        self.shared.intent.set_adjust_radar_for_body_turn(adjust);
        Ok(())
    }

    pub fn set_adjust_radar_for_gun_turn(&self, adjust: bool) -> Result<(), BotError> {
        self.ensure_live()?;
        self.shared.intent.set_adjust_radar_for_gun_turn(adjust);
        Ok(())
    }

    // === Stop / resume ===

    /// Freeze all motion, saving it for [`BotControl::set_resume`]
    pub fn set_stop(&self) -> Result<(), BotError> {
        self.ensure_live()?;
        self.shared.set_stop();
        Ok(())
    }

    pub fn set_resume(&self) -> Result<(), BotError> {
        self.ensure_live()?;
        self.shared.set_resume();
        Ok(())
    }

    pub fn stop(&self) -> Result<(), BotError> {
        self.set_stop()?;
        self.go()
    }

    pub fn resume(&self) -> Result<(), BotError> {
        self.set_resume()?;
        self.go()
    }

    // === State ===

    pub fn is_running(&self) -> bool {
        self.shared.is_running() && !self.token.is_cancelled()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.snapshot.is_stopped()
    }

    pub fn is_scan_interruptible(&self) -> bool {
        self.shared.scan_interruptible.load(Ordering::SeqCst)
    }

    pub fn distance_remaining(&self) -> f64 {
        self.shared.amounts.distance_remaining()
    }

    pub fn turn_remaining(&self, kind: TurnKind) -> f64 {
        self.shared.amounts.turn_remaining(kind)
    }

    pub fn gun_turn_remaining(&self) -> f64 {
        self.turn_remaining(TurnKind::Gun)
    }

    pub fn radar_turn_remaining(&self) -> f64 {
        self.turn_remaining(TurnKind::Radar)
    }

    /// Bot state from the latest tick
    pub fn state(&self) -> BotState {
        self.shared.bot_state()
    }

    pub fn energy(&self) -> f64 {
        self.state().energy
    }

    pub fn x(&self) -> f64 {
        self.state().x
    }

    pub fn y(&self) -> f64 {
        self.state().y
    }

    pub fn direction(&self) -> f64 {
        self.state().direction
    }

    pub fn gun_direction(&self) -> f64 {
        self.state().gun_direction
    }

    pub fn radar_direction(&self) -> f64 {
        self.state().radar_direction
    }

    pub fn speed(&self) -> f64 {
        self.state().speed
    }

    pub fn gun_heat(&self) -> f64 {
        self.state().gun_heat
    }

    pub fn is_disabled(&self) -> bool {
        self.state().is_disabled()
    }

    pub fn round_number(&self) -> u32 {
        self.shared
            .tick
            .lock()
            .as_ref()
            .map_or(0, |tick| tick.round_number)
    }

    pub fn turn_number(&self) -> u32 {
        self.shared
            .tick
            .lock()
            .as_ref()
            .map_or(0, |tick| tick.turn_number)
    }

    pub fn target_speed(&self) -> f64 {
        self.shared.intent.target_speed()
    }

    /// Pending turn rate if one was set this turn, otherwise the observed one
    pub fn turn_rate(&self, kind: TurnKind) -> f64 {
        self.shared.intent.turn_rate(kind).unwrap_or_else(|| {
            let state = self.state();
            match kind {
                TurnKind::Body => state.turn_rate,
                TurnKind::Gun => state.gun_turn_rate,
                TurnKind::Radar => state.radar_turn_rate,
            }
        })
    }

    /// Pending firepower, if a shot was accepted this turn
    pub fn firepower(&self) -> Option<f64> {
        self.shared.intent.firepower()
    }

    pub fn max_speed(&self) -> f64 {
        self.shared.intent.limits().max_speed
    }

    /// Copy of the pending intent, flags included
    pub fn intent(&self) -> BotIntent {
        self.shared.intent.snapshot()
    }
}

impl std::fmt::Debug for BotControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotControl")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
