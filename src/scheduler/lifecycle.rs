//! Per-turn recompute and the interrupt handlers run on the protocol side

use std::sync::atomic::Ordering;

use crate::motion::remaining::{MovementChannel, TurnKind};
use crate::motion::snapshot::{IntentRates, Snapshot};
use crate::protocol::BotState;

use super::Shared;

impl Shared {
    /// Fold one tick into the remaining amounts and the pending intent.
    ///
    /// Frozen while a stop snapshot is live. Lock order is snapshot slot,
    /// then channel, then intent.
    pub(super) fn recompute(&self, state: &BotState) {
        let slot = self.snapshot.lock();
        if slot.is_some() {
            return;
        }

        if state.is_disabled() {
            self.amounts
                .reset(state.direction, state.gun_direction, state.radar_direction);
            return;
        }

        let headings = [
            (TurnKind::Body, state.direction),
            (TurnKind::Gun, state.gun_direction),
            (TurnKind::Radar, state.radar_direction),
        ];
        for (kind, heading) in headings {
            let mut channel = self.amounts.turn(kind);
            if let Some(rate) = channel.advance(heading) {
                self.intent.set_turn_rate(kind, rate);
            }
        }

        let kinematics = self.intent.kinematics();
        let mut movement = self.amounts.movement();
        if let Some(speed) = movement.advance(state.speed, &kinematics) {
            self.intent.set_target_speed(speed);
        }
    }

    /// Wall hit or ram: the move is over, as if it had arrived
    pub(super) fn halt_movement(&self) {
        let mut movement = self.amounts.movement();
        *movement = MovementChannel::default();
        self.intent.set_target_speed(0.0);
    }

    /// First tick of a round: drop any stop left over and start counting
    /// from the current headings
    pub(super) fn reset_for_round(&self, state: &BotState) {
        self.snapshot.discard();
        self.amounts
            .reset(state.direction, state.gun_direction, state.radar_direction);
    }

    pub(super) fn on_round_started(&self) {
        self.intent.reset_movement();
        self.snapshot.discard();
        self.scan_interruptible.store(false, Ordering::SeqCst);
    }

    /// Save every channel and the intent rates, then halt. No-op when stopped.
    pub(super) fn set_stop(&self) -> bool {
        let mut slot = self.snapshot.lock();
        if slot.is_some() {
            return false;
        }
        let rates = self.intent.replace_rates(IntentRates::halted());
        *slot = Some(Snapshot::capture(&self.amounts, rates));
        true
    }

    /// Restore what `set_stop` saved. No-op when not stopped.
    pub(super) fn set_resume(&self) -> bool {
        let mut slot = self.snapshot.lock();
        match slot.take() {
            Some(snapshot) => {
                let rates = snapshot.restore(&self.amounts);
                self.intent.replace_rates(rates);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::motion::remaining::Remaining;
    use crate::protocol::BotIntent;
    use approx::assert_abs_diff_eq;

    fn shared() -> Shared {
        Shared::new(&SchedulerConfig::default(), Box::new(|_: BotIntent| {}))
    }

    fn state(direction: f64, speed: f64) -> BotState {
        BotState {
            energy: 100.0,
            direction,
            gun_direction: direction,
            radar_direction: direction,
            speed,
            ..BotState::default()
        }
    }

    #[test]
    fn turn_rates_follow_remaining() {
        let shared = shared();
        shared.reset_for_round(&state(0.0, 0.0));
        shared.amounts.turn(TurnKind::Body).remaining = Remaining::Bounded(25.0);
        shared.amounts.turn(TurnKind::Radar).remaining = Remaining::Bounded(-90.0);

        shared.recompute(&state(10.0, 0.0));

        // Gun and radar were carried along by the body turn
        assert_eq!(shared.amounts.turn_remaining(TurnKind::Body), 15.0);
        assert_eq!(shared.intent.turn_rate(TurnKind::Body), Some(10.0));
        assert_eq!(shared.amounts.turn_remaining(TurnKind::Radar), -100.0);
        assert_eq!(shared.intent.turn_rate(TurnKind::Radar), Some(-45.0));
    }

    #[test]
    fn unbounded_turn_requests_max_rate() {
        let shared = shared();
        shared.reset_for_round(&state(0.0, 0.0));
        shared.amounts.turn(TurnKind::Gun).remaining = Remaining::from_value(f64::NEG_INFINITY);

        shared.recompute(&state(0.0, 0.0));

        assert_eq!(shared.intent.turn_rate(TurnKind::Gun), Some(-20.0));
        assert_eq!(shared.amounts.turn_remaining(TurnKind::Gun), f64::NEG_INFINITY);
    }

    #[test]
    fn disabled_bot_drops_all_motion() {
        let shared = shared();
        shared.movement_to(30.0);
        shared.amounts.turn(TurnKind::Body).remaining = Remaining::Bounded(45.0);

        let mut disabled = state(90.0, 0.0);
        disabled.energy = 0.0;
        shared.recompute(&disabled);

        assert_eq!(shared.amounts.distance_remaining(), 0.0);
        assert_eq!(shared.amounts.turn_remaining(TurnKind::Body), 0.0);
        assert_eq!(shared.amounts.turn(TurnKind::Body).previous_heading, 90.0);
    }

    #[test]
    fn wall_hit_cancels_any_move() {
        let shared = shared();
        shared.amounts.movement().remaining = Remaining::from_value(f64::INFINITY);
        shared.amounts.movement().rate_driven = true;
        shared.intent.set_target_speed(8.0);

        shared.halt_movement();

        assert_eq!(shared.amounts.distance_remaining(), 0.0);
        assert!(!shared.amounts.movement().rate_driven);
        assert_eq!(shared.intent.target_speed(), 0.0);
    }

    #[test]
    fn recompute_is_frozen_while_stopped() {
        let shared = shared();
        shared.reset_for_round(&state(0.0, 0.0));
        shared.movement_to(50.0);
        shared.intent.set_target_speed(8.0);

        assert!(shared.set_stop());
        assert!(!shared.set_stop());
        assert_eq!(shared.intent.target_speed(), 0.0);

        shared.recompute(&state(5.0, 2.0));
        assert_eq!(shared.amounts.distance_remaining(), 50.0);
        assert_eq!(shared.amounts.turn(TurnKind::Body).previous_heading, 0.0);

        assert!(shared.set_resume());
        assert!(!shared.set_resume());
        assert_eq!(shared.intent.target_speed(), 8.0);
        assert_abs_diff_eq!(shared.amounts.distance_remaining(), 50.0);
    }

    #[test]
    fn first_tick_clears_a_leftover_stop() {
        let shared = shared();
        shared.movement_to(30.0);
        assert!(shared.set_stop());

        shared.reset_for_round(&state(45.0, 0.0));
        assert!(!shared.snapshot.is_stopped());

        shared.movement_to(10.0);
        shared.recompute(&state(45.0, 0.0));
        assert_eq!(shared.intent.target_speed(), 1.0);
    }

    #[test]
    fn round_start_discards_snapshot_and_rates() {
        let shared = shared();
        shared.intent.set_turn_rate(TurnKind::Body, 5.0);
        shared.set_stop();
        shared.scan_interruptible.store(true, Ordering::SeqCst);

        shared.on_round_started();

        assert!(!shared.snapshot.is_stopped());
        assert_eq!(shared.intent.rates(), IntentRates::default());
        assert!(!shared.scan_interruptible.load(Ordering::SeqCst));
    }

    impl Shared {
        fn movement_to(&self, distance: f64) {
            self.amounts.movement().remaining = Remaining::Bounded(distance);
        }
    }
}
