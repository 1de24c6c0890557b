//! Per-turn intent accumulator

use parking_lot::Mutex;

use crate::motion::kinematics::{Kinematics, MotionLimits};
use crate::motion::remaining::TurnKind;
use crate::motion::snapshot::IntentRates;
use crate::protocol::BotIntent;

#[derive(Debug, Clone, Copy)]
struct Limits {
    /// Limits currently in force, lowered by the bot at will
    current: MotionLimits,
    /// Upper bound for `current`, from configuration
    ceilings: MotionLimits,
}

/// Standing and one-shot flags
#[derive(Debug, Clone, Copy, Default)]
struct Flags {
    rescan: Option<bool>,
    fire_assist: Option<bool>,
    adjust_gun_for_body_turn: Option<bool>,
    adjust_radar_for_body_turn: Option<bool>,
    adjust_radar_for_gun_turn: Option<bool>,
}

/// The intent being built for the next turn.
///
/// Written by the recompute on the protocol side and by user setters on the
/// bot thread; read once per committed turn. Every rate has its own guard so
/// the movement, body, gun and radar channels never wait on each other. No
/// method holds the limits lock while taking another one; methods that take
/// several rate guards take them in the order speed, body, gun, radar.
#[derive(Debug)]
pub struct IntentAccumulator {
    limits: Mutex<Limits>,
    target_speed: Mutex<Option<f64>>,
    turn_rate: Mutex<Option<f64>>,
    gun_turn_rate: Mutex<Option<f64>>,
    radar_turn_rate: Mutex<Option<f64>>,
    firepower: Mutex<Option<f64>>,
    flags: Mutex<Flags>,
}

impl IntentAccumulator {
    pub fn new(ceilings: MotionLimits) -> Self {
        let ceilings = ceilings.clamped_to_rules();
        Self {
            limits: Mutex::new(Limits {
                current: ceilings,
                ceilings,
            }),
            target_speed: Mutex::new(None),
            turn_rate: Mutex::new(None),
            gun_turn_rate: Mutex::new(None),
            radar_turn_rate: Mutex::new(None),
            firepower: Mutex::new(None),
            flags: Mutex::new(Flags::default()),
        }
    }

    fn rate_slot(&self, kind: TurnKind) -> &Mutex<Option<f64>> {
        match kind {
            TurnKind::Body => &self.turn_rate,
            TurnKind::Gun => &self.gun_turn_rate,
            TurnKind::Radar => &self.radar_turn_rate,
        }
    }

    /// Kinematics over the limits currently in force
    pub fn kinematics(&self) -> Kinematics {
        Kinematics::new(self.limits())
    }

    pub fn limits(&self) -> MotionLimits {
        self.limits.lock().current
    }

    pub fn set_max_speed(&self, max_speed: f64) {
        let mut limits = self.limits.lock();
        limits.current.max_speed = max_speed.clamp(0.0, limits.ceilings.max_speed);
    }

    pub fn set_max_turn_rate(&self, kind: TurnKind, rate: f64) {
        let mut limits = self.limits.lock();
        let ceilings = limits.ceilings;
        match kind {
            TurnKind::Body => {
                limits.current.max_turn_rate = rate.clamp(0.0, ceilings.max_turn_rate)
            }
            TurnKind::Gun => {
                limits.current.max_gun_turn_rate = rate.clamp(0.0, ceilings.max_gun_turn_rate)
            }
            TurnKind::Radar => {
                limits.current.max_radar_turn_rate =
                    rate.clamp(0.0, ceilings.max_radar_turn_rate)
            }
        }
    }

    /// Target speed, clamped to the current max speed
    pub fn set_target_speed(&self, speed: f64) {
        let max = self.limits().max_speed;
        *self.target_speed.lock() = Some(speed.clamp(-max, max));
    }

    /// Turn rate for one channel, clamped to its current max rate
    pub fn set_turn_rate(&self, kind: TurnKind, rate: f64) {
        let max = max_rate(&self.limits(), kind);
        *self.rate_slot(kind).lock() = Some(rate.clamp(-max, max));
    }

    pub fn target_speed(&self) -> f64 {
        self.target_speed.lock().unwrap_or(0.0)
    }

    pub fn turn_rate(&self, kind: TurnKind) -> Option<f64> {
        *self.rate_slot(kind).lock()
    }

    pub fn set_firepower(&self, firepower: f64) {
        *self.firepower.lock() = Some(firepower);
    }

    pub fn firepower(&self) -> Option<f64> {
        *self.firepower.lock()
    }

    pub fn set_rescan(&self) {
        self.flags.lock().rescan = Some(true);
    }

    pub fn set_fire_assist(&self, enabled: bool) {
        self.flags.lock().fire_assist = Some(enabled);
    }

    pub fn set_adjust_gun_for_body_turn(&self, adjust: bool) {
        self.flags.lock().adjust_gun_for_body_turn = Some(adjust);
    }

    pub fn set_adjust_radar_for_body_turn(&self, adjust: bool) {
        self.flags.lock().adjust_radar_for_body_turn = Some(adjust);
    }

    /// Adjusting the radar for the gun turns fire assist the other way
    pub fn set_adjust_radar_for_gun_turn(&self, adjust: bool) {
        let mut flags = self.flags.lock();
        flags.adjust_radar_for_gun_turn = Some(adjust);
        flags.fire_assist = Some(!adjust);
    }

    pub fn rates(&self) -> IntentRates {
        IntentRates {
            target_speed: *self.target_speed.lock(),
            turn_rate: *self.turn_rate.lock(),
            gun_turn_rate: *self.gun_turn_rate.lock(),
            radar_turn_rate: *self.radar_turn_rate.lock(),
        }
    }

    /// Overwrite the four rates verbatim, returning the previous ones
    pub fn replace_rates(&self, rates: IntentRates) -> IntentRates {
        let mut target_speed = self.target_speed.lock();
        let mut turn_rate = self.turn_rate.lock();
        let mut gun_turn_rate = self.gun_turn_rate.lock();
        let mut radar_turn_rate = self.radar_turn_rate.lock();
        IntentRates {
            target_speed: std::mem::replace(&mut *target_speed, rates.target_speed),
            turn_rate: std::mem::replace(&mut *turn_rate, rates.turn_rate),
            gun_turn_rate: std::mem::replace(&mut *gun_turn_rate, rates.gun_turn_rate),
            radar_turn_rate: std::mem::replace(&mut *radar_turn_rate, rates.radar_turn_rate),
        }
    }

    /// Forget the standing rates and any pending shot
    pub fn reset_movement(&self) {
        *self.firepower.lock() = None;
        self.replace_rates(IntentRates::default());
    }

    /// Copy of the pending intent
    pub fn snapshot(&self) -> BotIntent {
        let rates = self.rates();
        let flags = *self.flags.lock();
        BotIntent {
            target_speed: rates.target_speed,
            turn_rate: rates.turn_rate,
            gun_turn_rate: rates.gun_turn_rate,
            radar_turn_rate: rates.radar_turn_rate,
            firepower: self.firepower(),
            rescan: flags.rescan,
            fire_assist: flags.fire_assist,
            adjust_gun_for_body_turn: flags.adjust_gun_for_body_turn,
            adjust_radar_for_body_turn: flags.adjust_radar_for_body_turn,
            adjust_radar_for_gun_turn: flags.adjust_radar_for_gun_turn,
        }
    }

    /// Take the intent for the turn being committed.
    ///
    /// One-shot requests (fire, rescan) are cleared; standing rates and flags
    /// carry over to the next turn.
    pub fn commit(&self) -> BotIntent {
        let mut intent = self.snapshot();
        intent.firepower = self.firepower.lock().take();
        intent.rescan = self.flags.lock().rescan.take();
        intent
    }
}

fn max_rate(limits: &MotionLimits, kind: TurnKind) -> f64 {
    match kind {
        TurnKind::Body => limits.max_turn_rate,
        TurnKind::Gun => limits.max_gun_turn_rate,
        TurnKind::Radar => limits.max_radar_turn_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulator() -> IntentAccumulator {
        IntentAccumulator::new(MotionLimits::rules())
    }

    #[test]
    fn rates_are_clamped_to_current_limits() {
        let intent = accumulator();
        intent.set_target_speed(f64::INFINITY);
        intent.set_turn_rate(TurnKind::Gun, -100.0);
        assert_eq!(intent.target_speed(), 8.0);
        assert_eq!(intent.turn_rate(TurnKind::Gun), Some(-20.0));

        intent.set_max_speed(5.0);
        intent.set_target_speed(-7.0);
        assert_eq!(intent.target_speed(), -5.0);
        assert_eq!(intent.kinematics().limits().max_speed, 5.0);
    }

    #[test]
    fn max_limits_never_exceed_ceilings() {
        let intent = IntentAccumulator::new(MotionLimits {
            max_radar_turn_rate: 30.0,
            ..MotionLimits::rules()
        });
        intent.set_max_turn_rate(TurnKind::Radar, 45.0);
        intent.set_max_speed(-3.0);
        assert_eq!(intent.limits().max_radar_turn_rate, 30.0);
        assert_eq!(intent.limits().max_speed, 0.0);
    }

    #[test]
    fn commit_clears_one_shot_requests_only() {
        let intent = accumulator();
        intent.set_target_speed(3.0);
        intent.set_firepower(1.5);
        intent.set_rescan();
        intent.set_fire_assist(true);

        let sent = intent.commit();
        assert_eq!(sent.firepower, Some(1.5));
        assert_eq!(sent.rescan, Some(true));

        let next = intent.snapshot();
        assert_eq!(next.firepower, None);
        assert_eq!(next.rescan, None);
        assert_eq!(next.target_speed, Some(3.0));
        assert_eq!(next.fire_assist, Some(true));
    }

    #[test]
    fn radar_for_gun_adjustment_flips_fire_assist() {
        let intent = accumulator();
        intent.set_adjust_radar_for_gun_turn(true);
        let pending = intent.snapshot();
        assert_eq!(pending.adjust_radar_for_gun_turn, Some(true));
        assert_eq!(pending.fire_assist, Some(false));
    }

    #[test]
    fn replace_rates_swaps_all_four() {
        let intent = accumulator();
        intent.set_target_speed(6.0);
        intent.set_turn_rate(TurnKind::Body, 4.0);

        let saved = intent.replace_rates(IntentRates::halted());
        assert_eq!(saved.target_speed, Some(6.0));
        assert_eq!(saved.turn_rate, Some(4.0));
        assert_eq!(saved.radar_turn_rate, None);
        assert_eq!(intent.rates(), IntentRates::halted());

        intent.replace_rates(saved);
        assert_eq!(intent.rates(), saved);
    }

    #[test]
    fn channels_do_not_share_a_lock() {
        let intent = accumulator();
        let _gun = intent.gun_turn_rate.lock();
        intent.set_target_speed(3.0);
        intent.set_turn_rate(TurnKind::Radar, -12.0);
        assert_eq!(intent.target_speed(), 3.0);
        assert_eq!(intent.turn_rate(TurnKind::Radar), Some(-12.0));
    }

    #[test]
    fn reset_movement_forgets_rates_and_shot() {
        let intent = accumulator();
        intent.set_target_speed(6.0);
        intent.set_firepower(2.0);
        intent.reset_movement();
        assert_eq!(intent.rates(), IntentRates::default());
        assert_eq!(intent.firepower(), None);
    }
}
