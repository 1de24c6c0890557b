//! Body physics applied by the loopback peer once per turn

use crate::motion::kinematics::{
    normalize_absolute, MAX_FIREPOWER, MAX_GUN_TURN_RATE, MAX_RADAR_TURN_RATE, MAX_SPEED,
    MAX_TURN_RATE, MIN_FIREPOWER,
};
use crate::protocol::{BotIntent, BotState};

/// Bot hitbox radius
pub const BOT_RADIUS: f64 = 18.0;
/// Gun heat a bot starts each round with
pub const INITIAL_GUN_HEAT: f64 = 3.0;
/// Gun heat shed per turn
pub const GUN_COOLING_RATE: f64 = 0.1;
/// Energy a bot starts each round with
pub const INITIAL_ENERGY: f64 = 100.0;

/// Intent values that persist until the bot changes them
#[derive(Debug, Clone, Copy, Default)]
pub struct StandingOrders {
    pub target_speed: f64,
    pub turn_rate: f64,
    pub gun_turn_rate: f64,
    pub radar_turn_rate: f64,
    pub adjust_gun_for_body_turn: bool,
    pub adjust_radar_for_body_turn: bool,
    pub adjust_radar_for_gun_turn: bool,
}

impl StandingOrders {
    /// Fold in the fields the bot set this turn
    pub fn merge(&mut self, intent: &BotIntent) {
        if let Some(v) = intent.target_speed {
            self.target_speed = v;
        }
        if let Some(v) = intent.turn_rate {
            self.turn_rate = v;
        }
        if let Some(v) = intent.gun_turn_rate {
            self.gun_turn_rate = v;
        }
        if let Some(v) = intent.radar_turn_rate {
            self.radar_turn_rate = v;
        }
        if let Some(v) = intent.adjust_gun_for_body_turn {
            self.adjust_gun_for_body_turn = v;
        }
        if let Some(v) = intent.adjust_radar_for_body_turn {
            self.adjust_radar_for_body_turn = v;
        }
        if let Some(v) = intent.adjust_radar_for_gun_turn {
            self.adjust_radar_for_gun_turn = v;
        }
    }
}

/// What happened to the body during one turn
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TurnOutcome {
    pub hit_wall: bool,
    /// Firepower of the shot fired, if any
    pub fired: Option<f64>,
}

/// Physics system for one rectangular arena
#[derive(Debug, Clone, Copy)]
pub struct BodyPhysics {
    width: f64,
    height: f64,
}

impl BodyPhysics {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Fresh body at a position and headings chosen by the caller
    pub fn spawn(&self, x: f64, y: f64, direction: f64, gun: f64, radar: f64) -> BotState {
        BotState {
            energy: INITIAL_ENERGY,
            x: x.clamp(BOT_RADIUS, self.width - BOT_RADIUS),
            y: y.clamp(BOT_RADIUS, self.height - BOT_RADIUS),
            direction: normalize_absolute(direction),
            gun_direction: normalize_absolute(gun),
            radar_direction: normalize_absolute(radar),
            gun_heat: INITIAL_GUN_HEAT,
            ..BotState::default()
        }
    }

    /// Advance the body by one turn
    pub fn step(&self, body: &mut BotState, orders: &StandingOrders, firepower: Option<f64>) -> TurnOutcome {
        let mut outcome = TurnOutcome::default();

        if body.is_disabled() {
            body.speed = 0.0;
            body.turn_rate = 0.0;
            body.gun_turn_rate = 0.0;
            body.radar_turn_rate = 0.0;
            return outcome;
        }

        // Gun
        match firepower {
            Some(power) if body.gun_heat <= 0.0 && body.energy >= power => {
                let power = power.clamp(MIN_FIREPOWER, MAX_FIREPOWER);
                body.energy = (body.energy - power).max(0.0);
                body.gun_heat = 1.0 + power / 5.0;
                outcome.fired = Some(power);
            }
            _ => body.gun_heat = (body.gun_heat - GUN_COOLING_RATE).max(0.0),
        }

        // Turning: gun rides on the body, radar rides on both
        let max_turn_rate = MAX_TURN_RATE - 0.75 * body.speed.abs();
        let turn_rate = orders.turn_rate.clamp(-max_turn_rate, max_turn_rate);
        let gun_turn_rate = orders
            .gun_turn_rate
            .clamp(-MAX_GUN_TURN_RATE, MAX_GUN_TURN_RATE);
        let radar_turn_rate = orders
            .radar_turn_rate
            .clamp(-MAX_RADAR_TURN_RATE, MAX_RADAR_TURN_RATE);

        let gun_carry = if orders.adjust_gun_for_body_turn { 0.0 } else { turn_rate };
        let mut radar_carry = 0.0;
        if !orders.adjust_radar_for_body_turn {
            radar_carry += turn_rate;
        }
        if !orders.adjust_radar_for_gun_turn {
            radar_carry += gun_turn_rate;
        }

        body.direction = normalize_absolute(body.direction + turn_rate);
        body.gun_direction = normalize_absolute(body.gun_direction + gun_turn_rate + gun_carry);
        body.radar_direction =
            normalize_absolute(body.radar_direction + radar_turn_rate + radar_carry);
        body.turn_rate = turn_rate;
        body.gun_turn_rate = gun_turn_rate;
        body.radar_turn_rate = radar_turn_rate;

        // Movement
        body.speed = Self::next_speed(body.speed, orders.target_speed);
        let heading = body.direction.to_radians();
        let x = body.x + body.speed * heading.cos();
        let y = body.y + body.speed * heading.sin();

        let clamped_x = x.clamp(BOT_RADIUS, self.width - BOT_RADIUS);
        let clamped_y = y.clamp(BOT_RADIUS, self.height - BOT_RADIUS);
        if clamped_x != x || clamped_y != y {
            body.speed = 0.0;
            outcome.hit_wall = true;
        }
        body.x = clamped_x;
        body.y = clamped_y;

        outcome
    }

    /// Speed after one turn of accelerating (+1) or braking (-2) toward `target`
    pub fn next_speed(speed: f64, target: f64) -> f64 {
        let target = target.clamp(-MAX_SPEED, MAX_SPEED);
        let next = if speed > 0.0 {
            target.clamp(speed - 2.0, speed + 1.0)
        } else if speed < 0.0 {
            target.clamp(speed - 1.0, speed + 2.0)
        } else {
            target.clamp(-1.0, 1.0)
        };
        next.clamp(-MAX_SPEED, MAX_SPEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn physics() -> BodyPhysics {
        BodyPhysics::new(800.0, 600.0)
    }

    #[test]
    fn speed_changes_are_rate_limited() {
        assert_eq!(BodyPhysics::next_speed(0.0, 8.0), 1.0);
        assert_eq!(BodyPhysics::next_speed(0.0, -8.0), -1.0);
        assert_eq!(BodyPhysics::next_speed(5.0, 0.0), 3.0);
        assert_eq!(BodyPhysics::next_speed(-5.0, 0.0), -3.0);
        assert_eq!(BodyPhysics::next_speed(8.0, 20.0), 8.0);
        assert_eq!(BodyPhysics::next_speed(1.0, -8.0), -1.0);
    }

    #[test]
    fn moves_along_heading() {
        let physics = physics();
        let mut body = physics.spawn(400.0, 300.0, 90.0, 90.0, 90.0);
        body.speed = 4.0;
        let orders = StandingOrders {
            target_speed: 5.0,
            ..StandingOrders::default()
        };

        let outcome = physics.step(&mut body, &orders, None);

        assert!(!outcome.hit_wall);
        assert_eq!(body.speed, 5.0);
        assert_abs_diff_eq!(body.x, 400.0, epsilon = 1e-9);
        assert_abs_diff_eq!(body.y, 305.0, epsilon = 1e-9);
    }

    #[test]
    fn wall_stops_the_body() {
        let physics = physics();
        let mut body = physics.spawn(785.0, 300.0, 0.0, 0.0, 0.0);
        body.speed = 8.0;
        let orders = StandingOrders {
            target_speed: 8.0,
            ..StandingOrders::default()
        };

        let outcome = physics.step(&mut body, &orders, None);

        assert!(outcome.hit_wall);
        assert_eq!(body.speed, 0.0);
        assert_eq!(body.x, 800.0 - BOT_RADIUS);
    }

    #[test]
    fn body_turn_is_limited_by_speed() {
        let physics = physics();
        let mut body = physics.spawn(400.0, 300.0, 0.0, 0.0, 0.0);
        body.speed = 8.0;
        let orders = StandingOrders {
            target_speed: 8.0,
            turn_rate: 10.0,
            ..StandingOrders::default()
        };

        physics.step(&mut body, &orders, None);

        assert_abs_diff_eq!(body.direction, 4.0);
        // Gun and radar are carried along
        assert_abs_diff_eq!(body.gun_direction, 4.0);
        assert_abs_diff_eq!(body.radar_direction, 4.0);
    }

    #[test]
    fn adjusted_gun_stays_put() {
        let physics = physics();
        let mut body = physics.spawn(400.0, 300.0, 0.0, 0.0, 0.0);
        let orders = StandingOrders {
            turn_rate: -10.0,
            adjust_gun_for_body_turn: true,
            adjust_radar_for_body_turn: true,
            ..StandingOrders::default()
        };

        physics.step(&mut body, &orders, None);

        assert_abs_diff_eq!(body.direction, 350.0);
        assert_eq!(body.gun_direction, 0.0);
        assert_eq!(body.radar_direction, 0.0);
    }

    #[test]
    fn firing_heats_the_gun() {
        let physics = physics();
        let mut body = physics.spawn(400.0, 300.0, 0.0, 0.0, 0.0);
        let orders = StandingOrders::default();

        // Starts hot: the request is ignored and the gun cools
        let outcome = physics.step(&mut body, &orders, Some(2.0));
        assert_eq!(outcome.fired, None);
        assert_abs_diff_eq!(body.gun_heat, INITIAL_GUN_HEAT - GUN_COOLING_RATE);

        body.gun_heat = 0.0;
        let outcome = physics.step(&mut body, &orders, Some(2.0));
        assert_eq!(outcome.fired, Some(2.0));
        assert_abs_diff_eq!(body.gun_heat, 1.4);
        assert_abs_diff_eq!(body.energy, INITIAL_ENERGY - 2.0);
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let mut orders = StandingOrders {
            target_speed: 6.0,
            turn_rate: 3.0,
            ..StandingOrders::default()
        };
        orders.merge(&BotIntent {
            turn_rate: Some(-2.0),
            adjust_radar_for_gun_turn: Some(true),
            ..BotIntent::default()
        });
        assert_eq!(orders.target_speed, 6.0);
        assert_eq!(orders.turn_rate, -2.0);
        assert!(orders.adjust_radar_for_gun_turn);
    }
}
