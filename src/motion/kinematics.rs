//! Speed planning and heading arithmetic used by the per-turn recompute

/// Maximum speed in units per turn
pub const MAX_SPEED: f64 = 8.0;
/// Speed gained per turn when accelerating
pub const ACCELERATION: f64 = 1.0;
/// Speed shed per turn when braking (absolute value)
pub const DECELERATION: f64 = 2.0;
/// Maximum body turn rate in degrees per turn
pub const MAX_TURN_RATE: f64 = 10.0;
/// Maximum gun turn rate in degrees per turn
pub const MAX_GUN_TURN_RATE: f64 = 20.0;
/// Maximum radar turn rate in degrees per turn
pub const MAX_RADAR_TURN_RATE: f64 = 45.0;
/// Lowest accepted firepower
pub const MIN_FIREPOWER: f64 = 0.1;
/// Highest accepted firepower
pub const MAX_FIREPOWER: f64 = 3.0;

/// Remaining amounts closer to zero than this are snapped to zero.
///
/// Well above the rounding noise of [`Kinematics::next_speed`] (which lands on
/// exact zero for every reachable state) and well below anything a bot can
/// observe on the field.
pub const NEAR_ZERO: f64 = 1e-5;

/// Whether a value is within [`NEAR_ZERO`] of zero
pub fn is_near_zero(value: f64) -> bool {
    value.abs() < NEAR_ZERO
}

/// Movement and turning limits for one bot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionLimits {
    /// Maximum speed (units per turn)
    pub max_speed: f64,
    /// Acceleration per turn
    pub acceleration: f64,
    /// Deceleration per turn (absolute)
    pub deceleration: f64,
    /// Maximum body turn rate (degrees per turn)
    pub max_turn_rate: f64,
    /// Maximum gun turn rate (degrees per turn)
    pub max_gun_turn_rate: f64,
    /// Maximum radar turn rate (degrees per turn)
    pub max_radar_turn_rate: f64,
}

impl MotionLimits {
    /// Limits of the game rules
    pub fn rules() -> Self {
        Self {
            max_speed: MAX_SPEED,
            acceleration: ACCELERATION,
            deceleration: DECELERATION,
            max_turn_rate: MAX_TURN_RATE,
            max_gun_turn_rate: MAX_GUN_TURN_RATE,
            max_radar_turn_rate: MAX_RADAR_TURN_RATE,
        }
    }

    /// Clamp user supplied limits so they never exceed the rules
    pub fn clamped_to_rules(self) -> Self {
        let rules = Self::rules();
        Self {
            max_speed: self.max_speed.clamp(0.0, rules.max_speed),
            acceleration: rules.acceleration,
            deceleration: rules.deceleration,
            max_turn_rate: self.max_turn_rate.clamp(0.0, rules.max_turn_rate),
            max_gun_turn_rate: self.max_gun_turn_rate.clamp(0.0, rules.max_gun_turn_rate),
            max_radar_turn_rate: self
                .max_radar_turn_rate
                .clamp(0.0, rules.max_radar_turn_rate),
        }
    }
}

impl Default for MotionLimits {
    fn default() -> Self {
        Self::rules()
    }
}

/// Pure kinematics over a fixed set of limits
#[derive(Debug, Clone, Copy)]
pub struct Kinematics {
    limits: MotionLimits,
}

impl Kinematics {
    pub fn new(limits: MotionLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &MotionLimits {
        &self.limits
    }

    /// Speed to hold during the coming turn given the distance left to travel.
    ///
    /// Picks the largest speed from which the bot can still brake to a halt at
    /// exactly `distance`, bounded by one turn of acceleration or braking from
    /// `speed`. An infinite distance asks for full speed in its direction.
    pub fn next_speed(&self, speed: f64, distance: f64) -> f64 {
        if distance < 0.0 {
            return -self.next_speed(-speed, -distance);
        }

        let max_speed = self.limits.max_speed;
        let target = if distance.is_infinite() {
            max_speed
        } else {
            self.max_speed_for_distance(distance).min(max_speed)
        };

        if speed >= 0.0 {
            target.clamp(
                speed - self.limits.deceleration,
                speed + self.limits.acceleration,
            )
        } else {
            target.clamp(
                speed - self.limits.acceleration,
                speed + self.max_deceleration(-speed),
            )
        }
    }

    /// Speed the bot may command right now toward `distance`, before the
    /// acceleration limit of the coming turn is applied
    pub fn cruise_speed(&self, distance: f64) -> f64 {
        if distance.is_infinite() {
            return self.limits.max_speed.copysign(distance);
        }
        self.max_speed_for_distance(distance.abs())
            .min(self.limits.max_speed)
            .copysign(distance)
    }

    /// Distance covered while braking from `speed` to a standstill
    pub fn overdrive_distance(&self, speed: f64) -> f64 {
        let mut speed = speed.abs();
        let mut distance = 0.0;
        while speed > 0.0 {
            speed = self.next_speed(speed, 0.0);
            distance += speed;
        }
        distance
    }

    /// Whether moving at `speed` and then braking carries the bot past
    /// `distance`. Only meaningful when both point the same way.
    pub fn overdrives(&self, speed: f64, distance: f64) -> bool {
        speed * distance >= 0.0
            && speed.abs() + self.overdrive_distance(speed) > distance.abs() + f64::EPSILON.sqrt()
    }

    /// Signed shortest turn from `previous` to `heading`, in (-180, 180]
    pub fn angle_delta(heading: f64, previous: f64) -> f64 {
        normalize_relative(heading - previous)
    }

    /// Highest speed from which moving this turn and then braking every turn
    /// covers exactly `distance`
    fn max_speed_for_distance(&self, distance: f64) -> f64 {
        let deceleration = self.limits.deceleration;
        let deceleration_time =
            (((4.0 * 2.0 / deceleration) * distance + 1.0).sqrt() - 1.0) / 2.0;
        let deceleration_time = deceleration_time.ceil().max(1.0);
        if deceleration_time.is_infinite() {
            return self.limits.max_speed;
        }

        let deceleration_distance =
            (deceleration_time / 2.0) * (deceleration_time - 1.0) * deceleration;
        (deceleration_time - 1.0) * deceleration
            + (distance - deceleration_distance) / deceleration_time
    }

    /// Largest speed change available this turn when moving against the
    /// requested direction: brake to zero, then accelerate with what is left
    fn max_deceleration(&self, speed: f64) -> f64 {
        let deceleration_time = speed / self.limits.deceleration;
        let acceleration_time = 1.0 - deceleration_time;

        deceleration_time.min(1.0) * self.limits.deceleration
            + acceleration_time.max(0.0) * self.limits.acceleration
    }
}

impl Default for Kinematics {
    fn default() -> Self {
        Self::new(MotionLimits::rules())
    }
}

/// Normalize an angle to (-180, 180]
pub fn normalize_relative(angle: f64) -> f64 {
    let angle = angle.rem_euclid(360.0);
    if angle > 180.0 {
        angle - 360.0
    } else {
        angle
    }
}

/// Normalize an angle to [0, 360)
pub fn normalize_absolute(angle: f64) -> f64 {
    let angle = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if angle >= 360.0 {
        0.0
    } else {
        angle
    }
}
