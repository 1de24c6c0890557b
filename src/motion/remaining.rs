//! Remaining distance and turn amounts, one guard per channel

use parking_lot::{Mutex, MutexGuard};

use super::kinematics::{is_near_zero, Kinematics};

/// Direction of an unbounded move or turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Forward, or left for turns
    Positive,
    /// Backward, or right for turns
    Negative,
}

impl Direction {
    pub fn signum(self) -> f64 {
        match self {
            Direction::Positive => 1.0,
            Direction::Negative => -1.0,
        }
    }
}

/// How much of a commanded move or turn is left
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Remaining {
    /// A finite amount, signed
    Bounded(f64),
    /// Keep going in this direction until told otherwise
    Unbounded(Direction),
}

impl Remaining {
    pub const ZERO: Remaining = Remaining::Bounded(0.0);

    /// Map a (non-NaN) value onto the tri-state; infinities become unbounded
    pub fn from_value(value: f64) -> Self {
        if value == f64::INFINITY {
            Remaining::Unbounded(Direction::Positive)
        } else if value == f64::NEG_INFINITY {
            Remaining::Unbounded(Direction::Negative)
        } else {
            Remaining::Bounded(value)
        }
    }

    /// Unbounded in the sign of `rate`, zero for a zero rate
    pub fn from_rate(rate: f64) -> Self {
        if rate > 0.0 {
            Remaining::Unbounded(Direction::Positive)
        } else if rate < 0.0 {
            Remaining::Unbounded(Direction::Negative)
        } else {
            Remaining::ZERO
        }
    }

    /// Scalar view, with signed infinity for unbounded amounts
    pub fn value(self) -> f64 {
        match self {
            Remaining::Bounded(v) => v,
            Remaining::Unbounded(dir) => f64::INFINITY * dir.signum(),
        }
    }

    pub fn is_zero(self) -> bool {
        matches!(self, Remaining::Bounded(v) if v == 0.0)
    }
}

impl Default for Remaining {
    fn default() -> Self {
        Remaining::ZERO
    }
}

/// The three turning channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Body,
    Gun,
    Radar,
}

impl TurnKind {
    pub const ALL: [TurnKind; 3] = [TurnKind::Body, TurnKind::Gun, TurnKind::Radar];
}

/// State of the movement channel
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementChannel {
    pub remaining: Remaining,
    /// Current speed would carry the bot past its remaining distance
    pub overdriving: bool,
    /// Target speed was set directly and must not be recomputed
    pub rate_driven: bool,
}

/// State of one turning channel
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnChannel {
    pub remaining: Remaining,
    /// Heading observed at the start of the current turn
    pub previous_heading: f64,
    /// Turn rate was set directly and must not be recomputed
    pub rate_driven: bool,
}

impl TurnChannel {
    /// Subtract the heading change achieved since the last observation.
    ///
    /// Returns the new turn rate to request, or `None` when the channel is
    /// rate driven and its intent must be left alone.
    pub fn advance(&mut self, heading: f64) -> Option<f64> {
        let delta = Kinematics::angle_delta(heading, self.previous_heading);
        self.previous_heading = heading;

        if self.rate_driven {
            return None;
        }

        match self.remaining {
            Remaining::Bounded(remaining) => {
                let remaining = if remaining.abs() <= delta.abs() {
                    0.0
                } else {
                    let left = remaining - delta;
                    if is_near_zero(left) {
                        0.0
                    } else {
                        left
                    }
                };
                self.remaining = Remaining::Bounded(remaining);
                Some(remaining)
            }
            // Keep turning; the intent setter clamps this to the max rate
            Remaining::Unbounded(dir) => Some(f64::INFINITY * dir.signum()),
        }
    }
}

impl MovementChannel {
    /// Account for the distance covered last turn and plan the next speed.
    ///
    /// `speed` is the speed echoed by the latest tick, i.e. the distance the
    /// bot actually travelled during the turn that just ended. Returns the
    /// target speed to request, or `None` when the channel is rate driven.
    pub fn advance(&mut self, speed: f64, kinematics: &Kinematics) -> Option<f64> {
        if self.rate_driven {
            return None;
        }

        match self.remaining {
            Remaining::Unbounded(dir) => Some(kinematics.limits().max_speed * dir.signum()),
            Remaining::Bounded(before) => {
                let mut distance = before - speed;
                if is_near_zero(distance) {
                    distance = 0.0;
                }

                let new_speed = kinematics.next_speed(speed, distance);

                // Overshot and now halted: call it arrived instead of backing up
                if is_near_zero(new_speed) && self.overdriving {
                    distance = 0.0;
                    self.overdriving = false;
                }

                if distance * new_speed >= 0.0 {
                    self.overdriving = kinematics.overdrives(new_speed, distance);
                }

                self.remaining = Remaining::Bounded(distance);
                Some(new_speed)
            }
        }
    }
}

/// Distance and turn remaining for the four independent channels.
///
/// Each channel has its own lock so movement, body, gun and radar updates
/// never contend with each other.
#[derive(Debug, Default)]
pub struct RemainingAmounts {
    movement: Mutex<MovementChannel>,
    body: Mutex<TurnChannel>,
    gun: Mutex<TurnChannel>,
    radar: Mutex<TurnChannel>,
}

impl RemainingAmounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn movement(&self) -> MutexGuard<'_, MovementChannel> {
        self.movement.lock()
    }

    pub fn turn(&self, kind: TurnKind) -> MutexGuard<'_, TurnChannel> {
        match kind {
            TurnKind::Body => self.body.lock(),
            TurnKind::Gun => self.gun.lock(),
            TurnKind::Radar => self.radar.lock(),
        }
    }

    pub fn distance_remaining(&self) -> f64 {
        self.movement.lock().remaining.value()
    }

    pub fn turn_remaining(&self, kind: TurnKind) -> f64 {
        self.turn(kind).remaining.value()
    }

    /// Zero every channel and restart heading tracking from the given headings
    pub fn reset(&self, body: f64, gun: f64, radar: f64) {
        *self.movement.lock() = MovementChannel::default();
        for (kind, heading) in [(TurnKind::Body, body), (TurnKind::Gun, gun), (TurnKind::Radar, radar)] {
            *self.turn(kind) = TurnChannel {
                previous_heading: heading,
                ..TurnChannel::default()
            };
        }
    }
}
