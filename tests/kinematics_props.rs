use proptest::prelude::*;

use turnbot_runtime::motion::kinematics::{
    normalize_absolute, Kinematics, MAX_SPEED, NEAR_ZERO,
};

proptest! {
    /// From any state the bot can actually be in (able to stop before the
    /// target), planning and subtracting turn by turn lands on the target
    /// without ever passing it.
    #[test]
    fn movement_converges_without_overshoot(
        distance in 0.0f64..1000.0,
        speed in 0.0f64..=MAX_SPEED,
        backwards in any::<bool>(),
    ) {
        let k = Kinematics::default();
        prop_assume!(speed + k.overdrive_distance(speed) <= distance);

        let sign = if backwards { -1.0 } else { 1.0 };
        let mut remaining = distance * sign;
        let mut speed = speed * sign;
        let mut turns = 0;

        while !(speed == 0.0 && remaining.abs() < NEAR_ZERO) {
            speed = k.next_speed(speed, remaining);
            remaining -= speed;
            turns += 1;

            prop_assert!(remaining * sign >= -NEAR_ZERO, "overshot: {}", remaining);
            prop_assert!(turns <= 200, "no convergence after {} turns", turns);
        }
    }

    #[test]
    fn next_speed_respects_limits(
        speed in -MAX_SPEED..=MAX_SPEED,
        distance in -1000.0f64..1000.0,
    ) {
        let k = Kinematics::default();
        let next = k.next_speed(speed, distance);
        prop_assert!(next.abs() <= MAX_SPEED);
        // At most one unit of acceleration, at most two of braking
        prop_assert!((next.abs() - speed.abs()) <= 1.0 + 1e-12 || next.signum() != speed.signum());
        prop_assert!((next - speed).abs() <= 2.0 + 1e-12);
    }

    #[test]
    fn angle_delta_of_same_heading_is_zero(heading in -10_000.0f64..10_000.0) {
        prop_assert_eq!(Kinematics::angle_delta(heading, heading), 0.0);
    }

    /// Summing small observed deltas gives the same total as one big delta
    #[test]
    fn angle_deltas_add_up(
        start in 0.0f64..360.0,
        steps in proptest::collection::vec(-20.0f64..20.0, 1..8),
    ) {
        let mut heading = start;
        let mut summed = 0.0;
        for step in &steps {
            let next = normalize_absolute(heading + step);
            summed += Kinematics::angle_delta(next, heading);
            heading = next;
        }

        let direct = Kinematics::angle_delta(heading, start);
        prop_assert!((summed - direct).abs() < 1e-9, "{} vs {}", summed, direct);
        let expected: f64 = steps.iter().sum();
        prop_assert!((summed - expected).abs() < 1e-9);
    }
}
