//! Motion bookkeeping: kinematics, remaining amounts and stop snapshots

pub mod kinematics;
pub mod remaining;
pub mod snapshot;

pub use kinematics::{Kinematics, MotionLimits};
pub use remaining::{Direction, Remaining, RemainingAmounts, TurnKind};
pub use snapshot::{IntentRates, Snapshot, SnapshotSlot};
