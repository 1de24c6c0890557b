//! Stop/resume snapshot of the remaining amounts and standing intent rates

use parking_lot::{Mutex, MutexGuard};

use super::remaining::{MovementChannel, RemainingAmounts, TurnChannel, TurnKind};

/// The four standing rates of the intent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntentRates {
    pub target_speed: Option<f64>,
    pub turn_rate: Option<f64>,
    pub gun_turn_rate: Option<f64>,
    pub radar_turn_rate: Option<f64>,
}

impl IntentRates {
    /// All rates explicitly zero
    pub fn halted() -> Self {
        Self {
            target_speed: Some(0.0),
            turn_rate: Some(0.0),
            gun_turn_rate: Some(0.0),
            radar_turn_rate: Some(0.0),
        }
    }
}

/// Frozen copy of every channel, taken by `stop` and consumed by `resume`
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    movement: MovementChannel,
    body: TurnChannel,
    gun: TurnChannel,
    radar: TurnChannel,
    rates: IntentRates,
}

impl Snapshot {
    /// Copy all four channels (each under its own guard) along with the rates
    pub fn capture(amounts: &RemainingAmounts, rates: IntentRates) -> Self {
        Self {
            movement: *amounts.movement(),
            body: *amounts.turn(TurnKind::Body),
            gun: *amounts.turn(TurnKind::Gun),
            radar: *amounts.turn(TurnKind::Radar),
            rates,
        }
    }

    /// Write the channels back and hand out the saved rates
    pub fn restore(self, amounts: &RemainingAmounts) -> IntentRates {
        *amounts.movement() = self.movement;
        *amounts.turn(TurnKind::Body) = self.body;
        *amounts.turn(TurnKind::Gun) = self.gun;
        *amounts.turn(TurnKind::Radar) = self.radar;
        self.rates
    }

    pub fn rates(&self) -> IntentRates {
        self.rates
    }
}

/// Holds at most one live snapshot; the bot is stopped while it is occupied.
///
/// The slot guard is always taken before any channel guard.
#[derive(Debug, Default)]
pub struct SnapshotSlot {
    slot: Mutex<Option<Snapshot>>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, Option<Snapshot>> {
        self.slot.lock()
    }

    pub fn is_stopped(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Drop any live snapshot without restoring it
    pub fn discard(&self) -> bool {
        self.slot.lock().take().is_some()
    }
}
