//! Wire message definitions
//! These are the JSON types exchanged with the turn-synchronized peer

use serde::{Deserialize, Serialize};

/// Messages sent from the peer to the bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// A new round is about to begin
    #[serde(rename_all = "camelCase")]
    RoundStarted { round_number: u32 },

    /// One turn of the current round
    Tick(TickEvent),

    /// The round is over
    #[serde(rename_all = "camelCase")]
    RoundEnded { round_number: u32 },

    /// All rounds are over
    GameEnded,

    /// The game was stopped before it finished
    GameAborted,

    /// Synthesized by the transport when the connection drops
    Disconnected,
}

/// Per-turn notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickEvent {
    pub round_number: u32,
    /// Turn within the round, starting at 1
    pub turn_number: u32,
    pub bot_state: BotState,
    /// Events that happened to this bot during the previous turn
    #[serde(default)]
    pub events: Vec<BotEvent>,
}

impl TickEvent {
    /// Events in dispatch order
    pub fn events_by_priority(&self) -> Vec<&BotEvent> {
        let mut events: Vec<&BotEvent> = self.events.iter().collect();
        events.sort_by_key(|event| event.priority());
        events
    }
}

/// Bot state as observed at the start of a turn
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotState {
    pub energy: f64,
    pub x: f64,
    pub y: f64,
    /// Body heading in degrees, [0, 360)
    pub direction: f64,
    pub gun_direction: f64,
    pub radar_direction: f64,
    /// Distance travelled during the previous turn
    pub speed: f64,
    pub turn_rate: f64,
    pub gun_turn_rate: f64,
    pub radar_turn_rate: f64,
    pub gun_heat: f64,
}

impl BotState {
    /// A bot with no energy left cannot move, turn or fire
    pub fn is_disabled(&self) -> bool {
        self.energy <= 0.0
    }
}

/// Events delivered inside a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BotEvent {
    /// The bot drove into the arena boundary
    HitWall,

    /// The bot collided with another bot
    #[serde(rename_all = "camelCase")]
    HitBot {
        victim_id: u32,
        /// The bot was moving toward the victim
        rammed: bool,
    },

    /// The bot was destroyed
    Death,

    /// The gun went off
    BulletFired { firepower: f64 },
}

impl BotEvent {
    /// Dispatch priority, lower runs first
    pub fn priority(&self) -> u8 {
        match self {
            BotEvent::Death => 0,
            BotEvent::HitWall => 1,
            BotEvent::HitBot { .. } => 2,
            BotEvent::BulletFired { .. } => 3,
        }
    }
}

/// Messages sent from the bot to the peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// What the bot wants to do next turn
    BotIntent(BotIntent),
}

/// Per-turn command record.
///
/// Unset fields are omitted from the wire and leave the peer's standing
/// value untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotIntent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gun_turn_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radar_turn_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firepower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescan: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fire_assist: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjust_gun_for_body_turn: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjust_radar_for_body_turn: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjust_radar_for_gun_turn: Option<bool>,
}
