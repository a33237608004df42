// Wire protocol between draft clients and the room server.
//
// Messages are JSON with a SCREAMING_SNAKE_CASE `type` tag and camelCase
// fields. Inbound actions map one-to-one onto engine operations; outbound
// traffic is the full authoritative snapshot (clients never apply deltas).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::draft::engine::{CountdownPhase, DraftEngine, DraftEvent};
use crate::draft::position::Position;
use crate::draft::state::{DraftPick, Phase};

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Authentication handshake, required as the first message.
    #[serde(rename_all = "camelCase")]
    Hello {
        league_id: String,
        /// Omitted when connecting as the league owner.
        #[serde(default)]
        team_id: Option<String>,
        token: String,
    },

    #[serde(rename_all = "camelCase")]
    Nominate { player_id: String, amount: u32 },

    Bid { amount: u32 },

    StartCountdown,

    GetState,

    AdminStart,

    AdminPause,

    AdminResume,

    AdminUndoLastBid,

    #[serde(rename_all = "camelCase")]
    AdminForceAssign {
        team_id: String,
        player_id: String,
        price: u32,
    },

    #[serde(rename_all = "camelCase")]
    AdminReset {
        #[serde(default)]
        keep_keepers: bool,
    },
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Handshake accepted.
    #[serde(rename_all = "camelCase")]
    Welcome {
        /// `None` for the league owner connection.
        team_id: Option<String>,
        is_owner: bool,
        snapshot: StateSnapshot,
    },

    /// Authoritative state broadcast, sent after every accepted action and
    /// in reply to GET_STATE.
    #[serde(rename_all = "camelCase")]
    State {
        snapshot: StateSnapshot,
        /// The event that produced this snapshot, absent for GET_STATE replies.
        #[serde(skip_serializing_if = "Option::is_none")]
        event: Option<DraftEvent>,
    },

    /// Action rejected. Sent only to the originating connection.
    #[serde(rename_all = "camelCase")]
    Rejected { kind: String, message: String },
}

// ---------------------------------------------------------------------------
// Snapshot views
// ---------------------------------------------------------------------------

/// Full draft state as broadcast to every client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub league_id: String,
    pub phase: Phase,
    pub round: u32,
    pub current_nominator: Option<String>,
    pub nomination: Option<NominationView>,
    pub teams: Vec<TeamView>,
    pub picks: Vec<DraftPick>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NominationView {
    pub player_id: String,
    pub player_name: String,
    pub position: Position,
    pub nominated_by: String,
    pub current_bid: u32,
    pub current_bidder: String,
    pub bid_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_ends_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<CountdownPhase>,
}

/// Per-team view with the derived figures clients display but never compute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    pub team_id: String,
    pub name: String,
    pub draft_order: u32,
    pub budget_spent: u32,
    pub budget_remaining: u32,
    pub max_bid: u32,
    pub remaining_slots: usize,
    pub online: bool,
    pub connected: bool,
    pub roster: Vec<RosterSlotView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSlotView {
    pub slot: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
}

impl StateSnapshot {
    /// Build the broadcast view from the engine's authoritative state.
    pub fn from_engine(engine: &DraftEngine, now: DateTime<Utc>) -> Self {
        let state = &engine.state;

        let nomination = state.nomination.as_ref().map(|nom| NominationView {
            player_id: nom.player_id.clone(),
            player_name: nom.player_name.clone(),
            position: nom.position,
            nominated_by: nom.nominated_by.clone(),
            current_bid: nom.current_bid,
            current_bidder: nom.current_bidder.clone(),
            bid_count: nom.bids.len(),
            clock_ends_at: state.clock_ends_at,
            countdown: engine.countdown_phase(now),
        });

        let teams = state
            .teams
            .iter()
            .map(|team| TeamView {
                team_id: team.team_id.clone(),
                name: team.name.clone(),
                draft_order: team.draft_order,
                budget_spent: team.budget_spent,
                budget_remaining: team.budget_remaining,
                max_bid: team.max_bid(),
                remaining_slots: team.remaining_slots(),
                online: team.online,
                connected: state.connected.contains(&team.team_id),
                roster: team
                    .roster
                    .slots
                    .iter()
                    .map(|slot| RosterSlotView {
                        slot: slot.position,
                        player_id: slot.player.as_ref().map(|p| p.player_id.clone()),
                        player_name: slot.player.as_ref().map(|p| p.name.clone()),
                        price: slot.player.as_ref().map(|p| p.price),
                    })
                    .collect(),
            })
            .collect();

        StateSnapshot {
            league_id: state.league_id.clone(),
            phase: state.phase,
            round: state.round,
            current_nominator: state.current_nominator.clone(),
            nomination,
            teams,
            picks: state.picks.clone(),
        }
    }
}
