// Bidding and resolution engine: nominate, bid, countdown, sale.
//
// All mutating operations validate fully before touching state, so every
// rejection is side-effect-free: the state compares equal before and after
// a failed call. The session coordinator applies these operations one at a
// time per room, which is what makes the returned order authoritative.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::error;

use crate::players::Player;

use super::sequencer::{self, DraftOrderMode};
use super::state::{BidRecord, DraftPick, DraftState, Nomination, Phase};
use super::DraftError;

/// League rules the engine needs at runtime.
#[derive(Debug, Clone)]
pub struct RoomRules {
    /// Countdown length for the going-once/going-twice/sold window.
    pub countdown_secs: i64,
    pub order_mode: DraftOrderMode,
    /// Skip offline teams in the nomination rotation.
    pub skip_offline_nominators: bool,
}

/// A pre-declared keeper assignment, applied as already-drafted at start.
#[derive(Debug, Clone, PartialEq)]
pub struct KeeperAssignment {
    pub team_id: String,
    pub player_id: String,
    pub price: u32,
}

/// An accepted state transition, used for persistence and broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DraftEvent {
    DraftStarted,
    DraftPaused,
    DraftResumed,
    NominationCreated {
        team_id: String,
        player_id: String,
        amount: u32,
    },
    BidAccepted {
        team_id: String,
        amount: u32,
    },
    CountdownStarted {
        ends_at: DateTime<Utc>,
        generation: u64,
    },
    ItemSold {
        team_id: String,
        player_id: String,
        price: u32,
    },
    DraftReset,
    AdminForceAssign {
        team_id: String,
        player_id: String,
        price: u32,
    },
    AdminUndoBid {
        team_id: String,
        amount: u32,
    },
}

impl DraftEvent {
    /// Event type identifier used in the persisted event log.
    pub fn event_type(&self) -> &'static str {
        match self {
            DraftEvent::DraftStarted => "draftStarted",
            DraftEvent::DraftPaused => "draftPaused",
            DraftEvent::DraftResumed => "draftResumed",
            DraftEvent::NominationCreated { .. } => "nominationCreated",
            DraftEvent::BidAccepted { .. } => "bidAccepted",
            DraftEvent::CountdownStarted { .. } => "countdownStarted",
            DraftEvent::ItemSold { .. } => "itemSold",
            DraftEvent::DraftReset => "draftReset",
            DraftEvent::AdminForceAssign { .. } => "adminForceAssign",
            DraftEvent::AdminUndoBid { .. } => "adminUndoBid",
        }
    }

    /// Whether this event is appended to the durable event log. Countdown
    /// starts are broadcast-only: the authoritative transition is the expiry.
    pub fn is_persisted(&self) -> bool {
        !matches!(self, DraftEvent::CountdownStarted { .. })
    }
}

/// Presentation sub-phase of a running countdown, derived from remaining
/// time. The authoritative transition is the single deadline expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownPhase {
    Open,
    GoingOnce,
    GoingTwice,
    Sold,
}

impl CountdownPhase {
    /// Classify by seconds remaining: ≤1 sold, ≤3 going twice, ≤6 going once.
    pub fn from_remaining_secs(secs: i64) -> Self {
        if secs <= 1 {
            CountdownPhase::Sold
        } else if secs <= 3 {
            CountdownPhase::GoingTwice
        } else if secs <= 6 {
            CountdownPhase::GoingOnce
        } else {
            CountdownPhase::Open
        }
    }
}

/// The authoritative engine for one draft room.
///
/// Owns the [`DraftState`] and the immutable player pool; the only legal
/// mutations go through the methods here (including the admin overrides in
/// `admin.rs`).
pub struct DraftEngine {
    pub state: DraftState,
    players: HashMap<String, Player>,
    keepers: Vec<KeeperAssignment>,
    rules: RoomRules,
}

impl DraftEngine {
    pub fn new(
        state: DraftState,
        players: HashMap<String, Player>,
        keepers: Vec<KeeperAssignment>,
        rules: RoomRules,
    ) -> Self {
        DraftEngine {
            state,
            players,
            keepers,
            rules,
        }
    }

    pub fn rules(&self) -> &RoomRules {
        &self.rules
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn keepers(&self) -> &[KeeperAssignment] {
        &self.keepers
    }

    /// Countdown presentation phase for the current clock, if one is running.
    pub fn countdown_phase(&self, now: DateTime<Utc>) -> Option<CountdownPhase> {
        let ends_at = self.state.clock_ends_at?;
        let remaining = (ends_at - now).num_seconds();
        Some(CountdownPhase::from_remaining_secs(remaining))
    }

    /// Mark a participant as attached to the room. Connection changes never
    /// alter auction state beyond the presence set.
    pub fn mark_connected(&mut self, participant_id: &str) {
        self.state.connected.insert(participant_id.to_string());
    }

    /// Mark a participant as detached.
    pub fn mark_disconnected(&mut self, participant_id: &str) {
        self.state.connected.remove(participant_id);
    }

    /// Nominate a player for auction.
    ///
    /// Valid only in `Nominating`, only by the current nominator, only for
    /// an undrafted player, with `1 ≤ amount ≤ nominator.max_bid()`. The
    /// nomination amount becomes the seed bid with the nominator as high
    /// bidder, and the phase moves to `Bidding`.
    pub fn nominate(
        &mut self,
        team_id: &str,
        player_id: &str,
        amount: u32,
        now: DateTime<Utc>,
    ) -> Result<DraftEvent, DraftError> {
        if self.state.phase != Phase::Nominating {
            return Err(DraftError::WrongPhase {
                expected: Phase::Nominating,
                actual: self.state.phase,
            });
        }
        if self.state.current_nominator.as_deref() != Some(team_id) {
            return Err(DraftError::WrongTurn);
        }
        if self.state.nomination.is_some() {
            return Err(DraftError::NominationAlreadyActive);
        }

        let player = self
            .players
            .get(player_id)
            .ok_or_else(|| DraftError::NotFound(format!("player {player_id}")))?
            .clone();
        if self.state.is_drafted(player_id) {
            return Err(DraftError::ItemUnavailable);
        }

        let nominator = self
            .state
            .team(team_id)
            .ok_or_else(|| DraftError::NotFound(format!("team {team_id}")))?;
        if amount < 1 {
            return Err(DraftError::InvalidAmount(
                "nomination amount must be at least $1".to_string(),
            ));
        }
        let max_bid = nominator.max_bid();
        if amount > max_bid {
            return Err(DraftError::InvalidAmount(format!(
                "amount ${amount} exceeds max bid ${max_bid}"
            )));
        }

        self.state.nomination = Some(Nomination {
            player_id: player.id.clone(),
            player_name: player.name.clone(),
            position: player.position,
            nominated_by: team_id.to_string(),
            current_bid: amount,
            current_bidder: team_id.to_string(),
            started_at: now,
            bids: vec![BidRecord {
                team_id: team_id.to_string(),
                amount,
                at: now,
            }],
        });
        self.state.phase = Phase::Bidding;
        self.cancel_countdown();

        Ok(DraftEvent::NominationCreated {
            team_id: team_id.to_string(),
            player_id: player.id,
            amount,
        })
    }

    /// Place a bid on the active nomination.
    ///
    /// Valid only in `Bidding` by a team with remaining roster slots;
    /// requires `current_bid < amount ≤ bidder.max_bid()`. The current high
    /// bidder (including the nominator raising their own seed) may bid again
    /// as long as the amount strictly increases. Accepting a bid cancels any
    /// in-flight countdown: no sale can finalize while a valid higher bid
    /// is still arriving.
    pub fn bid(
        &mut self,
        team_id: &str,
        amount: u32,
        now: DateTime<Utc>,
    ) -> Result<DraftEvent, DraftError> {
        if self.state.phase != Phase::Bidding {
            return Err(DraftError::WrongPhase {
                expected: Phase::Bidding,
                actual: self.state.phase,
            });
        }
        let current_bid = match &self.state.nomination {
            Some(nom) => nom.current_bid,
            None => return Err(DraftError::NoActiveNomination),
        };

        let bidder = self
            .state
            .team(team_id)
            .ok_or_else(|| DraftError::NotFound(format!("team {team_id}")))?;
        if bidder.remaining_slots() == 0 {
            return Err(DraftError::InvalidAmount(
                "team has no remaining roster slots".to_string(),
            ));
        }
        if amount <= current_bid {
            return Err(DraftError::InvalidAmount(format!(
                "bid ${amount} must exceed current bid ${current_bid}"
            )));
        }
        let max_bid = bidder.max_bid();
        if amount > max_bid {
            return Err(DraftError::InvalidAmount(format!(
                "bid ${amount} exceeds max bid ${max_bid}"
            )));
        }

        if let Some(nom) = self.state.nomination.as_mut() {
            nom.current_bid = amount;
            nom.current_bidder = team_id.to_string();
            nom.bids.push(BidRecord {
                team_id: team_id.to_string(),
                amount,
                at: now,
            });
        }
        self.cancel_countdown();

        Ok(DraftEvent::BidAccepted {
            team_id: team_id.to_string(),
            amount,
        })
    }

    /// Start the countdown-to-sale clock.
    ///
    /// Valid only in `Bidding` with an active nomination (which always
    /// carries at least the seed bid). Bumps the countdown generation so
    /// any previously scheduled expiry becomes stale.
    pub fn start_countdown(&mut self, now: DateTime<Utc>) -> Result<DraftEvent, DraftError> {
        if self.state.phase != Phase::Bidding {
            return Err(DraftError::WrongPhase {
                expected: Phase::Bidding,
                actual: self.state.phase,
            });
        }
        if self.state.nomination.is_none() {
            return Err(DraftError::NoActiveNomination);
        }

        let ends_at = now + Duration::seconds(self.rules.countdown_secs);
        self.state.clock_ends_at = Some(ends_at);
        self.state.countdown_generation += 1;

        Ok(DraftEvent::CountdownStarted {
            ends_at,
            generation: self.state.countdown_generation,
        })
    }

    /// Handle a countdown expiry command from the timer.
    ///
    /// Returns `Ok(None)` when the expiry is stale (superseded by a bid,
    /// pause, undo, or reset bumping the generation) or early (`now` is
    /// still before the deadline, so a bid accepted in the same instant
    /// wins). Otherwise finalizes the sale to the current high bidder.
    pub fn expire_countdown(
        &mut self,
        generation: u64,
        now: DateTime<Utc>,
    ) -> Result<Option<DraftEvent>, DraftError> {
        if generation != self.state.countdown_generation {
            return Ok(None);
        }
        if self.state.phase != Phase::Bidding {
            return Ok(None);
        }
        let Some(ends_at) = self.state.clock_ends_at else {
            return Ok(None);
        };
        if now < ends_at {
            return Ok(None);
        }

        let nom = self
            .state
            .nomination
            .as_ref()
            .ok_or_else(|| {
                DraftError::InvariantViolation("countdown expired with no nomination".to_string())
            })?
            .clone();

        self.finalize_sale(&nom.current_bidder, &nom.player_id, nom.current_bid, false)
            .map(Some)
    }

    /// Assign `player_id` to `team_id` at `price`, clear the nomination and
    /// clock, and advance the turn. Shared by countdown expiry and admin
    /// force-assign (`keeper = false` in both cases).
    pub(super) fn finalize_sale(
        &mut self,
        team_id: &str,
        player_id: &str,
        price: u32,
        keeper: bool,
    ) -> Result<DraftEvent, DraftError> {
        let player = self
            .players
            .get(player_id)
            .ok_or_else(|| DraftError::NotFound(format!("player {player_id}")))?
            .clone();

        // Defensive re-checks of the §3 invariants. Failures here are logic
        // defects, not user errors.
        let team = self
            .state
            .team(team_id)
            .ok_or_else(|| DraftError::NotFound(format!("team {team_id}")))?;
        if price > team.budget_remaining {
            let err = DraftError::InvariantViolation(format!(
                "sale of {player_id} at ${price} would overdraw team {team_id}"
            ));
            error!(%err, "refusing sale");
            return Err(err);
        }
        if team.remaining_slots() == 0 {
            let err = DraftError::InvariantViolation(format!(
                "sale of {player_id} to {team_id} with no open roster slots"
            ));
            error!(%err, "refusing sale");
            return Err(err);
        }
        if self.state.is_drafted(player_id) {
            let err = DraftError::InvariantViolation(format!(
                "player {player_id} already drafted, refusing double sale"
            ));
            error!(%err, "refusing sale");
            return Err(err);
        }

        self.state.record_pick(DraftPick {
            pick_number: 0, // assigned by record_pick
            team_id: team_id.to_string(),
            player_id: player.id.clone(),
            player_name: player.name.clone(),
            position: player.position,
            price,
            keeper,
        });
        self.state.nomination = None;
        self.cancel_countdown();
        self.advance_or_complete();

        Ok(DraftEvent::ItemSold {
            team_id: team_id.to_string(),
            player_id: player.id,
            price,
        })
    }

    /// Move to the next nominator, or to `Complete` when every roster is
    /// full. When only skipped (offline) teams have open slots the draft
    /// stays in `Nominating` with no nominator, awaiting admin action.
    pub(super) fn advance_or_complete(&mut self) {
        if self.state.all_rosters_full() {
            self.state.phase = Phase::Complete;
            self.state.current_nominator = None;
            return;
        }
        sequencer::advance_turn(
            &mut self.state,
            self.rules.order_mode,
            self.rules.skip_offline_nominators,
        );
        self.state.phase = Phase::Nominating;
    }

    /// Cancel any running countdown. Bumping the generation makes every
    /// scheduled expiry command stale, so a superseded timer can never fire.
    pub(super) fn cancel_countdown(&mut self) {
        if self.state.clock_ends_at.take().is_some() {
            self.state.countdown_generation += 1;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn nominate_creates_seed_bid_and_moves_to_bidding() {
        let mut engine = started_engine(200, &roster_config());
        let now = Utc::now();

        let event = engine.nominate("a", "rb1", 10, now).unwrap();
        assert_eq!(
            event,
            DraftEvent::NominationCreated {
                team_id: "a".to_string(),
                player_id: "rb1".to_string(),
                amount: 10,
            }
        );
        assert_eq!(engine.state.phase, Phase::Bidding);

        let nom = engine.state.nomination.as_ref().unwrap();
        assert_eq!(nom.current_bid, 10);
        assert_eq!(nom.current_bidder, "a");
        assert_eq!(nom.bids.len(), 1);
        assert_eq!(nom.bids[0].team_id, "a");
    }

    #[test]
    fn nominate_rejected_out_of_turn() {
        let mut engine = started_engine(200, &roster_config());
        let before = engine.state.clone();

        let err = engine.nominate("b", "rb1", 10, Utc::now()).unwrap_err();
        assert_eq!(err, DraftError::WrongTurn);
        assert_eq!(engine.state, before, "rejection must not mutate state");
    }

    #[test]
    fn nominate_rejected_in_wrong_phase() {
        let mut engine = started_engine(200, &roster_config());
        engine.nominate("a", "rb1", 10, Utc::now()).unwrap();
        let before = engine.state.clone();

        let err = engine.nominate("a", "rb2", 5, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            DraftError::WrongPhase {
                expected: Phase::Nominating,
                actual: Phase::Bidding,
            }
        );
        assert_eq!(engine.state, before);
    }

    #[test]
    fn nominate_rejected_for_unknown_player() {
        let mut engine = started_engine(200, &roster_config());
        let err = engine.nominate("a", "ghost", 5, Utc::now()).unwrap_err();
        assert_eq!(err, DraftError::NotFound("player ghost".to_string()));
    }

    #[test]
    fn nominate_rejected_for_zero_amount() {
        let mut engine = started_engine(200, &roster_config());
        let err = engine.nominate("a", "rb1", 0, Utc::now()).unwrap_err();
        assert!(matches!(err, DraftError::InvalidAmount(_)));
    }

    #[test]
    fn nominate_rejected_above_max_bid() {
        let mut engine = started_engine(200, &roster_config());
        // 6 slots, 200 budget: max bid = 200 - 5 = 195
        let err = engine.nominate("a", "rb1", 196, Utc::now()).unwrap_err();
        assert!(matches!(err, DraftError::InvalidAmount(_)));
        assert!(engine.nominate("a", "rb1", 195, Utc::now()).is_ok());
    }

    #[test]
    fn bid_raises_and_appends_history() {
        let mut engine = started_engine(200, &roster_config());
        let now = Utc::now();
        engine.nominate("a", "rb1", 10, now).unwrap();

        let event = engine.bid("b", 15, now).unwrap();
        assert_eq!(
            event,
            DraftEvent::BidAccepted {
                team_id: "b".to_string(),
                amount: 15,
            }
        );

        let nom = engine.state.nomination.as_ref().unwrap();
        assert_eq!(nom.current_bid, 15);
        assert_eq!(nom.current_bidder, "b");
        assert_eq!(nom.bids.len(), 2);
    }

    #[test]
    fn bid_must_strictly_exceed_current() {
        let mut engine = started_engine(200, &roster_config());
        engine.nominate("a", "rb1", 10, Utc::now()).unwrap();
        let before = engine.state.clone();

        let err = engine.bid("b", 10, Utc::now()).unwrap_err();
        assert!(matches!(err, DraftError::InvalidAmount(_)));
        assert_eq!(engine.state, before);
    }

    #[test]
    fn bid_rejected_above_max_bid() {
        // remaining budget 20, 3 slots: max bid = 20 - 2 = 18
        let mut config = HashMap::new();
        config.insert("RB".to_string(), 3);
        let mut engine = started_engine(20, &config);
        engine.nominate("a", "rb1", 5, Utc::now()).unwrap();

        let err = engine.bid("b", 19, Utc::now()).unwrap_err();
        assert!(matches!(err, DraftError::InvalidAmount(_)));
        assert!(engine.bid("b", 18, Utc::now()).is_ok());
    }

    #[test]
    fn high_bidder_may_raise_own_bid() {
        let mut engine = started_engine(200, &roster_config());
        engine.nominate("a", "rb1", 10, Utc::now()).unwrap();
        // Nominator raising their own seed is a legal distinct raise.
        assert!(engine.bid("a", 12, Utc::now()).is_ok());
        let nom = engine.state.nomination.as_ref().unwrap();
        assert_eq!(nom.current_bid, 12);
        assert_eq!(nom.current_bidder, "a");
    }

    #[test]
    fn bid_without_nomination_rejected() {
        let mut engine = started_engine(200, &roster_config());
        let err = engine.bid("b", 10, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            DraftError::WrongPhase {
                expected: Phase::Bidding,
                actual: Phase::Nominating,
            }
        );
    }

    #[test]
    fn bid_cancels_countdown() {
        let mut engine = started_engine(200, &roster_config());
        let now = Utc::now();
        engine.nominate("a", "rb1", 10, now).unwrap();
        engine.start_countdown(now).unwrap();
        let armed_generation = engine.state.countdown_generation;
        assert!(engine.state.clock_ends_at.is_some());

        engine.bid("b", 15, now).unwrap();
        assert!(engine.state.clock_ends_at.is_none());
        assert!(engine.state.countdown_generation > armed_generation);

        // The stale expiry must now be discarded even at its deadline.
        let result = engine
            .expire_countdown(armed_generation, now + Duration::seconds(60))
            .unwrap();
        assert!(result.is_none());
        assert_eq!(engine.state.phase, Phase::Bidding);
        assert!(engine.state.nomination.is_some());
    }

    #[test]
    fn countdown_expiry_finalizes_sale() {
        let mut engine = started_engine(200, &single_slot_config());
        let now = Utc::now();
        engine.nominate("a", "rb1", 10, now).unwrap();
        engine.bid("b", 15, now).unwrap();
        let event = engine.start_countdown(now).unwrap();
        let DraftEvent::CountdownStarted { ends_at, generation } = event else {
            panic!("expected CountdownStarted");
        };

        let sold = engine.expire_countdown(generation, ends_at).unwrap().unwrap();
        assert_eq!(
            sold,
            DraftEvent::ItemSold {
                team_id: "b".to_string(),
                player_id: "rb1".to_string(),
                price: 15,
            }
        );

        let team_b = engine.state.team("b").unwrap();
        assert_eq!(team_b.budget_remaining, 185);
        assert_eq!(team_b.remaining_slots(), 0);
        assert!(engine.state.nomination.is_none());
        assert!(engine.state.clock_ends_at.is_none());
        // Team a still has a slot, so the draft continues.
        assert_eq!(engine.state.phase, Phase::Nominating);
    }

    #[test]
    fn full_sale_cycle_reaches_complete() {
        let mut engine = started_engine(200, &single_slot_config());
        let now = Utc::now();

        engine.nominate("a", "rb1", 10, now).unwrap();
        engine.bid("b", 15, now).unwrap();
        let DraftEvent::CountdownStarted { ends_at, generation } =
            engine.start_countdown(now).unwrap()
        else {
            panic!("expected CountdownStarted");
        };
        engine.expire_countdown(generation, ends_at).unwrap();

        // a is now the nominator; sell a's slot too.
        assert_eq!(engine.state.current_nominator.as_deref(), Some("a"));
        engine.nominate("a", "rb2", 5, now).unwrap();
        let DraftEvent::CountdownStarted { ends_at, generation } =
            engine.start_countdown(now).unwrap()
        else {
            panic!("expected CountdownStarted");
        };
        engine.expire_countdown(generation, ends_at).unwrap();

        assert_eq!(engine.state.phase, Phase::Complete);
        assert!(engine.state.current_nominator.is_none());
        assert_eq!(engine.state.picks.len(), 2);
    }

    #[test]
    fn early_expiry_is_ignored() {
        let mut engine = started_engine(200, &roster_config());
        let now = Utc::now();
        engine.nominate("a", "rb1", 10, now).unwrap();
        let DraftEvent::CountdownStarted { generation, .. } =
            engine.start_countdown(now).unwrap()
        else {
            panic!("expected CountdownStarted");
        };

        // A tick arriving before the deadline must not sell.
        let result = engine
            .expire_countdown(generation, now + Duration::seconds(1))
            .unwrap();
        assert!(result.is_none());
        assert!(engine.state.nomination.is_some());
    }

    #[test]
    fn no_double_draft_of_same_player() {
        let mut engine = started_engine(200, &roster_config());
        let now = Utc::now();
        engine.nominate("a", "rb1", 10, now).unwrap();
        let DraftEvent::CountdownStarted { ends_at, generation } =
            engine.start_countdown(now).unwrap()
        else {
            panic!("expected CountdownStarted");
        };
        engine.expire_countdown(generation, ends_at).unwrap();

        // rb1 sold to a; nominating it again is rejected.
        assert_eq!(engine.state.current_nominator.as_deref(), Some("b"));
        let err = engine.nominate("b", "rb1", 5, now).unwrap_err();
        assert_eq!(err, DraftError::ItemUnavailable);
    }

    #[test]
    fn start_countdown_requires_bidding_phase() {
        let mut engine = started_engine(200, &roster_config());
        let err = engine.start_countdown(Utc::now()).unwrap_err();
        assert!(matches!(err, DraftError::WrongPhase { .. }));
    }

    #[test]
    fn restarting_countdown_supersedes_previous_timer() {
        let mut engine = started_engine(200, &roster_config());
        let now = Utc::now();
        engine.nominate("a", "rb1", 10, now).unwrap();
        let DraftEvent::CountdownStarted { generation: gen1, .. } =
            engine.start_countdown(now).unwrap()
        else {
            panic!("expected CountdownStarted");
        };
        let DraftEvent::CountdownStarted { generation: gen2, ends_at } =
            engine.start_countdown(now + Duration::seconds(2)).unwrap()
        else {
            panic!("expected CountdownStarted");
        };
        assert!(gen2 > gen1);

        // First timer's expiry is stale.
        assert!(engine.expire_countdown(gen1, ends_at).unwrap().is_none());
        // Second timer's expiry sells.
        assert!(engine.expire_countdown(gen2, ends_at).unwrap().is_some());
    }

    #[test]
    fn countdown_phase_thresholds() {
        assert_eq!(CountdownPhase::from_remaining_secs(10), CountdownPhase::Open);
        assert_eq!(CountdownPhase::from_remaining_secs(6), CountdownPhase::GoingOnce);
        assert_eq!(CountdownPhase::from_remaining_secs(4), CountdownPhase::GoingOnce);
        assert_eq!(CountdownPhase::from_remaining_secs(3), CountdownPhase::GoingTwice);
        assert_eq!(CountdownPhase::from_remaining_secs(2), CountdownPhase::GoingTwice);
        assert_eq!(CountdownPhase::from_remaining_secs(1), CountdownPhase::Sold);
        assert_eq!(CountdownPhase::from_remaining_secs(0), CountdownPhase::Sold);
    }

    #[test]
    fn event_types_match_persisted_log_names() {
        assert_eq!(DraftEvent::DraftStarted.event_type(), "draftStarted");
        assert_eq!(DraftEvent::DraftReset.event_type(), "draftReset");
        assert_eq!(
            DraftEvent::ItemSold {
                team_id: "a".into(),
                player_id: "p".into(),
                price: 1
            }
            .event_type(),
            "itemSold"
        );
        assert!(!DraftEvent::CountdownStarted {
            ends_at: Utc::now(),
            generation: 1
        }
        .is_persisted());
        assert!(DraftEvent::DraftStarted.is_persisted());
    }

    #[test]
    fn connection_tracking_does_not_touch_auction_state() {
        let mut engine = started_engine(200, &roster_config());
        engine.nominate("a", "rb1", 10, Utc::now()).unwrap();
        let nomination_before = engine.state.nomination.clone();

        engine.mark_connected("b");
        engine.mark_disconnected("b");
        assert_eq!(engine.state.nomination, nomination_before);
        assert_eq!(engine.state.phase, Phase::Bidding);
    }
}
