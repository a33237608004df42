// Admin overrides: start, pause/resume, undo, force-assign, reset.
//
// These bypass turn order and bidding but never bypass the budget and
// roster invariants: an admin cannot overdraw a team or double-draft a
// player any more than a bidder can.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::engine::{DraftEngine, DraftEvent};
use super::sequencer;
use super::state::{DraftPick, DraftState, Phase};
use super::DraftError;

impl DraftEngine {
    /// Start the draft: apply keepers, pick the first nominator, and move
    /// from `Pre` to `Nominating` (or straight to `Complete` if keepers
    /// already fill every roster).
    pub fn admin_start(&mut self, _now: DateTime<Utc>) -> Result<DraftEvent, DraftError> {
        if self.state.phase != Phase::Pre {
            return Err(DraftError::WrongPhase {
                expected: Phase::Pre,
                actual: self.state.phase,
            });
        }
        if self.state.teams.len() < 2 {
            return Err(DraftError::InvariantViolation(
                "a draft needs at least two teams".to_string(),
            ));
        }
        let mut orders: Vec<u32> = self.state.teams.iter().map(|t| t.draft_order).collect();
        orders.sort_unstable();
        orders.dedup();
        if orders.len() != self.state.teams.len() {
            return Err(DraftError::InvariantViolation(
                "draft orders must be unique".to_string(),
            ));
        }

        // Stage keepers on a copy so a bad assignment rejects the start
        // without recording any of the earlier ones.
        let mut staged = self.state.clone();
        for keeper in self.keepers().to_vec() {
            self.apply_keeper(&mut staged, &keeper.team_id, &keeper.player_id, keeper.price)?;
        }
        self.state = staged;

        if self.state.all_rosters_full() {
            self.state.phase = Phase::Complete;
            self.state.current_nominator = None;
        } else {
            let rules = self.rules().clone();
            sequencer::first_nominator(
                &mut self.state,
                rules.order_mode,
                rules.skip_offline_nominators,
            );
            self.state.phase = Phase::Nominating;
        }

        info!(
            league_id = %self.state.league_id,
            keepers = self.state.picks.len(),
            nominator = ?self.state.current_nominator,
            "draft started"
        );
        Ok(DraftEvent::DraftStarted)
    }

    /// Pause the draft, freezing the current nomination in place. Cancels
    /// any running countdown; it is not restored on resume.
    pub fn admin_pause(&mut self) -> Result<DraftEvent, DraftError> {
        match self.state.phase {
            Phase::Nominating | Phase::Bidding => {}
            actual => {
                return Err(DraftError::WrongPhase {
                    expected: Phase::Nominating,
                    actual,
                })
            }
        }
        self.state.resume_phase = Some(self.state.phase);
        self.state.phase = Phase::Paused;
        self.cancel_countdown();
        Ok(DraftEvent::DraftPaused)
    }

    /// Resume a paused draft into the phase it was paused from. The
    /// nomination (if any) is intact; a new countdown must be started
    /// explicitly.
    pub fn admin_resume(&mut self) -> Result<DraftEvent, DraftError> {
        if self.state.phase != Phase::Paused {
            return Err(DraftError::WrongPhase {
                expected: Phase::Paused,
                actual: self.state.phase,
            });
        }
        self.state.phase = self.state.resume_phase.take().unwrap_or(Phase::Nominating);
        Ok(DraftEvent::DraftResumed)
    }

    /// Undo the most recent bid on the active nomination, restoring the
    /// previous high bid. The nominator's seed bid cannot be undone: a
    /// nomination always has a price floor.
    pub fn admin_undo_bid(&mut self) -> Result<DraftEvent, DraftError> {
        if self.state.phase != Phase::Bidding {
            return Err(DraftError::WrongPhase {
                expected: Phase::Bidding,
                actual: self.state.phase,
            });
        }
        let Some(nom) = self.state.nomination.as_mut() else {
            return Err(DraftError::NoActiveNomination);
        };
        if nom.bids.len() < 2 {
            return Err(DraftError::InvalidAmount(
                "cannot undo the opening bid".to_string(),
            ));
        }

        let undone = nom.bids.pop().ok_or_else(|| {
            DraftError::InvariantViolation("bid history vanished during undo".to_string())
        })?;
        let restored = nom.bids.last().ok_or_else(|| {
            DraftError::InvariantViolation("bid history empty after undo".to_string())
        })?;
        nom.current_bid = restored.amount;
        nom.current_bidder = restored.team_id.clone();
        self.cancel_countdown();

        info!(team_id = %undone.team_id, amount = undone.amount, "bid undone");
        Ok(DraftEvent::AdminUndoBid {
            team_id: undone.team_id,
            amount: undone.amount,
        })
    }

    /// Force-assign an undrafted player to a team at a fixed price,
    /// bypassing nomination and bidding.
    ///
    /// If the player is the subject of the active nomination, the
    /// nomination is resolved by the assignment and the turn advances.
    /// Otherwise any active nomination is left untouched (unless the
    /// assignment fills the last open roster, which completes the draft).
    pub fn admin_force_assign(
        &mut self,
        team_id: &str,
        player_id: &str,
        price: u32,
    ) -> Result<DraftEvent, DraftError> {
        match self.state.phase {
            Phase::Nominating | Phase::Bidding => {}
            actual => {
                return Err(DraftError::WrongPhase {
                    expected: Phase::Nominating,
                    actual,
                })
            }
        }

        let player = self
            .player(player_id)
            .ok_or_else(|| DraftError::NotFound(format!("player {player_id}")))?
            .clone();
        if self.state.is_drafted(player_id) {
            return Err(DraftError::ItemUnavailable);
        }
        let team = self
            .state
            .team(team_id)
            .ok_or_else(|| DraftError::NotFound(format!("team {team_id}")))?;
        if team.remaining_slots() == 0 {
            return Err(DraftError::InvalidAmount(
                "team has no remaining roster slots".to_string(),
            ));
        }
        let max_bid = team.max_bid();
        if price > max_bid {
            return Err(DraftError::InvalidAmount(format!(
                "price ${price} exceeds team's max bid ${max_bid}"
            )));
        }

        let resolves_nomination = self
            .state
            .nomination
            .as_ref()
            .is_some_and(|n| n.player_id == player_id);

        self.state.record_pick(DraftPick {
            pick_number: 0,
            team_id: team_id.to_string(),
            player_id: player.id,
            player_name: player.name,
            position: player.position,
            price,
            keeper: false,
        });

        if resolves_nomination {
            self.state.nomination = None;
            self.cancel_countdown();
            self.advance_or_complete();
        } else if self.state.all_rosters_full() {
            self.state.nomination = None;
            self.cancel_countdown();
            self.state.phase = Phase::Complete;
            self.state.current_nominator = None;
        } else if self.state.phase == Phase::Bidding
            && self
                .state
                .nomination
                .as_ref()
                .is_some_and(|n| n.current_bidder == team_id)
        {
            // The high bidder's budget or roster just changed under the
            // clock; a pending expiry may no longer be a legal sale.
            self.cancel_countdown();
        } else if self.state.phase == Phase::Nominating
            && self.state.current_nominator.as_deref() == Some(team_id)
            && self
                .state
                .team(team_id)
                .is_some_and(|t| t.remaining_slots() == 0)
        {
            // The team on the clock was just filled; hand the turn onward.
            self.advance_or_complete();
        }

        warn!(
            team_id = %team_id,
            player_id = %player_id,
            price,
            "admin force-assigned player"
        );
        Ok(DraftEvent::AdminForceAssign {
            team_id: team_id.to_string(),
            player_id: player_id.to_string(),
            price,
        })
    }

    /// Reset the draft back to `Pre`, discarding the nomination and all
    /// non-keeper picks (all picks, if `keep_keepers` is false). Budgets and
    /// rosters are refunded pick by pick so they stay a pure projection of
    /// the surviving history.
    pub fn admin_reset(&mut self, keep_keepers: bool) -> Result<DraftEvent, DraftError> {
        let discard: Vec<String> = self
            .state
            .picks
            .iter()
            .filter(|p| !(keep_keepers && p.keeper))
            .map(|p| p.player_id.clone())
            .collect();
        for player_id in &discard {
            self.state.unrecord_player(player_id);
        }

        self.state.nomination = None;
        self.cancel_countdown();
        self.state.phase = Phase::Pre;
        self.state.resume_phase = None;
        self.state.current_nominator = None;
        self.state.round = 1;
        self.state.cursor = 0;

        info!(
            league_id = %self.state.league_id,
            discarded = discard.len(),
            keep_keepers,
            "draft reset"
        );
        Ok(DraftEvent::DraftReset)
    }

    /// Apply one keeper assignment to the staged start state. Keepers follow
    /// the same budget and availability rules as sales.
    fn apply_keeper(
        &self,
        state: &mut DraftState,
        team_id: &str,
        player_id: &str,
        price: u32,
    ) -> Result<(), DraftError> {
        let player = self
            .player(player_id)
            .ok_or_else(|| DraftError::NotFound(format!("keeper player {player_id}")))?
            .clone();
        if let Some(existing) = state.picks.iter().find(|p| p.player_id == player_id) {
            // Survived a keeper-preserving reset; nothing to re-apply.
            if existing.keeper && existing.team_id == team_id {
                return Ok(());
            }
            return Err(DraftError::InvariantViolation(format!(
                "keeper {player_id} assigned twice"
            )));
        }
        let team = state
            .team(team_id)
            .ok_or_else(|| DraftError::NotFound(format!("keeper team {team_id}")))?;
        if team.remaining_slots() == 0 {
            return Err(DraftError::InvariantViolation(format!(
                "keeper {player_id} does not fit team {team_id}'s roster"
            )));
        }
        if price > team.budget_remaining {
            return Err(DraftError::InvariantViolation(format!(
                "keeper {player_id} at ${price} overdraws team {team_id}"
            )));
        }

        state.record_pick(DraftPick {
            pick_number: 0,
            team_id: team_id.to_string(),
            player_id: player.id,
            player_name: player.name,
            position: player.position,
            price,
            keeper: true,
        });
        Ok(())
    }
}
