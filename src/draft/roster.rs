// Roster slots, deterministic fill order, and budget capacity math.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::position::Position;

/// A player assigned to a roster slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosteredPlayer {
    pub player_id: String,
    pub name: String,
    pub position: Position,
    pub price: u32,
}

/// A single slot on a team's roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterSlot {
    /// The slot designation (QB, RB, ..., FLEX, BE).
    pub position: Position,
    /// The player occupying this slot, if any.
    pub player: Option<RosteredPlayer>,
}

/// A team's complete roster of slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub slots: Vec<RosterSlot>,
}

impl Roster {
    /// Create an empty roster from a config mapping position strings to slot
    /// counts, e.g. `{"QB": 1, "RB": 2, "WR": 2, "TE": 1, "FLEX": 1, "K": 1,
    /// "DST": 1, "BE": 6}` from `[league.roster]`.
    ///
    /// Unknown position strings are ignored. Slots are created in the
    /// deterministic order given by `Position::sort_order()`.
    pub fn new(roster_config: &HashMap<String, usize>) -> Self {
        let mut slots: Vec<RosterSlot> = Vec::new();

        for (pos_str, &count) in roster_config {
            if let Some(pos) = Position::from_str_pos(pos_str) {
                for _ in 0..count {
                    slots.push(RosterSlot {
                        position: pos,
                        player: None,
                    });
                }
            }
        }

        slots.sort_by_key(|s| s.position.sort_order());

        Roster { slots }
    }

    /// Whether there is an empty slot with the given designation.
    pub fn has_empty_slot(&self, pos: Position) -> bool {
        self.slots
            .iter()
            .any(|s| s.position == pos && s.player.is_none())
    }

    /// Add a drafted player to the roster.
    ///
    /// Slot assignment is deterministic:
    /// 1. Dedicated position slot (exact match)
    /// 2. FLEX slot, for RB/WR/TE only
    /// 3. Bench slot
    ///
    /// Returns `true` if the player was placed, `false` if no slot is open.
    /// The ordering is a display policy only; it never changes budget math.
    pub fn add_player(
        &mut self,
        player_id: &str,
        name: &str,
        position: Position,
        price: u32,
    ) -> bool {
        let player = RosteredPlayer {
            player_id: player_id.to_string(),
            name: name.to_string(),
            position,
            price,
        };

        // 1. Dedicated position slot
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| s.position == position && s.player.is_none())
        {
            slot.player = Some(player);
            return true;
        }

        // 2. FLEX absorbs RB/WR/TE overflow
        if position.is_flex_eligible() {
            if let Some(slot) = self
                .slots
                .iter_mut()
                .find(|s| s.position == Position::Flex && s.player.is_none())
            {
                slot.player = Some(player);
                return true;
            }
        }

        // 3. Bench absorbs anything
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| s.position == Position::Bench && s.player.is_none())
        {
            slot.player = Some(player);
            return true;
        }

        false
    }

    /// Remove a player from the roster by ID. Returns the removed entry, or
    /// `None` if the player is not rostered. Used by draft reset and undo of
    /// force-assignments.
    pub fn remove_player(&mut self, player_id: &str) -> Option<RosteredPlayer> {
        for slot in &mut self.slots {
            if slot
                .player
                .as_ref()
                .is_some_and(|p| p.player_id == player_id)
            {
                return slot.player.take();
            }
        }
        None
    }

    /// Whether a player can be placed on this roster right now, following the
    /// same dedicated → FLEX → bench order as `add_player`.
    pub fn can_place(&self, position: Position) -> bool {
        if self.has_empty_slot(position) {
            return true;
        }
        if position.is_flex_eligible() && self.has_empty_slot(Position::Flex) {
            return true;
        }
        self.has_empty_slot(Position::Bench)
    }

    /// Whether a player with the given ID is already on this roster.
    pub fn has_player(&self, player_id: &str) -> bool {
        self.slots.iter().any(|s| {
            s.player
                .as_ref()
                .is_some_and(|p| p.player_id == player_id)
        })
    }

    /// Number of empty slots remaining.
    pub fn empty_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.player.is_none()).count()
    }

    /// Number of filled slots.
    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.player.is_some()).count()
    }

    /// Total number of slots.
    pub fn total_count(&self) -> usize {
        self.slots.len()
    }

    /// Maximum bid a team can make given its remaining budget.
    ///
    /// Reserves $1 for each slot that still needs filling after this one, so
    /// a team can never bid itself out of completing its roster. A team with
    /// zero empty slots cannot bid at all.
    pub fn max_bid(&self, budget_remaining: u32) -> u32 {
        let remaining_empty = self.empty_slots();
        if remaining_empty == 0 {
            return 0;
        }
        let reserved = (remaining_empty - 1) as u32;
        budget_remaining.saturating_sub(reserved)
    }
}
