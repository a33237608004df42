// Football positions and roster slot designations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Roster slot designations for an auction draft league.
///
/// `Flex` is a real lineup slot that absorbs RB/WR/TE overflow;
/// `Bench` absorbs any position once dedicated and FLEX slots are full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
    Flex,
    Kicker,
    Defense,
    Bench,
}

impl Position {
    /// Parse a position string into a Position enum.
    ///
    /// Handles the common abbreviations used in league config and player
    /// pool files: "QB", "RB", "WR", "TE", "FLEX", "K", "DST"/"DEF",
    /// "BE"/"BN"/"BENCH".
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "FLEX" | "W/R/T" => Some(Position::Flex),
            "K" => Some(Position::Kicker),
            "DST" | "DEF" | "D/ST" => Some(Position::Defense),
            "BE" | "BN" | "BENCH" => Some(Position::Bench),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Flex => "FLEX",
            Position::Kicker => "K",
            Position::Defense => "DST",
            Position::Bench => "BE",
        }
    }

    /// Whether a player of this position may occupy a FLEX slot.
    pub fn is_flex_eligible(&self) -> bool {
        matches!(
            self,
            Position::RunningBack | Position::WideReceiver | Position::TightEnd
        )
    }

    /// Whether this is an absorption slot rather than a dedicated position
    /// (FLEX and BENCH are never a player's own position).
    pub fn is_absorption_slot(&self) -> bool {
        matches!(self, Position::Flex | Position::Bench)
    }

    /// Deterministic ordering index for roster slot display and fill order.
    pub fn sort_order(&self) -> u8 {
        match self {
            Position::Quarterback => 0,
            Position::RunningBack => 1,
            Position::WideReceiver => 2,
            Position::TightEnd => 3,
            Position::Flex => 4,
            Position::Kicker => 5,
            Position::Defense => 6,
            Position::Bench => 7,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}
