// Draft engine: state, turn order, bidding/resolution, admin overrides.

pub mod admin;
pub mod engine;
pub mod position;
pub mod roster;
pub mod sequencer;
pub mod state;

use thiserror::Error;

use state::Phase;

/// Rejection taxonomy for draft actions.
///
/// Every variant is a synchronous rejection with no partial mutation and no
/// broadcast; it is returned only to the originating caller.
/// `InvariantViolation` is the catch-all for logic defects; the engine
/// additionally logs it at `error!` so it is never silently swallowed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DraftError {
    #[error("not authorized for this action")]
    NotAuthorized,

    #[error("action not valid in phase {actual:?} (requires {expected:?})")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("it is not this team's turn to nominate")]
    WrongTurn,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("player is already drafted in this league")]
    ItemUnavailable,

    #[error("no active nomination to act on")]
    NoActiveNomination,

    #[error("a nomination is already in progress")]
    NominationAlreadyActive,

    #[error("{0} not found")]
    NotFound(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl DraftError {
    /// Stable wire identifier for this rejection kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DraftError::NotAuthorized => "NotAuthorized",
            DraftError::WrongPhase { .. } => "WrongPhase",
            DraftError::WrongTurn => "WrongTurn",
            DraftError::InvalidAmount(_) => "InvalidAmount",
            DraftError::ItemUnavailable => "ItemUnavailable",
            DraftError::NoActiveNomination => "NoActiveNomination",
            DraftError::NominationAlreadyActive => "NominationAlreadyActive",
            DraftError::NotFound(_) => "NotFound",
            DraftError::InvariantViolation(_) => "InvariantViolation",
        }
    }
}
