//! Parimutuel betting market for the Seahaven simulation.
//!
//! The audience wagers on what the protagonist will do next. Odds are not
//! fixed in advance: every stake moves them so that they always reflect how
//! the pool is split between the options.
//!
//! # Architecture
//!
//! - [`market`] -- The [`BettingMarket`]: bet lifecycle and resolution.
//! - [`odds`] -- Pure parimutuel odds arithmetic.
//! - [`proposal`] -- Lenient conversion of collaborator bet payloads.
//!
//! # Odds rule
//!
//! For a bet with pool `P` and odds `o[x]`, the implied stake on option `x`
//! is `P / o[x]`. A stake of `a` on option `c` gives:
//!
//! ```text
//! o'[c] = (P + a) / (P / o[c] + a)
//! o'[x] = (P + a) / (P / o[x])        for x != c
//! ```
//!
//! An option with no implied stake yet keeps its current odds. All
//! arithmetic uses [`Decimal`] with checked operations; the market never
//! panics and never partially applies a stake.
//!
//! # Usage
//!
//! ```
//! use chrono::{TimeDelta, Utc};
//! use rust_decimal::Decimal;
//! use seahaven_market::{BettingMarket, MarketConfig, NewBet};
//! use seahaven_types::Stake;
//!
//! let mut market = BettingMarket::new(MarketConfig::default());
//! let now = Utc::now();
//! let bet = market
//!     .create_bet(
//!         NewBet::new("Will Truman go to the beach?", ["Yes", "No"], now + TimeDelta::hours(1)),
//!         now,
//!     )
//!     .ok();
//! let id = bet.map(|b| b.id.clone());
//! if let Some(id) = id {
//!     let stake = Stake { bet_id: id, option: "Yes".to_owned(), amount: Decimal::new(5, 0) };
//!     assert!(market.place_stake(&stake, now).is_ok());
//! }
//! ```

pub mod market;
pub mod odds;
pub mod proposal;

pub use market::{BettingMarket, MarketConfig, NewBet};
pub use proposal::{BetProposal, RawBetProposal, parse_amount, parse_end_time};

use rust_decimal::Decimal;
use seahaven_types::BetId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A bet could not be created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidBetError {
    /// The question is blank.
    #[error("bet question must not be empty")]
    EmptyQuestion,

    /// Fewer than two options were supplied.
    #[error("a bet needs at least two options, got {0}")]
    TooFewOptions(usize),

    /// An option label is blank.
    #[error("bet options must not be empty")]
    EmptyOption,

    /// Two options share a label.
    #[error("duplicate bet option: {0}")]
    DuplicateOption(String),

    /// A bet with this id is already active.
    #[error("a bet with id {0} already exists")]
    DuplicateId(BetId),

    /// The odds table does not have exactly one entry per option.
    #[error("odds do not match the bet options")]
    OddsMismatch,

    /// An odds value is zero or negative.
    #[error("odds for {option} must be positive, got {value}")]
    NonPositiveOdds {
        /// The option with the bad odds.
        option: String,
        /// The rejected value.
        value: Decimal,
    },

    /// The opening pool is negative.
    #[error("bet pool must not be negative, got {0}")]
    NegativePool(Decimal),

    /// The end time is not after the creation time.
    #[error("bet end time must be in the future")]
    EndTimeInPast,

    /// A collaborator payload was missing a field or had the wrong shape.
    #[error("malformed bet proposal: {0}")]
    Malformed(String),

    /// An internal error that should not occur in normal operation.
    #[error("internal market error: {0}")]
    InternalError(&'static str),
}

/// A stake could not be placed. The bet is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidStakeError {
    /// No active bet has this id.
    #[error("unknown bet: {0}")]
    UnknownBet(BetId),

    /// The option is not one of the bet's options.
    #[error("unknown option {option} for bet {bet_id}")]
    UnknownOption {
        /// The bet staked on.
        bet_id: BetId,
        /// The rejected option.
        option: String,
    },

    /// The amount is zero or negative.
    #[error("stake amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// The bet has already been resolved.
    #[error("bet {0} is already resolved")]
    Resolved(BetId),

    /// The bet's end time has passed.
    #[error("bet {0} is closed to new stakes")]
    Closed(BetId),

    /// Recomputing the pool or odds overflowed.
    #[error("stake on bet {0} overflows the pool arithmetic")]
    Overflow(BetId),
}
