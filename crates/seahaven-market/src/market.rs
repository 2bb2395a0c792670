//! The betting market: sole owner of the active bet collection.
//!
//! Stakes are applied through `&mut self`, so the owner's lock serialises
//! them and no stake can be lost to a concurrent update. Creation and
//! staking either commit fully or leave the market untouched.
//!
//! Resolution is split in two so the collaborator call can happen without
//! holding the lock: the caller takes a snapshot of [`BettingMarket::active_bets`],
//! asks the collaborator, then hands the verdicts to
//! [`BettingMarket::apply_resolutions`] together with the snapshot's ids.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use seahaven_types::{Bet, BetId, BetResolution, ResolvedBet, Stake};
use tracing::{debug, info, warn};

use crate::odds::{after_stake, even_split, opening_stakes};
use crate::proposal::BetProposal;
use crate::{InvalidBetError, InvalidStakeError};

/// Market-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketConfig {
    /// Pool a user-created bet opens with.
    pub seed_pool: Decimal,
    /// Lifetime of a bet whose end time was not given.
    pub default_duration: TimeDelta,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            seed_pool: Decimal::ZERO,
            default_duration: TimeDelta::hours(1),
        }
    }
}

/// A user request to open a bet at even odds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBet {
    /// Requested id; generated when `None`.
    pub id: Option<BetId>,
    /// The question.
    pub question: String,
    /// Outcome labels.
    pub options: Vec<String>,
    /// When staking closes.
    pub end_time: DateTime<Utc>,
}

impl NewBet {
    /// A bet with a generated id.
    pub fn new<I, S>(question: impl Into<String>, options: I, end_time: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            question: question.into(),
            options: options.into_iter().map(Into::into).collect(),
            end_time,
        }
    }

    /// Request a specific id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<BetId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Check question and options; returns the trimmed options.
fn validate_options(question: &str, options: &[String]) -> Result<Vec<String>, InvalidBetError> {
    if question.trim().is_empty() {
        return Err(InvalidBetError::EmptyQuestion);
    }
    if options.len() < 2 {
        return Err(InvalidBetError::TooFewOptions(options.len()));
    }
    let mut seen = BTreeSet::new();
    let mut trimmed = Vec::with_capacity(options.len());
    for option in options {
        let option = option.trim();
        if option.is_empty() {
            return Err(InvalidBetError::EmptyOption);
        }
        if !seen.insert(option) {
            return Err(InvalidBetError::DuplicateOption(option.to_owned()));
        }
        trimmed.push(option.to_owned());
    }
    Ok(trimmed)
}

/// Opening odds of `option_count` at an even split.
fn even_odds(options: &[String]) -> BTreeMap<String, Decimal> {
    let odds = even_split(options.len());
    options.iter().map(|o| (o.clone(), odds)).collect()
}

/// The active bets.
#[derive(Debug, Clone, Default)]
pub struct BettingMarket {
    /// Active bets in creation order.
    bets: Vec<Bet>,
    /// Settings.
    config: MarketConfig,
}

impl BettingMarket {
    /// Create an empty market.
    pub const fn new(config: MarketConfig) -> Self {
        Self {
            bets: Vec::new(),
            config,
        }
    }

    /// Market settings.
    pub const fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Number of active bets.
    pub fn len(&self) -> usize {
        self.bets.len()
    }

    /// Whether there are no active bets.
    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }

    /// Active bets in creation order.
    pub fn active_bets(&self) -> &[Bet] {
        &self.bets
    }

    /// Look up an active bet.
    pub fn get(&self, id: &BetId) -> Option<&Bet> {
        self.bets.iter().find(|b| b.id == *id)
    }

    fn contains(&self, id: &BetId) -> bool {
        self.get(id).is_some()
    }

    fn push(&mut self, bet: Bet) -> Result<&Bet, InvalidBetError> {
        info!(
            bet_id = %bet.id,
            question = %bet.question,
            options = bet.options.len(),
            pool = %bet.pool,
            "bet created"
        );
        self.bets.push(bet);
        self.bets
            .last()
            .ok_or(InvalidBetError::InternalError("bet missing after insertion"))
    }

    /// Open a bet at even odds with the configured seed pool.
    pub fn create_bet(&mut self, request: NewBet, now: DateTime<Utc>) -> Result<&Bet, InvalidBetError> {
        let options = validate_options(&request.question, &request.options)?;
        if request.end_time <= now {
            return Err(InvalidBetError::EndTimeInPast);
        }
        let id = match request.id {
            Some(id) if self.contains(&id) => return Err(InvalidBetError::DuplicateId(id)),
            Some(id) => id,
            None => self.fresh_id(),
        };
        let odds = even_odds(&options);
        let pool = self.config.seed_pool;
        let staked = opening_stakes(pool, &odds)
            .ok_or(InvalidBetError::InternalError("opening stakes overflow"))?;
        let bet = Bet {
            id,
            question: request.question.trim().to_owned(),
            odds,
            staked,
            options,
            pool,
            created_at: now,
            end_time: request.end_time,
            resolved: false,
        };
        self.push(bet)
    }

    /// Open a bet carrying its own pool and odds, as generated bets do.
    ///
    /// A missing or already-taken id is replaced with a fresh one rather
    /// than rejected.
    pub fn create_seeded_bet(
        &mut self,
        proposal: BetProposal,
        now: DateTime<Utc>,
    ) -> Result<&Bet, InvalidBetError> {
        let options = validate_options(&proposal.question, &proposal.options)?;
        if proposal.end_time <= now {
            return Err(InvalidBetError::EndTimeInPast);
        }
        if proposal.pool < Decimal::ZERO {
            return Err(InvalidBetError::NegativePool(proposal.pool));
        }

        let odds = match proposal.odds {
            None => even_odds(&options),
            Some(raw) => {
                let trimmed: BTreeMap<String, Decimal> = raw
                    .into_iter()
                    .map(|(k, v)| (k.trim().to_owned(), v))
                    .collect();
                if trimmed.len() != options.len() || options.iter().any(|o| !trimmed.contains_key(o)) {
                    return Err(InvalidBetError::OddsMismatch);
                }
                if let Some((option, &value)) = trimmed.iter().find(|(_, v)| **v <= Decimal::ZERO) {
                    return Err(InvalidBetError::NonPositiveOdds {
                        option: option.clone(),
                        value,
                    });
                }
                trimmed
            }
        };

        let id = match proposal.id {
            Some(id) if !self.contains(&id) => id,
            Some(taken) => {
                debug!(bet_id = %taken, "proposed bet id taken, generating a fresh one");
                self.fresh_id()
            }
            None => self.fresh_id(),
        };

        let staked = opening_stakes(proposal.pool, &odds)
            .ok_or(InvalidBetError::InternalError("opening stakes overflow"))?;
        let bet = Bet {
            id,
            question: proposal.question.trim().to_owned(),
            options,
            pool: proposal.pool,
            odds,
            staked,
            created_at: now,
            end_time: proposal.end_time,
            resolved: false,
        };
        self.push(bet)
    }

    fn fresh_id(&self) -> BetId {
        loop {
            let id = BetId::generate();
            if !self.contains(&id) {
                return id;
            }
        }
    }

    /// Place a stake and recompute the bet's pool and odds.
    pub fn place_stake(&mut self, stake: &Stake, now: DateTime<Utc>) -> Result<&Bet, InvalidStakeError> {
        if stake.amount <= Decimal::ZERO {
            return Err(InvalidStakeError::NonPositiveAmount(stake.amount));
        }
        let bet = self
            .bets
            .iter_mut()
            .find(|b| b.id == stake.bet_id)
            .ok_or_else(|| InvalidStakeError::UnknownBet(stake.bet_id.clone()))?;
        if bet.resolved {
            return Err(InvalidStakeError::Resolved(bet.id.clone()));
        }
        if !bet.is_open(now) {
            return Err(InvalidStakeError::Closed(bet.id.clone()));
        }
        if !bet.options.iter().any(|o| *o == stake.option) {
            return Err(InvalidStakeError::UnknownOption {
                bet_id: bet.id.clone(),
                option: stake.option.clone(),
            });
        }

        let repriced = after_stake(bet.pool, &bet.staked, &bet.odds, &stake.option, stake.amount)
            .ok_or_else(|| InvalidStakeError::Overflow(bet.id.clone()))?;
        bet.pool = repriced.pool;
        bet.staked = repriced.staked;
        bet.odds = repriced.odds;
        info!(
            bet_id = %bet.id,
            option = %stake.option,
            amount = %stake.amount,
            pool = %bet.pool,
            "stake placed"
        );
        Ok(bet)
    }

    /// Resolve one bet and remove it from the active set.
    pub fn resolve(
        &mut self,
        id: &BetId,
        success: bool,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Option<ResolvedBet> {
        let index = self.bets.iter().position(|b| b.id == *id)?;
        let mut bet = self.bets.remove(index);
        bet.resolved = true;
        let resolved = ResolvedBet {
            bet,
            success,
            message: message.into(),
            resolved_at: now,
        };
        info!(
            bet_id = %resolved.bet.id,
            success,
            message = %resolved.message,
            "bet resolved"
        );
        Some(resolved)
    }

    /// Apply collaborator verdicts for a snapshot taken before the call.
    ///
    /// Only bets that were in the snapshot, appear in `results`, and are
    /// still active are resolved. Everything else stays as it is, including
    /// bets created while the call was in flight.
    pub fn apply_resolutions(
        &mut self,
        snapshot_ids: &BTreeSet<BetId>,
        results: Vec<BetResolution>,
        now: DateTime<Utc>,
    ) -> Vec<ResolvedBet> {
        let mut resolved = Vec::new();
        for result in results {
            if !snapshot_ids.contains(&result.id) {
                warn!(bet_id = %result.id, "resolution for a bet outside the snapshot ignored");
                continue;
            }
            if let Some(done) = self.resolve(&result.id, result.success, result.message, now) {
                resolved.push(done);
            }
        }
        resolved
    }
}
