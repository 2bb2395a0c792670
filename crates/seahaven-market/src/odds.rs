//! Parimutuel odds arithmetic.
//!
//! Pure functions over [`Decimal`]. Every operation is checked and returns
//! `None` on overflow or on a result that would not be strictly positive,
//! so callers can reject the stake without touching the bet.
//!
//! Odds are derived from the amount actually behind each option, never
//! from the previous odds. An option nobody has backed yet keeps its
//! displayed odds as a placeholder; that placeholder never feeds into a
//! later computation.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

/// Opening odds when the pool is split evenly between `option_count`
/// options: each option pays out `option_count` times the stake.
pub fn even_split(option_count: usize) -> Decimal {
    Decimal::from(option_count.max(1))
}

/// Implied stake on an option: `pool / odds`.
pub fn implied_stake(pool: Decimal, odds: Decimal) -> Option<Decimal> {
    pool.checked_div(odds)
}

/// Amount behind each option when a bet opens with `pool` at `odds`.
///
/// An empty pool backs nothing, whatever the opening odds say.
pub fn opening_stakes(
    pool: Decimal,
    odds: &BTreeMap<String, Decimal>,
) -> Option<BTreeMap<String, Decimal>> {
    odds.iter()
        .map(|(option, &o)| {
            if o <= Decimal::ZERO {
                return None;
            }
            Some((option.clone(), implied_stake(pool, o)?))
        })
        .collect()
}

/// A bet's pool, stakes, and odds after one stake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repriced {
    /// Pool including the new stake.
    pub pool: Decimal,
    /// Amount behind each option including the new stake.
    pub staked: BTreeMap<String, Decimal>,
    /// `pool / staked[option]`, or the previous odds where nothing is staked.
    pub odds: BTreeMap<String, Decimal>,
}

/// Reprice a bet after staking `amount` on `chosen`.
///
/// `odds` must contain `chosen` and only strictly positive values;
/// `staked` has an entry per option (missing entries count as zero).
pub fn after_stake(
    pool: Decimal,
    staked: &BTreeMap<String, Decimal>,
    odds: &BTreeMap<String, Decimal>,
    chosen: &str,
    amount: Decimal,
) -> Option<Repriced> {
    if !odds.contains_key(chosen) || amount <= Decimal::ZERO {
        return None;
    }
    let new_pool = pool.checked_add(amount)?;

    let mut next_staked = BTreeMap::new();
    let mut next_odds = BTreeMap::new();
    for (option, &current) in odds {
        if current <= Decimal::ZERO {
            return None;
        }
        let mut behind = staked.get(option).copied().unwrap_or(Decimal::ZERO);
        if option == chosen {
            behind = behind.checked_add(amount)?;
        }
        let next = if behind > Decimal::ZERO {
            new_pool.checked_div(behind)?.normalize()
        } else {
            current
        };
        if next <= Decimal::ZERO {
            return None;
        }
        next_staked.insert(option.clone(), behind);
        next_odds.insert(option.clone(), next);
    }
    Some(Repriced {
        pool: new_pool,
        staked: next_staked,
        odds: next_odds,
    })
}
