//! Per-tick selection of the supporting agents that act.

use rand::Rng;
use seahaven_types::Agent;

/// Each agent independently acts with `probability`.
///
/// A probability outside `0..=1` (or NaN) selects nobody. Agents keep their
/// cast order.
pub fn select_participants<'a, R: Rng + ?Sized>(
    agents: &'a [Agent],
    probability: f64,
    rng: &mut R,
) -> Vec<&'a Agent> {
    if !(0.0..=1.0).contains(&probability) {
        return Vec::new();
    }
    agents
        .iter()
        .filter(|_| rng.random_bool(probability))
        .collect()
}
