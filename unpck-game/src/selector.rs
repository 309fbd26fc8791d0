//! Round item selection.
use rand::Rng;
use rand::seq::SliceRandom;

use crate::catalog::{Trip, TripItem};

/// Draw the ordered item list for one round of `trip`.
///
/// Shuffles a copy of the pool uniformly (Fisher-Yates) and keeps the first
/// [`Trip::round_len`] entries, so no item repeats within a round.
#[must_use]
pub fn select_round_items<R>(trip: &Trip, rng: &mut R) -> Vec<TripItem>
where
    R: Rng + ?Sized,
{
    let target = trip.round_len();
    let mut pool = trip.items.clone();
    pool.shuffle(rng);
    pool.truncate(target);
    pool
}
