use crate::error::{StoreError, StoreResult};
use rand::seq::IteratorRandom;
use rand::Rng;
use std::collections::HashSet;

pub const STUDENT_ID_LEN: u32 = 6;
pub const SUBJECT_ID_LEN: u32 = 3;

const MAX_RANDOM_DRAWS: usize = 1000;

/// Generate a `length`-digit numeric id not present in `existing`.
///
/// Draws uniformly from `[10^(length-1), 10^length - 1]`. When the space is
/// nearly full and random draws keep colliding, it falls back to a uniform
/// pick among the values still free.
pub fn generate_unique_id<R: Rng + ?Sized>(
    existing: &HashSet<String>,
    length: u32,
    rng: &mut R,
) -> StoreResult<String> {
    let exhausted = || StoreError::CapacityExhausted { length };
    if length == 0 {
        return Err(exhausted());
    }
    let lower = 10u64.checked_pow(length - 1).ok_or_else(exhausted)?;
    let upper = 10u64
        .checked_pow(length)
        .map(|v| v - 1)
        .ok_or_else(exhausted)?;

    for _ in 0..MAX_RANDOM_DRAWS {
        let candidate = rng.gen_range(lower..=upper).to_string();
        if !existing.contains(&candidate) {
            return Ok(candidate);
        }
    }

    (lower..=upper)
        .filter(|v| !existing.contains(&v.to_string()))
        .choose(rng)
        .map(|v| v.to_string())
        .ok_or_else(exhausted)
}
