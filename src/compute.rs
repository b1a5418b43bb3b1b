//! The terminal computation: Collatz (hailstone) chain lengths.
//!
//! Pure functions, no shared state. The pipeline never calls these directly —
//! they sit behind the terminal handler, past the cache stage, so they only
//! run on a cache miss.

/// Errors the computation itself can produce.
///
/// `NotPositive` is client-caused (bad input); `Overflow` is server-caused
/// (the domain outran `i64`).
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ComputeError {
    #[error("number has to be greater than zero")]
    NotPositive,
    #[error("integer overflow")]
    Overflow,
}

/// The longest chain found by [`longest_chain`]: which starting value, and
/// how many terms its sequence has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peak {
    pub number: i64,
    pub max: u32,
}

/// Number of terms in the Collatz sequence starting at `n`, the start and the
/// final 1 both included: `chain_length(1) == 1`, `chain_length(2) == 2`.
pub fn chain_length(mut n: i64) -> Result<u32, ComputeError> {
    if n <= 0 {
        return Err(ComputeError::NotPositive);
    }
    let mut len = 1;
    while n != 1 {
        n = if n % 2 == 0 {
            n / 2
        } else {
            n.checked_mul(3).and_then(|v| v.checked_add(1)).ok_or(ComputeError::Overflow)?
        };
        len += 1;
    }
    Ok(len)
}

/// Scans `1..=limit` and returns the starting value with the longest chain.
///
/// Ties keep the earlier starting value. Overflow anywhere in the scan aborts
/// the whole query rather than silently truncating it.
pub fn longest_chain(limit: i64) -> Result<Peak, ComputeError> {
    if limit <= 0 {
        return Err(ComputeError::NotPositive);
    }
    let mut peak = Peak { number: 1, max: 0 };
    for n in 1..=limit {
        let len = chain_length(n)?;
        if len > peak.max {
            peak = Peak { number: n, max: len };
        }
    }
    Ok(peak)
}
