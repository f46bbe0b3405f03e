//! Bucket lower bound computation.
//!
//! Both layouts produce exactly `n_buckets` strictly increasing lower
//! bounds. Bucket 0 is the underflow bucket starting at 0 and bucket 1
//! starts at `low`. Whenever rounding would produce a bound that is not
//! above its predecessor, the bound is moved to predecessor + 1.
//!
//! Callers guarantee `high - low >= n_buckets - 2`. Under that rule every
//! bound lies in `[low, high]` and the last one is exactly `high`.

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn strictly_after(prev: i64, value: i64) -> i64 {
    if value > prev {
        value
    } else {
        prev + 1
    }
}

/// Evenly spaced bounds from `low` (bucket 1) to `high` (last bucket).
pub fn linear_buckets(low: u32, high: u32, n_buckets: u32) -> Vec<i64> {
    debug_assert!(n_buckets > 2, "linear histograms need at least 3 buckets");
    let n = n_buckets as usize;
    let mut ranges = vec![0i64; n];
    let (low, high) = (f64::from(low), f64::from(high));
    let steps = f64::from(n_buckets - 2);
    for i in 1..n {
        let i_f = i as f64;
        let value = (low * (f64::from(n_buckets) - 1.0 - i_f) + high * (i_f - 1.0)) / steps;
        ranges[i] = strictly_after(ranges[i - 1], round_half_up(value));
    }
    ranges
}

/// Geometrically spaced bounds from `low` (bucket 1) to `high`.
///
/// Each step re-targets the remaining distance to `high` in log space, so a
/// repaired (bumped) bucket spreads its error over the buckets after it.
pub fn exponential_buckets(low: u32, high: u32, n_buckets: u32) -> Vec<i64> {
    debug_assert!(n_buckets > 2, "exponential histograms need at least 3 buckets");
    let n = n_buckets as usize;
    let mut ranges = vec![0i64; n];
    let log_max = f64::from(high).ln();
    let mut current = i64::from(low);
    ranges[1] = current;
    for (i, slot) in ranges.iter_mut().enumerate().skip(2) {
        let log_current = (current as f64).ln();
        let log_ratio = (log_max - log_current) / (n - i) as f64;
        let next = round_half_up((log_current + log_ratio).exp());
        current = strictly_after(current, next);
        *slot = current;
    }
    ranges
}
