//! Closed-form logsignature feature dimension.

/// Number of logsignature channels for a path with `channels` channels
/// truncated at `depth`.
///
/// This is the number of Lyndon words of length 1..=depth over a `channels`
/// letter alphabet, by Witt's formula:
///
/// `sum_{d=1}^{depth} (1/d) * sum_{e | d} mobius(e) * channels^(d/e)`
///
/// Determines the shape of the learned linear map in the logsignature
/// discrepancy, so it must agree exactly with the external transform
/// primitive's declared law.
///
/// # Examples
///
/// ```
/// use shapelet_rs::logsignature_channels;
///
/// assert_eq!(logsignature_channels(2, 2), 3);
/// assert_eq!(logsignature_channels(3, 2), 6);
/// ```
pub fn logsignature_channels(channels: usize, depth: usize) -> usize {
    debug_assert!(depth >= 1, "depth must be >= 1");
    let c = channels as i64;
    let mut total: i64 = 0;
    for d in 1..=depth as i64 {
        let mut necklaces: i64 = 0;
        for e in 1..=d {
            if d % e == 0 {
                necklaces += mobius(e) * c.pow((d / e) as u32);
            }
        }
        total += necklaces / d;
    }
    total as usize
}

/// Möbius function by trial factorization. Inputs here are tiny (the
/// signature depth), so no sieve is needed.
fn mobius(mut n: i64) -> i64 {
    let mut primes = 0;
    let mut p = 2;
    while p * p <= n {
        if n % p == 0 {
            n /= p;
            if n % p == 0 {
                return 0; // squared factor
            }
            primes += 1;
        }
        p += 1;
    }
    if n > 1 {
        primes += 1;
    }
    if primes % 2 == 0 {
        1
    } else {
        -1
    }
}
