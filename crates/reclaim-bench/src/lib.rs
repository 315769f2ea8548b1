//! Benchmark workloads for the Reclaim arenas.
//!
//! Provides deterministic request streams so every arena is measured
//! against the same sequence:
//!
//! - [`request_mix`]: `(size, align)` pairs skewed towards small objects
//! - [`key_corpus`]: byte keys with a controlled duplicate rate
//! - [`run_requests`]: drive any [`Alloc`] through a request stream

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use reclaim_core::{Alloc, AllocError};

/// Minimal LCG (Knuth MMIX constants). Deterministic across platforms.
#[derive(Clone, Debug)]
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 11
    }

    /// Uniform-ish value in `0..bound` (`bound > 0`).
    pub fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

/// Generate `n` allocation requests.
///
/// Roughly 3 in 4 requests are 8..=64 bytes, the rest up to 4 KiB.
/// Alignment is 0 (arena default) half of the time, otherwise 1..=64.
pub fn request_mix(n: usize, seed: u64) -> Vec<(usize, usize)> {
    let mut rng = Lcg::new(seed);
    (0..n)
        .map(|_| {
            let size = if rng.below(4) == 0 {
                64 + rng.below(4096 - 64) as usize
            } else {
                8 + rng.below(57) as usize
            };
            let align = match rng.below(2) {
                0 => 0,
                _ => 1usize << rng.below(7),
            };
            (size, align)
        })
        .collect()
}

/// Generate `n` keys of 4..=24 bytes where about one in `dup_every` repeats
/// an earlier key.
pub fn key_corpus(n: usize, dup_every: u64, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = Lcg::new(seed);
    let mut keys: Vec<Vec<u8>> = Vec::with_capacity(n);
    for _ in 0..n {
        if !keys.is_empty() && dup_every > 0 && rng.below(dup_every) == 0 {
            let i = rng.below(keys.len() as u64) as usize;
            keys.push(keys[i].clone());
            continue;
        }
        let len = 4 + rng.below(21) as usize;
        keys.push((0..len).map(|_| b'a' + rng.below(26) as u8).collect());
    }
    keys
}

/// Allocate every request in order. Returns the total bytes requested.
pub fn run_requests<A: Alloc>(a: &mut A, requests: &[(usize, usize)]) -> Result<usize, AllocError> {
    let mut total = 0;
    for &(size, align) in requests {
        a.alloc(size, align)?;
        total += size;
    }
    Ok(total)
}

/// Total bytes a request stream asks for, ignoring padding.
pub fn requested_bytes(requests: &[(usize, usize)]) -> usize {
    requests.iter().map(|&(size, _)| size).sum()
}
