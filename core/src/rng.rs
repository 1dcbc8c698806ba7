//! Deterministic random number generation.
//!
//! RULE: Nothing in the generator may call any platform RNG.
//! All randomness flows through StreamRng instances derived
//! from the single master seed in SynthConfig.
//!
//! Each consumer gets its own RNG stream, seeded deterministically
//! from (master_seed XOR stream_index). Adding a new stream never
//! changes the existing streams.

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single consumer.
pub struct StreamRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl StreamRng {
    /// Create a stream RNG from the master seed and a stable
    /// stream index. The index must never change once assigned.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.gen_range(0..n)
    }

    /// Uniform float in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    /// Uniform integer in [lo, hi], both ends inclusive.
    pub fn int_inclusive(&mut self, lo: i64, hi: i64) -> i64 {
        self.inner.gen_range(lo..=hi)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick one element uniformly. Panics on an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.next_u64_below(items.len() as u64) as usize]
    }

    /// Uniform in-place Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        use rand::seq::SliceRandom;
        items.shuffle(&mut self.inner);
    }

    /// Sample up to `k` distinct elements without replacement.
    pub fn sample<T: Clone>(&mut self, items: &[T], k: usize) -> Vec<T> {
        let k = k.min(items.len());
        rand::seq::index::sample(&mut self.inner, items.len(), k)
            .into_iter()
            .map(|i| items[i].clone())
            .collect()
    }

    /// Sample up to `k` distinct elements, each draw weighted by
    /// `weight(item)`. Zero-weight items are never chosen.
    pub fn weighted_sample<T: Clone>(
        &mut self,
        items: &[T],
        k: usize,
        weight: impl Fn(&T) -> f64,
    ) -> Vec<T> {
        let mut pool: Vec<(T, f64)> = items
            .iter()
            .map(|i| (i.clone(), weight(i)))
            .filter(|(_, w)| *w > 0.0)
            .collect();
        let mut total: f64 = pool.iter().map(|(_, w)| w).sum();
        let mut chosen = Vec::with_capacity(k.min(pool.len()));

        while chosen.len() < k && !pool.is_empty() {
            let roll = self.next_f64() * total;
            let mut cumulative = 0.0;
            let mut idx = pool.len() - 1;
            for (i, (_, w)) in pool.iter().enumerate() {
                cumulative += w;
                if roll < cumulative {
                    idx = i;
                    break;
                }
            }
            let (item, w) = pool.swap_remove(idx);
            total -= w;
            chosen.push(item);
        }
        chosen
    }
}

/// All stream RNGs for a single run, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_stream(&self, slot: StreamSlot) -> StreamRng {
        StreamRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries, only append.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    Tiering = 0,
    Candidates = 1,
    Structuring = 2,
    Layering = 3,
    LargeWire = 4,
    Offshore = 5,
    RapidInOut = 6,
    Legitimate = 7,
    Shuffle = 8,
    Directory = 9,
    InconsistentBusiness = 10,
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tiering => "tiering",
            Self::Candidates => "candidates",
            Self::Structuring => "structuring",
            Self::Layering => "layering",
            Self::LargeWire => "large_wire",
            Self::Offshore => "offshore",
            Self::RapidInOut => "rapid_in_out",
            Self::Legitimate => "legitimate",
            Self::Shuffle => "shuffle",
            Self::Directory => "directory",
            Self::InconsistentBusiness => "inconsistent_business",
        }
    }
}
