//! The 32 entropy pools and the reseed schedule.
//!
//! Pool `i` takes part in every reseed whose count is divisible by `2^i`, so
//! deeper pools collect entropy for exponentially longer before it is spent.

use std::time::{Duration, Instant};

use crate::primitive::{Sha256d, DIGEST_SIZE};

pub const NUM_POOLS: usize = 32;

/// Bytes pool 0 must receive between reseeds.
pub const MIN_POOL_SIZE: usize = 32;

pub const MIN_RESEED_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Default)]
struct Pool {
    hasher: Sha256d,
    size: usize,
}

impl Pool {
    fn drain_into(&mut self, seed: &mut Vec<u8>) {
        seed.extend_from_slice(&self.hasher.finalize_reset());
        self.size = 0;
    }
}

pub struct PoolBank {
    pools: Vec<Pool>,
    pool_zero_size: usize,
    reseed_count: u64,
    next_reseed: Option<Instant>,
}

impl PoolBank {
    pub fn new() -> Self {
        PoolBank {
            pools: vec![Pool::default(); NUM_POOLS],
            pool_zero_size: 0,
            reseed_count: 0,
            next_reseed: None,
        }
    }

    /// Hashes one event from `source` into pool `pool`.
    ///
    /// The event is framed as `[source, len] ++ data`. Only the payload length
    /// counts toward the pool size.
    pub fn submit(&mut self, pool: usize, source: u8, data: &[u8]) {
        let p = &mut self.pools[pool % NUM_POOLS];
        let len = u8::try_from(data.len()).unwrap_or(u8::MAX);
        p.hasher.update(&[source, len]);
        p.hasher.update(data);
        p.size += data.len();
        if pool % NUM_POOLS == 0 {
            self.pool_zero_size += data.len();
        }
    }

    /// Returns seed material if pool 0 is full and the minimum interval since
    /// the previous reseed has passed, draining the scheduled pools.
    pub fn try_reseed(&mut self, now: Instant) -> Option<Vec<u8>> {
        if self.pool_zero_size < MIN_POOL_SIZE {
            return None;
        }
        if let Some(next) = self.next_reseed {
            if now < next {
                return None;
            }
        }

        self.reseed_count += 1;
        self.next_reseed = Some(now + MIN_RESEED_INTERVAL);
        self.pool_zero_size = 0;

        let mut seed = Vec::with_capacity(NUM_POOLS * DIGEST_SIZE);
        for (i, pool) in self.pools.iter_mut().enumerate() {
            if self.reseed_count % (1u64 << i) != 0 {
                break;
            }
            pool.drain_into(&mut seed);
        }

        log::debug!(
            "reseed #{} using {} pool(s)",
            self.reseed_count,
            seed.len() / DIGEST_SIZE
        );
        Some(seed)
    }

    /// Drains every pool regardless of the schedule. Used once, at shutdown.
    pub fn drain_all(&mut self) -> Vec<u8> {
        let mut seed = Vec::with_capacity(NUM_POOLS * DIGEST_SIZE);
        for pool in self.pools.iter_mut() {
            pool.drain_into(&mut seed);
        }
        // no last-minute scheduled reseed after this
        self.pool_zero_size = 0;
        seed
    }

    pub fn reseed_count(&self) -> u64 {
        self.reseed_count
    }

    pub fn pool_size(&self, pool: usize) -> usize {
        self.pools[pool].size
    }
}

impl Default for PoolBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::sha256d;

    fn fill_pool_zero(bank: &mut PoolBank) {
        bank.submit(0, 0, &[0xAB; MIN_POOL_SIZE]);
    }

    #[test]
    fn test_no_reseed_below_min_pool_size() {
        let mut bank = PoolBank::new();
        bank.submit(0, 0, &[1u8; MIN_POOL_SIZE - 1]);
        let far_future = Instant::now() + Duration::from_secs(3600);
        assert!(bank.try_reseed(far_future).is_none());
        assert_eq!(bank.reseed_count(), 0);
    }

    #[test]
    fn test_other_pools_do_not_count() {
        let mut bank = PoolBank::new();
        for i in 1..NUM_POOLS {
            bank.submit(i, 0, &[1u8; 64]);
        }
        assert!(bank.try_reseed(Instant::now()).is_none());
    }

    #[test]
    fn test_rate_limited() {
        let mut bank = PoolBank::new();
        let t0 = Instant::now();
        fill_pool_zero(&mut bank);
        assert!(bank.try_reseed(t0).is_some());

        fill_pool_zero(&mut bank);
        assert!(bank.try_reseed(t0 + Duration::from_millis(50)).is_none());
        assert!(bank.try_reseed(t0 + Duration::from_millis(99)).is_none());
        assert!(bank.try_reseed(t0 + MIN_RESEED_INTERVAL).is_some());
        assert_eq!(bank.reseed_count(), 2);
    }

    #[test]
    fn test_reseed_resets_pool_zero_counter() {
        let mut bank = PoolBank::new();
        let t0 = Instant::now();
        fill_pool_zero(&mut bank);
        assert!(bank.try_reseed(t0).is_some());
        assert!(bank.try_reseed(t0 + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_pool_schedule() {
        let mut bank = PoolBank::new();
        let mut now = Instant::now();
        for count in 1..=64u64 {
            for i in 0..NUM_POOLS {
                bank.submit(i, 1, &[i as u8; MIN_POOL_SIZE]);
            }
            let seed = bank.try_reseed(now).expect("reseed should be due");
            let used = seed.len() / DIGEST_SIZE;
            assert_eq!(used as u32, count.trailing_zeros() + 1, "count {}", count);

            assert_eq!(bank.pool_size(0), 0);
            for i in 1..8 {
                let drained = count % (1u64 << i) == 0;
                assert_eq!(bank.pool_size(i) == 0, drained, "count {} pool {}", count, i);
            }
            now += MIN_RESEED_INTERVAL;
        }
        assert_eq!(bank.reseed_count(), 64);
    }

    #[test]
    fn test_seed_is_pool_digests() {
        let mut bank = PoolBank::new();
        bank.submit(0, 7, &[9u8; MIN_POOL_SIZE]);
        let seed = bank.try_reseed(Instant::now()).unwrap();

        let mut framed = vec![7u8, MIN_POOL_SIZE as u8];
        framed.extend_from_slice(&[9u8; MIN_POOL_SIZE]);
        assert_eq!(seed, sha256d(&[&framed[..]]).to_vec());
    }

    #[test]
    fn test_drain_all() {
        let mut bank = PoolBank::new();
        for i in 0..NUM_POOLS {
            bank.submit(i, 0, b"x");
        }
        let seed = bank.drain_all();
        assert_eq!(seed.len(), NUM_POOLS * DIGEST_SIZE);
        for i in 0..NUM_POOLS {
            assert_eq!(bank.pool_size(i), 0);
        }
        // drained pools start over from the empty digest
        let again = bank.drain_all();
        assert_eq!(&again[..DIGEST_SIZE], &sha256d(&[])[..]);
    }

    #[test]
    fn test_drain_all_blocks_scheduled_reseed() {
        let mut bank = PoolBank::new();
        fill_pool_zero(&mut bank);
        bank.drain_all();
        assert!(bank.try_reseed(Instant::now()).is_none());
    }
}
