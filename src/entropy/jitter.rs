//! CPU timing jitter.
//!
//! Each sample is a monotonic timestamp taken after a busy-spin whose length
//! depends on the previous samples, so cache misses, interrupts and
//! scheduler preemption show up in the low bits. The samples are folded into
//! the first reseed by [`initial_seed`](super::initial_seed) and, in stream
//! mode, fed one at a time into the pools through a data sink.

/// Bytes per jitter sample; also the size of one pool event.
pub const SAMPLE_SIZE: usize = 8;

/// Stateful sampler. The running sum of past timestamps picks the spin length
/// for the next one.
#[derive(Default)]
pub struct JitterSampler {
    acc: u64,
    round: u64,
}

impl JitterSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spins, then reads the clock.
    pub fn sample(&mut self) -> [u8; SAMPLE_SIZE] {
        let spin_count = 1000 + (self.acc & 0x1FF) as usize;
        let mut x: u64 = self.round.wrapping_mul(0x6C62272E07BB0142);
        for _ in 0..spin_count {
            x = x.wrapping_mul(0x5DEECE66D).wrapping_add(0xB);
        }
        std::hint::black_box(x);

        let ts = monotonic_ns();
        self.acc = self.acc.wrapping_add(ts);
        self.round = self.round.wrapping_add(1);
        ts.to_le_bytes()
    }
}

/// `count` samples as separate pool events, for round-robin submission.
pub fn jitter_events(count: usize) -> Vec<[u8; SAMPLE_SIZE]> {
    let mut sampler = JitterSampler::new();
    (0..count).map(|_| sampler.sample()).collect()
}

/// `count` samples concatenated, for hashing into a seed.
pub fn collect_jitter_samples(count: usize) -> Vec<u8> {
    let mut sampler = JitterSampler::new();
    let mut samples = Vec::with_capacity(count * SAMPLE_SIZE);
    for _ in 0..count {
        samples.extend_from_slice(&sampler.sample());
    }
    samples
}

/// Nanoseconds on the monotonic clock.
pub fn monotonic_ns() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec.
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    (ts.tv_sec as u64)
        .wrapping_mul(1_000_000_000)
        .wrapping_add(ts.tv_nsec as u64)
}
