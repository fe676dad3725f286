//! Ambient entropy producers. None of these fail: an unavailable source
//! contributes empty input and the remaining sources carry the load.

pub mod jitter;
pub mod procfs;
pub mod system;

use crate::mixer;
use crate::util::wipe;

/// Number of jitter samples folded into the first reseed.
const STARTUP_JITTER_SAMPLES: usize = 64;

/// Builds the material for the first reseed of a new accumulator from the
/// stored seed record (possibly empty), the current time, host and user
/// identity, system random bytes and CPU timing jitter.
pub fn initial_seed(stored: &[u8]) -> [u8; 32] {
    let mut urandom = system::urandom(32);
    let mut jitter = jitter::collect_jitter_samples(STARTUP_JITTER_SAMPLES);
    let seed = mixer::mix_entropy(&[
        ("seed-file", stored),
        ("time", &system::wall_clock()),
        ("identity", &system::identity()),
        ("urandom", &urandom),
        ("jitter", &jitter),
    ]);
    wipe(&mut urandom);
    wipe(&mut jitter);
    seed
}
