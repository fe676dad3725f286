//! Adapter exposing an [`Accumulator`] as a `rand_core` random source, so
//! generic sampling code can draw from it.

use aes::Aes256;
use rand_core::{CryptoRng, RngCore};

use crate::accumulator::Accumulator;
use crate::error::Error;
use crate::primitive::BlockCipher256;
use crate::util::{bytes_to_i64, bytes_to_u64};

pub struct RandSource<'a, C: BlockCipher256 = Aes256> {
    acc: &'a Accumulator<C>,
}

impl<'a, C: BlockCipher256> RandSource<'a, C> {
    pub fn new(acc: &'a Accumulator<C>) -> Self {
        RandSource { acc }
    }

    /// Uniform on `0..=i64::MAX`.
    pub fn int63(&mut self) -> i64 {
        let mut bytes = self.acc.random_data(8);
        bytes[0] &= 0x7f;
        bytes_to_i64(&bytes)
    }

    /// Uniform on `0..=u64::MAX`.
    pub fn uint64(&mut self) -> u64 {
        bytes_to_u64(&self.acc.random_data(8))
    }

    /// Always panics: a cryptographic generator must never be put into a
    /// fixed, predictable state.
    pub fn seed(&mut self, _seed: i64) -> ! {
        panic!("{}", Error::MisuseSeedOnCsprng)
    }
}

impl<C: BlockCipher256> RngCore for RandSource<'_, C> {
    fn next_u32(&mut self) -> u32 {
        (self.uint64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.uint64()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.acc.fill(dst);
    }
}

impl<C: BlockCipher256> CryptoRng for RandSource<'_, C> {}
