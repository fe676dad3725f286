//! The Fortuna generator: a block cipher run in counter mode, rekeyed after
//! every request.

use aes::Aes256;

use crate::error::{Error, Result};
use crate::primitive::{sha256d, BlockCipher256};
use crate::util::{i64_to_bytes, wipe};

/// Generator key length in bytes.
pub const KEY_SIZE: usize = 32;

/// Cipher block length in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Largest number of bytes produced by one `pseudo_random_data` call.
pub const MAX_REQUEST: usize = 1 << 20;

/// Generator state. A counter of 0 means the generator has never been seeded
/// and refuses to produce output.
pub struct Generator<C: BlockCipher256 = Aes256> {
    key: [u8; KEY_SIZE],
    counter: u128,
    cipher: C,
}

impl<C: BlockCipher256> Generator<C> {
    /// Creates an unseeded generator.
    pub fn new() -> Self {
        let key = [0u8; KEY_SIZE];
        Generator {
            cipher: C::with_key(&key),
            key,
            counter: 0,
        }
    }

    /// Puts the generator into a reproducible state derived from `seed`.
    ///
    /// Only useful for tests and debugging. Output produced after calling this
    /// is predictable by anyone who knows `seed`; using it for secrets is a
    /// security error.
    pub fn seed(&mut self, seed: i64) {
        self.reset();
        self.reseed(&i64_to_bytes(seed));
    }

    /// Mixes `seed` into the key and advances the counter.
    pub fn reseed(&mut self, seed: &[u8]) {
        let mut new_key = sha256d(&[&self.key[..], seed]);
        self.set_key(&new_key);
        wipe(&mut new_key);
        self.counter += 1;
    }

    /// Returns `n` pseudo random bytes and replaces the key with fresh keystream.
    pub fn pseudo_random_data(&mut self, n: usize) -> Result<Vec<u8>> {
        if self.counter == 0 {
            return Err(Error::NotSeeded);
        }
        if n > MAX_REQUEST {
            return Err(Error::RequestTooLarge(n));
        }

        let num_blocks = n.div_ceil(BLOCK_SIZE);
        let mut out = vec![0u8; num_blocks * BLOCK_SIZE];
        self.generate_blocks(&mut out);
        out.truncate(n);

        let mut new_key = [0u8; KEY_SIZE];
        self.generate_blocks(&mut new_key);
        self.set_key(&new_key);
        wipe(&mut new_key);

        Ok(out)
    }

    /// Wipes the key and returns the generator to the unseeded state.
    pub fn reset(&mut self) {
        let zero = [0u8; KEY_SIZE];
        self.set_key(&zero);
        self.counter = 0;
    }

    pub fn is_seeded(&self) -> bool {
        self.counter != 0
    }

    /// Fills `buf` (a multiple of the block size) with encrypted counter blocks.
    fn generate_blocks(&mut self, buf: &mut [u8]) {
        for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
            let mut block = self.counter.to_be_bytes();
            self.cipher.encrypt(&mut block);
            chunk.copy_from_slice(&block);
            wipe(&mut block);
            self.counter += 1;
        }
    }

    fn set_key(&mut self, key: &[u8; KEY_SIZE]) {
        self.key.copy_from_slice(key);
        self.cipher = C::with_key(&self.key);
    }

    #[cfg(test)]
    pub(crate) fn key(&self) -> [u8; KEY_SIZE] {
        self.key
    }

    #[cfg(test)]
    pub(crate) fn counter(&self) -> u128 {
        self.counter
    }
}

impl<C: BlockCipher256> Default for Generator<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: BlockCipher256> Drop for Generator<C> {
    fn drop(&mut self) {
        wipe(&mut self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{bytes_to_i64, bytes_to_u64, i64_to_bytes, is_zero, u64_to_bytes};

    fn seeded(seed: i64) -> Generator {
        let mut gen = Generator::new();
        gen.seed(seed);
        gen
    }

    #[test]
    fn test_unseeded_refuses() {
        let mut gen: Generator = Generator::new();
        assert!(!gen.is_seeded());
        assert!(matches!(gen.pseudo_random_data(16), Err(Error::NotSeeded)));
    }

    #[test]
    fn test_reseed_from_zero_key() {
        let mut gen: Generator = Generator::new();
        gen.reseed(b"seed material");
        assert_eq!(gen.counter(), 1);
        assert!(!is_zero(&gen.key()));
        assert_eq!(gen.key(), sha256d(&[&[0u8; KEY_SIZE][..], &b"seed material"[..]]));
    }

    #[test]
    fn test_deterministic_same_seed() {
        let mut a = seeded(42);
        let mut b = seeded(42);
        for &n in &[0usize, 1, 15, 16, 17, 100, 4096] {
            assert_eq!(a.pseudo_random_data(n).unwrap(), b.pseudo_random_data(n).unwrap());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = seeded(1).pseudo_random_data(64).unwrap();
        let b = seeded(2).pseudo_random_data(64).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_correct_length() {
        let mut gen = seeded(7);
        for &size in &[0usize, 1, 16, 32, 33, 64, 1024] {
            assert_eq!(gen.pseudo_random_data(size).unwrap().len(), size);
        }
    }

    #[test]
    fn test_first_block_is_encrypted_counter() {
        let mut gen = seeded(99);
        let key = gen.key();
        let out = gen.pseudo_random_data(16).unwrap();

        let cipher = <Aes256 as BlockCipher256>::with_key(&key);
        let mut block = 1u128.to_be_bytes();
        cipher.encrypt(&mut block);
        assert_eq!(out, block);
    }

    #[test]
    fn test_rekey_after_each_request() {
        let mut gen = seeded(5);
        let key_before = gen.key();
        let counter_before = gen.counter();
        let out = gen.pseudo_random_data(40).unwrap();

        // 3 output blocks plus 2 key blocks
        assert_eq!(gen.counter(), counter_before + 5);
        assert_ne!(gen.key(), key_before);

        // The new key is the keystream continuing after the output.
        let cipher = <Aes256 as BlockCipher256>::with_key(&key_before);
        let mut expected = [0u8; KEY_SIZE];
        for (i, chunk) in expected.chunks_exact_mut(BLOCK_SIZE).enumerate() {
            let mut block = (counter_before + 3 + i as u128).to_be_bytes();
            cipher.encrypt(&mut block);
            chunk.copy_from_slice(&block);
        }
        assert_eq!(gen.key(), expected);
        assert_eq!(out.len(), 40);
    }

    #[test]
    fn test_split_requests_match() {
        // Same split of request lengths on both sides gives the same stream.
        let mut a = seeded(11);
        let mut b = seeded(11);
        let mut out_a = Vec::new();
        let mut out_b = Vec::new();
        for n in [3usize, 50, 7] {
            out_a.extend(a.pseudo_random_data(n).unwrap());
            out_b.extend(b.pseudo_random_data(n).unwrap());
        }
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn test_custom_cipher_counter_layout() {
        use crate::primitive::tests::XorCipher;

        let mut gen: Generator<XorCipher> = Generator::new();
        gen.seed(21);
        let key = gen.key();
        let out = gen.pseudo_random_data(40).unwrap();

        let cipher = XorCipher::with_key(&key);
        for (i, chunk) in out.chunks(BLOCK_SIZE).enumerate() {
            let mut block = (1 + i as u128).to_be_bytes();
            cipher.encrypt(&mut block);
            assert_eq!(chunk, &block[..chunk.len()], "block {}", i);
        }

        // blocks 4 and 5 become the next key
        let mut expected = [0u8; KEY_SIZE];
        for (i, chunk) in expected.chunks_exact_mut(BLOCK_SIZE).enumerate() {
            let mut block = (4 + i as u128).to_be_bytes();
            cipher.encrypt(&mut block);
            chunk.copy_from_slice(&block);
        }
        assert_eq!(gen.key(), expected);
        assert_eq!(gen.counter(), 6);
    }

    #[test]
    fn test_request_limit() {
        let mut gen = seeded(3);
        assert_eq!(gen.pseudo_random_data(MAX_REQUEST).unwrap().len(), MAX_REQUEST);
        assert!(matches!(
            gen.pseudo_random_data(MAX_REQUEST + 1),
            Err(Error::RequestTooLarge(n)) if n == MAX_REQUEST + 1
        ));
    }

    #[test]
    fn test_reset_wipes_state() {
        let mut gen = seeded(8);
        gen.pseudo_random_data(16).unwrap();
        gen.reset();
        assert!(is_zero(&gen.key()));
        assert_eq!(gen.counter(), 0);
        assert!(matches!(gen.pseudo_random_data(1), Err(Error::NotSeeded)));
    }

    #[test]
    fn test_generator_output_round_trips() {
        let mut gen = seeded(54321);
        for _ in 0..1000 {
            let buf = gen.pseudo_random_data(8).unwrap();
            assert_eq!(u64_to_bytes(bytes_to_u64(&buf)).to_vec(), buf);
            assert_eq!(i64_to_bytes(bytes_to_i64(&buf)).to_vec(), buf);
        }
    }
}
