//! The two primitives the generator and the entropy pools are built on: a
//! block cipher with a 256-bit key and a 128-bit block, and SHA-256 applied
//! twice (SHA-256d).

use cipher::consts::{U16, U32};
use cipher::generic_array::GenericArray;
use cipher::{BlockEncrypt, BlockSizeUser, KeyInit, KeySizeUser};
use sha2::{Digest, Sha256};

/// Digest length of SHA-256d in bytes.
pub const DIGEST_SIZE: usize = 32;

/// A block cipher keyed with 32 bytes that encrypts 16-byte blocks.
///
/// Implemented for every RustCrypto cipher with matching key and block sizes,
/// e.g. `aes::Aes256`.
pub trait BlockCipher256: Send {
    fn with_key(key: &[u8; 32]) -> Self
    where
        Self: Sized;

    fn encrypt(&self, block: &mut [u8; 16]);
}

impl<C> BlockCipher256 for C
where
    C: KeyInit + BlockEncrypt + KeySizeUser<KeySize = U32> + BlockSizeUser<BlockSize = U16> + Send,
{
    fn with_key(key: &[u8; 32]) -> Self {
        <C as KeyInit>::new(GenericArray::from_slice(&key[..]))
    }

    fn encrypt(&self, block: &mut [u8; 16]) {
        BlockEncrypt::encrypt_block(self, GenericArray::from_mut_slice(&mut block[..]));
    }
}

/// Incremental SHA-256d hasher.
#[derive(Clone, Default)]
pub struct Sha256d {
    inner: Sha256,
}

impl Sha256d {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Returns `SHA-256(SHA-256(data))` and resets the hasher to its empty state.
    pub fn finalize_reset(&mut self) -> [u8; DIGEST_SIZE] {
        let first = self.inner.finalize_reset();
        let second = Sha256::digest(first);
        let mut out = [0u8; DIGEST_SIZE];
        out.copy_from_slice(&second);
        out
    }
}

/// One-shot SHA-256d over the concatenation of `parts`.
pub fn sha256d(parts: &[&[u8]]) -> [u8; DIGEST_SIZE] {
    let mut h = Sha256d::new();
    for part in parts {
        h.update(part);
    }
    h.finalize_reset()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use aes::Aes256;

    /// Trivially weak cipher standing in for a non-AES primitive: XORs the
    /// block with both key halves.
    pub(crate) struct XorCipher {
        key: [u8; 32],
    }

    impl BlockCipher256 for XorCipher {
        fn with_key(key: &[u8; 32]) -> Self {
            XorCipher { key: *key }
        }

        fn encrypt(&self, block: &mut [u8; 16]) {
            for (i, b) in block.iter_mut().enumerate() {
                *b ^= self.key[i] ^ self.key[i + 16];
            }
        }
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn test_sha256d_empty() {
        // SHA-256(SHA-256(""))
        assert_eq!(
            hex(&sha256d(&[])),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut h = Sha256d::new();
        h.update(b"hello ");
        h.update(b"world");
        assert_eq!(h.finalize_reset(), sha256d(&[&b"hello world"[..]]));
    }

    #[test]
    fn test_finalize_resets() {
        let mut h = Sha256d::new();
        h.update(b"data");
        let _ = h.finalize_reset();
        assert_eq!(h.finalize_reset(), sha256d(&[]));
    }

    #[test]
    fn test_xor_cipher() {
        let mut key = [0u8; 32];
        key[0] = 0x0f;
        key[16] = 0xf0;
        let mut block = [0u8; 16];
        XorCipher::with_key(&key).encrypt(&mut block);
        assert_eq!(block[0], 0xff);
        assert!(block[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_aes256_known_answer() {
        // FIPS-197 appendix C.3
        let mut key = [0u8; 32];
        for (i, k) in key.iter_mut().enumerate() {
            *k = i as u8;
        }
        let mut block = [0u8; 16];
        for (i, b) in block.iter_mut().enumerate() {
            *b = (i as u8) * 0x11;
        }
        let c = <Aes256 as BlockCipher256>::with_key(&key);
        c.encrypt(&mut block);
        assert_eq!(hex(&block), "8ea2b7ca516745bfeafc49904b496089");
    }
}
