use core::sync::atomic::{fence, Ordering};

/// Encodes `x` as 8 big-endian bytes.
pub fn u64_to_bytes(x: u64) -> [u8; 8] {
    x.to_be_bytes()
}

/// Decodes 8 big-endian bytes. Panics if `buf` is not exactly 8 bytes long.
pub fn bytes_to_u64(buf: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(buf);
    u64::from_be_bytes(raw)
}

/// Encodes `x` as 8 big-endian bytes (two's complement).
pub fn i64_to_bytes(x: i64) -> [u8; 8] {
    x.to_be_bytes()
}

/// Decodes 8 big-endian bytes. Panics if `buf` is not exactly 8 bytes long.
pub fn bytes_to_i64(buf: &[u8]) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(buf);
    i64::from_be_bytes(raw)
}

/// Returns true if every byte of `buf` is zero.
pub fn is_zero(buf: &[u8]) -> bool {
    buf.iter().fold(0u8, |acc, &b| acc | b) == 0
}

/// Volatile-zeroes a byte slice, preventing the compiler from eliding the write.
pub fn wipe(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        // SAFETY: pointer is valid and aligned (derived from a live mutable ref).
        unsafe { core::ptr::write_volatile(byte, 0) };
    }
    fence(Ordering::SeqCst);
}
