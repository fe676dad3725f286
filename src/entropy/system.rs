use std::fs::File;
use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

/// Reads `count` bytes from /dev/urandom. Returns an empty Vec if the device
/// is unavailable; the caller mixes this with other inputs.
pub fn urandom(count: usize) -> Vec<u8> {
    let mut buf = vec![0u8; count];
    match File::open("/dev/urandom").and_then(|mut f| f.read_exact(&mut buf)) {
        Ok(()) => buf,
        Err(e) => {
            log::warn!("/dev/urandom unavailable: {}", e);
            Vec::new()
        }
    }
}

/// Wall-clock time in nanoseconds since the Unix epoch, big-endian.
pub fn wall_clock() -> [u8; 16] {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
        .to_be_bytes()
}

/// Host name, user id and process id of the running process.
pub fn identity() -> Vec<u8> {
    let mut out = Vec::new();

    let mut host = [0u8; 256];
    // SAFETY: the buffer is writable for its full length.
    let ret = unsafe { libc::gethostname(host.as_mut_ptr() as *mut libc::c_char, host.len()) };
    if ret == 0 {
        let end = host.iter().position(|&b| b == 0).unwrap_or(host.len());
        out.extend_from_slice(&host[..end]);
    }

    // SAFETY: getuid and getpid have no preconditions.
    let uid = unsafe { libc::getuid() };
    out.extend_from_slice(&uid.to_be_bytes());
    out.extend_from_slice(&std::process::id().to_be_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urandom_length() {
        let a = urandom(32);
        assert!(a.is_empty() || a.len() == 32);
    }

    #[test]
    fn test_wall_clock_nonzero() {
        assert!(wall_clock().iter().any(|&b| b != 0));
    }

    #[test]
    fn test_identity_contains_pid() {
        let id = identity();
        let pid = std::process::id().to_be_bytes();
        assert!(id.ends_with(&pid));
    }
}
