use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The stored seed record has the wrong size.
    CorruptedSeed { path: PathBuf, len: u64 },
    /// The seed file is readable or writable by group or others.
    InsecureSeedPermissions { path: PathBuf, mode: u32 },
    /// Opening, locking, reading or writing the seed file failed.
    SeedFileIo { path: PathBuf, source: io::Error },
    /// The accumulator was used after `close`.
    UseAfterClose,
    /// A fixed seed was requested for the cryptographic generator.
    MisuseSeedOnCsprng,
    /// The generator was asked for output before its first reseed.
    NotSeeded,
    /// A single generator request exceeded the per-request limit.
    RequestTooLarge(usize),
    Io(io::Error),
    InvalidArgs(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CorruptedSeed { path, len } => {
                write!(f, "corrupted seed file {} ({} bytes)", path.display(), len)
            }
            Error::InsecureSeedPermissions { path, mode } => write!(
                f,
                "seed file {} has insecure permissions {:o}",
                path.display(),
                mode
            ),
            Error::SeedFileIo { path, source } => {
                write!(f, "seed file {}: {}", path.display(), source)
            }
            Error::UseAfterClose => write!(f, "accumulator used after close"),
            Error::MisuseSeedOnCsprng => {
                write!(f, "seeding a cryptographic RNG is not safe; don't do this")
            }
            Error::NotSeeded => write!(f, "generator not seeded"),
            Error::RequestTooLarge(n) => write!(f, "request of {} bytes too large", n),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::InvalidArgs(msg) => write!(f, "invalid arguments: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SeedFileIo { source, .. } => Some(source),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
