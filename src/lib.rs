//! An implementation of the Fortuna cryptographically secure random number
//! generator (Ferguson and Schneier).
//!
//! ```no_run
//! use fortuna::Accumulator;
//!
//! let acc = Accumulator::open(Some("/var/lib/myapp/seed".as_ref()))?;
//! let key = acc.random_data(32);
//!
//! let sink = acc.new_entropy_data_sink()?;
//! sink.send(b"unpredictable event".to_vec())?;
//!
//! acc.close()?;
//! # let _ = key;
//! # Ok::<(), fortuna::Error>(())
//! ```

pub mod accumulator;
pub mod config;
pub mod entropy;
pub mod error;
pub mod generator;
pub mod interop;
pub mod mixer;
pub mod pool;
pub mod primitive;
pub mod seedfile;
pub mod sink;
pub mod util;

pub use accumulator::Accumulator;
pub use error::{Error, Result};
pub use generator::Generator;
pub use interop::RandSource;
pub use primitive::BlockCipher256;
pub use sink::{DataSink, TimeStampSink};
