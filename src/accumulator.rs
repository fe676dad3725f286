//! The Fortuna accumulator: one generator, 32 entropy pools, optional seed
//! file persistence, and the lifecycle tying them together.
//!
//! It is safe to share an `Accumulator` between threads. Extraction takes the
//! pool lock only long enough to decide on a reseed, then the generator lock.
//! Entropy submission only ever takes the pool lock.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use aes::Aes256;

use crate::config::AccumulatorConfig;
use crate::entropy;
use crate::error::{Error, Result};
use crate::generator::{Generator, MAX_REQUEST};
use crate::pool::PoolBank;
use crate::primitive::{sha256d, BlockCipher256};
use crate::seedfile::{SeedFile, SEED_FILE_SIZE};
use crate::sink::{self, DataSink, TimeStampSink};
use crate::util::wipe;

/// Events longer than this are condensed with SHA-256d before pooling.
const MAX_EVENT_SIZE: usize = 32;

const ACTIVE: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared with the background workers.
pub(crate) struct Shared<C: BlockCipher256> {
    gen: Mutex<Generator<C>>,
    pools: Mutex<PoolBank>,
    seed_file: Mutex<Option<SeedFile>>,
    state: AtomicU8,
    stop_sources: AtomicBool,
    next_source: AtomicU8,
}

impl<C: BlockCipher256> Shared<C> {
    fn is_active(&self) -> bool {
        self.state.load(Ordering::Acquire) == ACTIVE
    }

    pub(crate) fn sources_stopped(&self) -> bool {
        self.stop_sources.load(Ordering::Acquire)
    }

    pub(crate) fn allocate_source(&self) -> u8 {
        self.next_source.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn add_random_event(&self, source: u8, pool: usize, data: &[u8]) {
        if data.len() > MAX_EVENT_SIZE {
            let digest = sha256d(&[data]);
            lock(&self.pools).submit(pool, source, &digest);
        } else {
            lock(&self.pools).submit(pool, source, data);
        }
    }

    /// Reseeds if due, then extracts `n` bytes. Does not look at the
    /// lifecycle state; callers do.
    fn extract(&self, n: usize) -> Result<Vec<u8>> {
        let seed = lock(&self.pools).try_reseed(Instant::now());

        let mut gen = lock(&self.gen);
        if let Some(mut seed) = seed {
            gen.reseed(&seed);
            wipe(&mut seed);
        }

        let mut out = Vec::with_capacity(n);
        let mut remaining = n;
        loop {
            let chunk = remaining.min(MAX_REQUEST);
            match gen.pseudo_random_data(chunk) {
                Ok(data) => out.extend_from_slice(&data),
                // construction always seeds, so only a reset generator gets here
                Err(Error::NotSeeded) => return Err(Error::UseAfterClose),
                Err(e) => return Err(e),
            }
            remaining -= chunk;
            if remaining == 0 {
                break;
            }
        }
        Ok(out)
    }

    fn random_data(&self, n: usize) -> Result<Vec<u8>> {
        if !self.is_active() {
            return Err(Error::UseAfterClose);
        }
        self.extract(n)
    }

    /// Overwrites the seed file, if any, with fresh generator output. The
    /// bytes are extracted before the file lock is taken.
    fn write_seed_file(&self) -> Result<()> {
        let mut data = self.extract(SEED_FILE_SIZE)?;
        let res = match lock(&self.seed_file).as_mut() {
            Some(f) => f.write(&data),
            None => Ok(()),
        };
        wipe(&mut data);
        res
    }
}

#[derive(Default)]
struct Workers {
    sources: Vec<JoinHandle<()>>,
    resave: Option<(Sender<()>, JoinHandle<()>)>,
}

impl Workers {
    /// Tracks a new source worker, forgetting workers whose sink was dropped
    /// and that have already exited.
    fn add_source(&mut self, handle: JoinHandle<()>) {
        self.sources.retain(|h| !h.is_finished());
        self.sources.push(handle);
    }
}

/// A Fortuna random number generator instance.
///
/// Randomness is extracted with [`random_data`](Accumulator::random_data),
/// [`fill`](Accumulator::fill) or `std::io::Read`. Entropy from the
/// environment is submitted through sinks from
/// [`new_entropy_data_sink`](Accumulator::new_entropy_data_sink) and
/// [`new_entropy_time_stamp_sink`](Accumulator::new_entropy_time_stamp_sink).
///
/// Call [`close`](Accumulator::close) before exit so the seed file gets its
/// final update. Using the accumulator after `close` panics.
pub struct Accumulator<C: BlockCipher256 = Aes256> {
    shared: Arc<Shared<C>>,
    workers: Mutex<Workers>,
}

impl Accumulator<Aes256> {
    /// Creates an AES-256 based generator.
    ///
    /// `seed_file` names a file where a small amount of randomness is kept
    /// between runs. It must be kept secret and must not be shared between
    /// running instances; it is created if missing. A wrong-sized record gives
    /// `Error::CorruptedSeed`, group or world access gives
    /// `Error::InsecureSeedPermissions`.
    pub fn open(seed_file: Option<&Path>) -> Result<Self> {
        Self::with_cipher(seed_file)
    }
}

impl<C: BlockCipher256 + 'static> Accumulator<C> {
    /// Like [`Accumulator::open`], with the block cipher chosen by `C`.
    pub fn with_cipher(seed_file: Option<&Path>) -> Result<Self> {
        Self::with_config(&AccumulatorConfig {
            seed_file: seed_file.map(Path::to_path_buf),
            ..Default::default()
        })
    }

    pub fn with_config(config: &AccumulatorConfig) -> Result<Self> {
        let shared = Arc::new(Shared {
            gen: Mutex::new(Generator::new()),
            pools: Mutex::new(PoolBank::new()),
            seed_file: Mutex::new(None),
            state: AtomicU8::new(ACTIVE),
            stop_sources: AtomicBool::new(false),
            next_source: AtomicU8::new(0),
        });

        let mut stored = Vec::new();
        if let Some(path) = &config.seed_file {
            let (seed_file, record) = SeedFile::open(path)?;
            log::info!("using seed file {}", path.display());
            stored = record;
            *lock(&shared.seed_file) = Some(seed_file);
        }

        // The first seed depends on the current time and host, so a seed file
        // restored from a backup does not replay old output.
        let mut seed = entropy::initial_seed(&stored);
        lock(&shared.gen).reseed(&seed);
        wipe(&mut seed);
        wipe(&mut stored);

        let mut workers = Workers::default();
        if config.seed_file.is_some() {
            shared.write_seed_file()?;
            workers.resave = Some(spawn_resave(Arc::clone(&shared), config.resave_interval())?);
        }

        Ok(Accumulator {
            shared,
            workers: Mutex::new(workers),
        })
    }

    /// Registers a new raw-data entropy source.
    pub fn new_entropy_data_sink(&self) -> Result<DataSink> {
        let mut workers = lock(&self.workers);
        if !self.shared.is_active() {
            return Err(Error::UseAfterClose);
        }
        let (sink, handle) = sink::spawn_data_sink(Arc::clone(&self.shared))?;
        workers.add_source(handle);
        Ok(sink)
    }

    /// Registers a new time-stamp entropy source.
    pub fn new_entropy_time_stamp_sink(&self) -> Result<TimeStampSink> {
        let mut workers = lock(&self.workers);
        if !self.shared.is_active() {
            return Err(Error::UseAfterClose);
        }
        let (sink, handle) = sink::spawn_time_stamp_sink(Arc::clone(&self.shared))?;
        workers.add_source(handle);
        Ok(sink)
    }
}

impl<C: BlockCipher256> Accumulator<C> {
    /// Returns `n` random bytes.
    ///
    /// # Panics
    ///
    /// Panics if called after [`close`](Accumulator::close).
    pub fn random_data(&self, n: usize) -> Vec<u8> {
        match self.shared.random_data(n) {
            Ok(data) => data,
            Err(e) => panic!("{}", e),
        }
    }

    /// Fills `buf` with random bytes.
    ///
    /// # Panics
    ///
    /// Panics if called after [`close`](Accumulator::close).
    pub fn fill(&self, buf: &mut [u8]) {
        let mut data = self.random_data(buf.len());
        buf.copy_from_slice(&data);
        wipe(&mut data);
    }

    pub fn is_closed(&self) -> bool {
        !self.shared.is_active()
    }

    /// Shuts the accumulator down: stops all entropy sources, folds every pool
    /// into one last reseed, writes a fresh record to the seed file, releases
    /// its lock, and wipes the generator.
    pub fn close(&self) -> Result<()> {
        if self
            .shared
            .state
            .compare_exchange(ACTIVE, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::UseAfterClose);
        }

        let workers = std::mem::take(&mut *lock(&self.workers));

        self.shared.stop_sources.store(true, Ordering::Release);
        for handle in workers.sources {
            if handle.join().is_err() {
                log::warn!("entropy source worker panicked");
            }
        }

        let mut seed = lock(&self.shared.pools).drain_all();
        lock(&self.shared.gen).reseed(&seed);
        wipe(&mut seed);

        if let Some((stop, handle)) = workers.resave {
            let _ = stop.send(());
            if handle.join().is_err() {
                log::warn!("seed file worker panicked");
            }
        }

        let mut res = self.shared.write_seed_file();
        if let Some(seed_file) = lock(&self.shared.seed_file).take() {
            if let Err(e) = seed_file.unlock() {
                res = res.and(Err(e));
            }
            log::info!("closed seed file {}", seed_file.path().display());
        }

        // Leaves the generator unseeded: nothing can be extracted any more and
        // the key no longer sits in memory.
        lock(&self.shared.gen).reset();
        self.shared.state.store(CLOSED, Ordering::Release);

        res
    }

    #[cfg(test)]
    pub(crate) fn generator_key(&self) -> [u8; crate::generator::KEY_SIZE] {
        lock(&self.shared.gen).key()
    }

    #[cfg(test)]
    pub(crate) fn pool_sizes(&self) -> Vec<usize> {
        let pools = lock(&self.shared.pools);
        (0..crate::pool::NUM_POOLS).map(|i| pools.pool_size(i)).collect()
    }

    #[cfg(test)]
    pub(crate) fn reseed_count(&self) -> u64 {
        lock(&self.shared.pools).reseed_count()
    }

    #[cfg(test)]
    pub(crate) fn source_worker_count(&self) -> usize {
        lock(&self.workers).sources.len()
    }
}

impl<C: BlockCipher256> io::Read for &Accumulator<C> {
    /// Always fills the whole buffer. Fails after `close`.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut data = self
            .shared
            .random_data(buf.len())
            .map_err(io::Error::other)?;
        buf.copy_from_slice(&data);
        wipe(&mut data);
        Ok(buf.len())
    }
}

impl<C: BlockCipher256> io::Read for Accumulator<C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }
}

impl<C: BlockCipher256> Drop for Accumulator<C> {
    fn drop(&mut self) {
        if self.shared.is_active() {
            if let Err(e) = self.close() {
                log::warn!("closing accumulator on drop: {}", e);
            }
        }
    }
}

fn spawn_resave<C>(shared: Arc<Shared<C>>, interval: Duration) -> Result<(Sender<()>, JoinHandle<()>)>
where
    C: BlockCipher256 + 'static,
{
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let handle = thread::Builder::new()
        .name("fortuna-resave".into())
        .spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => match shared.write_seed_file() {
                    Ok(()) => log::debug!("seed file updated"),
                    Err(e) => log::warn!("seed file update failed: {}", e),
                },
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            }
        })?;
    Ok((stop_tx, handle))
}
