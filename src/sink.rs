//! Entropy sinks: per-producer channels whose events a background worker
//! spreads round-robin over the pools.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::accumulator::Shared;
use crate::error::{Error, Result};
use crate::pool::NUM_POOLS;
use crate::primitive::BlockCipher256;
use crate::util::{i64_to_bytes, wipe};

/// How often an idle worker checks for shutdown.
const STOP_POLL: Duration = Duration::from_millis(50);

/// Write end of a raw-data entropy source.
pub struct DataSink {
    tx: Sender<Vec<u8>>,
}

impl DataSink {
    /// Queues one entropy event. Fails once the accumulator has shut down.
    pub fn send(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        self.tx.send(data.into()).map_err(|_| Error::UseAfterClose)
    }
}

/// Write end of a time-stamp entropy source. Only the spacing between stamps
/// reaches the pools.
pub struct TimeStampSink {
    tx: Sender<Instant>,
}

impl TimeStampSink {
    pub fn send(&self, t: Instant) -> Result<()> {
        self.tx.send(t).map_err(|_| Error::UseAfterClose)
    }

    pub fn send_now(&self) -> Result<()> {
        self.send(Instant::now())
    }
}

pub(crate) fn spawn_data_sink<C>(shared: Arc<Shared<C>>) -> Result<(DataSink, JoinHandle<()>)>
where
    C: BlockCipher256 + 'static,
{
    let (tx, handle) = spawn_worker(shared, |data: Vec<u8>| data)?;
    Ok((DataSink { tx }, handle))
}

pub(crate) fn spawn_time_stamp_sink<C>(
    shared: Arc<Shared<C>>,
) -> Result<(TimeStampSink, JoinHandle<()>)>
where
    C: BlockCipher256 + 'static,
{
    let mut last = Instant::now();
    let (tx, handle) = spawn_worker(shared, move |t: Instant| {
        let dt = signed_nanos(t, last);
        last = t;
        i64_to_bytes(dt).to_vec()
    })?;
    Ok((TimeStampSink { tx }, handle))
}

/// Nanoseconds from `earlier` to `t`, negative if `t` comes first.
fn signed_nanos(t: Instant, earlier: Instant) -> i64 {
    match t.checked_duration_since(earlier) {
        Some(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        None => -i64::try_from((earlier - t).as_nanos()).unwrap_or(i64::MAX),
    }
}

fn spawn_worker<C, T, F>(shared: Arc<Shared<C>>, mut to_event: F) -> Result<(Sender<T>, JoinHandle<()>)>
where
    C: BlockCipher256 + 'static,
    T: Send + 'static,
    F: FnMut(T) -> Vec<u8> + Send + 'static,
{
    let source = shared.allocate_source();
    let (tx, rx) = mpsc::channel::<T>();

    let handle = thread::Builder::new()
        .name(format!("fortuna-source-{}", source))
        .spawn(move || {
            let mut pool = 0usize;
            while !shared.sources_stopped() {
                match rx.recv_timeout(STOP_POLL) {
                    Ok(item) => {
                        let mut data = to_event(item);
                        shared.add_random_event(source, pool, &data);
                        wipe(&mut data);
                        pool = (pool + 1) % NUM_POOLS;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            log::debug!("entropy source {} stopped", source);
        })?;

    Ok((tx, handle))
}
