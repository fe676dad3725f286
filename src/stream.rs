use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use fortuna::config::Config;
use fortuna::entropy::{jitter, procfs};
use fortuna::{Accumulator, Error};

use crate::cli::StreamArgs;
use crate::output;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

fn install_signal_handlers() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = signal_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        libc::sigaction(libc::SIGTERM, &sa, std::ptr::null_mut());
        libc::sigaction(libc::SIGINT, &sa, std::ptr::null_mut());
    }
}

/// Interruptible sleep: sleeps in 250ms steps, checking SHUTDOWN between each.
fn interruptible_sleep(total: Duration) {
    let step = Duration::from_millis(250);
    let mut remaining = total;
    while remaining > Duration::ZERO && !SHUTDOWN.load(Ordering::Relaxed) {
        let s = remaining.min(step);
        thread::sleep(s);
        remaining = remaining.saturating_sub(s);
    }
}

pub fn run(args: &StreamArgs, config: &Config) -> Result<(), Error> {
    if args.block_size == 0 {
        return Err(Error::InvalidArgs("block-size must be greater than 0".into()));
    }
    if args.interval == 0 {
        return Err(Error::InvalidArgs("interval must be greater than 0".into()));
    }

    let acc: Accumulator = Accumulator::with_config(&config.accumulator)?;
    let data_sink = acc.new_entropy_data_sink()?;
    let stamps = acc.new_entropy_time_stamp_sink()?;
    let feed_procfs = config.sources.procfs && !args.no_procfs;
    let feed_jitter = config.sources.jitter && !args.no_jitter;

    install_signal_handlers();

    log::info!(
        target: "fortuna::stream",
        "started: interval={}s block={}B procfs={} jitter={}",
        args.interval, args.block_size, feed_procfs, feed_jitter,
    );

    let mut result = Ok(());
    while !SHUTDOWN.load(Ordering::Relaxed) {
        if feed_procfs {
            data_sink.send(procfs::snapshot())?;
        }
        if feed_jitter {
            for event in jitter::jitter_events(config.sources.jitter_samples) {
                data_sink.send(event)?;
            }
        }
        stamps.send_now()?;

        let block = acc.random_data(args.block_size);
        if let Err(e) = output::write_output(&block, &args.format, None) {
            // stdout went away (e.g. closed pipe); stop cleanly
            log::error!(target: "fortuna::stream", "error writing output: {}", e);
            result = Err(e.into());
            break;
        }

        interruptible_sleep(Duration::from_secs(args.interval));
    }

    log::info!(target: "fortuna::stream", "shutting down");
    acc.close()?;
    result
}
