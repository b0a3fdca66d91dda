//! Elapsed recording time and the maximum-duration cutoff.
//!
//! Two ways to accumulate time are supported:
//! - [`DurationSource::WallClock`]: a ticker thread fires at a fixed cadence and
//!   each tick adds the monotonic time since the previous mark.
//! - [`DurationSource::CapturedFrames`]: the capture backend reports how many
//!   frames it captured and the elapsed time is derived from sample counts.
//!
//! Wall-clock time only accumulates while running. Captured frames may be
//! reported after the pause that closed their segment and still count.
//! Elapsed time never decreases within an attempt.

use crossbeam_channel::{bounded, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::debug;

/// How elapsed time is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationSource {
    /// Poll a monotonic clock at a fixed cadence.
    #[default]
    WallClock,
    /// Sum the durations of captured frames.
    CapturedFrames,
}

/// Result of accounting one tick or one batch of frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Total elapsed time after this update
    pub elapsed: Duration,
    /// True exactly once, on the update that first reaches the maximum
    pub cutoff: bool,
}

struct Ticker {
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

/// Accumulates elapsed recording time and detects the cutoff.
pub struct DurationTracker {
    source: DurationSource,
    interval: Duration,
    max: Duration,
    elapsed: Duration,
    mark: Option<Instant>,
    running: bool,
    generation: u64,
    cutoff_reached: bool,
    ticker: Option<Ticker>,
}

impl DurationTracker {
    pub fn new(source: DurationSource, interval: Duration) -> Self {
        Self {
            source,
            interval,
            max: Duration::ZERO,
            elapsed: Duration::ZERO,
            mark: None,
            running: false,
            generation: 0,
            cutoff_reached: false,
            ticker: None,
        }
    }

    /// Current generation; ticks carrying an older value are ignored.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Configured maximum (zero means unlimited).
    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop, zero the elapsed time and arm a new maximum.
    pub fn reset(&mut self, max: Duration) {
        self.stop();
        self.elapsed = Duration::ZERO;
        self.max = max;
        self.cutoff_reached = false;
    }

    /// Start accumulating.
    ///
    /// For the wall-clock source, `on_tick` is called from a dedicated thread
    /// with the current generation every interval until [`stop`](Self::stop).
    pub fn start<F>(&mut self, on_tick: F)
    where
        F: Fn(u64) + Send + 'static,
    {
        self.stop();
        self.generation += 1;
        self.running = true;
        self.mark = Some(Instant::now());

        if self.source != DurationSource::WallClock {
            return;
        }

        let (cancel, cancel_rx) = bounded::<()>(1);
        let interval = self.interval;
        let generation = self.generation;
        let handle = thread::Builder::new()
            .name("reel-tracker".into())
            .spawn(move || loop {
                crossbeam_channel::select! {
                    recv(cancel_rx) -> _ => break,
                    default(interval) => on_tick(generation),
                }
            })
            .expect("Failed to spawn tracker thread");

        self.ticker = Some(Ticker { cancel, handle });
    }

    /// Stop accumulating.
    ///
    /// The ticker thread is joined before returning, so no tick for this
    /// generation is produced afterwards. Wall-clock time since the last
    /// tick is folded into the total.
    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.cancel.send(());
            let _ = ticker.handle.join();
        }
        if self.running && self.source == DurationSource::WallClock {
            if let Some(mark) = self.mark.take() {
                self.elapsed += mark.elapsed();
            }
        }
        if self.running {
            debug!("Duration tracker stopped at {:?}", self.elapsed);
        }
        self.running = false;
        self.mark = None;
    }

    /// Account one wall-clock tick.
    ///
    /// Returns `None` for stale generations or when not running.
    pub fn on_tick(&mut self, generation: u64) -> Option<TickReport> {
        if !self.running || generation != self.generation {
            return None;
        }
        if self.source != DurationSource::WallClock {
            return None;
        }
        let now = Instant::now();
        let mark = self.mark.replace(now)?;
        self.elapsed += now.saturating_duration_since(mark);
        Some(self.report())
    }

    /// Account captured audio for the frame-derived source.
    ///
    /// Accepted while stopped too; the caller decides which segments the
    /// frames belong to.
    pub fn advance(&mut self, delta: Duration) -> Option<TickReport> {
        if self.source != DurationSource::CapturedFrames {
            return None;
        }
        self.elapsed += delta;
        Some(self.report())
    }

    fn report(&mut self) -> TickReport {
        let cutoff = !self.cutoff_reached && !self.max.is_zero() && self.elapsed >= self.max;
        if cutoff {
            self.cutoff_reached = true;
        }
        TickReport {
            elapsed: self.elapsed,
            cutoff,
        }
    }
}

impl Drop for DurationTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
