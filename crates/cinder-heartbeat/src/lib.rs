//! Recurring heartbeat for Cinder sessions.
//!
//! Once logged on, the server expects a heartbeat message at the interval
//! it chose in the logon response. Missing heartbeats gets the connection
//! dropped, so the beat runs on its own task, independent of inbound
//! dispatch.
//!
//! # Disabled mode
//!
//! An interval of 0 disables the heartbeat: [`HeartbeatScheduler::wait_for_beat`]
//! pends forever, which keeps `tokio::select!` loops working unchanged.
//!
//! # Usage
//!
//! ```ignore
//! let handle = spawn_heartbeat(HeartbeatConfig::with_interval(secs(9)), move |beat| {
//!     outbox.send(heartbeat_msg());
//!     true // keep going
//! });
//! // ... later, when the session ends:
//! handle.stop();
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Heartbeat timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Time between beats in milliseconds. 0 disables the heartbeat.
    pub interval_ms: u64,
    /// Lower bound applied by [`validated`](Self::validated).
    pub min_interval_ms: u64,
    /// Upper bound applied by [`validated`](Self::validated).
    pub max_interval_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: 9_000,
            min_interval_ms: 1_000,
            max_interval_ms: 3_600_000,
        }
    }
}

impl HeartbeatConfig {
    /// Config with the given interval and default bounds.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called by [`HeartbeatScheduler::new`]. A non-zero interval is kept
    /// within `min_interval_ms..=max_interval_ms`; bounds in the wrong order
    /// are collapsed onto `max_interval_ms`.
    pub fn validated(mut self) -> Self {
        if self.min_interval_ms > self.max_interval_ms {
            self.min_interval_ms = self.max_interval_ms;
        }
        if self.interval_ms != 0 {
            let clamped = self.interval_ms.clamp(self.min_interval_ms, self.max_interval_ms);
            if clamped != self.interval_ms {
                warn!(
                    interval_ms = self.interval_ms,
                    clamped_ms = clamped,
                    "heartbeat interval out of range, clamping"
                );
                self.interval_ms = clamped;
            }
        }
        self
    }

    /// Time between beats, or `None` when disabled.
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_ms != 0).then(|| Duration::from_millis(self.interval_ms))
    }
}

// ---------------------------------------------------------------------------
// Beat info
// ---------------------------------------------------------------------------

/// Returned by [`HeartbeatScheduler::wait_for_beat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeatInfo {
    /// Beat number, starting at 1.
    pub beat: u64,
    /// How late the beat fired compared to its deadline.
    pub late_by: Duration,
    /// Whole intervals that passed without a beat.
    pub beats_missed: u64,
}

// ---------------------------------------------------------------------------
// HeartbeatScheduler
// ---------------------------------------------------------------------------

/// Computes when the next beat is due.
///
/// A late beat never causes a burst: the next deadline is always one
/// interval after the beat actually fired.
#[derive(Debug)]
pub struct HeartbeatScheduler {
    interval: Option<Duration>,
    beat_count: u64,
    next_beat: Option<Instant>,
}

impl HeartbeatScheduler {
    pub fn new(config: HeartbeatConfig) -> Self {
        let interval = config.validated().interval();
        match interval {
            Some(every) => debug!(interval_ms = every.as_millis() as u64, "heartbeat scheduler created"),
            None => debug!("heartbeat scheduler created disabled"),
        }
        Self {
            interval,
            beat_count: 0,
            next_beat: interval.map(|every| Instant::now() + every),
        }
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self::new(HeartbeatConfig::with_interval(interval))
    }

    /// Waits until the next beat is due.
    ///
    /// Pends forever when the scheduler is disabled.
    pub async fn wait_for_beat(&mut self) -> BeatInfo {
        let (Some(next), Some(every)) = (self.next_beat, self.interval) else {
            return std::future::pending().await;
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(next);
        let beats_missed = (late_by.as_nanos() / every.as_nanos()) as u64;
        if beats_missed > 0 {
            warn!(
                beat = self.beat_count + 1,
                missed = beats_missed,
                late_ms = late_by.as_millis() as u64,
                "heartbeat fired late"
            );
        }

        self.beat_count += 1;
        self.next_beat = Some(now + every);
        trace!(beat = self.beat_count, "heartbeat");

        BeatInfo {
            beat: self.beat_count,
            late_by,
            beats_missed,
        }
    }

    pub fn beat_count(&self) -> u64 {
        self.beat_count
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

}

// ---------------------------------------------------------------------------
// Background task
// ---------------------------------------------------------------------------

/// Handle to a running heartbeat task.
///
/// The task stops when [`stop`](Self::stop) is called, when the handle is
/// dropped, or when the callback returns `false`.
#[derive(Debug)]
pub struct HeartbeatHandle {
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    pub fn stop(&self) {
        if !self.task.is_finished() {
            debug!("heartbeat stopped");
        }
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns a task that calls `on_beat` at every beat until stopped.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_heartbeat<F>(config: HeartbeatConfig, mut on_beat: F) -> HeartbeatHandle
where
    F: FnMut(BeatInfo) -> bool + Send + 'static,
{
    let mut scheduler = HeartbeatScheduler::new(config);
    let task = tokio::spawn(async move {
        loop {
            let info = scheduler.wait_for_beat().await;
            if !on_beat(info) {
                debug!(beats = scheduler.beat_count(), "heartbeat callback asked to stop");
                break;
            }
        }
    });
    HeartbeatHandle { task }
}
