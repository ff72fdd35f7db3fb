//! Paced character emission for the live lyric feed
//!
//! Confirmed spans are forwarded one character at a time with a constant
//! delay, which reads as progressive typing on the client. The delay goes
//! through a [`Scheduler`] so tests can run without waiting on the clock.

use futures::future::BoxFuture;
use lyricgen_common::LiveEvent;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Source of the pause between two emitted characters
pub trait Scheduler: Send + Sync {
    fn pause(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Real-time scheduler backed by `tokio::time::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn pause(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Scheduler that never waits
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn pause(&self, _duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(std::future::ready(()))
    }
}

/// Fixed-cadence emission policy
#[derive(Clone)]
pub struct PacingPolicy {
    interval: Duration,
    scheduler: Arc<dyn Scheduler>,
}

impl fmt::Debug for PacingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacingPolicy")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl PacingPolicy {
    pub fn new(interval: Duration, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            interval,
            scheduler,
        }
    }

    /// Real-time pacing with the given inter-character delay
    pub fn fixed(interval: Duration) -> Self {
        Self::new(interval, Arc::new(TokioScheduler))
    }

    /// No delay at all
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Arc::new(ImmediateScheduler))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// The live feed consumer went away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

/// Forwards spans to a session's live feed channel
pub struct PacingEmitter<'a> {
    policy: &'a PacingPolicy,
    tx: &'a mpsc::Sender<LiveEvent>,
}

impl<'a> PacingEmitter<'a> {
    pub fn new(policy: &'a PacingPolicy, tx: &'a mpsc::Sender<LiveEvent>) -> Self {
        Self { policy, tx }
    }

    /// Emit every character of `span` in order, pausing after each one
    ///
    /// Returns the number of characters sent, or `Disconnected` as soon as
    /// the receiving side is gone.
    pub async fn emit(&self, span: &str) -> Result<usize, Disconnected> {
        let mut sent = 0;
        for ch in span.chars() {
            self.tx
                .send(LiveEvent::content(ch))
                .await
                .map_err(|_| Disconnected)?;
            sent += 1;
            if !self.policy.interval.is_zero() {
                self.policy.scheduler.pause(self.policy.interval).await;
            }
        }
        Ok(sent)
    }
}
