//! Periodic frame sampler
//!
//! Each sampler runs its own timer against a shared [`FrameSource`]. A tick
//! captures one still and hands it to the consumer on a spawned task, so a
//! slow classification never delays the timer itself. The sampler's
//! [`TickGate`] allows one outstanding consumer call: ticks that find it
//! `InFlight` are dropped, never queued.

use crate::{Frame, FrameSource};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Receives sampled frames
#[async_trait]
pub trait FrameConsumer: Send + Sync + 'static {
    async fn consume(&self, frame: Frame);
}

/// Whether a consumer call is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Idle,
    InFlight,
}

/// Single-slot gate bounding outstanding requests per sampler to one
#[derive(Debug, Clone, Default)]
pub struct TickGate {
    in_flight: Arc<AtomicBool>,
}

impl TickGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        if self.in_flight.load(Ordering::Acquire) {
            GateState::InFlight
        } else {
            GateState::Idle
        }
    }

    /// Move `Idle -> InFlight`. The returned guard moves back to `Idle` when dropped.
    pub fn try_acquire(&self) -> Option<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                flag: Arc::clone(&self.in_flight),
            })
    }
}

/// Held for the lifetime of one consumer call
#[derive(Debug)]
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    frames: AtomicU64,
    skipped_busy: AtomicU64,
    skipped_inactive: AtomicU64,
}

/// Sampler counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerStats {
    pub ticks: u64,
    pub frames: u64,
    pub skipped_busy: u64,
    pub skipped_inactive: u64,
}

/// Periodic still sampler
pub struct FrameSampler {
    name: String,
    source: Arc<dyn FrameSource>,
    gate: TickGate,
    counters: Arc<Counters>,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl FrameSampler {
    pub fn new(name: impl Into<String>, source: Arc<dyn FrameSource>) -> Self {
        Self {
            name: name.into(),
            source,
            gate: TickGate::new(),
            counters: Arc::new(Counters::default()),
            cancel: None,
            handle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start ticking every `period`. The first tick fires one period after start.
    pub fn start(&mut self, period: Duration, consumer: Arc<dyn FrameConsumer>) {
        if self.is_running() {
            debug!(sampler = %self.name, "Restarting running sampler");
            self.stop();
        }

        info!(sampler = %self.name, period_ms = period.as_millis() as u64, "Starting frame sampler");

        let token = CancellationToken::new();
        let ctx = TickContext {
            name: self.name.clone(),
            source: Arc::clone(&self.source),
            gate: self.gate.clone(),
            counters: Arc::clone(&self.counters),
            consumer,
            token: token.clone(),
        };

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ctx.token.cancelled() => break,
                    _ = ticker.tick() => ctx.on_tick(),
                }
            }
            debug!(sampler = %ctx.name, "Sampler loop exited");
        }));
        self.cancel = Some(token);
    }

    /// Cancel the timer and drop any outstanding consumer call. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            info!(sampler = %self.name, "Stopping frame sampler");
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    pub fn stats(&self) -> SamplerStats {
        SamplerStats {
            ticks: self.counters.ticks.load(Ordering::Relaxed),
            frames: self.counters.frames.load(Ordering::Relaxed),
            skipped_busy: self.counters.skipped_busy.load(Ordering::Relaxed),
            skipped_inactive: self.counters.skipped_inactive.load(Ordering::Relaxed),
        }
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

struct TickContext {
    name: String,
    source: Arc<dyn FrameSource>,
    gate: TickGate,
    counters: Arc<Counters>,
    consumer: Arc<dyn FrameConsumer>,
    token: CancellationToken,
}

impl TickContext {
    fn on_tick(&self) {
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);

        if !self.source.is_active() {
            trace!(sampler = %self.name, "Source inactive, tick skipped");
            self.counters.skipped_inactive.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let Some(guard) = self.gate.try_acquire() else {
            debug!(sampler = %self.name, "Previous request outstanding, tick dropped");
            self.counters.skipped_busy.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let Some(frame) = self.source.capture() else {
            self.counters.skipped_inactive.fetch_add(1, Ordering::Relaxed);
            return;
        };

        self.counters.frames.fetch_add(1, Ordering::Relaxed);
        trace!(sampler = %self.name, sequence = frame.sequence, bytes = frame.len(), "Frame sampled");

        let consumer = Arc::clone(&self.consumer);
        let token = self.token.clone();
        let name = self.name.clone();
        tokio::spawn(async move {
            let _guard = guard;
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(sampler = %name, "Outstanding request discarded on stop");
                }
                _ = consumer.consume(frame) => {}
            }
        });
    }
}
