//! Background loop deciding when the pending track fields are announced.
//!
//! There is no explicit "track state": a track is pending when any field has
//! a non-zero arrival time, and ready once enough time passed since the last
//! arrival. Complete tracks settle after `complete_after`, partial ones are
//! announced anyway after `partial_after`.

use std::{
    sync::{
        Arc,
        mpsc::{self, RecvTimeoutError},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    aggregator::{MetadataAggregator, PendingView},
    domain::track::{NotificationPayload, TrackField},
    notify::DispatchSink,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceConfig {
    pub poll_interval: Duration,
    pub complete_after: Duration,
    pub partial_after: Duration,
    pub cooldown: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            complete_after: Duration::from_secs(5),
            partial_after: Duration::from_secs(10),
            cooldown: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// All fields arrived and settled
    Complete,
    /// Some fields never arrived
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Nothing pending
    Idle,
    /// Fields pending but not settled yet
    Waiting,
    Dispatched {
        reason: FlushReason,
        payload: NotificationPayload,
        delivered: bool,
    },
}

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

impl DebounceConfig {
    /// Decides whether the pending fields should be flushed at `now`
    pub fn evaluate(&self, view: &PendingView<'_>, now: i64) -> Option<FlushReason> {
        let last = view.last_arrival();
        if last <= 0 {
            return None;
        }
        let elapsed = now - last;
        if view.is_complete(&TrackField::ALL) {
            (elapsed >= millis(self.complete_after)).then_some(FlushReason::Complete)
        } else {
            (elapsed >= millis(self.partial_after)).then_some(FlushReason::Partial)
        }
    }
}

pub struct DebounceScheduler {
    aggregator: Arc<MetadataAggregator>,
    sink: Arc<dyn DispatchSink>,
    config: DebounceConfig,
}

impl DebounceScheduler {
    pub fn new(
        aggregator: Arc<MetadataAggregator>,
        sink: Arc<dyn DispatchSink>,
        config: DebounceConfig,
    ) -> Self {
        Self {
            aggregator,
            sink,
            config,
        }
    }

    /// One poll: flush and dispatch if a policy fires
    pub fn tick(&self) -> Tick {
        let now = self.aggregator.now();
        let flushed = self
            .aggregator
            .flush_if(|view| self.config.evaluate(view, now));

        match flushed {
            Some((reason, payload)) => {
                let delivered = dispatch(self.sink.as_ref(), reason, &payload);
                Tick::Dispatched {
                    reason,
                    payload,
                    delivered,
                }
            }
            None if self.aggregator.last_arrival() == 0 => Tick::Idle,
            None => Tick::Waiting,
        }
    }

    fn run(&self, stop: mpsc::Receiver<()>) {
        log::info!(
            "debounce scheduler started (poll {:?}, complete {:?}, partial {:?}, cooldown {:?})",
            self.config.poll_interval,
            self.config.complete_after,
            self.config.partial_after,
            self.config.cooldown
        );
        loop {
            let pause = match self.tick() {
                Tick::Dispatched {
                    reason,
                    payload,
                    delivered,
                } => {
                    log::debug!("{reason:?} flush of {payload} (delivered: {delivered}), cooling down");
                    self.config.cooldown
                }
                Tick::Idle | Tick::Waiting => self.config.poll_interval,
            };
            match stop.recv_timeout(pause) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::info!("debounce scheduler stopped");
    }

    /// Runs the poll loop on its own thread until the handle is stopped or dropped
    pub fn spawn(self) -> std::io::Result<SchedulerHandle> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name("debounce".into())
            .spawn(move || self.run(stop_rx))?;
        Ok(SchedulerHandle {
            stop: Some(stop_tx),
            join: Some(join),
        })
    }
}

/// Delivers a flushed snapshot once. Failures are logged and the snapshot is
/// gone.
pub fn dispatch(sink: &dyn DispatchSink, reason: FlushReason, payload: &NotificationPayload) -> bool {
    let announced = payload.clone().with_placeholders();
    log::info!("announcing {reason:?} track: {announced}");
    match sink.notify(&announced) {
        Ok(()) => true,
        Err(e) => {
            log::error!("failed to deliver notification: {e}");
            false
        }
    }
}

pub struct SchedulerHandle {
    stop: Option<mpsc::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Wakes the loop and waits for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::error!("debounce scheduler panicked");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
