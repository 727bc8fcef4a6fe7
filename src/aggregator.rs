//! Accumulates track fields that arrive one at a time and hands them out as a
//! single snapshot once the scheduler decides the track has settled.

use std::sync::{Mutex, MutexGuard};

use crate::domain::track::{NotificationPayload, TrackField};

/// Milliseconds since the unix epoch. Zero means "never".
pub type MillisSinceUnix = i64;

/// Source of the current time, injected so tests can move it by hand
pub trait Clock: Send + Sync {
    fn now(&self) -> MillisSinceUnix;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> MillisSinceUnix {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Last time each field was set since the previous flush
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArrivalTimes {
    pub song_title: MillisSinceUnix,
    pub artist: MillisSinceUnix,
    pub album: MillisSinceUnix,
    pub genre: MillisSinceUnix,
    pub art_url: MillisSinceUnix,
}

impl ArrivalTimes {
    pub fn get(&self, field: TrackField) -> MillisSinceUnix {
        match field {
            TrackField::SongTitle => self.song_title,
            TrackField::Artist => self.artist,
            TrackField::Album => self.album,
            TrackField::Genre => self.genre,
            TrackField::ArtUrl => self.art_url,
        }
    }

    fn slot_mut(&mut self, field: TrackField) -> &mut MillisSinceUnix {
        match field {
            TrackField::SongTitle => &mut self.song_title,
            TrackField::Artist => &mut self.artist,
            TrackField::Album => &mut self.album,
            TrackField::Genre => &mut self.genre,
            TrackField::ArtUrl => &mut self.art_url,
        }
    }

    pub fn latest(&self) -> MillisSinceUnix {
        TrackField::ALL
            .iter()
            .map(|f| self.get(*f))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct TrackState {
    values: NotificationPayload,
    arrived: ArrivalTimes,
}

/// Read-only view of the pending state, handed to [`MetadataAggregator::flush_if`]
pub struct PendingView<'a> {
    state: &'a TrackState,
}

impl PendingView<'_> {
    pub fn is_complete(&self, fields: &[TrackField]) -> bool {
        fields.iter().all(|f| self.state.arrived.get(*f) != 0)
    }

    pub fn last_arrival(&self) -> MillisSinceUnix {
        self.state.arrived.latest()
    }

    #[cfg(test)]
    pub fn values(&self) -> &NotificationPayload {
        &self.state.values
    }
}

/// Current track fields shared between the ingest path and the scheduler.
///
/// Every operation takes the inner lock exactly once, so a flush can never
/// interleave with a concurrent set.
pub struct MetadataAggregator {
    clock: Box<dyn Clock>,
    state: Mutex<TrackState>,
}

impl MetadataAggregator {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(TrackState::default()),
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Box::new(SystemClock))
    }

    pub fn now(&self) -> MillisSinceUnix {
        self.clock.now()
    }

    fn lock(&self) -> MutexGuard<'_, TrackState> {
        // a panic while holding the lock cannot leave the fields half written,
        // so the state is still usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Writes `value` into `field` and stamps the current time.
    ///
    /// With `overwrite == false` the write only happens when the field is
    /// currently empty. Returns whether the field was written.
    pub fn set(&self, field: TrackField, value: impl Into<String>, overwrite: bool) -> bool {
        let now = self.clock.now();
        let mut state = self.lock();
        let slot = state.values.slot_mut(field);
        if !overwrite && !slot.is_empty() {
            return false;
        }
        *slot = value.into();
        *state.arrived.slot_mut(field) = now;
        true
    }

    pub fn set_field(&self, field: TrackField, value: impl Into<String>) {
        self.set(field, value, true);
    }

    pub fn set_field_if_empty(&self, field: TrackField, value: impl Into<String>) -> bool {
        self.set(field, value, false)
    }

    #[cfg(test)]
    pub fn value(&self, field: TrackField) -> String {
        self.lock().values.get(field).to_string()
    }

    #[cfg(test)]
    pub fn arrived_at(&self, field: TrackField) -> MillisSinceUnix {
        self.lock().arrived.get(field)
    }

    /// True iff every field in `fields` was set since the last flush,
    /// whatever its value.
    pub fn is_complete(&self, fields: &[TrackField]) -> bool {
        PendingView { state: &self.lock() }.is_complete(fields)
    }

    pub fn last_arrival(&self) -> MillisSinceUnix {
        self.lock().arrived.latest()
    }

    /// Takes the current values and resets every field and timestamp.
    pub fn flush(&self) -> NotificationPayload {
        let mut state = self.lock();
        let snapshot = std::mem::take(&mut *state);
        log::debug!("flushed {:?} arrived {:?}", snapshot.values, snapshot.arrived);
        snapshot.values
    }

    /// Runs `decide` against the pending state and flushes when it returns
    /// `Some`, all under the same lock.
    pub fn flush_if<R>(
        &self,
        decide: impl FnOnce(&PendingView<'_>) -> Option<R>,
    ) -> Option<(R, NotificationPayload)> {
        let mut state = self.lock();
        let decision = decide(&PendingView { state: &state })?;
        let snapshot = std::mem::take(&mut *state);
        log::debug!("flushed {:?} arrived {:?}", snapshot.values, snapshot.arrived);
        Some((decision, snapshot.values))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    };

    use super::{Clock, MillisSinceUnix};

    /// Clock that only moves when told to
    #[derive(Debug, Clone, Default)]
    pub struct ManualClock(Arc<AtomicI64>);

    impl ManualClock {
        pub fn at(millis: MillisSinceUnix) -> Self {
            Self(Arc::new(AtomicI64::new(millis)))
        }

        pub fn advance_secs(&self, secs: i64) {
            self.0.fetch_add(secs * 1000, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> MillisSinceUnix {
            self.0.load(Ordering::SeqCst)
        }
    }
}
