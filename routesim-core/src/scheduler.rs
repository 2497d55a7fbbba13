use crate::time::Timestamp;
use std::{cmp::Reverse, collections::BinaryHeap, time::Duration};
use thiserror::Error;

/// A strict time-ordered queue of pending events, executed cooperatively.
///
/// The scheduler is the only driver of control flow in a simulation:
/// every component method runs to completion as part of an event, and
/// "suspending" is always expressed by scheduling a further event, never
/// by blocking the caller. This single-threaded model is what makes runs
/// deterministic and removes any need for locking.
///
/// # Ordering guarantee
///
/// Events scheduled for the same timestamp pop in FIFO order of the
/// scheduling call (stable tie-break through a sequence number). This is
/// load bearing: two queue-depth probes scheduled for the same instant
/// must appear in their timelines in call order, reproducibly.
///
/// # Horizon
///
/// An optional horizon bounds the run: events due strictly after it are
/// silently dropped, never executed. The horizon is the only cancellation
/// mechanism; once an event is scheduled within the horizon it will run.
///
/// # Example
///
/// ```
/// use routesim_core::{EventScheduler, Timestamp};
/// use std::time::Duration;
///
/// let mut scheduler = EventScheduler::new();
/// scheduler.schedule(Duration::from_secs(2), "second").unwrap();
/// scheduler.schedule(Duration::from_secs(1), "first").unwrap();
///
/// let (at, event) = scheduler.pop().unwrap();
/// assert_eq!(event, "first");
/// assert_eq!(at, Timestamp::ZERO + Duration::from_secs(1));
/// assert_eq!(scheduler.now(), at);
/// ```
pub struct EventScheduler<E> {
    queue: BinaryHeap<Reverse<Entry<E>>>,
    now: Timestamp,
    seq: u64,
    horizon: Option<Timestamp>,
}

struct Entry<E> {
    due: Timestamp,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<E> Eq for Entry<E> {}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Entry<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

/// Error returned when a scheduling request is malformed.
///
/// Fatal to the scheduling call only; the run keeps going unless the
/// caller chooses to propagate it.
#[derive(Debug, Clone, Copy, Error)]
pub enum ScheduleError {
    /// The absolute target time is before the current simulated time.
    #[error("cannot schedule at {due}, the simulation already reached {now}")]
    InPast { due: Timestamp, now: Timestamp },
    /// `now + delay` overflows the representable timeline.
    #[error("scheduling delay overflows the simulated timeline")]
    Overflow,
}

impl<E> EventScheduler<E> {
    /// Create an empty scheduler at [`Timestamp::ZERO`] with no horizon.
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            now: Timestamp::ZERO,
            seq: 0,
            horizon: None,
        }
    }

    /// The current simulated time: the timestamp of the last popped
    /// event, or [`Timestamp::ZERO`] before the first one.
    #[inline]
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// The configured horizon, if any.
    #[inline]
    pub fn horizon(&self) -> Option<Timestamp> {
        self.horizon
    }

    /// Bound the run: events due strictly after `at` are dropped.
    pub fn set_horizon(&mut self, at: Timestamp) {
        self.horizon = Some(at);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// The due time of the next pending event, if any.
    pub fn peek_time(&self) -> Option<Timestamp> {
        self.queue.peek().map(|entry| entry.0.due)
    }

    /// Enqueue `event` to fire at `now + delay`.
    ///
    /// A delay of zero is valid: the event fires at the current time,
    /// after every event already scheduled for that time (FIFO). An
    /// event due after the horizon is silently dropped and the call
    /// still succeeds, mirroring "stop at T" semantics.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::Overflow`] if `now + delay` is not representable.
    pub fn schedule(&mut self, delay: Duration, event: E) -> Result<(), ScheduleError> {
        let due = self
            .now
            .checked_add(delay)
            .ok_or(ScheduleError::Overflow)?;
        self.schedule_at(due, event)
    }

    /// Enqueue `event` to fire at the absolute time `due`.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::InPast`] if `due` is before the current
    /// simulated time. (Delays are unsigned, so a relative
    /// [`schedule`](Self::schedule) can never trip this; the check
    /// guards absolute targets.)
    pub fn schedule_at(&mut self, due: Timestamp, event: E) -> Result<(), ScheduleError> {
        if due < self.now {
            return Err(ScheduleError::InPast {
                due,
                now: self.now,
            });
        }
        if let Some(horizon) = self.horizon
            && due > horizon
        {
            tracing::trace!(%due, %horizon, "event past the horizon, dropped");
            return Ok(());
        }
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(Reverse(Entry { due, seq, event }));
        Ok(())
    }

    /// Pop the earliest pending event and advance the clock to its due
    /// time.
    ///
    /// Returns `None` when the queue is exhausted or every remaining
    /// event is past the horizon (the run is over).
    pub fn pop(&mut self) -> Option<(Timestamp, E)> {
        while let Some(Reverse(entry)) = self.queue.pop() {
            // A horizon lowered mid-run can leave stale entries behind.
            if let Some(horizon) = self.horizon
                && entry.due > horizon
            {
                continue;
            }
            self.now = entry.due;
            return Some((entry.due, entry.event));
        }
        None
    }
}

impl<E> Default for EventScheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty() {
        let mut scheduler = EventScheduler::<()>::new();

        assert!(scheduler.is_empty());
        assert_eq!(scheduler.len(), 0);
        assert!(scheduler.pop().is_none());
        assert!(scheduler.peek_time().is_none());
        assert_eq!(scheduler.now(), Timestamp::ZERO);
    }

    #[test]
    fn pops_in_time_order() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule(Duration::from_secs(3), "late").unwrap();
        scheduler.schedule(Duration::from_secs(1), "early").unwrap();
        scheduler.schedule(Duration::from_secs(2), "middle").unwrap();

        let order: Vec<&str> = std::iter::from_fn(|| scheduler.pop())
            .map(|(_, e)| e)
            .collect();
        assert_eq!(order, ["early", "middle", "late"]);
    }

    #[test]
    fn equal_timestamps_pop_in_fifo_call_order() {
        let mut scheduler = EventScheduler::new();
        for label in ["first", "second", "third"] {
            scheduler.schedule(Duration::from_secs(1), label).unwrap();
        }

        let order: Vec<&str> = std::iter::from_fn(|| scheduler.pop())
            .map(|(_, e)| e)
            .collect();
        assert_eq!(order, ["first", "second", "third"]);
    }

    #[test]
    fn pop_advances_now() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule(Duration::from_millis(10), ()).unwrap();

        let (at, ()) = scheduler.pop().unwrap();
        assert_eq!(at, Timestamp::ZERO + Duration::from_millis(10));
        assert_eq!(scheduler.now(), at);
    }

    #[test]
    fn zero_delay_fires_at_current_time() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule(Duration::from_secs(1), "outer").unwrap();
        scheduler.pop().unwrap();

        scheduler.schedule(Duration::ZERO, "inner").unwrap();
        let (at, event) = scheduler.pop().unwrap();
        assert_eq!(event, "inner");
        assert_eq!(at, Timestamp::ZERO + Duration::from_secs(1));
    }

    #[test]
    fn schedule_in_past_rejected() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule(Duration::from_secs(5), ()).unwrap();
        scheduler.pop().unwrap();

        let err = scheduler
            .schedule_at(Timestamp::ZERO + Duration::from_secs(1), ())
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InPast { .. }));
    }

    #[test]
    fn schedule_overflow_rejected() {
        let mut scheduler = EventScheduler::<()>::new();
        scheduler.schedule(Duration::from_secs(1), ()).unwrap();
        scheduler.pop().unwrap();

        let err = scheduler.schedule(Duration::MAX, ()).unwrap_err();
        assert!(matches!(err, ScheduleError::Overflow));
    }

    #[test]
    fn events_past_horizon_are_dropped_silently() {
        let mut scheduler = EventScheduler::new();
        scheduler.set_horizon(Timestamp::ZERO + Duration::from_secs(10));

        scheduler.schedule(Duration::from_secs(5), "kept").unwrap();
        // Succeeds, but never runs.
        scheduler.schedule(Duration::from_secs(11), "dropped").unwrap();

        let order: Vec<&str> = std::iter::from_fn(|| scheduler.pop())
            .map(|(_, e)| e)
            .collect();
        assert_eq!(order, ["kept"]);
    }

    #[test]
    fn event_exactly_at_horizon_runs() {
        let mut scheduler = EventScheduler::new();
        scheduler.set_horizon(Timestamp::ZERO + Duration::from_secs(10));
        scheduler.schedule(Duration::from_secs(10), "boundary").unwrap();

        assert_eq!(scheduler.pop().map(|(_, e)| e), Some("boundary"));
    }

    #[test]
    fn lowered_horizon_cancels_pending_events() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule(Duration::from_secs(5), "early").unwrap();
        scheduler.schedule(Duration::from_secs(50), "late").unwrap();

        scheduler.set_horizon(Timestamp::ZERO + Duration::from_secs(10));

        let order: Vec<&str> = std::iter::from_fn(|| scheduler.pop())
            .map(|(_, e)| e)
            .collect();
        assert_eq!(order, ["early"]);
    }

    #[test]
    fn interleaved_schedule_and_pop_keeps_order() {
        // An event handler scheduling further events is the mechanism of
        // multi-hop forwarding; ordering must hold across interleavings.
        let mut scheduler = EventScheduler::new();
        scheduler.schedule(Duration::from_secs(1), 1u32).unwrap();
        scheduler.schedule(Duration::from_secs(3), 3u32).unwrap();

        let (_, first) = scheduler.pop().unwrap();
        assert_eq!(first, 1);
        scheduler.schedule(Duration::from_secs(1), 2u32).unwrap(); // due t=2

        let order: Vec<u32> = std::iter::from_fn(|| scheduler.pop())
            .map(|(_, e)| e)
            .collect();
        assert_eq!(order, [2, 3]);
    }
}
