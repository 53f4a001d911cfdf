//! Cooperative timer queue on a virtual millisecond clock.
//!
//! Nothing here sleeps. The owner asks for the next due timer, advances the
//! clock to it and dispatches. Timers due at the same instant fire in the
//! order they were armed. Cancelled timers are dropped lazily from the heap.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

pub type TimerId = u64;

/// What a timer drives when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Periodic pose-analysis trigger.
    Analysis,
    /// One-second pose timer tick.
    PoseTick,
    /// Delay between loading a pose and starting its timer.
    Grace,
    /// Authoritative end of a rest period.
    RestEnd,
    /// Cosmetic rest countdown.
    RestCountdown,
    /// Delay between rest end and loading the next pose.
    Advance,
    /// Hand-back after session completion.
    Exit,
    /// Camera-ready prompt after start.
    CameraPrompt,
}

#[derive(Clone, Copy, Debug)]
struct Timer {
    kind: TimerKind,
    period_ms: Option<u64>,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: u64,
    next_id: TimerId,
    seq: u64,
    queue: BinaryHeap<Reverse<(u64, u64, TimerId)>>,
    timers: HashMap<TimerId, Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// One-shot timer.
    pub fn set_timeout(&mut self, delay_ms: u64, kind: TimerKind) -> TimerId {
        self.arm(delay_ms, kind, None)
    }

    /// Repeating timer; the first firing is one period from now.
    pub fn set_interval(&mut self, period_ms: u64, kind: TimerKind) -> TimerId {
        self.arm(period_ms, kind, Some(period_ms.max(1)))
    }

    /// Returns false when the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    /// Cancel every timer of one kind.
    pub fn cancel_kind(&mut self, kind: TimerKind) -> usize {
        let before = self.timers.len();
        self.timers.retain(|_, timer| timer.kind != kind);
        before - self.timers.len()
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
        self.queue.clear();
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Live timers of a kind.
    pub fn count(&self, kind: TimerKind) -> usize {
        self.timers.values().filter(|timer| timer.kind == kind).count()
    }

    /// Live timers of any kind.
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Due time of the earliest live timer.
    pub fn next_due(&mut self) -> Option<u64> {
        self.drop_stale();
        self.queue.peek().map(|Reverse((due, _, _))| *due)
    }

    /// Pop the earliest live timer due at or before `until_ms`, moving the
    /// clock to its due time. Intervals are re-armed before returning.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerId, TimerKind)> {
        self.drop_stale();
        let Reverse((due, _, id)) = *self.queue.peek()?;
        if due > until_ms {
            return None;
        }
        self.queue.pop();
        self.now_ms = self.now_ms.max(due);
        let timer = *self.timers.get(&id)?;
        match timer.period_ms {
            Some(period) => {
                let seq = self.bump_seq();
                self.queue.push(Reverse((due + period, seq, id)));
            }
            None => {
                self.timers.remove(&id);
            }
        }
        Some((id, timer.kind))
    }

    /// Move the clock forward without firing anything.
    pub fn advance_to(&mut self, ms: u64) {
        self.now_ms = self.now_ms.max(ms);
    }

    fn arm(&mut self, delay_ms: u64, kind: TimerKind, period_ms: Option<u64>) -> TimerId {
        self.next_id += 1;
        let id = self.next_id;
        let seq = self.bump_seq();
        self.timers.insert(id, Timer { kind, period_ms });
        self.queue.push(Reverse((self.now_ms + delay_ms, seq, id)));
        id
    }

    fn bump_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn drop_stale(&mut self) {
        while let Some(Reverse((_, _, id))) = self.queue.peek() {
            if self.timers.contains_key(id) {
                break;
            }
            self.queue.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_fire_in_due_then_arm_order() {
        let mut s = Scheduler::new();
        let late = s.set_timeout(2_000, TimerKind::Grace);
        let a = s.set_timeout(1_000, TimerKind::Advance);
        let b = s.set_timeout(1_000, TimerKind::Exit);
        assert_eq!(s.next_due(), Some(1_000));
        assert_eq!(s.pop_due(5_000), Some((a, TimerKind::Advance)));
        assert_eq!(s.pop_due(5_000), Some((b, TimerKind::Exit)));
        assert_eq!(s.pop_due(1_500), None);
        assert_eq!(s.now(), 1_000);
        assert_eq!(s.pop_due(5_000), Some((late, TimerKind::Grace)));
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn intervals_repeat_until_cancelled() {
        let mut s = Scheduler::new();
        let tick = s.set_interval(1_000, TimerKind::PoseTick);
        let mut fired = Vec::new();
        while let Some((id, _)) = s.pop_due(3_500) {
            fired.push((id, s.now()));
        }
        assert_eq!(fired, vec![(tick, 1_000), (tick, 2_000), (tick, 3_000)]);
        assert!(s.cancel(tick));
        assert!(!s.cancel(tick));
        assert_eq!(s.next_due(), None);
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn cancel_kind_and_counts() {
        let mut s = Scheduler::new();
        s.set_interval(500, TimerKind::Analysis);
        s.set_interval(1_000, TimerKind::PoseTick);
        s.set_timeout(2_000, TimerKind::Grace);
        assert_eq!(s.count(TimerKind::Analysis), 1);
        assert_eq!(s.cancel_kind(TimerKind::Analysis), 1);
        assert_eq!(s.next_due(), Some(1_000));
        s.cancel_all();
        assert_eq!(s.pending(), 0);
        assert_eq!(s.pop_due(u64::MAX), None);
    }

    #[test]
    fn timers_armed_later_start_from_current_clock() {
        let mut s = Scheduler::new();
        s.advance_to(10_000);
        s.advance_to(5_000);
        assert_eq!(s.now(), 10_000);
        let id = s.set_timeout(250, TimerKind::CameraPrompt);
        assert_eq!(s.next_due(), Some(10_250));
        assert_eq!(s.pop_due(10_250), Some((id, TimerKind::CameraPrompt)));
    }
}
