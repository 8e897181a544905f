//! Completion tracking for scoped workers.
//!
//! Every stage spawns one worker per unit (network or board) and then keeps the
//! control thread busy with periodic work (checkpoints, progress) until all units are
//! done. [`CompletionBarrier`] holds one done flag per unit and a counter of finished
//! units; the control thread polls it every [`TICK`].
//!
//! Workers hold a [`DoneGuard`] which marks the unit done when dropped, so a worker
//! that returns early or panics never leaves the control loop waiting.

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
    time::Duration,
};

/// Polling period of the control loop.
pub const TICK: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct CompletionBarrier {
    done: Vec<AtomicBool>,
    finished: AtomicUsize,
}

impl CompletionBarrier {
    #[must_use]
    pub fn new(units: usize) -> Self {
        Self {
            done: (0..units).map(|_| AtomicBool::new(false)).collect(),
            finished: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.done.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    /// Marks a unit done. Marking the same unit twice counts once.
    pub fn mark_done(&self, unit: usize) {
        if !self.done[unit].swap(true, Ordering::AcqRel) {
            self.finished.fetch_add(1, Ordering::AcqRel);
        }
    }

    #[must_use]
    pub fn is_done(&self, unit: usize) -> bool {
        self.done[unit].load(Ordering::Acquire)
    }

    #[must_use]
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.finished() == self.done.len()
    }

    #[must_use]
    pub fn guard(&self, unit: usize) -> DoneGuard<'_> {
        DoneGuard {
            barrier: self,
            unit,
        }
    }

    /// Blocks until every unit is done, calling `on_tick` once per tick.
    pub fn wait<F>(&self, tick: Duration, mut on_tick: F)
    where
        F: FnMut(&Self),
    {
        while !self.is_complete() {
            on_tick(self);
            thread::sleep(tick);
        }
    }
}

#[derive(Debug)]
pub struct DoneGuard<'a> {
    barrier: &'a CompletionBarrier,
    unit: usize,
}

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.barrier.mark_done(self.unit);
    }
}
