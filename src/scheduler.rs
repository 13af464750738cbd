// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The explicitly polled scheduler that owns and drives runnable tasks.

use crate::task::cell::Runnable;
use crate::task::Status;
use core::fmt;
use core::mem;
use core::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use static_assertions::assert_impl_all;
use std::sync::Arc;

/// Owns the set of runnable task cells and advances them in batches.
///
/// A `Scheduler` is a cheaply cloneable handle; every clone drives the same
/// runnable list. Tasks belong to exactly one scheduler for their lifetime
/// and run on whatever thread calls [`poll`] on it — the scheduler never
/// spawns threads and nothing advances between `poll` calls.
///
/// [`poll`] is meant to be driven by a single thread at a time per
/// scheduler; submitting tasks and requesting cancellation are safe from any
/// thread.
///
/// [`poll`]: Scheduler::poll
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    run_queue: Mutex<Vec<Arc<dyn Runnable>>>,
    /// Number of cells parked in `run_queue`.
    queued: AtomicUsize,
    /// Number of cells drained out of `run_queue` by an in-flight `poll`.
    in_tick: AtomicUsize,
}

assert_impl_all!(Scheduler: Send, Sync, Clone);

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                run_queue: Mutex::new(Vec::new()),
                queued: AtomicUsize::new(0),
                in_tick: AtomicUsize::new(0),
            }),
        }
    }

    pub(crate) fn post(&self, cell: Arc<dyn Runnable>) {
        tracing::trace!(task.id = cell.shared().id().as_u64(), "post");
        self.inner.queued.fetch_add(1, Ordering::Relaxed);
        self.inner.run_queue.lock().push(cell);
    }

    /// Drives the runnable list.
    ///
    /// Takes a snapshot of the cells that were runnable when the call
    /// started, ticks each once in insertion order, and re-enqueues those
    /// still in progress. Cells submitted *during* the call (by a body or by
    /// another thread) are picked up by the next call, so a single `poll`
    /// performs a bounded amount of work.
    ///
    /// Returns the number of cells that reached a terminal state. If `max`
    /// is non-zero, the scan stops once that many cells have finished and
    /// the rest of the snapshot is re-enqueued without being ticked.
    pub fn poll(&self, max: usize) -> usize {
        let batch = mem::take(&mut *self.inner.run_queue.lock());
        if batch.is_empty() {
            return 0;
        }
        self.inner.in_tick.store(batch.len(), Ordering::Relaxed);
        self.inner.queued.fetch_sub(batch.len(), Ordering::Relaxed);

        let mut finished = 0;
        let mut survivors = Vec::new();
        for cell in batch {
            if max != 0 && finished == max {
                self.inner.in_tick.fetch_sub(1, Ordering::Relaxed);
                survivors.push(cell);
                continue;
            }

            let status = cell.run();
            self.inner.in_tick.fetch_sub(1, Ordering::Relaxed);
            match status {
                Status::InProgress => survivors.push(cell),
                _ => finished += 1,
            }
        }

        if !survivors.is_empty() {
            let mut queue = self.inner.run_queue.lock();
            self.inner
                .queued
                .fetch_add(survivors.len(), Ordering::Relaxed);
            // survivors keep their place ahead of cells posted mid-poll
            survivors.extend(queue.drain(..));
            *queue = survivors;
        }

        tracing::trace!(finished, "poll");
        finished
    }

    /// The number of cells this scheduler currently owns: parked in the
    /// runnable list or being ticked by an in-flight [`poll`].
    ///
    /// [`poll`]: Scheduler::poll
    pub fn queued_count(&self) -> usize {
        self.inner.queued.load(Ordering::Relaxed) + self.inner.in_tick.load(Ordering::Relaxed)
    }

    pub fn has_tasks(&self) -> bool {
        self.queued_count() > 0
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("queued", &self.queued_count())
            .finish()
    }
}
