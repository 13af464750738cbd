// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::outcome::Outcome;
use crate::scheduler::Scheduler;
use crate::task::body::{TaskBody, TickContext};
use crate::task::{Status, Task};

/// State threaded through every callback of a loop task: the owning
/// scheduler, caller-supplied data, and the index of the current iteration.
pub struct LoopContext<C> {
    scheduler: Scheduler,
    data: C,
    index: usize,
}

impl<C> LoopContext<C> {
    /// The scheduler that owns the loop; inner tasks are usually spawned
    /// here.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn data(&self) -> &C {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut C {
        &mut self.data
    }

    /// Completed iterations so far: 0 while the first inner task runs.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Body that launches inner tasks one after another until a callback calls
/// the loop off (or an inner task fails).
struct LoopBody<C, Create, After, Before, Fin, T, E, U, E2>
where
    Create: FnMut(&mut LoopContext<C>) -> Task<T, E>,
    Fin: FnOnce(&mut LoopContext<C>, Option<&Task<T, E>>, Status) -> Outcome<U, E2>,
{
    context: LoopContext<C>,
    create: Create,
    after_each: After,
    before_each: Before,
    finalize: Option<Fin>,
    inner: Option<Task<T, E>>,
    out: Option<Outcome<U, E2>>,
    canceled: bool,
}

impl<C, Create, After, Before, Fin, T, E, U, E2>
    LoopBody<C, Create, After, Before, Fin, T, E, U, E2>
where
    Create: FnMut(&mut LoopContext<C>) -> Task<T, E>,
    Before: FnMut(&mut LoopContext<C>) -> bool,
    Fin: FnOnce(&mut LoopContext<C>, Option<&Task<T, E>>, Status) -> Outcome<U, E2>,
{
    /// Runs the finalizer exactly once and closes the loop with `status`.
    fn finish_all(&mut self, status: Status) -> Status {
        debug_assert!(status.is_terminal());
        let finalize = self.finalize.take().expect("loop finalized twice");
        self.out = Some(finalize(&mut self.context, self.inner.as_ref(), status));
        status
    }

    /// Asks `before_each`, then launches a new inner task. Returns `false`
    /// if the callback declined.
    fn start_next(&mut self) -> bool {
        if !(self.before_each)(&mut self.context) {
            return false;
        }
        debug_assert!(self.inner.as_ref().is_none_or(Task::is_finished));
        self.inner = Some((self.create)(&mut self.context));
        true
    }
}

impl<C, Create, After, Before, Fin, T, E, U, E2> TaskBody
    for LoopBody<C, Create, After, Before, Fin, T, E, U, E2>
where
    C: Send + 'static,
    Create: FnMut(&mut LoopContext<C>) -> Task<T, E> + Send + 'static,
    After: FnMut(&mut LoopContext<C>, &Task<T, E>) -> bool + Send + 'static,
    Before: FnMut(&mut LoopContext<C>) -> bool + Send + 'static,
    Fin: FnOnce(&mut LoopContext<C>, Option<&Task<T, E>>, Status) -> Outcome<U, E2>
        + Send
        + 'static,
    T: Send + 'static,
    E: Send + 'static,
    U: Send + 'static,
    E2: Send + 'static,
{
    type Value = U;
    type Error = E2;

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Status {
        if cx.cancel_requested() {
            if let Some(inner) = &self.inner {
                // the inner task may ignore the request; wait for it to
                // finish either way before closing the loop
                self.canceled = true;
                inner.try_cancel();
                if !inner.is_finished() {
                    return Status::InProgress;
                }
            }
            return self.finish_all(Status::Canceled);
        }

        let mut start = true;
        if let Some(inner) = &self.inner {
            match inner.status() {
                Status::Canceled => return self.finish_all(Status::Canceled),
                Status::Failed => return self.finish_all(Status::Failed),
                Status::InProgress => return Status::InProgress,
                Status::Successful => {
                    start = (self.after_each)(&mut self.context, inner);
                    self.context.index += 1;
                }
            }
        }

        // a cancel request observed on an earlier tick closes the loop once
        // the inner task is done
        if self.canceled {
            return self.finish_all(Status::Canceled);
        }
        if !start || !self.start_next() {
            return self.finish_all(Status::Successful);
        }
        Status::InProgress
    }

    fn finish(&mut self) -> Outcome<U, E2> {
        self.out.take().expect("loop finished twice")
    }
}

impl Scheduler {
    /// Submits a loop task that launches inner tasks until told to stop.
    ///
    /// Per iteration: `before_each` decides whether to launch at all (a
    /// `false` ends the loop `Successful`); `create` produces the inner
    /// task; once it finishes successfully `after_each` decides whether to
    /// go around again. An inner failure or cancellation ends the loop with
    /// that status. `finalize` runs exactly once when the loop ends — it
    /// receives the last inner task (if any) and the closing status, and
    /// produces the loop's payload.
    ///
    /// A cancel request cancels the live inner task, waits for it, then
    /// finalizes `Canceled`.
    pub fn spawn_loop<C, Create, After, Before, Fin, T, E, U, E2>(
        &self,
        data: C,
        create: Create,
        after_each: After,
        before_each: Before,
        finalize: Fin,
    ) -> Task<U, E2>
    where
        C: Send + 'static,
        Create: FnMut(&mut LoopContext<C>) -> Task<T, E> + Send + 'static,
        After: FnMut(&mut LoopContext<C>, &Task<T, E>) -> bool + Send + 'static,
        Before: FnMut(&mut LoopContext<C>) -> bool + Send + 'static,
        Fin: FnOnce(&mut LoopContext<C>, Option<&Task<T, E>>, Status) -> Outcome<U, E2>
            + Send
            + 'static,
        T: Send + 'static,
        E: Send + 'static,
        U: Send + 'static,
        E2: Send + 'static,
    {
        Task::from_body(
            self,
            LoopBody {
                context: LoopContext {
                    scheduler: self.clone(),
                    data,
                    index: 0,
                },
                create,
                after_each,
                before_each,
                finalize: Some(finalize),
                inner: None,
                out: None,
                canceled: false,
            },
        )
    }

    /// [`spawn_loop`] without a launch gate: iterations keep starting until
    /// `after_each` declines, an inner task fails, or the loop is canceled.
    ///
    /// [`spawn_loop`]: Scheduler::spawn_loop
    pub fn spawn_loop_forever<C, Create, After, Fin, T, E, U, E2>(
        &self,
        data: C,
        create: Create,
        after_each: After,
        finalize: Fin,
    ) -> Task<U, E2>
    where
        C: Send + 'static,
        Create: FnMut(&mut LoopContext<C>) -> Task<T, E> + Send + 'static,
        After: FnMut(&mut LoopContext<C>, &Task<T, E>) -> bool + Send + 'static,
        Fin: FnOnce(&mut LoopContext<C>, Option<&Task<T, E>>, Status) -> Outcome<U, E2>
            + Send
            + 'static,
        T: Send + 'static,
        E: Send + 'static,
        U: Send + 'static,
        E2: Send + 'static,
    {
        self.spawn_loop(data, create, after_each, |_| true, finalize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn drain(scheduler: &Scheduler) {
        while scheduler.has_tasks() {
            scheduler.poll(0);
        }
    }

    #[test]
    fn loop_with_early_stop_runs_one_iteration() {
        let created = Arc::new(Mutex::new(0));
        let scheduler = Scheduler::new();

        let task = {
            let created = created.clone();
            scheduler.spawn_loop(
                (),
                move |cx| {
                    *created.lock() += 1;
                    cx.scheduler().ready(outcome::value('y'))
                },
                |_cx, _inner| false,
                |_cx| true,
                |_cx, _last, status| {
                    assert_eq!(status, Status::Successful);
                    outcome::value(2)
                },
            )
        };

        drain(&scheduler);

        assert_eq!(*created.lock(), 1);
        assert!(task.is_successful());
        assert_eq!(*task.get().value(), 2);
    }

    #[test]
    fn before_each_can_decline_the_first_iteration() {
        let scheduler = Scheduler::new();
        let task = scheduler.spawn_loop(
            (),
            |cx| cx.scheduler().ready(outcome::value(())),
            |_cx, _inner| true,
            |_cx| false,
            |_cx, last, status| {
                assert!(last.is_none());
                assert_eq!(status, Status::Successful);
                outcome::value("never started")
            },
        );

        drain(&scheduler);
        assert_eq!(*task.get().value(), "never started");
    }

    #[test]
    fn iteration_index_advances_per_completed_inner_task() {
        let scheduler = Scheduler::new();
        let task = scheduler.spawn_loop_forever(
            Vec::new(),
            |cx| {
                let index = cx.index();
                cx.data_mut().push(index);
                cx.scheduler().ready(outcome::value(()))
            },
            |cx, _inner| cx.index() < 2,
            |cx, _last, status| {
                assert_eq!(status, Status::Successful);
                outcome::value(cx.data().clone())
            },
        );

        drain(&scheduler);
        assert_eq!(*task.get().value(), vec![0, 1, 2]);
    }

    #[test]
    fn inner_failure_closes_the_loop_with_failed() {
        let scheduler = Scheduler::new();
        let task = scheduler.spawn_loop_forever(
            (),
            |cx| cx.scheduler().ready(outcome::error(13)),
            |_cx, _inner| true,
            |_cx, last, status| {
                assert_eq!(status, Status::Failed);
                Outcome::<(), _>::Error(*last.unwrap().get().error())
            },
        );

        drain(&scheduler);
        assert!(task.is_failed());
        assert_eq!(*task.get().error(), 13);
    }

    #[test]
    fn canceling_a_forever_loop_finalizes_with_canceled() {
        let scheduler = Scheduler::new();
        let finalized = Arc::new(Mutex::new(None));

        let task = {
            let finalized = finalized.clone();
            scheduler.spawn_loop_forever(
                (),
                |cx| cx.scheduler().ready(outcome::value(())),
                |_cx, _inner| true,
                move |_cx, _last, status| {
                    *finalized.lock() = Some(status);
                    Outcome::<(), ()>::Canceled
                },
            )
        };

        scheduler.poll(0);
        assert!(task.is_in_progress());

        task.try_cancel();
        drain(&scheduler);

        assert!(task.is_canceled());
        assert_eq!(*finalized.lock(), Some(Status::Canceled));
    }

    #[test]
    fn cancel_waits_for_a_live_inner_task() {
        let scheduler = Scheduler::new();

        let task = scheduler.spawn_loop_forever(
            (),
            |cx| {
                cx.scheduler().spawn_in_place(
                    0u32,
                    |ticks, step_cx| {
                        // ignore the first cancel request to force the loop
                        // to wait for us
                        *ticks += 1;
                        if step_cx.cancel_requested() && *ticks > 1 {
                            Status::Canceled
                        } else {
                            Status::InProgress
                        }
                    },
                    |_ticks, _status| Outcome::<(), ()>::Canceled,
                )
            },
            |_cx, _inner| true,
            |_cx, _last, status| {
                assert_eq!(status, Status::Canceled);
                Outcome::<(), ()>::Canceled
            },
        );

        // launch the inner task and let it run once
        scheduler.poll(0);
        scheduler.poll(0);
        assert!(task.is_in_progress());

        task.try_cancel();
        drain(&scheduler);
        assert!(task.is_canceled());
    }
}
