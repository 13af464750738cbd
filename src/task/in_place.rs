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

/// Body that drives a caller-supplied step function over mutable state.
///
/// The step runs every tick until it returns a terminal status; the
/// finalizer then maps the state (and the closing status) to the task's
/// payload, exactly once.
struct InPlaceBody<C, StepFn, Fin, U, E2> {
    data: C,
    step: StepFn,
    finalize: Option<Fin>,
    out: Option<Outcome<U, E2>>,
}

impl<C, StepFn, Fin, U, E2> TaskBody for InPlaceBody<C, StepFn, Fin, U, E2>
where
    C: Send + 'static,
    StepFn: FnMut(&mut C, &TickContext<'_>) -> Status + Send + 'static,
    Fin: FnOnce(&mut C, Status) -> Outcome<U, E2> + Send + 'static,
    U: Send + 'static,
    E2: Send + 'static,
{
    type Value = U;
    type Error = E2;

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Status {
        let status = (self.step)(&mut self.data, cx);
        if status.is_terminal() {
            let finalize = self.finalize.take().expect("step task finalized twice");
            self.out = Some(finalize(&mut self.data, status));
        }
        status
    }

    fn finish(&mut self) -> Outcome<U, E2> {
        self.out.take().expect("step task finished twice")
    }
}

impl Scheduler {
    /// Submits a task driven by a step function over mutable state.
    ///
    /// `step` receives the state and the tick context (scheduler plus the
    /// cancel flag) and is run once per tick until it returns a terminal
    /// status. `finalize` then runs exactly once with the state and that
    /// status, producing the task's payload: a value for `Successful`, an
    /// error or the canceled payload otherwise.
    pub fn spawn_in_place<C, StepFn, Fin, U, E2>(
        &self,
        data: C,
        step: StepFn,
        finalize: Fin,
    ) -> Task<U, E2>
    where
        C: Send + 'static,
        StepFn: FnMut(&mut C, &TickContext<'_>) -> Status + Send + 'static,
        Fin: FnOnce(&mut C, Status) -> Outcome<U, E2> + Send + 'static,
        U: Send + 'static,
        E2: Send + 'static,
    {
        Task::from_body(
            self,
            InPlaceBody {
                data,
                step,
                finalize: Some(finalize),
                out: None,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome;

    #[test]
    fn step_runs_until_terminal_and_finalizes_once() {
        let scheduler = Scheduler::new();
        let task = scheduler.spawn_in_place(
            (0u32, 0u32),
            |(ticks, sum), _cx| {
                *ticks += 1;
                *sum += *ticks;
                if *ticks == 3 {
                    Status::Successful
                } else {
                    Status::InProgress
                }
            },
            |(_ticks, sum), status| {
                assert_eq!(status, Status::Successful);
                outcome::value(*sum)
            },
        );

        let mut polls = 0;
        while task.is_in_progress() {
            scheduler.poll(0);
            polls += 1;
        }

        assert_eq!(polls, 3);
        assert_eq!(*task.get().value(), 1 + 2 + 3);
    }

    #[test]
    fn failing_step_carries_an_error_payload() {
        let scheduler = Scheduler::new();
        let task = scheduler.spawn_in_place(
            (),
            |_, _cx| Status::Failed,
            |_, status| {
                assert_eq!(status, Status::Failed);
                outcome::error("step gave up")
            },
        );

        scheduler.poll(0);
        assert!(task.is_failed());
        assert_eq!(*task.get().error(), "step gave up");
    }

    #[test]
    fn step_observes_the_cancel_flag() {
        let scheduler = Scheduler::new();
        let task = scheduler.spawn_in_place(
            0u32,
            |ticks, cx| {
                if cx.cancel_requested() {
                    return Status::Canceled;
                }
                *ticks += 1;
                Status::InProgress
            },
            |ticks, status| {
                assert_eq!(status, Status::Canceled);
                assert!(*ticks > 0);
                Outcome::<(), ()>::Canceled
            },
        );

        scheduler.poll(0);
        assert!(task.is_in_progress());

        task.try_cancel();
        scheduler.poll(0);
        assert!(task.is_canceled());
    }

    #[test]
    fn step_can_spawn_through_the_tick_context() {
        let scheduler = Scheduler::new();
        let task = scheduler.spawn_in_place(
            None,
            |slot: &mut Option<Task<i32, ()>>, cx| match slot {
                None => {
                    *slot = Some(cx.scheduler().spawn(|| outcome::value(21)));
                    Status::InProgress
                }
                Some(inner) if inner.is_finished() => Status::Successful,
                Some(_) => Status::InProgress,
            },
            |slot, _status| {
                let inner = slot.take().expect("no inner task was spawned");
                inner.consume().map(|v| v * 2)
            },
        );

        while task.is_in_progress() {
            scheduler.poll(0);
        }
        assert_eq!(*task.get().value(), 42);
    }
}
