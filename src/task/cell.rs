// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::outcome::Outcome;
use crate::scheduler::Scheduler;
use crate::task::body::{TaskBody, TickContext};
use crate::task::id::Id;
use crate::task::state::State;
use crate::task::Status;
use core::mem;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

/// The part of a cell that is shared between the scheduler's runnable list
/// and every handle: status, cancel flag, owning scheduler, identity.
pub(crate) struct Shared {
    state: State,
    scheduler: Scheduler,
    id: Id,
    span: tracing::Span,
}

impl Shared {
    pub(crate) fn state(&self) -> &State {
        &self.state
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub(crate) fn id(&self) -> Id {
        self.id
    }
}

/// The lifecycle of a cell's embedded body.
///
/// `Running` until the body reports a terminal status, at which point the
/// completion payload is moved into `Finished`. `consume` on a handle moves
/// it out again, leaving `Consumed`.
enum BodySlot<B: TaskBody> {
    Running(B),
    Finished(Outcome<B::Value, B::Error>),
    Consumed,
}

/// The refcounted state behind every task: shared atomics plus the embedded
/// body.
///
/// A `Cell` is jointly owned (via `Arc`) by the user-facing handles and by
/// the owning scheduler's runnable list; it is deallocated when the last of
/// those drops. The scheduler stores cells type-erased as [`Runnable`]; the
/// handle keeps the `(Value, Error)` typing through [`OutputCell`]. No
/// dispatch on the body type exists outside the cell.
pub(crate) struct Cell<B: TaskBody> {
    shared: Shared,
    body: Mutex<BodySlot<B>>,
}

impl<B: TaskBody> Cell<B> {
    pub(crate) fn new(scheduler: Scheduler, id: Id, span: tracing::Span, body: B) -> Self {
        Self {
            shared: Shared {
                state: State::new(),
                scheduler,
                id,
                span,
            },
            body: Mutex::new(BodySlot::Running(body)),
        }
    }

    /// Finishes a cell whose body declared a terminal initial status, without
    /// it ever being ticked.
    pub(crate) fn settle_initial(&self, status: Status) {
        debug_assert!(status.is_terminal());
        let mut slot = self.body.lock();
        let outcome = match &mut *slot {
            BodySlot::Running(body) => body.finish(),
            _ => unreachable!("cell settled twice"),
        };
        debug_assert_eq!(outcome.has_value(), status == Status::Successful);
        *slot = BodySlot::Finished(outcome);
        drop(slot);
        self.shared.state.finish(status);
    }
}

/// The scheduler-facing view of a cell.
pub(crate) trait Runnable: Send + Sync {
    fn shared(&self) -> &Shared;

    /// Drives the embedded body by one tick, publishing the terminal status
    /// and completion payload if the body finishes.
    fn run(&self) -> Status;
}

impl<B: TaskBody> Runnable for Cell<B> {
    fn shared(&self) -> &Shared {
        &self.shared
    }

    fn run(&self) -> Status {
        let _span = self.shared.span.enter();
        let cancel_requested = self.shared.state.take_cancel();

        let mut slot = self.body.lock();
        let status = match &mut *slot {
            BodySlot::Running(body) => {
                let mut cx = TickContext::new(&self.shared.scheduler, cancel_requested);
                body.tick(&mut cx)
            }
            _ => unreachable!("ticked a finished task"),
        };
        tracing::trace!(?status, cancel_requested, "tick");

        if status.is_terminal() {
            let outcome = match &mut *slot {
                BodySlot::Running(body) => body.finish(),
                _ => unreachable!(),
            };
            debug_assert_eq!(
                outcome.has_value(),
                status == Status::Successful,
                "a task must hold a value iff it finished successfully"
            );
            *slot = BodySlot::Finished(outcome);
            // The payload is in place; only now may other threads observe the
            // terminal status.
            drop(slot);
            self.shared.state.finish(status);
        }

        status
    }
}

/// The handle-facing view of a cell, typed by the task's `(Value, Error)`
/// pair.
pub(crate) trait OutputCell<T, E>: Send + Sync {
    fn shared(&self) -> &Shared;

    /// A shared reference to the completion payload.
    ///
    /// Panics if the task has not finished, or the payload was consumed.
    fn outcome(&self) -> MappedMutexGuard<'_, Outcome<T, E>>;

    /// Moves the completion payload out of the cell.
    ///
    /// Panics if the task has not finished, or the payload was already
    /// consumed.
    fn take_outcome(&self) -> Outcome<T, E>;
}

impl<B: TaskBody> OutputCell<B::Value, B::Error> for Cell<B> {
    fn shared(&self) -> &Shared {
        &self.shared
    }

    fn outcome(&self) -> MappedMutexGuard<'_, Outcome<B::Value, B::Error>> {
        assert!(
            self.shared.state.load().is_terminal(),
            "called `Task::get` on a task that is still in progress"
        );
        MutexGuard::map(self.body.lock(), |slot| match slot {
            BodySlot::Finished(outcome) => outcome,
            BodySlot::Consumed => panic!("task output was already consumed"),
            BodySlot::Running(_) => unreachable!("terminal status published before the payload"),
        })
    }

    fn take_outcome(&self) -> Outcome<B::Value, B::Error> {
        assert!(
            self.shared.state.load().is_terminal(),
            "called `Task::consume` on a task that is still in progress"
        );
        let mut slot = self.body.lock();
        match mem::replace(&mut *slot, BodySlot::Consumed) {
            BodySlot::Finished(outcome) => outcome,
            BodySlot::Consumed => panic!("task output was already consumed"),
            BodySlot::Running(_) => unreachable!("terminal status published before the payload"),
        }
    }
}
