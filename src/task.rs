// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Task handles, the body protocol, and the built-in adapter bodies.

mod body;
pub(crate) mod cell;
mod chain;
mod for_loop;
mod function;
mod future;
mod id;
mod in_place;
mod noop;
mod state;

use crate::outcome::Outcome;
use crate::scheduler::Scheduler;
use crate::task::cell::{Cell, OutputCell};
use core::any::type_name;
use core::fmt;
use static_assertions::assert_impl_all;
use std::sync::Arc;

pub use body::{TaskBody, TickContext};
pub use for_loop::LoopContext;
pub use function::{IntoTask, Step};
pub use id::Id;

/// The lifecycle tag attached to every task.
///
/// Transitions are monotone: a task starts `InProgress` and moves exactly
/// once to one of the three terminal states, where it stays.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Status {
    /// The task has not finished; its payload must not be read.
    InProgress,
    /// The task finished with a value.
    Successful,
    /// The task finished with an error.
    Failed,
    /// The task was canceled; it holds no payload.
    Canceled,
}

impl Status {
    /// `true` for every status except [`Status::InProgress`].
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::InProgress)
    }
}

/// A shared reference to a finished task's [`Outcome`], borrowed from the
/// task's cell.
pub type OutcomeRef<'a, T, E> = parking_lot::MappedMutexGuard<'a, Outcome<T, E>>;

/// A handle to an in-flight (or finished) unit of work.
///
/// Handles are move-only: the combinator machinery clones the underlying
/// refcounted cell internally, but user code never duplicates a handle.
/// Dropping a handle does **not** cancel the task; the owning scheduler
/// keeps the cell alive until the body finishes.
pub struct Task<T, E = ()> {
    cell: Arc<dyn OutputCell<T, E>>,
}

assert_impl_all!(Task<i32, String>: Send, Sync);
assert_impl_all!(Status: Send, Sync, Copy);

impl<T, E> Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Registers a custom [`TaskBody`] with `scheduler` and returns the
    /// handle to it.
    ///
    /// If the body declares a terminal [`TaskBody::initial_status`], the task
    /// starts finished and is never enqueued.
    pub fn from_body<B>(scheduler: &Scheduler, body: B) -> Self
    where
        B: TaskBody<Value = T, Error = E>,
    {
        let id = Id::next();
        let span = tracing::trace_span!(
            "task",
            task.id = id.as_u64(),
            task.body = %type_name::<B>(),
        );

        let initial = body.initial_status();
        let cell = Arc::new(Cell::new(scheduler.clone(), id, span, body));
        if initial.is_terminal() {
            cell.settle_initial(initial);
        } else {
            scheduler.post(cell.clone());
        }
        Self { cell }
    }
}

impl<T, E> Task<T, E> {
    /// The task's current status.
    pub fn status(&self) -> Status {
        self.cell.shared().state().load()
    }

    pub fn is_in_progress(&self) -> bool {
        self.status() == Status::InProgress
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn is_successful(&self) -> bool {
        self.status() == Status::Successful
    }

    /// `true` for both [`Status::Failed`] and [`Status::Canceled`]:
    /// cancellation is a species of failure for downstream selectors.
    pub fn is_failed(&self) -> bool {
        matches!(self.status(), Status::Failed | Status::Canceled)
    }

    pub fn is_canceled(&self) -> bool {
        self.status() == Status::Canceled
    }

    /// The task's unique [`Id`].
    pub fn id(&self) -> Id {
        self.cell.shared().id()
    }

    /// The scheduler that owns this task.
    pub fn scheduler(&self) -> &Scheduler {
        self.cell.shared().scheduler()
    }

    /// Requests cancellation.
    ///
    /// Sets a one-shot flag that the body observes on its next tick; the
    /// status does not change synchronously, and a body is free to ignore
    /// the request. Idempotent, safe from any thread.
    pub fn try_cancel(&self) {
        tracing::trace!(task.id = self.id().as_u64(), "try_cancel");
        self.cell.shared().state().request_cancel();
    }

    /// A shared reference to the completion payload.
    ///
    /// # Panics
    ///
    /// Panics if the task has not finished, or if the payload was moved out
    /// with [`Task::consume`].
    #[track_caller]
    pub fn get(&self) -> OutcomeRef<'_, T, E> {
        self.cell.outcome()
    }

    /// Moves the completion payload out of the task.
    ///
    /// # Panics
    ///
    /// Panics if the task has not finished, or on a second call.
    #[track_caller]
    pub fn consume(&self) -> Outcome<T, E> {
        self.cell.take_outcome()
    }

    /// Duplicates the handle for the combinator machinery. Deliberately not
    /// `Clone`: user-facing handles are move-only.
    pub(crate) fn clone_handle(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Task<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}
