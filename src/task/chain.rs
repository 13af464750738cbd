// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Continuations: tasks gated on a predecessor's terminal status.

use crate::outcome::Outcome;
use crate::scheduler::Scheduler;
use crate::task::function::{FnBody, IntoTask, Invoke, Step};
use crate::task::{Status, Task};

/// Decides whether a continuation's callable runs once the predecessor is
/// finished. A rejected status finishes the continuation `Canceled` without
/// invoking the callable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gate {
    /// `then` / `on_finish`: run regardless of how the predecessor ended.
    Always,
    /// `on_success`: run only after a successful predecessor.
    Success,
    /// `on_fail`: run after a failed *or* canceled predecessor.
    Failure,
    /// `on_cancel`: run only after a canceled predecessor.
    Cancel,
}

impl Gate {
    fn admits(self, status: Status) -> bool {
        debug_assert!(status.is_terminal());
        match self {
            Gate::Always => true,
            Gate::Success => status == Status::Successful,
            Gate::Failure => matches!(status, Status::Failed | Status::Canceled),
            Gate::Cancel => status == Status::Canceled,
        }
    }
}

/// The invocation half of a continuation: holds a strong reference to the
/// predecessor (the predecessor never references the continuation, so no
/// cycle), waits for it to finish, and applies the gate.
///
/// The predecessor may live on a different scheduler; waiting is done by
/// polling its published status each tick, which is what makes
/// cross-scheduler chaining work.
struct ChainInvoker<T, E, F> {
    predecessor: Task<T, E>,
    gate: Gate,
    f: F,
}

impl<T, E, F, R> Invoke for ChainInvoker<T, E, F>
where
    T: Send + 'static,
    E: Send + 'static,
    F: FnOnce(&Task<T, E>) -> R + Send + 'static,
{
    type Output = R;

    fn wait(&self) -> bool {
        self.predecessor.is_in_progress()
    }

    fn can_invoke(&self) -> bool {
        self.gate.admits(self.predecessor.status())
    }

    fn invoke(self) -> R {
        (self.f)(&self.predecessor)
    }
}

impl<T, E> Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn continue_with<F, R, U, E2>(&self, scheduler: &Scheduler, gate: Gate, f: F) -> Task<U, E2>
    where
        F: FnOnce(&Task<T, E>) -> R + Send + 'static,
        R: IntoTask<U, E2>,
        U: Send + 'static,
        E2: Send + 'static,
    {
        Task::from_body(
            scheduler,
            FnBody::new(ChainInvoker {
                predecessor: self.clone_handle(),
                gate,
                f,
            }),
        )
    }

    /// Chains `f` to run once this task finishes, whatever its terminal
    /// status.
    ///
    /// The continuation is posted to `scheduler` (which may differ from this
    /// task's scheduler) and receives this task's handle once it has
    /// finished. The return value of `f` is classified per [`IntoTask`]:
    /// an immediate payload finishes the continuation at once, a nested
    /// task is adopted and mirrored.
    pub fn then<F, R, U, E2>(&self, scheduler: &Scheduler, f: F) -> Task<U, E2>
    where
        F: FnOnce(&Task<T, E>) -> R + Send + 'static,
        R: IntoTask<U, E2>,
        U: Send + 'static,
        E2: Send + 'static,
    {
        self.continue_with(scheduler, Gate::Always, f)
    }

    /// Alias for [`Task::then`].
    pub fn on_finish<F, R, U, E2>(&self, scheduler: &Scheduler, f: F) -> Task<U, E2>
    where
        F: FnOnce(&Task<T, E>) -> R + Send + 'static,
        R: IntoTask<U, E2>,
        U: Send + 'static,
        E2: Send + 'static,
    {
        self.continue_with(scheduler, Gate::Always, f)
    }

    /// Chains `f` to run only if this task finishes successfully; otherwise
    /// the continuation finishes `Canceled` and `f` is never invoked.
    pub fn on_success<F, R, U, E2>(&self, scheduler: &Scheduler, f: F) -> Task<U, E2>
    where
        F: FnOnce(&Task<T, E>) -> R + Send + 'static,
        R: IntoTask<U, E2>,
        U: Send + 'static,
        E2: Send + 'static,
    {
        self.continue_with(scheduler, Gate::Success, f)
    }

    /// Chains `f` to run only if this task fails *or* is canceled; otherwise
    /// the continuation finishes `Canceled` and `f` is never invoked.
    pub fn on_fail<F, R, U, E2>(&self, scheduler: &Scheduler, f: F) -> Task<U, E2>
    where
        F: FnOnce(&Task<T, E>) -> R + Send + 'static,
        R: IntoTask<U, E2>,
        U: Send + 'static,
        E2: Send + 'static,
    {
        self.continue_with(scheduler, Gate::Failure, f)
    }

    /// Chains `f` to run only if this task is canceled; otherwise the
    /// continuation finishes `Canceled` and `f` is never invoked.
    pub fn on_cancel<F, R, U, E2>(&self, scheduler: &Scheduler, f: F) -> Task<U, E2>
    where
        F: FnOnce(&Task<T, E>) -> R + Send + 'static,
        R: IntoTask<U, E2>,
        U: Send + 'static,
        E2: Send + 'static,
    {
        self.continue_with(scheduler, Gate::Cancel, f)
    }

    /// Chains `f` over the success value, forwarding failure past it.
    ///
    /// On a successful predecessor, `f` receives the moved-out value. On a
    /// failed or canceled predecessor, the continuation finishes in the same
    /// failed state — same error payload, same error type — without
    /// invoking `f`.
    pub fn forward_error<F, R, U>(self, f: F) -> Task<U, E>
    where
        F: FnOnce(T) -> R + Send + 'static,
        R: IntoTask<U, E>,
        U: Send + 'static,
    {
        let scheduler = self.scheduler().clone();
        self.then(&scheduler, move |predecessor| {
            if predecessor.is_successful() {
                match predecessor.consume() {
                    Outcome::Value(value) => f(value).into_step(),
                    _ => unreachable!("successful task without a value"),
                }
            } else {
                Step::Ready(predecessor.consume().map(|_| unreachable!()))
            }
        })
    }
}
