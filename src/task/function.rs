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
use core::mem;

/// What a callable's return value becomes in the task world: either an
/// immediate payload or a nested task to mirror.
pub enum Step<T, E> {
    /// The payload is already known; the task finishes with it on this tick.
    Ready(Outcome<T, E>),
    /// A nested task was produced; the enclosing task mirrors its status
    /// from now on and forwards cancel requests to it.
    Chained(Task<T, E>),
}

/// Classifies the return type of a callable handed to [`Scheduler::spawn`]
/// or one of the continuation combinators.
///
/// Implementations:
///
/// - `Outcome<T, E>` finishes the task with that payload;
/// - `Result<T, E>` is converted into an `Outcome` first;
/// - `Task<T, E>` is adopted as a nested task whose status the enclosing
///   task mirrors;
/// - `()` finishes as an empty success (`Task<(), ()>`).
///
/// Plain values are lifted explicitly with [`outcome::value`] /
/// [`outcome::error`]; coherence rules out a blanket implementation for
/// arbitrary types.
///
/// [`outcome::value`]: crate::outcome::value
/// [`outcome::error`]: crate::outcome::error
pub trait IntoTask<T, E> {
    fn into_step(self) -> Step<T, E>;
}

impl<T, E> IntoTask<T, E> for Outcome<T, E> {
    fn into_step(self) -> Step<T, E> {
        Step::Ready(self)
    }
}

impl<T, E> IntoTask<T, E> for Result<T, E> {
    fn into_step(self) -> Step<T, E> {
        Step::Ready(self.into())
    }
}

impl<T, E> IntoTask<T, E> for Task<T, E> {
    fn into_step(self) -> Step<T, E> {
        Step::Chained(self)
    }
}

impl IntoTask<(), ()> for () {
    fn into_step(self) -> Step<(), ()> {
        Step::Ready(Outcome::Value(()))
    }
}

impl<T, E> IntoTask<T, E> for Step<T, E> {
    fn into_step(self) -> Step<T, E> {
        self
    }
}

/// The invocation half of a function task.
///
/// The function body is generic over this so the immediate form
/// ([`CallInvoker`]) and the continuation form (`ChainInvoker`) share one
/// tick state machine:
///
/// - [`wait`] delays the invocation (a continuation waits for its
///   predecessor);
/// - [`can_invoke`] decides whether the callable runs at all — a `false`
///   finishes the task `Canceled` without invoking it;
/// - [`invoke`] consumes the invoker and runs the callable, exactly once.
///
/// [`wait`]: Invoke::wait
/// [`can_invoke`]: Invoke::can_invoke
/// [`invoke`]: Invoke::invoke
pub(crate) trait Invoke: Send + 'static {
    type Output;

    fn wait(&self) -> bool {
        false
    }

    fn can_invoke(&self) -> bool {
        true
    }

    fn invoke(self) -> Self::Output;
}

/// Invokes a plain callable with no gate and no predecessor.
pub(crate) struct CallInvoker<F>(pub(crate) F);

impl<F, R> Invoke for CallInvoker<F>
where
    F: FnOnce() -> R + Send + 'static,
{
    type Output = R;

    fn invoke(self) -> R {
        (self.0)()
    }
}

enum Stage<I, T, E> {
    /// The callable has not run yet.
    Ready(I),
    /// The callable returned a nested task; mirror it.
    Chained(Task<T, E>),
    /// The payload is known, waiting for the cell to take it.
    Done(Outcome<T, E>),
    Taken,
}

/// Task body around a one-shot callable: runs it (subject to the invoker's
/// gate), classifies the return value per [`IntoTask`] and either finishes
/// immediately or mirrors the returned nested task.
pub(crate) struct FnBody<I, T, E> {
    stage: Stage<I, T, E>,
}

impl<I, T, E> FnBody<I, T, E> {
    pub(crate) fn new(invoker: I) -> Self {
        Self {
            stage: Stage::Ready(invoker),
        }
    }
}

impl<I, T, E> TaskBody for FnBody<I, T, E>
where
    I: Invoke,
    I::Output: IntoTask<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    type Value = T;
    type Error = E;

    fn tick(&mut self, cx: &mut TickContext<'_>) -> Status {
        if let Stage::Chained(task) = &self.stage {
            if cx.cancel_requested() {
                task.try_cancel();
            }
            return task.status();
        }

        if cx.cancel_requested() {
            // the callable never runs; drop it together with whatever it
            // captured
            self.stage = Stage::Done(Outcome::Canceled);
            return Status::Canceled;
        }

        {
            let Stage::Ready(invoker) = &self.stage else {
                unreachable!("function task ticked after it finished")
            };
            if invoker.wait() {
                return Status::InProgress;
            }
            if !invoker.can_invoke() {
                self.stage = Stage::Done(Outcome::Canceled);
                return Status::Canceled;
            }
        }

        let Stage::Ready(invoker) = mem::replace(&mut self.stage, Stage::Taken) else {
            unreachable!()
        };
        match invoker.invoke().into_step() {
            Step::Ready(outcome) => {
                let status = outcome.status();
                self.stage = Stage::Done(outcome);
                status
            }
            Step::Chained(task) => {
                let status = task.status();
                self.stage = Stage::Chained(task);
                status
            }
        }
    }

    fn finish(&mut self) -> Outcome<T, E> {
        match mem::replace(&mut self.stage, Stage::Taken) {
            Stage::Done(outcome) => outcome,
            Stage::Chained(task) => task.consume(),
            _ => unreachable!("function task finished before its callable resolved"),
        }
    }
}

impl Scheduler {
    /// Submits a one-shot callable as a task.
    ///
    /// The callable runs at most once, on the thread that polls this
    /// scheduler; its return type decides the task type per [`IntoTask`]. A
    /// cancel request that arrives before the first tick finishes the task
    /// `Canceled` without invoking the callable.
    pub fn spawn<F, R, T, E>(&self, f: F) -> Task<T, E>
    where
        F: FnOnce() -> R + Send + 'static,
        R: IntoTask<T, E>,
        T: Send + 'static,
        E: Send + 'static,
    {
        Task::from_body(self, FnBody::new(CallInvoker(f)))
    }
}
