// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::outcome::Outcome;
use crate::scheduler::Scheduler;
use crate::task::Status;

/// Per-tick context handed to a task body.
///
/// Conveys the scheduler that owns the ticking task (so a body can submit
/// new tasks from within a tick) and whether cancellation has been requested
/// since the previous tick.
pub struct TickContext<'a> {
    scheduler: &'a Scheduler,
    cancel_requested: bool,
}

impl<'a> TickContext<'a> {
    pub(crate) fn new(scheduler: &'a Scheduler, cancel_requested: bool) -> Self {
        Self {
            scheduler,
            cancel_requested,
        }
    }

    /// The scheduler that owns the ticking task.
    pub fn scheduler(&self) -> &'a Scheduler {
        self.scheduler
    }

    /// `true` if [`Task::try_cancel`] was called since the previous tick.
    ///
    /// The flag is sticky for the duration of this tick only. A body may
    /// honor it synchronously (return [`Status::Canceled`]), forward it to
    /// sub-work and keep running, or ignore it entirely; a `Canceled`
    /// outcome is then not guaranteed.
    ///
    /// [`Task::try_cancel`]: crate::Task::try_cancel
    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }
}

/// A single unit of work, driven by [`Scheduler::poll`].
///
/// The built-in adapters (inline value, function task, future adapter, loop,
/// in-place step) are all implementations of this trait; user code can
/// register its own through [`Task::from_body`].
///
/// # Contract
///
/// - [`tick`] is called on the thread executing [`Scheduler::poll`], once per
///   poll scan, while the task is in progress. Returning
///   [`Status::InProgress`] requests another tick; any other value is
///   terminal and `tick` is never called again.
/// - [`finish`] is called exactly once, immediately after `tick` (or
///   [`initial_status`]) reports a terminal status, and moves the completion
///   payload out of the body. A `Successful` status requires the payload to
///   hold a value; `Failed` and `Canceled` require it not to.
/// - A body suspends by returning `InProgress`; there is no blocking
///   primitive. Long-running ticks starve every other task on the same
///   scheduler.
///
/// [`tick`]: TaskBody::tick
/// [`finish`]: TaskBody::finish
/// [`initial_status`]: TaskBody::initial_status
/// [`Scheduler::poll`]: crate::Scheduler::poll
/// [`Task::from_body`]: crate::Task::from_body
pub trait TaskBody: Send + 'static {
    type Value: Send + 'static;
    type Error: Send + 'static;

    /// The status the task starts in.
    ///
    /// Bodies constructed around an already-produced payload return a
    /// terminal status here; the task then starts finished and [`tick`] is
    /// never called.
    ///
    /// [`tick`]: TaskBody::tick
    fn initial_status(&self) -> Status {
        Status::InProgress
    }

    /// Advances the work by one step.
    fn tick(&mut self, cx: &mut TickContext<'_>) -> Status;

    /// Moves the completion payload out of the body.
    fn finish(&mut self) -> Outcome<Self::Value, Self::Error>;
}
