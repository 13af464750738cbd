// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Cooperative task composition.
//!
//! This crate represents in-flight asynchronous work as first-class values
//! ([`Task`]s), composes them with continuations that fire on completion,
//! failure, cancellation or success, and drives their execution through an
//! explicitly polled [`Scheduler`]. Nothing makes progress unless the owner
//! of a scheduler calls [`Scheduler::poll`]; there is no background runtime,
//! no worker threads, and no implicit wakeups.
//!
//! A task finishes with an [`Outcome`]: a value, an error, or the payloadless
//! canceled state. Continuations ([`Task::then`], [`Task::on_success`],
//! [`Task::on_fail`], [`Task::on_cancel`]) observe a predecessor's terminal
//! [`Status`] and run a callable whose return value is lifted back into the
//! task world through [`IntoTask`].
//!
//! ```
//! use cotask::{Scheduler, outcome};
//!
//! let scheduler = Scheduler::new();
//! let task = scheduler.spawn(|| outcome::value(2));
//! let tripled = task.then(&scheduler, |t| outcome::value(3 * *t.get().value()));
//!
//! while scheduler.has_tasks() {
//!     scheduler.poll(0);
//! }
//! assert_eq!(*tripled.get().value(), 6);
//! ```

mod error;
pub mod outcome;
pub mod scheduler;
pub mod task;

pub use error::Panicked;
pub use outcome::Outcome;
pub use scheduler::Scheduler;
pub use task::{
    Id, IntoTask, LoopContext, OutcomeRef, Status, Step, Task, TaskBody, TickContext,
};

#[cfg(test)]
mod test_util;
