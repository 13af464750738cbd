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

/// Body around an already-produced payload: the task starts in the terminal
/// state the payload implies and is never ticked or enqueued.
pub(crate) struct NoopBody<T, E> {
    outcome: Option<Outcome<T, E>>,
}

impl<T, E> NoopBody<T, E> {
    pub(crate) fn new(outcome: Outcome<T, E>) -> Self {
        Self {
            outcome: Some(outcome),
        }
    }
}

impl<T, E> TaskBody for NoopBody<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Value = T;
    type Error = E;

    fn initial_status(&self) -> Status {
        self.outcome
            .as_ref()
            .expect("inline task settled twice")
            .status()
    }

    fn tick(&mut self, _cx: &mut TickContext<'_>) -> Status {
        unreachable!("inline tasks start finished and are never ticked")
    }

    fn finish(&mut self) -> Outcome<T, E> {
        self.outcome.take().expect("inline task settled twice")
    }
}

impl Scheduler {
    /// Lifts an already-produced payload into the task world.
    ///
    /// The returned task is finished from the start — `Successful`, `Failed`
    /// or `Canceled` according to the payload — and is never enqueued.
    pub fn ready<T, E>(&self, outcome: Outcome<T, E>) -> Task<T, E>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        Task::from_body(self, NoopBody::new(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome;

    #[test]
    fn value_starts_successful() {
        let scheduler = Scheduler::new();
        let task = scheduler.ready(outcome::value(5));
        assert!(task.is_successful());
        assert_eq!(*task.get().value(), 5);
        assert!(!scheduler.has_tasks());
    }

    #[test]
    fn error_starts_failed() {
        let scheduler = Scheduler::new();
        let task = scheduler.ready(outcome::error(String::from("bad")));
        assert!(task.is_failed());
        assert!(!task.is_canceled());
        assert_eq!(*task.get().error(), "bad");
    }

    #[test]
    fn canceled_payload_starts_canceled() {
        let scheduler = Scheduler::new();
        let task = scheduler.ready(Outcome::<i32, ()>::Canceled);
        assert!(task.is_canceled());
        assert!(!task.get().has_value());
    }

    #[test]
    fn chaining_off_an_inline_task_works() {
        let scheduler = Scheduler::new();
        let task = scheduler.ready(outcome::value(20));
        let chained = task.then(&scheduler, |t| outcome::value(*t.get().value() + 2));
        scheduler.poll(0);
        assert_eq!(*chained.get().value(), 22);
    }
}
