// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::error::Panicked;
use crate::outcome::Outcome;
use crate::scheduler::Scheduler;
use crate::task::body::{TaskBody, TickContext};
use crate::task::{Status, Task};
use core::pin::Pin;
use core::task::{Context, Poll, Waker};
use std::panic::{self, AssertUnwindSafe};

/// Body around an externally driven [`Future`], typically the receiving end
/// of work handed to a worker thread.
///
/// Each tick performs one zero-timeout poll with a no-op waker; there is no
/// wakeup plumbing, the enclosing scheduler's polling cadence *is* the
/// retry loop.
pub(crate) struct FutureBody<F: Future> {
    future: Pin<Box<F>>,
    outcome: Option<Outcome<F::Output, Panicked>>,
}

impl<F: Future> FutureBody<F> {
    pub(crate) fn new(future: F) -> Self {
        Self {
            future: Box::pin(future),
            outcome: None,
        }
    }
}

impl<F> TaskBody for FutureBody<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    type Value = F::Output;
    type Error = Panicked;

    fn tick(&mut self, _cx: &mut TickContext<'_>) -> Status {
        // A cancel request is deliberately not forwarded: the producer
        // behind the future cannot be stopped from here, so the task keeps
        // waiting for it.
        let mut cx = Context::from_waker(Waker::noop());
        let poll = panic::catch_unwind(AssertUnwindSafe(|| self.future.as_mut().poll(&mut cx)));
        match poll {
            Ok(Poll::Pending) => Status::InProgress,
            Ok(Poll::Ready(value)) => {
                self.outcome = Some(Outcome::Value(value));
                Status::Successful
            }
            Err(payload) => {
                self.outcome = Some(Outcome::Error(Panicked::new(payload)));
                Status::Failed
            }
        }
    }

    fn finish(&mut self) -> Outcome<F::Output, Panicked> {
        self.outcome.take().expect("future finished twice")
    }
}

impl Scheduler {
    /// Adopts an externally driven future as a task.
    ///
    /// The future is polled once per tick with a no-op waker. A pending poll
    /// keeps the task in progress, a ready poll finishes it `Successful`,
    /// and a panic raised by the future is caught and stored as a
    /// [`Panicked`] error. Cancel requests are not propagated to the
    /// future; the task still waits for the underlying producer.
    pub fn spawn_future<F>(&self, future: F) -> Task<F::Output, Panicked>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        Task::from_body(self, FutureBody::new(future))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome;
    use futures::channel::oneshot;
    use std::thread;

    #[test]
    fn pending_future_keeps_the_task_in_progress() {
        let scheduler = Scheduler::new();
        let (sender, receiver) = oneshot::channel::<i32>();
        let task = scheduler.spawn_future(async move { receiver.await.unwrap() });

        assert_eq!(scheduler.poll(0), 0);
        assert_eq!(scheduler.poll(0), 0);
        assert!(task.is_in_progress());

        sender.send(2).unwrap();
        assert_eq!(scheduler.poll(0), 1);
        assert!(task.is_successful());
        assert_eq!(*task.get().value(), 2);
    }

    #[test]
    fn thread_produced_value_flows_into_a_continuation() {
        let _trace = crate::test_util::trace_init();

        let scheduler = Scheduler::new();
        let (sender, receiver) = oneshot::channel::<i32>();

        let producer = thread::spawn(move || {
            sender.send(2).unwrap();
        });

        let task = scheduler.spawn_future(async move { receiver.await.unwrap() });
        let tripled = task.then(&scheduler, |t| outcome::value(3 * *t.get().value()));

        while tripled.is_in_progress() {
            scheduler.poll(0);
            thread::yield_now();
        }
        producer.join().unwrap();

        assert!(tripled.is_successful());
        assert_eq!(*tripled.get().value(), 6);
    }

    #[test]
    fn panicking_future_fails_with_the_panic_payload() {
        let scheduler = Scheduler::new();
        let task = scheduler.spawn_future(async { panic!("producer blew up") });

        scheduler.poll(0);

        assert!(task.is_failed());
        assert!(!task.is_canceled());
        assert_eq!(task.get().error().message(), Some("producer blew up"));
    }

    #[test]
    fn cancel_request_does_not_stop_the_producer() {
        let scheduler = Scheduler::new();
        let (sender, receiver) = oneshot::channel::<i32>();
        let task = scheduler.spawn_future(async move { receiver.await.unwrap() });

        task.try_cancel();
        scheduler.poll(0);
        // the adapter ignores the request and keeps waiting
        assert!(task.is_in_progress());

        sender.send(9).unwrap();
        scheduler.poll(0);
        assert!(task.is_successful());
        assert_eq!(*task.get().value(), 9);
    }
}
