// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;
use std::any::Any;

/// The error payload of a blocking-future task whose producer panicked.
///
/// The future adapter (see [`Scheduler::spawn_future`]) is the one task body
/// that bridges a mechanism which may abort abnormally. A panic raised while
/// polling the adopted future is caught and stored here; the task finishes
/// [`Failed`] instead of unwinding through [`Scheduler::poll`].
///
/// [`Scheduler::spawn_future`]: crate::Scheduler::spawn_future
/// [`Scheduler::poll`]: crate::Scheduler::poll
/// [`Failed`]: crate::Status::Failed
pub struct Panicked(Box<dyn Any + Send + 'static>);

impl Panicked {
    pub(crate) fn new(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self(payload)
    }

    /// Best-effort extraction of the panic message.
    ///
    /// Returns `None` when the panic payload is neither a `&str` nor a
    /// `String` (e.g. `panic_any` with a custom type).
    pub fn message(&self) -> Option<&str> {
        if let Some(msg) = self.0.downcast_ref::<&'static str>() {
            Some(msg)
        } else {
            self.0.downcast_ref::<String>().map(String::as_str)
        }
    }

    /// Consumes the error, returning the raw panic payload.
    pub fn into_payload(self) -> Box<dyn Any + Send + 'static> {
        self.0
    }
}

impl fmt::Debug for Panicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Panicked")
            .field(&self.message().unwrap_or("..."))
            .finish()
    }
}

impl fmt::Display for Panicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) => write!(f, "task panicked: {msg}"),
            None => f.write_str("task panicked"),
        }
    }
}

impl core::error::Error for Panicked {}
