// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::task::Status;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

const IN_PROGRESS: u8 = 0;
const SUCCESSFUL: u8 = 1;
const FAILED: u8 = 2;
const CANCELED: u8 = 3;

/// The shared, atomically accessed portion of a task's state: the monotone
/// status word plus the one-shot cancel-request flag.
///
/// The status transitions exactly once, from [`Status::InProgress`] to one of
/// the three terminal states. The store uses `Release` and every load uses
/// `Acquire`: the completion payload is written into the cell *before* the
/// terminal status is published, so a reader on another thread that observes
/// a terminal status also observes the fully constructed payload.
pub(crate) struct State {
    status: AtomicU8,
    cancel: AtomicBool,
}

impl State {
    pub(crate) fn new() -> Self {
        Self {
            status: AtomicU8::new(IN_PROGRESS),
            cancel: AtomicBool::new(false),
        }
    }

    pub(crate) fn load(&self) -> Status {
        decode(self.status.load(Ordering::Acquire))
    }

    /// Publishes the terminal status.
    ///
    /// Must be called at most once, after the completion payload has been
    /// stored.
    pub(crate) fn finish(&self, status: Status) {
        debug_assert!(status.is_terminal());
        debug_assert_eq!(self.status.load(Ordering::Relaxed), IN_PROGRESS);
        self.status.store(encode(status), Ordering::Release);
    }

    /// Sets the cancel-request flag. Idempotent, safe from any thread.
    pub(crate) fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Consumes a pending cancel request, if any.
    ///
    /// Called once at the start of every tick; the flag is sticky for the
    /// duration of exactly one tick. A request arriving *during* the tick is
    /// observed by the next one.
    pub(crate) fn take_cancel(&self) -> bool {
        self.cancel.swap(false, Ordering::AcqRel)
    }
}

fn encode(status: Status) -> u8 {
    match status {
        Status::InProgress => IN_PROGRESS,
        Status::Successful => SUCCESSFUL,
        Status::Failed => FAILED,
        Status::Canceled => CANCELED,
    }
}

fn decode(bits: u8) -> Status {
    match bits {
        IN_PROGRESS => Status::InProgress,
        SUCCESSFUL => Status::Successful,
        FAILED => Status::Failed,
        CANCELED => Status::Canceled,
        _ => unreachable!("invalid status bits {bits:#b}"),
    }
}
