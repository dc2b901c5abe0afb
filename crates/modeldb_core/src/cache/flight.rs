//! Single-flight construction tickets.

use parking_lot::{Condvar, Mutex};
use std::thread::{self, ThreadId};

/// Marks one entity as under construction by one thread.
///
/// Other threads looking up the same entity block in [`Flight::wait`]
/// until the owner calls [`Flight::finish`], whether it succeeded or not.
#[derive(Debug)]
pub(crate) struct Flight {
    owner: ThreadId,
    done: Mutex<bool>,
    cond: Condvar,
}

impl Flight {
    /// Creates a flight owned by the calling thread.
    pub(crate) fn new() -> Self {
        Self {
            owner: thread::current().id(),
            done: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn owner(&self) -> ThreadId {
        self.owner
    }

    pub(crate) fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.cond.wait(&mut done);
        }
    }

    pub(crate) fn finish(&self) {
        *self.done.lock() = true;
        self.cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn waiters_wake_on_finish() {
        let flight = Arc::new(Flight::new());
        assert_eq!(flight.owner(), thread::current().id());

        let waiter = {
            let flight = Arc::clone(&flight);
            thread::spawn(move || flight.wait())
        };
        flight.finish();
        waiter.join().unwrap();

        // A finished flight no longer blocks.
        flight.wait();
    }
}
