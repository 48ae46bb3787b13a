//! Admission permits bounding a pool's in-flight work.
//!
//! The gate is a counting semaphore separate from queue capacity: permits
//! cap how many tasks are *in flight* for a pool while the queue caps how
//! many are *pending*. Acquisition is time-bounded and fairness is not
//! promised.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Counting admission permits with time-bounded acquisition.
#[derive(Debug)]
pub struct AdmissionGate {
    permits: Mutex<usize>,
    available: Condvar,
}

impl AdmissionGate {
    /// Create a gate with `max_concurrent` permits. Values below 1 are
    /// raised to 1.
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Mutex::new(max_concurrent.max(1)),
            available: Condvar::new(),
        }
    }

    /// Take one permit, waiting up to `wait` for one to free up.
    ///
    /// Returns `None` when the budget lapses with every permit still held.
    /// The returned [`Permit`] releases on drop, on every exit path. A
    /// `wait` too large to resolve to a deadline degrades to an untimed
    /// wait.
    #[must_use]
    pub fn try_acquire(&self, wait: Duration) -> Option<Permit<'_>> {
        let deadline = Instant::now().checked_add(wait);
        let mut permits = self.permits.lock();
        loop {
            if *permits > 0 {
                *permits -= 1;
                return Some(Permit { gate: self });
            }
            match deadline {
                Some(deadline) => {
                    if self.available.wait_until(&mut permits, deadline).timed_out() {
                        if *permits > 0 {
                            *permits -= 1;
                            return Some(Permit { gate: self });
                        }
                        return None;
                    }
                }
                None => self.available.wait(&mut permits),
            }
        }
    }

    /// Permits currently free. Diagnostic only; the value is stale the
    /// moment it is read.
    #[must_use]
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }

    fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        drop(permits);
        self.available.notify_one();
    }
}

/// One unit of admitted concurrency. Dropping it returns the permit.
pub struct Permit<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
