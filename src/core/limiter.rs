//! Admission limiter
//!
//! Bounds how many commands run against the ledger at the same time,
//! independent of how many clients are connected.
//!
//! # Design
//!
//! The limiter wraps a `tokio::sync::Semaphore`. Waiters are served in FIFO
//! order, so every waiter eventually gets a permit under bounded load.
//!
//! A permit is an RAII guard: it is released exactly once, when dropped,
//! whichever way the guarded command ends (success, business error, timeout,
//! panic, or the session going away).

use crate::types::AdmissionError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of commands allowed in flight
pub const DEFAULT_CAPACITY: usize = 5;

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Counting permit pool of fixed capacity
///
/// Cheap to clone; clones share the same pool.
#[derive(Debug, Clone)]
pub struct AdmissionLimiter {
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    capacity: usize,
}

/// Permit held while a command is in flight
///
/// Dropping it returns the slot to the pool.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

impl AdmissionLimiter {
    /// Create a limiter with `capacity` permits
    ///
    /// A capacity of zero would block every command forever and is replaced
    /// by [`DEFAULT_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };

        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            counters: Arc::new(Counters::default()),
            capacity,
        }
    }

    /// Wait for a free permit
    ///
    /// # Errors
    ///
    /// `AdmissionError::Closed` once [`close`](Self::close) has been called.
    pub async fn acquire(&self) -> Result<AdmissionPermit, AdmissionError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| AdmissionError::Closed)?;

        let in_flight = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(in_flight, Ordering::SeqCst);

        Ok(AdmissionPermit {
            _permit: permit,
            counters: Arc::clone(&self.counters),
        })
    }

    /// Stop handing out permits; pending and future `acquire` calls fail
    ///
    /// Permits already held stay valid until dropped.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Commands currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits ever held at the same time
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }
}

impl Default for AdmissionLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        // Runs before the semaphore permit field is dropped, so in_flight
        // never exceeds the capacity.
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
