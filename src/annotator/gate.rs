use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::utils::prometheus_metrics::REQUESTS_IN_FLIGHT;

/// Counting gate bounding the number of requests in flight.
///
/// Cloning is cheap and every clone shares the same slots, so one gate built
/// per client bounds concurrency across all batches of a run.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

#[derive(Debug)]
struct GateInner {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl AdmissionGate {
    /// A gate with zero capacity could never admit anything, so it is rejected.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PipelineError::ConfigValidationError(
                "AdmissionGate: max_concurrent_requests must be greater than 0".to_string(),
            ));
        }
        if capacity > Semaphore::MAX_PERMITS {
            return Err(PipelineError::ConfigValidationError(format!(
                "AdmissionGate: max_concurrent_requests must not exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(AdmissionGate {
            inner: Arc::new(GateInner {
                semaphore: Arc::new(Semaphore::new(capacity)),
                capacity,
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }),
        })
    }

    /// Waits for a free slot. The slot is returned when the permit drops,
    /// whatever the outcome of the work done while holding it.
    pub async fn acquire(&self) -> Result<GatePermit> {
        let permit = Arc::clone(&self.inner.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| {
                PipelineError::GateClosed("no further requests can be admitted".to_string())
            })?;

        let held = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_in_flight.fetch_max(held, Ordering::SeqCst);
        REQUESTS_IN_FLIGHT.inc();

        Ok(GatePermit {
            inner: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of slots ever held at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Refuses all pending and future acquisitions. Held slots stay valid.
    pub fn close(&self) {
        warn!(capacity = self.inner.capacity, "Closing admission gate");
        self.inner.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.semaphore.is_closed()
    }
}

/// One held admission slot.
#[derive(Debug)]
pub struct GatePermit {
    inner: Arc<GateInner>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        // Runs before `_permit` is released, so `in_flight` never overshoots.
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        REQUESTS_IN_FLIGHT.dec();
    }
}
