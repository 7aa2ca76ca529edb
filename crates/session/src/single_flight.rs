use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// At most one submission in flight
///
/// [`SingleFlight::try_acquire`] hands out a permit; the slot frees itself
/// when the permit is dropped, on every return path.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    busy: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct FlightPermit {
    busy: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<FlightPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightPermit { busy: Arc::clone(&self.busy) })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
