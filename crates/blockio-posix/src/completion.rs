//! Tracks in-flight asynchronous operations for `wait`.

use blockio_device::TransferError;
use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct State {
    in_flight: usize,
    completed: usize,
    failures: Vec<TransferError>,
}

/// Counts operations between submission and completion.
///
/// `begin` is called once per operation at submission; `finish` once when
/// its last job ends. `drain` blocks until nothing is in flight.
#[derive(Debug, Default)]
pub(crate) struct Completion {
    state: Mutex<State>,
    idle: Condvar,
}

impl Completion {
    pub(crate) fn begin(&self) {
        self.state.lock().in_flight += 1;
    }

    pub(crate) fn finish(&self, result: Result<(), TransferError>) {
        let mut state = self.state.lock();
        debug_assert!(state.in_flight > 0, "finish without begin");
        state.in_flight -= 1;
        state.completed += 1;
        if let Err(e) = result {
            state.failures.push(e);
        }
        if state.in_flight == 0 {
            self.idle.notify_all();
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Blocks until no operation is in flight, without consuming results.
    pub(crate) fn wait_idle(&self) {
        let mut state = self.state.lock();
        while state.in_flight > 0 {
            self.idle.wait(&mut state);
        }
    }

    /// Blocks until idle, then returns the completions since the last drain.
    ///
    /// If any operation failed, the first failure is returned and the rest
    /// are logged and discarded.
    pub(crate) fn drain(&self) -> Result<usize, TransferError> {
        let mut state = self.state.lock();
        while state.in_flight > 0 {
            self.idle.wait(&mut state);
        }
        let completed = std::mem::take(&mut state.completed);
        let mut failures = std::mem::take(&mut state.failures).into_iter();
        match failures.next() {
            Some(first) => {
                for other in failures {
                    tracing::warn!(error = %other, "additional asynchronous failure discarded");
                }
                Err(first)
            }
            None => Ok(completed),
        }
    }
}
