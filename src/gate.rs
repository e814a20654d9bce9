use crate::error::GateError;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct GateState {
    holding: bool,
    released: bool,
    interrupted: bool,
    bypass: bool,
}

/// Single-slot rendezvous between the diagram builder and whoever drives it.
///
/// The builder calls [`StepGate::hold`] after publishing a phase and stays blocked until a
/// controller calls [`StepGate::next`]. Only one thread may hold at a time. While bypassed,
/// `hold` returns immediately.
#[derive(Debug, Default)]
pub struct StepGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl StepGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until released by [`StepGate::next`] or aborted by [`StepGate::interrupt`].
    pub fn hold(&self) -> Result<(), GateError> {
        let mut state = self.lock();
        if state.bypass {
            return Ok(());
        }
        if state.interrupted {
            return Err(GateError::Interrupted);
        }
        if state.holding {
            return Err(GateError::Busy);
        }
        state.holding = true;
        state.released = false;
        self.changed.notify_all();

        while !state.released && !state.interrupted && !state.bypass {
            state = self.changed.wait(state).unwrap_or_else(PoisonError::into_inner);
        }

        state.holding = false;
        let released = state.released || state.bypass;
        state.released = false;
        self.changed.notify_all();
        if released {
            Ok(())
        } else {
            Err(GateError::Interrupted)
        }
    }

    /// Releases the current holder. Returns `false` when nobody was waiting.
    pub fn next(&self) -> bool {
        let mut state = self.lock();
        if !state.holding || state.released {
            return false;
        }
        state.released = true;
        self.changed.notify_all();
        true
    }

    /// Turns the bypass on or off. Turning it on releases the current holder.
    pub fn set_bypass(&self, bypass: bool) {
        let mut state = self.lock();
        state.bypass = bypass;
        if bypass {
            self.changed.notify_all();
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.lock().bypass
    }

    pub fn is_holding(&self) -> bool {
        let state = self.lock();
        state.holding && !state.released
    }

    /// Waits until a thread is blocked in `hold`. Returns `false` on timeout.
    pub fn wait_for_holder(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while !(state.holding && !state.released) {
            if state.interrupted {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    /// Aborts the current and every later `hold` until [`StepGate::resume`].
    pub fn interrupt(&self) {
        let mut state = self.lock();
        state.interrupted = true;
        self.changed.notify_all();
    }

    pub fn resume(&self) {
        self.lock().interrupted = false;
    }

    pub fn is_interrupted(&self) -> bool {
        self.lock().interrupted
    }
}
