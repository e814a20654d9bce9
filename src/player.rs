use crate::diagram::DiagramHandle;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

// How long the player waits for the builder before re-checking its own flags.
const POLL: Duration = Duration::from_millis(20);

#[derive(Debug)]
struct PlayerState {
    interval: Duration,
    paused: bool,
    stopped: bool,
}

#[derive(Debug)]
struct Control {
    state: Mutex<PlayerState>,
    changed: Condvar,
}

impl Control {
    fn lock(&self) -> MutexGuard<'_, PlayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Advances a stepped diagram automatically, one phase per interval.
///
/// Runs on its own thread until [`Player::stop`] is called or the player is dropped.
pub struct Player {
    control: Arc<Control>,
    worker: Option<JoinHandle<usize>>,
}

impl Player {
    pub fn spawn(handle: DiagramHandle, interval: Duration) -> Self {
        let control = Arc::new(Control {
            state: Mutex::new(PlayerState {
                interval,
                paused: false,
                stopped: false,
            }),
            changed: Condvar::new(),
        });
        let worker = {
            let control = Arc::clone(&control);
            thread::spawn(move || play(&handle, &control))
        };
        info!(?interval, "player started");
        Self {
            control,
            worker: Some(worker),
        }
    }

    pub fn pause(&self) {
        self.control.lock().paused = true;
        self.control.changed.notify_all();
    }

    pub fn resume(&self) {
        self.control.lock().paused = false;
        self.control.changed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.control.lock().paused
    }

    pub fn set_interval(&self, interval: Duration) {
        self.control.lock().interval = interval;
        self.control.changed.notify_all();
    }

    /// Stops the player and returns how many steps it advanced.
    pub fn stop(mut self) -> usize {
        self.shutdown()
    }

    fn shutdown(&mut self) -> usize {
        self.control.lock().stopped = true;
        self.control.changed.notify_all();
        let steps = self
            .worker
            .take()
            .map(|worker| worker.join().unwrap_or(0))
            .unwrap_or(0);
        info!(steps, "player stopped");
        steps
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.shutdown();
        }
    }
}

fn play(handle: &DiagramHandle, control: &Control) -> usize {
    let mut steps = 0;
    loop {
        {
            let mut state = control.lock();
            while state.paused && !state.stopped {
                state = control.changed.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
            if state.stopped {
                break;
            }
        }

        if !handle.wait_for_step(POLL) {
            continue;
        }

        let mut state = control.lock();
        let deadline = Instant::now() + state.interval;
        while !state.stopped && !state.paused {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            state = control
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        if state.stopped {
            break;
        }
        if state.paused {
            continue;
        }
        drop(state);

        if handle.next_step() {
            steps += 1;
            debug!(steps, phase = %handle.phase(), "player advanced");
        }
    }
    steps
}
