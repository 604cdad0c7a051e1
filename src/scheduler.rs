//! Fixed-period driver on a dedicated thread.
//!
//! [`Scheduler::start`] runs a closure every `period` until [`Scheduler::stop`],
//! which signals the thread and joins it. A tick already running is allowed to
//! finish; no tick starts after `stop` returns.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, error};

pub struct Scheduler {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the driver thread. `name` labels the thread for logs and panics.
    pub fn start<F>(name: impl Into<String>, period: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let name = name.into();
        let handle = std::thread::Builder::new().name(name.clone()).spawn(move || {
            debug!("scheduler started name={} period_ms={}", name, period.as_millis());
            let mut deadline = Instant::now() + period;
            loop {
                let wait = deadline.saturating_duration_since(Instant::now());
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {
                        tick();
                        deadline += period;
                        // after a long pause, skip missed ticks instead of bursting
                        let now = Instant::now();
                        if deadline < now {
                            deadline = now + period;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("scheduler stopped name={}", name);
        })?;
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop the driver and wait for the thread to exit. Calling again is a no-op.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("scheduler thread panicked");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
