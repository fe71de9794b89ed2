//! Synchronous calls from transport threads into the owner thread.
//!
//! A [`Bridge`] hands boxed operations to the owner's FIFO queue and blocks
//! the calling thread until the owner has run the operation, or until the
//! bridge is stopped. The owner side of the queue is
//! [`OwnerLoop`](crate::main_loop::OwnerLoop).

use crate::error::CallError;
use crate::main_loop::OwnerLoop;
use crate::xfl_api::XflApi;
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Work item run exactly once on the owner thread.
pub(crate) type Job = Box<dyn FnOnce(&mut dyn XflApi) + Send>;

/// Stop state shared by every bridge clone and the owner loop.
///
/// `stop_rx` never receives a message; it disconnects when `stop_tx` is
/// dropped, which wakes every `select!` waiting on it.
pub(crate) struct StopSignal {
    stopping: AtomicBool,
    stop_tx: Mutex<Option<Sender<()>>>,
    pub(crate) stop_rx: Receiver<()>,
}

impl StopSignal {
    fn new() -> Self {
        let (stop_tx, stop_rx) = bounded(0);
        Self {
            stopping: AtomicBool::new(false),
            stop_tx: Mutex::new(Some(stop_tx)),
            stop_rx,
        }
    }

    pub(crate) fn is_set(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Returns `false` if the signal was already set.
    fn set(&self) -> bool {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Ok(mut tx) = self.stop_tx.lock() {
            tx.take();
        }
        true
    }
}

#[derive(Clone)]
pub struct Bridge {
    jobs: Sender<Job>,
    signal: Arc<StopSignal>,
}

impl Bridge {
    /// Creates a bridge and the owner loop that serves it. At most
    /// `capacity` operations wait in the queue; further callers block
    /// until there is room.
    pub fn channel(capacity: usize) -> (Bridge, OwnerLoop) {
        let (jobs_tx, jobs_rx) = bounded(capacity);
        let signal = Arc::new(StopSignal::new());
        let bridge = Bridge {
            jobs: jobs_tx,
            signal: Arc::clone(&signal),
        };
        (bridge, OwnerLoop::new(jobs_rx, signal))
    }

    /// Runs `op` on the owner thread and waits for its result.
    ///
    /// Errors and panics inside `op` come back as the call's error. Once the
    /// bridge is stopped every waiting and future caller gets
    /// [`CallError::ServerStopping`].
    pub fn invoke<T, F>(&self, op: F) -> Result<T, CallError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn XflApi) -> Result<T, CallError> + Send + 'static,
    {
        if self.signal.is_set() {
            return Err(CallError::ServerStopping);
        }

        let (reply_tx, reply_rx) = bounded::<Result<T, CallError>>(1);
        let job: Job = Box::new(move |api: &mut dyn XflApi| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| op(api)))
                .unwrap_or_else(|payload| Err(CallError::Internal(panic_message(payload.as_ref()))));
            let _ = reply_tx.send(outcome);
        });

        select! {
            send(self.jobs, job) -> sent => {
                if sent.is_err() {
                    return Err(CallError::ServerStopping);
                }
            }
            recv(self.signal.stop_rx) -> _ => return Err(CallError::ServerStopping),
        }

        select! {
            // A dropped reply sender means the owner discarded the job.
            recv(reply_rx) -> reply => reply.unwrap_or(Err(CallError::ServerStopping)),
            recv(self.signal.stop_rx) -> _ => Err(CallError::ServerStopping),
        }
    }

    /// Releases every blocked caller and refuses new work. Returns `false`
    /// when the bridge was already stopped.
    pub fn stop(&self) -> bool {
        let first = self.signal.set();
        if first {
            tracing::debug!("bridge stopped");
        }
        first
    }

    pub fn is_stopping(&self) -> bool {
        self.signal.is_set()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "operation panicked".to_string()
    }
}
