use crate::bridge::{Job, StopSignal};
use crate::xfl_api::XflApi;
use crossbeam_channel::{select, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Instant;

enum Next {
    Run(Job),
    Idle,
    Stop,
}

/// Owner side of the bridge queue.
///
/// Hosts that run their own event loop call [`OwnerLoop::tick`] from it;
/// the headless binary hands the thread over with [`OwnerLoop::run`].
pub struct OwnerLoop {
    jobs: Receiver<Job>,
    signal: Arc<StopSignal>,
}

impl OwnerLoop {
    pub(crate) fn new(jobs: Receiver<Job>, signal: Arc<StopSignal>) -> Self {
        Self { jobs, signal }
    }

    /// Runs every queued operation without blocking. Returns how many ran.
    pub fn tick(&mut self, api: &mut dyn XflApi) -> usize {
        let mut ran = 0;
        loop {
            if self.signal.is_set() {
                self.drain();
                break;
            }
            match self.jobs.try_recv() {
                Ok(job) => {
                    job(api);
                    ran += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        ran
    }

    /// Serves operations until the bridge is stopped or every bridge handle
    /// is gone.
    pub fn run(&mut self, api: &mut dyn XflApi) {
        self.run_until(api, None);
    }

    /// Like [`OwnerLoop::run`] but also returns once `deadline` passes.
    pub fn run_until(&mut self, api: &mut dyn XflApi, deadline: Option<Instant>) {
        tracing::debug!("owner loop running");
        while !self.signal.is_set() {
            let next = match deadline {
                Some(deadline) => {
                    let Some(left) = deadline.checked_duration_since(Instant::now()) else {
                        break;
                    };
                    select! {
                        recv(self.jobs) -> job => job.map_or(Next::Stop, Next::Run),
                        recv(self.signal.stop_rx) -> _ => Next::Stop,
                        default(left) => Next::Idle,
                    }
                }
                None => select! {
                    recv(self.jobs) -> job => job.map_or(Next::Stop, Next::Run),
                    recv(self.signal.stop_rx) -> _ => Next::Stop,
                },
            };
            match next {
                Next::Run(job) => job(api),
                Next::Idle => {}
                Next::Stop => break,
            }
        }
        let dropped = self.drain();
        tracing::debug!(dropped, "owner loop finished");
    }

    /// Discards queued operations. Each dropped job releases its caller
    /// with `server_stopping`.
    fn drain(&self) -> usize {
        let mut dropped = 0;
        while let Ok(job) = self.jobs.try_recv() {
            drop(job);
            dropped += 1;
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use crate::bridge::Bridge;
    use crate::error::CallError;
    use crate::memory::MemoryXfl;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn tick_runs_what_is_queued() {
        let (bridge, mut owner) = Bridge::channel(8);
        let mut xfl = MemoryXfl::new();
        assert_eq!(owner.tick(&mut xfl), 0);

        let caller = {
            let bridge = bridge.clone();
            thread::spawn(move || bridge.invoke(|api| Ok(api.foil_names().len())))
        };

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut ran = 0;
        while ran == 0 {
            ran = owner.tick(&mut xfl);
            assert!(Instant::now() < deadline, "operation never arrived");
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(caller.join().unwrap(), Ok(0));
    }

    #[test]
    fn tick_after_stop_discards_queued_work() {
        let (bridge, mut owner) = Bridge::channel(8);
        let mut xfl = MemoryXfl::new();

        let caller = {
            let bridge = bridge.clone();
            thread::spawn(move || {
                bridge.invoke(|api| {
                    api.close();
                    Ok(())
                })
            })
        };
        thread::sleep(Duration::from_millis(50));
        bridge.stop();

        assert_eq!(owner.tick(&mut xfl), 0);
        assert_eq!(caller.join().unwrap(), Err(CallError::ServerStopping));
        assert!(!xfl.is_closed());
    }

    #[test]
    fn run_until_returns_at_the_deadline() {
        let (_bridge, mut owner) = Bridge::channel(8);
        let mut xfl = MemoryXfl::new();
        let started = Instant::now();
        owner.run_until(&mut xfl, Some(started + Duration::from_millis(50)));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
