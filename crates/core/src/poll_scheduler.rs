//! Background loop that polls each sensor at its own interval

use crate::constants::POLL_THREAD_NAME;
use crate::error::{MonitorError, Result};
use crate::policy_table::RefreshPolicyTable;
use crate::reading_store::ReadingStore;
use crate::sensor_source::{BoxedSensorSource, SourceError};
use helm_sens_types::SensorId;
use log::{debug, error, info, trace, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

/// Tracks attempt timing for one sensor
struct SensorSlot {
    sensor: SensorId,
    interval: Duration,
    /// Last read attempt, successful or not. `None` means due immediately.
    last_attempt: Option<Instant>,
    /// Whether the last attempt failed, so repeated failures log once
    failing: bool,
}

impl SensorSlot {
    fn is_due(&self, now: Instant) -> bool {
        match self.last_attempt {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }
}

/// State owned by the polling thread while it runs
struct PollLoop {
    slots: Vec<SensorSlot>,
    store: Arc<ReadingStore>,
    source: BoxedSensorSource,
    tick: Duration,
}

impl PollLoop {
    fn new(policies: &RefreshPolicyTable, store: Arc<ReadingStore>, source: BoxedSensorSource) -> Self {
        let slots = policies
            .iter()
            .map(|(sensor, policy)| SensorSlot {
                sensor: sensor.to_string(),
                interval: policy.interval,
                last_attempt: None,
                failing: false,
            })
            .collect();

        Self {
            slots,
            store,
            source,
            tick: policies.tick(),
        }
    }

    /// Poll due sensors once per tick until shutdown is signalled
    /// (or the sender is dropped).
    async fn run(&mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                deadline = ticker.tick() => {
                    // Due checks run on the ideal tick schedule; wake-up
                    // jitter must not push an interval-equal sensor to the
                    // following tick
                    let start = Instant::now();
                    let polled = self.poll_due(deadline.into_std());
                    trace!("Poll cycle read {} sensor(s) in {:?}", polled, start.elapsed());
                }
            }
        }
    }

    /// Read every sensor whose interval has elapsed since its last attempt.
    ///
    /// Returns the number of sensors attempted.
    fn poll_due(&mut self, now: Instant) -> usize {
        let mut attempted = 0;

        for slot in &mut self.slots {
            if !slot.is_due(now) {
                continue;
            }
            // Recorded before the read so a failing sensor keeps its interval
            slot.last_attempt = Some(now);
            attempted += 1;

            let result = match read_guarded(&mut self.source, &slot.sensor) {
                Ok(Ok(value)) if value.is_finite() => Ok(value),
                Ok(Ok(value)) => Err(SourceError::unavailable(
                    &slot.sensor,
                    format!("non-finite value {}", value),
                )),
                Ok(Err(e)) => Err(e),
                Err(message) => {
                    if !slot.failing {
                        error!(
                            "Sensor source {} panicked reading {}: {}",
                            self.source.name(),
                            slot.sensor,
                            message
                        );
                    }
                    Err(SourceError::unavailable(&slot.sensor, "source panicked"))
                }
            };
            match result {
                Ok(value) => {
                    debug!("Read {} = {}", slot.sensor, value);
                    if let Err(e) = self.store.put(&slot.sensor, value, Instant::now()) {
                        error!("Failed to store reading for {}: {}", slot.sensor, e);
                    }
                    if slot.failing {
                        info!("Sensor {} recovered", slot.sensor);
                        slot.failing = false;
                    }
                }
                Err(e) if slot.failing => {
                    debug!("Sensor {} still unavailable: {}", slot.sensor, e);
                }
                Err(e) => {
                    warn!(
                        "Sensor {} read failed via {}, keeping last known value: {}",
                        slot.sensor,
                        self.source.name(),
                        e
                    );
                    slot.failing = true;
                }
            }
        }

        attempted
    }

    fn into_source(self) -> BoxedSensorSource {
        self.source
    }
}

/// Read one sensor, turning a panic inside the source into `Err(message)`
/// so the remaining sensors keep being polled.
fn read_guarded(
    source: &mut BoxedSensorSource,
    sensor: &str,
) -> std::result::Result<std::result::Result<f64, SourceError>, String> {
    panic::catch_unwind(AssertUnwindSafe(|| source.read(sensor))).map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string())
    })
}

enum SchedulerState {
    /// `None` only after the poll thread panicked and took the source with it
    Stopped(Option<BoxedSensorSource>),
    Running {
        shutdown: oneshot::Sender<()>,
        handle: JoinHandle<BoxedSensorSource>,
    },
}

/// Runs the polling loop on a dedicated thread.
///
/// The scheduler owns the sensor source exclusively: it moves into the
/// polling thread on [`start`](Self::start) and comes back when
/// [`stop`](Self::stop) joins the thread.
pub struct PollScheduler {
    policies: Arc<RefreshPolicyTable>,
    store: Arc<ReadingStore>,
    state: Mutex<SchedulerState>,
}

impl PollScheduler {
    pub fn new(
        policies: Arc<RefreshPolicyTable>,
        store: Arc<ReadingStore>,
        source: BoxedSensorSource,
    ) -> Self {
        Self {
            policies,
            store,
            state: Mutex::new(SchedulerState::Stopped(Some(source))),
        }
    }

    /// Launch the polling loop. Does nothing if it is already running.
    pub fn start(&self) -> Result<()> {
        let mut state = self.lock_state();

        match &*state {
            SchedulerState::Running { .. } => {
                debug!("Poll scheduler already running");
                return Ok(());
            }
            SchedulerState::Stopped(None) => return Err(MonitorError::SourceLost),
            SchedulerState::Stopped(Some(_)) => {}
        }

        // Build the runtime before taking the source so a failure leaves
        // the scheduler restartable
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| MonitorError::SchedulerSpawn(e.to_string()))?;

        let source = match std::mem::replace(&mut *state, SchedulerState::Stopped(None)) {
            SchedulerState::Stopped(Some(source)) => source,
            _ => return Err(MonitorError::SourceLost),
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let mut poll_loop = PollLoop::new(&self.policies, Arc::clone(&self.store), source);
        let tick = poll_loop.tick;

        let handle = std::thread::Builder::new()
            .name(POLL_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(poll_loop.run(shutdown_rx));
                poll_loop.into_source()
            })
            .map_err(|e| MonitorError::SchedulerSpawn(e.to_string()))?;

        info!(
            "Started poll scheduler for {} sensor(s), tick {:?}",
            self.policies.len(),
            tick
        );
        *state = SchedulerState::Running {
            shutdown: shutdown_tx,
            handle,
        };
        Ok(())
    }

    /// Stop the polling loop and wait for it to exit.
    ///
    /// An in-flight poll cycle completes first; once this returns no further
    /// store writes happen. Does nothing if already stopped.
    pub fn stop(&self) {
        let mut state = self.lock_state();

        let (shutdown, handle) = match std::mem::replace(&mut *state, SchedulerState::Stopped(None)) {
            SchedulerState::Running { shutdown, handle } => (shutdown, handle),
            stopped => {
                *state = stopped;
                return;
            }
        };

        // The loop may already have exited if it panicked
        let _ = shutdown.send(());
        match handle.join() {
            Ok(source) => {
                *state = SchedulerState::Stopped(Some(source));
                info!("Stopped poll scheduler");
            }
            Err(_) => {
                error!("Poll loop panicked; its sensor source was lost");
            }
        }
    }

    /// Whether the polling thread is running
    pub fn is_running(&self) -> bool {
        match &*self.lock_state() {
            SchedulerState::Running { handle, .. } => !handle.is_finished(),
            SchedulerState::Stopped(_) => false,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Poll scheduler state lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
