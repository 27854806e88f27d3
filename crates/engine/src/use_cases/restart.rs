//! Delayed, non-blocking stop of the host.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::infrastructure::ports::{HostError, HostPort, HostTask};

/// Name of the fallback timer thread.
pub const TIMER_THREAD_NAME: &str = "worldcycle-restart-timer";

/// Where the stop timer ended up running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopSchedule {
    /// A task on the current tokio runtime.
    Runtime,
    /// A dedicated OS thread.
    Thread,
    /// No timer could be started; the host was stopped right away.
    Immediate,
}

/// Starts the job that sleeps out the delay off the caller's thread.
pub type TimerSpawner = Arc<dyn Fn(HostTask) -> io::Result<()> + Send + Sync>;

fn spawn_timer_thread(job: HostTask) -> io::Result<()> {
    thread::Builder::new()
        .name(TIMER_THREAD_NAME.to_string())
        .spawn(job)
        .map(|_| ())
}

/// Stops the host after a delay.
///
/// The timer never stops the host itself: when it fires it submits the stop
/// to the host's own execution context.
pub struct RestartScheduler {
    host: Arc<dyn HostPort>,
    spawner: TimerSpawner,
}

impl RestartScheduler {
    pub fn new(host: Arc<dyn HostPort>) -> Self {
        Self::with_spawner(host, Arc::new(spawn_timer_thread))
    }

    /// Outside a tokio runtime, timers are started through `spawner`.
    pub fn with_spawner(host: Arc<dyn HostPort>, spawner: TimerSpawner) -> Self {
        Self { host, spawner }
    }

    pub fn schedule_stop(&self, delay: Duration, auto_restart: bool) -> StopSchedule {
        if auto_restart {
            tracing::info!(delay_secs = delay.as_secs(), "Stopping server, wrapper is expected to restart it");
        } else {
            tracing::info!(
                delay_secs = delay.as_secs(),
                "Stopping server, auto_restart is off so it must be started manually"
            );
        }

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let host = self.host.clone();
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = submit_stop(&host) {
                    tracing::error!(error = %e, "Could not submit stop to host");
                }
            });
            return StopSchedule::Runtime;
        }

        let host = self.host.clone();
        let job: HostTask = Box::new(move || {
            thread::sleep(delay);
            if let Err(e) = submit_stop(&host) {
                tracing::error!(error = %e, "Could not submit stop to host");
            }
        });

        match (self.spawner)(job) {
            Ok(()) => StopSchedule::Thread,
            Err(e) => {
                tracing::warn!(error = %e, "Could not start restart timer, stopping now");
                stop_now(&self.host);
                StopSchedule::Immediate
            }
        }
    }
}

fn submit_stop(host: &Arc<dyn HostPort>) -> Result<(), HostError> {
    let target = host.clone();
    let task: HostTask = Box::new(move || stop(target.as_ref()));
    host.submit(task)
}

/// Runs on the caller's thread, so the stop may happen inline.
fn stop_now(host: &Arc<dyn HostPort>) {
    if let Err(e) = submit_stop(host) {
        tracing::warn!(error = %e, "Host rejected the stop task, stopping directly");
        stop(host.as_ref());
    }
}

fn stop(host: &dyn HostPort) {
    if let Err(e) = host.stop() {
        tracing::error!(error = %e, "Host stop failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{wait_until, FakeHost};

    #[test]
    fn without_runtime_uses_named_thread() {
        let host = FakeHost::dedicated_hardcore();
        let scheduler = RestartScheduler::new(host.clone());

        let schedule = scheduler.schedule_stop(Duration::from_millis(20), true);

        assert_eq!(schedule, StopSchedule::Thread);
        assert!(wait_until(Duration::from_secs(5), || host.stop_count() == 1));
        assert_eq!(host.submitted_count(), 1);
        assert_eq!(host.stop_threads(), vec![TIMER_THREAD_NAME.to_string()]);
    }

    #[test]
    fn stop_is_not_immediate() {
        let host = FakeHost::dedicated_hardcore();
        let scheduler = RestartScheduler::new(host.clone());

        scheduler.schedule_stop(Duration::from_secs(60), true);

        assert_eq!(host.stop_count(), 0);
    }

    fn refusing_spawner() -> TimerSpawner {
        Arc::new(|_job| Err(io::Error::other("thread limit reached")))
    }

    #[test]
    fn spawn_failure_stops_through_the_host_executor() {
        let host = FakeHost::dedicated_hardcore();
        let scheduler = RestartScheduler::with_spawner(host.clone(), refusing_spawner());

        let schedule = scheduler.schedule_stop(Duration::from_secs(60), true);

        assert_eq!(schedule, StopSchedule::Immediate);
        assert_eq!(host.submitted_count(), 1);
        assert_eq!(host.stop_count(), 1);
    }

    #[test]
    fn spawn_failure_stops_directly_when_submit_is_rejected() {
        let host = FakeHost::dedicated_hardcore();
        host.fail_submits();
        let scheduler = RestartScheduler::with_spawner(host.clone(), refusing_spawner());

        let schedule = scheduler.schedule_stop(Duration::from_secs(60), false);

        assert_eq!(schedule, StopSchedule::Immediate);
        assert_eq!(host.submitted_count(), 0);
        assert_eq!(host.stop_count(), 1);
    }

    #[tokio::test]
    async fn inside_runtime_uses_tokio_timer() {
        let host = FakeHost::dedicated_hardcore();
        let scheduler = RestartScheduler::new(host.clone());

        let schedule = scheduler.schedule_stop(Duration::from_millis(10), false);
        assert_eq!(schedule, StopSchedule::Runtime);

        for _ in 0..200 {
            if host.stop_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(host.stop_count(), 1);
    }
}
