//! Shared fakes and helpers for engine tests.
//!
//! - [`FakeHost`] records broadcasts, submitted tasks and stops; submitted
//!   tasks run inline on the calling thread
//! - [`FakeOccupant`] can be told to succeed, fail or panic per primitive
//! - [`ServerDir`] is a throwaway server root on disk
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_fixtures::{FakeHost, FakeOccupant, ServerDir};
//!
//! let dir = ServerDir::new();
//! dir.write_host_config("hardcore=true\nlevel-name=world\n");
//! let host = FakeHost::dedicated_hardcore()
//!     .with_occupants(vec![Arc::new(FakeOccupant::new("Steve"))]);
//! ```

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use uuid::Uuid;
use worldcycle_domain::RotationNotice;

use crate::infrastructure::clock::FixedRandom;
use crate::infrastructure::config_store::ConfigStore;
use crate::infrastructure::ports::{ClockPort, HostError, HostPort, HostTask, OccupantPort};
use crate::infrastructure::server_files::ServerFiles;

/// Seed drawn by [`fixed_random`].
pub const FIXED_SEED: i64 = -4_172_144_997_902_289_642;

/// Short id `a1b2c3d4`, seed [`FIXED_SEED`].
pub fn fixed_random() -> FixedRandom {
    FixedRandom {
        uuid: Uuid::from_u128(0xa1b2_c3d4_0000_4000_8000_0000_0000_0000),
        seed: FIXED_SEED,
    }
}

/// Poll `done` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    done()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Clock
// =============================================================================

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *lock(&self.now) += by;
    }
}

impl ClockPort for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

// =============================================================================
// Host
// =============================================================================

#[derive(Default)]
pub struct FakeHost {
    dedicated: AtomicBool,
    hardcore: AtomicBool,
    occupants: Mutex<Vec<Arc<dyn OccupantPort>>>,
    broadcasts: Mutex<Vec<String>>,
    fail_broadcast: AtomicBool,
    panic_broadcast: AtomicBool,
    fail_submit: AtomicBool,
    submitted: AtomicUsize,
    stops: AtomicUsize,
    stop_threads: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn dedicated_hardcore() -> Arc<Self> {
        let host = Self::default();
        host.dedicated.store(true, Ordering::SeqCst);
        host.hardcore.store(true, Ordering::SeqCst);
        Arc::new(host)
    }

    pub fn with_occupants(self: Arc<Self>, occupants: Vec<Arc<dyn OccupantPort>>) -> Arc<Self> {
        self.set_occupants(occupants);
        self
    }

    pub fn set_occupants(&self, occupants: Vec<Arc<dyn OccupantPort>>) {
        *lock(&self.occupants) = occupants;
    }

    pub fn set_dedicated(&self, dedicated: bool) {
        self.dedicated.store(dedicated, Ordering::SeqCst);
    }

    pub fn set_hardcore(&self, hardcore: bool) {
        self.hardcore.store(hardcore, Ordering::SeqCst);
    }

    pub fn fail_broadcasts(&self) {
        self.fail_broadcast.store(true, Ordering::SeqCst);
    }

    pub fn panic_broadcasts(&self) {
        self.panic_broadcast.store(true, Ordering::SeqCst);
    }

    /// Reject every submitted task without running it.
    pub fn fail_submits(&self) {
        self.fail_submit.store(true, Ordering::SeqCst);
    }

    pub fn broadcasts(&self) -> Vec<String> {
        lock(&self.broadcasts).clone()
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Names of the threads `stop` ran on.
    pub fn stop_threads(&self) -> Vec<String> {
        lock(&self.stop_threads).clone()
    }
}

impl HostPort for FakeHost {
    fn is_dedicated(&self) -> bool {
        self.dedicated.load(Ordering::SeqCst)
    }

    fn is_hardcore(&self) -> bool {
        self.hardcore.load(Ordering::SeqCst)
    }

    fn occupants(&self) -> Vec<Arc<dyn OccupantPort>> {
        lock(&self.occupants).clone()
    }

    fn broadcast(&self, notice: &RotationNotice) -> Result<(), HostError> {
        if self.panic_broadcast.load(Ordering::SeqCst) {
            panic!("chat subsystem exploded");
        }
        if self.fail_broadcast.load(Ordering::SeqCst) {
            return Err(HostError::ShuttingDown);
        }
        lock(&self.broadcasts).push(notice.to_string());
        Ok(())
    }

    fn submit(&self, task: HostTask) -> Result<(), HostError> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(HostError::ShuttingDown);
        }
        self.submitted.fetch_add(1, Ordering::SeqCst);
        task();
        Ok(())
    }

    fn stop(&self) -> Result<(), HostError> {
        let name = thread::current().name().unwrap_or("unnamed").to_string();
        lock(&self.stop_threads).push(name);
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Occupants
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
}

type DeathHook = Box<dyn Fn(&str) + Send + Sync>;

pub struct FakeOccupant {
    name: String,
    alive: AtomicBool,
    mark_dead: Behavior,
    force_zero: Behavior,
    mark_dead_calls: AtomicUsize,
    force_zero_calls: AtomicUsize,
    on_death: Option<DeathHook>,
}

impl FakeOccupant {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alive: AtomicBool::new(true),
            mark_dead: Behavior::Succeed,
            force_zero: Behavior::Succeed,
            mark_dead_calls: AtomicUsize::new(0),
            force_zero_calls: AtomicUsize::new(0),
            on_death: None,
        }
    }

    pub fn dead(self) -> Self {
        self.alive.store(false, Ordering::SeqCst);
        self
    }

    pub fn mark_dead_behavior(mut self, behavior: Behavior) -> Self {
        self.mark_dead = behavior;
        self
    }

    pub fn force_zero_behavior(mut self, behavior: Behavior) -> Self {
        self.force_zero = behavior;
        self
    }

    /// Runs when the occupant dies, like the host's death event would.
    pub fn on_death(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_death = Some(Box::new(hook));
        self
    }

    pub fn mark_dead_calls(&self) -> usize {
        self.mark_dead_calls.load(Ordering::SeqCst)
    }

    pub fn force_zero_calls(&self) -> usize {
        self.force_zero_calls.load(Ordering::SeqCst)
    }

    fn act(&self, behavior: Behavior, primitive: &'static str) -> Result<(), HostError> {
        match behavior {
            Behavior::Succeed => {
                self.alive.store(false, Ordering::SeqCst);
                if let Some(hook) = &self.on_death {
                    hook(&self.name);
                }
                Ok(())
            }
            Behavior::Fail => Err(HostError::rejected(primitive, "refused by fake")),
            Behavior::Panic => panic!("{} exploded for {}", primitive, self.name),
        }
    }
}

impl OccupantPort for FakeOccupant {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn mark_dead(&self) -> Result<(), HostError> {
        self.mark_dead_calls.fetch_add(1, Ordering::SeqCst);
        self.act(self.mark_dead, "kill occupant")
    }

    fn force_zero_vitality(&self) -> Result<(), HostError> {
        self.force_zero_calls.fetch_add(1, Ordering::SeqCst);
        self.act(self.force_zero, "zero vitality")
    }
}

// =============================================================================
// Server directory
// =============================================================================

/// A server root in a temp directory, removed on drop.
pub struct ServerDir {
    dir: TempDir,
}

impl ServerDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn files(&self) -> ServerFiles {
        ServerFiles::new(self.dir.path())
    }

    /// Settings from the directory's settings file, no environment.
    pub fn config(&self) -> ConfigStore {
        ConfigStore::with_env(Some(self.files().settings_path()), |_| None)
    }

    pub fn write_host_config(&self, text: &str) {
        fs::write(self.files().host_config_path(), text).expect("write host config");
    }

    pub fn host_config_text(&self) -> String {
        fs::read_to_string(self.files().host_config_path()).expect("read host config")
    }

    pub fn write_settings(&self, text: &str) {
        fs::write(self.files().settings_path(), text).expect("write settings");
    }

    /// A small world directory including a `session.lock`.
    pub fn create_world(&self, name: &str) {
        let world = self.dir.path().join(name);
        fs::create_dir_all(world.join("region")).expect("create world");
        fs::write(world.join("level.dat"), b"level").expect("write level.dat");
        fs::write(world.join("region").join("r.0.0.mca"), b"chunks").expect("write region");
        fs::write(world.join("session.lock"), b"lock").expect("write lock");
    }

    /// Minimal marker naming `old` as the retired instance.
    pub fn write_marker(&self, old: &str) {
        fs::write(
            self.files().marker_path(),
            format!("requestedBy=COMMAND\nold-level-name={}\n", old),
        )
        .expect("write marker");
    }
}

impl Default for ServerDir {
    fn default() -> Self {
        Self::new()
    }
}
