//! Deterministic time abstraction, reused by the VAD and supervisor so
//! that debounce/floor-recompute timing can be driven from tests.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

pub struct TestClock {
    current_time: Mutex<Instant>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            current_time: Mutex::new(Instant::now()),
        }
    }

    pub fn new_with_start_time(start: Instant) -> Self {
        Self {
            current_time: Mutex::new(start),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut t = self.current_time.lock();
        *t += duration;
    }

    pub fn set_time(&self, time: Instant) {
        *self.current_time.lock() = time;
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        *self.current_time.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

pub type SharedClock = Arc<dyn Clock>;

pub fn real_clock() -> SharedClock {
    Arc::new(RealClock)
}

pub fn test_clock() -> Arc<TestClock> {
    Arc::new(TestClock::new())
}

pub fn test_clock_with_start(start: Instant) -> Arc<TestClock> {
    Arc::new(TestClock::new_with_start_time(start))
}
