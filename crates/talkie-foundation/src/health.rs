//! Periodic health monitor: runs a background tick that checks the
//! components registered with it and logs when one goes stale.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Clone)]
pub struct HealthMonitor {
    interval: Duration,
    last_seen: Arc<RwLock<HashMap<String, Instant>>>,
}

impl HealthMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_seen: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Records that `component` is alive as of now.
    pub fn heartbeat(&self, component: &str) {
        self.last_seen
            .write()
            .insert(component.to_string(), Instant::now());
    }

    /// Spawns the periodic staleness check. Components that have never
    /// heartbeated are ignored; components stale for more than 3×
    /// the interval are logged as unhealthy.
    pub fn start(&self) -> JoinHandle<()> {
        let interval = self.interval;
        let last_seen = self.last_seen.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                for (component, seen) in last_seen.read().iter() {
                    if now.duration_since(*seen) > interval * 3 {
                        warn!(%component, "component has not reported a heartbeat recently");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_is_recorded() {
        let hm = HealthMonitor::new(Duration::from_secs(10));
        hm.heartbeat("audio");
        assert!(hm.last_seen.read().contains_key("audio"));
    }
}
