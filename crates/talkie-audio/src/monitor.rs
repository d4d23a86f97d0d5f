//! Device hot-plug monitor. Disabled by default; when enabled, polls
//! the device list at low priority and emits events the supervisor
//! reacts to the same way it reacts to an explicit `input_device`
//! config change.

use crate::device::DeviceManager;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Added(String),
    Removed(String),
    CurrentDeviceDisconnected,
}

pub struct DeviceMonitor {
    poll_interval: Duration,
}

impl DeviceMonitor {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn spawn(
        self,
        device_manager: DeviceManager,
        current_device_name: String,
    ) -> (mpsc::Receiver<DeviceEvent>, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(async move {
            let mut known: Vec<String> = device_manager
                .list_devices()
                .into_iter()
                .map(|d| d.name)
                .collect();
            loop {
                tokio::time::sleep(self.poll_interval).await;
                let current: Vec<String> = device_manager
                    .list_devices()
                    .into_iter()
                    .map(|d| d.name)
                    .collect();

                for name in &current {
                    if !known.contains(name) && tx.send(DeviceEvent::Added(name.clone())).await.is_err() {
                        return;
                    }
                }
                for name in &known {
                    if !current.contains(name) {
                        if *name == current_device_name
                            && tx.send(DeviceEvent::CurrentDeviceDisconnected).await.is_err()
                        {
                            return;
                        }
                        if tx.send(DeviceEvent::Removed(name.clone())).await.is_err() {
                            return;
                        }
                    }
                }
                known = current;
            }
        });
        (rx, handle)
    }
}
