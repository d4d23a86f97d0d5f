use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, StreamConfig};
use talkie_foundation::AudioError;

pub struct DeviceManager {
    host: Host,
    current_device: Option<Device>,
}

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub max_input_channels: u16,
    pub default_sample_rate: u32,
}

impl DeviceManager {
    pub fn new() -> Result<Self, AudioError> {
        Ok(Self {
            host: cpal::default_host(),
            current_device: None,
        })
    }

    /// Enumerates input devices into `{name, max_input_channels,
    /// default_sample_rate}`, flagging the host's default.
    pub fn list_devices(&self) -> Vec<DeviceInfo> {
        let mut devices = Vec::new();
        if let Ok(inputs) = self.host.input_devices() {
            for device in inputs {
                let Ok(name) = device.name() else { continue };
                let Ok(cfg) = device.default_input_config() else {
                    continue;
                };
                devices.push(DeviceInfo {
                    name,
                    is_default: false,
                    max_input_channels: cfg.channels(),
                    default_sample_rate: cfg.sample_rate().0,
                });
            }
        }
        if let Some(default) = self.host.default_input_device() {
            if let Ok(default_name) = default.name() {
                for device in &mut devices {
                    if device.name == default_name {
                        device.is_default = true;
                    }
                }
            }
        }
        devices
    }

    /// Resolves `options.device` — `"default"` or a name substring —
    /// to a concrete `cpal::Device`, surfacing device-not-found before
    /// `start`.
    pub fn open(&mut self, device_name: &str) -> Result<(), AudioError> {
        let device = if device_name == "default" {
            self.host
                .default_input_device()
                .ok_or(AudioError::DeviceNotFound { name: None })?
        } else {
            self.host
                .input_devices()
                .map_err(AudioError::Cpal)?
                .find(|d| {
                    d.name()
                        .map(|n| n.contains(device_name))
                        .unwrap_or(false)
                })
                .ok_or_else(|| AudioError::DeviceNotFound {
                    name: Some(device_name.to_string()),
                })?
        };
        self.current_device = Some(device);
        Ok(())
    }

    pub fn current_device(&self) -> Option<&Device> {
        self.current_device.as_ref()
    }

    pub fn negotiate_config(&self) -> Result<StreamConfig, AudioError> {
        let device = self
            .current_device
            .as_ref()
            .ok_or(AudioError::DeviceNotFound { name: None })?;
        if let Ok(cfg) = device.default_input_config() {
            return Ok(cfg.into());
        }
        let mut supported = device
            .supported_input_configs()
            .map_err(AudioError::SupportedStreamConfigs)?;
        let cfg = supported
            .next()
            .ok_or_else(|| AudioError::FormatNotSupported {
                format: "no supported input configs".into(),
            })?
            .with_max_sample_rate();
        Ok(cfg.into())
    }
}
