pub mod capture;
pub mod chunker;
pub mod device;
pub mod energy;
pub mod monitor;
pub mod ring_buffer;
pub mod types;

pub use capture::{AudioCapture, CaptureStats};
pub use chunker::{AudioChunker, ChunkerConfig, ResamplerQuality};
pub use device::{DeviceInfo, DeviceManager};
pub use energy::{EnergyCalculator, EnergyLevel};
pub use monitor::{DeviceEvent, DeviceMonitor};
pub use ring_buffer::{audio_ring_buffer, AudioConsumer, AudioProducer};
pub use types::{AudioFrame, Encoding, Samples};
