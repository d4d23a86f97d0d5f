//! Audio capture driver: negotiates an input stream config against a
//! device and feeds a producer from the realtime callback thread.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use talkie_foundation::AudioError;

use crate::device::DeviceManager;
use crate::ring_buffer::{audio_ring_buffer, AudioConsumer, AudioProducer};

#[derive(Debug, Default)]
pub struct CaptureStats {
    pub frames_captured: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub disconnections: AtomicU64,
}

/// Owns the stream, the ring buffer producer side, and device handle.
/// `close` releases the stream, the ring buffer, and the device handle
/// in that order, and is idempotent.
pub struct AudioCapture {
    device_manager: DeviceManager,
    stream: Option<Stream>,
    stats: Arc<CaptureStats>,
    running: Arc<AtomicBool>,
}

thread_local! {
    static CONVERT_BUFFER: RefCell<Vec<i16>> = RefCell::new(Vec::new());
}

impl AudioCapture {
    pub fn new() -> Result<Self, AudioError> {
        Ok(Self {
            device_manager: DeviceManager::new()?,
            stream: None,
            stats: Arc::new(CaptureStats::default()),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn list_devices(&self) -> Vec<crate::device::DeviceInfo> {
        self.device_manager.list_devices()
    }

    /// `open(options)`: resolves the device and negotiates a config.
    /// Does not start the stream.
    pub fn open(&mut self, device_name: &str) -> Result<StreamConfig, AudioError> {
        self.device_manager.open(device_name)?;
        self.device_manager.negotiate_config()
    }

    /// `start`: builds and plays the realtime stream, wiring its
    /// callback to push into the ring buffer producer.
    pub fn start(
        &mut self,
        config: StreamConfig,
    ) -> Result<AudioConsumer, AudioError> {
        let device = self
            .device_manager
            .current_device()
            .ok_or(AudioError::DeviceNotFound { name: None })?
            .clone();

        let sample_format = device
            .default_input_config()
            .map(|c| c.sample_format())
            .unwrap_or(SampleFormat::I16);

        let (producer, consumer) = audio_ring_buffer(config.sample_rate.0);

        let stats = self.stats.clone();
        let stream = build_stream(&device, &config, sample_format, producer, stats)?;
        stream.play().map_err(AudioError::PlayStream)?;

        self.stream = Some(stream);
        self.running.store(true, Ordering::Relaxed);
        Ok(consumer)
    }

    pub fn stop(&mut self) {
        if let Some(stream) = &self.stream {
            let _ = cpal::traits::StreamTrait::pause(stream);
        }
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.stats.frames_captured.load(Ordering::Relaxed),
            self.stats.frames_dropped.load(Ordering::Relaxed),
            self.stats.disconnections.load(Ordering::Relaxed),
        )
    }

    /// Idempotent: releases the stream, implicitly the ring buffer
    /// (dropped with `self`), and the device handle (via `stream`'s
    /// drop) in that order.
    pub fn close(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        self.stream = None;
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    mut producer: AudioProducer,
    stats: Arc<CaptureStats>,
) -> Result<Stream, AudioError> {
    let err_fn = {
        let stats = stats.clone();
        move |err| {
            tracing::warn!(?err, "audio stream error");
            stats.disconnections.fetch_add(1, Ordering::Relaxed);
        }
    };

    macro_rules! build {
        ($ty:ty, $convert:expr) => {
            device.build_input_stream(
                config,
                move |data: &[$ty], _| {
                    CONVERT_BUFFER.with(|buf| {
                        let mut buf = buf.borrow_mut();
                        buf.clear();
                        buf.extend(data.iter().map($convert));
                        producer.push_frame(&buf);
                    });
                    stats
                        .frames_captured
                        .fetch_add(data.len() as u64, Ordering::Relaxed);
                },
                err_fn.clone(),
                None,
            )
        };
    }

    let stream = match sample_format {
        SampleFormat::I16 => build!(i16, |&s: &i16| s),
        SampleFormat::U16 => build!(u16, |&s: &u16| (s as i32 - 32768) as i16),
        SampleFormat::F32 => build!(f32, |&s: &f32| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16),
        _ => {
            return Err(AudioError::FormatNotSupported {
                format: format!("{:?}", sample_format),
            })
        }
    }
    .map_err(AudioError::BuildStream)?;

    Ok(stream)
}

#[cfg(test)]
mod convert_tests {
    #[test]
    fn f32_to_i16_basic() {
        let convert = |s: f32| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        assert_eq!(convert(1.0), 32767);
        assert_eq!(convert(-1.0), -32767);
        assert_eq!(convert(0.0), 0);
    }

    #[test]
    fn u16_to_i16_centering() {
        let convert = |s: u16| (s as i32 - 32768) as i16;
        assert_eq!(convert(32768), 0);
        assert_eq!(convert(0), -32768);
        assert_eq!(convert(65535), 32767);
    }
}
