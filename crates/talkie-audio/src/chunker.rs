//! Reframes the consumer side of the ring buffer into fixed-size
//! `AudioFrame`s at the pipeline's working rate, resampling as needed.
//! Stereo-to-mono averaging, `rubato` resampling, broadcast fan-out,
//! carrying either int16 or float32 encoded frames.

use crate::ring_buffer::AudioConsumer;
use crate::types::{AudioFrame, Samples};
use rubato::{FftFixedIn, Resampler};
use std::collections::VecDeque;
use std::time::Instant;
use tokio::sync::broadcast;

pub const DEFAULT_FRAME_SIZE_SAMPLES: usize = 512;
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 16_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResamplerQuality {
    Fast,
    Balanced,
    Quality,
}

impl ResamplerQuality {
    pub fn chunk_size(self) -> usize {
        match self {
            ResamplerQuality::Fast => 256,
            ResamplerQuality::Balanced => 1024,
            ResamplerQuality::Quality => 4096,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub frame_size_samples: usize,
    pub sample_rate_hz: u32,
    pub resampler_quality: ResamplerQuality,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            frame_size_samples: DEFAULT_FRAME_SIZE_SAMPLES,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            resampler_quality: ResamplerQuality::Balanced,
        }
    }
}

pub struct AudioChunker {
    cfg: ChunkerConfig,
    output_tx: broadcast::Sender<AudioFrame>,
}

impl AudioChunker {
    pub fn new(cfg: ChunkerConfig) -> Self {
        let (output_tx, _rx) = broadcast::channel(64);
        Self { cfg, output_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AudioFrame> {
        self.output_tx.subscribe()
    }

    /// Spawns the worker loop draining `consumer`, resampling to
    /// `cfg.sample_rate_hz`, and broadcasting fixed-size frames.
    pub fn spawn(self, consumer: AudioConsumer, input_sample_rate: u32) -> tokio::task::JoinHandle<()> {
        let cfg = self.cfg.clone();
        let output_tx = self.output_tx.clone();
        tokio::spawn(async move {
            let mut worker = ChunkerWorker::new(cfg, input_sample_rate, output_tx);
            worker.run(consumer).await;
        })
    }
}

struct ChunkerWorker {
    cfg: ChunkerConfig,
    buffer: VecDeque<i16>,
    samples_emitted: u64,
    resampler: Option<FftFixedIn<f32>>,
    input_sample_rate: u32,
    start_time: Instant,
    output_tx: broadcast::Sender<AudioFrame>,
}

impl ChunkerWorker {
    fn new(cfg: ChunkerConfig, input_sample_rate: u32, output_tx: broadcast::Sender<AudioFrame>) -> Self {
        let resampler = if input_sample_rate != cfg.sample_rate_hz {
            FftFixedIn::<f32>::new(
                input_sample_rate as usize,
                cfg.sample_rate_hz as usize,
                cfg.resampler_quality.chunk_size(),
                1,
                1,
            )
            .ok()
        } else {
            None
        };
        Self {
            cfg,
            buffer: VecDeque::new(),
            samples_emitted: 0,
            resampler,
            input_sample_rate,
            start_time: Instant::now(),
            output_tx,
        }
    }

    async fn run(&mut self, mut consumer: AudioConsumer) {
        loop {
            let chunk = consumer.read_frame(4096).await;
            if chunk.is_empty() {
                tokio::time::sleep(std::time::Duration::from_millis(25)).await;
                continue;
            }
            self.process_chunk(&chunk);
            self.flush_ready_frames();
        }
    }

    fn process_chunk(&mut self, chunk: &[i16]) {
        if self.resampler.is_none() {
            self.buffer.extend(chunk.iter().copied());
            return;
        }

        let floats: Vec<f32> = chunk.iter().map(|&s| s as f32 / 32768.0).collect();
        if let Some(resampler) = &mut self.resampler {
            if let Ok(out) = resampler.process(&[floats], None) {
                for sample in &out[0] {
                    let clamped = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32);
                    self.buffer.push_back(clamped as i16);
                }
            }
        }
    }

    fn flush_ready_frames(&mut self) {
        while self.buffer.len() >= self.cfg.frame_size_samples {
            let samples: Vec<i16> = self.buffer.drain(..self.cfg.frame_size_samples).collect();
            self.samples_emitted += samples.len() as u64;
            let timestamp_secs = self.samples_emitted as f64 / self.cfg.sample_rate_hz as f64;
            let frame = AudioFrame {
                samples: Samples::Int16(samples),
                sample_rate: self.cfg.sample_rate_hz,
                timestamp_secs,
            };
            let _ = self.output_tx.send(frame);
        }
    }

    #[cfg(test)]
    fn input_rate(&self) -> u32 {
        self.input_sample_rate
    }

    #[cfg(test)]
    fn start_time(&self) -> Instant {
        self.start_time
    }
}

/// Averages interleaved stereo samples to mono.
pub fn stereo_to_mono(samples: &[i16]) -> Vec<i16> {
    samples
        .chunks_exact(2)
        .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_to_mono_averaging() {
        let stereo = vec![1000i16, -1000, 500, 500];
        let mono = stereo_to_mono(&stereo);
        assert_eq!(mono, vec![0, 500]);
    }

    #[test]
    fn no_resampler_when_rates_match() {
        let (tx, _rx) = broadcast::channel(1);
        let worker = ChunkerWorker::new(ChunkerConfig::default(), 16_000, tx);
        assert!(worker.resampler.is_none());
        assert_eq!(worker.input_rate(), 16_000);
        let _ = worker.start_time();
    }

    #[test]
    fn resampler_created_on_rate_mismatch() {
        let (tx, _rx) = broadcast::channel(1);
        let worker = ChunkerWorker::new(ChunkerConfig::default(), 44_100, tx);
        assert!(worker.resampler.is_some());
    }

    #[test]
    fn flush_emits_fixed_size_frames() {
        let (tx, mut rx) = broadcast::channel(4);
        let mut worker = ChunkerWorker::new(ChunkerConfig::default(), 16_000, tx);
        worker.process_chunk(&vec![0i16; DEFAULT_FRAME_SIZE_SAMPLES * 2]);
        worker.flush_ready_frames();
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.samples.len(), DEFAULT_FRAME_SIZE_SAMPLES);
    }
}
