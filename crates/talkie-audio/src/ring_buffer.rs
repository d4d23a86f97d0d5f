//! SPSC ring buffer between the realtime capture callback and the
//! application event loop: lock-free, single producer, single
//! consumer, power-of-two capacity. The wake signal is a
//! `tokio::sync::Notify`, the async equivalent of a notification pipe,
//! since the realtime callback still never allocates, locks, or
//! blocks to send it.

use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::Arc;
use tokio::sync::Notify;

pub struct AudioProducer {
    inner: Producer<i16>,
    notify: Arc<Notify>,
    overflow_count: u64,
}

impl AudioProducer {
    /// Pushes one sample. Never blocks; on overflow drops the sample
    /// and counts it. Overflow is non-fatal.
    pub fn push(&mut self, sample: i16) {
        if self.inner.push(sample).is_err() {
            self.overflow_count += 1;
        }
    }

    pub fn push_frame(&mut self, frame: &[i16]) {
        for &s in frame {
            self.push(s);
        }
        self.notify.notify_one();
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow_count
    }
}

pub struct AudioConsumer {
    inner: Consumer<i16>,
    notify: Arc<Notify>,
}

impl AudioConsumer {
    /// Waits for the producer to signal new data, then drains up to
    /// `max_samples`. Returns fewer if less is available.
    pub async fn read_frame(&mut self, max_samples: usize) -> Vec<i16> {
        if self.inner.slots() == 0 {
            self.notify.notified().await;
        }
        self.drain(max_samples)
    }

    pub fn drain(&mut self, max_samples: usize) -> Vec<i16> {
        let n = self.inner.slots().min(max_samples);
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            if let Ok(s) = self.inner.pop() {
                out.push(s);
            } else {
                break;
            }
        }
        out
    }

    pub fn fill_percent(&self, capacity: usize) -> usize {
        if capacity == 0 {
            return 0;
        }
        (self.inner.slots() * 100 / capacity).min(100)
    }
}

/// Builds a ≈500ms-capacity ring buffer pair for the given sample rate.
pub fn audio_ring_buffer(sample_rate: u32) -> (AudioProducer, AudioConsumer) {
    let capacity = (sample_rate as usize / 2).next_power_of_two();
    let (producer, consumer) = RingBuffer::<i16>::new(capacity);
    let notify = Arc::new(Notify::new());
    (
        AudioProducer {
            inner: producer,
            notify: notify.clone(),
            overflow_count: 0,
        },
        AudioConsumer {
            inner: consumer,
            notify,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_then_read_frame_roundtrip() {
        let (mut producer, mut consumer) = audio_ring_buffer(16_000);
        producer.push_frame(&[1, 2, 3, 4]);
        let out = consumer.read_frame(4).await;
        assert_eq!(out, vec![1, 2, 3, 4]);
    }

    #[test]
    fn overflow_is_counted_not_fatal() {
        let (mut producer, _consumer) = audio_ring_buffer(16_000);
        let capacity = (16_000usize / 2).next_power_of_two();
        for i in 0..(capacity + 10) {
            producer.push(i as i16);
        }
        assert!(producer.overflow_count() > 0);
    }
}
