use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters accumulated by the GEC pipeline:
/// `{processed, homo_changes, punct_changes, grammar_changes, total_ms}`.
#[derive(Clone, Default)]
pub struct GecStageMetrics {
    pub processed: Arc<AtomicU64>,
    pub homo_changes: Arc<AtomicU64>,
    pub punct_changes: Arc<AtomicU64>,
    pub grammar_changes: Arc<AtomicU64>,
    pub total_ms: Arc<AtomicU64>,
}

impl GecStageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_utterance(&self, homo_changed: bool, punct_changed: bool, grammar_changed: bool, elapsed_us: u64) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if homo_changed {
            self.homo_changes.fetch_add(1, Ordering::Relaxed);
        }
        if punct_changed {
            self.punct_changes.fetch_add(1, Ordering::Relaxed);
        }
        if grammar_changed {
            self.grammar_changes.fetch_add(1, Ordering::Relaxed);
        }
        self.total_ms
            .fetch_add(elapsed_us / 1000, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> GecStageSnapshot {
        GecStageSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            homo_changes: self.homo_changes.load(Ordering::Relaxed),
            punct_changes: self.punct_changes.load(Ordering::Relaxed),
            grammar_changes: self.grammar_changes.load(Ordering::Relaxed),
            total_ms: self.total_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GecStageSnapshot {
    pub processed: u64,
    pub homo_changes: u64,
    pub punct_changes: u64,
    pub grammar_changes: u64,
    pub total_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_only_changed_stages() {
        let m = GecStageMetrics::new();
        m.record_utterance(true, false, false, 2_500);
        let snap = m.snapshot();
        assert_eq!(snap.processed, 1);
        assert_eq!(snap.homo_changes, 1);
        assert_eq!(snap.punct_changes, 0);
        assert_eq!(snap.total_ms, 2);
    }
}
