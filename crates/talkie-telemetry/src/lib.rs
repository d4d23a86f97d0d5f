pub mod gec_metrics;
pub mod pipeline_metrics;

pub use gec_metrics::{GecStageMetrics, GecStageSnapshot};
pub use pipeline_metrics::{BufferType, FpsTracker, PipelineMetrics, PipelineStage};
