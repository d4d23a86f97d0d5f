pub mod constants;
pub mod engine;
pub mod state;
pub mod threshold;
pub mod types;

pub use engine::{AdaptiveVad, AdaptiveVadBuilder, VadEngine};
pub use state::VadStateMachine;
pub use threshold::AdaptiveThreshold;
pub use types::{VadConfig, VadEvent, VadMetrics, VadState};
