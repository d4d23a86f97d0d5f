pub mod clock;
pub mod config;
pub mod error;
pub mod health;
pub mod shutdown;
pub mod state;

pub use clock::{real_clock, test_clock, Clock, SharedClock};
pub use config::Settings;
pub use error::{
    AudioError, ConfigError, GecError, NnError, RecoveryStrategy, SttError, SupervisorError,
    TalkieError, VadError,
};
pub use health::HealthMonitor;
pub use shutdown::{ShutdownHandler, ShutdownWaiter};
pub use state::{AppState, StateManager};
