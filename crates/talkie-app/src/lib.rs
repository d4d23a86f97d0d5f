pub mod keystroke;
pub mod state_file;
pub mod supervisor;
pub mod tui;

pub use keystroke::{KeystrokeSink, LoggingKeystrokeSink};
pub use supervisor::{ConfigChangeListener, Supervisor};
