//! Keystroke injection boundary. Synthesizing virtual keyboard events
//! is out of scope; this module only defines the trait a real backend
//! would implement and a logging reference backend.

use talkie_foundation::TalkieError;

pub trait KeystrokeSink {
    fn inject(&mut self, text: &str) -> Result<(), TalkieError>;
}

/// Reference backend: logs what would have been typed instead of
/// driving a real input device.
pub struct LoggingKeystrokeSink;

impl KeystrokeSink for LoggingKeystrokeSink {
    fn inject(&mut self, text: &str) -> Result<(), TalkieError> {
        tracing::info!(%text, "keystroke sink: would inject text");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_sink_accepts_any_text() {
        let mut sink = LoggingKeystrokeSink;
        assert!(sink.inject("hello world").is_ok());
        assert!(sink.inject("").is_ok());
    }
}
