//! Application state machine, extended with the `transcribing` flag
//! and VAD-suspension signaling the supervisor needs to drive a
//! config change without losing audio frames.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    Initializing,
    Running,
    Recovering { from_error: String },
    Stopping,
    Stopped,
}

#[derive(Clone)]
pub struct StateManager {
    state: Arc<RwLock<AppState>>,
    transcribing: Arc<RwLock<bool>>,
    state_tx: Sender<AppState>,
    state_rx: Receiver<AppState>,
}

impl StateManager {
    pub fn new() -> Self {
        let (state_tx, state_rx) = unbounded();
        Self {
            state: Arc::new(RwLock::new(AppState::Initializing)),
            transcribing: Arc::new(RwLock::new(false)),
            state_tx,
            state_rx,
        }
    }

    pub fn current(&self) -> AppState {
        self.state.read().clone()
    }

    pub fn transcribing(&self) -> bool {
        *self.transcribing.read()
    }

    pub fn set_transcribing(&self, on: bool) {
        *self.transcribing.write() = on;
    }

    pub fn subscribe(&self) -> Receiver<AppState> {
        self.state_rx.clone()
    }

    /// Validates the transition against the fixed set of allowed edges
    /// and broadcasts the new state on success.
    pub fn transition(&self, new_state: AppState) -> Result<(), String> {
        let current = self.state.read().clone();
        let allowed = matches!(
            (&current, &new_state),
            (AppState::Initializing, AppState::Running)
                | (AppState::Running, AppState::Recovering { .. })
                | (AppState::Running, AppState::Stopping)
                | (AppState::Recovering { .. }, AppState::Running)
                | (AppState::Recovering { .. }, AppState::Stopping)
                | (AppState::Stopping, AppState::Stopped)
        );
        if !allowed {
            warn!(?current, ?new_state, "rejected invalid state transition");
            return Err(format!("invalid transition {:?} -> {:?}", current, new_state));
        }
        info!(?current, ?new_state, "state transition");
        *self.state.write() = new_state.clone();
        let _ = self.state_tx.send(new_state);
        Ok(())
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transition_sequence() {
        let sm = StateManager::new();
        sm.transition(AppState::Running).unwrap();
        sm.transition(AppState::Recovering {
            from_error: "boom".into(),
        })
        .unwrap();
        sm.transition(AppState::Running).unwrap();
        sm.transition(AppState::Stopping).unwrap();
        sm.transition(AppState::Stopped).unwrap();
    }

    #[test]
    fn invalid_transition_rejected() {
        let sm = StateManager::new();
        assert!(sm.transition(AppState::Stopped).is_err());
    }

    #[test]
    fn transcribing_flag_roundtrip() {
        let sm = StateManager::new();
        assert!(!sm.transcribing());
        sm.set_transcribing(true);
        assert!(sm.transcribing());
    }
}
