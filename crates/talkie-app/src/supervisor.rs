//! Supervises live config reloads. Config changes never happen
//! mid-utterance: transcribing is suspended, affected components are
//! torn down and rebuilt against the new settings, then transcribing
//! resumes if it was active before the change.

use talkie_foundation::{Settings, StateManager, SupervisorError};

/// A component whose state depends on `Settings` and that needs to be
/// quiesced and rebuilt when a config field it cares about changes.
pub trait ConfigChangeListener {
    /// Whether `old` -> `new` touches anything this listener owns.
    fn affected_by(&self, old: &Settings, new: &Settings) -> bool;

    /// Tear down any resources held against the old settings.
    fn close(&mut self);

    /// Rebuild against the new settings. A `RestartRequired` error means
    /// this listener cannot be hot-reloaded and the process must restart.
    fn reinit(&mut self, new: &Settings) -> Result<(), SupervisorError>;
}

pub struct Supervisor {
    state: StateManager,
    settings: Settings,
    listeners: Vec<Box<dyn ConfigChangeListener>>,
}

impl Supervisor {
    pub fn new(state: StateManager, settings: Settings) -> Self {
        Self {
            state,
            settings,
            listeners: Vec::new(),
        }
    }

    pub fn register(&mut self, listener: Box<dyn ConfigChangeListener>) {
        self.listeners.push(listener);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Applies a new settings value across every affected listener.
    ///
    /// `quiesce` is called once transcribing has been suspended, giving the
    /// caller a chance to wait for any in-flight utterance to drain before
    /// listeners are torn down. A `RestartRequired` from any listener's
    /// `reinit` short-circuits before transcribing is resumed, signalling
    /// the caller to exit rather than continue in a half-reloaded state.
    pub fn apply_config_change<F: FnMut()>(&mut self, new_settings: Settings, mut quiesce: F) -> Result<(), SupervisorError> {
        let was_transcribing = self.state.transcribing();
        self.state.set_transcribing(false);
        quiesce();

        for listener in self.listeners.iter_mut() {
            if listener.affected_by(&self.settings, &new_settings) {
                listener.close();
                listener.reinit(&new_settings)?;
            }
        }

        self.settings = new_settings;

        if was_transcribing {
            self.state.set_transcribing(true);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talkie_foundation::AppState;

    struct FakeListener {
        sensitive_field: fn(&Settings) -> i64,
        closed: bool,
        reinit_calls: u32,
        fail_reinit: bool,
    }

    impl ConfigChangeListener for FakeListener {
        fn affected_by(&self, old: &Settings, new: &Settings) -> bool {
            (self.sensitive_field)(old) != (self.sensitive_field)(new)
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn reinit(&mut self, _new: &Settings) -> Result<(), SupervisorError> {
            self.reinit_calls += 1;
            if self.fail_reinit {
                Err(SupervisorError::RestartRequired)
            } else {
                self.closed = false;
                Ok(())
            }
        }
    }

    fn state_manager() -> StateManager {
        let sm = StateManager::new();
        sm.transition(AppState::Running).unwrap();
        sm.set_transcribing(true);
        sm
    }

    #[test]
    fn unaffected_listener_is_left_alone() {
        let sm = state_manager();
        let mut supervisor = Supervisor::new(sm, Settings::default());
        let mut settings2 = Settings::default();
        settings2.engine.vosk_beam = 999;

        // sensitive_field reads gec.gec_grammar, which does not change.
        let unaffected = Box::new(FakeListener {
            sensitive_field: |s| s.gec.gec_grammar as i64,
            closed: false,
            reinit_calls: 0,
            fail_reinit: false,
        });
        supervisor.register(unaffected);

        supervisor.apply_config_change(settings2, || {}).unwrap();
        assert!(supervisor.settings().engine.vosk_beam == 999);
    }

    #[test]
    fn affected_listener_is_closed_and_reinitialized() {
        let sm = state_manager();
        let mut supervisor = Supervisor::new(sm, Settings::default());
        let mut settings2 = Settings::default();
        settings2.engine.vosk_beam = 42;

        let affected = Box::new(FakeListener {
            sensitive_field: |s| s.engine.vosk_beam as i64,
            closed: false,
            reinit_calls: 0,
            fail_reinit: false,
        });
        supervisor.register(affected);
        supervisor.apply_config_change(settings2, || {}).unwrap();
    }

    #[test]
    fn transcribing_is_suspended_during_reload_and_restored_after() {
        let sm = state_manager();
        assert!(sm.transcribing());
        let mut quiesced_while_off = false;

        {
            let mut supervisor = Supervisor::new(sm, Settings::default());
            supervisor
                .apply_config_change(Settings::default(), || {
                    quiesced_while_off = true;
                })
                .unwrap();
        }

        assert!(quiesced_while_off);
    }

    #[test]
    fn restart_required_short_circuits_before_resuming_transcribing() {
        let sm = state_manager();
        let mut supervisor = Supervisor::new(sm, Settings::default());

        let failing = Box::new(FakeListener {
            sensitive_field: |s| s.engine.vosk_beam as i64,
            closed: false,
            reinit_calls: 0,
            fail_reinit: true,
        });
        supervisor.register(failing);

        let mut settings2 = Settings::default();
        settings2.engine.vosk_beam = 7;

        let result = supervisor.apply_config_change(settings2, || {});
        assert!(matches!(result, Err(SupervisorError::RestartRequired)));
    }
}
