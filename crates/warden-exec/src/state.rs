use std::sync::{Arc, PoisonError, RwLock};

use warden_model::RunPhase;

/// Point-in-time view of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub phase: RunPhase,
    /// Worker pid once started.
    pub pid: Option<u32>,
    /// Resolved argument vector, binary first.
    pub argv: Vec<String>,
    /// Exit code once observed; `-1` when the worker died from a signal.
    pub exit_code: Option<i32>,
    /// Whether the worker had to be force-killed.
    pub forced: bool,
}

impl RunState {
    /// Compact description used in test failure output: `{phase: done, pid: 42, exitStatus: 1}`.
    pub fn describe(&self) -> String {
        let pid = self.pid.map_or_else(|| "-".to_string(), |p| p.to_string());
        format!(
            "{{phase: {}, pid: {}, exitStatus: {}}}",
            self.phase,
            pid,
            self.exit_code.unwrap_or(-1)
        )
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct SharedState(Arc<RwLock<RunState>>);

impl SharedState {
    pub(crate) fn snapshot(&self) -> RunState {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut RunState)) {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard);
    }

    pub(crate) fn set_phase(&self, phase: RunPhase) {
        self.update(|s| s.phase = phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_before_start() {
        assert_eq!(
            RunState::default().describe(),
            "{phase: idle, pid: -, exitStatus: -1}"
        );
    }

    #[test]
    fn describe_after_exit() {
        let state = SharedState::default();
        state.update(|s| {
            s.pid = Some(4242);
            s.exit_code = Some(1);
        });
        state.set_phase(RunPhase::Done);
        assert_eq!(state.snapshot().phase, RunPhase::Done);
        assert_eq!(
            state.snapshot().describe(),
            "{phase: done, pid: 4242, exitStatus: 1}"
        );
    }
}
