use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a supervised run currently is.
///
/// Natural exit goes `Running -> WaitingExit -> Done`; an external cancellation goes
/// `Running -> HooksRunning -> SignalSent -> WaitingExit -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunPhase {
    /// Not launched yet.
    #[default]
    Idle,
    /// Worker started, nobody asked it to stop.
    Running,
    /// Shutdown hooks are executing.
    HooksRunning,
    /// Graceful termination signal delivered.
    SignalSent,
    /// Waiting for the worker's exit status.
    WaitingExit,
    /// Exit status recorded, run directory finalized.
    Done,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::HooksRunning => "hooksRunning",
            RunPhase::SignalSent => "signalSent",
            RunPhase::WaitingExit => "waitingExit",
            RunPhase::Done => "done",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
