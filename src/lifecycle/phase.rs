//! Lifecycle phases and bootstrap states.

use std::fmt;

/// A named stage of the bootstrap. Callbacks are registered per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Init,
    Setup,
    Start,
    Ready,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Init, Phase::Setup, Phase::Start, Phase::Ready];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Setup => "setup",
            Phase::Start => "start",
            Phase::Ready => "ready",
        }
    }

    /// Logged when no enabled callback exists for the phase.
    pub(crate) fn idle_message(self) -> &'static str {
        match self {
            Phase::Init => "nothing to initialize",
            Phase::Setup => "nothing to setup",
            Phase::Start => "nothing to start",
            Phase::Ready => "nothing to ready",
        }
    }

    /// Logged with the component names before the phase runs.
    pub(crate) fn active_message(self) -> &'static str {
        match self {
            Phase::Init => "initializing",
            Phase::Setup => "setting up",
            Phase::Start => "starting up",
            Phase::Ready => "readying up",
        }
    }

    /// Setup only runs on explicit request, so it is announced at info.
    pub(crate) fn is_loud(self) -> bool {
        matches!(self, Phase::Setup)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the orchestrator is. States only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    Configuring,
    LoggingReady,
    Initializing,
    SettingUp,
    EarlyExitCheck,
    ServerObjectsCreated,
    Starting,
    ListenersLive,
    ReadyPhase,
    Serving,
    Exited,
}

/// Tracks the current [`State`] of one bootstrap.
#[derive(Debug)]
pub(crate) struct Progress {
    state: State,
}

impl Progress {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Configuring,
        }
    }

    pub(crate) fn state(&self) -> State {
        self.state
    }

    pub(crate) fn advance(&mut self, next: State) {
        debug_assert!(
            next > self.state,
            "bootstrap state moved backwards: {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(from = ?self.state, to = ?next, "bootstrap state");
        self.state = next;
    }
}
