/// Lifecycle of one run with respect to stop requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownState {
    #[default]
    Running,
    /// An interrupt arrived; no new tasks may start.
    StopRequested,
    /// Waiting for in-flight tasks to settle.
    Draining,
    Stopped,
}

impl ShutdownState {
    pub fn accepts_new_tasks(self) -> bool {
        self == ShutdownState::Running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMsg {
    /// External interrupt (Ctrl-C or a test driving the machine).
    Interrupt,
    /// Workers noticed the stop; `in_flight` tasks are still running.
    DrainStarted { in_flight: usize },
    /// Every worker has exited.
    Drained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownEffect {
    HaltScheduling,
    /// The interrupt arrived after the first one and changes nothing.
    IgnoredInterrupt,
    Exit,
}

/// Pure update function: applies a message to the shutdown state and returns any effects.
pub fn update(state: ShutdownState, msg: ShutdownMsg) -> (ShutdownState, Vec<ShutdownEffect>) {
    use ShutdownState::*;

    match (state, msg) {
        (Running, ShutdownMsg::Interrupt) => (StopRequested, vec![ShutdownEffect::HaltScheduling]),
        (_, ShutdownMsg::Interrupt) => (state, vec![ShutdownEffect::IgnoredInterrupt]),
        (StopRequested, ShutdownMsg::DrainStarted { .. }) => (Draining, Vec::new()),
        (StopRequested | Draining, ShutdownMsg::Drained) => (Stopped, vec![ShutdownEffect::Exit]),
        _ => (state, Vec::new()),
    }
}
