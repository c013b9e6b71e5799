use std::sync::{Arc, Mutex};

use manga_core::{update, ShutdownEffect, ShutdownMsg, ShutdownState};
use manga_logging::{manga_error, manga_info, manga_warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Shared view of the shutdown state machine.
///
/// Clones observe the same state. The cancellation token fires once, when the
/// first interrupt halts scheduling.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<ShutdownState>,
    halted: CancellationToken,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ShutdownState {
        *self.lock()
    }

    pub fn accepts_new_tasks(&self) -> bool {
        self.state().accepts_new_tasks()
    }

    /// Requests a stop. Returns `true` if this call halted scheduling,
    /// `false` when a stop was already under way.
    pub fn interrupt(&self) -> bool {
        self.apply(ShutdownMsg::Interrupt)
            .contains(&ShutdownEffect::HaltScheduling)
    }

    pub(crate) fn begin_drain(&self, in_flight: usize) {
        manga_info!("Stop requested; waiting for {} in-flight download(s)", in_flight);
        self.apply(ShutdownMsg::DrainStarted { in_flight });
    }

    pub(crate) fn finish_drain(&self) {
        self.apply(ShutdownMsg::Drained);
    }

    /// Resolves once scheduling has been halted.
    pub async fn stop_requested(&self) {
        self.inner.halted.cancelled().await;
    }

    fn apply(&self, msg: ShutdownMsg) -> Vec<ShutdownEffect> {
        let effects = {
            let mut state = self.lock();
            let (next, effects) = update(*state, msg);
            *state = next;
            effects
        };
        for effect in &effects {
            match effect {
                ShutdownEffect::HaltScheduling => {
                    manga_warn!("Interrupt received; no new downloads will start");
                    self.inner.halted.cancel();
                }
                ShutdownEffect::IgnoredInterrupt => {
                    manga_warn!("Already stopping; interrupt ignored");
                }
                ShutdownEffect::Exit => manga_info!("All in-flight downloads settled"),
            }
        }
        effects
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ShutdownState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Forwards every Ctrl-C to `handle` until the task is aborted.
pub fn listen_for_interrupts(handle: ShutdownHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(err) = tokio::signal::ctrl_c().await {
                manga_error!("Cannot listen for Ctrl-C: {}", err);
                return;
            }
            handle.interrupt();
        }
    })
}
