use std::time::{Duration, Instant};

use kb_core::{update, AppState, AppViewModel, Msg};
use kb_engine::EngineHandle;
use kb_logging::kb_debug;

use crate::effects::EffectRunner;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Drives the upload screen: core state on this thread, effects on the engine.
pub struct UploadApp {
    state: AppState,
    runner: EffectRunner,
}

impl UploadApp {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            state: AppState::new(),
            runner: EffectRunner::new(engine),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    /// Applies `msg`, runs its effects and reports whether the view changed.
    pub fn dispatch(&mut self, msg: Msg) -> bool {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        self.state = state;
        self.runner.enqueue(effects);
        was_dirty
    }

    /// History is installed and no in-flight item is pending, uploading or processing.
    pub fn is_settled(&self) -> bool {
        self.state.history_source().is_some() && !self.state.has_unsettled_items()
    }

    /// Pumps engine events until settled or `max_wait` elapses; returns whether it settled.
    pub fn run_until_settled(
        &mut self,
        max_wait: Duration,
        mut on_change: impl FnMut(&AppViewModel),
    ) -> bool {
        let deadline = Instant::now() + max_wait;
        while !self.is_settled() {
            let now = Instant::now();
            if now >= deadline {
                kb_debug!("Gave up waiting with uploads still in flight");
                return false;
            }
            let wait = POLL_INTERVAL.min(deadline - now);
            let Some(msg) = self.runner.next_msg(wait) else {
                continue;
            };
            if self.dispatch(msg) {
                on_change(&self.state.view());
            }
        }
        true
    }
}
