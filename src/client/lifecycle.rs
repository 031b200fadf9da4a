use super::connection::Shared;
use super::state::ManagerState;
use crate::types::{AppState, BACKGROUND_GRACE_PERIOD, ConnectionStatus};
use std::sync::Arc;

impl Shared {
    /// Reacts to a host foreground/background transition
    pub fn on_app_state(self: &Arc<Self>, state: &mut ManagerState, next: AppState) {
        match next {
            AppState::Background => {
                if state.app_state == AppState::Background {
                    return;
                }
                state.app_state = AppState::Background;
                tracing::debug!(
                    "App moved to background, closing in {:?} unless it returns",
                    BACKGROUND_GRACE_PERIOD
                );

                let shared = Arc::downgrade(self);
                state
                    .background_timer
                    .arm_once(BACKGROUND_GRACE_PERIOD, async move {
                        let Some(shared) = shared.upgrade() else {
                            return;
                        };
                        let mut state = shared.state.write().await;
                        state.background_timer.release();
                        if state.app_state != AppState::Background {
                            return;
                        }
                        tracing::warn!("App still in background after grace period");
                        shared.close_manually(&mut state, "app backgrounded");
                    });
            }
            AppState::Active => {
                state.app_state = AppState::Active;
                state.background_timer.cancel();

                if state.status == ConnectionStatus::Disconnected && state.config.is_some() {
                    tracing::info!("App returned to foreground, reconnecting");
                    state.manual_disconnect = false;
                    state.reconnect_attempts = 0;
                    state.reconnect_timer.cancel();
                    self.open_connection(state);
                }
            }
            AppState::Inactive => {
                tracing::trace!("Ignoring transitional inactive state");
            }
        }
    }
}
