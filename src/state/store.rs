use super::{AppState, PersistencePort, StateError};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// In-memory state backed by a [`PersistencePort`]. Each update is applied to
/// a copy, saved, and only then made visible, so a failed save leaves the
/// state untouched.
pub struct StateStore<P: PersistencePort> {
    port: P,
    state: Mutex<AppState>,
}

impl<P: PersistencePort> StateStore<P> {
    /// Unreadable saved state is replaced by defaults rather than blocking
    /// the app.
    pub async fn open(port: P) -> Result<Self, StateError> {
        let state = match port.load().await {
            Ok(Some(state)) => state,
            Ok(None) => AppState::default(),
            Err(StateError::Json(e)) => {
                warn!(error = %e, "Saved state is corrupt, starting fresh");
                AppState::default()
            }
            Err(e) => return Err(e),
        };
        info!(saved_stories = state.saved_stories.len(), "State loaded");
        Ok(Self {
            port,
            state: Mutex::new(state),
        })
    }

    pub async fn update<F, R>(&self, f: F) -> Result<R, StateError>
    where
        F: FnOnce(&mut AppState) -> R,
    {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let result = f(&mut next);
        self.port.save(&next).await?;
        *guard = next;
        Ok(result)
    }

    pub async fn snapshot(&self) -> AppState {
        self.state.lock().await.clone()
    }

    pub fn port(&self) -> &P {
        &self.port
    }
}
