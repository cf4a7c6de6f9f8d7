//! Per-user conversational state.
//!
//! Each user is in exactly one [`SessionState`]. A missing entry means
//! [`SessionState::Idle`]. State lives in process memory only.

use std::collections::HashMap;

use tokio::sync::Mutex;

use souq_shared::UserId;

use crate::payload::Prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingBroadcastBody,
    AwaitingNewAdminId,
    AwaitingAdminToRemove,
    AwaitingTicketBody,
}

impl SessionState {
    /// The prompt shown on entering this state.
    pub fn prompt(self) -> Option<Prompt> {
        match self {
            SessionState::Idle => None,
            SessionState::AwaitingBroadcastBody => Some(Prompt::BroadcastBody),
            SessionState::AwaitingNewAdminId => Some(Prompt::NewAdminId),
            SessionState::AwaitingAdminToRemove => Some(Prompt::AdminToRemove),
            SessionState::AwaitingTicketBody => Some(Prompt::TicketBody),
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    states: Mutex<HashMap<UserId, SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: UserId) -> SessionState {
        self.states
            .lock()
            .await
            .get(&user_id)
            .copied()
            .unwrap_or_default()
    }

    /// Enter an awaiting state, replacing whatever was pending.
    pub async fn begin(&self, user_id: UserId, state: SessionState) {
        let mut states = self.states.lock().await;
        if state == SessionState::Idle {
            states.remove(&user_id);
        } else {
            tracing::debug!(user_id = %user_id, ?state, "session awaiting input");
            states.insert(user_id, state);
        }
    }

    /// Remove and return the pending state, leaving the user idle.
    pub async fn take(&self, user_id: UserId) -> SessionState {
        self.states
            .lock()
            .await
            .remove(&user_id)
            .unwrap_or_default()
    }

    /// Drop any pending state. Returns `true` if one was pending.
    pub async fn clear(&self, user_id: UserId) -> bool {
        let cleared = self.states.lock().await.remove(&user_id).is_some();
        if cleared {
            tracing::debug!(user_id = %user_id, "pending session dropped");
        }
        cleared
    }
}
