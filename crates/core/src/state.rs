//! Observable session state mirrored from client events.

use crate::events::{ConnectionStatus, ConversationMode};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// The two values the service mirrors from its conversation client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceState {
    pub connection_status: ConnectionStatus,
    pub conversation_mode: ConversationMode,
}

impl ServiceState {
    pub fn status(&self) -> &ConnectionStatus {
        &self.connection_status
    }

    pub fn is_speaking(&self) -> bool {
        self.conversation_mode == ConversationMode::Speaking
    }
}

/// Single-writer cell for [`ServiceState`]. Observers subscribe to a watch
/// channel and are woken only when a value actually changes.
#[derive(Clone)]
pub(crate) struct StateCell {
    tx: Arc<watch::Sender<ServiceState>>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(ServiceState::default());
        Self { tx: Arc::new(tx) }
    }

    pub(crate) fn snapshot(&self) -> ServiceState {
        self.tx.borrow().clone()
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&ServiceState) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.tx.subscribe()
    }

    pub(crate) fn set_status(&self, status: ConnectionStatus) {
        self.tx.send_if_modified(|state| {
            if state.connection_status == status {
                return false;
            }
            debug!(from = %state.connection_status, to = %status, "Connection status changed");
            state.connection_status = status;
            true
        });
    }

    pub(crate) fn set_mode(&self, mode: ConversationMode) {
        self.tx.send_if_modified(|state| {
            if state.conversation_mode == mode {
                return false;
            }
            debug!(from = %state.conversation_mode, to = %mode, "Conversation mode changed");
            state.conversation_mode = mode;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let cell = StateCell::new();
        let state = cell.snapshot();
        assert_eq!(state.status(), &ConnectionStatus::Disconnected);
        assert!(!state.is_speaking());
    }

    #[test]
    fn test_subscribers_see_changes_only() {
        let cell = StateCell::new();
        let mut rx = cell.subscribe();

        cell.set_mode(ConversationMode::Listening);
        assert!(!rx.has_changed().unwrap());

        cell.set_mode(ConversationMode::Speaking);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_speaking());

        cell.set_status(ConnectionStatus::Other("reconnecting".into()));
        assert_eq!(
            rx.borrow_and_update().connection_status.as_str(),
            "reconnecting"
        );
    }

    #[test]
    fn test_writes_land_without_subscribers() {
        let cell = StateCell::new();
        cell.set_status(ConnectionStatus::Connected);
        assert!(cell.read(|s| s.connection_status == ConnectionStatus::Connected));
    }
}
