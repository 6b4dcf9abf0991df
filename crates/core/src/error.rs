use std::sync::Arc;

/// Failures surfaced by [`crate::service::ConversationService`].
///
/// Calls made without a session are never errors; only the client's own
/// start and end operations can fail.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The client failed to establish the session. Every caller awaiting the
    /// same start receives the same shared error.
    #[error("Failed to start conversation session: {0:#}")]
    Start(Arc<anyhow::Error>),
    /// The client failed to end the session. The service has already
    /// forgotten the handle by the time this is returned.
    #[error("Failed to end conversation session: {0:#}")]
    End(anyhow::Error),
}
