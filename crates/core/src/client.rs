//! The contract expected from the underlying voice conversation client.
//!
//! Transport, audio capture and playback live behind these traits. A concrete
//! client (WebSocket, WebRTC, or the in-process [`crate::mock`] client) owns
//! the actual session and drives the callbacks carried in [`SessionConfig`].

use crate::config::SessionConfig;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Byte frequency bins for audio visualization, one byte per bin.
pub type FrequencyData = Vec<u8>;

/// Establishes conversation sessions.
///
/// Implementations must invoke the callbacks on the supplied config for the
/// lifetime of the session they return.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationClient: Send + Sync {
    /// Connects to the agent described by `config` and returns a live session.
    async fn start_session(&self, config: SessionConfig) -> Result<Arc<dyn ConversationSession>>;
}

/// A live conversation established by a [`ConversationClient`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationSession: Send + Sync {
    /// Tears the conversation down.
    async fn end_session(&self) -> Result<()>;

    /// Sets the output volume, `0.0..=1.0`.
    fn set_volume(&self, volume: f32);

    fn input_byte_frequency_data(&self) -> Option<FrequencyData>;

    fn output_byte_frequency_data(&self) -> Option<FrequencyData>;

    fn input_volume(&self) -> f32;

    fn output_volume(&self) -> f32;
}
