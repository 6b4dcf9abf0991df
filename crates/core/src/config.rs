//! Conversation configuration layers.
//!
//! Callers build partial [`ConversationConfig`] values; the service merges them
//! (built-in no-ops, constructor defaults, call-time overrides, then its own
//! interceptors) into the fully resolved [`SessionConfig`] handed to the client.

use crate::events::{ConnectEvent, ErrorEvent, MessageEvent, ModeChange, StatusChange};
use bytes::Bytes;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A shared event callback.
pub type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A shared callback without a payload.
pub type Notify = Arc<dyn Fn() + Send + Sync>;

/// A partial conversation configuration. Every field is optional.
#[derive(Clone, Default)]
pub struct ConversationConfig {
    pub agent_id: Option<String>,
    pub signed_url: Option<String>,
    pub on_connect: Option<Callback<ConnectEvent>>,
    pub on_disconnect: Option<Notify>,
    pub on_error: Option<Callback<ErrorEvent>>,
    pub on_debug: Option<Callback<Value>>,
    pub on_message: Option<Callback<MessageEvent>>,
    pub on_status_change: Option<Callback<StatusChange>>,
    pub on_mode_change: Option<Callback<ModeChange>>,
    pub on_audio_data: Option<Callback<Bytes>>,
    /// Client-specific options passed through untouched.
    pub extra: Map<String, Value>,
}

impl ConversationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_signed_url(mut self, signed_url: impl Into<String>) -> Self {
        self.signed_url = Some(signed_url.into());
        self
    }

    pub fn with_on_connect(mut self, f: impl Fn(ConnectEvent) + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    pub fn with_on_disconnect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    pub fn with_on_error(mut self, f: impl Fn(ErrorEvent) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn with_on_debug(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.on_debug = Some(Arc::new(f));
        self
    }

    pub fn with_on_message(mut self, f: impl Fn(MessageEvent) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    pub fn with_on_status_change(
        mut self,
        f: impl Fn(StatusChange) + Send + Sync + 'static,
    ) -> Self {
        self.on_status_change = Some(Arc::new(f));
        self
    }

    pub fn with_on_mode_change(mut self, f: impl Fn(ModeChange) + Send + Sync + 'static) -> Self {
        self.on_mode_change = Some(Arc::new(f));
        self
    }

    pub fn with_on_audio_data(mut self, f: impl Fn(Bytes) + Send + Sync + 'static) -> Self {
        self.on_audio_data = Some(Arc::new(f));
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Overlays `overlay` on top of `self`. Any field set in `overlay` replaces
    /// the one in `self`; `extra` entries are merged key by key.
    pub fn merge(mut self, overlay: ConversationConfig) -> Self {
        self.extra.extend(overlay.extra);
        Self {
            agent_id: overlay.agent_id.or(self.agent_id),
            signed_url: overlay.signed_url.or(self.signed_url),
            on_connect: overlay.on_connect.or(self.on_connect),
            on_disconnect: overlay.on_disconnect.or(self.on_disconnect),
            on_error: overlay.on_error.or(self.on_error),
            on_debug: overlay.on_debug.or(self.on_debug),
            on_message: overlay.on_message.or(self.on_message),
            on_status_change: overlay.on_status_change.or(self.on_status_change),
            on_mode_change: overlay.on_mode_change.or(self.on_mode_change),
            on_audio_data: overlay.on_audio_data.or(self.on_audio_data),
            extra: self.extra,
        }
    }
}

impl fmt::Debug for ConversationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationConfig")
            .field("agent_id", &self.agent_id)
            .field("signed_url", &self.signed_url.as_ref().map(|_| "<redacted>"))
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_debug", &self.on_debug.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_status_change", &self.on_status_change.is_some())
            .field("on_mode_change", &self.on_mode_change.is_some())
            .field("on_audio_data", &self.on_audio_data.is_some())
            .field("extra", &self.extra)
            .finish()
    }
}

/// Where a client should connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionTarget<'a> {
    /// A pre-authorized URL, used as is.
    SignedUrl(&'a str),
    /// A public agent the client resolves itself.
    AgentId(&'a str),
}

/// A fully resolved configuration: every callback is present.
#[derive(Clone)]
pub struct SessionConfig {
    pub agent_id: Option<String>,
    pub signed_url: Option<String>,
    pub on_connect: Callback<ConnectEvent>,
    pub on_disconnect: Notify,
    pub on_error: Callback<ErrorEvent>,
    pub on_debug: Callback<Value>,
    pub on_message: Callback<MessageEvent>,
    pub on_status_change: Callback<StatusChange>,
    pub on_mode_change: Callback<ModeChange>,
    pub on_audio_data: Callback<Bytes>,
    pub extra: Map<String, Value>,
}

impl SessionConfig {
    /// Fills every callback missing from `config` with a no-op.
    pub fn resolve(config: ConversationConfig) -> Self {
        Self {
            agent_id: config.agent_id,
            signed_url: config.signed_url,
            on_connect: config.on_connect.unwrap_or_else(|| Arc::new(|_| {})),
            on_disconnect: config.on_disconnect.unwrap_or_else(|| Arc::new(|| {})),
            on_error: config.on_error.unwrap_or_else(|| Arc::new(|_| {})),
            on_debug: config.on_debug.unwrap_or_else(|| Arc::new(|_| {})),
            on_message: config.on_message.unwrap_or_else(|| Arc::new(|_| {})),
            on_status_change: config.on_status_change.unwrap_or_else(|| Arc::new(|_| {})),
            on_mode_change: config.on_mode_change.unwrap_or_else(|| Arc::new(|_| {})),
            on_audio_data: config.on_audio_data.unwrap_or_else(|| Arc::new(|_| {})),
            extra: config.extra,
        }
    }

    /// The connection target; a signed URL takes precedence over an agent id.
    pub fn target(&self) -> Option<ConnectionTarget<'_>> {
        self.signed_url
            .as_deref()
            .map(ConnectionTarget::SignedUrl)
            .or_else(|| self.agent_id.as_deref().map(ConnectionTarget::AgentId))
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("agent_id", &self.agent_id)
            .field("signed_url", &self.signed_url.as_ref().map(|_| "<redacted>"))
            .field("extra", &self.extra)
            .finish_non_exhaustive()
    }
}
