//! Parley Core
//!
//! Wraps a real-time voice conversation client behind a single
//! [`ConversationService`]: one session at a time, layered callback
//! configuration, observable connection status and speaking mode, and
//! passthrough volume and telemetry calls.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod mock;
pub mod service;
pub mod settings;
pub mod state;

pub use client::{ConversationClient, ConversationSession, FrequencyData};
pub use config::{ConversationConfig, SessionConfig};
pub use error::SessionError;
pub use events::{ConnectionStatus, ConversationMode};
pub use service::ConversationService;
pub use state::ServiceState;
