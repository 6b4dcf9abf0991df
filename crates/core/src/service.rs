//! Conversation service
//!
//! [`ConversationService`] owns at most one conversation session at a time. It
//! merges configuration layers, mirrors connection status and speaking mode
//! into observable state, and forwards volume and telemetry calls to the live
//! session.

use crate::{
    client::{ConversationClient, ConversationSession, FrequencyData},
    config::{ConversationConfig, SessionConfig},
    error::SessionError,
    events::ConnectionStatus,
    state::{ServiceState, StateCell},
};
use anyhow::anyhow;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{Instrument, debug, info, instrument, warn};

type StartResult = Result<Arc<dyn ConversationSession>, Arc<anyhow::Error>>;
type PendingSession = Shared<BoxFuture<'static, StartResult>>;

#[derive(Default)]
struct Slots {
    active: Option<Arc<dyn ConversationSession>>,
    pending: Option<PendingSession>,
}

fn lock(slots: &Mutex<Slots>) -> MutexGuard<'_, Slots> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session lifecycle wrapper around a [`ConversationClient`].
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct ConversationService {
    client: Arc<dyn ConversationClient>,
    defaults: ConversationConfig,
    slots: Arc<Mutex<Slots>>,
    state: StateCell,
}

impl ConversationService {
    /// Creates a service whose sessions start from `defaults`.
    pub fn new(client: Arc<dyn ConversationClient>, defaults: ConversationConfig) -> Self {
        Self {
            client,
            defaults,
            slots: Arc::new(Mutex::new(Slots::default())),
            state: StateCell::new(),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        lock(&self.slots)
    }

    /// Starts a session, or returns the one already live or being established.
    ///
    /// `config` only applies when this call actually starts a new session.
    /// While another start is in flight the caller shares its outcome.
    ///
    /// The client call runs on its own Tokio task, which stores the session
    /// and clears the pending slot when it finishes. Dropping or aborting a
    /// caller never orphans a session the client went on to establish.
    #[instrument(skip_all)]
    pub async fn start_session(
        &self,
        config: ConversationConfig,
    ) -> Result<Arc<dyn ConversationSession>, SessionError> {
        let pending = {
            let mut slots = self.slots();
            if let Some(session) = &slots.active {
                debug!("Session already active; reusing it");
                return Ok(session.clone());
            }
            match slots.pending.clone() {
                Some(pending) => {
                    debug!("Session start already in flight; awaiting it");
                    pending
                }
                None => {
                    info!("Starting conversation session");
                    let merged = SessionConfig::resolve(self.layered_config(config));
                    let pending = spawn_start(self.client.clone(), self.slots.clone(), merged);
                    slots.pending = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await.map_err(SessionError::Start)
    }

    /// Ends the active session, if any.
    ///
    /// The handle is forgotten before the client is asked to end it, so a
    /// concurrent [`start_session`](Self::start_session) never sees a session
    /// that is being torn down. A start still in flight is left alone and will
    /// install its session once it completes.
    #[instrument(skip_all)]
    pub async fn end_session(&self) -> Result<(), SessionError> {
        let session = {
            let mut slots = self.slots();
            if slots.active.is_none() && slots.pending.is_some() {
                warn!("end_session called while a session start is in flight; it will not be ended");
            }
            slots.active.take()
        };
        let Some(session) = session else {
            return Ok(());
        };

        info!("Ending conversation session");
        session.end_session().await.map_err(SessionError::End)
    }

    /// Sets the output volume on the live session, and on the in-flight one
    /// once it resolves. Without either, the call is dropped.
    pub fn set_volume(&self, volume: f32) {
        let (pending, active) = {
            let slots = self.slots();
            (slots.pending.clone(), slots.active.clone())
        };
        if let Some(pending) = pending {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move {
                        if let Ok(session) = pending.await {
                            session.set_volume(volume);
                        }
                    });
                }
                Err(_) => warn!("No Tokio runtime; volume for the pending session was dropped"),
            }
        }
        if let Some(session) = active {
            session.set_volume(volume);
        }
    }

    fn active(&self) -> Option<Arc<dyn ConversationSession>> {
        self.slots().active.clone()
    }

    pub fn input_byte_frequency_data(&self) -> Option<FrequencyData> {
        self.active()?.input_byte_frequency_data()
    }

    pub fn output_byte_frequency_data(&self) -> Option<FrequencyData> {
        self.active()?.output_byte_frequency_data()
    }

    /// Microphone level, or `0.0` without a session.
    pub fn input_volume(&self) -> f32 {
        self.active().map_or(0.0, |s| s.input_volume())
    }

    /// Agent output level, or `0.0` without a session.
    pub fn output_volume(&self) -> f32 {
        self.active().map_or(0.0, |s| s.output_volume())
    }

    /// The last connection status reported by the client.
    pub fn status(&self) -> ConnectionStatus {
        self.state.read(|s| s.connection_status.clone())
    }

    pub fn is_speaking(&self) -> bool {
        self.state.read(ServiceState::is_speaking)
    }

    pub fn state(&self) -> ServiceState {
        self.state.snapshot()
    }

    /// Observes state changes as the client reports them.
    pub fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.state.subscribe()
    }

    pub fn has_session(&self) -> bool {
        self.slots().active.is_some()
    }

    pub fn is_starting(&self) -> bool {
        self.slots().pending.is_some()
    }

    /// Stacks the constructor defaults, the call-time config and the
    /// interceptors that mirror state and fan out to both user callbacks.
    fn layered_config(&self, call: ConversationConfig) -> ConversationConfig {
        let defaults = &self.defaults;

        let mode_state = self.state.clone();
        let mode_handlers = [defaults.on_mode_change.clone(), call.on_mode_change.clone()];
        let status_state = self.state.clone();
        let status_handlers = [
            defaults.on_status_change.clone(),
            call.on_status_change.clone(),
        ];
        let audio_handlers = [defaults.on_audio_data.clone(), call.on_audio_data.clone()];

        let interceptors = ConversationConfig::new()
            .with_on_mode_change(move |change| {
                mode_state.set_mode(change.mode.clone());
                for handler in mode_handlers.iter().flatten() {
                    handler(change.clone());
                }
            })
            .with_on_status_change(move |change| {
                status_state.set_status(change.status.clone());
                for handler in status_handlers.iter().flatten() {
                    handler(change.clone());
                }
            })
            .with_on_audio_data(move |data| {
                for handler in audio_handlers.iter().flatten() {
                    handler(data.clone());
                }
            });

        debug!(defaults = ?defaults, call = ?call, "Merging conversation config");
        defaults.clone().merge(call).merge(interceptors)
    }
}

/// Runs the client start on a background task. The task, not the callers,
/// installs the session and clears the pending slot, so both happen exactly
/// once whatever the callers do.
fn spawn_start(
    client: Arc<dyn ConversationClient>,
    slots: Arc<Mutex<Slots>>,
    config: SessionConfig,
) -> PendingSession {
    let task = tokio::spawn(async move {
        let result = AssertUnwindSafe(async move { client.start_session(config).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(anyhow!("Conversation client panicked while starting")))
            .map_err(Arc::new);

        let mut guard = lock(&slots);
        match &result {
            Ok(session) => {
                guard.active = Some(session.clone());
                info!("Conversation session established");
            }
            Err(e) => warn!(error = %e, "Conversation session failed to start"),
        }
        guard.pending = None;
        result
    }
    .in_current_span());

    async move {
        task.await.unwrap_or_else(|e| {
            Err(Arc::new(anyhow!("Session start task did not complete: {}", e)))
        })
    }
    .boxed()
    .shared()
}
