//! An in-process conversation client for development and integration testing.
//!
//! [`ScriptedConversationClient`] connects instantly (or after a configured
//! delay), then plays a fixed script of events through the session callbacks.
//! Nothing leaves the process, so demos and tests run without credentials.

use crate::{
    client::{ConversationClient, ConversationSession, FrequencyData},
    config::{ConnectionTarget, SessionConfig},
    events::{
        ConnectEvent, ConnectionStatus, ConversationMode, ErrorEvent, MessageEvent, MessageSource,
        ModeChange, StatusChange,
    },
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const FREQUENCY_BINS: usize = 8;

/// One scripted event.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Status(ConnectionStatus),
    Mode(ConversationMode),
    Message(MessageEvent),
    Audio(Bytes),
    Debug(Value),
    Error(ErrorEvent),
    /// Waits before the next step, on top of the per-step delay.
    Pause(Duration),
}

/// A [`ConversationClient`] that replays a script instead of talking to a server.
pub struct ScriptedConversationClient {
    script: Vec<ScriptStep>,
    step_delay: Duration,
    connect_delay: Duration,
    failure: Option<String>,
    start_calls: AtomicUsize,
}

impl ScriptedConversationClient {
    pub fn new(script: Vec<ScriptStep>) -> Self {
        Self {
            script,
            step_delay: Duration::from_millis(250),
            connect_delay: Duration::ZERO,
            failure: None,
            start_calls: AtomicUsize::new(0),
        }
    }

    /// A short exchange: greeting, user reply, answer.
    pub fn greeting(turns: usize) -> Self {
        let mut script = Vec::new();
        for turn in 0..turns {
            script.push(ScriptStep::Mode(ConversationMode::Speaking));
            script.push(ScriptStep::Message(MessageEvent {
                source: MessageSource::Ai,
                message: if turn == 0 {
                    "Hi! How can I help you today?".to_string()
                } else {
                    format!("Here is answer number {}.", turn)
                },
            }));
            script.push(ScriptStep::Audio(Bytes::from(vec![0u8; 320])));
            script.push(ScriptStep::Mode(ConversationMode::Listening));
            script.push(ScriptStep::Message(MessageEvent {
                source: MessageSource::User,
                message: format!("Question {}", turn + 1),
            }));
        }
        Self::new(script)
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Delays establishment, keeping the start pending for `delay`.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Makes every start fail with `message` after the connect delay.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Number of times `start_session` has been called.
    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversationClient for ScriptedConversationClient {
    async fn start_session(&self, config: SessionConfig) -> Result<Arc<dyn ConversationSession>> {
        let call = self.start_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let target = match config.target() {
            Some(ConnectionTarget::SignedUrl(_)) => "signed-url".to_string(),
            Some(ConnectionTarget::AgentId(id)) => id.to_string(),
            None => return Err(anyhow!("Either an agent id or a signed URL is required")),
        };

        emit_status(&config, ConnectionStatus::Connecting);
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }

        if let Some(message) = &self.failure {
            (config.on_error)(ErrorEvent {
                message: message.clone(),
                details: None,
            });
            emit_status(&config, ConnectionStatus::Disconnected);
            return Err(anyhow!("{}", message));
        }

        let conversation_id = format!("scripted-{}", call);
        info!(%conversation_id, %target, "Scripted conversation connected");
        emit_status(&config, ConnectionStatus::Connected);
        (config.on_connect)(ConnectEvent { conversation_id });

        let mode = Arc::new(Mutex::new(ConversationMode::Listening));
        let player = tokio::spawn(play(
            config.clone(),
            self.script.clone(),
            self.step_delay,
            mode.clone(),
        ));

        Ok(Arc::new(ScriptedSession {
            config,
            player: Mutex::new(Some(player)),
            mode,
            volume: Mutex::new(1.0),
            ended: AtomicBool::new(false),
        }))
    }
}

async fn play(
    config: SessionConfig,
    script: Vec<ScriptStep>,
    step_delay: Duration,
    mode: Arc<Mutex<ConversationMode>>,
) {
    for step in script {
        if !step_delay.is_zero() {
            tokio::time::sleep(step_delay).await;
        }
        debug!(?step, "Playing scripted step");
        match step {
            ScriptStep::Status(status) => emit_status(&config, status),
            ScriptStep::Mode(next) => {
                *mode.lock().unwrap_or_else(PoisonError::into_inner) = next.clone();
                (config.on_mode_change)(ModeChange { mode: next });
            }
            ScriptStep::Message(message) => (config.on_message)(message),
            ScriptStep::Audio(data) => (config.on_audio_data)(data),
            ScriptStep::Debug(data) => (config.on_debug)(data),
            ScriptStep::Error(error) => (config.on_error)(error),
            ScriptStep::Pause(pause) => tokio::time::sleep(pause).await,
        }
    }
}

fn emit_status(config: &SessionConfig, status: ConnectionStatus) {
    (config.on_status_change)(StatusChange { status });
}

/// Session returned by [`ScriptedConversationClient`].
pub struct ScriptedSession {
    config: SessionConfig,
    player: Mutex<Option<JoinHandle<()>>>,
    mode: Arc<Mutex<ConversationMode>>,
    volume: Mutex<f32>,
    ended: AtomicBool,
}

impl ScriptedSession {
    fn speaking(&self) -> bool {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner) == ConversationMode::Speaking
    }

    fn volume(&self) -> f32 {
        *self.volume.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn bins(level: f32) -> FrequencyData {
    (0..FREQUENCY_BINS)
        .map(|i| (level * 255.0 / (i + 1) as f32) as u8)
        .collect()
}

#[async_trait]
impl ConversationSession for ScriptedSession {
    async fn end_session(&self) -> Result<()> {
        if self.ended.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(player) = self
            .player
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            player.abort();
        }
        emit_status(&self.config, ConnectionStatus::Disconnecting);
        emit_status(&self.config, ConnectionStatus::Disconnected);
        (self.config.on_disconnect)();
        info!("Scripted conversation ended");
        Ok(())
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock().unwrap_or_else(PoisonError::into_inner) = volume.clamp(0.0, 1.0);
    }

    fn input_byte_frequency_data(&self) -> Option<FrequencyData> {
        Some(bins(self.input_volume()))
    }

    fn output_byte_frequency_data(&self) -> Option<FrequencyData> {
        Some(bins(self.output_volume()))
    }

    fn input_volume(&self) -> f32 {
        if self.speaking() { 0.0 } else { 0.5 }
    }

    fn output_volume(&self) -> f32 {
        if self.speaking() { self.volume() } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversationConfig;

    fn recorded() -> (SessionConfig, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let push = |log: &Arc<Mutex<Vec<String>>>| {
            let log = log.clone();
            move |entry: String| log.lock().unwrap().push(entry)
        };
        let (status, connect, mode, disconnect, error) =
            (push(&log), push(&log), push(&log), push(&log), push(&log));
        let config = ConversationConfig::new()
            .with_agent_id("agent-7")
            .with_on_status_change(move |c| status(format!("status:{}", c.status)))
            .with_on_connect(move |c| connect(format!("connect:{}", c.conversation_id)))
            .with_on_mode_change(move |c| mode(format!("mode:{}", c.mode)))
            .with_on_disconnect(move || disconnect("disconnect".to_string()))
            .with_on_error(move |e| error(format!("error:{}", e.message)));
        (SessionConfig::resolve(config), log)
    }

    #[tokio::test]
    async fn test_start_and_end_emit_lifecycle_events() {
        let client = ScriptedConversationClient::new(vec![]).with_step_delay(Duration::ZERO);
        let (config, log) = recorded();

        let session = client.start_session(config).await.unwrap();
        session.end_session().await.unwrap();
        session.end_session().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "status:connecting",
                "status:connected",
                "connect:scripted-1",
                "status:disconnecting",
                "status:disconnected",
                "disconnect",
            ]
        );
        assert_eq!(client.start_calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_client_reports_error() {
        let client = ScriptedConversationClient::new(vec![]).failing("quota exceeded");
        let (config, log) = recorded();

        let err = client.start_session(config).await.err().unwrap();
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["status:connecting", "error:quota exceeded", "status:disconnected"]
        );
    }

    #[tokio::test]
    async fn test_missing_target_is_rejected() {
        let client = ScriptedConversationClient::new(vec![]);
        let config = SessionConfig::resolve(ConversationConfig::new());
        assert!(client.start_session(config).await.is_err());
    }

    #[tokio::test]
    async fn test_telemetry_follows_mode_and_volume() {
        let client = ScriptedConversationClient::new(vec![ScriptStep::Mode(
            ConversationMode::Speaking,
        )])
        .with_step_delay(Duration::ZERO);
        let (config, _log) = recorded();

        let session = client.start_session(config).await.unwrap();
        session.set_volume(1.5);
        while session.output_volume() == 0.0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(session.output_volume(), 1.0);
        assert_eq!(session.input_volume(), 0.0);
        let bins = session.output_byte_frequency_data().unwrap();
        assert_eq!(bins.len(), FREQUENCY_BINS);
        assert_eq!(bins[0], 255);
    }
}
