//! Parley Demo
//!
//! Drives a scripted voice conversation through `ConversationService`:
//! 1. Loads settings from the environment, with CLI overrides.
//! 2. Starts a session and sets the volume while it is still connecting.
//! 3. Logs every status / speaking change and samples volume levels.
//! 4. Ends the session when the script is done or on Ctrl+C.

use anyhow::Context;
use clap::Parser;
use parley_core::{
    ConversationConfig, ConversationService, mock::ScriptedConversationClient,
    settings::ServiceSettings,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::task::Poll;
use std::time::Duration;
use tracing::{error, info};

/// Runs a scripted conversation and logs the mirrored session state.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Agent to converse with (overrides PARLEY_AGENT_ID).
    #[arg(long)]
    agent_id: Option<String>,
    /// Pre-authorized session URL (overrides PARLEY_SIGNED_URL).
    #[arg(long)]
    signed_url: Option<String>,
    /// Output volume applied while the session connects (overrides PARLEY_VOLUME).
    #[arg(long)]
    volume: Option<f32>,
    /// Number of agent/user exchanges in the script.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..=100))]
    turns: u32,
    /// Simulated connection time in milliseconds.
    #[arg(long, default_value_t = 300)]
    connect_delay_ms: u64,
    /// Delay between scripted events in milliseconds.
    #[arg(long, default_value_t = 250)]
    step_delay_ms: u64,
}

/// How long the greeting script plays: five steps per turn plus a final tick.
fn script_duration(step_delay: Duration, turns: u32) -> Option<Duration> {
    step_delay.checked_mul(turns.checked_mul(5)?.checked_add(1)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // --- 1. Load Settings ---
    let mut settings = ServiceSettings::load_env().context("Failed to load settings")?;
    if args.agent_id.is_some() {
        settings.agent_id = args.agent_id.clone();
    }
    if args.signed_url.is_some() {
        settings.signed_url = args.signed_url.clone();
    }
    if args.volume.is_some() {
        settings.volume = args.volume;
    }
    settings.validate().context("Invalid settings")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(settings.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    // --- 3. Build the Service ---
    let step_delay = Duration::from_millis(args.step_delay_ms);
    let client = Arc::new(
        ScriptedConversationClient::greeting(args.turns as usize)
            .with_connect_delay(Duration::from_millis(args.connect_delay_ms))
            .with_step_delay(step_delay),
    );
    let defaults = settings
        .default_config()
        .with_on_connect(|event| info!(conversation_id = %event.conversation_id, "Connected"))
        .with_on_message(|event| info!(source = %event.source, "{}", event.message))
        .with_on_error(|event| error!(details = ?event.details, "{}", event.message))
        .with_on_disconnect(|| info!("Disconnected"));
    let service = Arc::new(ConversationService::new(client, defaults));

    let mut updates = service.subscribe();
    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            info!(
                status = %state.connection_status,
                speaking = state.is_speaking(),
                "Session state changed"
            );
        }
    });

    // --- 4. Start the Session ---
    let audio_bytes = Arc::new(AtomicUsize::new(0));
    let counter = audio_bytes.clone();
    let call = ConversationConfig::new().with_on_audio_data(move |data| {
        counter.fetch_add(data.len(), Ordering::Relaxed);
    });
    let start = service.start_session(call);
    tokio::pin!(start);
    // The first poll registers the pending start, so the volume below is
    // deferred to the session once it connects.
    let polled = futures::poll!(start.as_mut());
    if let Some(volume) = settings.volume {
        info!(volume, "Setting volume while connecting");
        service.set_volume(volume);
    }
    let started = match polled {
        Poll::Ready(result) => result,
        Poll::Pending => start.await,
    };
    started.context("Failed to start conversation")?;

    // --- 5. Sample Levels Until the Script Ends ---
    let script_len = script_duration(step_delay, args.turns)
        .context("Script duration overflows; lower --step-delay-ms")?;
    let sampling = async {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        let deadline = tokio::time::Instant::now() + script_len;
        while tokio::time::Instant::now() < deadline {
            ticker.tick().await;
            info!(
                input = service.input_volume(),
                output = service.output_volume(),
                bins = ?service.output_byte_frequency_data(),
                "Levels"
            );
        }
    };
    tokio::select! {
        _ = sampling => {}
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C. Ending conversation..."),
    }

    // --- 6. Tear Down ---
    service
        .end_session()
        .await
        .context("Failed to end conversation")?;
    watcher.abort();

    info!(
        audio_bytes = audio_bytes.load(Ordering::Relaxed),
        "Demo finished"
    );
    Ok(())
}
