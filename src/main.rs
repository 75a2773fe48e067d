//! Demo entry point: two windows following a simulated backend.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`ClientConfig`] from disk (returns default on first run).
//! 3. Build the [`Localizer`] and add any user catalogs.
//! 4. Create the [`tokio`] runtime.
//! 5. Open a main and an overlay [`WindowContext`] on one [`EventEmitter`].
//! 6. Run one successful dictation, then one that fails, pumping both windows
//!    at frame rate while each command is in flight.
//! 7. Page the history, then close both windows.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use voiceflow_client::{
    audio::{MeterStyle, WaveformBars},
    backend::{CommandError, SimulatedBackend},
    config::{AppPaths, ClientConfig},
    events::EventEmitter,
    i18n::Localizer,
    notify::LogNotifier,
    pipeline::{PipelineProjection, PipelineState},
    settings::SettingKey,
    window::{WindowContext, WindowDeps, WindowRole},
};

/// Frame interval of the simulated renderers (~30 fps).
const FRAME: Duration = Duration::from_millis(33);

/// Pause between backend stages so every state is visible.
const STEP_DELAY: Duration = Duration::from_millis(150);

/// How long the demo "speaks" before stopping.
const SPEAKING: Duration = Duration::from_millis(400);

// ---------------------------------------------------------------------------
// Frame loop
// ---------------------------------------------------------------------------

/// What the two renderers last drew, to log only changes.
#[derive(Default)]
struct Frames {
    main: PipelineState,
    overlay: PipelineState,
}

/// One frame: apply pending events in both windows and "render" them.
async fn frame(main: &mut WindowContext, overlay: &mut WindowContext, drawn: &mut Frames) {
    main.drain();
    overlay.drain();

    let state = main.pipeline().current_state();
    if state != drawn.main {
        let label = main.translate(state.label_key(), &[]);
        log::info!("[main]    {state:<12} {label}");
        drawn.main = state;
    }

    let state = overlay.pipeline().current_state();
    if state != drawn.overlay {
        let label = if state.is_processing() {
            overlay.translate("overlay.processing", &[])
        } else {
            overlay.translate(state.label_key(), &[])
        };
        log::info!("[overlay] {state:<12} {label}");
        drawn.overlay = state;
    }
    if state == PipelineState::Recording {
        let bars = WaveformBars::from_levels(&overlay.level_snapshot(), &MeterStyle::default());
        log::debug!("[overlay] bars {:?}", bars.heights_px);
    }

    main.flush_notifications().await;
}

/// Pump frames until `task` finishes, then return its outcome.
async fn drive(
    main: &mut WindowContext,
    overlay: &mut WindowContext,
    drawn: &mut Frames,
    task: JoinHandle<Result<(), CommandError>>,
) -> Result<(), CommandError> {
    let mut ticker = tokio::time::interval(FRAME);
    while !task.is_finished() {
        ticker.tick().await;
        frame(main, overlay, drawn).await;
    }
    frame(main, overlay, drawn).await;
    task.await
        .map_err(|e| CommandError::Unreachable(format!("command task failed: {e}")))?
}

/// Pump frames for `duration`.
async fn idle_for(
    main: &mut WindowContext,
    overlay: &mut WindowContext,
    drawn: &mut Frames,
    duration: Duration,
) {
    let deadline = tokio::time::Instant::now() + duration;
    let mut ticker = tokio::time::interval(FRAME);
    while tokio::time::Instant::now() < deadline {
        ticker.tick().await;
        frame(main, overlay, drawn).await;
    }
}

/// Record, speak, stop: the full push-to-talk cycle as the main window's
/// record button drives it.
async fn dictation_cycle(
    main: &mut WindowContext,
    overlay: &mut WindowContext,
    drawn: &mut Frames,
) -> Result<(), CommandError> {
    let pipeline: Arc<PipelineProjection> = Arc::clone(main.pipeline());
    let start = tokio::spawn(async move { pipeline.request_start().await });
    drive(main, overlay, drawn, start).await?;

    idle_for(main, overlay, drawn, SPEAKING).await;

    let pipeline = Arc::clone(main.pipeline());
    let stop = tokio::spawn(async move { pipeline.request_stop_and_process().await });
    drive(main, overlay, drawn, stop).await
}

// ---------------------------------------------------------------------------
// Demo
// ---------------------------------------------------------------------------

async fn run_demo(config: ClientConfig, localizer: Localizer) -> Result<()> {
    let emitter = EventEmitter::new(config.events.channel_capacity);
    let backend = Arc::new(
        SimulatedBackend::new(emitter.clone())
            .with_step_delay(STEP_DELAY)
            .with_api_key("gsk_demo")
            .with_setting(SettingKey::UiLanguage.as_str(), &config.i18n.default_language),
    );
    let deps = WindowDeps {
        backend: backend.clone(),
        localizer: Arc::new(localizer),
        notifier: Arc::new(LogNotifier),
    };

    let mut main = WindowContext::open(WindowRole::Main, &emitter, deps.clone(), &config).await;
    let mut overlay = WindowContext::open(WindowRole::Overlay, &emitter, deps, &config).await;
    let mut drawn = Frames::default();

    log::info!(
        "settings: stt={} llm={} hotkey={} api key stored={}",
        main.settings().get(SettingKey::SttModel),
        main.settings().get(SettingKey::LlmModel),
        main.settings().get(SettingKey::HotkeyBinding),
        main.settings().has_secret()
    );

    // 1. Successful dictation.
    if let Err(e) = dictation_cycle(&mut main, &mut overlay, &mut drawn).await {
        log::error!("dictation failed: {e}");
    }
    if let Some(result) = main.pipeline().last_result() {
        log::info!(
            "result: '{}' (stt {}ms, llm {}ms)",
            result.refined_text,
            result.stt_latency_ms,
            result.llm_latency_ms
        );
    }

    // 2. A run the backend rejects half-way.
    backend.fail_next_run("network timeout");
    if let Err(e) = dictation_cycle(&mut main, &mut overlay, &mut drawn).await {
        log::info!("second dictation rejected as expected: {e}");
    }
    log::info!(
        "after failure: main={} overlay={} last error={:?}",
        main.pipeline().current_state(),
        overlay.pipeline().current_state(),
        main.pipeline().last_error()
    );

    // 3. History pass-through.
    let page = main.load_history_page().await?;
    for item in &page {
        log::info!("history {}: {} ({} words)", item.id, item.refined_text, item.word_count);
    }
    let cost = main.estimated_cost().await?;
    let amount = format!("{cost:.4}");
    let count = page.len().to_string();
    log::info!(
        "{}",
        main.translate("dashboard.cost", &[("amount", &amount), ("count", &count)])
    );

    overlay.close();
    main.close();
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voiceflow-client starting up");

    // 2. Configuration
    let config = ClientConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        ClientConfig::default()
    });

    // 3. Catalogs
    let mut localizer = Localizer::builtin_with_default(&config.i18n.default_language);
    if let Err(e) = localizer.load_dir(&AppPaths::new().locales_dir) {
        log::warn!("Failed to read user catalogs ({e}); using built-ins only");
    }
    log::info!("ui languages: {}", localizer.supported_languages().join(", "));

    // 4. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    // 5-7. Windows + demo cycles
    rt.block_on(run_demo(config, localizer))
}
