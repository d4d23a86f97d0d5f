//! Binary entry point: CLI, logging, config load, and the
//! capture -> chunker -> VAD -> STT -> GEC -> keystroke-sink pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use talkie_audio::{AudioCapture, AudioChunker, ChunkerConfig, DeviceManager, ResamplerQuality};
use talkie_foundation::{AppState, HealthMonitor, Settings, ShutdownHandler, StateManager};
use talkie_gec::{
    GecPipeline, GecStageToggles, HomophoneCorrector, HomophoneDictionary, GrammarConfig,
    GrammarCorrector, OrtMaskedLm, PunctCapRestorer, Seq2seqGrammarRewriter,
};
use talkie_gec::punctcap::OrtPunctCapModel;
use talkie_nn::{Device, GraphModel, NnRuntimeCore, Seq2seqTranslator, TranslateOptions, WordPieceTokenizer};
use talkie_stt::{EngineOptions, Model, Recognizer};
use talkie_vad::engine::{AdaptiveVad, VadEngine};
use talkie_vad::types::{VadConfig, VadEvent};

use talkie_app::keystroke::{KeystrokeSink, LoggingKeystrokeSink};
use talkie_app::{state_file, tui};

type AppGecPipeline = GecPipeline<OrtMaskedLm, OrtPunctCapModel, Seq2seqGrammarRewriter>;

#[derive(Parser, Debug)]
#[command(name = "talkie", about = "Self-hosted dictation: capture, VAD, STT, GEC, keystroke injection")]
struct Cli {
    /// List input devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Override the configured speech engine.
    #[arg(long, value_parser = ["vosk", "sherpa"])]
    engine: Option<String>,

    /// Override the configured input device name.
    #[arg(long)]
    device: Option<String>,

    /// Disable the grammar-rewrite GEC stage regardless of config.
    #[arg(long)]
    no_gec_grammar: bool,

    /// Path to an explicit config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Launch the terminal dashboard instead of running headless.
    #[arg(long)]
    tui: bool,
}

fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    std::fs::create_dir_all("logs").ok();
    let file_appender = tracing_appender::rolling::RollingFileAppender::new(
        tracing_appender::rolling::Rotation::DAILY,
        "logs",
        "talkie.log",
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn prune_old_logs(retention_days: u64) {
    if retention_days == 0 {
        return;
    }
    let Ok(entries) = std::fs::read_dir("logs") else {
        return;
    };
    let cutoff = std::time::SystemTime::now() - Duration::from_secs(retention_days * 86_400);
    for entry in entries.flatten() {
        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                if modified < cutoff {
                    let _ = std::fs::remove_file(entry.path());
                }
            }
        }
    }
}

/// Builds the GEC pipeline from env-var-resolved model/dictionary
/// paths, mirroring the vosk backend's `VOSK_MODEL_PATH` convention.
/// Missing or unloadable models are logged and degrade to `None`
/// rather than failing the whole process — GEC is an enhancement
/// layer, not required for dictation to function.
fn build_gec_pipeline(toggles: GecStageToggles, max_levenshtein_fraction: Option<f32>) -> Option<AppGecPipeline> {
    let vocab_path = std::env::var("TALKIE_GEC_VOCAB").ok()?;
    let tokenizer = WordPieceTokenizer::from_vocab_file(std::path::Path::new(&vocab_path)).ok()?;
    let tokenizer2 = WordPieceTokenizer::from_vocab_file(std::path::Path::new(&vocab_path)).ok()?;
    let tokenizer3 = WordPieceTokenizer::from_vocab_file(std::path::Path::new(&vocab_path)).ok()?;

    let core = NnRuntimeCore::new();

    let homophone_model_path = std::env::var("TALKIE_GEC_HOMOPHONE_MODEL").ok()?;
    let homophone_dict_path = std::env::var("TALKIE_GEC_HOMOPHONE_DICT").ok()?;
    let mlm_graph = GraphModel::load(std::path::Path::new(&homophone_model_path), Device::Cpu, core.clone()).ok()?;
    let dict = HomophoneDictionary::from_json_file(std::path::Path::new(&homophone_dict_path)).ok()?;
    let homophone = HomophoneCorrector::new(tokenizer, dict, OrtMaskedLm::new(mlm_graph));

    let punctcap_model_path = std::env::var("TALKIE_GEC_PUNCTCAP_MODEL").ok()?;
    let punctcap_graph = GraphModel::load(std::path::Path::new(&punctcap_model_path), Device::Cpu, core.clone()).ok()?;
    let punctcap = PunctCapRestorer::new(tokenizer2, OrtPunctCapModel::new(punctcap_graph));

    let grammar_dir = std::env::var("TALKIE_GEC_GRAMMAR_DIR").ok()?;
    let translator = Seq2seqTranslator::load(std::path::Path::new(&grammar_dir), tokenizer3, core).ok()?;
    let grammar_config = GrammarConfig {
        enabled: toggles.grammar,
        max_levenshtein_fraction,
    };
    let grammar = GrammarCorrector::new(Seq2seqGrammarRewriter::new(translator, TranslateOptions::default()), grammar_config);

    Some(GecPipeline::new(
        homophone,
        punctcap,
        grammar,
        toggles,
        talkie_telemetry::GecStageMetrics::new(),
    ))
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let _log_guard = init_logging();
    let retention_days: u64 = std::env::var("TALKIE_LOG_RETENTION_DAYS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(7);
    prune_old_logs(retention_days);

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::from_path(path).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to load config, using defaults");
            Settings::default()
        }),
        None => Settings::new().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to discover config, using defaults");
            Settings::default()
        }),
    };

    if let Some(engine) = &cli.engine {
        settings.engine.speech_engine = engine.clone();
    }
    if let Some(device) = &cli.device {
        settings.audio.input_device = device.clone();
    }
    if cli.no_gec_grammar {
        settings.gec.gec_grammar = false;
    }

    if let Err(e) = settings.validate() {
        tracing::error!(error = %e, "invalid configuration");
        return std::process::ExitCode::FAILURE;
    }

    if cli.list_devices {
        let manager = match DeviceManager::new() {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(error = %e, "failed to open audio host");
                return std::process::ExitCode::FAILURE;
            }
        };
        for device in manager.list_devices() {
            println!(
                "{}{} ({} ch @ {} Hz)",
                if device.is_default { "* " } else { "  " },
                device.name,
                device.max_input_channels,
                device.default_sample_rate
            );
        }
        return std::process::ExitCode::SUCCESS;
    }

    let state = Arc::new(StateManager::new());
    state.transition(AppState::Running).unwrap();

    let health = HealthMonitor::new(Duration::from_secs(10));
    let health_handle = health.start();

    let shutdown = ShutdownHandler::new();
    let waiter = shutdown.install().await;

    let state_path = state_file::default_state_file_path();
    let _ = state_file::write_state(&state_path, true);
    let watcher_handle = state_file::spawn_watcher(state_path, state.clone());

    state.set_transcribing(true);

    let toggles = GecStageToggles {
        homophone: settings.gec.gec_homophone,
        punctcap: settings.gec.gec_punctcap,
        grammar: settings.gec.gec_grammar,
    };
    let gec = build_gec_pipeline(toggles, Some(0.5));
    if gec.is_none() {
        tracing::info!("GEC model paths not configured, running without post-processing");
    }

    let pipeline_metrics = talkie_telemetry::PipelineMetrics::default();

    let restart_requested = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let reload_handle = spawn_config_reload_listener(
        cli.config.clone(),
        settings.clone(),
        state.clone(),
        shutdown,
        restart_requested.clone(),
        pipeline_metrics.is_speaking.clone(),
    );

    let exit_code = run_pipeline(&cli, &settings, state.clone(), waiter, gec, pipeline_metrics, restart_requested.clone()).await;

    reload_handle.abort();
    watcher_handle.abort();
    health_handle.abort();
    state.transition(AppState::Stopping).ok();
    state.transition(AppState::Stopped).ok();

    if restart_requested.load(std::sync::atomic::Ordering::Relaxed) {
        std::process::ExitCode::from(4)
    } else {
        exit_code
    }
}

/// Reacts to SIGHUP by reloading config and running it through the
/// supervisor. Settings that can't be hot-swapped without rebuilding
/// already-bound resources (engine choice, input device) force a
/// process restart instead of silently no-op'ing; exit code 4 signals
/// the caller (a service manager) to relaunch.
fn spawn_config_reload_listener(
    config_path: Option<PathBuf>,
    initial_settings: Settings,
    state: Arc<StateManager>,
    shutdown: ShutdownHandler,
    restart_requested: Arc<std::sync::atomic::AtomicBool>,
    is_speaking: Arc<std::sync::atomic::AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut sighup = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGHUP handler, config reload disabled");
                return;
            }
        };

        let mut supervisor = talkie_app::Supervisor::new((*state).clone(), initial_settings);
        supervisor.register(Box::new(RestartOnUnsupportedChange));

        loop {
            sighup.recv().await;
            let new_settings = match &config_path {
                Some(path) => Settings::from_path(path),
                None => Settings::new(),
            };
            let new_settings = match new_settings {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "failed to reload config on SIGHUP, keeping current settings");
                    continue;
                }
            };

            let drain = || {
                let deadline = std::time::Instant::now() + Duration::from_secs(2);
                while is_speaking.load(std::sync::atomic::Ordering::Relaxed) {
                    if std::time::Instant::now() >= deadline {
                        tracing::warn!("timed out waiting for in-flight utterance to drain, reloading anyway");
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(20));
                }
            };

            match supervisor.apply_config_change(new_settings, drain) {
                Ok(()) => tracing::info!("configuration reloaded"),
                Err(e) => {
                    tracing::warn!(error = %e, "config change requires restart");
                    restart_requested.store(true, std::sync::atomic::Ordering::Relaxed);
                    shutdown.trigger();
                    return;
                }
            }
        }
    })
}

struct RestartOnUnsupportedChange;

impl talkie_app::ConfigChangeListener for RestartOnUnsupportedChange {
    fn affected_by(&self, old: &Settings, new: &Settings) -> bool {
        old.engine.speech_engine != new.engine.speech_engine || old.audio.input_device != new.audio.input_device
    }

    fn close(&mut self) {}

    fn reinit(&mut self, _new: &Settings) -> Result<(), talkie_foundation::SupervisorError> {
        Err(talkie_foundation::SupervisorError::RestartRequired)
    }
}

async fn run_pipeline(
    cli: &Cli,
    settings: &Settings,
    state: Arc<StateManager>,
    mut waiter: talkie_foundation::ShutdownWaiter,
    gec: Option<AppGecPipeline>,
    pipeline_metrics: talkie_telemetry::PipelineMetrics,
    restart_requested: Arc<std::sync::atomic::AtomicBool>,
) -> std::process::ExitCode {
    let gec_metrics = gec
        .as_ref()
        .map(|g| g.metrics().clone())
        .unwrap_or_default();

    let mut capture = match AudioCapture::new() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to open audio host");
            return std::process::ExitCode::FAILURE;
        }
    };

    let stream_config = match capture.open(&settings.audio.input_device) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "failed to negotiate audio device config");
            return std::process::ExitCode::FAILURE;
        }
    };
    let input_sample_rate = stream_config.sample_rate.0;

    let consumer = match capture.start(stream_config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to start audio stream");
            return std::process::ExitCode::FAILURE;
        }
    };

    let chunker_cfg = ChunkerConfig {
        frame_size_samples: 512,
        sample_rate_hz: 16_000,
        resampler_quality: ResamplerQuality::Balanced,
    };
    let chunker = AudioChunker::new(chunker_cfg);
    let mut frames_rx = chunker.subscribe();
    let _chunker_handle = chunker.spawn(consumer, input_sample_rate);

    let vad_cfg = VadConfig {
        silence_seconds: settings.vad.silence_seconds as f64,
        min_duration: settings.vad.min_duration as f64,
        lookback_seconds: settings.vad.lookback_seconds as f64,
        spike_suppression_seconds: settings.vad.spike_suppression_seconds as f64,
        initialization_samples: settings.vad.initialization_samples as usize,
        noise_floor_percentile: settings.vad.noise_floor_percentile,
        speech_floor_percentile: settings.vad.speech_floor_percentile,
        speech_min_multiplier: settings.vad.speech_min_multiplier,
        speech_max_multiplier: settings.vad.speech_max_multiplier,
        audio_threshold_multiplier: settings.vad.audio_threshold_multiplier,
        ..VadConfig::default()
    };
    let mut vad = AdaptiveVad::new(vad_cfg);

    let stt_options = EngineOptions {
        model_path: PathBuf::from(if settings.engine.speech_engine == "sherpa" {
            settings.engine.sherpa_modelfile.clone()
        } else {
            settings.engine.vosk_modelfile.clone()
        }),
        sample_rate: 16_000,
        confidence_threshold: settings.engine.confidence_threshold as f32,
        vosk_beam: settings.engine.vosk_beam as i32,
        vosk_lattice: settings.engine.vosk_lattice as i32,
        sherpa_max_active_paths: settings.engine.sherpa_max_active_paths as i32,
    };

    let model: Box<dyn Model> = match settings.engine.speech_engine.as_str() {
        "sherpa" => match talkie_stt_sherpa::SherpaModel::load(&stt_options) {
            Ok(m) => Box::new(m),
            Err(e) => {
                tracing::error!(error = %e, "failed to load sherpa model");
                return std::process::ExitCode::FAILURE;
            }
        },
        _ => match talkie_stt_vosk::VoskModel::load(&stt_options) {
            Ok(m) => Box::new(m),
            Err(e) => {
                tracing::error!(error = %e, "failed to load vosk model");
                return std::process::ExitCode::FAILURE;
            }
        },
    };

    let mut recognizer = match model.create_recognizer(16_000, &stt_options).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "failed to create recognizer");
            return std::process::ExitCode::FAILURE;
        }
    };

    let mut sink: Box<dyn KeystrokeSink> = Box::new(LoggingKeystrokeSink);

    let mut device_rx: Option<tokio::sync::mpsc::Receiver<talkie_audio::DeviceEvent>> = None;
    let mut device_monitor_handle: Option<tokio::task::JoinHandle<()>> = None;
    if settings.audio.enable_device_monitor {
        match DeviceManager::new() {
            Ok(dm) => {
                let monitor = talkie_audio::DeviceMonitor::new(Duration::from_secs(5));
                let (rx, handle) = monitor.spawn(dm, settings.audio.input_device.clone());
                device_rx = Some(rx);
                device_monitor_handle = Some(handle);
            }
            Err(e) => tracing::warn!(error = %e, "failed to open audio host for device monitor, disabling"),
        }
    }

    if cli.tui {
        let handles = tui::DashboardHandles {
            pipeline: pipeline_metrics.clone(),
            gec: gec_metrics.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = tui::run_tui(handles).await {
                tracing::error!(error = %e, "tui exited with error");
            }
        });
    }

    loop {
        tokio::select! {
            _ = waiter.wait() => {
                tracing::info!("shutdown requested");
                break;
            }
            Some(event) = async {
                match device_rx.as_mut() {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                match event {
                    talkie_audio::DeviceEvent::Added(name) => tracing::info!(device = %name, "input device added"),
                    talkie_audio::DeviceEvent::Removed(name) => tracing::info!(device = %name, "input device removed"),
                    talkie_audio::DeviceEvent::CurrentDeviceDisconnected => {
                        tracing::warn!("current input device disconnected, requesting restart");
                        restart_requested.store(true, std::sync::atomic::Ordering::Relaxed);
                        break;
                    }
                }
            }
            frame = frames_rx.recv() => {
                let Ok(frame) = frame else { continue };
                if !state.transcribing() {
                    continue;
                }

                if let talkie_audio::Samples::Int16(samples) = &frame.samples {
                    pipeline_metrics.update_audio_level(samples);
                }

                let (to_recognize, event) = vad.process(frame);

                if let Some(event) = &event {
                    match event {
                        VadEvent::SpeechStart { .. } => pipeline_metrics.is_speaking.store(true, std::sync::atomic::Ordering::Relaxed),
                        VadEvent::SpeechEnd { .. } => pipeline_metrics.is_speaking.store(false, std::sync::atomic::Ordering::Relaxed),
                    }
                }

                for frame in &to_recognize {
                    if let Err(e) = recognizer.accept(frame).await {
                        tracing::warn!(error = %e, "recognizer failed to accept frame");
                    }
                }

                if matches!(event, Some(VadEvent::SpeechEnd { .. })) {
                    match recognizer.finalize().await {
                        Ok(hyp) if talkie_stt::passes_confidence(&hyp, stt_options.confidence_threshold) => {
                            pipeline_metrics.speech_segments_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                            let text = match &gec {
                                Some(pipeline) => match pipeline.process(&hyp.text) {
                                    Ok(out) => out,
                                    Err(e) => {
                                        tracing::warn!(error = %e, "GEC pipeline failed, injecting raw transcript");
                                        hyp.text.clone()
                                    }
                                },
                                None => hyp.text.clone(),
                            };
                            if let Err(e) = sink.inject(&text) {
                                tracing::warn!(error = %e, "keystroke injection failed");
                            }
                        }
                        Ok(_) => tracing::debug!("final hypothesis below confidence threshold, dropped"),
                        Err(e) => tracing::warn!(error = %e, "finalize failed"),
                    }
                    recognizer.reset();
                }
            }
        }
    }

    if let Some(handle) = device_monitor_handle {
        handle.abort();
    }
    capture.stop();
    recognizer.close();
    std::process::ExitCode::SUCCESS
}
