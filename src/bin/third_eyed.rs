//! third_eyed - focus & alert daemon for the glasses
//!
//! This daemon:
//! 1. Greets the wearer and waits for the hardware to settle
//! 2. Loads the configured detector backend
//! 3. Opens the camera (or a synthetic / recorded source)
//! 4. Runs the focus & alert loop until the source ends or Ctrl-C

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use third_eye::{
    open_source, AssistConfig, BackendRegistry, FocusEngine, LogHud, Session, SpeechDispatcher,
};

const SPEECH_DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (.toml or .json).
    #[arg(long, env = "THIRD_EYE_CONFIG")]
    config: Option<PathBuf>,
    /// Frame source: stub://name, /dev/videoN, or an image directory.
    #[arg(long)]
    source: Option<String>,
    /// Detector backend: stub, scripted, or tract.
    #[arg(long)]
    backend: Option<String>,
    /// ONNX model for the tract backend.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Detection script for the scripted backend.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Speech engine: espeak or log.
    #[arg(long)]
    speech: Option<String>,
    /// Skip the boot greeting and delay.
    #[arg(long)]
    quick_start: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = load_config(&args)?;

    let mut speech = SpeechDispatcher::from_settings(&cfg.speech)?;
    if !args.quick_start {
        if let Some(greeting) = &cfg.speech.greeting {
            log::info!("{}", greeting);
            speech.speak(greeting.as_str());
        }
        std::thread::sleep(cfg.speech.boot_delay);
    }

    let mut registry = BackendRegistry::from_settings(&cfg.detector)?;
    log::info!("detector backends available: {}", registry.list().join(", "));
    let mut detector = registry.take_default()?;
    detector.warm_up()?;

    let mut source = open_source(&cfg.camera)?;
    source.connect()?;

    let mut engine = FocusEngine::new(cfg.focus.clone(), cfg.camera.width, cfg.camera.height);
    let zone = engine.zone();
    log::info!(
        "focus zone x={}..{} y={}..{}, targets: {}",
        zone.x1,
        zone.x2,
        zone.y1,
        zone.y2,
        cfg.focus.target_labels.join(", ")
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let mut hud = LogHud::new();
    let result = Session {
        source: source.as_mut(),
        detector: detector.as_mut(),
        engine: &mut engine,
        speech: &mut speech,
        hud: &mut hud,
    }
    .run(&shutdown);

    if !speech.wait_idle(SPEECH_DRAIN_TIMEOUT) {
        log::warn!("{} utterances still speaking at exit", speech.in_flight());
    }
    let dispatch = speech.stats();
    log::info!(
        "speech: spawned={} dropped={}",
        dispatch.spawned,
        dispatch.dropped
    );

    result.map(|_| ())
}

fn load_config(args: &Args) -> Result<AssistConfig> {
    let mut cfg = AssistConfig::load_from(args.config.as_deref())?;
    if let Some(source) = &args.source {
        cfg.camera.source = source.clone();
    }
    if let Some(backend) = &args.backend {
        cfg.detector.backend = backend.clone();
    }
    if let Some(model) = &args.model {
        cfg.detector.model_path = Some(model.clone());
    }
    if let Some(script) = &args.script {
        cfg.detector.script_path = Some(script.clone());
    }
    if let Some(engine) = &args.speech {
        cfg.speech.engine = engine.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}
