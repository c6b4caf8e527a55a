//! focus_replay - run a recorded scenario through the focus engine
//!
//! The scenario is a JSON file of timestamped frames, each with a mean
//! brightness and the detector output for that frame:
//!
//! ```json
//! { "width": 640, "height": 480, "frames": [
//!     { "at_ms": 0,   "brightness": 120.0, "detections": [] },
//!     { "at_ms": 100, "brightness": 120.0, "detections": [
//!         { "label": "cup", "confidence": 0.9, "bbox": { "x1": 280, "y1": 200, "x2": 360, "y2": 320 } }
//!     ] }
//! ] }
//! ```
//!
//! Time is virtual: frames are decided at `start + at_ms`, never slept through.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use third_eye::{AlertPhase, AssistConfig, Detection, FocusEngine, SpeechDispatcher};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Scenario JSON file.
    scenario: PathBuf,
    /// Config file (.toml or .json) for thresholds and targets.
    #[arg(long, env = "THIRD_EYE_CONFIG")]
    config: Option<PathBuf>,
    /// Emit one JSON object per frame instead of text.
    #[arg(long)]
    json: bool,
    /// Also speak each utterance through the configured speech engine.
    #[arg(long)]
    speak: bool,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default = "default_width")]
    width: u32,
    #[serde(default = "default_height")]
    height: u32,
    frames: Vec<ScenarioFrame>,
}

#[derive(Debug, Deserialize)]
struct ScenarioFrame {
    at_ms: u64,
    brightness: f32,
    #[serde(default)]
    detections: Vec<Detection>,
}

#[derive(Debug, Serialize)]
struct ReplayLine {
    frame: usize,
    at_ms: u64,
    dark: bool,
    phase: &'static str,
    focused: Vec<String>,
    said: Vec<String>,
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn phase_name(phase: AlertPhase) -> &'static str {
    match phase {
        AlertPhase::Quiet => "quiet",
        AlertPhase::AnnouncingFocus => "focus",
        AlertPhase::AnnouncingDanger => "danger",
    }
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("invalid scenario {}", path.display()))?;
    if scenario.width == 0 || scenario.height == 0 {
        return Err(anyhow!("scenario frame size must be non-zero"));
    }
    if scenario
        .frames
        .windows(2)
        .any(|pair| pair[1].at_ms < pair[0].at_ms)
    {
        return Err(anyhow!("scenario frames must be in time order"));
    }
    Ok(scenario)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let cfg = AssistConfig::load_from(args.config.as_deref())?;
    let scenario = load_scenario(&args.scenario)?;

    let mut speech = if args.speak {
        Some(SpeechDispatcher::from_settings(&cfg.speech)?)
    } else {
        None
    };

    let mut engine = FocusEngine::new(cfg.focus.clone(), scenario.width, scenario.height);
    let start = Instant::now();

    for (index, frame) in scenario.frames.into_iter().enumerate() {
        let now = start + Duration::from_millis(frame.at_ms);
        let decision = engine.process(frame.detections, frame.brightness, now);

        let line = ReplayLine {
            frame: index,
            at_ms: frame.at_ms,
            dark: decision.is_dark,
            phase: phase_name(decision.phase()),
            focused: decision.focused().map(|c| c.label().to_string()).collect(),
            said: decision.utterances.iter().map(|u| u.text.clone()).collect(),
        };
        if args.json {
            println!("{}", serde_json::to_string(&line)?);
        } else {
            println!(
                "#{:<4} +{:>6}ms {:<6} {}focused=[{}] said=[{}]",
                line.frame,
                line.at_ms,
                line.phase,
                if line.dark { "dark " } else { "" },
                line.focused.join(", "),
                line.said.join(" | ")
            );
        }

        if let Some(speech) = speech.as_mut() {
            for utterance in &decision.utterances {
                speech.speak(utterance.text.as_str());
            }
        }
    }

    if let Some(speech) = speech {
        speech.wait_idle(Duration::from_secs(10));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn scenario_frames_must_be_in_time_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scenario.json");
        std::fs::write(
            &path,
            r#"{ "frames": [
                { "at_ms": 500, "brightness": 120.0 },
                { "at_ms": 100, "brightness": 120.0 }
            ] }"#,
        )?;
        assert!(load_scenario(&path).is_err());

        std::fs::write(
            &path,
            r#"{ "frames": [{ "at_ms": 0, "brightness": 20.0 }] }"#,
        )?;
        let scenario = load_scenario(&path)?;
        assert_eq!((scenario.width, scenario.height), (640, 480));
        assert!(scenario.frames[0].detections.is_empty());
        Ok(())
    }
}
