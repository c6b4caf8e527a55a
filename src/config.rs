use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::focus::FocusConfig;
use crate::speech::{VoiceSettings, DEFAULT_MAX_IN_FLIGHT};

const DEFAULT_SOURCE: &str = "stub://glasses";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_MODEL_INPUT: u32 = 640;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_SCORE_THRESHOLD: f32 = 0.25;
const DEFAULT_SPEECH_ENGINE: &str = "espeak";
const DEFAULT_TTS_PROGRAM: &str = crate::speech::engines::DEFAULT_TTS_PROGRAM;
const DEFAULT_GREETING: &str =
    "Powering on Smart Glasses. Let's see the world through the third eye. Now you can use it.";
const DEFAULT_BOOT_DELAY_MS: u64 = 5_000;

pub const BACKENDS: [&str; 3] = ["stub", "scripted", "tract"];
pub const SPEECH_ENGINES: [&str; 2] = ["espeak", "log"];

#[derive(Debug, Deserialize, Default)]
struct AssistConfigFile {
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    focus: Option<FocusConfigFile>,
    alerts: Option<AlertsConfigFile>,
    speech: Option<SpeechConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    source: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model: Option<PathBuf>,
    script: Option<PathBuf>,
    input_size: Option<u32>,
    score_threshold: Option<f32>,
    iou_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct FocusConfigFile {
    confidence_threshold: Option<f32>,
    targets: Option<Vec<String>>,
    zone_half_width: Option<u32>,
    zone_margin: Option<u32>,
    danger_height: Option<i32>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertsConfigFile {
    dark_threshold: Option<f32>,
    dark_cooldown_ms: Option<u64>,
    danger_cooldown_ms: Option<u64>,
    focus_cooldown_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct SpeechConfigFile {
    engine: Option<String>,
    program: Option<String>,
    rate: Option<u32>,
    volume: Option<f32>,
    voice: Option<String>,
    max_in_flight: Option<usize>,
    greeting: Option<String>,
    boot_delay_ms: Option<u64>,
}

/// Full runtime configuration for the glasses daemon.
#[derive(Debug, Clone)]
pub struct AssistConfig {
    pub camera: CameraSettings,
    pub detector: DetectorSettings,
    pub focus: FocusConfig,
    pub speech: SpeechSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    /// `stub://...`, `/dev/videoN`, or an image directory.
    pub source: String,
    pub width: u32,
    pub height: u32,
    /// Zero leaves the device default. The decision loop itself is never paced.
    pub target_fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            target_fps: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub script_path: Option<PathBuf>,
    pub input_size: u32,
    /// Raw model score cut applied before NMS.
    pub score_threshold: f32,
    pub iou_threshold: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            model_path: None,
            script_path: None,
            input_size: DEFAULT_MODEL_INPUT,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSettings {
    pub engine: String,
    pub program: String,
    pub voice: VoiceSettings,
    pub max_in_flight: usize,
    pub greeting: Option<String>,
    pub boot_delay: Duration,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            engine: DEFAULT_SPEECH_ENGINE.to_string(),
            program: DEFAULT_TTS_PROGRAM.to_string(),
            voice: VoiceSettings::default(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            greeting: Some(DEFAULT_GREETING.to_string()),
            boot_delay: Duration::from_millis(DEFAULT_BOOT_DELAY_MS),
        }
    }
}

impl AssistConfig {
    /// Defaults, then the file named by `THIRD_EYE_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = non_empty_env("THIRD_EYE_CONFIG").map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Like `load`, with an explicit config file taking the place of
    /// `THIRD_EYE_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => AssistConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AssistConfigFile) -> Self {
        let camera = file.camera.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let focus = file.focus.unwrap_or_default();
        let alerts = file.alerts.unwrap_or_default();
        let speech = file.speech.unwrap_or_default();
        let focus_defaults = FocusConfig::default();
        let speech_defaults = SpeechSettings::default();

        Self {
            camera: CameraSettings {
                source: camera.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
                width: camera.width.unwrap_or(DEFAULT_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_HEIGHT),
                target_fps: camera.target_fps.unwrap_or(0),
            },
            detector: DetectorSettings {
                backend: detector
                    .backend
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                model_path: detector.model,
                script_path: detector.script,
                input_size: detector.input_size.unwrap_or(DEFAULT_MODEL_INPUT),
                score_threshold: detector
                    .score_threshold
                    .unwrap_or(DEFAULT_SCORE_THRESHOLD),
                iou_threshold: detector.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD),
            },
            focus: FocusConfig {
                confidence_threshold: focus
                    .confidence_threshold
                    .unwrap_or(focus_defaults.confidence_threshold),
                target_labels: focus.targets.unwrap_or(focus_defaults.target_labels),
                zone_half_width: focus
                    .zone_half_width
                    .unwrap_or(focus_defaults.zone_half_width),
                zone_margin: focus.zone_margin.unwrap_or(focus_defaults.zone_margin),
                danger_height: focus.danger_height.unwrap_or(focus_defaults.danger_height),
                dark_threshold: alerts
                    .dark_threshold
                    .unwrap_or(focus_defaults.dark_threshold),
                dark_cooldown: alerts
                    .dark_cooldown_ms
                    .map(Duration::from_millis)
                    .unwrap_or(focus_defaults.dark_cooldown),
                danger_cooldown: alerts
                    .danger_cooldown_ms
                    .map(Duration::from_millis)
                    .unwrap_or(focus_defaults.danger_cooldown),
                focus_cooldown: alerts
                    .focus_cooldown_ms
                    .map(Duration::from_millis)
                    .unwrap_or(focus_defaults.focus_cooldown),
            },
            speech: SpeechSettings {
                engine: speech.engine.unwrap_or(speech_defaults.engine),
                program: speech.program.unwrap_or(speech_defaults.program),
                voice: VoiceSettings {
                    rate: speech.rate.unwrap_or(speech_defaults.voice.rate),
                    volume: speech.volume.unwrap_or(speech_defaults.voice.volume),
                    voice: speech.voice,
                },
                max_in_flight: speech
                    .max_in_flight
                    .unwrap_or(speech_defaults.max_in_flight),
                // An empty greeting in the file disables it.
                greeting: match speech.greeting {
                    Some(text) if text.trim().is_empty() => None,
                    Some(text) => Some(text),
                    None => speech_defaults.greeting,
                },
                boot_delay: speech
                    .boot_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(speech_defaults.boot_delay),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(source) = non_empty_env("THIRD_EYE_SOURCE") {
            self.camera.source = source;
        }
        if let Some(backend) = non_empty_env("THIRD_EYE_BACKEND") {
            self.detector.backend = backend;
        }
        if let Some(model) = non_empty_env("THIRD_EYE_MODEL") {
            self.detector.model_path = Some(PathBuf::from(model));
        }
        if let Some(script) = non_empty_env("THIRD_EYE_SCRIPT") {
            self.detector.script_path = Some(PathBuf::from(script));
        }
        if let Some(engine) = non_empty_env("THIRD_EYE_SPEECH_ENGINE") {
            self.speech.engine = engine;
        }
        if let Some(targets) = non_empty_env("THIRD_EYE_TARGETS") {
            let parsed = split_csv(&targets);
            if !parsed.is_empty() {
                self.focus.target_labels = parsed;
            }
        }
        if let Some(confidence) = non_empty_env("THIRD_EYE_CONFIDENCE") {
            self.focus.confidence_threshold = confidence
                .parse()
                .map_err(|_| anyhow!("THIRD_EYE_CONFIDENCE must be a number between 0 and 1"))?;
        }
        Ok(())
    }

    pub fn validate(&mut self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be greater than zero"));
        }
        let threshold = self.focus.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "confidence threshold must be within 0..=1 (got {})",
                threshold
            ));
        }

        self.focus.target_labels = self
            .focus
            .target_labels
            .iter()
            .map(|label| label.trim().to_lowercase())
            .filter(|label| !label.is_empty())
            .collect();
        if self.focus.target_labels.is_empty() {
            return Err(anyhow!("at least one target label is required"));
        }

        if self.focus.zone_half_width == 0 {
            return Err(anyhow!("focus zone half-width must be greater than zero"));
        }
        if self.focus.zone_margin.saturating_mul(2) >= self.camera.height {
            return Err(anyhow!(
                "focus zone margin {} leaves no zone in a {}px tall frame",
                self.focus.zone_margin,
                self.camera.height
            ));
        }
        if self.focus.zone_half_width.saturating_mul(2) >= self.camera.width {
            log::warn!(
                "focus zone ({}px) spans the whole {}px frame; nothing will be peripheral",
                self.focus.zone_half_width * 2,
                self.camera.width
            );
        }
        if self.focus.danger_height <= 0 {
            return Err(anyhow!("danger height must be greater than zero"));
        }
        if self.focus.focus_cooldown.is_zero()
            || self.focus.danger_cooldown.is_zero()
            || self.focus.dark_cooldown.is_zero()
        {
            return Err(anyhow!("alert cooldowns must be greater than zero"));
        }

        self.detector.backend = self.detector.backend.trim().to_lowercase();
        match self.detector.backend.as_str() {
            "stub" => {}
            "scripted" if self.detector.script_path.is_none() => {
                return Err(anyhow!("scripted backend requires a detection script path"));
            }
            "tract" if self.detector.model_path.is_none() => {
                return Err(anyhow!("tract backend requires a model path"));
            }
            "scripted" | "tract" => {}
            other => {
                return Err(anyhow!(
                    "unknown detector backend '{}' (expected one of {})",
                    other,
                    BACKENDS.join(", ")
                ));
            }
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("model input size must be greater than zero"));
        }
        for (name, value) in [
            ("score", self.detector.score_threshold),
            ("iou", self.detector.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("detector {} threshold must be within 0..=1", name));
            }
        }

        self.speech.engine = self.speech.engine.trim().to_lowercase();
        if !SPEECH_ENGINES.contains(&self.speech.engine.as_str()) {
            return Err(anyhow!(
                "unknown speech engine '{}' (expected one of {})",
                self.speech.engine,
                SPEECH_ENGINES.join(", ")
            ));
        }
        if !(0.0..=2.0).contains(&self.speech.voice.volume) {
            return Err(anyhow!("speech volume must be within 0.0..=2.0"));
        }
        if self.speech.max_in_flight == 0 {
            return Err(anyhow!("speech max_in_flight must be at least 1"));
        }
        Ok(())
    }
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self::from_file(AssistConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<AssistConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_glasses() {
        let cfg = AssistConfig::default();
        assert_eq!(cfg.camera.width, 640);
        assert_eq!(cfg.camera.height, 480);
        assert_eq!(cfg.focus, FocusConfig::default());
        assert_eq!(cfg.speech.voice.rate, 150);
        assert_eq!(cfg.speech.boot_delay, Duration::from_secs(5));
        assert!(cfg.speech.greeting.is_some());
    }

    #[test]
    fn validate_normalizes_labels() -> Result<()> {
        let mut cfg = AssistConfig::default();
        cfg.focus.target_labels = vec![" Cup ".into(), "".into(), "Cell Phone".into()];
        cfg.validate()?;
        assert_eq!(cfg.focus.target_labels, vec!["cup", "cell phone"]);
        Ok(())
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = AssistConfig::default();
        cfg.focus.confidence_threshold = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = AssistConfig::default();
        cfg.detector.backend = "tract".into();
        assert!(cfg.validate().is_err());

        let mut cfg = AssistConfig::default();
        cfg.detector.backend = "opencv".into();
        assert!(cfg.validate().is_err());

        let mut cfg = AssistConfig::default();
        cfg.focus.zone_margin = 240;
        assert!(cfg.validate().is_err());

        let mut cfg = AssistConfig::default();
        cfg.speech.engine = "pyttsx3".into();
        assert!(cfg.validate().is_err());

        let mut cfg = AssistConfig::default();
        cfg.detector.score_threshold = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parses_toml_sections() -> Result<()> {
        let file: AssistConfigFile = toml::from_str(
            r#"
            [detector]
            score_threshold = 0.3

            [focus]
            targets = ["door", "stairs"]
            danger_height = 350

            [alerts]
            focus_cooldown_ms = 4000

            [speech]
            greeting = ""
            "#,
        )?;
        let cfg = AssistConfig::from_file(file);
        assert_eq!(cfg.focus.target_labels, vec!["door", "stairs"]);
        assert_eq!(cfg.focus.danger_height, 350);
        assert_eq!(cfg.focus.focus_cooldown, Duration::from_secs(4));
        assert_eq!(cfg.focus.danger_cooldown, Duration::from_secs(2));
        assert_eq!(cfg.speech.greeting, None);
        assert_eq!(cfg.detector.score_threshold, 0.3);
        assert_eq!(cfg.detector.iou_threshold, 0.45);
        Ok(())
    }

    #[test]
    fn split_csv_skips_blanks() {
        assert_eq!(split_csv("cup, ,bottle,"), vec!["cup", "bottle"]);
    }
}
