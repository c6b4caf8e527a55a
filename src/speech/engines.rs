use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};

use super::SpeechEngine;

pub const DEFAULT_TTS_PROGRAM: &str = "espeak-ng";

/// Voice parameters passed to the synthesizer.
#[derive(Clone, Debug, PartialEq)]
pub struct VoiceSettings {
    /// Words per minute.
    pub rate: u32,
    /// 0.0..=2.0, where 1.0 is the engine's normal volume.
    pub volume: f32,
    pub voice: Option<String>,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: 150,
            volume: 1.0,
            voice: None,
        }
    }
}

/// Speaks by running an external synthesizer, one process per utterance.
///
/// The text is passed as the final argument; it never goes through a shell.
#[derive(Clone, Debug)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// eSpeak NG (or a flag-compatible `espeak`) with the given voice settings.
    pub fn espeak(program: impl Into<String>, voice: &VoiceSettings) -> Result<Self> {
        if !(0.0..=2.0).contains(&voice.volume) {
            return Err(anyhow!("speech volume must be within 0.0..=2.0"));
        }
        let mut args = vec![
            "-s".to_string(),
            voice.rate.to_string(),
            "-a".to_string(),
            // espeak amplitude: 100 is normal, 200 is the maximum.
            ((voice.volume * 100.0).round() as u32).to_string(),
        ];
        if let Some(name) = &voice.voice {
            args.push("-v".to_string());
            args.push(name.clone());
        }
        Ok(Self::new(program, args))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl SpeechEngine for CommandEngine {
    fn name(&self) -> &'static str {
        "command"
    }

    fn say(&mut self, text: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("failed to run {}", self.program))?;
        if !status.success() {
            bail!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}

/// Writes utterances to the log instead of a speaker.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogEngine;

impl SpeechEngine for LogEngine {
    fn name(&self) -> &'static str {
        "log"
    }

    fn say(&mut self, text: &str) -> Result<()> {
        log::info!("speech: {}", text);
        Ok(())
    }
}
