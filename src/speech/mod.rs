//! Fire-and-forget speech output.
//!
//! `SpeechDispatcher::speak` hands text to a detached thread that builds its
//! own engine, speaks, and exits. The decision loop never waits on it and
//! never learns whether speech succeeded. Failures are logged at debug level
//! and dropped; nothing is retried or queued.
//!
//! The number of utterances in flight is bounded. When the bound is reached the
//! new utterance is dropped, the same outcome as an engine that is busy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::config::SpeechSettings;

pub mod engines;

pub use engines::{CommandEngine, LogEngine, VoiceSettings};

pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// A text-to-speech engine instance. One instance speaks one utterance.
pub trait SpeechEngine: Send {
    fn name(&self) -> &'static str;

    /// Synthesize and play `text`. May block until playback ends.
    fn say(&mut self, text: &str) -> Result<()>;
}

/// Builds a fresh engine for each utterance, on the speech thread.
pub type EngineFactory = Arc<dyn Fn() -> Result<Box<dyn SpeechEngine>> + Send + Sync>;

/// Outcome of a `speak` call. Never reports speech success or failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Spawned,
    Dropped,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub spawned: u64,
    pub dropped: u64,
}

pub struct SpeechDispatcher {
    factory: EngineFactory,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: usize,
    stats: DispatchStats,
}

impl SpeechDispatcher {
    pub fn new(factory: EngineFactory, max_in_flight: usize) -> Self {
        Self {
            factory,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: max_in_flight.max(1),
            stats: DispatchStats::default(),
        }
    }

    /// Dispatcher over any engine constructor.
    pub fn with_engine<F, E>(make: F, max_in_flight: usize) -> Self
    where
        F: Fn() -> Result<E> + Send + Sync + 'static,
        E: SpeechEngine + 'static,
    {
        let factory: EngineFactory =
            Arc::new(move || make().map(|engine| Box::new(engine) as Box<dyn SpeechEngine>));
        Self::new(factory, max_in_flight)
    }

    /// Dispatcher for the engine named in the config (`espeak` or `log`).
    pub fn from_settings(settings: &SpeechSettings) -> Result<Self> {
        match settings.engine.as_str() {
            "espeak" => {
                let engine = CommandEngine::espeak(settings.program.clone(), &settings.voice)?;
                Ok(Self::with_engine(
                    move || Ok(engine.clone()),
                    settings.max_in_flight,
                ))
            }
            "log" => Ok(Self::with_engine(|| Ok(LogEngine), settings.max_in_flight)),
            other => Err(anyhow!("unknown speech engine '{}'", other)),
        }
    }

    /// Hand `text` off and return immediately.
    pub fn speak(&mut self, text: impl Into<String>) -> Dispatch {
        let text = text.into();
        if !self.try_reserve() {
            self.stats.dropped += 1;
            log::debug!("speech dropped, {} utterances in flight", self.in_flight());
            return Dispatch::Dropped;
        }

        let factory = self.factory.clone();
        let slot = InFlightSlot(self.in_flight.clone());
        let spawned = std::thread::Builder::new()
            .name("speech".to_string())
            .spawn(move || {
                let _slot = slot;
                run_utterance(&factory, &text);
            });

        match spawned {
            Ok(_) => {
                self.stats.spawned += 1;
                Dispatch::Spawned
            }
            Err(err) => {
                // The closure (and its slot) was dropped with the failed spawn.
                self.stats.dropped += 1;
                log::debug!("speech thread spawn failed: {}", err);
                Dispatch::Dropped
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Wait up to `timeout` for in-flight speech to finish. Used at shutdown
    /// so the last warning is not cut off; never called from the frame loop.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        true
    }

    fn try_reserve(&self) -> bool {
        let max = self.max_in_flight;
        self.in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < max).then_some(current + 1)
            })
            .is_ok()
    }
}

fn run_utterance(factory: &EngineFactory, text: &str) {
    let mut engine = match factory() {
        Ok(engine) => engine,
        Err(err) => {
            log::debug!("speech engine unavailable: {:#}", err);
            return;
        }
    };
    if let Err(err) = engine.say(text) {
        log::debug!("{} engine failed to speak: {:#}", engine.name(), err);
    }
}

/// Releases an in-flight slot when the speech thread ends, however it ends.
struct InFlightSlot(Arc<AtomicUsize>);

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::mpsc;
    use std::sync::Mutex;

    struct Recording(Arc<Mutex<Vec<String>>>);

    impl SpeechEngine for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn say(&mut self, text: &str) -> Result<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    /// Blocks until the test releases it.
    struct Gated(Arc<Mutex<mpsc::Receiver<()>>>);

    impl SpeechEngine for Gated {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn say(&mut self, _text: &str) -> Result<()> {
            let _ = self.0.lock().unwrap().recv();
            Ok(())
        }
    }

    struct Broken;

    impl SpeechEngine for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn say(&mut self, _text: &str) -> Result<()> {
            bail!("audio device busy")
        }
    }

    #[test]
    fn speaks_on_background_thread() {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let sink = spoken.clone();
        let mut dispatcher =
            SpeechDispatcher::with_engine(move || Ok(Recording(sink.clone())), 4);

        assert_eq!(dispatcher.speak("cup"), Dispatch::Spawned);
        assert!(dispatcher.wait_idle(Duration::from_secs(5)));
        assert_eq!(*spoken.lock().unwrap(), vec!["cup".to_string()]);
        assert_eq!(dispatcher.stats().spawned, 1);
    }

    #[test]
    fn never_blocks_on_a_stuck_engine() {
        let (release, gate) = mpsc::channel();
        let gate = Arc::new(Mutex::new(gate));
        let mut dispatcher = SpeechDispatcher::with_engine(move || Ok(Gated(gate.clone())), 4);

        let started = Instant::now();
        assert_eq!(dispatcher.speak("Stop! person too close."), Dispatch::Spawned);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(dispatcher.in_flight(), 1);

        release.send(()).unwrap();
        assert!(dispatcher.wait_idle(Duration::from_secs(5)));
    }

    #[test]
    fn drops_utterances_past_the_bound() {
        let (release, gate) = mpsc::channel();
        let gate = Arc::new(Mutex::new(gate));
        let mut dispatcher = SpeechDispatcher::with_engine(move || Ok(Gated(gate.clone())), 1);

        assert_eq!(dispatcher.speak("bottle"), Dispatch::Spawned);
        assert_eq!(dispatcher.speak("cup"), Dispatch::Dropped);
        assert_eq!(
            dispatcher.stats(),
            DispatchStats {
                spawned: 1,
                dropped: 1
            }
        );

        release.send(()).unwrap();
        assert!(dispatcher.wait_idle(Duration::from_secs(5)));
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[test]
    fn builds_from_settings() -> Result<()> {
        let mut settings = SpeechSettings::default();
        settings.engine = "log".to_string();
        settings.max_in_flight = 2;
        let mut dispatcher = SpeechDispatcher::from_settings(&settings)?;
        assert_eq!(dispatcher.speak("cup"), Dispatch::Spawned);
        assert!(dispatcher.wait_idle(Duration::from_secs(5)));

        settings.engine = "pyttsx3".to_string();
        assert!(SpeechDispatcher::from_settings(&settings).is_err());
        Ok(())
    }

    #[test]
    fn engine_failures_are_swallowed() {
        let mut dispatcher = SpeechDispatcher::with_engine(|| Ok(Broken), 2);
        assert_eq!(dispatcher.speak("laptop"), Dispatch::Spawned);
        assert!(dispatcher.wait_idle(Duration::from_secs(5)));

        let factory: EngineFactory =
            Arc::new(|| -> Result<Box<dyn SpeechEngine>> { bail!("no audio output") });
        let mut dispatcher = SpeechDispatcher::new(factory, 2);
        assert_eq!(dispatcher.speak("laptop"), Dispatch::Spawned);
        assert!(dispatcher.wait_idle(Duration::from_secs(5)));
        assert_eq!(dispatcher.in_flight(), 0);
    }
}
