use std::collections::HashMap;

use anyhow::{anyhow, Result};

use super::backend::DetectorBackend;
use super::backends::{ScriptedBackend, StubBackend};
use crate::config::DetectorSettings;

/// Named set of detector backends with a default.
///
/// The daemon registers every backend it can build and then picks the one the
/// configuration names.
pub struct BackendRegistry {
    backends: HashMap<String, Box<dyn DetectorBackend>>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        self.register_boxed(Box::new(backend));
    }

    pub fn register_boxed(&mut self, backend: Box<dyn DetectorBackend>) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, backend);
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// List registered backends, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Take a backend out of the registry by name.
    pub fn take(&mut self, name: &str) -> Result<Box<dyn DetectorBackend>> {
        let backend = self.backends.remove(name).ok_or_else(|| {
            anyhow!(
                "backend '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            )
        })?;
        if self.default_name.as_deref() == Some(name) {
            self.default_name = None;
        }
        Ok(backend)
    }

    /// Registry holding every backend the settings can build, with the
    /// configured one as default.
    pub fn from_settings(settings: &DetectorSettings) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(StubBackend::new());
        if let Some(path) = &settings.script_path {
            registry.register(ScriptedBackend::from_path(path)?);
        }
        // Model loading is slow; only load it when it will be used.
        #[cfg(feature = "backend-tract")]
        if let (Some(path), "tract") = (&settings.model_path, settings.backend.as_str()) {
            registry.register(
                super::backends::TractBackend::new(path, settings.input_size)?
                    .with_score_threshold(settings.score_threshold)
                    .with_iou_threshold(settings.iou_threshold),
            );
        }
        registry.set_default(&settings.backend).map_err(|err| {
            if settings.backend == "tract" && cfg!(not(feature = "backend-tract")) {
                anyhow!("tract backend requires building with --features backend-tract")
            } else {
                err
            }
        })?;
        Ok(registry)
    }

    /// Take the default backend out of the registry.
    pub fn take_default(&mut self) -> Result<Box<dyn DetectorBackend>> {
        let name = self
            .default_name
            .clone()
            .ok_or_else(|| anyhow!("no default backend registered"))?;
        self.take(&name)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::{ScriptedBackend, StubBackend};

    #[test]
    fn first_registered_is_default() -> Result<()> {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        registry.register(ScriptedBackend::new(vec![vec![]])?);

        assert_eq!(registry.list(), vec!["scripted", "stub"]);
        assert_eq!(registry.take_default()?.name(), "stub");
        assert!(registry.take_default().is_err());
        Ok(())
    }

    #[test]
    fn set_default_requires_registration() -> Result<()> {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        assert!(registry.set_default("tract").is_err());

        registry.register(ScriptedBackend::new(vec![vec![]])?);
        registry.set_default("scripted")?;
        assert_eq!(registry.take_default()?.name(), "scripted");
        Ok(())
    }

    #[test]
    fn from_settings_selects_configured_backend() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let script = dir.path().join("script.json");
        std::fs::write(&script, r#"{"frames": [[]]}"#)?;

        let settings = DetectorSettings {
            backend: "scripted".to_string(),
            script_path: Some(script),
            ..DetectorSettings::default()
        };
        let mut registry = BackendRegistry::from_settings(&settings)?;
        assert_eq!(registry.list(), vec!["scripted", "stub"]);
        assert_eq!(registry.take_default()?.name(), "scripted");

        let stub_only = BackendRegistry::from_settings(&DetectorSettings::default())?;
        assert_eq!(stub_only.list(), vec!["stub"]);
        Ok(())
    }

    #[test]
    fn take_unknown_lists_available() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        let err = registry.take("yolo").err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("backend 'yolo' not registered (available: stub)")
        );
    }
}
