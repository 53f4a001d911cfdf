use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::backend::PoseDetector;
use crate::CoachError;

/// Shared handle to a registered detector.
pub type SharedDetector = Arc<Mutex<dyn PoseDetector>>;

/// Thread-safe registry of detector backends.
///
/// Backends are wrapped in `Mutex` because `PoseDetector::detect` takes `&mut self`.
pub struct DetectorRegistry {
    backends: HashMap<String, SharedDetector>,
    default_name: Option<String>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<D: PoseDetector + 'static>(&mut self, backend: D) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("detector '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<SharedDetector> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<SharedDetector> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// List registered backends, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Pick the named backend (or the default) and warm it up.
    ///
    /// Every failure comes back as `CoachError::DetectionUnavailable` so the
    /// caller can branch on it once and fall back.
    pub fn activate(&self, name: Option<&str>) -> Result<SharedDetector> {
        let backend = match name {
            Some(name) => self.get(name),
            None => self.default_backend(),
        }
        .ok_or_else(|| {
            CoachError::DetectionUnavailable(format!(
                "detector '{}' not registered (available: {})",
                name.unwrap_or("<default>"),
                self.list().join(", ")
            ))
        })?;
        {
            let mut guard = backend
                .lock()
                .map_err(|_| CoachError::DetectionUnavailable("detector lock poisoned".into()))?;
            guard.warm_up().map_err(|e| {
                CoachError::DetectionUnavailable(format!("{} failed to load: {}", guard.name(), e))
            })?;
            log::info!("detector '{}' ready", guard.name());
        }
        Ok(backend)
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{DetectionResult, StubDetector};

    #[test]
    fn first_registered_is_default() {
        let mut registry = DetectorRegistry::new();
        registry.register(StubDetector::fixed(DetectionResult::default()));
        assert!(registry.default_backend().is_some());
        assert_eq!(registry.list(), vec!["stub".to_string()]);
        assert!(registry.set_default("missing").is_err());
    }

    #[test]
    fn activate_reports_unavailable_detectors() {
        let mut registry = DetectorRegistry::new();
        registry.register(StubDetector::unavailable("model download failed"));

        let err = registry.activate(None).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CoachError>(),
            Some(CoachError::DetectionUnavailable(_))
        ));

        let err = registry.activate(Some("replay")).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CoachError>(),
            Some(CoachError::DetectionUnavailable(_))
        ));
    }
}
