/// Backend registry - named backend factories
///
/// Backends register a factory under a name; `FrameScheduler` instantiates the
/// one named by `Config::backend` on first exposure. The registry is plain
/// instance state owned by whoever builds the scheduler.

use rustc_hash::FxHashMap;
use crate::backend::Backend;
use crate::config::Config;
use crate::error::{Error, Result};

/// Factory building a backend from the scheduler configuration
pub type BackendFactory = Box<dyn Fn(&Config) -> Result<Box<dyn Backend>>>;

/// Name -> factory table
#[derive(Default)]
pub struct BackendRegistry {
    factories: FxHashMap<String, BackendFactory>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a factory
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Config) -> Result<Box<dyn Backend>> + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
            crate::cadence_debug!("cadence::BackendRegistry", "Replaced backend factory '{}'", name);
        }
    }

    /// Remove a factory, returning whether one was registered
    pub fn unregister(&mut self, name: &str) -> bool {
        self.factories.remove(name).is_some()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Instantiate the backend named by `config.backend`
    ///
    /// Every failure is reported as `Error::BackendCreationFailed`, which is fatal.
    pub fn create_backend(&self, config: &Config) -> Result<Box<dyn Backend>> {
        let factory = self.factories.get(&config.backend).ok_or_else(|| {
            Error::BackendCreationFailed(format!(
                "no backend registered under '{}' (available: {})",
                config.backend,
                self.names().join(", ")
            ))
        })?;

        match factory(config) {
            Ok(backend) => {
                let info = backend.info();
                crate::cadence_info!(
                    "cadence::BackendRegistry",
                    "Created backend '{}' on {}",
                    info.name,
                    info.device_name
                );
                Ok(backend)
            }
            Err(Error::BackendCreationFailed(msg)) => Err(Error::BackendCreationFailed(msg)),
            Err(other) => Err(Error::BackendCreationFailed(format!(
                "backend '{}': {}",
                config.backend, other
            ))),
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
