use super::device::{CameraDevice, CameraParameters};
use crate::error::Result;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A named transformer applied to the parameters of every freshly opened device.
/// Two configurations are the same entry when their names are equal.
pub trait CameraConfiguration: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, parameters: &mut CameraParameters) -> Result<()>;
}

/// Sets one named parameter to a fixed value
#[derive(Debug, Clone)]
pub struct ParameterConfiguration {
    name: String,
    key: String,
    value: String,
}

impl ParameterConfiguration {
    /// Configuration named after the parameter it sets
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            value: value.into(),
        }
    }

    pub fn named<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }
}

impl CameraConfiguration for ParameterConfiguration {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, parameters: &mut CameraParameters) -> Result<()> {
        parameters.set(self.key.clone(), self.value.clone())
    }
}

/// Closure-backed configuration
pub struct FnConfiguration<F> {
    name: String,
    transform: F,
}

impl<F> FnConfiguration<F>
where
    F: Fn(&mut CameraParameters) -> Result<()> + Send + Sync,
{
    pub fn new<N: Into<String>>(name: N, transform: F) -> Self {
        Self {
            name: name.into(),
            transform,
        }
    }
}

impl<F> CameraConfiguration for FnConfiguration<F>
where
    F: Fn(&mut CameraParameters) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, parameters: &mut CameraParameters) -> Result<()> {
        (self.transform)(parameters)
    }
}

/// Insertion-ordered set of configurations
#[derive(Default, Clone)]
pub struct ConfigurationPipeline {
    entries: Vec<Arc<dyn CameraConfiguration>>,
}

impl ConfigurationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, or move an existing entry with the same name to the end
    pub fn add<C: CameraConfiguration + 'static>(&mut self, configuration: C) {
        self.add_shared(Arc::new(configuration));
    }

    pub fn add_shared(&mut self, configuration: Arc<dyn CameraConfiguration>) {
        self.remove(configuration.name());
        debug!("Adding camera configuration '{}'", configuration.name());
        self.entries.push(configuration);
    }

    /// Returns whether an entry was removed
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.name() != name);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name()).collect()
    }

    /// Apply every entry in order, writing the parameters back after each one
    /// so later entries see (and may override) earlier effects.
    pub fn apply_to(&self, device: &mut dyn CameraDevice) -> Result<()> {
        for entry in &self.entries {
            let mut parameters = device.parameters();
            entry.apply(&mut parameters)?;
            device.set_parameters(parameters)?;
            debug!("Applied camera configuration '{}'", entry.name());
        }
        Ok(())
    }
}

impl fmt::Debug for ConfigurationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationPipeline")
            .field("entries", &self.names())
            .finish()
    }
}
