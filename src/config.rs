use crate::camera::Facing;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SnapcamConfig {
    pub camera: CameraConfig,
    pub orientation: OrientationConfig,
    pub events: EventConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Sensor opened when a surface appears
    #[serde(default)]
    pub facing: Facing,

    /// Parameters applied, in order, every time the camera opens
    #[serde(default)]
    pub parameters: Vec<ParameterSetting>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ParameterSetting {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OrientationConfig {
    /// Display rotation in degrees for devices without an orientation sensor
    #[serde(default = "default_display_rotation")]
    pub display_rotation: u32,

    /// Layout rotation relative to the display, in degrees
    #[serde(default = "default_layout_orientation")]
    pub layout_orientation: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EventConfig {
    /// Event bus capacity
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Log every published event at debug level
    #[serde(default)]
    pub debug_logging: bool,
}

impl SnapcamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("snapcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.facing", "back")?
            .set_default("orientation.display_rotation", default_display_rotation())?
            .set_default(
                "orientation.layout_orientation",
                default_layout_orientation(),
            )?
            .set_default("events.bus_capacity", default_bus_capacity() as i64)?
            .set_default("events.debug_logging", false)?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Environment variables such as SNAPCAM__CAMERA__FACING=front
            .add_source(
                Environment::with_prefix("SNAPCAM")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: SnapcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, degrees) in [
            ("orientation.display_rotation", self.orientation.display_rotation),
            (
                "orientation.layout_orientation",
                self.orientation.layout_orientation,
            ),
        ] {
            if degrees % 90 != 0 || degrees >= 360 {
                return Err(ConfigError::Message(format!(
                    "{} must be one of 0, 90, 180, 270 (got {})",
                    name, degrees
                )));
            }
        }

        for setting in &self.camera.parameters {
            if setting.key.trim().is_empty() {
                return Err(ConfigError::Message(
                    "Camera parameter keys must not be empty".to_string(),
                ));
            }
        }

        if self.events.bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for SnapcamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                facing: Facing::default(),
                parameters: Vec::new(),
            },
            orientation: OrientationConfig {
                display_rotation: default_display_rotation(),
                layout_orientation: default_layout_orientation(),
            },
            events: EventConfig {
                bus_capacity: default_bus_capacity(),
                debug_logging: false,
            },
        }
    }
}

// Default value functions
fn default_display_rotation() -> u32 {
    0
}
fn default_layout_orientation() -> u32 {
    0
}
fn default_bus_capacity() -> usize {
    100
}
