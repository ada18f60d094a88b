use crate::error::{CameraError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which physical direction a camera sensor points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Front,
    #[default]
    Back,
}

impl Facing {
    pub fn is_front(&self) -> bool {
        matches!(self, Facing::Front)
    }

    /// The opposite sensor
    pub fn toggled(&self) -> Self {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Front => write!(f, "front"),
            Facing::Back => write!(f, "back"),
        }
    }
}

/// A width/height pair reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Ratio read as width over height
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// Opaque display target a preview is rendered into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTarget {
    pub id: u64,
    pub label: String,
}

impl PreviewTarget {
    pub fn new<S: Into<String>>(id: u64, label: S) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// Mutable parameter set of an open device.
///
/// Sizes are validated against the device-reported lists; named values are
/// validated against their supported set when the device declares one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CameraParameters {
    preview_size: Option<Resolution>,
    picture_size: Option<Resolution>,
    supported_preview_sizes: Vec<Resolution>,
    supported_picture_sizes: Vec<Resolution>,
    values: BTreeMap<String, String>,
    supported_values: BTreeMap<String, Vec<String>>,
}

impl CameraParameters {
    pub fn new(
        supported_preview_sizes: Vec<Resolution>,
        supported_picture_sizes: Vec<Resolution>,
    ) -> Self {
        Self {
            supported_preview_sizes,
            supported_picture_sizes,
            ..Default::default()
        }
    }

    /// Declare the accepted values for a named parameter
    pub fn with_supported_values<K, I, V>(mut self, key: K, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.supported_values
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn supported_preview_sizes(&self) -> &[Resolution] {
        &self.supported_preview_sizes
    }

    pub fn supported_picture_sizes(&self) -> &[Resolution] {
        &self.supported_picture_sizes
    }

    pub fn preview_size(&self) -> Option<Resolution> {
        self.preview_size
    }

    pub fn picture_size(&self) -> Option<Resolution> {
        self.picture_size
    }

    pub fn set_preview_size(&mut self, size: Resolution) -> Result<()> {
        if !self.supported_preview_sizes.contains(&size) {
            return Err(CameraError::UnsupportedResolution {
                kind: "preview",
                resolution: size,
            }
            .into());
        }
        self.preview_size = Some(size);
        Ok(())
    }

    pub fn set_picture_size(&mut self, size: Resolution) -> Result<()> {
        if !self.supported_picture_sizes.contains(&size) {
            return Err(CameraError::UnsupportedResolution {
                kind: "picture",
                resolution: size,
            }
            .into());
        }
        self.picture_size = Some(size);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> Result<()> {
        let key = key.into();
        let value = value.into();

        if let Some(supported) = self.supported_values.get(&key) {
            if !supported.contains(&value) {
                return Err(CameraError::InvalidParameter {
                    name: key,
                    details: format!("'{}' is not one of {:?}", value, supported),
                }
                .into());
            }
        }

        self.values.insert(key, value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}

/// Invoked once with the encoded still, on a thread owned by the hardware
pub type PictureCallback = Box<dyn FnOnce(Result<Vec<u8>>) + Send + 'static>;

/// An acquired camera. Every method is called from the owner thread only.
pub trait CameraDevice: Send {
    /// Current parameters, including the supported size lists
    fn parameters(&self) -> CameraParameters;

    fn set_parameters(&mut self, parameters: CameraParameters) -> Result<()>;

    fn set_display_orientation(&mut self, degrees: u32) -> Result<()>;

    fn bind_preview_target(&mut self, target: &PreviewTarget) -> Result<()>;

    fn start_preview(&mut self) -> Result<()>;

    fn stop_preview(&mut self) -> Result<()>;

    /// Request a single still. The callback may run on any thread.
    fn take_picture(&mut self, on_picture: PictureCallback) -> Result<()>;

    /// Give the hardware back. Must not fail.
    fn release(&mut self);
}

/// Platform entry point for acquiring devices
pub trait CameraBackend: Send {
    fn open(&mut self, facing: Facing) -> Result<Box<dyn CameraDevice>>;

    /// Angle the sensor is mounted at relative to the natural device orientation
    fn sensor_orientation(&self, facing: Facing) -> u32;
}
