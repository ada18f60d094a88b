use crate::camera::{Facing, Resolution};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl SnapcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Failures that leave the device usable: the caller may skip the
    /// offending setting and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SnapcamError::Camera(CameraError::UnsupportedResolution { .. })
                | SnapcamError::Camera(CameraError::InvalidParameter { .. })
        )
    }
}

/// Camera hardware and lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("{facing} camera unavailable: {details}")]
    DeviceUnavailable { facing: Facing, details: String },

    #[error("No active camera device for {operation}")]
    NoActiveDevice { operation: &'static str },

    #[error("Unsupported {kind} resolution {resolution}")]
    UnsupportedResolution {
        kind: &'static str,
        resolution: Resolution,
    },

    #[error("Invalid parameter '{name}': {details}")]
    InvalidParameter { name: String, details: String },

    #[error("Failed to bind preview surface: {details}")]
    SurfaceBindingFailed { details: String },

    #[error("A picture capture is already in progress")]
    CaptureInProgress,

    #[error("Failed to decode captured picture: {details}")]
    PictureDecode { details: String },
}

/// Event bus errors
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, SnapcamError>;
