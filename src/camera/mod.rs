mod configuration;
mod device;
mod manager;
mod mock;
#[cfg(test)]
mod tests;

pub use configuration::{
    CameraConfiguration, ConfigurationPipeline, FnConfiguration, ParameterConfiguration,
};
pub use device::{
    CameraBackend, CameraDevice, CameraParameters, Facing, PictureCallback, PreviewTarget,
    Resolution,
};
pub use manager::{CameraDeviceHandle, CameraDeviceManager, DeviceState, HandleId};
pub use mock::{test_picture, CaptureMode, MockCameraBackend};
