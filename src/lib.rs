pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod frame;
pub mod negotiator;
pub mod orientation;

pub use camera::{
    CameraBackend, CameraConfiguration, CameraDevice, CameraDeviceManager, CameraParameters,
    ConfigurationPipeline, DeviceState, Facing, FnConfiguration, HandleId,
    ParameterConfiguration, PreviewTarget, Resolution,
};
pub use config::SnapcamConfig;
pub use controller::{
    BindingState, CameraView, ControllerRuntime, Mailbox, PictureSink, PictureVisibility,
    PreviewSurface, SurfaceBindingController, SurfaceBindingControllerBuilder, SurfaceGeometry,
    Visibility,
};
pub use error::{CameraError, EventBusError, Result, SnapcamError};
pub use events::{CameraEvent, EventBus, EventFilter, EventReceiver};
pub use frame::{CorrectedImage, FrameProcessor, Rotation};
pub use negotiator::{select_optimal_size, SizeNegotiator, SizePolicy};
pub use orientation::{FixedOrientation, OrientationResolver, OrientationSensor, OrientationState};
