mod binding;
mod capture;
mod mailbox;
mod runtime;
mod view;

pub use binding::{
    negotiate_sizes, BindingState, SurfaceBindingController, SurfaceBindingControllerBuilder,
    SurfaceGeometry,
};
pub use capture::{CaptureCoordinator, PendingCapture};
pub use mailbox::{ControllerMessage, Mailbox, PictureDelivery, SurfaceEvent};
pub use runtime::{ControllerRuntime, OWNER_THREAD_NAME};
pub use view::{CameraView, PictureSink, PictureVisibility, PreviewSurface, Visibility};
