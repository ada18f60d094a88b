use crate::camera::PreviewTarget;
use crate::frame::CorrectedImage;

/// Whether the captured picture is shown over the preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shown,
    Hidden,
}

/// Provides the render target a preview is bound to
pub trait PreviewSurface {
    fn preview_target(&self) -> PreviewTarget;
}

/// Receives corrected stills; ownership of the image moves to the view
pub trait PictureSink {
    fn on_picture_taken(&mut self, image: CorrectedImage);
}

/// Shows or hides the captured picture
pub trait PictureVisibility {
    fn on_picture_visibility_changed(&mut self, visibility: Visibility);
}

/// Everything the controller needs from its view
pub trait CameraView: PreviewSurface + PictureSink + PictureVisibility {}

impl<T: PreviewSurface + PictureSink + PictureVisibility> CameraView for T {}
