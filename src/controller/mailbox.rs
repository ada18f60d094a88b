use crate::camera::{Facing, HandleId};
use crate::error::{EventBusError, Result};
use crate::orientation::OrientationState;
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

/// Render-surface lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Created,
    Changed { width: u32, height: u32 },
    Destroyed,
}

/// A still delivered by the hardware, tagged with what was true when it was requested
#[derive(Debug)]
pub struct PictureDelivery {
    pub capture_id: Uuid,
    pub handle: HandleId,
    pub facing: Facing,
    pub orientation: OrientationState,
    pub data: Result<Vec<u8>>,
}

/// Work posted to the owner thread
#[derive(Debug)]
pub enum ControllerMessage {
    Surface(SurfaceEvent),
    StartCamera,
    StopCamera,
    TakePicture,
    SwitchFacing(Facing),
    PictureReady(PictureDelivery),
    Shutdown,
}

/// Sending half of the owner thread's inbox. Cheap to clone and usable from any thread.
#[derive(Debug, Clone)]
pub struct Mailbox {
    sender: mpsc::UnboundedSender<ControllerMessage>,
}

impl Mailbox {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<ControllerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn post(&self, message: ControllerMessage) -> Result<()> {
        trace!("Posting {:?}", message);
        self.sender
            .send(message)
            .map_err(|_| EventBusError::ChannelClosed.into())
    }

    pub fn surface_created(&self) -> Result<()> {
        self.post(ControllerMessage::Surface(SurfaceEvent::Created))
    }

    pub fn surface_changed(&self, width: u32, height: u32) -> Result<()> {
        self.post(ControllerMessage::Surface(SurfaceEvent::Changed { width, height }))
    }

    pub fn surface_destroyed(&self) -> Result<()> {
        self.post(ControllerMessage::Surface(SurfaceEvent::Destroyed))
    }

    pub fn start_camera(&self) -> Result<()> {
        self.post(ControllerMessage::StartCamera)
    }

    pub fn stop_camera(&self) -> Result<()> {
        self.post(ControllerMessage::StopCamera)
    }

    pub fn take_picture(&self) -> Result<()> {
        self.post(ControllerMessage::TakePicture)
    }

    pub fn switch_facing(&self, facing: Facing) -> Result<()> {
        self.post(ControllerMessage::SwitchFacing(facing))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.post(ControllerMessage::Shutdown)
    }

    /// Whether the owner is still receiving
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
