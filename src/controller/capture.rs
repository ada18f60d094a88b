use super::mailbox::{ControllerMessage, Mailbox, PictureDelivery};
use crate::camera::{CameraDeviceManager, DeviceState, Facing, HandleId, PictureCallback};
use crate::error::{CameraError, Result};
use crate::frame::{CorrectedImage, FrameProcessor};
use crate::orientation::{OrientationResolver, OrientationState};
use chrono::{DateTime, Utc};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Inputs frozen at the moment a still was requested
#[derive(Debug, Clone)]
pub struct PendingCapture {
    pub capture_id: Uuid,
    pub handle: HandleId,
    pub facing: Facing,
    pub orientation: OrientationState,
    pub requested_at: DateTime<Utc>,
}

/// Tracks the single in-flight still and turns deliveries into corrected images
pub struct CaptureCoordinator {
    mailbox: Mailbox,
    pending: Option<PendingCapture>,
}

impl CaptureCoordinator {
    pub fn new(mailbox: Mailbox) -> Self {
        Self {
            mailbox,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingCapture> {
        self.pending.as_ref()
    }

    /// Ask the hardware for one still. The hardware callback only posts the
    /// bytes back to the owner's mailbox.
    pub fn request(&mut self, manager: &mut CameraDeviceManager) -> Result<Uuid> {
        if let Some(pending) = &self.pending {
            debug!("Capture {} still pending", pending.capture_id);
            return Err(CameraError::CaptureInProgress.into());
        }

        let (handle, facing) = match manager.current_handle() {
            Some(handle) if handle.state() == DeviceState::PreviewActive => {
                (handle.id(), handle.facing())
            }
            _ => {
                return Err(CameraError::NoActiveDevice {
                    operation: "take_picture",
                }
                .into())
            }
        };

        let orientation = manager.orientation_state(facing);
        let capture_id = Uuid::new_v4();
        let mailbox = self.mailbox.clone();

        let callback: PictureCallback = Box::new(move |data| {
            let delivery = PictureDelivery {
                capture_id,
                handle,
                facing,
                orientation,
                data,
            };
            if mailbox
                .post(ControllerMessage::PictureReady(delivery))
                .is_err()
            {
                trace!("Controller gone; dropping still {}", capture_id);
            }
        });

        manager.take_picture(callback)?;

        self.pending = Some(PendingCapture {
            capture_id,
            handle,
            facing,
            orientation,
            requested_at: Utc::now(),
        });

        info!("Requested still {} from {} ({} facing)", capture_id, handle, facing);
        Ok(capture_id)
    }

    /// Forget the outstanding request, so its delivery will be dropped
    pub fn abandon(&mut self) -> Option<PendingCapture> {
        let abandoned = self.pending.take();
        if let Some(pending) = &abandoned {
            debug!("Abandoned capture {}", pending.capture_id);
        }
        abandoned
    }

    /// Decode and correct a delivered still. Deliveries for a handle that is
    /// no longer open, or for a request that was abandoned, yield `Ok(None)`.
    pub fn complete(
        &mut self,
        delivery: PictureDelivery,
        current_handle: Option<HandleId>,
    ) -> Result<Option<CorrectedImage>> {
        let expected = self.pending.as_ref().is_some_and(|pending| {
            pending.capture_id == delivery.capture_id && pending.handle == delivery.handle
        });

        if !expected || current_handle != Some(delivery.handle) {
            warn!(
                "Discarding late still {} for handle {}",
                delivery.capture_id, delivery.handle
            );
            return Ok(None);
        }

        let Some(pending) = self.pending.take() else {
            return Ok(None);
        };

        let data = delivery.data?;
        let rotation =
            OrientationResolver::capture_rotation_for(&pending.orientation, pending.facing);
        let mirrored = pending.facing.is_front();
        let image = FrameProcessor::correct(&data, rotation, mirrored)?;

        info!(
            "Still {} decoded: {}x{} (rotation {}°, mirrored: {})",
            pending.capture_id,
            image.width(),
            image.height(),
            rotation.degrees(),
            mirrored
        );

        Ok(Some(CorrectedImage {
            capture_id: pending.capture_id,
            image,
            facing: pending.facing,
            rotation,
            mirrored,
            captured_at: pending.requested_at,
        }))
    }
}
