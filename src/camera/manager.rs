use super::configuration::ConfigurationPipeline;
use super::device::{
    CameraBackend, CameraDevice, Facing, PictureCallback, PreviewTarget, Resolution,
};
use crate::error::{CameraError, Result};
use crate::orientation::{OrientationResolver, OrientationSensor, OrientationState};
use std::fmt;
use tracing::{debug, info, warn};

/// Identity of one open/close cycle of the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of the hardware handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Closed,
    Open,
    PreviewActive,
}

/// Exclusively owned hardware resource
pub struct CameraDeviceHandle {
    id: HandleId,
    facing: Facing,
    state: DeviceState,
    device: Box<dyn CameraDevice>,
}

impl CameraDeviceHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }
}

/// Owns the single hardware handle slot and every call made on it
pub struct CameraDeviceManager {
    backend: Box<dyn CameraBackend>,
    orientation: Box<dyn OrientationSensor>,
    configurations: ConfigurationPipeline,
    facing: Facing,
    handle: Option<CameraDeviceHandle>,
    next_handle: u64,
}

impl CameraDeviceManager {
    pub fn new(
        backend: Box<dyn CameraBackend>,
        orientation: Box<dyn OrientationSensor>,
        facing: Facing,
    ) -> Self {
        Self {
            backend,
            orientation,
            configurations: ConfigurationPipeline::new(),
            facing,
            handle: None,
            next_handle: 1,
        }
    }

    pub fn configurations(&self) -> &ConfigurationPipeline {
        &self.configurations
    }

    pub fn configurations_mut(&mut self) -> &mut ConfigurationPipeline {
        &mut self.configurations
    }

    /// Facing used by the next open
    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn set_facing(&mut self, facing: Facing) {
        self.facing = facing;
    }

    pub fn state(&self) -> DeviceState {
        self.handle
            .as_ref()
            .map(|handle| handle.state)
            .unwrap_or(DeviceState::Closed)
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn current_handle(&self) -> Option<&CameraDeviceHandle> {
        self.handle.as_ref()
    }

    pub fn current_handle_id(&self) -> Option<HandleId> {
        self.handle.as_ref().map(|handle| handle.id)
    }

    /// Snapshot of the orientation inputs for a facing
    pub fn orientation_state(&self, facing: Facing) -> OrientationState {
        OrientationState {
            display_rotation: self.orientation.display_rotation(),
            sensor_mount: self.backend.sensor_orientation(facing),
            layout_orientation: self.orientation.layout_orientation(),
        }
    }

    /// Acquire the hardware, set its display orientation and run the
    /// configuration pipeline. A failure at any step releases the device.
    pub fn open(&mut self, facing: Facing) -> Result<HandleId> {
        if let Some(existing) = self.current_handle_id() {
            warn!("Camera handle {} still open; closing before reopen", existing);
            self.close();
        }

        info!("Opening {} camera", facing);
        let mut device = self.backend.open(facing)?;

        let orientation = self.orientation_state(facing);
        let degrees = OrientationResolver::display_orientation(
            orientation.sensor_mount,
            orientation.display_rotation,
            facing,
        );

        if let Err(e) = self.prepare(device.as_mut(), degrees) {
            warn!("Camera setup failed, releasing device: {}", e);
            device.release();
            return Err(e);
        }

        let id = HandleId(self.next_handle);
        self.next_handle += 1;
        self.facing = facing;
        self.handle = Some(CameraDeviceHandle {
            id,
            facing,
            state: DeviceState::Open,
            device,
        });

        info!(
            "Camera {} open ({} facing, display orientation {}°)",
            id, facing, degrees
        );
        Ok(id)
    }

    fn prepare(&self, device: &mut dyn CameraDevice, display_orientation: u32) -> Result<()> {
        device.set_display_orientation(display_orientation)?;
        self.configurations.apply_to(device)
    }

    /// Stop preview if running, then release the hardware. Returns whether a
    /// handle was actually closed; closing nothing is not an error.
    pub fn close(&mut self) -> bool {
        let Some(mut handle) = self.handle.take() else {
            debug!("Close requested with no open camera");
            return false;
        };

        if handle.state == DeviceState::PreviewActive {
            if let Err(e) = handle.device.stop_preview() {
                warn!("Failed to stop preview on {}: {}", handle.id, e);
            }
        }

        handle.device.release();
        info!("Camera {} released", handle.id);
        true
    }

    pub fn bind_preview_target(&mut self, target: &PreviewTarget) -> Result<()> {
        let handle = self.active_handle("bind_preview_target")?;
        handle.device.bind_preview_target(target).map_err(|e| match e {
            crate::error::SnapcamError::Camera(CameraError::SurfaceBindingFailed { .. }) => e,
            other => CameraError::SurfaceBindingFailed {
                details: other.to_string(),
            }
            .into(),
        })?;
        debug!("Bound preview target {} to {}", target.id, handle.id);
        Ok(())
    }

    pub fn current_supported_preview_sizes(&self) -> Result<Vec<Resolution>> {
        let handle = self.handle.as_ref().ok_or(CameraError::NoActiveDevice {
            operation: "current_supported_preview_sizes",
        })?;
        Ok(handle.device.parameters().supported_preview_sizes().to_vec())
    }

    pub fn current_supported_picture_sizes(&self) -> Result<Vec<Resolution>> {
        let handle = self.handle.as_ref().ok_or(CameraError::NoActiveDevice {
            operation: "current_supported_picture_sizes",
        })?;
        Ok(handle.device.parameters().supported_picture_sizes().to_vec())
    }

    /// Set preview and picture sizes and (re)start the preview. `None` keeps
    /// the size the device currently has. Both sizes are checked before
    /// anything is changed.
    pub fn apply_resolution(
        &mut self,
        preview: Option<Resolution>,
        picture: Option<Resolution>,
    ) -> Result<()> {
        let handle = self.active_handle("apply_resolution")?;

        let mut parameters = handle.device.parameters();
        if let Some(size) = preview {
            parameters.set_preview_size(size)?;
        }
        if let Some(size) = picture {
            parameters.set_picture_size(size)?;
        }

        if handle.state == DeviceState::PreviewActive {
            handle.device.stop_preview()?;
            handle.state = DeviceState::Open;
        }

        handle.device.set_parameters(parameters)?;
        debug!(
            "Applied preview {:?} / picture {:?} to {}",
            preview, picture, handle.id
        );

        self.start_preview()
    }

    pub fn start_preview(&mut self) -> Result<()> {
        let handle = self.active_handle("start_preview")?;
        if handle.state == DeviceState::PreviewActive {
            return Ok(());
        }

        handle.device.start_preview()?;
        handle.state = DeviceState::PreviewActive;
        debug!("Preview started on {}", handle.id);
        Ok(())
    }

    pub fn stop_preview(&mut self) -> Result<()> {
        let handle = self.active_handle("stop_preview")?;
        if handle.state != DeviceState::PreviewActive {
            return Ok(());
        }

        // The preview counts as stopped even when the hardware complains
        handle.state = DeviceState::Open;
        handle.device.stop_preview()?;
        debug!("Preview stopped on {}", handle.id);
        Ok(())
    }

    /// Issue a still capture on the current handle
    pub fn take_picture(&mut self, on_picture: PictureCallback) -> Result<HandleId> {
        let handle = self.active_handle("take_picture")?;
        if handle.state != DeviceState::PreviewActive {
            return Err(CameraError::NoActiveDevice {
                operation: "take_picture",
            }
            .into());
        }

        handle.device.take_picture(on_picture)?;
        Ok(handle.id)
    }

    fn active_handle(&mut self, operation: &'static str) -> Result<&mut CameraDeviceHandle> {
        self.handle
            .as_mut()
            .ok_or_else(|| CameraError::NoActiveDevice { operation }.into())
    }
}

impl Drop for CameraDeviceManager {
    fn drop(&mut self) {
        self.close();
    }
}
