use super::capture::CaptureCoordinator;
use super::mailbox::{ControllerMessage, Mailbox, PictureDelivery, SurfaceEvent};
use super::view::{CameraView, Visibility};
use crate::camera::{
    CameraBackend, CameraConfiguration, CameraDeviceManager, ConfigurationPipeline, DeviceState,
    Facing, HandleId, ParameterConfiguration, Resolution,
};
use crate::config::SnapcamConfig;
use crate::error::{CameraError, Result, SnapcamError};
use crate::events::{CameraEvent, EventBus};
use crate::negotiator::{SizeNegotiator, SizePolicy};
use crate::orientation::OrientationSensor;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::SystemTime;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Last known size of the bound render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceGeometry {
    #[default]
    Unknown,
    Known { width: u32, height: u32 },
}

/// Observable state of the surface/camera pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    NoSurface,
    Inactive,
    Active,
}

/// Drives the camera from surface lifecycle notifications and explicit
/// commands. All state changes happen on the owner thread; other threads
/// talk to it through its `Mailbox`.
pub struct SurfaceBindingController<V: CameraView> {
    view: V,
    manager: CameraDeviceManager,
    size_policy: Box<dyn SizePolicy>,
    capture: CaptureCoordinator,
    event_bus: Arc<EventBus>,
    geometry: SurfaceGeometry,
    surface_present: bool,
    mailbox: Mailbox,
    inbox: mpsc::UnboundedReceiver<ControllerMessage>,
    owner: ThreadId,
}

impl<V: CameraView> SurfaceBindingController<V> {
    pub fn builder() -> SurfaceBindingControllerBuilder<V> {
        SurfaceBindingControllerBuilder::new()
    }

    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn manager(&self) -> &CameraDeviceManager {
        &self.manager
    }

    pub fn configurations_mut(&mut self) -> &mut ConfigurationPipeline {
        self.manager.configurations_mut()
    }

    pub fn geometry(&self) -> SurfaceGeometry {
        self.geometry
    }

    pub fn facing(&self) -> Facing {
        self.manager.facing()
    }

    /// True exactly while the preview is running
    pub fn is_camera_active(&self) -> bool {
        self.manager.state() == DeviceState::PreviewActive
    }

    pub fn state(&self) -> BindingState {
        if !self.surface_present {
            BindingState::NoSurface
        } else if self.is_camera_active() {
            BindingState::Active
        } else {
            BindingState::Inactive
        }
    }

    pub fn capture_pending(&self) -> bool {
        self.capture.is_pending()
    }

    /// The surface counts as present even if opening the camera fails, so
    /// a later `start_camera` can retry without another notification.
    pub fn on_surface_created(&mut self) -> Result<()> {
        info!("Preview surface created");
        self.surface_present = true;
        self.start_camera()
    }

    pub fn on_surface_changed(&mut self, width: u32, height: u32) -> Result<()> {
        debug!("Preview surface changed to {}x{}", width, height);
        self.geometry = SurfaceGeometry::Known { width, height };

        if !self.manager.is_open() {
            debug!("No open camera; keeping geometry for the next start");
            return Ok(());
        }

        self.configure_preview()
    }

    pub fn on_surface_destroyed(&mut self) {
        info!("Preview surface destroyed");
        self.stop_camera();
        self.surface_present = false;
        self.geometry = SurfaceGeometry::Unknown;
    }

    /// (Re)open the camera on the bound surface. An open handle is closed
    /// first; known geometry is reused so preview starts without waiting
    /// for another change notification.
    pub fn start_camera(&mut self) -> Result<()> {
        if !self.surface_present {
            warn!("Camera start requested before a surface exists; waiting for surface");
            return Ok(());
        }

        self.view.on_picture_visibility_changed(Visibility::Hidden);

        if self.manager.is_open() {
            self.stop_camera();
        }

        self.open_and_bind()?;
        self.configure_preview()
    }

    /// Stop preview and release the camera. Safe to call repeatedly.
    pub fn stop_camera(&mut self) {
        self.capture.abandon();

        let facing = self.manager.facing();
        if self.manager.close() {
            self.notify(CameraEvent::CameraChanged {
                facing,
                open: false,
                timestamp: SystemTime::now(),
            });
        }
    }

    /// Request a still from the running preview
    pub fn take_picture(&mut self) -> Result<Uuid> {
        self.capture.request(&mut self.manager)
    }

    /// Use another sensor. An open camera is fully closed and reopened.
    pub fn switch_facing(&mut self, facing: Facing) -> Result<()> {
        if facing == self.manager.facing() {
            return Ok(());
        }

        info!("Switching camera to {} facing", facing);
        let was_open = self.manager.is_open();
        self.stop_camera();
        self.manager.set_facing(facing);

        if was_open {
            self.start_camera()?;
        }
        Ok(())
    }

    pub fn toggle_facing(&mut self) -> Result<()> {
        let next = self.manager.facing().toggled();
        self.switch_facing(next)
    }

    /// Handle everything already posted to the mailbox without blocking.
    /// Returns the number of messages handled.
    pub fn process_pending(&mut self) -> usize {
        self.check_owner();

        let mut handled = 0;
        loop {
            match self.inbox.try_recv() {
                Ok(message) => {
                    handled += 1;
                    if !self.dispatch(message) {
                        break;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        handled
    }

    /// Block the current thread handling messages until `Shutdown`.
    /// Must not be called from inside an async context.
    pub fn run(&mut self) {
        self.check_owner();
        info!("Camera controller running");

        while let Some(message) = self.inbox.blocking_recv() {
            if !self.dispatch(message) {
                break;
            }
        }

        self.stop_camera();
        info!("Camera controller stopped");
    }

    /// Apply one message. Returns false on shutdown.
    pub fn dispatch(&mut self, message: ControllerMessage) -> bool {
        trace!("Dispatching {:?}", message);

        let result = match message {
            ControllerMessage::Surface(SurfaceEvent::Created) => self.on_surface_created(),
            ControllerMessage::Surface(SurfaceEvent::Changed { width, height }) => {
                self.on_surface_changed(width, height)
            }
            ControllerMessage::Surface(SurfaceEvent::Destroyed) => {
                self.on_surface_destroyed();
                Ok(())
            }
            ControllerMessage::StartCamera => self.start_camera(),
            ControllerMessage::StopCamera => {
                self.stop_camera();
                Ok(())
            }
            ControllerMessage::TakePicture => self.take_picture().map(|_| ()),
            ControllerMessage::SwitchFacing(facing) => self.switch_facing(facing),
            ControllerMessage::PictureReady(delivery) => self.on_picture_ready(delivery),
            ControllerMessage::Shutdown => return false,
        };

        if let Err(e) = result {
            self.report_error("camera_controller", &e);
        }
        true
    }

    /// Hand a delivered still to the view, then tear the camera down
    fn on_picture_ready(&mut self, delivery: PictureDelivery) -> Result<()> {
        let current = self.manager.current_handle_id();

        let corrected = match self.capture.complete(delivery, current) {
            Ok(Some(corrected)) => corrected,
            Ok(None) => return Ok(()),
            Err(e) => {
                // The capture consumed the preview either way
                self.stop_camera();
                return Err(e);
            }
        };

        let event = CameraEvent::PictureTaken {
            capture_id: corrected.capture_id,
            width: corrected.width(),
            height: corrected.height(),
            rotation: corrected.rotation.degrees(),
            mirrored: corrected.mirrored,
            timestamp: SystemTime::now(),
        };

        self.view.on_picture_taken(corrected);
        self.view.on_picture_visibility_changed(Visibility::Shown);

        self.stop_camera();
        self.notify(event);
        Ok(())
    }

    fn open_and_bind(&mut self) -> Result<HandleId> {
        let facing = self.manager.facing();
        let id = self.manager.open(facing)?;

        let target = self.view.preview_target();
        if let Err(e) = self.manager.bind_preview_target(&target) {
            error!("Failed to bind preview target {}: {}", target.id, e);
            self.manager.close();
            return Err(e);
        }

        self.notify(CameraEvent::CameraChanged {
            facing,
            open: true,
            timestamp: SystemTime::now(),
        });
        Ok(id)
    }

    /// Negotiate sizes for the known geometry and start the preview.
    /// Size rejections fall back to the device defaults.
    fn configure_preview(&mut self) -> Result<()> {
        let SurfaceGeometry::Known { width, height } = self.geometry else {
            debug!("Surface geometry unknown; preview waits for a change notification");
            return Ok(());
        };

        let preview_sizes = self.manager.current_supported_preview_sizes()?;
        let picture_sizes = self.manager.current_supported_picture_sizes()?;
        let (mut preview, mut picture) = negotiate_sizes(
            self.size_policy.as_ref(),
            width,
            height,
            &preview_sizes,
            &picture_sizes,
        );

        debug!(
            "Negotiated preview {:?} and picture {:?} for {}x{} surface",
            preview, picture, width, height
        );

        // An unsupported size only drops that size; each retry clears one
        loop {
            match self.manager.apply_resolution(preview, picture) {
                Ok(()) => break,
                Err(SnapcamError::Camera(CameraError::UnsupportedResolution {
                    kind,
                    resolution,
                })) if (kind == "preview" && preview.is_some())
                    || (kind == "picture" && picture.is_some()) =>
                {
                    warn!("Skipping unsupported {} size {}", kind, resolution);
                    if kind == "preview" {
                        preview = None;
                    } else {
                        picture = None;
                    }
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Keeping device sizes: {}", e);
                    self.manager.start_preview()?;
                    preview = None;
                    picture = None;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        self.notify(CameraEvent::PreviewStarted {
            preview,
            picture,
            timestamp: SystemTime::now(),
        });
        Ok(())
    }

    fn notify(&self, event: CameraEvent) {
        if !self.event_bus.has_subscribers() {
            trace!("No subscribers for {}", event.event_type());
            return;
        }
        if let Err(e) = self.event_bus.publish(event) {
            debug!("Event not delivered: {}", e);
        }
    }

    fn report_error(&self, component: &str, e: &SnapcamError) {
        error!("{} failed: {}", component, e);
        self.notify(CameraEvent::SystemError {
            component: component.to_string(),
            error: e.to_string(),
        });
    }

    fn check_owner(&self) {
        if thread::current().id() != self.owner {
            warn!("Camera controller driven from a thread other than its owner");
        }
    }
}

/// Builder for the surface binding controller
pub struct SurfaceBindingControllerBuilder<V: CameraView> {
    view: Option<V>,
    backend: Option<Box<dyn CameraBackend>>,
    orientation: Option<Box<dyn OrientationSensor>>,
    event_bus: Option<Arc<EventBus>>,
    size_policy: Box<dyn SizePolicy>,
    facing: Facing,
    configurations: Vec<Arc<dyn CameraConfiguration>>,
}

impl<V: CameraView> SurfaceBindingControllerBuilder<V> {
    pub fn new() -> Self {
        Self {
            view: None,
            backend: None,
            orientation: None,
            event_bus: None,
            size_policy: Box::new(SizeNegotiator),
            facing: Facing::default(),
            configurations: Vec::new(),
        }
    }

    pub fn view(mut self, view: V) -> Self {
        self.view = Some(view);
        self
    }

    pub fn backend<B: CameraBackend + 'static>(mut self, backend: B) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    pub fn orientation<O: OrientationSensor + 'static>(mut self, orientation: O) -> Self {
        self.orientation = Some(Box::new(orientation));
        self
    }

    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn size_policy<P: SizePolicy + 'static>(mut self, policy: P) -> Self {
        self.size_policy = Box::new(policy);
        self
    }

    pub fn facing(mut self, facing: Facing) -> Self {
        self.facing = facing;
        self
    }

    pub fn configuration<C: CameraConfiguration + 'static>(mut self, configuration: C) -> Self {
        self.configurations.push(Arc::new(configuration));
        self
    }

    /// Take facing and parameter settings from loaded configuration
    pub fn config(mut self, config: &SnapcamConfig) -> Self {
        self.facing = config.camera.facing;
        for setting in &config.camera.parameters {
            self.configurations.push(Arc::new(ParameterConfiguration::new(
                setting.key.clone(),
                setting.value.clone(),
            )));
        }
        self
    }

    /// Build on the current thread, which becomes the owner thread
    pub fn build(self) -> Result<SurfaceBindingController<V>> {
        let view = self
            .view
            .ok_or_else(|| SnapcamError::system("Camera view must be specified"))?;
        let backend = self
            .backend
            .ok_or_else(|| SnapcamError::system("Camera backend must be specified"))?;
        let orientation = self
            .orientation
            .ok_or_else(|| SnapcamError::system("Orientation sensor must be specified"))?;
        let event_bus = self
            .event_bus
            .unwrap_or_else(|| Arc::new(EventBus::new(100)));

        let mut manager = CameraDeviceManager::new(backend, orientation, self.facing);
        for configuration in self.configurations {
            manager.configurations_mut().add_shared(configuration);
        }

        let (mailbox, inbox) = Mailbox::channel();

        Ok(SurfaceBindingController {
            view,
            manager,
            size_policy: self.size_policy,
            capture: CaptureCoordinator::new(mailbox.clone()),
            event_bus,
            geometry: SurfaceGeometry::Unknown,
            surface_present: false,
            mailbox,
            inbox,
            owner: thread::current().id(),
        })
    }
}

impl<V: CameraView> Default for SurfaceBindingControllerBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick a preview size for the surface, then a picture size sharing the
/// chosen preview's proportions
pub fn negotiate_sizes(
    policy: &dyn SizePolicy,
    width: u32,
    height: u32,
    preview_sizes: &[Resolution],
    picture_sizes: &[Resolution],
) -> (Option<Resolution>, Option<Resolution>) {
    let preview = policy.select(width, height, preview_sizes);
    let picture = preview.and_then(|size| policy.select(size.width, size.height, picture_sizes));
    (preview, picture)
}
