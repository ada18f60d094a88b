use super::device::{
    CameraBackend, CameraDevice, CameraParameters, Facing, PictureCallback, PreviewTarget,
    Resolution,
};
use crate::error::{CameraError, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// How the simulated hardware delivers stills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Held until `complete_pending_capture` is called
    Deferred,
    /// Delivered from a freshly spawned hardware thread
    Background,
}

struct MockState {
    calls: Vec<String>,
    open_devices: usize,
    opens: usize,
    releases: usize,
    fail_open: bool,
    fail_bind: bool,
    fail_stop_preview: bool,
    reject_parameters: bool,
    preview_sizes: Vec<Resolution>,
    picture_sizes: Vec<Resolution>,
    supported_values: Vec<(String, Vec<String>)>,
    front_sensor: u32,
    back_sensor: u32,
    picture: Vec<u8>,
    capture_mode: CaptureMode,
    pending: Vec<PictureCallback>,
    last_parameters: Option<CameraParameters>,
    display_orientation: Option<u32>,
    bound_target: Option<PreviewTarget>,
}

/// Simulated camera hardware. Clones share state, so a test can keep one
/// clone as a probe while the controller owns another.
#[derive(Clone)]
pub struct MockCameraBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockCameraBackend {
    pub fn new() -> Self {
        let state = MockState {
            calls: Vec::new(),
            open_devices: 0,
            opens: 0,
            releases: 0,
            fail_open: false,
            fail_bind: false,
            fail_stop_preview: false,
            reject_parameters: false,
            preview_sizes: vec![
                Resolution::new(1920, 1080),
                Resolution::new(1280, 720),
                Resolution::new(800, 600),
                Resolution::new(640, 480),
                Resolution::new(176, 144),
            ],
            picture_sizes: vec![
                Resolution::new(4000, 3000),
                Resolution::new(3264, 2448),
                Resolution::new(1920, 1080),
                Resolution::new(1280, 960),
                Resolution::new(640, 480),
            ],
            supported_values: Vec::new(),
            front_sensor: 270,
            back_sensor: 90,
            picture: test_picture(4, 3),
            capture_mode: CaptureMode::Deferred,
            pending: Vec::new(),
            last_parameters: None,
            display_orientation: None,
            bound_target: None,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_preview_sizes(self, sizes: Vec<Resolution>) -> Self {
        self.state.lock().preview_sizes = sizes;
        self
    }

    pub fn with_picture_sizes(self, sizes: Vec<Resolution>) -> Self {
        self.state.lock().picture_sizes = sizes;
        self
    }

    pub fn with_sensor_orientation(self, facing: Facing, degrees: u32) -> Self {
        {
            let mut state = self.state.lock();
            match facing {
                Facing::Front => state.front_sensor = degrees,
                Facing::Back => state.back_sensor = degrees,
            }
        }
        self
    }

    pub fn with_supported_values<K: Into<String>>(self, key: K, values: &[&str]) -> Self {
        self.state.lock().supported_values.push((
            key.into(),
            values.iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    pub fn with_picture(self, encoded: Vec<u8>) -> Self {
        self.state.lock().picture = encoded;
        self
    }

    pub fn with_capture_mode(self, mode: CaptureMode) -> Self {
        self.state.lock().capture_mode = mode;
        self
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    pub fn set_fail_bind(&self, fail: bool) {
        self.state.lock().fail_bind = fail;
    }

    pub fn set_fail_stop_preview(&self, fail: bool) {
        self.state.lock().fail_stop_preview = fail;
    }

    pub fn set_reject_parameters(&self, reject: bool) {
        self.state.lock().reject_parameters = reject;
    }

    /// Devices acquired and not yet released
    pub fn open_devices(&self) -> usize {
        self.state.lock().open_devices
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }

    pub fn release_count(&self) -> usize {
        self.state.lock().releases
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn last_parameters(&self) -> Option<CameraParameters> {
        self.state.lock().last_parameters.clone()
    }

    pub fn display_orientation(&self) -> Option<u32> {
        self.state.lock().display_orientation
    }

    pub fn bound_target(&self) -> Option<PreviewTarget> {
        self.state.lock().bound_target.clone()
    }

    pub fn pending_captures(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Deliver the oldest held still. The callback runs on the calling thread.
    pub fn complete_pending_capture(&self) -> bool {
        let (callback, picture) = {
            let mut state = self.state.lock();
            if state.pending.is_empty() {
                return false;
            }
            (state.pending.remove(0), state.picture.clone())
        };

        callback(Ok(picture));
        true
    }

    /// Fail the oldest held still
    pub fn fail_pending_capture(&self, details: &str) -> bool {
        let callback = {
            let mut state = self.state.lock();
            if state.pending.is_empty() {
                return false;
            }
            state.pending.remove(0)
        };

        callback(Err(CameraError::PictureDecode {
            details: details.to_string(),
        }
        .into()));
        true
    }
}

impl Default for MockCameraBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for MockCameraBackend {
    fn open(&mut self, facing: Facing) -> Result<Box<dyn CameraDevice>> {
        let mut state = self.state.lock();
        state.calls.push(format!("open:{}", facing));

        if state.fail_open {
            return Err(CameraError::DeviceUnavailable {
                facing,
                details: "simulated hardware busy".to_string(),
            }
            .into());
        }

        if state.open_devices > 0 {
            return Err(CameraError::DeviceUnavailable {
                facing,
                details: "device already in use".to_string(),
            }
            .into());
        }

        state.open_devices += 1;
        state.opens += 1;

        let mut parameters =
            CameraParameters::new(state.preview_sizes.clone(), state.picture_sizes.clone());
        for (key, values) in &state.supported_values {
            parameters = parameters.with_supported_values(key.clone(), values.clone());
        }

        debug!("Mock {} camera opened", facing);

        Ok(Box::new(MockCameraDevice {
            state: Arc::clone(&self.state),
            parameters,
            released: false,
        }))
    }

    fn sensor_orientation(&self, facing: Facing) -> u32 {
        let state = self.state.lock();
        match facing {
            Facing::Front => state.front_sensor,
            Facing::Back => state.back_sensor,
        }
    }
}

struct MockCameraDevice {
    state: Arc<Mutex<MockState>>,
    parameters: CameraParameters,
    released: bool,
}

impl MockCameraDevice {
    fn record(&self, call: impl Into<String>) {
        self.state.lock().calls.push(call.into());
    }
}

impl CameraDevice for MockCameraDevice {
    fn parameters(&self) -> CameraParameters {
        self.parameters.clone()
    }

    fn set_parameters(&mut self, parameters: CameraParameters) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("set_parameters".to_string());

        if state.reject_parameters {
            return Err(CameraError::InvalidParameter {
                name: "parameters".to_string(),
                details: "simulated rejection".to_string(),
            }
            .into());
        }

        state.last_parameters = Some(parameters.clone());
        self.parameters = parameters;
        Ok(())
    }

    fn set_display_orientation(&mut self, degrees: u32) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("display_orientation:{}", degrees));
        state.display_orientation = Some(degrees);
        Ok(())
    }

    fn bind_preview_target(&mut self, target: &PreviewTarget) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("bind:{}", target.id));

        if state.fail_bind {
            return Err(CameraError::SurfaceBindingFailed {
                details: "simulated surface failure".to_string(),
            }
            .into());
        }

        state.bound_target = Some(target.clone());
        Ok(())
    }

    fn start_preview(&mut self) -> Result<()> {
        self.record("start_preview");
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("stop_preview".to_string());

        if state.fail_stop_preview {
            return Err(CameraError::InvalidParameter {
                name: "preview".to_string(),
                details: "simulated stop failure".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn take_picture(&mut self, on_picture: PictureCallback) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("take_picture".to_string());

        match state.capture_mode {
            CaptureMode::Deferred => {
                state.pending.push(on_picture);
            }
            CaptureMode::Background => {
                let picture = state.picture.clone();
                std::thread::Builder::new()
                    .name("mock-hardware".to_string())
                    .spawn(move || {
                        trace!("Mock hardware delivering {} byte still", picture.len());
                        on_picture(Ok(picture));
                    })?;
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            warn!("Mock camera released twice");
            return;
        }

        self.released = true;
        let mut state = self.state.lock();
        state.calls.push("release".to_string());
        state.open_devices = state.open_devices.saturating_sub(1);
        state.releases += 1;
    }
}

/// PNG still with a distinct colour per pixel
pub fn test_picture(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 40) as u8, (y * 40) as u8, ((x + y) * 20) as u8])
    });

    let mut buf = Vec::new();
    if let Err(e) =
        DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
    {
        warn!("Failed to encode mock picture: {}", e);
        buf.clear();
    }
    buf
}
