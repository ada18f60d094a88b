use crate::camera::Facing;
use crate::frame::Rotation;
use serde::{Deserialize, Serialize};

/// Orientation inputs captured at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrientationState {
    /// Current rotation of the display from its natural orientation
    pub display_rotation: u32,
    /// Angle the sensor is mounted at
    pub sensor_mount: u32,
    /// Rotation of the UI layout relative to the display
    pub layout_orientation: u32,
}

/// Source of the device-side orientation angles
pub trait OrientationSensor: Send {
    fn display_rotation(&self) -> u32;

    fn layout_orientation(&self) -> u32;
}

/// Orientation for devices that never rotate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedOrientation {
    pub display_rotation: u32,
    pub layout_orientation: u32,
}

impl FixedOrientation {
    pub fn new(display_rotation: u32, layout_orientation: u32) -> Self {
        Self {
            display_rotation,
            layout_orientation,
        }
    }
}

impl OrientationSensor for FixedOrientation {
    fn display_rotation(&self) -> u32 {
        self.display_rotation
    }

    fn layout_orientation(&self) -> u32 {
        self.layout_orientation
    }
}

/// Maps orientation angles to the hardware preview setting and the
/// post-capture correction. Both functions are pure.
pub struct OrientationResolver;

impl OrientationResolver {
    /// Hardware display orientation for the preview stream.
    ///
    /// Front sensors preview mirrored, so the angle is taken the other way round.
    pub fn display_orientation(sensor_mount: u32, display_rotation: u32, facing: Facing) -> u32 {
        let sensor = quantize(sensor_mount);
        let display = quantize(display_rotation);

        match facing {
            Facing::Front => (360 - (sensor + display) % 360) % 360,
            Facing::Back => (sensor + 360 - display) % 360,
        }
    }

    /// Rotation that makes a decoded still upright in the current layout.
    /// Front captures are mirrored after this rotation is applied.
    pub fn capture_rotation(
        display_rotation: u32,
        sensor_mount: u32,
        layout_orientation: u32,
        is_front: bool,
    ) -> Rotation {
        let sensor = quantize(sensor_mount);
        let display = quantize(display_rotation);
        let layout = quantize(layout_orientation);

        let base = if is_front {
            (sensor + display) % 360
        } else {
            (sensor + 360 - display) % 360
        };

        Rotation::from_degrees((base + layout) % 360)
    }

    /// Rotation for a snapshot
    pub fn capture_rotation_for(state: &OrientationState, facing: Facing) -> Rotation {
        Self::capture_rotation(
            state.display_rotation,
            state.sensor_mount,
            state.layout_orientation,
            facing.is_front(),
        )
    }
}

/// Snap an angle to the nearest quarter turn in 0..360
fn quantize(degrees: u32) -> u32 {
    ((degrees % 360 + 45) / 90 * 90) % 360
}
