use crate::camera::{Facing, Resolution};
use crate::error::{CameraError, Result};
use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quarter-turn rotations applied to captured stills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Rotation {
    #[default]
    Rotate0,
    /// Rotate 90 degrees clockwise
    Rotate90,
    /// Rotate 180 degrees
    Rotate180,
    /// Rotate 270 degrees clockwise (90 degrees counter-clockwise)
    Rotate270,
}

impl Rotation {
    /// Get rotation angle in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Rotate0 => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }

    /// Nearest quarter turn for an arbitrary angle
    pub fn from_degrees(degrees: u32) -> Self {
        match ((degrees % 360 + 45) / 90) % 4 {
            1 => Rotation::Rotate90,
            2 => Rotation::Rotate180,
            3 => Rotation::Rotate270,
            _ => Rotation::Rotate0,
        }
    }
}

/// A decoded still that has been rotated upright (and mirrored for front captures)
#[derive(Debug, Clone)]
pub struct CorrectedImage {
    pub capture_id: Uuid,
    pub image: DynamicImage,
    pub facing: Facing,
    pub rotation: Rotation,
    pub mirrored: bool,
    pub captured_at: DateTime<Utc>,
}

impl CorrectedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }
}

/// Still image correction utilities
pub struct FrameProcessor;

impl FrameProcessor {
    /// Decode an encoded still from the hardware
    pub fn decode(data: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(data).map_err(|e| {
            CameraError::PictureDecode {
                details: format!("{} ({} bytes)", e, data.len()),
            }
            .into()
        })
    }

    pub fn apply_rotation(image: DynamicImage, rotation: Rotation) -> DynamicImage {
        match rotation {
            Rotation::Rotate0 => image,
            Rotation::Rotate90 => image.rotate90(),
            Rotation::Rotate180 => image.rotate180(),
            Rotation::Rotate270 => image.rotate270(),
        }
    }

    /// Decode, rotate, then mirror horizontally when requested
    pub fn correct(data: &[u8], rotation: Rotation, mirror: bool) -> Result<DynamicImage> {
        let decoded = Self::decode(data)?;
        let rotated = Self::apply_rotation(decoded, rotation);

        let corrected = if mirror { rotated.fliph() } else { rotated };

        tracing::debug!(
            "Corrected still to {}x{} (rotation {}°, mirrored: {})",
            corrected.width(),
            corrected.height(),
            rotation.degrees(),
            mirror
        );

        Ok(corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn encoded_quadrants() -> Vec<u8> {
        let mut img = RgbImage::new(2, 2);
        img.put_pixel(0, 0, RED);
        img.put_pixel(1, 0, GREEN);
        img.put_pixel(0, 1, BLUE);
        img.put_pixel(1, 1, WHITE);

        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_rotation_degrees() {
        assert_eq!(Rotation::Rotate0.degrees(), 0);
        assert_eq!(Rotation::Rotate90.degrees(), 90);
        assert_eq!(Rotation::Rotate180.degrees(), 180);
        assert_eq!(Rotation::Rotate270.degrees(), 270);
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(0), Rotation::Rotate0);
        assert_eq!(Rotation::from_degrees(90), Rotation::Rotate90);
        assert_eq!(Rotation::from_degrees(180), Rotation::Rotate180);
        assert_eq!(Rotation::from_degrees(270), Rotation::Rotate270);
        assert_eq!(Rotation::from_degrees(360), Rotation::Rotate0);
        assert_eq!(Rotation::from_degrees(350), Rotation::Rotate0);
        assert_eq!(Rotation::from_degrees(100), Rotation::Rotate90);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = FrameProcessor::decode(&[0x00, 0x01, 0x02]);
        assert!(matches!(
            result,
            Err(crate::error::SnapcamError::Camera(CameraError::PictureDecode { .. }))
        ));
    }

    #[test]
    fn test_rotate_then_mirror() {
        let corrected = FrameProcessor::correct(&encoded_quadrants(), Rotation::Rotate90, true)
            .unwrap()
            .to_rgb8();

        assert_eq!(*corrected.get_pixel(0, 0), RED);
        assert_eq!(*corrected.get_pixel(1, 0), BLUE);
        assert_eq!(*corrected.get_pixel(0, 1), GREEN);
        assert_eq!(*corrected.get_pixel(1, 1), WHITE);
    }

    #[test]
    fn test_rotate_without_mirror() {
        let corrected = FrameProcessor::correct(&encoded_quadrants(), Rotation::Rotate90, false)
            .unwrap()
            .to_rgb8();

        assert_eq!(*corrected.get_pixel(0, 0), BLUE);
        assert_eq!(*corrected.get_pixel(1, 0), RED);
        assert_eq!(*corrected.get_pixel(0, 1), WHITE);
        assert_eq!(*corrected.get_pixel(1, 1), GREEN);
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(4, 2))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();

        let rotated = FrameProcessor::correct(&buf, Rotation::Rotate270, false).unwrap();
        assert_eq!((rotated.width(), rotated.height()), (2, 4));

        let flipped = FrameProcessor::correct(&buf, Rotation::Rotate180, false).unwrap();
        assert_eq!((flipped.width(), flipped.height()), (4, 2));
    }
}
