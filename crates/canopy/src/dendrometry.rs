//! Photogrammetric tree measurement (dendrometry).
//!
//! Converts pixel measurements taken from a single smartphone photo into
//! real-world tree dimensions. The model needs the camera's sensor width
//! and focal length (from EXIF data or user calibration), the distance to
//! the tree, and the photo's pixel width.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Intrinsic parameters of the camera that took the photo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSpec {
    /// Physical sensor width in millimeters.
    pub sensor_width_mm: f64,
    /// Focal length in millimeters.
    pub focal_length_mm: f64,
}

impl CameraSpec {
    /// Create a camera spec.
    #[must_use]
    pub const fn new(sensor_width_mm: f64, focal_length_mm: f64) -> Self {
        Self {
            sensor_width_mm,
            focal_length_mm,
        }
    }

    /// The camera's intrinsic constant `C = sensor_width / focal_length`,
    /// a unitless ratio.
    ///
    /// # Errors
    ///
    /// Returns an error if the focal length or sensor width is not positive.
    pub fn camera_constant(&self) -> Result<f64> {
        if self.focal_length_mm <= 0.0 {
            return Err(Error::dendrometry(format!(
                "focal length must be positive, got {} mm",
                self.focal_length_mm
            )));
        }
        if self.sensor_width_mm <= 0.0 {
            return Err(Error::dendrometry(format!(
                "sensor width must be positive, got {} mm",
                self.sensor_width_mm
            )));
        }
        Ok(self.sensor_width_mm / self.focal_length_mm)
    }
}

/// A single photo survey: camera, standing distance, and photo width.
///
/// The scale factor (meters per pixel) is the critical value for
/// converting pixel measurements to real-world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotoSurvey {
    /// The camera that took the photo.
    pub camera: CameraSpec,
    /// Distance from the camera to the tree, in meters.
    pub distance_m: f64,
    /// Width of the photo in pixels.
    pub image_width_px: u32,
}

impl PhotoSurvey {
    /// Create a photo survey.
    #[must_use]
    pub const fn new(camera: CameraSpec, distance_m: f64, image_width_px: u32) -> Self {
        Self {
            camera,
            distance_m,
            image_width_px,
        }
    }

    /// The scale factor in meters per pixel for this photo.
    ///
    /// The real-world width of the captured scene is `C * distance`;
    /// dividing by the photo's pixel width gives meters per pixel.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the survey parameters are out of range.
    pub fn scale_factor(&self) -> Result<f64> {
        let c = self.camera.camera_constant()?;
        if self.distance_m <= 0.0 {
            return Err(Error::dendrometry(format!(
                "distance to tree must be positive, got {} m",
                self.distance_m
            )));
        }
        if self.image_width_px == 0 {
            return Err(Error::dendrometry(
                "image width in pixels must be positive",
            ));
        }
        let scene_width_m = c * self.distance_m;
        Ok(scene_width_m / f64::from(self.image_width_px))
    }

    /// Convert a pixel measurement from this photo to meters.
    ///
    /// # Errors
    ///
    /// Returns an error if the survey parameters are out of range.
    pub fn measure(&self, dimension_px: u32) -> Result<f64> {
        Ok(self.scale_factor()? * f64::from(dimension_px))
    }

    /// Measure a whole tree from pixel readings.
    ///
    /// # Errors
    ///
    /// Returns an error if the survey parameters are out of range.
    pub fn measure_tree(
        &self,
        height_px: u32,
        canopy_width_px: Option<u32>,
        dbh_px: Option<u32>,
    ) -> Result<TreeMeasurement> {
        let scale = self.scale_factor()?;
        Ok(TreeMeasurement {
            scale_factor_m_per_px: scale,
            height_m: scale * f64::from(height_px),
            canopy_dia_m: canopy_width_px.map(|px| scale * f64::from(px)),
            dbh_m: dbh_px.map(|px| scale * f64::from(px)),
        })
    }
}

/// Real-world tree dimensions derived from a photo survey.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeMeasurement {
    /// The scale factor used, in meters per pixel.
    pub scale_factor_m_per_px: f64,
    /// Tree height in meters.
    pub height_m: f64,
    /// Canopy diameter in meters, if the canopy was measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canopy_dia_m: Option<f64>,
    /// Diameter at breast height in meters, if measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dbh_m: Option<f64>,
}
