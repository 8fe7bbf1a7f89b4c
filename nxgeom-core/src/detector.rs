//! Detector description and module geometry.

use crate::chain::AxisChain;
use crate::convention::CoordinateConvention;
use crate::error::{Error, Result};
use crate::point::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Supported detector families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DetectorKind {
    /// Dectris Eiger.
    Eiger,
    /// Tristan event-mode detector.
    Tristan,
    /// PSI Jungfrau.
    Jungfrau,
    /// Dectris Singla (electron diffraction).
    Singla,
    /// Thermo Fisher Ceta-D (electron diffraction).
    Ceta,
}

impl DetectorKind {
    const ALL: [Self; 5] = [
        Self::Eiger,
        Self::Tristan,
        Self::Jungfrau,
        Self::Singla,
        Self::Ceta,
    ];

    /// Identifies the detector family from a free-form description.
    ///
    /// # Errors
    /// Returns [`Error::UnknownDetector`] if no family name appears in the
    /// description.
    pub fn from_description(description: &str) -> Result<Self> {
        let lower = description.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| lower.contains(kind.as_str()))
            .ok_or_else(|| Error::UnknownDetector(description.to_string()))
    }

    /// Lowercase family name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eiger => "eiger",
            Self::Tristan => "tristan",
            Self::Jungfrau => "jungfrau",
            Self::Singla => "singla",
            Self::Ceta => "ceta",
        }
    }

    /// Default pixel size in millimetres (x, y).
    #[must_use]
    pub fn default_pixel_size(self) -> [f64; 2] {
        match self {
            Self::Tristan => [0.055, 0.055],
            Self::Ceta => [0.014, 0.014],
            Self::Eiger | Self::Jungfrau | Self::Singla => [0.075, 0.075],
        }
    }

    /// Default trusted range as (underload, overload).
    #[must_use]
    pub fn default_trusted_range(self) -> (i64, i64) {
        match self {
            Self::Eiger => (-1, 65535),
            Self::Tristan => (0, 0),
            Self::Jungfrau => (-10, 1_000_000),
            Self::Singla => (-1, 199_996),
            Self::Ceta => (-1000, 1_000_000),
        }
    }

    /// Default sensor thickness in millimetres.
    #[must_use]
    pub fn default_sensor_thickness(self, material: SensorMaterial) -> f64 {
        match (self, material) {
            (Self::Eiger, SensorMaterial::CdTe) => 0.750,
            (Self::Eiger | Self::Singla, _) => 0.450,
            (Self::Tristan, _) => 0.5,
            (Self::Jungfrau, _) => 0.320,
            (Self::Ceta, _) => 0.014,
        }
    }

    /// True if the vendor writes a separate meta file alongside the data.
    #[must_use]
    pub fn has_meta(self) -> bool {
        matches!(self, Self::Eiger | Self::Tristan)
    }
}

/// Sensor material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SensorMaterial {
    /// Silicon.
    #[default]
    Si,
    /// Cadmium telluride.
    CdTe,
}

impl std::str::FromStr for SensorMaterial {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Si" | "si" => Ok(Self::Si),
            "CdTe" | "cdte" => Ok(Self::CdTe),
            other => Err(Error::Configuration(format!(
                "unknown sensor material '{other}', expected Si or CdTe"
            ))),
        }
    }
}

/// Acquisition mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DetectorMode {
    /// Frame-based images.
    Images,
    /// Timestamped events.
    Events,
}

/// Detector parameters independent of its position.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorParams {
    /// Free-form description, e.g. "Eiger 2X 9M".
    pub description: String,
    /// Detector family.
    pub kind: DetectorKind,
    /// Image size in pixels (slow, fast).
    pub image_size: [u32; 2],
    /// Pixel size in millimetres (x, y).
    pub pixel_size: [f64; 2],
    /// Sensor material.
    pub sensor_material: SensorMaterial,
    /// Sensor thickness in millimetres.
    pub sensor_thickness: f64,
    /// Lowest trusted pixel value.
    pub underload: i64,
    /// Highest trusted pixel value.
    pub overload: i64,
    /// Acquisition mode.
    pub mode: DetectorMode,
}

impl DetectorParams {
    /// Creates parameters with the family defaults for the description.
    ///
    /// # Errors
    /// Returns [`Error::UnknownDetector`] for an unsupported description and
    /// [`Error::Configuration`] for a zero-sized image.
    pub fn new(description: impl Into<String>, image_size: [u32; 2]) -> Result<Self> {
        let description = description.into();
        let kind = DetectorKind::from_description(&description)?;
        if image_size.contains(&0) {
            return Err(Error::Configuration(format!(
                "image size {image_size:?} of '{description}' must be non-zero"
            )));
        }
        let (underload, overload) = kind.default_trusted_range();
        let sensor_material = SensorMaterial::default();
        Ok(Self {
            description,
            kind,
            image_size,
            pixel_size: kind.default_pixel_size(),
            sensor_material,
            sensor_thickness: kind.default_sensor_thickness(sensor_material),
            underload,
            overload,
            mode: if kind == DetectorKind::Tristan {
                DetectorMode::Events
            } else {
                DetectorMode::Images
            },
        })
    }

    /// Sets the sensor material, updating the thickness default.
    #[must_use]
    pub fn with_sensor_material(mut self, material: SensorMaterial) -> Self {
        self.sensor_material = material;
        self.sensor_thickness = self.kind.default_sensor_thickness(material);
        self
    }

    /// Sets the trusted range.
    #[must_use]
    pub fn with_trusted_range(mut self, underload: i64, overload: i64) -> Self {
        self.underload = underload;
        self.overload = overload;
        self
    }

    /// Sets the pixel size in millimetres.
    #[must_use]
    pub fn with_pixel_size(mut self, pixel_size: [f64; 2]) -> Self {
        self.pixel_size = pixel_size;
        self
    }

    /// Sets the acquisition mode.
    #[must_use]
    pub fn with_mode(mut self, mode: DetectorMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Fast and slow pixel directions of a detector module.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorModule {
    /// Fast axis direction.
    pub fast_axis: Vector3,
    /// Slow axis direction.
    pub slow_axis: Vector3,
}

impl DetectorModule {
    /// Creates a module.
    pub fn new(fast_axis: impl Into<Vector3>, slow_axis: impl Into<Vector3>) -> Self {
        Self {
            fast_axis: fast_axis.into(),
            slow_axis: slow_axis.into(),
        }
    }

    /// Returns the module with both directions expressed in McStas.
    #[must_use]
    pub fn to_mcstas(&self, convention: &CoordinateConvention) -> Self {
        Self {
            fast_axis: convention.convert(&self.fast_axis),
            slow_axis: convention.convert(&self.slow_axis),
        }
    }
}

/// How [`calculate_origin`] scales the module offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OriginMode {
    /// Un-normalised displacement, offset value 1.0.
    #[default]
    Unit,
    /// Offset value set to the in-plane magnitude of the displacement.
    Normalized,
}

/// Computes the detector origin from the beam centre.
///
/// Returns the displacement vector for the `module_offset` field and the
/// value the field should hold.
#[must_use]
pub fn calculate_origin(
    beam_center: [f64; 2],
    pixel_size: [f64; 2],
    fast_axis: &Vector3,
    slow_axis: &Vector3,
    mode: OriginMode,
) -> (Vector3, f64) {
    let fast_scaled = beam_center[0] * pixel_size[0];
    let slow_scaled = beam_center[1] * pixel_size[1];
    let origin = -(*fast_axis * fast_scaled + *slow_axis * slow_scaled);
    let value = match mode {
        OriginMode::Unit => 1.0,
        OriginMode::Normalized => origin.x.hypot(origin.y),
    };
    (origin, value)
}

/// A detector: parameters, positioning axes, module and collection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Detector {
    /// Detector parameters.
    pub params: DetectorParams,
    /// Axes positioning the detector.
    pub axes: AxisChain,
    /// Beam centre in pixels (fast, slow).
    pub beam_center: [f64; 2],
    /// Exposure time per frame in seconds.
    pub exposure_time: f64,
    /// Module directions.
    pub module: DetectorModule,
}

impl Detector {
    /// Creates a detector.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for a non-positive exposure time or
    /// zero-length module directions.
    pub fn new(
        params: DetectorParams,
        axes: AxisChain,
        beam_center: [f64; 2],
        exposure_time: f64,
        module: DetectorModule,
    ) -> Result<Self> {
        if exposure_time.is_nan() || exposure_time <= 0.0 {
            return Err(Error::Configuration(format!(
                "exposure time must be positive, got {exposure_time}"
            )));
        }
        if module.fast_axis.normalized().is_none() || module.slow_axis.normalized().is_none() {
            return Err(Error::Configuration(
                "detector module fast and slow axes must be non-zero".into(),
            ));
        }
        Ok(Self {
            params,
            axes,
            beam_center,
            exposure_time,
            module,
        })
    }

    /// Returns the detector with axes and module expressed in McStas.
    #[must_use]
    pub fn to_mcstas(&self, convention: &CoordinateConvention) -> Self {
        Self {
            params: self.params.clone(),
            axes: self.axes.to_mcstas(convention),
            beam_center: self.beam_center,
            exposure_time: self.exposure_time,
            module: self.module.to_mcstas(convention),
        }
    }

    /// Module origin for the current beam centre and pixel size.
    #[must_use]
    pub fn origin(&self, mode: OriginMode) -> (Vector3, f64) {
        calculate_origin(
            self.beam_center,
            self.params.pixel_size,
            &self.module.fast_axis,
            &self.module.slow_axis,
            mode,
        )
    }
}
