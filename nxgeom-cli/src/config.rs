//! JSON description of a collection.
//!
//! The document is read into intermediate schema structs and converted into
//! validated library types before any command runs.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use nxgeom_core::{
    build_axis, Axis, AxisChain, CoordinateConvention, CoordinateFrame, Detector, DetectorMode,
    DetectorModule, DetectorParams, SensorMaterial, Vector3,
};
use nxgeom_scan::{AxisPositions, Chip, ChipAxes, Goniometer, GridScanOptions, ScanPoints};
use nxgeom_vds::BackingDataset;
use serde::Deserialize;

use crate::Result;

// Intermediate structs for the JSON schema
#[derive(Deserialize)]
struct JsonConfig {
    goniometer: JsonGoniometer,
    #[serde(default)]
    detector: Option<JsonDetector>,
    #[serde(default)]
    coord_system: JsonCoordSystem,
    #[serde(default)]
    scan: Option<Vec<AxisPositions>>,
    #[serde(default)]
    datasets: Option<Vec<BackingDataset>>,
    #[serde(default)]
    chip: Option<JsonChip>,
}

#[derive(Deserialize)]
struct JsonGoniometer {
    axes: Vec<JsonAxis>,
    #[serde(default)]
    grid: Option<GridScanOptions>,
}

#[derive(Deserialize)]
struct JsonAxis {
    name: String,
    #[serde(alias = "depends_on")]
    depends: String,
    #[serde(rename = "type", alias = "transformation_type")]
    kind: String,
    vector: [f64; 3],
    #[serde(default, alias = "start_pos")]
    start: f64,
    #[serde(default)]
    increment: f64,
    #[serde(default = "default_num_steps")]
    num_steps: usize,
    #[serde(default)]
    offset: [f64; 3],
}

fn default_num_steps() -> usize {
    1
}

#[derive(Deserialize)]
struct JsonDetector {
    description: String,
    image_size: [u32; 2],
    #[serde(default)]
    pixel_size: Option<[f64; 2]>,
    #[serde(default)]
    sensor_material: Option<String>,
    #[serde(default)]
    trusted_range: Option<[i64; 2]>,
    #[serde(default)]
    mode: Option<DetectorMode>,
    beam_center: [f64; 2],
    exposure_time: f64,
    #[serde(default)]
    axes: Vec<JsonAxis>,
    module: JsonModule,
}

#[derive(Deserialize)]
struct JsonModule {
    fast_axis: [f64; 3],
    slow_axis: [f64; 3],
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonCoordSystem {
    convention: String,
    origin: [f64; 3],
    vectors: Option<[[f64; 3]; 3]>,
}

impl Default for JsonCoordSystem {
    fn default() -> Self {
        Self {
            convention: "mcstas".into(),
            origin: [0.0; 3],
            vectors: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonChip {
    name: String,
    num_steps: [usize; 2],
    step_size: [f64; 2],
    num_blocks: [usize; 2],
    block_size: [f64; 2],
    start_pos: [f64; 3],
    x_axis: String,
    y_axis: String,
    exposures: usize,
}

impl Default for JsonChip {
    fn default() -> Self {
        let chip = Chip::default();
        let axes = ChipAxes::default();
        Self {
            name: chip.name,
            num_steps: chip.num_steps.into(),
            step_size: chip.step_size.into(),
            num_blocks: chip.num_blocks.into(),
            block_size: chip.block_size.into(),
            start_pos: chip.start_pos,
            x_axis: axes.x,
            y_axis: axes.y,
            exposures: 1,
        }
    }
}

/// Fixed-target chip and the goniometer axes that move across it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChipSetup {
    pub chip: Chip,
    pub axes: ChipAxes,
    /// Exposures taken at every window.
    pub exposures: usize,
}

impl Default for ChipSetup {
    fn default() -> Self {
        Self {
            chip: Chip::default(),
            axes: ChipAxes::default(),
            exposures: 1,
        }
    }
}

/// Validated collection description.
#[derive(Debug, Clone)]
pub struct Config {
    pub goniometer: Goniometer,
    pub grid: Option<GridScanOptions>,
    pub detector: Option<Detector>,
    pub convention: CoordinateConvention,
    pub datasets: Option<Vec<BackingDataset>>,
    pub chip: Option<ChipSetup>,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let json_config: JsonConfig = serde_json::from_reader(reader)?;
        Self::from_json_config(json_config)
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let json_config: JsonConfig = serde_json::from_str(json)?;
        Self::from_json_config(json_config)
    }

    fn from_json_config(config: JsonConfig) -> Result<Self> {
        let chain = axis_chain(config.goniometer.axes)?;
        let mut goniometer = Goniometer::new(chain);
        if let Some(recorded) = config.scan {
            goniometer = goniometer.with_scan(ScanPoints::new(recorded)?)?;
        }

        if let Some(grid) = &config.goniometer.grid {
            for name in [&grid.axes_order.0, &grid.axes_order.1] {
                if goniometer.axes().get(name).is_none() {
                    return Err(nxgeom_scan::Error::AxisNotFound(name.clone()).into());
                }
            }
        }

        let detector = config.detector.map(detector).transpose()?;
        let convention = coordinate_convention(config.coord_system)?;

        let chip = config
            .chip
            .map(|c| -> Result<ChipSetup> {
                let setup = ChipSetup {
                    chip: Chip {
                        name: c.name,
                        num_steps: c.num_steps.into(),
                        step_size: c.step_size.into(),
                        num_blocks: c.num_blocks.into(),
                        block_size: c.block_size.into(),
                        start_pos: c.start_pos,
                    },
                    axes: ChipAxes {
                        x: c.x_axis,
                        y: c.y_axis,
                    },
                    exposures: c.exposures,
                };
                setup.chip.validate()?;
                Ok(setup)
            })
            .transpose()?;

        log::debug!(
            "loaded {} goniometer axes, convention '{}'",
            goniometer.axes().len(),
            convention.name()
        );

        Ok(Self {
            goniometer,
            grid: config.goniometer.grid,
            detector,
            convention,
            datasets: config.datasets,
            chip,
        })
    }
}

fn axis_chain(axes: Vec<JsonAxis>) -> Result<AxisChain> {
    let axes = axes
        .into_iter()
        .map(|a| -> Result<Axis> {
            let axis = build_axis(
                &a.name,
                &a.depends,
                &a.kind,
                a.vector,
                a.start,
                a.increment,
                a.num_steps,
            )?;
            Ok(axis.with_offset(a.offset))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(AxisChain::new(axes)?)
}

fn detector(d: JsonDetector) -> Result<Detector> {
    let mut params = DetectorParams::new(d.description, d.image_size)?;
    if let Some(material) = d.sensor_material {
        params = params.with_sensor_material(material.parse::<SensorMaterial>()?);
    }
    if let Some(pixel_size) = d.pixel_size {
        params = params.with_pixel_size(pixel_size);
    }
    if let Some([underload, overload]) = d.trusted_range {
        params = params.with_trusted_range(underload, overload);
    }
    if let Some(mode) = d.mode {
        params = params.with_mode(mode);
    }
    let axes = axis_chain(d.axes)?;
    let module = DetectorModule::new(d.module.fast_axis, d.module.slow_axis);
    Ok(Detector::new(
        params,
        axes,
        d.beam_center,
        d.exposure_time,
        module,
    )?)
}

fn coordinate_convention(cs: JsonCoordSystem) -> Result<CoordinateConvention> {
    let frame = cs
        .vectors
        .map(|[x, y, z]| {
            CoordinateFrame::new(
                cs.convention.as_str(),
                Vector3::from(cs.origin),
                [x.into(), y.into(), z.into()],
            )
        })
        .transpose()?;
    Ok(CoordinateConvention::resolve(&cs.convention, frame)?)
}
