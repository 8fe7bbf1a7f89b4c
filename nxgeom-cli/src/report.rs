//! Serializable views printed by the subcommands.

use nxgeom_core::{
    Axis, AxisChain, Detector, DetectorModule, DetectorParams, OriginMode, TransformationType,
    Vector3,
};
use nxgeom_scan::{Chip, ChipPositions, ScanPoints};
use nxgeom_vds::{BackingDataset, Fragment, LayoutSink, TiledLayout, VirtualLayout};
use serde::Serialize;

use crate::Result;

/// One axis in McStas coordinates, with its units and path to the root.
#[derive(Serialize)]
pub struct AxisReport<'a> {
    pub name: &'a str,
    pub depends_on: &'a str,
    #[serde(rename = "type")]
    pub kind: TransformationType,
    pub units: &'static str,
    pub vector: Vector3,
    pub offset: Vector3,
    pub start_pos: f64,
    pub end_pos: f64,
    pub increment: f64,
    pub num_steps: usize,
    pub dependency_path: Vec<&'a str>,
}

impl<'a> AxisReport<'a> {
    fn new(axis: &'a Axis, chain: &'a AxisChain) -> Result<Self> {
        Ok(Self {
            name: &axis.name,
            depends_on: &axis.depends_on,
            kind: axis.kind,
            units: axis.units(),
            vector: axis.vector,
            offset: axis.offset,
            start_pos: axis.start_pos,
            end_pos: axis.end_pos(),
            increment: axis.increment,
            num_steps: axis.num_steps,
            dependency_path: chain.dependency_path(&axis.name)?,
        })
    }

    /// Reports every axis of `chain`, in chain order.
    pub fn from_chain(chain: &'a AxisChain) -> Result<Vec<Self>> {
        chain.axes().iter().map(|ax| Self::new(ax, chain)).collect()
    }
}

#[derive(Serialize)]
pub struct DetectorReport<'a> {
    pub params: &'a DetectorParams,
    /// The detector writes a meta file alongside its data.
    pub has_meta: bool,
    pub beam_center: [f64; 2],
    pub exposure_time: f64,
    pub module: DetectorModule,
    /// Module origin for the beam centre.
    pub origin: Vector3,
    pub origin_offset: f64,
    pub axes: Vec<AxisReport<'a>>,
}

impl<'a> DetectorReport<'a> {
    pub fn new(detector: &'a Detector) -> Result<Self> {
        let (origin, origin_offset) = detector.origin(OriginMode::Unit);
        Ok(Self {
            params: &detector.params,
            has_meta: detector.params.kind.has_meta(),
            beam_center: detector.beam_center,
            exposure_time: detector.exposure_time,
            module: detector.module,
            origin,
            origin_offset,
            axes: AxisReport::from_chain(&detector.axes)?,
        })
    }
}

#[derive(Serialize)]
pub struct GeometryReport<'a> {
    /// Convention the configuration was written in.
    pub convention: &'a str,
    pub scan_axis: &'a str,
    pub grid_axes: Vec<&'a str>,
    pub goniometer: Vec<AxisReport<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector: Option<DetectorReport<'a>>,
}

#[derive(Serialize)]
pub struct PlanReport<'a> {
    pub datasets: &'a [BackingDataset],
    pub fragments: &'a [Fragment],
    pub unused: Vec<&'a str>,
    pub layout: serde_json::Value,
}

#[derive(Serialize)]
pub struct ChipReport<'a> {
    pub chip: &'a Chip,
    pub positions: ChipPositions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanPoints>,
}

/// Layout sink that renders the layout as a JSON document.
#[derive(Default)]
pub struct JsonSink {
    document: Option<serde_json::Value>,
}

impl JsonSink {
    /// Takes the last materialized document.
    pub fn take(&mut self) -> serde_json::Value {
        self.document.take().unwrap_or_default()
    }
}

impl LayoutSink for JsonSink {
    type Error = serde_json::Error;

    fn materialize(&mut self, layout: &VirtualLayout) -> std::result::Result<(), Self::Error> {
        let mut document = serde_json::to_value(layout)?;
        if let Some(map) = document.as_object_mut() {
            map.insert("shape".into(), serde_json::to_value(layout.shape(&[]))?);
        }
        self.document = Some(document);
        Ok(())
    }

    fn materialize_tiled(&mut self, layout: &TiledLayout) -> std::result::Result<(), Self::Error> {
        let mut document = serde_json::to_value(layout)?;
        if let Some(map) = document.as_object_mut() {
            map.insert("shape".into(), serde_json::to_value(layout.shape())?);
            map.insert("nbytes".into(), serde_json::to_value(layout.nbytes())?);
        }
        self.document = Some(document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxgeom_core::ROOT;
    use nxgeom_core::{DetectorModule, DetectorParams};
    use nxgeom_vds::{jungfrau_layout, layout, plan, DataType};

    #[test]
    fn test_axis_report_paths() {
        let chain = AxisChain::new(vec![
            Axis::new("phi", ROOT, TransformationType::Rotation, [-1.0, 0.0, 0.0], 0.0),
            Axis::new("omega", "phi", TransformationType::Rotation, [-1.0, 0.0, 0.0], 5.0)
                .with_scan(0.5, 4),
        ])
        .unwrap();
        let reports = AxisReport::from_chain(&chain).unwrap();
        assert_eq!(reports[1].dependency_path, vec!["omega", "phi"]);
        assert_eq!(reports[1].units, "deg");

        let json = serde_json::to_value(&reports[1]).unwrap();
        assert_eq!(json["type"], "rotation");
        assert_eq!(json["vector"], serde_json::json!([-1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_json_sink() {
        let datasets = vec![
            BackingDataset::new("data_000001", 1000),
            BackingDataset::new("data_000002", 500),
        ];
        let fragments = plan(&datasets, 900, 200).unwrap();
        let layout = layout(&fragments, DataType::Uint32).unwrap();

        let mut sink = JsonSink::default();
        sink.materialize(&layout).unwrap();
        let document = sink.take();
        assert_eq!(document["dtype"], "uint32");
        assert_eq!(document["fill_value"], -1);
        assert_eq!(document["shape"], serde_json::json!([200]));
        assert_eq!(document["entries"].as_array().unwrap().len(), 2);
        assert!(sink.take().is_null());
    }

    #[test]
    fn test_json_sink_tiled() {
        let layout = jungfrau_layout(&["data_000001", "data_000002"], 10, DataType::Uint32).unwrap();
        let mut sink = JsonSink::default();
        sink.materialize_tiled(&layout).unwrap();
        let document = sink.take();
        assert_eq!(document["shape"], serde_json::json!([10, 1066, 1030]));
        assert_eq!(document["tiles"][0]["source"], "data_000002");
        assert_eq!(document["tiles"][1]["offset"], serde_json::json!([552, 0]));
        assert_eq!(document["nbytes"], 10 * 1066 * 1030 * 4);
    }

    #[test]
    fn test_detector_report_flags_meta_file() {
        let eiger = Detector::new(
            DetectorParams::new("Eiger2 X 9M", [3262, 3108]).unwrap(),
            AxisChain::new(Vec::new()).unwrap(),
            [1590.0, 1533.0],
            0.1,
            DetectorModule::new([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
        )
        .unwrap();
        assert!(DetectorReport::new(&eiger).unwrap().has_meta);

        let singla = Detector {
            params: DetectorParams::new("Dectris Singla 1M", [1062, 1028]).unwrap(),
            ..eiger
        };
        assert!(!DetectorReport::new(&singla).unwrap().has_meta);
    }
}
