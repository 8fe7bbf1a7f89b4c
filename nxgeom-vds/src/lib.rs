//! nxgeom-vds: Virtual dataset planning.
//!
//! Maps a contiguous range of frames onto chunked backing datasets and
//! describes the composite layout handed to the persistence layer.
//!

pub mod error;
pub mod layout;
pub mod planner;

pub use error::{Error, Result};
pub use layout::{
    jungfrau_layout, layout, DataType, LayoutEntry, LayoutSink, Tile, TiledLayout, VirtualLayout,
    FILL_VALUE, JUNGFRAU_FILL_VALUE, JUNGFRAU_GAP_SIZE, JUNGFRAU_MODULE_SIZE,
};
pub use planner::{
    chunked_datasets, plan, split_frames, total_capacity, unused_datasets, BackingDataset,
    Fragment, MAX_FRAMES_PER_DATASET,
};
