//! `transition-table` caches render pipeline configurations and the device calls needed to move
//! between them.
//!
//! A renderer fills in a [`StateShadow`], takes a snapshot of it, and later asks the
//! [`TransitionTable`] to apply that snapshot to a [`StateDevice`]. Every distinct configuration is
//! stored once; for every ordered pair of configurations the table precomputes the list of fields
//! that differ, so switching between snapshots issues only the calls that change the device.
//! Identical op lists are interned into a single flat array.

mod apply;
mod dict;
mod graph;
mod live;

pub mod config;
pub mod device;
pub mod error;
pub mod ops;
pub mod recording;
pub mod state;
pub mod stats;
mod table;

pub use config::TableConfig;
pub use device::{DeviceCaps, FogParams, RenderState, SamplerValue, StateDevice, TextureStageValue};
pub use error::{Result, TransitionTableError};
pub use ops::{DecodedOp, OpRange, RenderFunc, StageFunc, StateOp};
pub use recording::{DeviceCall, RecordingDevice};
pub use state::{
    BlendFactor, BlendOp, ColorWriteMask, CombineArg, CombineOp, CompareFunc, FillMode, FogMode,
    MaterialSource, PipelineState, PolygonOffset, SamplerState, ShaderBinding, ShaderHandle,
    SnapshotId, StateId, StateShadow, TextureStageState,
};
pub use stats::TransitionStatsSnapshot;
pub use table::{TransitionTable, ValidatedSnapshot};
