//! Wildfire Spread Simulation Core
//!
//! Models the hourly spatial spread of a wildfire over a raster terrain
//! (vegetation index, slope, aspect) driven by an hourly wind forecast.
//! The spread engine evaluates the 8-connected neighbors of the active
//! fire front each simulated hour, combining wind alignment, slope,
//! vegetation and aspect exposure into a deterministic ignition
//! likelihood.
//!
//! External concerns stay behind trait seams:
//! - raster decoding behind [`grid::RasterSource`]
//! - forecast transport behind [`weather::ForecastSource`]
//! - rendering/collection behind [`driver::FrameSink`]
//!
//! so the whole simulation runs headless and reproducibly.

// Core types and utilities
pub mod core_types;

// Terrain layers and grid
pub mod grid;

// Wind series and forecast decoding
pub mod weather;

// Fire front state machine
pub mod fire;

// Spread engine
pub mod spread;

// Hourly orchestration
pub mod driver;

// Error taxonomy
pub mod error;

// Re-export core types
pub use core_types::{CellCoord, GridExtent};

// Re-export the simulation surface
pub use driver::{
    CancelToken, CollectorSink, DriverConfig, Frame, FrameSink, RunReport, SimulationDriver,
    StopReason,
};
pub use error::{
    InvalidConfig, InvalidWindVector, OutOfBounds, SimulationError, SimulationPhase,
    TerrainLoadError, WeatherServiceError,
};
pub use fire::{BurnStatus, FireSnapshot, FireState, StatusCounts};
pub use grid::{CellTerrain, InMemoryRasters, LayerKind, RasterLayer, RasterSource, TerrainGrid};
pub use spread::{SpreadConfig, SpreadEngine, WindVector};
pub use weather::{
    direction_to_unit_vector, fetch_series, ForecastPayload, ForecastSource, LatLon,
    StaticForecast, WindSample, WindTimeSeries,
};
