//! Terrain raster layers and the immutable terrain grid

pub mod raster;
pub mod terrain;

pub use raster::{InMemoryRasters, LayerKind, RasterLayer, RasterSource};
pub use terrain::{CellTerrain, TerrainGrid};
