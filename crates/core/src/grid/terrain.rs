//! Immutable terrain grid built from co-registered raster layers
//!
//! Vegetation, slope and aspect must share one extent; alignment is a
//! load-time invariant and violations are rejected before any stepping
//! begins. After load the grid never mutates.

use crate::core_types::{bearing_unit_vector, CellCoord, GridExtent};
use crate::error::{OutOfBounds, TerrainLoadError};
use crate::grid::raster::{LayerKind, RasterLayer, RasterSource};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Static attributes of one cell, read from the terrain layers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellTerrain {
    /// Vegetation index in [0, 1]; 0 means bare, unburnable ground
    pub vegetation: f32,
    /// Slope magnitude in [0, 1]
    pub slope: f32,
    /// Compass bearing of the downslope direction, degrees [0, 360)
    pub aspect_deg: f32,
}

/// Immutable-after-load raster terrain description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    extent: GridExtent,
    vegetation: Vec<f32>,
    slope: Vec<f32>,
    aspect: Vec<f32>,
}

impl TerrainGrid {
    /// Load all three layers from a raster source and validate alignment
    ///
    /// # Errors
    ///
    /// Propagates source failures (`MissingLayer`, `Unreadable`) and
    /// rejects dimension mismatches or non-finite samples with the
    /// corresponding `TerrainLoadError`.
    pub fn load(source: &dyn RasterSource) -> Result<Self, TerrainLoadError> {
        let [vegetation, slope, aspect] = LayerKind::ALL.map(|kind| source.layer(kind));
        let grid = Self::from_layers(vegetation?, slope?, aspect?)?;
        info!(
            extent = %grid.extent,
            "terrain loaded"
        );
        Ok(grid)
    }

    /// Assemble a grid from already-decoded layers
    ///
    /// The vegetation layer is the alignment reference; slope and aspect
    /// must match its dimensions exactly.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` when layers disagree, `EmptyLayer` for a zero
    /// extent, `NonFiniteSample` when any value is NaN or infinite.
    pub fn from_layers(
        vegetation: RasterLayer,
        slope: RasterLayer,
        aspect: RasterLayer,
    ) -> Result<Self, TerrainLoadError> {
        let extent = GridExtent::new(vegetation.width(), vegetation.height());
        if extent.cell_count() == 0 {
            return Err(TerrainLoadError::EmptyLayer(LayerKind::Vegetation));
        }
        for (kind, layer) in [(LayerKind::Slope, &slope), (LayerKind::Aspect, &aspect)] {
            if layer.width() != extent.width || layer.height() != extent.height {
                return Err(TerrainLoadError::DimensionMismatch {
                    layer: kind,
                    expected: (extent.width, extent.height),
                    found: (layer.width(), layer.height()),
                });
            }
        }
        for (kind, layer) in [
            (LayerKind::Vegetation, &vegetation),
            (LayerKind::Slope, &slope),
            (LayerKind::Aspect, &aspect),
        ] {
            if let Some(i) = layer.values().iter().position(|v| !v.is_finite()) {
                return Err(TerrainLoadError::NonFiniteSample {
                    layer: kind,
                    row: i / extent.width,
                    col: i % extent.width,
                });
            }
        }
        Ok(TerrainGrid {
            extent,
            vegetation: vegetation.into_values(),
            slope: slope.into_values(),
            aspect: aspect.into_values(),
        })
    }

    /// Uniform terrain, mostly for tests and calibration scenarios
    ///
    /// # Panics
    ///
    /// Panics on a zero extent.
    #[must_use]
    pub fn uniform(
        width: usize,
        height: usize,
        vegetation: f32,
        slope: f32,
        aspect_deg: f32,
    ) -> Self {
        assert!(width > 0 && height > 0, "uniform terrain needs a non-zero extent");
        let n = width * height;
        TerrainGrid {
            extent: GridExtent::new(width, height),
            vegetation: vec![vegetation; n],
            slope: vec![slope; n],
            aspect: vec![aspect_deg; n],
        }
    }

    /// Synthetic conical hill centered on `peak`, with uniform vegetation
    ///
    /// Slope rises linearly from 0 at the peak to `max_slope` at
    /// `radius` cells away; aspect at each cell faces away from the peak
    /// (the downslope direction). Cells beyond `radius` are flat.
    ///
    /// # Panics
    ///
    /// Panics on a zero extent or non-positive radius.
    #[must_use]
    pub fn hill(
        width: usize,
        height: usize,
        vegetation: f32,
        peak: CellCoord,
        radius: f32,
        max_slope: f32,
    ) -> Self {
        assert!(width > 0 && height > 0, "hill terrain needs a non-zero extent");
        assert!(radius > 0.0, "hill radius must be positive");
        let extent = GridExtent::new(width, height);
        let n = extent.cell_count();
        let mut slope = Vec::with_capacity(n);
        let mut aspect = Vec::with_capacity(n);

        for row in 0..height {
            for col in 0..width {
                let east = col as f32 - peak.col as f32;
                let north = peak.row as f32 - row as f32;
                let dist = (east * east + north * north).sqrt();
                if dist < f32::EPSILON {
                    slope.push(0.0);
                    aspect.push(0.0);
                    continue;
                }
                let grade = (dist / radius).min(1.0);
                slope.push(if dist <= radius { grade * max_slope } else { 0.0 });
                // Downslope points away from the peak; atan2(east, north)
                // is the compass bearing of that direction.
                let bearing = east.atan2(north).to_degrees().rem_euclid(360.0);
                aspect.push(bearing);
            }
        }

        TerrainGrid {
            extent,
            vegetation: vec![vegetation; n],
            slope,
            aspect,
        }
    }

    /// Grid extent shared by all layers
    #[must_use]
    pub fn extent(&self) -> GridExtent {
        self.extent
    }

    /// Terrain attributes at `coord`
    ///
    /// # Errors
    ///
    /// `OutOfBounds::Cell` for coordinates outside the extent.
    pub fn at(&self, coord: CellCoord) -> Result<CellTerrain, OutOfBounds> {
        if !self.extent.contains(coord) {
            return Err(OutOfBounds::Cell {
                coord,
                extent: self.extent,
            });
        }
        Ok(self.get(coord))
    }

    /// Unchecked accessor for callers that already validated `coord`
    pub(crate) fn get(&self, coord: CellCoord) -> CellTerrain {
        let i = self.extent.index(coord);
        CellTerrain {
            vegetation: self.vegetation[i],
            slope: self.slope[i],
            aspect_deg: self.aspect[i],
        }
    }

    /// Whether the cell carries enough fuel to ignite or sustain burning
    pub(crate) fn has_fuel(&self, coord: CellCoord, fuel_threshold: f32) -> bool {
        self.vegetation[self.extent.index(coord)] >= fuel_threshold
    }

    /// Nearest fuel-bearing cell within `radius` (Chebyshev) of `coord`
    ///
    /// A fuel-bearing `coord` snaps to itself. Otherwise the scan walks
    /// expanding rings outward and returns the first hit, so closer
    /// cells always win. `None` when `coord` lies outside the extent or
    /// no fuel exists within the radius.
    #[must_use]
    pub fn nearest_fuel(
        &self,
        coord: CellCoord,
        fuel_threshold: f32,
        radius: usize,
    ) -> Option<CellCoord> {
        if !self.extent.contains(coord) {
            return None;
        }
        if self.has_fuel(coord, fuel_threshold) {
            return Some(coord);
        }
        for ring in 1..=radius {
            let ring = ring as isize;
            for dr in -ring..=ring {
                for dc in -ring..=ring {
                    let Some(row) = coord.row.checked_add_signed(dr) else {
                        continue;
                    };
                    let Some(col) = coord.col.checked_add_signed(dc) else {
                        continue;
                    };
                    let candidate = CellCoord::new(row, col);
                    if self.extent.contains(candidate) && self.has_fuel(candidate, fuel_threshold)
                    {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    /// Unit vector of the upslope direction at `coord`
    ///
    /// Aspect stores the downslope bearing, so upslope is its 180°
    /// rotation.
    pub(crate) fn upslope_vector(&self, coord: CellCoord) -> nalgebra::Vector2<f32> {
        let aspect = self.aspect[self.extent.index(coord)];
        bearing_unit_vector(aspect + 180.0)
    }
}
