//! Raster layer primitives and the raster-source seam
//!
//! Decoding raster files (`GeoTIFF` etc.) is an external concern; the
//! engine only consumes in-memory single-band layers through the
//! [`RasterSource`] trait. Layers carry raw `f32` samples plus a
//! min-max normalization helper matching the preprocessing the upstream
//! data pipeline applies before handing layers to the simulation.

use crate::error::TerrainLoadError;
use serde::{Deserialize, Serialize};

/// The three co-registered terrain layers the engine requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    /// Vegetation index (fuel/dryness proxy), expected in [0, 1]
    Vegetation,
    /// Slope magnitude, expected in [0, 1] after normalization
    Slope,
    /// Aspect: compass bearing of the downslope direction, degrees
    Aspect,
}

impl LayerKind {
    /// All layers, in load order
    pub const ALL: [LayerKind; 3] = [LayerKind::Vegetation, LayerKind::Slope, LayerKind::Aspect];
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LayerKind::Vegetation => "vegetation",
            LayerKind::Slope => "slope",
            LayerKind::Aspect => "aspect",
        };
        f.write_str(name)
    }
}

/// A single-band raster layer in row-major order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterLayer {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl RasterLayer {
    /// Build a layer from row-major samples
    ///
    /// # Errors
    ///
    /// `TerrainLoadError::EmptyLayer` for a zero extent and
    /// `TerrainLoadError::LengthMismatch` when `values.len()` disagrees
    /// with `width * height`.
    pub fn new(
        kind: LayerKind,
        width: usize,
        height: usize,
        values: Vec<f32>,
    ) -> Result<Self, TerrainLoadError> {
        if width == 0 || height == 0 {
            return Err(TerrainLoadError::EmptyLayer(kind));
        }
        if values.len() != width * height {
            return Err(TerrainLoadError::LengthMismatch {
                layer: kind,
                expected: width * height,
                found: values.len(),
            });
        }
        Ok(RasterLayer {
            width,
            height,
            values,
        })
    }

    /// Layer filled with a single value
    ///
    /// # Panics
    ///
    /// Panics on a zero extent; synthetic layers are always non-empty.
    #[must_use]
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        assert!(width > 0 && height > 0, "synthetic layer needs a non-zero extent");
        RasterLayer {
            width,
            height,
            values: vec![value; width * height],
        }
    }

    /// Width in columns
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in rows
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major samples
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Consume the layer, returning its samples
    #[must_use]
    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    /// Map NaN samples to 0, then min-max rescale into [0, 1]
    ///
    /// A constant layer normalizes to all zeros. This mirrors the NoData
    /// handling and rescaling the raster preprocessing applies so that
    /// slope and vegetation contribute on a comparable scale.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for v in &mut self.values {
            if v.is_nan() {
                *v = 0.0;
            }
        }
        let min = self.values.iter().copied().fold(f32::INFINITY, f32::min);
        let max = self
            .values
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let span = max - min;
        if span > 0.0 {
            for v in &mut self.values {
                *v = (*v - min) / span;
            }
        } else {
            for v in &mut self.values {
                *v = 0.0;
            }
        }
        self
    }
}

/// Black-box provider of co-registered terrain layers
///
/// File decoding, resampling and georeferencing live behind this seam.
pub trait RasterSource {
    /// Produce the requested layer
    ///
    /// # Errors
    ///
    /// `TerrainLoadError::MissingLayer` when the source has no data for
    /// `kind`, or `TerrainLoadError::Unreadable` when decoding fails.
    fn layer(&self, kind: LayerKind) -> Result<RasterLayer, TerrainLoadError>;
}

/// In-memory raster source for tests and synthetic scenarios
///
/// Layers are optional so missing-layer handling can be exercised.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRasters {
    /// Vegetation index layer
    pub vegetation: Option<RasterLayer>,
    /// Slope layer
    pub slope: Option<RasterLayer>,
    /// Aspect layer
    pub aspect: Option<RasterLayer>,
}

impl InMemoryRasters {
    /// Source holding all three layers
    #[must_use]
    pub fn new(vegetation: RasterLayer, slope: RasterLayer, aspect: RasterLayer) -> Self {
        InMemoryRasters {
            vegetation: Some(vegetation),
            slope: Some(slope),
            aspect: Some(aspect),
        }
    }
}

impl RasterSource for InMemoryRasters {
    fn layer(&self, kind: LayerKind) -> Result<RasterLayer, TerrainLoadError> {
        let layer = match kind {
            LayerKind::Vegetation => &self.vegetation,
            LayerKind::Slope => &self.slope,
            LayerKind::Aspect => &self.aspect,
        };
        layer
            .clone()
            .ok_or(TerrainLoadError::MissingLayer(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rejects_length_mismatch() {
        let err = RasterLayer::new(LayerKind::Slope, 3, 3, vec![0.0; 8]).unwrap_err();
        assert!(matches!(
            err,
            TerrainLoadError::LengthMismatch {
                layer: LayerKind::Slope,
                expected: 9,
                found: 8,
            }
        ));
    }

    #[test]
    fn rejects_zero_extent() {
        let err = RasterLayer::new(LayerKind::Aspect, 0, 4, vec![]).unwrap_err();
        assert!(matches!(err, TerrainLoadError::EmptyLayer(LayerKind::Aspect)));
    }

    #[test]
    fn normalization_rescales_and_clears_nan() {
        let layer = RasterLayer::new(
            LayerKind::Vegetation,
            2,
            2,
            vec![2.0, 4.0, f32::NAN, 6.0],
        )
        .unwrap()
        .normalized();

        let v = layer.values();
        // NaN became 0 before rescale, so the range is [0, 6]
        assert_relative_eq!(v[0], 2.0 / 6.0, epsilon = 1e-6);
        assert_relative_eq!(v[1], 4.0 / 6.0, epsilon = 1e-6);
        assert_relative_eq!(v[2], 0.0, epsilon = 1e-6);
        assert_relative_eq!(v[3], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn constant_layer_normalizes_to_zero() {
        let layer = RasterLayer::filled(3, 2, 7.5).normalized();
        assert!(layer.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn missing_layer_reported() {
        let source = InMemoryRasters {
            vegetation: Some(RasterLayer::filled(2, 2, 1.0)),
            slope: None,
            aspect: Some(RasterLayer::filled(2, 2, 0.0)),
        };
        let err = source.layer(LayerKind::Slope).unwrap_err();
        assert!(matches!(err, TerrainLoadError::MissingLayer(LayerKind::Slope)));
    }
}
