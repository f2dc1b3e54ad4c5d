//! Error taxonomy for the simulation
//!
//! Terrain and weather failures are fatal before the first step runs.
//! `OutOfBounds` signals a coordinate or hour outside the valid range and
//! is surfaced immediately rather than clamped. The top-level
//! [`SimulationError`] names the phase that failed so a broken run reports
//! terrain load, weather fetch, ignition or stepping along with the
//! offending input.

use crate::core_types::{CellCoord, GridExtent};
use crate::grid::LayerKind;

/// Errors raised while loading or validating terrain raster layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerrainLoadError {
    /// A required layer was not provided by the raster source
    MissingLayer(LayerKind),
    /// The raster source could not read a layer
    Unreadable {
        /// Layer that failed to read
        layer: LayerKind,
        /// Source-specific detail
        detail: String,
    },
    /// Layer dimensions disagree with the vegetation layer
    DimensionMismatch {
        /// Layer whose dimensions disagree
        layer: LayerKind,
        /// Expected (width, height) from the reference layer
        expected: (usize, usize),
        /// Actual (width, height) of the offending layer
        found: (usize, usize),
    },
    /// Layer value count does not match its declared dimensions
    LengthMismatch {
        /// Offending layer
        layer: LayerKind,
        /// Expected number of samples (width * height)
        expected: usize,
        /// Actual number of samples
        found: usize,
    },
    /// A sample was NaN or infinite after preprocessing
    NonFiniteSample {
        /// Offending layer
        layer: LayerKind,
        /// Row of the offending sample
        row: usize,
        /// Column of the offending sample
        col: usize,
    },
    /// A layer has zero width or height
    EmptyLayer(LayerKind),
}

impl std::fmt::Display for TerrainLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerrainLoadError::MissingLayer(layer) => {
                write!(f, "missing {layer} layer")
            }
            TerrainLoadError::Unreadable { layer, detail } => {
                write!(f, "failed to read {layer} layer: {detail}")
            }
            TerrainLoadError::DimensionMismatch {
                layer,
                expected,
                found,
            } => write!(
                f,
                "{layer} layer is {}x{} but expected {}x{}",
                found.0, found.1, expected.0, expected.1
            ),
            TerrainLoadError::LengthMismatch {
                layer,
                expected,
                found,
            } => write!(
                f,
                "{layer} layer holds {found} samples but dimensions require {expected}"
            ),
            TerrainLoadError::NonFiniteSample { layer, row, col } => {
                write!(f, "non-finite sample in {layer} layer at ({row}, {col})")
            }
            TerrainLoadError::EmptyLayer(layer) => {
                write!(f, "{layer} layer has zero extent")
            }
        }
    }
}

impl std::error::Error for TerrainLoadError {}

/// Errors raised while fetching or decoding a wind forecast
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherServiceError {
    /// The forecast provider answered with a non-success status
    Status(u16),
    /// The provider could not be reached
    Transport(String),
    /// The payload could not be decoded or fails validation
    MalformedPayload(String),
    /// The provider returned fewer hours than requested
    HorizonTooShort {
        /// Hours requested by the caller
        requested: u32,
        /// Hours actually present in the payload
        available: usize,
    },
}

impl std::fmt::Display for WeatherServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherServiceError::Status(code) => {
                write!(f, "forecast service returned status {code}")
            }
            WeatherServiceError::Transport(detail) => {
                write!(f, "forecast service unreachable: {detail}")
            }
            WeatherServiceError::MalformedPayload(detail) => {
                write!(f, "malformed forecast payload: {detail}")
            }
            WeatherServiceError::HorizonTooShort {
                requested,
                available,
            } => write!(
                f,
                "forecast covers {available} hours but {requested} were requested"
            ),
        }
    }
}

impl std::error::Error for WeatherServiceError {}

/// A coordinate or hour index outside the valid range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfBounds {
    /// Cell coordinate outside the terrain extent
    Cell {
        /// Offending coordinate
        coord: CellCoord,
        /// Valid extent
        extent: GridExtent,
    },
    /// Hour index past the end of the wind series
    Hour {
        /// Offending hour index
        hour: u32,
        /// Length of the series
        len: usize,
    },
}

impl std::fmt::Display for OutOfBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutOfBounds::Cell { coord, extent } => {
                write!(f, "cell {coord} outside {extent} grid")
            }
            OutOfBounds::Hour { hour, len } => {
                write!(f, "hour {hour} outside wind series of length {len}")
            }
        }
    }
}

impl std::error::Error for OutOfBounds {}

/// A wind sample or vector with non-finite or negative components
///
/// Raised at construction time so the stepping loop never sees NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidWindVector {
    /// Hour the sample was destined for, when known
    pub hour: Option<u32>,
    /// Offending speed in km/h
    pub speed_kmh: f32,
    /// Offending direction in degrees
    pub direction_deg: f32,
}

impl std::fmt::Display for InvalidWindVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.hour {
            Some(hour) => write!(
                f,
                "invalid wind sample at hour {hour}: speed {} km/h, direction {}°",
                self.speed_kmh, self.direction_deg
            ),
            None => write!(
                f,
                "invalid wind vector: speed {} km/h, direction {}°",
                self.speed_kmh, self.direction_deg
            ),
        }
    }
}

impl std::error::Error for InvalidWindVector {}

/// A configuration field with a non-finite or out-of-range value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidConfig {
    /// Name of the offending field
    pub field: &'static str,
    /// Offending value
    pub value: f32,
}

impl std::fmt::Display for InvalidConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid config value {} for `{}`", self.value, self.field)
    }
}

impl std::error::Error for InvalidConfig {}

/// Phase of the simulation pipeline that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationPhase {
    /// Loading and validating terrain layers
    TerrainLoad,
    /// Fetching and decoding the wind forecast
    WeatherFetch,
    /// Seeding the initial ignition points
    Ignition,
    /// Advancing the fire front hour by hour
    Stepping,
}

impl std::fmt::Display for SimulationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SimulationPhase::TerrainLoad => "terrain load",
            SimulationPhase::WeatherFetch => "weather fetch",
            SimulationPhase::Ignition => "ignition",
            SimulationPhase::Stepping => "stepping",
        };
        f.write_str(name)
    }
}

/// Top-level failure for a simulation run, tagged with the failing phase
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Terrain layers missing, unreadable or misaligned
    Terrain(TerrainLoadError),
    /// Forecast fetch or decode failed
    Weather(WeatherServiceError),
    /// An ignition point lies outside the terrain extent
    Ignition(OutOfBounds),
    /// An index went out of range while stepping
    Stepping(OutOfBounds),
}

impl SimulationError {
    /// The pipeline phase this error belongs to
    #[must_use]
    pub fn phase(&self) -> SimulationPhase {
        match self {
            SimulationError::Terrain(_) => SimulationPhase::TerrainLoad,
            SimulationError::Weather(_) => SimulationPhase::WeatherFetch,
            SimulationError::Ignition(_) => SimulationPhase::Ignition,
            SimulationError::Stepping(_) => SimulationPhase::Stepping,
        }
    }
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::Terrain(e) => write!(f, "{} failed: {e}", self.phase()),
            SimulationError::Weather(e) => write!(f, "{} failed: {e}", self.phase()),
            SimulationError::Ignition(e) | SimulationError::Stepping(e) => {
                write!(f, "{} failed: {e}", self.phase())
            }
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Terrain(e) => Some(e),
            SimulationError::Weather(e) => Some(e),
            SimulationError::Ignition(e) | SimulationError::Stepping(e) => Some(e),
        }
    }
}

impl From<TerrainLoadError> for SimulationError {
    fn from(e: TerrainLoadError) -> Self {
        SimulationError::Terrain(e)
    }
}

impl From<WeatherServiceError> for SimulationError {
    fn from(e: WeatherServiceError) -> Self {
        SimulationError::Weather(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_reported_in_display() {
        let err = SimulationError::Ignition(OutOfBounds::Cell {
            coord: CellCoord::new(9, 9),
            extent: GridExtent::new(5, 5),
        });
        assert_eq!(err.phase(), SimulationPhase::Ignition);
        let text = err.to_string();
        assert!(text.contains("ignition failed"), "{text}");
        assert!(text.contains("(9, 9)"), "{text}");
    }

    #[test]
    fn terrain_mismatch_names_layer_and_dims() {
        let err = TerrainLoadError::DimensionMismatch {
            layer: LayerKind::Slope,
            expected: (10, 10),
            found: (10, 8),
        };
        let text = err.to_string();
        assert!(text.contains("slope"), "{text}");
        assert!(text.contains("10x8"), "{text}");
    }
}
