//! Hourly wind series and the forecast-provider seam
//!
//! Wind samples are validated at construction so the stepping loop never
//! sees NaN. Forecast transport (HTTP, caching, retries) is an external
//! concern behind the [`ForecastSource`] trait; this module only decodes
//! the hourly payload shape the provider returns.

use crate::core_types::bearing_unit_vector;
use crate::error::{InvalidWindVector, OutOfBounds, WeatherServiceError};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Geographic request location for a forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

/// One validated hourly wind observation
///
/// Direction follows the meteorological convention: the compass bearing
/// the wind blows *from* (0° = North, clockwise).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSample {
    hour: u32,
    speed_kmh: f32,
    direction_deg: f32,
}

impl WindSample {
    /// Validate and build a sample
    ///
    /// Direction is normalized into [0, 360).
    ///
    /// # Errors
    ///
    /// `InvalidWindVector` for non-finite values or negative speed.
    pub fn new(hour: u32, speed_kmh: f32, direction_deg: f32) -> Result<Self, InvalidWindVector> {
        if !speed_kmh.is_finite() || speed_kmh < 0.0 || !direction_deg.is_finite() {
            return Err(InvalidWindVector {
                hour: Some(hour),
                speed_kmh,
                direction_deg,
            });
        }
        Ok(WindSample {
            hour,
            speed_kmh,
            direction_deg: direction_deg.rem_euclid(360.0),
        })
    }

    /// Hour index within the series
    #[must_use]
    pub fn hour(&self) -> u32 {
        self.hour
    }

    /// Wind speed in km/h, always ≥ 0
    #[must_use]
    pub fn speed_kmh(&self) -> f32 {
        self.speed_kmh
    }

    /// Meteorological "from" bearing in degrees [0, 360)
    #[must_use]
    pub fn direction_deg(&self) -> f32 {
        self.direction_deg
    }

    /// Downwind unit vector of this sample
    #[must_use]
    pub fn downwind(&self) -> Vector2<f32> {
        direction_to_unit_vector(self.direction_deg)
    }
}

/// Convert a meteorological "from" bearing into the downwind unit vector
///
/// The bearing is rotated 180° — fire spreads in the direction the wind
/// blows *toward* — then converted to east/north Cartesian components.
/// Pure and total; out-of-range inputs wrap. The result always has unit
/// magnitude.
#[must_use]
pub fn direction_to_unit_vector(direction_deg: f32) -> Vector2<f32> {
    bearing_unit_vector(direction_deg + 180.0)
}

/// Ordered hourly wind series with contiguous hours starting at 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindTimeSeries {
    samples: Vec<WindSample>,
}

impl WindTimeSeries {
    /// Build a series from parallel speed/direction slices
    ///
    /// Hours are assigned by position, so contiguity holds by
    /// construction.
    ///
    /// # Errors
    ///
    /// `InvalidWindVector` for the first non-finite or negative entry.
    pub fn from_speeds_and_directions(
        speeds_kmh: &[f32],
        directions_deg: &[f32],
    ) -> Result<Self, InvalidWindVector> {
        let samples = speeds_kmh
            .iter()
            .zip(directions_deg)
            .enumerate()
            .map(|(hour, (&speed, &dir))| WindSample::new(hour as u32, speed, dir))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WindTimeSeries { samples })
    }

    /// Decode a forecast payload into a series covering `horizon_hours`
    ///
    /// # Errors
    ///
    /// `HorizonTooShort` when the payload covers fewer hours than
    /// requested, `MalformedPayload` when the hourly arrays disagree in
    /// length or contain invalid samples.
    pub fn from_forecast(
        payload: &ForecastPayload,
        horizon_hours: u32,
    ) -> Result<Self, WeatherServiceError> {
        let speeds = &payload.hourly.windspeed_10m;
        let directions = &payload.hourly.winddirection_10m;
        if speeds.len() != directions.len() {
            return Err(WeatherServiceError::MalformedPayload(format!(
                "{} speeds but {} directions",
                speeds.len(),
                directions.len()
            )));
        }
        let horizon = horizon_hours as usize;
        if speeds.len() < horizon {
            return Err(WeatherServiceError::HorizonTooShort {
                requested: horizon_hours,
                available: speeds.len(),
            });
        }
        Self::from_speeds_and_directions(&speeds[..horizon], &directions[..horizon])
            .map_err(|e| WeatherServiceError::MalformedPayload(e.to_string()))
    }

    /// Number of hourly samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the series holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample for `hour`
    ///
    /// # Errors
    ///
    /// `OutOfBounds::Hour` when `hour` exceeds the series length.
    pub fn sample(&self, hour: u32) -> Result<WindSample, OutOfBounds> {
        self.samples
            .get(hour as usize)
            .copied()
            .ok_or(OutOfBounds::Hour {
                hour,
                len: self.samples.len(),
            })
    }

    /// All samples in hour order
    #[must_use]
    pub fn samples(&self) -> &[WindSample] {
        &self.samples
    }
}

/// Hourly wind arrays as returned by the forecast provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWinds {
    /// Wind speed at 10 m, km/h, one entry per hour
    pub windspeed_10m: Vec<f32>,
    /// Wind direction at 10 m, degrees "from", one entry per hour
    pub winddirection_10m: Vec<f32>,
}

/// Decoded forecast payload (hourly wind block only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    /// Hourly wind arrays
    pub hourly: HourlyWinds,
}

impl ForecastPayload {
    /// Decode a raw JSON payload
    ///
    /// # Errors
    ///
    /// `WeatherServiceError::MalformedPayload` when decoding fails.
    pub fn from_json(raw: &str) -> Result<Self, WeatherServiceError> {
        serde_json::from_str(raw).map_err(|e| WeatherServiceError::MalformedPayload(e.to_string()))
    }
}

/// Black-box forecast provider seam
///
/// Implementations wrap an HTTP client, a fixture file, or a constant
/// fallback. A non-success response or unreachable service maps to
/// `WeatherServiceError`; the engine never retries.
pub trait ForecastSource {
    /// Fetch a forecast payload for `location` covering `horizon_hours`
    ///
    /// # Errors
    ///
    /// `WeatherServiceError` on transport failure, non-success status or
    /// an undecodable payload.
    fn fetch(
        &self,
        location: LatLon,
        horizon_hours: u32,
    ) -> Result<ForecastPayload, WeatherServiceError>;
}

/// Constant-wind source, the offline fallback when no provider is
/// reachable (5 km/h from the east unless configured otherwise)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticForecast {
    /// Constant speed in km/h
    pub speed_kmh: f32,
    /// Constant "from" bearing in degrees
    pub direction_deg: f32,
}

impl Default for StaticForecast {
    fn default() -> Self {
        StaticForecast {
            speed_kmh: 5.0,
            direction_deg: 90.0,
        }
    }
}

impl ForecastSource for StaticForecast {
    fn fetch(
        &self,
        _location: LatLon,
        horizon_hours: u32,
    ) -> Result<ForecastPayload, WeatherServiceError> {
        let n = horizon_hours as usize;
        Ok(ForecastPayload {
            hourly: HourlyWinds {
                windspeed_10m: vec![self.speed_kmh; n],
                winddirection_10m: vec![self.direction_deg; n],
            },
        })
    }
}

/// Fetch and decode a wind series in one call
///
/// # Errors
///
/// Propagates `WeatherServiceError` from the source or the decoder.
pub fn fetch_series(
    source: &dyn ForecastSource,
    location: LatLon,
    horizon_hours: u32,
) -> Result<WindTimeSeries, WeatherServiceError> {
    let payload = source.fetch(location, horizon_hours)?;
    let series = WindTimeSeries::from_forecast(&payload, horizon_hours)?;
    info!(hours = series.len(), "wind series ready");
    Ok(series)
}
