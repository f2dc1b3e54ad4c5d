//! Simulation driver: one step per simulated hour
//!
//! The driver owns the loop: pull the hour's wind sample, ask the spread
//! engine for new ignitions, apply them to the fire state and emit a
//! frame. Rendering, logging or test collection all sit behind the
//! [`FrameSink`] seam, so the simulation itself runs headless.

use crate::core_types::CellCoord;
use crate::error::SimulationError;
use crate::fire::{FireSnapshot, FireState};
use crate::grid::TerrainGrid;
use crate::spread::{SpreadEngine, WindVector};
use crate::weather::{WindSample, WindTimeSeries};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// One emitted simulation frame: the state after an hour's advance plus
/// the wind sample that drove it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Simulated hour this frame closes
    pub hour: u32,
    /// Wind sample applied during the hour
    pub wind: WindSample,
    /// Fire state after the advance
    pub snapshot: FireSnapshot,
}

/// Consumer of per-hour frames
///
/// The driver assumes nothing about timing beyond "accepts one frame per
/// simulated hour". Implementations may render, log, write files or just
/// collect for assertions.
pub trait FrameSink {
    /// Accept the frame for `frame.hour`
    fn emit(&mut self, frame: &Frame);
}

/// Frame collector for tests and headless post-processing
#[derive(Debug, Default)]
pub struct CollectorSink {
    frames: Vec<Frame>,
}

impl CollectorSink {
    /// Empty collector
    #[must_use]
    pub fn new() -> Self {
        CollectorSink::default()
    }

    /// Frames collected so far, in hour order
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl FrameSink for CollectorSink {
    fn emit(&mut self, frame: &Frame) {
        self.frames.push(frame.clone());
    }
}

/// Cooperative cancellation flag, checked between hours (never mid-step)
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, uncancelled token
    #[must_use]
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Request a clean stop before the next hour begins
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Driver-level bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Optional cap on simulated hours, independent of series length
    pub max_hours: Option<u32>,
    /// Full hours a cell burns before fuel exhaustion
    pub max_burning_hours: u32,
    /// Chebyshev radius within which an ignition point placed on bare
    /// ground snaps to the nearest fuel-bearing cell (0 disables
    /// snapping)
    pub ignition_snap_radius: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            max_hours: None,
            max_burning_hours: 3,
            ignition_snap_radius: 3,
        }
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// No cell can propagate anymore; the fire burned out
    FrontierEmpty,
    /// Every wind sample was consumed
    SeriesExhausted,
    /// The configured `max_hours` bound was reached
    HorizonReached,
    /// Cancellation was requested between hours
    Cancelled,
}

/// Outcome of a completed (or cleanly stopped) run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Number of hours fully simulated and emitted
    pub hours_run: u32,
    /// Why the loop ended
    pub stop_reason: StopReason,
}

/// Orchestrates a full simulation over terrain, wind and ignitions
pub struct SimulationDriver {
    engine: SpreadEngine,
    config: DriverConfig,
    cancel: CancelToken,
}

impl SimulationDriver {
    /// Driver around a configured engine
    #[must_use]
    pub fn new(engine: SpreadEngine, config: DriverConfig) -> Self {
        SimulationDriver {
            engine,
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Token callers can hold to request a clean stop
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the simulation to completion
    ///
    /// Ignition points on bare ground snap to the nearest fuel-bearing
    /// cell within `ignition_snap_radius` before seeding. The loop then
    /// iterates the wind series hour by hour, stopping early when the
    /// frontier empties, the hour bound is hit, or cancellation is
    /// requested. One frame reaches the sink per simulated hour; a
    /// failed run emits nothing past the last good frame.
    ///
    /// # Errors
    ///
    /// `SimulationError::Ignition` when a seed coordinate lies outside
    /// the terrain, `SimulationError::Stepping` if an hour index goes
    /// out of range mid-run.
    pub fn run(
        &self,
        terrain: &TerrainGrid,
        wind_series: &WindTimeSeries,
        ignition_points: &[CellCoord],
        sink: &mut dyn FrameSink,
    ) -> Result<RunReport, SimulationError> {
        let fuel_threshold = self.engine.config().fuel_threshold;
        let mut state =
            FireState::for_terrain(terrain, self.config.max_burning_hours, fuel_threshold);
        // An ignition point placed just off the fuel snaps to the
        // nearest vegetated cell; one with no fuel in reach is seeded
        // as-is and burns out at the first advance.
        let seeds: Vec<CellCoord> = ignition_points
            .iter()
            .map(|&coord| {
                terrain
                    .nearest_fuel(coord, fuel_threshold, self.config.ignition_snap_radius)
                    .unwrap_or(coord)
            })
            .collect();
        state.seed(seeds).map_err(SimulationError::Ignition)?;

        info!(
            extent = %terrain.extent(),
            hours = wind_series.len(),
            ignitions = ignition_points.len(),
            "simulation start"
        );

        let mut hours_run = 0u32;
        for hour in 0..wind_series.len() as u32 {
            if self.cancel.is_cancelled() {
                info!(hour, "simulation cancelled");
                return Ok(RunReport {
                    hours_run,
                    stop_reason: StopReason::Cancelled,
                });
            }
            if state.frontier_is_empty() {
                info!(hour, "fire burned out");
                return Ok(RunReport {
                    hours_run,
                    stop_reason: StopReason::FrontierEmpty,
                });
            }
            if self.config.max_hours.is_some_and(|max| hour >= max) {
                info!(hour, "hour bound reached");
                return Ok(RunReport {
                    hours_run,
                    stop_reason: StopReason::HorizonReached,
                });
            }

            let sample = wind_series
                .sample(hour)
                .map_err(SimulationError::Stepping)?;
            let new_ignitions = self
                .engine
                .step(&state, terrain, WindVector::from_sample(&sample));
            state.advance_frontier(&new_ignitions);

            debug!(
                hour,
                wind_kmh = sample.speed_kmh(),
                wind_deg = sample.direction_deg(),
                frontier = state.frontier_len(),
                "hour advanced"
            );
            sink.emit(&Frame {
                hour,
                wind: sample,
                snapshot: state.snapshot(),
            });
            hours_run += 1;
        }

        info!(hours_run, "wind series exhausted");
        Ok(RunReport {
            hours_run,
            stop_reason: StopReason::SeriesExhausted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::GridExtent;
    use crate::fire::BurnStatus;
    use crate::grid::{LayerKind, RasterLayer};
    use crate::spread::SpreadConfig;

    fn driver(config: DriverConfig) -> SimulationDriver {
        SimulationDriver::new(SpreadEngine::new(SpreadConfig::default()).unwrap(), config)
    }

    fn steady_east_wind(hours: usize) -> WindTimeSeries {
        // "From" bearing 270° blows toward the east
        WindTimeSeries::from_speeds_and_directions(
            &vec![20.0; hours],
            &vec![270.0; hours],
        )
        .unwrap()
    }

    #[test]
    fn out_of_bounds_ignition_reported_with_phase() {
        let terrain = TerrainGrid::uniform(5, 5, 1.0, 0.0, 0.0);
        let mut sink = CollectorSink::new();
        let err = driver(DriverConfig::default())
            .run(
                &terrain,
                &steady_east_wind(3),
                &[CellCoord::new(7, 7)],
                &mut sink,
            )
            .unwrap_err();
        assert!(matches!(err, SimulationError::Ignition(_)));
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn emits_one_frame_per_hour() {
        let terrain = TerrainGrid::uniform(8, 8, 1.0, 0.0, 0.0);
        let mut sink = CollectorSink::new();
        let report = driver(DriverConfig::default())
            .run(
                &terrain,
                &steady_east_wind(4),
                &[CellCoord::new(4, 4)],
                &mut sink,
            )
            .unwrap();
        assert_eq!(report.stop_reason, StopReason::SeriesExhausted);
        assert_eq!(report.hours_run, 4);
        assert_eq!(sink.frames().len(), 4);
        for (i, frame) in sink.frames().iter().enumerate() {
            assert_eq!(frame.hour, i as u32);
        }
    }

    #[test]
    fn max_hours_bound_stops_early() {
        let terrain = TerrainGrid::uniform(8, 8, 1.0, 0.0, 0.0);
        let mut sink = CollectorSink::new();
        let report = driver(DriverConfig {
            max_hours: Some(2),
            ..DriverConfig::default()
        })
        .run(
            &terrain,
            &steady_east_wind(6),
            &[CellCoord::new(4, 4)],
            &mut sink,
        )
        .unwrap();
        assert_eq!(report.stop_reason, StopReason::HorizonReached);
        assert_eq!(sink.frames().len(), 2);
    }

    /// Vegetated grid with a 3x3 bare block centered on (2, 2)
    fn cleared_block_terrain() -> TerrainGrid {
        let extent = GridExtent::new(7, 7);
        let mut veg = vec![0.9; extent.cell_count()];
        for row in 1..=3 {
            for col in 1..=3 {
                veg[extent.index(CellCoord::new(row, col))] = 0.0;
            }
        }
        TerrainGrid::from_layers(
            RasterLayer::new(LayerKind::Vegetation, 7, 7, veg).unwrap(),
            RasterLayer::filled(7, 7, 0.0),
            RasterLayer::filled(7, 7, 0.0),
        )
        .unwrap()
    }

    #[test]
    fn bare_ignition_point_snaps_to_nearby_fuel() {
        // Seeding the middle of the cleared block ignites the nearest
        // vegetated cell instead of fizzling out.
        let terrain = cleared_block_terrain();
        let mut sink = CollectorSink::new();
        let report = driver(DriverConfig::default())
            .run(
                &terrain,
                &steady_east_wind(1),
                &[CellCoord::new(2, 2)],
                &mut sink,
            )
            .unwrap();
        assert_eq!(report.hours_run, 1);

        let frame = &sink.frames()[0];
        // The outward scan reaches row 0 first; the snapped seed went
        // through one promotion cycle.
        assert_eq!(
            frame.snapshot.status_of(CellCoord::new(0, 0)),
            BurnStatus::Burning
        );
        // The bare click point never entered the lifecycle
        assert_eq!(
            frame.snapshot.status_of(CellCoord::new(2, 2)),
            BurnStatus::Unburned
        );
    }

    #[test]
    fn snapping_disabled_lets_bare_seed_burn_out() {
        let terrain = cleared_block_terrain();
        let mut sink = CollectorSink::new();
        let report = driver(DriverConfig {
            ignition_snap_radius: 0,
            ..DriverConfig::default()
        })
        .run(
            &terrain,
            &steady_east_wind(3),
            &[CellCoord::new(2, 2)],
            &mut sink,
        )
        .unwrap();
        assert_eq!(report.stop_reason, StopReason::FrontierEmpty);
        assert_eq!(report.hours_run, 1);
        assert_eq!(
            sink.frames()[0].snapshot.status_of(CellCoord::new(2, 2)),
            BurnStatus::Burned
        );
    }

    #[test]
    fn cancellation_stops_between_hours() {
        let terrain = TerrainGrid::uniform(8, 8, 1.0, 0.0, 0.0);
        let d = driver(DriverConfig::default());
        d.cancel_token().cancel();
        let mut sink = CollectorSink::new();
        let report = d
            .run(
                &terrain,
                &steady_east_wind(5),
                &[CellCoord::new(4, 4)],
                &mut sink,
            )
            .unwrap();
        assert_eq!(report.stop_reason, StopReason::Cancelled);
        assert_eq!(report.hours_run, 0);
        assert!(sink.frames().is_empty());
    }
}
