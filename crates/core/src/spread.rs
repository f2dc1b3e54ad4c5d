//! Cellular spread engine: frontier-neighbor ignition evaluation
//!
//! Each step examines the 8-connected Unburned neighbors of every
//! frontier cell and combines four terrain/wind factors into an ignition
//! likelihood. The step is pure with respect to its inputs: the caller
//! applies the returned ignition set via
//! [`FireState::advance_frontier`](crate::fire::FireState::advance_frontier).
//!
//! When two frontier cells reach the same neighbor the candidates merge
//! by maximum likelihood, so parallel evaluation order cannot change the
//! result.

use crate::core_types::CellCoord;
use crate::error::{InvalidConfig, InvalidWindVector};
use crate::fire::{BurnStatus, FireState};
use crate::grid::{CellTerrain, TerrainGrid};
use crate::weather::{direction_to_unit_vector, WindSample};
use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validated downwind vector plus speed, as consumed by the engine
///
/// Construction rejects non-finite components so `step` never sees NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindVector {
    unit: Vector2<f32>,
    speed_kmh: f32,
}

impl WindVector {
    /// Wind vector of a validated hourly sample
    #[must_use]
    pub fn from_sample(sample: &WindSample) -> Self {
        WindVector {
            unit: sample.downwind(),
            speed_kmh: sample.speed_kmh(),
        }
    }

    /// Wind blowing *toward* `bearing_deg` at `speed_kmh`
    ///
    /// # Errors
    ///
    /// `InvalidWindVector` for non-finite values or negative speed.
    pub fn toward(bearing_deg: f32, speed_kmh: f32) -> Result<Self, InvalidWindVector> {
        if !bearing_deg.is_finite() || !speed_kmh.is_finite() || speed_kmh < 0.0 {
            return Err(InvalidWindVector {
                hour: None,
                speed_kmh,
                direction_deg: bearing_deg,
            });
        }
        // The met convention stores the "from" bearing; rotate back.
        Ok(WindVector {
            unit: direction_to_unit_vector(bearing_deg + 180.0),
            speed_kmh,
        })
    }

    /// Still air: no directional bias, zero speed
    #[must_use]
    pub fn calm() -> Self {
        WindVector {
            unit: Vector2::zeros(),
            speed_kmh: 0.0,
        }
    }

    /// Downwind unit vector (zero when calm)
    #[must_use]
    pub fn unit(&self) -> Vector2<f32> {
        self.unit
    }

    /// Speed in km/h
    #[must_use]
    pub fn speed_kmh(&self) -> f32 {
        self.speed_kmh
    }
}

/// Tunable weighting scheme and thresholds for the spread model
///
/// The likelihood is a weighted average of four factors in [0, 1]
/// (wind alignment, slope, vegetation, aspect exposure); a neighbor
/// ignites when it meets `ignition_threshold`. Weights are configuration
/// rather than constants so the scheme can be tuned and tested
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadConfig {
    /// Weight of the wind-alignment factor
    pub wind_weight: f32,
    /// Weight of the uphill/downhill slope factor
    pub slope_weight: f32,
    /// Weight of the vegetation (fuel/dryness) factor
    pub vegetation_weight: f32,
    /// Weight of the aspect sun-exposure factor
    pub aspect_weight: f32,
    /// Combined likelihood a neighbor must reach to ignite
    pub ignition_threshold: f32,
    /// Floor applied to upwind neighbors; fire creeps against wind
    /// slowly rather than not at all. Must lie in [0, 1].
    pub upwind_damping: f32,
    /// Vegetation index below which a cell is bare and can never ignite
    pub fuel_threshold: f32,
    /// e-folding speed (km/h) of the wind response; the directional
    /// boost saturates as speed grows past this scale
    pub wind_speed_efold_kmh: f32,
    /// Compass bearing treated as fully sun-exposed for the aspect
    /// factor (0° = north-facing, the sunny aspect in the southern
    /// hemisphere)
    pub sun_bearing_deg: f32,
    /// Seed for the optional stochastic perturbation; `None` disables it
    pub seed: Option<u64>,
    /// Half-width of the uniform perturbation added to the likelihood
    pub perturbation: f32,
}

impl Default for SpreadConfig {
    fn default() -> Self {
        SpreadConfig {
            wind_weight: 0.40,
            slope_weight: 0.25,
            vegetation_weight: 0.25,
            aspect_weight: 0.10,
            ignition_threshold: 0.65,
            upwind_damping: 0.25,
            fuel_threshold: 0.05,
            wind_speed_efold_kmh: 15.0,
            sun_bearing_deg: 0.0,
            seed: None,
            perturbation: 0.05,
        }
    }
}

impl SpreadConfig {
    /// Check every field for finiteness and range
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(self) -> Result<Self, InvalidConfig> {
        let bounded = [
            ("ignition_threshold", self.ignition_threshold),
            ("upwind_damping", self.upwind_damping),
            ("fuel_threshold", self.fuel_threshold),
        ];
        for (field, value) in bounded {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(InvalidConfig { field, value });
            }
        }
        let weights = [
            ("wind_weight", self.wind_weight),
            ("slope_weight", self.slope_weight),
            ("vegetation_weight", self.vegetation_weight),
            ("aspect_weight", self.aspect_weight),
        ];
        for (field, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidConfig { field, value });
            }
        }
        let weight_sum =
            self.wind_weight + self.slope_weight + self.vegetation_weight + self.aspect_weight;
        if weight_sum <= 0.0 {
            return Err(InvalidConfig {
                field: "weight sum",
                value: weight_sum,
            });
        }
        if !self.wind_speed_efold_kmh.is_finite() || self.wind_speed_efold_kmh <= 0.0 {
            return Err(InvalidConfig {
                field: "wind_speed_efold_kmh",
                value: self.wind_speed_efold_kmh,
            });
        }
        if !self.sun_bearing_deg.is_finite() {
            return Err(InvalidConfig {
                field: "sun_bearing_deg",
                value: self.sun_bearing_deg,
            });
        }
        if !self.perturbation.is_finite() || self.perturbation < 0.0 {
            return Err(InvalidConfig {
                field: "perturbation",
                value: self.perturbation,
            });
        }
        Ok(self)
    }
}

/// Deterministic frontier-neighbor spread evaluator
#[derive(Debug, Clone)]
pub struct SpreadEngine {
    config: SpreadConfig,
    weight_sum: f32,
}

impl SpreadEngine {
    /// Build an engine from a validated configuration
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when any field is non-finite or out of range.
    pub fn new(config: SpreadConfig) -> Result<Self, InvalidConfig> {
        let config = config.validate()?;
        let weight_sum = config.wind_weight
            + config.slope_weight
            + config.vegetation_weight
            + config.aspect_weight;
        Ok(SpreadEngine { config, weight_sum })
    }

    /// Active configuration (including the echoed seed, if any)
    #[must_use]
    pub fn config(&self) -> &SpreadConfig {
        &self.config
    }

    /// Compute the cells that ignite this hour
    ///
    /// Pure with respect to its inputs: `fire_state` is not mutated.
    /// Neighbors outside the terrain extent are excluded, never errors.
    /// An empty frontier yields an empty set, the driver's termination
    /// signal.
    #[must_use]
    pub fn step(
        &self,
        fire_state: &FireState,
        terrain: &TerrainGrid,
        wind: WindVector,
    ) -> FxHashSet<CellCoord> {
        debug_assert_eq!(fire_state.extent(), terrain.extent());

        let frontier: Vec<CellCoord> = fire_state.frontier().collect();
        if frontier.is_empty() {
            return FxHashSet::default();
        }

        let extent = terrain.extent();
        // Per-cell candidate maps merge by maximum likelihood, so two
        // frontier cells reaching the same neighbor never race.
        let candidates: FxHashMap<CellCoord, f32> = frontier
            .par_iter()
            .fold(FxHashMap::default, |mut acc: FxHashMap<CellCoord, f32>, &cell| {
                for neighbor in cell.neighbors8(extent) {
                    if fire_state.status(neighbor) != BurnStatus::Unburned {
                        continue;
                    }
                    let attrs = terrain.get(neighbor);
                    if attrs.vegetation < self.config.fuel_threshold {
                        continue;
                    }
                    let likelihood = self.likelihood(cell, neighbor, &attrs, terrain, wind);
                    acc.entry(neighbor)
                        .and_modify(|best| *best = best.max(likelihood))
                        .or_insert(likelihood);
                }
                acc
            })
            .reduce(FxHashMap::default, |mut merged, partial| {
                for (coord, likelihood) in partial {
                    merged
                        .entry(coord)
                        .and_modify(|best| *best = best.max(likelihood))
                        .or_insert(likelihood);
                }
                merged
            });

        let ignitions: FxHashSet<CellCoord> = candidates
            .into_iter()
            .filter(|&(_, likelihood)| likelihood >= self.config.ignition_threshold)
            .map(|(coord, _)| coord)
            .collect();

        debug!(
            frontier = frontier.len(),
            ignitions = ignitions.len(),
            "spread step"
        );
        ignitions
    }

    /// Combined ignition likelihood for spread from `from` into `to`
    fn likelihood(
        &self,
        from: CellCoord,
        to: CellCoord,
        attrs: &CellTerrain,
        terrain: &TerrainGrid,
        wind: WindVector,
    ) -> f32 {
        let cfg = &self.config;
        let dir = from.direction_to(to);

        // Wind alignment: downwind neighbors get a speed-saturated boost,
        // upwind neighbors sit at the damping floor.
        let alignment = wind.unit().dot(&dir);
        let speed_gain = 1.0 - (-wind.speed_kmh() / cfg.wind_speed_efold_kmh).exp();
        let wind_term = if alignment > 0.0 {
            cfg.upwind_damping + (1.0 - cfg.upwind_damping) * alignment * speed_gain
        } else {
            cfg.upwind_damping
        };

        // Slope: spreading uphill (against the neighbor's downslope
        // aspect) raises the term above the 0.5 neutral point.
        let uphill = dir.dot(&terrain.upslope_vector(to));
        let slope_term = 0.5 + 0.5 * uphill * attrs.slope.clamp(0.0, 1.0);

        let veg_term = attrs.vegetation.clamp(0.0, 1.0);

        // Aspect exposure: cosine falloff from the configured sunny
        // bearing, a dryness proxy.
        let offset = (attrs.aspect_deg - cfg.sun_bearing_deg).to_radians();
        let aspect_term = 0.5 * (1.0 + offset.cos());

        let mut score = (cfg.wind_weight * wind_term
            + cfg.slope_weight * slope_term
            + cfg.vegetation_weight * veg_term
            + cfg.aspect_weight * aspect_term)
            / self.weight_sum;

        if let Some(seed) = cfg.seed {
            if cfg.perturbation > 0.0 {
                score += perturbation(seed, from, to, cfg.perturbation);
            }
        }
        score
    }
}

/// Pure, order-independent stochastic jitter keyed on the seed and the
/// (source, neighbor) pair, so replays with the same seed are identical
/// regardless of thread scheduling
fn perturbation(seed: u64, from: CellCoord, to: CellCoord, amplitude: f32) -> f32 {
    let mut key = seed ^ 0xcbf2_9ce4_8422_2325;
    for part in [from.row, from.col, to.row, to.col] {
        key = (key ^ part as u64).wrapping_mul(0x0000_0100_0000_01b3);
    }
    let mut rng = StdRng::seed_from_u64(key);
    rng.random_range(-amplitude..=amplitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::GridExtent;

    fn engine(config: SpreadConfig) -> SpreadEngine {
        SpreadEngine::new(config).unwrap()
    }

    fn seeded_state(extent: GridExtent, coord: CellCoord) -> FireState {
        let mut state = FireState::new(extent, 3);
        state.seed([coord]).unwrap();
        state
    }

    #[test]
    fn empty_frontier_yields_empty_set() {
        let terrain = TerrainGrid::uniform(5, 5, 1.0, 0.0, 0.0);
        let state = FireState::new(terrain.extent(), 3);
        let result = engine(SpreadConfig::default()).step(
            &state,
            &terrain,
            WindVector::toward(90.0, 20.0).unwrap(),
        );
        assert!(result.is_empty());
    }

    #[test]
    fn downwind_bias_on_uniform_grid() {
        let terrain = TerrainGrid::uniform(5, 5, 1.0, 0.0, 0.0);
        let state = seeded_state(terrain.extent(), CellCoord::new(2, 2));
        // Wind blowing due east
        let wind = WindVector::toward(90.0, 20.0).unwrap();
        let ignitions = engine(SpreadConfig::default()).step(&state, &terrain, wind);

        assert!(ignitions.contains(&CellCoord::new(2, 3)), "{ignitions:?}");
        assert!(!ignitions.contains(&CellCoord::new(2, 1)), "{ignitions:?}");
    }

    #[test]
    fn upwind_spread_survives_with_low_threshold() {
        let terrain = TerrainGrid::uniform(5, 5, 1.0, 0.0, 0.0);
        let state = seeded_state(terrain.extent(), CellCoord::new(2, 2));
        let wind = WindVector::toward(90.0, 20.0).unwrap();
        let config = SpreadConfig {
            ignition_threshold: 0.5,
            ..SpreadConfig::default()
        };
        let ignitions = engine(config).step(&state, &terrain, wind);
        // Creeping against the wind is damped, not impossible
        assert!(ignitions.contains(&CellCoord::new(2, 1)), "{ignitions:?}");
    }

    #[test]
    fn bare_neighbors_never_ignite() {
        let terrain = TerrainGrid::uniform(5, 5, 0.0, 0.0, 0.0);
        let state = seeded_state(terrain.extent(), CellCoord::new(2, 2));
        let wind = WindVector::toward(90.0, 40.0).unwrap();
        let config = SpreadConfig {
            ignition_threshold: 0.1,
            ..SpreadConfig::default()
        };
        assert!(engine(config).step(&state, &terrain, wind).is_empty());
    }

    #[test]
    fn corner_frontier_stays_inside_grid() {
        let terrain = TerrainGrid::uniform(3, 3, 1.0, 0.0, 0.0);
        let extent = terrain.extent();
        let state = seeded_state(extent, CellCoord::new(0, 0));
        let config = SpreadConfig {
            ignition_threshold: 0.0,
            ..SpreadConfig::default()
        };
        let ignitions = engine(config).step(
            &state,
            &terrain,
            WindVector::toward(315.0, 30.0).unwrap(),
        );
        assert!(!ignitions.is_empty());
        assert!(ignitions.iter().all(|c| extent.contains(*c)));
    }

    #[test]
    fn uphill_neighbors_favored() {
        // Hill peak east of the frontier: spreading east goes uphill.
        let terrain = TerrainGrid::hill(9, 9, 1.0, CellCoord::new(4, 8), 8.0, 1.0);
        let _state = seeded_state(terrain.extent(), CellCoord::new(4, 4));
        let config = SpreadConfig {
            wind_weight: 0.0,
            aspect_weight: 0.0,
            ignition_threshold: 0.0,
            ..SpreadConfig::default()
        };
        let eng = engine(config);
        let east = terrain.get(CellCoord::new(4, 5));
        let west = terrain.get(CellCoord::new(4, 3));
        let uphill = eng.likelihood(
            CellCoord::new(4, 4),
            CellCoord::new(4, 5),
            &east,
            &terrain,
            WindVector::calm(),
        );
        let downhill = eng.likelihood(
            CellCoord::new(4, 4),
            CellCoord::new(4, 3),
            &west,
            &terrain,
            WindVector::calm(),
        );
        assert!(uphill > downhill, "{uphill} vs {downhill}");
    }

    #[test]
    fn likelihood_monotonic_in_vegetation() {
        let sparse = TerrainGrid::uniform(3, 3, 0.3, 0.0, 0.0);
        let dense = TerrainGrid::uniform(3, 3, 0.9, 0.0, 0.0);
        let eng = engine(SpreadConfig::default());
        let from = CellCoord::new(1, 1);
        let to = CellCoord::new(1, 2);
        let wind = WindVector::toward(90.0, 10.0).unwrap();
        let low = eng.likelihood(from, to, &sparse.get(to), &sparse, wind);
        let high = eng.likelihood(from, to, &dense.get(to), &dense, wind);
        assert!(high > low);
    }

    #[test]
    fn step_is_deterministic_with_seed() {
        let terrain = TerrainGrid::uniform(16, 16, 0.8, 0.2, 45.0);
        let state = seeded_state(terrain.extent(), CellCoord::new(8, 8));
        let config = SpreadConfig {
            seed: Some(42),
            perturbation: 0.1,
            ignition_threshold: 0.55,
            ..SpreadConfig::default()
        };
        let wind = WindVector::toward(45.0, 25.0).unwrap();
        let a = engine(config).step(&state, &terrain, wind);
        let b = engine(config).step(&state, &terrain, wind);
        assert_eq!(a, b);
    }

    #[test]
    fn perturbation_is_pure_and_bounded() {
        let from = CellCoord::new(3, 4);
        let to = CellCoord::new(3, 5);
        let a = perturbation(42, from, to, 0.1);
        let b = perturbation(42, from, to, 0.1);
        assert_eq!(a, b);
        assert!(a.abs() <= 0.1);
        // Distinct cell pairs draw independent, still-bounded jitter
        let c = perturbation(42, from, CellCoord::new(4, 5), 0.1);
        assert!(c.abs() <= 0.1);
    }

    #[test]
    fn config_validation_rejects_bad_fields() {
        let bad = SpreadConfig {
            upwind_damping: 1.5,
            ..SpreadConfig::default()
        };
        assert!(bad.validate().is_err());

        let bad = SpreadConfig {
            wind_weight: f32::NAN,
            ..SpreadConfig::default()
        };
        assert!(bad.validate().is_err());

        let bad = SpreadConfig {
            wind_weight: 0.0,
            slope_weight: 0.0,
            vegetation_weight: 0.0,
            aspect_weight: 0.0,
            ..SpreadConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn wind_vector_rejects_non_finite() {
        assert!(WindVector::toward(f32::NAN, 5.0).is_err());
        assert!(WindVector::toward(90.0, -3.0).is_err());
    }
}
