//! Fire state: per-cell burn lifecycle and the active frontier
//!
//! Each cell walks the monotonic sequence
//! Unburned → Igniting → Burning → Burned and never regresses. The
//! frontier — all Igniting and Burning cells — is the only set that can
//! propagate fire. Burned cells have exhausted their fuel and stay
//! inert, which bounds growth and gives the simulation its natural
//! termination once the frontier empties.

use crate::core_types::{CellCoord, GridExtent};
use crate::error::OutOfBounds;
use crate::grid::TerrainGrid;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Burn lifecycle of a single cell
///
/// The derived ordering follows the lifecycle, so monotonicity can be
/// asserted with `<=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BurnStatus {
    /// Untouched; the only state that can ignite
    Unburned,
    /// Ignited this hour, becomes Burning at the next advance
    Igniting,
    /// Actively burning and propagating
    Burning,
    /// Fuel exhausted; never propagates again
    Burned,
}

#[derive(Debug, Clone, Copy)]
struct CellRecord {
    status: BurnStatus,
    /// Completed full hours spent in Burning
    hours_burning: u32,
}

/// Mutable fire front over a fixed terrain extent
///
/// Mutated exclusively through [`seed`](FireState::seed) and
/// [`advance_frontier`](FireState::advance_frontier); consumers read
/// immutable [`FireSnapshot`]s.
#[derive(Debug, Clone)]
pub struct FireState {
    extent: GridExtent,
    max_burning_hours: u32,
    /// Per-cell fuel presence; `None` means every cell bears fuel
    fuel_mask: Option<Vec<bool>>,
    cells: FxHashMap<CellCoord, CellRecord>,
    frontier: FxHashSet<CellCoord>,
}

impl FireState {
    /// Empty fire state where every cell is assumed to bear fuel
    #[must_use]
    pub fn new(extent: GridExtent, max_burning_hours: u32) -> Self {
        FireState {
            extent,
            max_burning_hours,
            fuel_mask: None,
            cells: FxHashMap::default(),
            frontier: FxHashSet::default(),
        }
    }

    /// Empty fire state with fuel presence read from the terrain
    ///
    /// Cells whose vegetation index falls below `fuel_threshold` cannot
    /// sustain burning: ignitions imposed on them burn out at the next
    /// advance instead of entering the Burning stage.
    #[must_use]
    pub fn for_terrain(terrain: &TerrainGrid, max_burning_hours: u32, fuel_threshold: f32) -> Self {
        let extent = terrain.extent();
        let mut mask = Vec::with_capacity(extent.cell_count());
        for row in 0..extent.height {
            for col in 0..extent.width {
                mask.push(terrain.has_fuel(CellCoord::new(row, col), fuel_threshold));
            }
        }
        FireState {
            extent,
            max_burning_hours,
            fuel_mask: Some(mask),
            cells: FxHashMap::default(),
            frontier: FxHashSet::default(),
        }
    }

    /// Extent this state is bound to
    #[must_use]
    pub fn extent(&self) -> GridExtent {
        self.extent
    }

    /// Current status of `coord`; untracked cells are Unburned
    #[must_use]
    pub fn status(&self, coord: CellCoord) -> BurnStatus {
        self.cells
            .get(&coord)
            .map_or(BurnStatus::Unburned, |r| r.status)
    }

    /// Iterate the frontier (Igniting and Burning cells)
    pub fn frontier(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.frontier.iter().copied()
    }

    /// Number of frontier cells
    #[must_use]
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Whether no cell can propagate fire anymore
    #[must_use]
    pub fn frontier_is_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Mark ignition points as Igniting
    ///
    /// Re-seeding a cell that already left Unburned is a no-op, not an
    /// error.
    ///
    /// # Errors
    ///
    /// `OutOfBounds::Cell` when any coordinate lies outside the extent;
    /// no coordinate is applied in that case.
    pub fn seed(
        &mut self,
        coords: impl IntoIterator<Item = CellCoord> + Clone,
    ) -> Result<(), OutOfBounds> {
        for coord in coords.clone() {
            if !self.extent.contains(coord) {
                return Err(OutOfBounds::Cell {
                    coord,
                    extent: self.extent,
                });
            }
        }
        for coord in coords {
            if self.status(coord) == BurnStatus::Unburned {
                self.cells.insert(
                    coord,
                    CellRecord {
                        status: BurnStatus::Igniting,
                        hours_burning: 0,
                    },
                );
                self.frontier.insert(coord);
            }
        }
        Ok(())
    }

    /// Apply one hour of lifecycle progression
    ///
    /// Order: Burning cells that completed the configured duration are
    /// demoted to Burned; Igniting cells are promoted to Burning (or
    /// straight to Burned when their cell bears no fuel); previously
    /// Unburned `new_ignitions` become Igniting. Coordinates outside the
    /// extent or already past Unburned are ignored.
    pub fn advance_frontier(&mut self, new_ignitions: &FxHashSet<CellCoord>) {
        let frontier: Vec<CellCoord> = self.frontier.iter().copied().collect();
        for coord in frontier {
            let has_fuel = self.cell_has_fuel(coord);
            let Some(record) = self.cells.get_mut(&coord) else {
                continue;
            };
            match record.status {
                BurnStatus::Burning => {
                    record.hours_burning += 1;
                    if record.hours_burning >= self.max_burning_hours {
                        record.status = BurnStatus::Burned;
                        self.frontier.remove(&coord);
                    }
                }
                BurnStatus::Igniting => {
                    if has_fuel {
                        record.status = BurnStatus::Burning;
                        record.hours_burning = 0;
                    } else {
                        // Imposed ignition on bare ground burns out
                        // without entering the Burning stage.
                        record.status = BurnStatus::Burned;
                        self.frontier.remove(&coord);
                    }
                }
                BurnStatus::Unburned | BurnStatus::Burned => {}
            }
        }

        for &coord in new_ignitions {
            if !self.extent.contains(coord) {
                continue;
            }
            if self.status(coord) == BurnStatus::Unburned {
                self.cells.insert(
                    coord,
                    CellRecord {
                        status: BurnStatus::Igniting,
                        hours_burning: 0,
                    },
                );
                self.frontier.insert(coord);
            }
        }
    }

    /// Immutable snapshot of every tracked cell, sorted by coordinate
    #[must_use]
    pub fn snapshot(&self) -> FireSnapshot {
        let mut cells: Vec<(CellCoord, BurnStatus)> = self
            .cells
            .iter()
            .map(|(&coord, record)| (coord, record.status))
            .collect();
        cells.sort_unstable_by_key(|&(coord, _)| coord);

        let mut counts = StatusCounts::default();
        for &(_, status) in &cells {
            match status {
                BurnStatus::Igniting => counts.igniting += 1,
                BurnStatus::Burning => counts.burning += 1,
                BurnStatus::Burned => counts.burned += 1,
                BurnStatus::Unburned => {}
            }
        }

        FireSnapshot { cells, counts }
    }

    fn cell_has_fuel(&self, coord: CellCoord) -> bool {
        self.fuel_mask
            .as_ref()
            .is_none_or(|mask| mask[self.extent.index(coord)])
    }
}

/// Count of cells per non-Unburned status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Cells ignited this hour
    pub igniting: usize,
    /// Actively burning cells
    pub burning: usize,
    /// Exhausted cells
    pub burned: usize,
}

/// Immutable view of the fire state at one simulated hour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireSnapshot {
    cells: Vec<(CellCoord, BurnStatus)>,
    counts: StatusCounts,
}

impl FireSnapshot {
    /// Tracked cells with their status, sorted by coordinate
    #[must_use]
    pub fn cells(&self) -> &[(CellCoord, BurnStatus)] {
        &self.cells
    }

    /// Status of `coord`; untracked cells report Unburned
    #[must_use]
    pub fn status_of(&self, coord: CellCoord) -> BurnStatus {
        self.cells
            .binary_search_by_key(&coord, |&(c, _)| c)
            .map_or(BurnStatus::Unburned, |i| self.cells[i].1)
    }

    /// Per-status cell counts
    #[must_use]
    pub fn counts(&self) -> StatusCounts {
        self.counts
    }

    /// Number of cells still able to propagate
    #[must_use]
    pub fn frontier_len(&self) -> usize {
        self.counts.igniting + self.counts.burning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(list: &[(usize, usize)]) -> FxHashSet<CellCoord> {
        list.iter().map(|&(r, c)| CellCoord::new(r, c)).collect()
    }

    #[test]
    fn seed_marks_igniting_and_rejects_out_of_bounds() {
        let mut state = FireState::new(GridExtent::new(4, 4), 3);
        state.seed([CellCoord::new(1, 1)]).unwrap();
        assert_eq!(state.status(CellCoord::new(1, 1)), BurnStatus::Igniting);
        assert_eq!(state.frontier_len(), 1);

        let err = state.seed([CellCoord::new(4, 0)]).unwrap_err();
        assert!(matches!(err, OutOfBounds::Cell { .. }));
    }

    #[test]
    fn reseeding_burning_cell_is_noop() {
        let mut state = FireState::new(GridExtent::new(4, 4), 3);
        state.seed([CellCoord::new(1, 1)]).unwrap();
        state.advance_frontier(&FxHashSet::default());
        assert_eq!(state.status(CellCoord::new(1, 1)), BurnStatus::Burning);

        state.seed([CellCoord::new(1, 1)]).unwrap();
        assert_eq!(state.status(CellCoord::new(1, 1)), BurnStatus::Burning);
        assert_eq!(state.frontier_len(), 1);
    }

    #[test]
    fn lifecycle_with_one_hour_burn_duration() {
        let mut state = FireState::new(GridExtent::new(4, 4), 1);
        let cell = CellCoord::new(2, 2);

        // Hour 0: cell ignites
        state.advance_frontier(&coords(&[(2, 2)]));
        assert_eq!(state.status(cell), BurnStatus::Igniting);

        // Hour 1: burning
        state.advance_frontier(&FxHashSet::default());
        assert_eq!(state.status(cell), BurnStatus::Burning);
        assert_eq!(state.frontier_len(), 1);

        // Hour 2: burned out, gone from the frontier
        state.advance_frontier(&FxHashSet::default());
        assert_eq!(state.status(cell), BurnStatus::Burned);
        assert!(state.frontier_is_empty());

        // Hour 3: stays burned
        state.advance_frontier(&FxHashSet::default());
        assert_eq!(state.status(cell), BurnStatus::Burned);
    }

    #[test]
    fn burned_cells_never_reignite() {
        let mut state = FireState::new(GridExtent::new(4, 4), 1);
        let cell = CellCoord::new(0, 0);
        state.advance_frontier(&coords(&[(0, 0)]));
        state.advance_frontier(&FxHashSet::default());
        state.advance_frontier(&FxHashSet::default());
        assert_eq!(state.status(cell), BurnStatus::Burned);

        // Neither seeding nor a new ignition brings it back
        state.seed([cell]).unwrap();
        state.advance_frontier(&coords(&[(0, 0)]));
        assert_eq!(state.status(cell), BurnStatus::Burned);
    }

    #[test]
    fn bare_cell_burns_out_without_burning_stage() {
        let terrain = TerrainGrid::uniform(3, 3, 0.0, 0.0, 0.0);
        let mut state = FireState::for_terrain(&terrain, 3, 0.05);
        state.seed([CellCoord::new(1, 1)]).unwrap();
        assert_eq!(state.frontier_len(), 1);

        state.advance_frontier(&FxHashSet::default());
        assert_eq!(state.status(CellCoord::new(1, 1)), BurnStatus::Burned);
        assert!(state.frontier_is_empty());
    }

    #[test]
    fn snapshot_is_sorted_and_counts_match() {
        let mut state = FireState::new(GridExtent::new(5, 5), 3);
        state
            .seed([CellCoord::new(3, 1), CellCoord::new(0, 4), CellCoord::new(2, 2)])
            .unwrap();
        state.advance_frontier(&coords(&[(4, 4)]));

        let snap = state.snapshot();
        let cells = snap.cells();
        assert!(cells.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(snap.counts().burning, 3);
        assert_eq!(snap.counts().igniting, 1);
        assert_eq!(snap.frontier_len(), 4);
        assert_eq!(snap.status_of(CellCoord::new(4, 4)), BurnStatus::Igniting);
        assert_eq!(snap.status_of(CellCoord::new(0, 0)), BurnStatus::Unburned);
    }

    #[test]
    fn out_of_extent_ignitions_are_ignored() {
        let mut state = FireState::new(GridExtent::new(3, 3), 3);
        state.advance_frontier(&coords(&[(9, 9), (1, 1)]));
        assert_eq!(state.status(CellCoord::new(1, 1)), BurnStatus::Igniting);
        assert_eq!(state.frontier_len(), 1);
    }
}
