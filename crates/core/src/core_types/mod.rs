//! Core types shared across the simulation

pub mod spatial;

pub use spatial::{bearing_unit_vector, CellCoord, GridExtent, NEIGHBOR_OFFSETS};
