//! Data module - dataset loading and normalization

pub mod geometry;
pub mod loader;
mod model;
pub mod population;

pub use model::{ConsumptionRecord, PopulationRecord, RegionGeometry};
