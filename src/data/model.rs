//! Typed rows extracted from the loaded DataFrames.

use geo::MultiPolygon;

/// One consumption measurement: the (region, year) pair is a natural key.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionRecord {
    pub region: String,
    pub year: i32,
    pub consumption_gwh: f64,
    pub insee_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A region boundary from the shapefile, joined to consumption via INSEE code.
#[derive(Debug, Clone)]
pub struct RegionGeometry {
    pub insee_code: String,
    pub name: String,
    pub boundary: MultiPolygon<f64>,
}

/// Municipal population for one region, used for the per-capita view.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRecord {
    pub insee_code: String,
    pub population: u64,
}
