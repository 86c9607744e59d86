//! View Calculator Module
//! Pure derivations over the loaded table: every function here maps
//! (table, filter parameters) to plain view data and is idempotent.

use crate::data::loader::{self, LoaderError};
use crate::data::population::{population_records, PopulationError};
use crate::data::ConsumptionRecord;
use polars::prelude::*;
use statrs::statistics::{Data, OrderStatistics};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Population(#[from] PopulationError),
}

/// Consumption of one region in the two selected years.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub region: String,
    pub first: Option<f64>,
    pub second: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub region: String,
    pub value: f64,
    /// Fraction of the year total, in [0, 1].
    pub share: f64,
}

/// Descriptive statistics of one year's consumption, pandas-describe style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedRegion {
    pub region: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariationRow {
    pub region: String,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Region × year matrix of consumption for the heatmap.
#[derive(Debug, Clone, Default)]
pub struct HeatmapTable {
    pub regions: Vec<String>,
    pub years: Vec<i32>,
    /// Row-major: `values[region_idx * years.len() + year_idx]`.
    pub values: Vec<Option<f64>>,
    pub min: f64,
    pub max: f64,
}

impl HeatmapTable {
    pub fn value(&self, region_idx: usize, year_idx: usize) -> Option<f64> {
        self.values
            .get(region_idx * self.years.len() + year_idx)
            .copied()
            .flatten()
    }
}

/// Year × region pivot feeding the bar-chart race.
#[derive(Debug, Clone, Default)]
pub struct RaceTable {
    pub years: Vec<i32>,
    pub regions: Vec<String>,
    /// Row-major: `values[year_idx * regions.len() + region_idx]`.
    pub values: Vec<Option<f64>>,
    pub max: f64,
}

impl RaceTable {
    pub fn value(&self, year_idx: usize, region_idx: usize) -> Option<f64> {
        self.values
            .get(year_idx * self.regions.len() + region_idx)
            .copied()
            .flatten()
    }

    /// Region values at a fractional position between two year rows,
    /// linearly interpolated. `t` is clamped to the table's year span.
    pub fn interpolated(&self, t: f64) -> Vec<(String, f64)> {
        if self.years.is_empty() {
            return Vec::new();
        }
        let t = t.clamp(0.0, (self.years.len() - 1) as f64);
        let lo = t.floor() as usize;
        let hi = (lo + 1).min(self.years.len() - 1);
        let frac = t - lo as f64;

        self.regions
            .iter()
            .enumerate()
            .filter_map(|(r, region)| {
                let a = self.value(lo, r)?;
                let b = self.value(hi, r)?;
                Some((region.clone(), a * (1.0 - frac) + b * frac))
            })
            .collect()
    }
}

/// Consumption joined to population for one region and year.
#[derive(Debug, Clone, PartialEq)]
pub struct PerCapitaRow {
    pub region: String,
    pub insee_code: String,
    pub consumption_gwh: f64,
    pub population: u64,
    /// kWh per inhabitant: `gwh / population * 1e6`.
    pub per_capita_kwh: f64,
}

/// One 3D map column, placed at the region centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPoint {
    pub region: String,
    pub longitude: f64,
    pub latitude: f64,
    pub value: f64,
}

/// Stateless calculator for every derived view.
pub struct ViewCalculator;

impl ViewCalculator {
    fn year_records(df: &DataFrame, year: i32) -> Result<Vec<ConsumptionRecord>, StatsError> {
        Ok(loader::records(&loader::filter_year(df, year)?)?)
    }

    fn year_map(df: &DataFrame, year: i32) -> Result<BTreeMap<String, f64>, StatsError> {
        Ok(Self::year_records(df, year)?
            .into_iter()
            .map(|r| (r.region, r.consumption_gwh))
            .collect())
    }

    /// Per-region consumption in each of the two selected years.
    pub fn comparison(
        df: &DataFrame,
        year_a: i32,
        year_b: i32,
    ) -> Result<Vec<ComparisonRow>, StatsError> {
        let first = Self::year_map(df, year_a)?;
        let second = Self::year_map(df, year_b)?;

        let mut regions: Vec<String> = first.keys().chain(second.keys()).cloned().collect();
        regions.sort();
        regions.dedup();

        Ok(regions
            .into_iter()
            .map(|region| ComparisonRow {
                first: first.get(&region).copied(),
                second: second.get(&region).copied(),
                region,
            })
            .collect())
    }

    /// (year, consumption) series of one region, ordered by year.
    pub fn trend(df: &DataFrame, region: &str) -> Result<Vec<TrendPoint>, StatsError> {
        let mut points: Vec<TrendPoint> = loader::records(&loader::filter_region(df, region)?)?
            .into_iter()
            .map(|r| TrendPoint {
                year: r.year,
                value: r.consumption_gwh,
            })
            .collect();
        points.sort_by_key(|p| p.year);
        Ok(points)
    }

    /// Per-region share of the selected year's total consumption.
    pub fn pie(df: &DataFrame, year: i32) -> Result<Vec<PieSlice>, StatsError> {
        let by_region = Self::year_map(df, year)?;
        let total: f64 = by_region.values().sum();
        if total <= 0.0 {
            return Ok(Vec::new());
        }
        Ok(by_region
            .into_iter()
            .map(|(region, value)| PieSlice {
                region,
                value,
                share: value / total,
            })
            .collect())
    }

    /// Descriptive statistics of one year; `None` when the year has no rows.
    pub fn describe(df: &DataFrame, year: i32) -> Result<Option<DescriptiveStats>, StatsError> {
        let values: Vec<f64> = Self::year_records(df, year)?
            .into_iter()
            .map(|r| r.consumption_gwh)
            .collect();
        let n = values.len();
        if n == 0 {
            return Ok(None);
        }

        let mean = values.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        } else {
            0.0
        };

        let mut data = Data::new(values);
        Ok(Some(DescriptiveStats {
            count: n,
            mean,
            std,
            min: data.percentile(0),
            q1: data.lower_quartile(),
            median: data.median(),
            q3: data.upper_quartile(),
            max: data.percentile(100),
        }))
    }

    /// `n` highest-consuming regions of a year, descending.
    pub fn top_regions(
        df: &DataFrame,
        year: i32,
        n: usize,
    ) -> Result<Vec<RankedRegion>, StatsError> {
        let mut ranked = Self::ranked(df, year)?;
        ranked.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(n);
        Ok(ranked)
    }

    /// `n` lowest-consuming regions of a year, ascending.
    pub fn bottom_regions(
        df: &DataFrame,
        year: i32,
        n: usize,
    ) -> Result<Vec<RankedRegion>, StatsError> {
        let mut ranked = Self::ranked(df, year)?;
        ranked.sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(n);
        Ok(ranked)
    }

    fn ranked(df: &DataFrame, year: i32) -> Result<Vec<RankedRegion>, StatsError> {
        Ok(Self::year_map(df, year)?
            .into_iter()
            .map(|(region, value)| RankedRegion { region, value })
            .collect())
    }

    /// Percent variation per region between two years:
    /// `(v_b - v_a) / v_a * 100`, exactly 0 when both years are the same
    /// row. Regions missing either year or with a zero base are omitted.
    pub fn variation(
        df: &DataFrame,
        year_a: i32,
        year_b: i32,
    ) -> Result<Vec<VariationRow>, StatsError> {
        let first = Self::year_map(df, year_a)?;
        let second = Self::year_map(df, year_b)?;

        Ok(first
            .into_iter()
            .filter_map(|(region, base)| {
                if base == 0.0 {
                    return None;
                }
                let target = *second.get(&region)?;
                Some(VariationRow {
                    region,
                    percent: (target - base) / base * 100.0,
                })
            })
            .collect())
    }

    /// Equal-width bins over one year's consumption values.
    pub fn histogram(
        df: &DataFrame,
        year: i32,
        max_bins: usize,
    ) -> Result<Vec<HistogramBin>, StatsError> {
        let values: Vec<f64> = Self::year_records(df, year)?
            .into_iter()
            .map(|r| r.consumption_gwh)
            .collect();
        if values.is_empty() || max_bins == 0 {
            return Ok(Vec::new());
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if min == max {
            return Ok(vec![HistogramBin {
                lower: min,
                upper: max,
                count: values.len(),
            }]);
        }

        let bins = max_bins.min(values.len());
        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for v in &values {
            let idx = (((v - min) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Ok(counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: min + i as f64 * width,
                upper: min + (i + 1) as f64 * width,
                count,
            })
            .collect())
    }

    /// Region × year consumption matrix over the whole table.
    pub fn heatmap(df: &DataFrame) -> Result<HeatmapTable, StatsError> {
        let records = loader::records(df)?;
        let mut regions: Vec<String> = records.iter().map(|r| r.region.clone()).collect();
        regions.sort();
        regions.dedup();
        let mut years: Vec<i32> = records.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();

        let mut values = vec![None; regions.len() * years.len()];
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for record in &records {
            let r = regions.binary_search(&record.region).unwrap_or(0);
            let y = years.binary_search(&record.year).unwrap_or(0);
            values[r * years.len() + y] = Some(record.consumption_gwh);
            min = min.min(record.consumption_gwh);
            max = max.max(record.consumption_gwh);
        }
        if records.is_empty() {
            min = 0.0;
            max = 0.0;
        }

        Ok(HeatmapTable {
            regions,
            years,
            values,
            min,
            max,
        })
    }

    /// Year × region pivot for the bar race.
    pub fn race_table(df: &DataFrame) -> Result<RaceTable, StatsError> {
        let heat = Self::heatmap(df)?;
        let mut values = vec![None; heat.regions.len() * heat.years.len()];
        for (r, _) in heat.regions.iter().enumerate() {
            for (y, _) in heat.years.iter().enumerate() {
                values[y * heat.regions.len() + r] = heat.value(r, y);
            }
        }
        Ok(RaceTable {
            years: heat.years,
            regions: heat.regions,
            values,
            max: heat.max,
        })
    }

    /// Consumption joined to population; regions without a population row
    /// are dropped, like a left join with missing keys filtered out.
    pub fn per_capita(
        df: &DataFrame,
        population: &DataFrame,
        year: i32,
    ) -> Result<Vec<PerCapitaRow>, StatsError> {
        let by_insee: BTreeMap<String, u64> = population_records(population)?
            .into_iter()
            .map(|p| (p.insee_code, p.population))
            .collect();

        Ok(Self::year_records(df, year)?
            .into_iter()
            .filter_map(|r| {
                let population = *by_insee.get(&r.insee_code)?;
                if population == 0 {
                    return None;
                }
                Some(PerCapitaRow {
                    per_capita_kwh: r.consumption_gwh / population as f64 * 1e6,
                    region: r.region,
                    insee_code: r.insee_code,
                    consumption_gwh: r.consumption_gwh,
                    population,
                })
            })
            .collect())
    }

    /// Centroid columns for the 3D map, one per region of the year.
    pub fn column_points(df: &DataFrame, year: i32) -> Result<Vec<ColumnPoint>, StatsError> {
        Ok(Self::year_records(df, year)?
            .into_iter()
            .map(|r| ColumnPoint {
                region: r.region,
                longitude: r.longitude,
                latitude: r.latitude,
                value: r.consumption_gwh,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{INSEE_COL, LAT_COL, LON_COL, REGION_COL, VALUE_COL, YEAR_COL};
    use crate::data::population::POPULATION_COL;

    fn table() -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                REGION_COL.into(),
                [
                    "Normandie",
                    "Normandie",
                    "Bretagne",
                    "Bretagne",
                    "Occitanie",
                ],
            ),
            Column::new(YEAR_COL.into(), [2015i32, 2016, 2015, 2016, 2015]),
            Column::new(VALUE_COL.into(), [40.0f64, 50.0, 10.0, 8.0, 25.0]),
            Column::new(INSEE_COL.into(), ["28", "28", "53", "53", "76"]),
            Column::new(LAT_COL.into(), [49.18f64, 49.18, 48.2, 48.2, 43.6]),
            Column::new(LON_COL.into(), [0.37f64, 0.37, -2.9, -2.9, 2.1]),
        ])
        .unwrap()
    }

    #[test]
    fn variation_matches_the_formula() {
        let df = table();
        let rows = ViewCalculator::variation(&df, 2015, 2016).unwrap();

        let normandie = rows.iter().find(|r| r.region == "Normandie").unwrap();
        assert!((normandie.percent - 25.0).abs() < 1e-9);
        let bretagne = rows.iter().find(|r| r.region == "Bretagne").unwrap();
        assert!((bretagne.percent - -20.0).abs() < 1e-9);
        // Occitanie has no 2016 row and is omitted.
        assert!(!rows.iter().any(|r| r.region == "Occitanie"));
    }

    #[test]
    fn variation_is_zero_for_identical_years() {
        let df = table();
        for row in ViewCalculator::variation(&df, 2015, 2015).unwrap() {
            assert_eq!(row.percent, 0.0);
        }
    }

    #[test]
    fn comparison_carries_missing_years_as_none() {
        let df = table();
        let rows = ViewCalculator::comparison(&df, 2015, 2016).unwrap();
        assert_eq!(rows.len(), 3);

        let occitanie = rows.iter().find(|r| r.region == "Occitanie").unwrap();
        assert_eq!(occitanie.first, Some(25.0));
        assert_eq!(occitanie.second, None);
    }

    #[test]
    fn trend_is_ordered_by_year() {
        let df = table();
        let points = ViewCalculator::trend(&df, "Normandie").unwrap();
        assert_eq!(
            points,
            vec![
                TrendPoint {
                    year: 2015,
                    value: 40.0
                },
                TrendPoint {
                    year: 2016,
                    value: 50.0
                },
            ]
        );

        assert!(ViewCalculator::trend(&df, "Corse").unwrap().is_empty());
    }

    #[test]
    fn pie_shares_sum_to_one() {
        let df = table();
        let slices = ViewCalculator::pie(&df, 2015).unwrap();
        let total: f64 = slices.iter().map(|s| s.share).sum();
        assert!((total - 1.0).abs() < 1e-9);

        let normandie = slices.iter().find(|s| s.region == "Normandie").unwrap();
        assert!((normandie.share - 40.0 / 75.0).abs() < 1e-9);
    }

    #[test]
    fn describe_matches_hand_computed_values() {
        let df = table();
        let stats = ViewCalculator::describe(&df, 2015).unwrap().unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 25.0).abs() < 1e-9);
        assert!((stats.median - 25.0).abs() < 1e-9);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 40.0);
        // sample std of {40, 10, 25}
        assert!((stats.std - 15.0).abs() < 1e-9);

        assert!(ViewCalculator::describe(&df, 1999).unwrap().is_none());
    }

    #[test]
    fn rankings_are_order_correct() {
        let df = table();
        let top = ViewCalculator::top_regions(&df, 2015, 2).unwrap();
        assert_eq!(top[0].region, "Normandie");
        assert_eq!(top[1].region, "Occitanie");

        let bottom = ViewCalculator::bottom_regions(&df, 2015, 2).unwrap();
        assert_eq!(bottom[0].region, "Bretagne");
        assert_eq!(bottom[1].region, "Occitanie");
    }

    #[test]
    fn histogram_counts_sum_to_row_count() {
        let df = table();
        let bins = ViewCalculator::histogram(&df, 2015, 30).unwrap();
        let total: usize = bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 3);
        assert!(bins.first().unwrap().lower <= 10.0);
        assert!(bins.last().unwrap().upper >= 40.0);

        assert!(ViewCalculator::histogram(&df, 1999, 30).unwrap().is_empty());
    }

    #[test]
    fn heatmap_has_region_by_year_shape() {
        let df = table();
        let heat = ViewCalculator::heatmap(&df).unwrap();
        assert_eq!(heat.regions.len(), 3);
        assert_eq!(heat.years, vec![2015, 2016]);
        assert_eq!(heat.value(0, 0), Some(10.0)); // Bretagne 2015
        let occitanie_idx = heat.regions.iter().position(|r| r == "Occitanie").unwrap();
        assert_eq!(heat.value(occitanie_idx, 1), None);
        assert_eq!(heat.min, 8.0);
        assert_eq!(heat.max, 50.0);
    }

    #[test]
    fn race_interpolation_endpoints_equal_year_values() {
        let df = table();
        let race = ViewCalculator::race_table(&df).unwrap();

        let at_2015 = race.interpolated(0.0);
        let normandie = at_2015.iter().find(|(r, _)| r == "Normandie").unwrap();
        assert_eq!(normandie.1, 40.0);

        let halfway = race.interpolated(0.5);
        let normandie = halfway.iter().find(|(r, _)| r == "Normandie").unwrap();
        assert!((normandie.1 - 45.0).abs() < 1e-9);

        let at_2016 = race.interpolated(1.0);
        let normandie = at_2016.iter().find(|(r, _)| r == "Normandie").unwrap();
        assert_eq!(normandie.1, 50.0);
    }

    #[test]
    fn per_capita_math_scales_to_kwh() {
        let df = table();
        let population = DataFrame::new(vec![
            Column::new(INSEE_COL.into(), ["28", "53"]),
            Column::new(POPULATION_COL.into(), [2_000_000u64, 3_300_000]),
        ])
        .unwrap();

        let rows = ViewCalculator::per_capita(&df, &population, 2015).unwrap();
        let normandie = rows.iter().find(|r| r.region == "Normandie").unwrap();
        assert!((normandie.per_capita_kwh - 40.0 / 2_000_000.0 * 1e6).abs() < 1e-9);
        // Occitanie has no population row and is dropped.
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn column_points_carry_centroids() {
        let df = table();
        let points = ViewCalculator::column_points(&df, 2015).unwrap();
        assert_eq!(points.len(), 3);
        let normandie = points.iter().find(|p| p.region == "Normandie").unwrap();
        assert_eq!((normandie.longitude, normandie.latitude), (0.37, 49.18));
    }
}
