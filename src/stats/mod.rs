//! Stats module - derived view computations

mod calculator;

pub use calculator::{
    ColumnPoint, ComparisonRow, DescriptiveStats, HeatmapTable, HistogramBin, PerCapitaRow,
    PieSlice, RaceTable, RankedRegion, StatsError, TrendPoint, VariationRow, ViewCalculator,
};
