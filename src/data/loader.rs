//! Consumption CSV Loader
//! Parses the semicolon-delimited regional CNG dataset with Polars and
//! repairs the two packed columns the export ships with: the first column
//! holds `index,"year"` and `centroid` holds `latitude,"longitude"`.

use crate::data::ConsumptionRecord;
use once_cell::sync::OnceCell;
use polars::prelude::*;
use std::path::Path;
use thiserror::Error;

pub const REGION_COL: &str = "region";
pub const YEAR_COL: &str = "annee";
pub const VALUE_COL: &str = "consommation_gwh_pcs";
pub const INSEE_COL: &str = "code_insee_region";
pub const CENTROID_COL: &str = "centroid";
pub const LAT_COL: &str = "latitude";
pub const LON_COL: &str = "longitude";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("CSV has no columns")]
    EmptyTable,
    #[error("Missing required column '{0}'")]
    MissingColumn(String),
    #[error("{count} malformed row(s) in column '{column}'")]
    MalformedRows { column: String, count: usize },
    #[error("{0} duplicate (region, year) pair(s)")]
    DuplicateKeys(usize),
    #[error("Non-finite coordinate in column '{0}'")]
    NonFiniteCoordinate(String),
}

/// Load and normalize the consumption CSV.
///
/// Malformed rows (missing comma, non-numeric year or coordinate) fail the
/// whole load: this is a data-quality gate, not a silent-skip filter.
pub fn load_consumption(path: &Path) -> Result<DataFrame, LoaderError> {
    let raw = LazyCsvReader::new(path)
        .with_separator(b';')
        .with_infer_schema_length(Some(10_000))
        .finish()?
        .collect()?;

    normalize(raw)
}

/// Process-wide memoized loader. The source file is static, so the result
/// is keyed on nothing and parsed at most once per session.
pub fn cached_consumption(path: &Path) -> Result<&'static DataFrame, LoaderError> {
    static CONSUMPTION: OnceCell<DataFrame> = OnceCell::new();
    CONSUMPTION.get_or_try_init(|| load_consumption(path))
}

/// Split the packed columns, type them, and validate the result.
fn normalize(raw: DataFrame) -> Result<DataFrame, LoaderError> {
    let packed = raw
        .get_column_names()
        .first()
        .map(|s| s.to_string())
        .ok_or(LoaderError::EmptyTable)?;

    for required in [REGION_COL, VALUE_COL, INSEE_COL, CENTROID_COL] {
        if raw.column(required).is_err() {
            return Err(LoaderError::MissingColumn(required.to_string()));
        }
    }

    // Split on the first comma only; the year sub-field keeps its quote
    // wrapping until stripped. strict_cast turns any non-numeric leftover
    // into a load failure instead of a null.
    let df = raw
        .lazy()
        .with_columns([
            col(&packed)
                .str()
                .splitn(lit(","), 2)
                .struct_()
                .field_by_index(1)
                .str()
                .replace_all(lit("\""), lit(""), true)
                .strict_cast(DataType::Int32)
                .alias(YEAR_COL),
            col(CENTROID_COL)
                .str()
                .splitn(lit(","), 2)
                .struct_()
                .field_by_index(0)
                .strict_cast(DataType::Float64)
                .alias(LAT_COL),
            col(CENTROID_COL)
                .str()
                .splitn(lit(","), 2)
                .struct_()
                .field_by_index(1)
                .str()
                .replace_all(lit("\""), lit(""), true)
                .strict_cast(DataType::Float64)
                .alias(LON_COL),
            col(VALUE_COL).strict_cast(DataType::Float64),
            col(INSEE_COL).cast(DataType::String),
        ])
        .collect()?;

    let df = df.drop_many([packed, CENTROID_COL.to_string()]);

    // A row whose packed field had no comma yields a null sub-field, which
    // strict_cast lets through; catch those here.
    for column in [YEAR_COL, LAT_COL, LON_COL, VALUE_COL] {
        let nulls = df
            .column(column)
            .map_err(|_| LoaderError::MissingColumn(column.to_string()))?
            .null_count();
        if nulls > 0 {
            return Err(LoaderError::MalformedRows {
                column: column.to_string(),
                count: nulls,
            });
        }
    }

    for column in [LAT_COL, LON_COL] {
        let ca = df.column(column)?.f64()?;
        if ca.into_iter().flatten().any(|v| !v.is_finite()) {
            return Err(LoaderError::NonFiniteCoordinate(column.to_string()));
        }
    }

    validate_unique_keys(&df)?;

    log::info!(
        "Loaded {} consumption rows across {} columns",
        df.height(),
        df.width()
    );
    Ok(df)
}

/// (region, year) is the natural key; duplicates mean a broken export.
fn validate_unique_keys(df: &DataFrame) -> Result<(), LoaderError> {
    let dupes = df
        .clone()
        .lazy()
        .group_by([col(REGION_COL), col(YEAR_COL)])
        .agg([len().alias("n")])
        .filter(col("n").gt(lit(1u32)))
        .collect()?;

    if dupes.height() > 0 {
        return Err(LoaderError::DuplicateKeys(dupes.height()));
    }
    Ok(())
}

/// Min/max year present in the data; bounds for the sidebar sliders.
pub fn year_bounds(df: &DataFrame) -> Option<(i32, i32)> {
    let years = df.column(YEAR_COL).ok()?.i32().ok()?;
    Some((years.min()?, years.max()?))
}

/// Distinct region names, sorted; values for the sidebar dropdown.
pub fn region_names(df: &DataFrame) -> Vec<String> {
    let mut names: Vec<String> = df
        .column(REGION_COL)
        .ok()
        .and_then(|col| col.unique().ok())
        .and_then(|unique| {
            unique
                .str()
                .ok()
                .map(|ca| ca.into_iter().flatten().map(str::to_string).collect())
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Rows of a single year. An absent year yields an empty frame, not an error.
pub fn filter_year(df: &DataFrame, year: i32) -> Result<DataFrame, LoaderError> {
    Ok(df
        .clone()
        .lazy()
        .filter(col(YEAR_COL).eq(lit(year)))
        .collect()?)
}

/// Rows of a single region.
pub fn filter_region(df: &DataFrame, region: &str) -> Result<DataFrame, LoaderError> {
    Ok(df
        .clone()
        .lazy()
        .filter(col(REGION_COL).eq(lit(region)))
        .collect()?)
}

/// Materialize typed records from the normalized frame.
pub fn records(df: &DataFrame) -> Result<Vec<ConsumptionRecord>, LoaderError> {
    let region = df.column(REGION_COL)?.str()?;
    let year = df.column(YEAR_COL)?.i32()?;
    let value = df.column(VALUE_COL)?.f64()?;
    let insee = df.column(INSEE_COL)?.str()?;
    let lat = df.column(LAT_COL)?.f64()?;
    let lon = df.column(LON_COL)?.f64()?;

    let mut out = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let row = (|| {
            Some(ConsumptionRecord {
                region: region.get(i)?.to_string(),
                year: year.get(i)?,
                consumption_gwh: value.get(i)?,
                insee_code: insee.get(i)?.to_string(),
                latitude: lat.get(i)?,
                longitude: lon.get(i)?,
            })
        })();
        out.push(row.ok_or_else(|| LoaderError::MalformedRows {
            column: "row".to_string(),
            count: 1,
        })?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_csv(rows: &[&str]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conso.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "packed;region;consommation_gwh_pcs;code_insee_region;centroid").unwrap();
        for row in rows {
            writeln!(f, "{}", row).unwrap();
        }
        (dir, path)
    }

    fn sample() -> (tempfile::TempDir, PathBuf) {
        write_csv(&[
            r#""0,""2015""";Île-de-France;100.5;11;"48.85,""2.35""""#,
            r#""1,""2016""";Île-de-France;120.0;11;"48.85,""2.35""""#,
            r#""2,""2015""";Normandie;40.0;28;"49.18,""0.37""""#,
            r#""3,""2016""";Normandie;35.5;28;"49.18,""0.37""""#,
        ])
    }

    #[test]
    fn packed_columns_unpack() {
        let (_dir, path) = sample();
        let df = load_consumption(&path).unwrap();

        let rows = records(&df).unwrap();
        let idf = rows
            .iter()
            .find(|r| r.region == "Île-de-France" && r.year == 2015)
            .unwrap();
        assert_eq!(idf.year, 2015);
        assert!((idf.latitude - 48.85).abs() < 1e-9);
        assert!((idf.longitude - 2.35).abs() < 1e-9);
        assert!((idf.consumption_gwh - 100.5).abs() < 1e-9);
        assert_eq!(idf.insee_code, "11");
    }

    #[test]
    fn packed_columns_are_dropped() {
        let (_dir, path) = sample();
        let df = load_consumption(&path).unwrap();

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(!names.contains(&"packed".to_string()));
        assert!(!names.contains(&CENTROID_COL.to_string()));
        assert!(names.contains(&LAT_COL.to_string()));
        assert!(names.contains(&LON_COL.to_string()));
        assert!(names.contains(&YEAR_COL.to_string()));
    }

    #[test]
    fn years_are_within_bounds_and_coordinates_finite() {
        let (_dir, path) = sample();
        let df = load_consumption(&path).unwrap();

        let (min, max) = year_bounds(&df).unwrap();
        assert_eq!((min, max), (2015, 2016));
        for record in records(&df).unwrap() {
            assert!(record.year >= min && record.year <= max);
            assert!(record.latitude.is_finite());
            assert!(record.longitude.is_finite());
        }
    }

    #[test]
    fn duplicate_region_year_pair_is_rejected() {
        let (_dir, path) = write_csv(&[
            r#""0,""2015""";Normandie;40.0;28;"49.18,""0.37""""#,
            r#""1,""2015""";Normandie;41.0;28;"49.18,""0.37""""#,
        ]);
        match load_consumption(&path) {
            Err(LoaderError::DuplicateKeys(n)) => assert_eq!(n, 1),
            other => panic!("expected DuplicateKeys, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn missing_comma_in_packed_column_is_rejected() {
        let (_dir, path) = write_csv(&[r#"02015;Normandie;40.0;28;"49.18,""0.37""""#]);
        assert!(matches!(
            load_consumption(&path),
            Err(LoaderError::MalformedRows { .. })
        ));
    }

    #[test]
    fn non_numeric_year_is_rejected() {
        let (_dir, path) = write_csv(&[r#""0,""20x5""";Normandie;40.0;28;"49.18,""0.37""""#]);
        assert!(load_consumption(&path).is_err());
    }

    #[test]
    fn year_filter_returns_only_that_year() {
        let (_dir, path) = sample();
        let df = load_consumption(&path).unwrap();

        let only_2015 = filter_year(&df, 2015).unwrap();
        assert_eq!(only_2015.height(), 2);
        for record in records(&only_2015).unwrap() {
            assert_eq!(record.year, 2015);
        }

        // A year with no rows renders empty downstream, no error.
        assert_eq!(filter_year(&df, 1999).unwrap().height(), 0);
    }

    #[test]
    fn region_filter_returns_only_that_region() {
        let (_dir, path) = sample();
        let df = load_consumption(&path).unwrap();

        let normandie = filter_region(&df, "Normandie").unwrap();
        assert_eq!(normandie.height(), 2);
        for record in records(&normandie).unwrap() {
            assert_eq!(record.region, "Normandie");
        }
    }

    #[test]
    fn region_names_are_sorted_and_distinct() {
        let (_dir, path) = sample();
        let df = load_consumption(&path).unwrap();
        assert_eq!(region_names(&df), vec!["Normandie", "Île-de-France"]);
    }

    #[test]
    fn cache_returns_the_same_table() {
        let (_dir, path) = sample();
        let first = cached_consumption(&path).unwrap();
        let second = cached_consumption(&path).unwrap();
        assert!(std::ptr::eq(first, second));
    }
}
