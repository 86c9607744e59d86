//! Population CSV Loader
//! Municipal population by region, used for the per-capita view. The raw
//! file carries INSEE's column names (CODREG, PMUN); the loader normalizes
//! them to match the consumption table's join key.

use crate::data::loader::INSEE_COL;
use crate::data::PopulationRecord;
use polars::prelude::*;
use std::path::Path;
use thiserror::Error;

pub const RAW_CODE_COL: &str = "CODREG";
pub const RAW_COUNT_COL: &str = "PMUN";
pub const POPULATION_COL: &str = "population";

#[derive(Error, Debug)]
pub enum PopulationError {
    #[error("Failed to load population CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Missing required column '{0}'")]
    MissingColumn(String),
}

/// Load the population table as `{code_insee_region, population}`.
pub fn load_population(path: &Path) -> Result<DataFrame, PopulationError> {
    let raw = LazyCsvReader::new(path)
        .with_separator(b';')
        .with_infer_schema_length(Some(1_000))
        .finish()?
        .collect()?;

    for required in [RAW_CODE_COL, RAW_COUNT_COL] {
        if raw.column(required).is_err() {
            return Err(PopulationError::MissingColumn(required.to_string()));
        }
    }

    let df = raw
        .lazy()
        .select([
            col(RAW_CODE_COL).cast(DataType::String).alias(INSEE_COL),
            col(RAW_COUNT_COL)
                .strict_cast(DataType::UInt64)
                .alias(POPULATION_COL),
        ])
        .collect()?;

    log::info!("Loaded population for {} regions", df.height());
    Ok(df)
}

/// Materialize typed population rows.
pub fn population_records(df: &DataFrame) -> Result<Vec<PopulationRecord>, PopulationError> {
    let code = df.column(INSEE_COL)?.str()?;
    let count = df.column(POPULATION_COL)?.u64()?;

    let mut out = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        if let (Some(insee_code), Some(population)) = (code.get(i), count.get(i)) {
            out.push(PopulationRecord {
                insee_code: insee_code.to_string(),
                population,
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_normalizes_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "CODREG;REGION;PMUN").unwrap();
        writeln!(f, "11;Île-de-France;12271794").unwrap();
        writeln!(f, "28;Normandie;3327477").unwrap();

        let df = load_population(&path).unwrap();
        let rows = population_records(&df).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            PopulationRecord {
                insee_code: "11".to_string(),
                population: 12_271_794,
            }
        );
    }

    #[test]
    fn missing_count_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pop.csv");
        std::fs::write(&path, "CODREG;REGION\n11;Île-de-France\n").unwrap();

        assert!(matches!(
            load_population(&path),
            Err(PopulationError::MissingColumn(c)) if c == RAW_COUNT_COL
        ));
    }
}
