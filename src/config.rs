//! Dashboard Configuration
//! Input/output paths, optionally overridden by a JSON config file.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the optional config file looked up in the working directory.
pub const CONFIG_FILE: &str = "dashboard.json";

/// Paths to the three input files and the artifact output directory.
///
/// Defaults match the original dataset layout; every field can be
/// overridden from `dashboard.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Semicolon-delimited consumption CSV.
    pub consumption_csv: PathBuf,
    /// Region boundary shapefile (.shp, with its .dbf alongside).
    pub regions_shapefile: PathBuf,
    /// Semicolon-delimited population-by-region CSV.
    pub population_csv: PathBuf,
    /// Where generated PNG/GIF artifacts are written.
    pub output_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            consumption_csv: PathBuf::from("consommation-regionale-gnc.csv"),
            regions_shapefile: PathBuf::from("regions-20180101.shp"),
            population_csv: PathBuf::from("donnees_regions.csv"),
            output_dir: PathBuf::from("."),
        }
    }
}

impl DashboardConfig {
    /// Load the config file if present, fall back to defaults otherwise.
    /// A present-but-invalid file is not silently ignored: it comes back
    /// as a message the UI can show, so path typos stay diagnosable.
    pub fn load_or_default() -> (Self, Option<String>) {
        Self::load_from_or_default(Path::new(CONFIG_FILE))
    }

    pub fn load_from_or_default(path: &Path) -> (Self, Option<String>) {
        match Self::load_from(path) {
            Ok(config) => (config, None),
            Err(e) => (
                Self::default(),
                Some(format!("{} ignored: {}", path.display(), e)),
            ),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            log::info!("No {} found, using default paths", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Path of the generated bar-race GIF.
    pub fn race_gif_path(&self) -> PathBuf {
        self.output_dir.join("bcr_race.gif")
    }

    /// Path of a generated choropleth PNG.
    pub fn choropleth_path(&self, name: &str, year: i32) -> PathBuf {
        self.output_dir.join(format!("{}_{}.png", name, year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = DashboardConfig::load_from(Path::new("does_not_exist.json")).unwrap();
        assert_eq!(
            config.consumption_csv,
            PathBuf::from("consommation-regionale-gnc.csv")
        );
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, r#"{{"output_dir": "out"}}"#).unwrap();

        let config = DashboardConfig::load_from(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(
            config.population_csv,
            PathBuf::from("donnees_regions.csv")
        );
    }

    #[test]
    fn invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(DashboardConfig::load_from(&path).is_err());
    }

    #[test]
    fn broken_config_falls_back_with_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(&path, "not json").unwrap();

        let (config, warning) = DashboardConfig::load_from_or_default(&path);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(warning.unwrap().contains("ignored"));

        let (_, warning) =
            DashboardConfig::load_from_or_default(Path::new("does_not_exist.json"));
        assert!(warning.is_none());
    }

    #[test]
    fn artifact_paths_land_in_output_dir() {
        let config = DashboardConfig {
            output_dir: PathBuf::from("artifacts"),
            ..Default::default()
        };
        assert_eq!(config.race_gif_path(), PathBuf::from("artifacts/bcr_race.gif"));
        assert_eq!(
            config.choropleth_path("choropleth", 2015),
            PathBuf::from("artifacts/choropleth_2015.png")
        );
    }
}
