//! Region Boundary Loader
//! Reads the region polygons from the shapefile set (.shp + .dbf) and
//! converts them to `geo` multipolygons keyed by INSEE code.

use crate::data::RegionGeometry;
use geo::BoundingRect;
use geo::MultiPolygon;
use shapefile::dbase::FieldValue;
use std::path::Path;
use thiserror::Error;

/// Regions excluded from metropolitan map renders.
pub const OVERSEAS_REGIONS: [&str; 5] = [
    "Guadeloupe",
    "Martinique",
    "Guyane",
    "La Réunion",
    "Mayotte",
];

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("Failed to read shapefile: {0}")]
    Shapefile(#[from] shapefile::Error),
    #[error("Record {0} is missing the '{1}' attribute")]
    MissingAttribute(usize, &'static str),
}

/// Load every region polygon with its INSEE code and name.
pub fn load_regions(path: &Path) -> Result<Vec<RegionGeometry>, GeometryError> {
    let shapes = shapefile::read_as::<_, shapefile::Polygon, shapefile::dbase::Record>(path)?;

    let mut regions = Vec::with_capacity(shapes.len());
    for (i, (polygon, record)) in shapes.into_iter().enumerate() {
        let insee_code = attribute_string(&record, "code_insee")
            .map(|code| normalize_insee(&code))
            .ok_or(GeometryError::MissingAttribute(i, "code_insee"))?;
        let name =
            attribute_string(&record, "nom").ok_or(GeometryError::MissingAttribute(i, "nom"))?;
        let boundary: MultiPolygon<f64> = polygon.into();
        regions.push(RegionGeometry {
            insee_code,
            name,
            boundary,
        });
    }

    log::info!("Loaded {} region boundaries from shapefile", regions.len());
    Ok(regions)
}

/// DBF attributes come back as text or numbers depending on how the file
/// was authored; INSEE codes in particular show up both ways.
fn attribute_string(record: &shapefile::dbase::Record, name: &str) -> Option<String> {
    match record.get(name)? {
        FieldValue::Character(Some(s)) => Some(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) => Some(format!("{}", *n as i64)),
        FieldValue::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

/// INSEE codes appear both zero-padded ("01") and bare ("1") depending on
/// the source; unpad numeric codes so joins against the CSV side line up.
fn normalize_insee(code: &str) -> String {
    match code.parse::<i64>() {
        Ok(n) => n.to_string(),
        Err(_) => code.to_string(),
    }
}

pub fn is_overseas(name: &str) -> bool {
    OVERSEAS_REGIONS.contains(&name)
}

/// Lon/lat bounding box over a set of regions, as ((min_lon, max_lon),
/// (min_lat, max_lat)).
pub fn bounding_box<'a, I>(regions: I) -> Option<((f64, f64), (f64, f64))>
where
    I: IntoIterator<Item = &'a RegionGeometry>,
{
    let mut bounds: Option<((f64, f64), (f64, f64))> = None;
    for region in regions {
        let rect = region.boundary.bounding_rect()?;
        bounds = Some(match bounds {
            None => (
                (rect.min().x, rect.max().x),
                (rect.min().y, rect.max().y),
            ),
            Some(((lon_min, lon_max), (lat_min, lat_max))) => (
                (lon_min.min(rect.min().x), lon_max.max(rect.max().x)),
                (lat_min.min(rect.min().y), lat_max.max(rect.max().y)),
            ),
        });
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn region(insee: &str, name: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> RegionGeometry {
        let boundary = MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
        ]]);
        RegionGeometry {
            insee_code: insee.to_string(),
            name: name.to_string(),
            boundary,
        }
    }

    #[test]
    fn overseas_regions_are_flagged() {
        assert!(is_overseas("Guadeloupe"));
        assert!(is_overseas("La Réunion"));
        assert!(!is_overseas("Normandie"));
    }

    #[test]
    fn bounding_box_covers_all_regions() {
        let regions = vec![
            region("11", "Île-de-France", 1.4, 48.1, 3.6, 49.2),
            region("28", "Normandie", -1.9, 48.2, 1.8, 50.1),
        ];
        let ((lon_min, lon_max), (lat_min, lat_max)) = bounding_box(&regions).unwrap();
        assert_eq!(lon_min, -1.9);
        assert_eq!(lon_max, 3.6);
        assert_eq!(lat_min, 48.1);
        assert_eq!(lat_max, 50.1);
    }

    #[test]
    fn bounding_box_of_nothing_is_none() {
        assert!(bounding_box([].iter()).is_none());
    }

    #[test]
    fn zero_padded_insee_codes_are_unpadded() {
        assert_eq!(normalize_insee("01"), "1");
        assert_eq!(normalize_insee("001"), "1");
        assert_eq!(normalize_insee("11"), "11");
        assert_eq!(normalize_insee("2A"), "2A");
    }

    #[test]
    fn numeric_and_text_insee_attributes_read_the_same() {
        let mut record = shapefile::dbase::Record::default();
        record.insert(
            "code_insee".to_string(),
            FieldValue::Character(Some("11".to_string())),
        );
        record.insert("nom".to_string(), FieldValue::Numeric(Some(28.0)));
        assert_eq!(attribute_string(&record, "code_insee").unwrap(), "11");
        assert_eq!(attribute_string(&record, "nom").unwrap(), "28");
        assert!(attribute_string(&record, "absent").is_none());
    }
}
