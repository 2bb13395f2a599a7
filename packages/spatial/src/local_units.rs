//! Municipal local units (`GaPa_NaPa`) with area and population density.
//!
//! Population figures are static census values for the municipalities of
//! Kathmandu district. Units missing from the table still report an area.

use geo::MultiPolygon;
use safety_map_poi_models::Coordinates;
use serde::Serialize;

use crate::{SpatialError, area_sq_km, feature_to_multipolygon, parse_features, within_polygon};

/// Property holding the local unit's name.
pub const NAME_PROPERTY: &str = "GaPa_NaPa";

/// Census population per local unit.
pub const POPULATION: &[(&str, u64)] = &[
    ("Budhanilakantha", 177_557),
    ("Chandragiri", 136_928),
    ("Dakshinkali", 24_056),
    ("Gokarneshwor", 151_200),
    ("Kageshwori Manahora", 133_327),
    ("Kathmandu", 845_767),
    ("Kirtipur", 81_782),
    ("Nagarjun", 115_507),
    ("Shankharapur", 78_325),
    ("Tarakeshwor", 151_508),
    ("Tokha", 135_741),
];

/// Looks up a unit's population by exact name.
#[must_use]
pub fn population(name: &str) -> Option<u64> {
    POPULATION
        .iter()
        .find(|(unit, _)| *unit == name)
        .map(|(_, population)| *population)
}

/// One local unit polygon.
#[derive(Debug, Clone)]
pub struct LocalUnit {
    /// Unit name (`GaPa_NaPa`).
    pub name: String,
    /// Unit geometry.
    pub polygon: MultiPolygon<f64>,
    /// Spherical area in square kilometers.
    pub area_sq_km: f64,
}

/// Area and density figures for a local unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalUnitStats {
    /// Unit name.
    pub name: String,
    /// Area in square kilometers.
    pub area_sq_km: f64,
    /// Population, if the unit is in [`POPULATION`].
    pub population: Option<u64>,
    /// People per square kilometer, when population is known.
    pub density_per_sq_km: Option<f64>,
}

impl LocalUnit {
    /// Computes area and density for this unit.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> LocalUnitStats {
        let population = population(&self.name);
        let density_per_sq_km = population
            .filter(|_| self.area_sq_km > 0.0)
            .map(|p| p as f64 / self.area_sq_km);
        LocalUnitStats {
            name: self.name.clone(),
            area_sq_km: self.area_sq_km,
            population,
            density_per_sq_km,
        }
    }
}

/// All local units from a boundary document.
#[derive(Debug, Clone, Default)]
pub struct LocalUnits {
    units: Vec<LocalUnit>,
}

impl LocalUnits {
    /// Loads every polygon feature from a `GeoJSON` document.
    ///
    /// Features without a name or polygon geometry are skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the document is invalid or contains no
    /// usable unit.
    pub fn from_geojson_str(text: &str) -> Result<Self, SpatialError> {
        let mut units = Vec::new();

        for feature in parse_features(text)? {
            let Some(name) = feature
                .property(NAME_PROPERTY)
                .and_then(|value| value.as_str())
                .map(String::from)
            else {
                log::warn!("Skipping local unit without {NAME_PROPERTY}");
                continue;
            };

            let polygon = match feature_to_multipolygon(&feature) {
                Ok(polygon) => polygon,
                Err(e) => {
                    log::warn!("Skipping local unit {name}: {e}");
                    continue;
                }
            };

            let area_sq_km = area_sq_km(&polygon);
            units.push(LocalUnit {
                name,
                polygon,
                area_sq_km,
            });
        }

        if units.is_empty() {
            return Err(SpatialError::NoFeatures);
        }

        log::info!("Loaded {} local units", units.len());
        Ok(Self { units })
    }

    /// All loaded units.
    #[must_use]
    pub fn units(&self) -> &[LocalUnit] {
        &self.units
    }

    /// The unit containing `at`, first match wins.
    #[must_use]
    pub fn unit_at(&self, at: Coordinates) -> Option<&LocalUnit> {
        self.units
            .iter()
            .find(|unit| within_polygon(at, &unit.polygon))
    }

    /// Finds a unit by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&LocalUnit> {
        self.units.iter().find(|unit| unit.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNITS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"GaPa_NaPa": "Kirtipur"},
                "geometry": {"type": "Polygon", "coordinates": [[[85.25, 27.65], [85.30, 27.65], [85.30, 27.70], [85.25, 27.70], [85.25, 27.65]]]}
            },
            {
                "type": "Feature",
                "properties": {"GaPa_NaPa": "Nowhere"},
                "geometry": {"type": "Polygon", "coordinates": [[[85.30, 27.65], [85.35, 27.65], [85.35, 27.70], [85.30, 27.70], [85.30, 27.65]]]}
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": {"type": "Polygon", "coordinates": [[[85.0, 27.0], [85.1, 27.0], [85.1, 27.1], [85.0, 27.0]]]}
            }
        ]
    }"#;

    #[test]
    fn population_lookup() {
        assert_eq!(population("Kathmandu"), Some(845_767));
        assert_eq!(population("kathmandu"), None);
    }

    #[test]
    fn loads_named_units_only() {
        let units = LocalUnits::from_geojson_str(UNITS).unwrap();
        assert_eq!(units.units().len(), 2);
    }

    #[test]
    fn stats_include_density_when_population_known() {
        let units = LocalUnits::from_geojson_str(UNITS).unwrap();
        let stats = units
            .unit_at(Coordinates::new(27.67, 85.27))
            .unwrap()
            .stats();
        assert_eq!(stats.name, "Kirtipur");
        assert_eq!(stats.population, Some(81_782));
        let density = stats.density_per_sq_km.unwrap();
        assert!((density - 81_782.0 / stats.area_sq_km).abs() < 1e-6);
    }

    #[test]
    fn stats_without_population() {
        let units = LocalUnits::from_geojson_str(UNITS).unwrap();
        let stats = units.by_name("Nowhere").unwrap().stats();
        assert!(stats.area_sq_km > 0.0);
        assert!(stats.population.is_none());
        assert!(stats.density_per_sq_km.is_none());
    }

    #[test]
    fn point_outside_all_units() {
        let units = LocalUnits::from_geojson_str(UNITS).unwrap();
        assert!(units.unit_at(Coordinates::new(26.0, 84.0)).is_none());
    }
}
