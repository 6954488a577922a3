use chrono::{DateTime, Utc};
use geo::{ChamberlainDuquetteArea, Intersects, LineString, MultiPolygon, Polygon};
use plotmap_shared::{Bounds, Feature, Geometry, Ring};
use serde::{Deserialize, Deserializer};

use crate::error::{ApiError, FieldErrors};
use crate::state::{PlotRegistry, MAX_NAME_CHARS};

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";

/// Body of create and update requests. The outer `Option` is whether the
/// key was sent at all, so `"name": null` is told apart from no `name`.
#[derive(Debug, Default, Deserialize)]
pub struct PlotInput {
    #[serde(default, deserialize_with = "present")]
    pub geometry: Option<Option<Geometry>>,
    #[serde(default)]
    pub properties: PropertiesInput,
}

#[derive(Debug, Default, Deserialize)]
pub struct PropertiesInput {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<Feature> for PlotInput {
    fn from(feature: Feature) -> Self {
        Self {
            geometry: feature.geometry.map(Some),
            properties: PropertiesInput {
                name: feature.properties.name.map(Some),
            },
        }
    }
}

pub fn create_plot(
    registry: &mut PlotRegistry,
    input: PlotInput,
    now: DateTime<Utc>,
) -> Result<Feature, ApiError> {
    let mut errors = FieldErrors::new();
    let name = collect(&mut errors, "name", sanitize_name(input.properties.name));
    let geometry = collect(&mut errors, "geometry", sanitize_geometry(input.geometry));
    let (Some(name), Some(geometry)) = (name, geometry) else {
        return Err(ApiError::Validation(errors));
    };
    if let Some(existing) = find_overlap(registry, &geometry, None) {
        return Err(ApiError::field("geometry", overlap_message(existing)));
    }
    let area = geometry_area(&geometry);
    Ok(registry.insert(name, geometry, area, now).to_feature())
}

/// `partial` is PATCH: absent fields keep their current value.
pub fn update_plot(
    registry: &mut PlotRegistry,
    id: u64,
    input: PlotInput,
    partial: bool,
) -> Result<Feature, ApiError> {
    if registry.get(id).is_none() {
        return Err(ApiError::NotFound);
    }
    let mut errors = FieldErrors::new();
    let name = match input.properties.name {
        None if partial => None,
        name => collect(&mut errors, "name", sanitize_name(name)),
    };
    let geometry = match input.geometry {
        None if partial => None,
        geometry => collect(&mut errors, "geometry", sanitize_geometry(geometry)),
    };
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    if let Some(geometry) = &geometry {
        if let Some(existing) = find_overlap(registry, geometry, Some(id)) {
            return Err(ApiError::field("geometry", overlap_message(existing)));
        }
    }

    let plot = registry.get_mut(id).ok_or(ApiError::NotFound)?;
    if let Some(name) = name {
        plot.name = name;
    }
    if let Some(geometry) = geometry {
        plot.area = geometry_area(&geometry);
        plot.geometry = geometry;
    }
    let feature = plot.to_feature();
    registry.dirty = true;
    Ok(feature)
}

pub fn parse_bbox(value: &str) -> Result<Bounds, ApiError> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>();
    match parts.as_deref() {
        Ok([west, south, east, north])
            if [*west, *south, *east, *north].iter().all(|v| v.is_finite())
                && west <= east
                && south <= north =>
        {
            Ok(Bounds::new(*west, *south, *east, *north))
        }
        _ => Err(ApiError::field(
            "in_bbox",
            "Expected four comma-separated numbers: minLng,minLat,maxLng,maxLat.",
        )),
    }
}

fn collect<T>(errors: &mut FieldErrors, field: &str, result: Result<T, String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(message) => {
            errors.insert(field.to_string(), vec![message]);
            None
        }
    }
}

fn overlap_message(existing: u64) -> String {
    format!("Geometry overlaps existing plot {existing}.")
}

fn sanitize_name(name: Option<Option<String>>) -> Result<String, String> {
    let name = match name {
        None => return Err(REQUIRED.to_string()),
        Some(None) => return Err(NOT_NULL.to_string()),
        Some(Some(name)) => name,
    };
    let name = name.trim();
    if name.is_empty() {
        return Err("This field may not be blank.".to_string());
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(format!(
            "Ensure this field has no more than {MAX_NAME_CHARS} characters."
        ));
    }
    Ok(name.to_string())
}

fn sanitize_geometry(geometry: Option<Option<Geometry>>) -> Result<Geometry, String> {
    let geometry = match geometry {
        None => return Err(REQUIRED.to_string()),
        Some(None) => return Err(NOT_NULL.to_string()),
        Some(Some(geometry)) => geometry,
    };
    if matches!(geometry, Geometry::Unsupported) {
        return Err("Unsupported geometry type; expected Polygon or MultiPolygon.".to_string());
    }
    let polygons = geometry.polygons();
    if polygons.is_empty() {
        return Err("Geometry must contain at least one polygon.".to_string());
    }
    for polygon in polygons {
        if polygon.is_empty() {
            return Err("Each polygon needs an outer ring.".to_string());
        }
        for ring in polygon {
            validate_ring(ring)?;
        }
    }
    Ok(geometry)
}

fn validate_ring(ring: &Ring) -> Result<(), String> {
    if ring
        .iter()
        .any(|position| !position[0].is_finite() || !position[1].is_finite())
    {
        return Err("Coordinates must be finite numbers.".to_string());
    }
    if ring.len() < 4 {
        return Err("Each ring needs at least 4 positions.".to_string());
    }
    if ring.first() != ring.last() {
        return Err("Each ring must be closed: first and last positions must match.".to_string());
    }
    Ok(())
}

fn find_overlap(registry: &PlotRegistry, geometry: &Geometry, exclude: Option<u64>) -> Option<u64> {
    registry
        .plots
        .iter()
        .filter(|plot| Some(plot.id) != exclude)
        .find(|plot| geometries_intersect(&plot.geometry, geometry))
        .map(|plot| plot.id)
}

/// Planar polygons for the `geo` algorithms. Rings are closed by `geo`.
fn to_multi_polygon(geometry: &Geometry) -> MultiPolygon<f64> {
    let polygons = geometry
        .polygons()
        .into_iter()
        .filter_map(|rings| {
            let (outer, holes) = rings.split_first()?;
            Some(Polygon::new(
                LineString::from(outer.clone()),
                holes.iter().cloned().map(LineString::from).collect(),
            ))
        })
        .collect();
    MultiPolygon::new(polygons)
}

/// True when the geometries share any point, boundaries included.
pub fn geometries_intersect(a: &Geometry, b: &Geometry) -> bool {
    let a = to_multi_polygon(a);
    let b = to_multi_polygon(b);
    let intersects = a
        .iter()
        .any(|polygon_a| b.iter().any(|polygon_b| polygon_a.intersects(polygon_b)));
    intersects
}

/// Area on a sphere of the WGS84 equatorial radius, in square meters.
/// Holes are subtracted whatever their winding.
pub fn geometry_area(geometry: &Geometry) -> f64 {
    to_multi_polygon(geometry)
        .iter()
        .map(|polygon| {
            let outer = ring_area(polygon.exterior());
            let holes = polygon.interiors().iter().map(ring_area).sum::<f64>();
            (outer - holes).max(0.0)
        })
        .sum()
}

fn ring_area(ring: &LineString<f64>) -> f64 {
    Polygon::new(ring.clone(), Vec::new()).chamberlain_duquette_unsigned_area()
}
