use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use plotmap_shared::{
    geometry_parts, Bounds, Feature, Geometry, PlotFileData, PlotId, PlotProperties, PlotRecord,
    FEATURE_TYPE,
};
use tokio::sync::{Mutex, RwLock};

use crate::storage::Storage;

pub const MAX_NAME_CHARS: usize = 255;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RwLock<PlotRegistry>>,
    pub storage: Arc<dyn Storage>,
    /// Held for a whole flush so storage writes never interleave.
    pub flush_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(registry: PlotRegistry, storage: Arc<dyn Storage>) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            storage,
            flush_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredPlot {
    pub id: u64,
    pub name: String,
    pub geometry: Geometry,
    /// Square meters.
    pub area: f64,
    pub created_at: DateTime<Utc>,
}

impl StoredPlot {
    pub fn to_feature(&self) -> Feature {
        Feature {
            type_field: FEATURE_TYPE.to_string(),
            id: Some(PlotId::Number(self.id)),
            geometry: Some(self.geometry.clone()),
            properties: PlotProperties {
                name: Some(self.name.clone()),
                area: Some(self.area),
                created_at: Some(self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
            },
        }
    }

    fn from_record(record: PlotRecord) -> Option<Self> {
        let created_at = DateTime::from_timestamp_micros(record.created_at_us)?;
        Some(Self {
            id: record.id,
            geometry: record.geometry(),
            name: record.name,
            area: record.area,
            created_at,
        })
    }

    fn to_record(&self) -> PlotRecord {
        let (polygons, multi) = geometry_parts(&self.geometry);
        PlotRecord {
            id: self.id,
            name: self.name.clone(),
            polygons,
            multi,
            area: self.area,
            created_at_us: self.created_at.timestamp_micros(),
        }
    }
}

pub struct PlotRegistry {
    pub plots: Vec<StoredPlot>,
    pub next_id: u64,
    pub dirty: bool,
}

impl Default for PlotRegistry {
    fn default() -> Self {
        Self {
            plots: Vec::new(),
            next_id: 1,
            dirty: false,
        }
    }
}

impl PlotRegistry {
    pub fn from_file_data(data: PlotFileData) -> Self {
        let plots = data
            .plots
            .into_iter()
            .filter_map(StoredPlot::from_record)
            .collect::<Vec<_>>();
        let after_max = plots.iter().map(|plot| plot.id + 1).max().unwrap_or(1);
        Self {
            plots,
            next_id: data.next_id.max(after_max),
            dirty: false,
        }
    }

    pub fn to_file_data(&self) -> PlotFileData {
        PlotFileData {
            next_id: self.next_id,
            plots: self.plots.iter().map(StoredPlot::to_record).collect(),
        }
    }

    /// Newest first. With a box, only plots whose geometry intersects it.
    pub fn list(&self, within: Option<&Bounds>) -> Vec<&StoredPlot> {
        let area = within.map(Bounds::to_polygon);
        let mut plots = self
            .plots
            .iter()
            .filter(|plot| match &area {
                Some(area) => crate::logic::geometries_intersect(&plot.geometry, area),
                None => true,
            })
            .collect::<Vec<_>>();
        plots.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        plots
    }

    pub fn get(&self, id: u64) -> Option<&StoredPlot> {
        self.plots.iter().find(|plot| plot.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut StoredPlot> {
        self.plots.iter_mut().find(|plot| plot.id == id)
    }

    pub fn insert(
        &mut self,
        name: String,
        geometry: Geometry,
        area: f64,
        created_at: DateTime<Utc>,
    ) -> &StoredPlot {
        let id = self.next_id;
        self.next_id += 1;
        self.plots.push(StoredPlot {
            id,
            name,
            geometry,
            area,
            created_at,
        });
        self.dirty = true;
        &self.plots[self.plots.len() - 1]
    }

    pub fn remove(&mut self, id: u64) -> Option<StoredPlot> {
        let index = self.plots.iter().position(|plot| plot.id == id)?;
        self.dirty = true;
        Some(self.plots.remove(index))
    }
}
