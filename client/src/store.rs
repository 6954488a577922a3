use plotmap_shared::{Feature, FeatureCollection};

pub const PLACEHOLDER_LABEL: &str = "Select a plot...";

/// Client-side copy of the last successful List.
#[derive(Debug, Default)]
pub struct PlotStore {
    plots: Vec<Feature>,
}

impl PlotStore {
    pub fn replace(&mut self, collection: FeatureCollection) {
        self.plots = collection.features;
    }

    pub fn plots(&self) -> &[Feature] {
        &self.plots
    }

    pub fn find(&self, plot_id: &str) -> Option<&Feature> {
        self.plots
            .iter()
            .find(|plot| plot.id.as_ref().is_some_and(|id| id.matches(plot_id)))
    }

    pub fn to_collection(&self) -> FeatureCollection {
        FeatureCollection::new(self.plots.clone())
    }

    /// Dropdown entries, in list order. Plots without an id cannot be
    /// selected and are left out.
    pub fn options(&self) -> Vec<PlotOption> {
        self.plots
            .iter()
            .filter_map(|plot| {
                let id = plot.id.as_ref()?.to_string();
                let label = match plot.name() {
                    Some(name) if !name.is_empty() => name.to_string(),
                    _ => format!("Plot {id}"),
                };
                Some(PlotOption { value: id, label })
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlotOption {
    pub value: String,
    pub label: String,
}

/// The dropdown's current value. Empty means nothing is selected.
#[derive(Debug, Default)]
pub struct Selection {
    selected: Option<String>,
}

impl Selection {
    /// Stores the chosen value and returns the plot id to navigate to.
    pub fn choose(&mut self, value: &str) -> Option<String> {
        self.selected = (!value.is_empty()).then(|| value.to_string());
        self.selected.clone()
    }

    /// Drops the selection when its plot is no longer listed.
    pub fn retain(&mut self, store: &PlotStore) {
        if let Some(selected) = &self.selected {
            if store.find(selected).is_none() {
                self.selected = None;
            }
        }
    }

    pub fn value(&self) -> &str {
        self.selected.as_deref().unwrap_or("")
    }
}
