use plotmap_shared::FeatureCollection;

/// Holds back source updates until the map reports it has loaded. Only the
/// newest collection survives the wait.
#[derive(Debug, Default)]
pub struct SourceSync {
    loaded: bool,
    pending: Option<FeatureCollection>,
}

impl SourceSync {
    /// Returns the collection when it can be applied right away.
    pub fn push(&mut self, collection: FeatureCollection) -> Option<FeatureCollection> {
        if self.loaded {
            Some(collection)
        } else {
            self.pending = Some(collection);
            None
        }
    }

    /// Returns the deferred collection, if any. Applies once.
    pub fn mark_loaded(&mut self) -> Option<FeatureCollection> {
        self.loaded = true;
        self.pending.take()
    }
}
