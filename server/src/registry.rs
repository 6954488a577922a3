use crate::state::{AppState, PlotRegistry};
use crate::storage::Storage;

pub async fn load_registry(storage: &dyn Storage) -> anyhow::Result<PlotRegistry> {
    match storage.load_plots().await {
        Ok(Some(data)) => {
            let registry = PlotRegistry::from_file_data(data);
            tracing::info!(
                plots = registry.plots.len(),
                next_id = registry.next_id,
                "loaded plot registry"
            );
            Ok(registry)
        }
        Ok(None) => {
            tracing::info!("no saved plots yet, starting empty");
            Ok(PlotRegistry::default())
        }
        Err(error) => Err(anyhow::anyhow!(error)),
    }
}

/// Writes the registry if it changed since the last flush. Returns whether a
/// write happened.
pub async fn flush_registry(state: &AppState) -> bool {
    let _flushing = state.flush_lock.lock().await;
    let data = {
        let mut registry = state.registry.write().await;
        if !registry.dirty {
            return false;
        }
        registry.dirty = false;
        registry.to_file_data()
    };
    match state.storage.save_plots(&data).await {
        Ok(()) => {
            tracing::debug!(plots = data.plots.len(), "flushed plot registry");
            true
        }
        Err(error) => {
            tracing::error!(%error, "failed to flush plot registry");
            state.registry.write().await.dirty = true;
            false
        }
    }
}
