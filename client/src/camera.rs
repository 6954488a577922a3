use plotmap_shared::{Bounds, Feature};

pub const FIT_PADDING_PX: u32 = 60;
pub const FIT_DURATION_MS: u32 = 1500;

/// An animated camera move that frames `bounds`.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraFit {
    pub bounds: Bounds,
    pub padding: u32,
    pub duration_ms: u32,
}

/// Frames the outer ring of the plot whose id matches `plot_id`.
pub fn fit_to_plot(plots: &[Feature], plot_id: &str) -> Option<CameraFit> {
    let plot = plots
        .iter()
        .find(|plot| plot.id.as_ref().is_some_and(|id| id.matches(plot_id)))?;
    let ring = plot.geometry.as_ref()?.outer_ring()?;
    let bounds = Bounds::from_positions(ring)?;
    Some(CameraFit {
        bounds,
        padding: FIT_PADDING_PX,
        duration_ms: FIT_DURATION_MS,
    })
}
