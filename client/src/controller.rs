use std::cell::RefCell;

use plotmap_shared::{Feature, FeatureCollection};

use crate::api::{ApiError, PlotApi};
use crate::camera::{fit_to_plot, CameraFit};
use crate::draft::{Draft, DrawEvent};
use crate::store::{PlotOption, PlotStore, Selection};

pub const MISSING_DRAFT_PROMPT: &str = "Draw a polygon first.";
pub const MISSING_NAME_PROMPT: &str = "Enter a plot name.";

/// The map widget as the controller sees it.
pub trait MapSurface {
    /// Replaces the saved-plots source with `collection`.
    fn show_plots(&self, collection: &FeatureCollection);
    fn fit_camera(&self, fit: &CameraFit);
    /// Removes the shape held by the draw widget.
    fn clear_drawing(&self);
}

/// No map was constructed; every call is a no-op.
impl<M: MapSurface> MapSurface for Option<M> {
    fn show_plots(&self, collection: &FeatureCollection) {
        if let Some(map) = self {
            map.show_plots(collection);
        }
    }

    fn fit_camera(&self, fit: &CameraFit) {
        if let Some(map) = self {
            map.fit_camera(fit);
        }
    }

    fn clear_drawing(&self) {
        if let Some(map) = self {
            map.clear_drawing();
        }
    }
}

/// Name field, plot dropdown and user feedback.
pub trait Panel {
    fn render_options(&self, options: &[PlotOption], selected: &str);
    fn set_plot_name(&self, value: &str);
    /// Blocking message the user must acknowledge.
    fn alert(&self, message: &str);
    fn log_error(&self, message: &str);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    MissingDraft,
    MissingName,
    Rejected,
    Failed,
}

#[derive(Debug, Default)]
struct Session {
    plot_name: String,
    draft: Draft,
    store: PlotStore,
    selection: Selection,
}

pub struct PlotsController<A, M, P> {
    api: A,
    map: M,
    panel: P,
    session: RefCell<Session>,
}

impl<A: PlotApi, M: MapSurface, P: Panel> PlotsController<A, M, P> {
    pub fn new(api: A, map: M, panel: P) -> Self {
        Self {
            api,
            map,
            panel,
            session: RefCell::new(Session::default()),
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    /// Fetches the plot list and redraws the map source and dropdown.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let collection = self.api.list_plots().await?;
        let (collection, options, selected) = {
            let mut session = self.session.borrow_mut();
            let Session {
                store, selection, ..
            } = &mut *session;
            store.replace(collection);
            selection.retain(store);
            (
                store.to_collection(),
                store.options(),
                selection.value().to_string(),
            )
        };
        self.map.show_plots(&collection);
        self.panel.render_options(&options, &selected);
        Ok(())
    }

    /// List failures are reported to the console only.
    pub async fn refresh_logged(&self) {
        if let Err(error) = self.refresh().await {
            self.panel
                .log_error(&format!("Failed to fetch plots: {error}"));
        }
    }

    pub fn handle_draw(&self, event: DrawEvent) {
        self.session.borrow_mut().draft.apply(event);
    }

    pub fn set_plot_name(&self, value: &str) {
        self.session.borrow_mut().plot_name = value.to_string();
    }

    pub async fn save(&self) -> SaveOutcome {
        let payload = {
            let session = self.session.borrow();
            let name = session.plot_name.trim().to_string();
            match (session.draft.geometry(), name.is_empty()) {
                (None, _) => Err((SaveOutcome::MissingDraft, MISSING_DRAFT_PROMPT)),
                (Some(_), true) => Err((SaveOutcome::MissingName, MISSING_NAME_PROMPT)),
                (Some(geometry), false) => Ok(Feature::new_plot(geometry.clone(), name)),
            }
        };
        let payload = match payload {
            Ok(payload) => payload,
            Err((outcome, prompt)) => {
                self.panel.alert(prompt);
                return outcome;
            }
        };

        match self.api.create_plot(&payload).await {
            Ok(()) => {}
            Err(ApiError::Rejected { body, .. }) => {
                self.panel.alert(&body.to_string());
                return SaveOutcome::Rejected;
            }
            Err(error) => {
                let message = format!("Failed to save plot: {error}");
                self.panel.log_error(&message);
                self.panel.alert(&message);
                return SaveOutcome::Failed;
            }
        }

        {
            let mut session = self.session.borrow_mut();
            session.plot_name.clear();
            session.draft.clear();
        }
        self.panel.set_plot_name("");
        self.map.clear_drawing();
        self.refresh_logged().await;
        SaveOutcome::Saved
    }

    /// Dropdown change. The empty value clears the selection.
    pub fn select(&self, value: &str) {
        let fit = {
            let mut session = self.session.borrow_mut();
            let Session {
                store, selection, ..
            } = &mut *session;
            selection
                .choose(value)
                .and_then(|plot_id| fit_to_plot(store.plots(), &plot_id))
        };
        if let Some(fit) = fit {
            self.map.fit_camera(&fit);
        }
    }
}

#[cfg(test)]
impl<A, M, P> PlotsController<A, M, P> {
    fn api(&self) -> &A {
        &self.api
    }

    fn panel(&self) -> &P {
        &self.panel
    }

    fn draft(&self) -> Draft {
        self.session.borrow().draft.clone()
    }

    fn plot_name(&self) -> String {
        self.session.borrow().plot_name.clone()
    }

    fn selected(&self) -> String {
        self.session.borrow().selection.value().to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use plotmap_shared::{Geometry, PlotProperties};

    use super::*;
    use crate::draft::DRAW_POLYGON_MODE;

    #[derive(Default)]
    struct FakeApi {
        lists: RefCell<VecDeque<Result<FeatureCollection, ApiError>>>,
        create_result: RefCell<Option<Result<(), ApiError>>>,
        list_calls: Cell<usize>,
        created: RefCell<Vec<Feature>>,
    }

    impl FakeApi {
        fn with_lists(lists: Vec<Result<FeatureCollection, ApiError>>) -> Self {
            Self {
                lists: RefCell::new(lists.into()),
                ..Self::default()
            }
        }

        fn answer_create(&self, result: Result<(), ApiError>) {
            *self.create_result.borrow_mut() = Some(result);
        }
    }

    #[async_trait(?Send)]
    impl PlotApi for FakeApi {
        async fn list_plots(&self) -> Result<FeatureCollection, ApiError> {
            self.list_calls.set(self.list_calls.get() + 1);
            self.lists
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(FeatureCollection::default()))
        }

        async fn create_plot(&self, plot: &Feature) -> Result<(), ApiError> {
            self.created.borrow_mut().push(plot.clone());
            self.create_result.borrow_mut().take().unwrap_or(Ok(()))
        }
    }

    #[derive(Default)]
    struct FakeMap {
        shown: RefCell<Vec<FeatureCollection>>,
        fits: RefCell<Vec<CameraFit>>,
        clears: Cell<usize>,
    }

    impl MapSurface for FakeMap {
        fn show_plots(&self, collection: &FeatureCollection) {
            self.shown.borrow_mut().push(collection.clone());
        }

        fn fit_camera(&self, fit: &CameraFit) {
            self.fits.borrow_mut().push(fit.clone());
        }

        fn clear_drawing(&self) {
            self.clears.set(self.clears.get() + 1);
        }
    }

    #[derive(Default)]
    struct FakePanel {
        options: RefCell<Vec<(Vec<PlotOption>, String)>>,
        names: RefCell<Vec<String>>,
        alerts: RefCell<Vec<String>>,
        errors: RefCell<Vec<String>>,
    }

    impl Panel for FakePanel {
        fn render_options(&self, options: &[PlotOption], selected: &str) {
            self.options
                .borrow_mut()
                .push((options.to_vec(), selected.to_string()));
        }

        fn set_plot_name(&self, value: &str) {
            self.names.borrow_mut().push(value.to_string());
        }

        fn alert(&self, message: &str) {
            self.alerts.borrow_mut().push(message.to_string());
        }

        fn log_error(&self, message: &str) {
            self.errors.borrow_mut().push(message.to_string());
        }
    }

    type TestController = PlotsController<FakeApi, FakeMap, FakePanel>;

    fn controller(api: FakeApi) -> TestController {
        PlotsController::new(api, FakeMap::default(), FakePanel::default())
    }

    fn unit_square() -> Geometry {
        Geometry::Polygon {
            coordinates: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]],
        }
    }

    fn saved(id: u64, name: &str, geometry: Geometry) -> Feature {
        Feature {
            type_field: "Feature".to_string(),
            id: Some(id.into()),
            geometry: Some(geometry),
            properties: PlotProperties {
                name: Some(name.to_string()),
                area: Some(1.0),
                created_at: Some("2026-01-01T00:00:00.000000Z".to_string()),
            },
        }
    }

    fn drafted(controller: &TestController) {
        controller.handle_draw(DrawEvent::ModeChanged(DRAW_POLYGON_MODE.to_string()));
        controller.handle_draw(DrawEvent::Changed(Some(unit_square())));
    }

    #[tokio::test]
    async fn refresh_pushes_whole_list_in_order() {
        let plots = vec![
            saved(3, "C", unit_square()),
            saved(1, "A", unit_square()),
            saved(2, "", unit_square()),
        ];
        let controller = controller(FakeApi::with_lists(vec![Ok(FeatureCollection::new(
            plots.clone(),
        ))]));
        controller.refresh().await.unwrap();

        let shown = controller.map().shown.borrow();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].features, plots);
        let options = controller.panel().options.borrow();
        let labels: Vec<_> = options[0].0.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["C", "A", "Plot 2"]);
        assert_eq!(options[0].1, "");
    }

    #[tokio::test]
    async fn list_failure_is_logged_not_alerted() {
        let controller = controller(FakeApi::with_lists(vec![Err(ApiError::Status(500))]));
        controller.refresh_logged().await;

        assert!(controller.map().shown.borrow().is_empty());
        assert!(controller.panel().alerts.borrow().is_empty());
        let errors = controller.panel().errors.borrow();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("500"));
    }

    #[tokio::test]
    async fn save_requires_a_draft() {
        let controller = controller(FakeApi::default());
        controller.set_plot_name("Farm B");
        assert_eq!(controller.save().await, SaveOutcome::MissingDraft);

        assert_eq!(
            *controller.panel().alerts.borrow(),
            vec![MISSING_DRAFT_PROMPT.to_string()]
        );
        assert!(controller.api().created.borrow().is_empty());
    }

    #[tokio::test]
    async fn save_requires_a_name() {
        let controller = controller(FakeApi::default());
        drafted(&controller);
        controller.set_plot_name("   ");
        assert_eq!(controller.save().await, SaveOutcome::MissingName);

        assert_eq!(
            *controller.panel().alerts.borrow(),
            vec![MISSING_NAME_PROMPT.to_string()]
        );
        assert!(controller.api().created.borrow().is_empty());
    }

    #[tokio::test]
    async fn successful_save_resets_and_lists_once() {
        let controller = controller(FakeApi::with_lists(vec![Ok(FeatureCollection::new(
            vec![saved(1, "Farm B", unit_square())],
        ))]));
        drafted(&controller);
        controller.set_plot_name("  Farm B ");
        assert_eq!(controller.save().await, SaveOutcome::Saved);

        let created = controller.api().created.borrow();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0], Feature::new_plot(unit_square(), "Farm B"));
        assert_eq!(controller.api().list_calls.get(), 1);
        assert_eq!(controller.draft(), Draft::Empty);
        assert_eq!(controller.plot_name(), "");
        assert_eq!(*controller.panel().names.borrow(), vec![String::new()]);
        assert_eq!(controller.map().clears.get(), 1);
        assert_eq!(controller.map().shown.borrow()[0].features.len(), 1);
    }

    #[tokio::test]
    async fn rejected_save_shows_body_and_keeps_draft() {
        let controller = controller(FakeApi::default());
        controller.api().answer_create(Err(ApiError::Rejected {
            status: 400,
            body: serde_json::json!({"detail": "invalid geometry"}),
        }));
        drafted(&controller);
        controller.set_plot_name("Farm C");
        assert_eq!(controller.save().await, SaveOutcome::Rejected);

        let alerts = controller.panel().alerts.borrow();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("invalid geometry"));
        assert_eq!(controller.draft(), Draft::Drafted(unit_square()));
        assert_eq!(controller.plot_name(), "Farm C");
        assert_eq!(controller.api().list_calls.get(), 0);
        assert_eq!(controller.map().clears.get(), 0);
    }

    #[tokio::test]
    async fn transport_failure_on_save_is_logged_and_shown() {
        let controller = controller(FakeApi::default());
        controller
            .api()
            .answer_create(Err(ApiError::Transport("connection refused".into())));
        drafted(&controller);
        controller.set_plot_name("Farm D");
        assert_eq!(controller.save().await, SaveOutcome::Failed);

        assert!(controller.panel().errors.borrow()[0].contains("connection refused"));
        assert!(controller.panel().alerts.borrow()[0].contains("connection refused"));
        assert_eq!(controller.draft(), Draft::Drafted(unit_square()));
    }

    #[tokio::test]
    async fn selecting_a_listed_plot_fits_its_bounds() {
        let controller = controller(FakeApi::with_lists(vec![Ok(FeatureCollection::new(
            vec![saved(1, "Farm A", unit_square())],
        ))]));
        controller.refresh().await.unwrap();
        {
            let options = controller.panel().options.borrow();
            assert_eq!(
                options[0].0,
                vec![PlotOption {
                    value: "1".to_string(),
                    label: "Farm A".to_string()
                }]
            );
        }

        controller.select("1");
        let fits = controller.map().fits.borrow();
        assert_eq!(fits.len(), 1);
        assert_eq!(fits[0].bounds.corners(), [[0.0, 0.0], [1.0, 1.0]]);
        assert_eq!(fits[0].padding, 60);
        assert_eq!(fits[0].duration_ms, 1500);
        assert_eq!(controller.selected(), "1");
    }

    #[tokio::test]
    async fn unknown_or_placeholder_selection_leaves_camera() {
        let controller = controller(FakeApi::with_lists(vec![Ok(FeatureCollection::new(
            vec![saved(1, "Farm A", unit_square())],
        ))]));
        controller.refresh().await.unwrap();

        controller.select("42");
        assert!(controller.map().fits.borrow().is_empty());

        controller.select("1");
        controller.select("");
        assert_eq!(controller.map().fits.borrow().len(), 1);
        assert_eq!(controller.selected(), "");
    }

    #[tokio::test]
    async fn refresh_drops_vanished_selection() {
        let controller = controller(FakeApi::with_lists(vec![
            Ok(FeatureCollection::new(vec![saved(1, "Farm A", unit_square())])),
            Ok(FeatureCollection::new(vec![saved(2, "Farm E", unit_square())])),
        ]));
        controller.refresh().await.unwrap();
        controller.select("1");
        controller.refresh().await.unwrap();

        assert_eq!(controller.selected(), "");
        assert_eq!(controller.panel().options.borrow()[1].1, "");
    }

    #[test]
    fn missing_map_ignores_surface_calls() {
        let map: Option<FakeMap> = None;
        map.show_plots(&FeatureCollection::default());
        map.clear_drawing();
    }
}
