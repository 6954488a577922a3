use std::cell::RefCell;
use std::rc::Rc;

use plotmap_shared::FeatureCollection;
use serde_json::json;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::camera::CameraFit;
use crate::config::{ClientConfig, DEFAULT_CENTER, DEFAULT_ZOOM, MAP_STYLE};
use crate::controller::MapSurface;
use crate::draft::{first_drawn_geometry, DrawEvent, DRAW_POLYGON_MODE};
use crate::mapbox::{
    set_access_token, to_js, to_json_text, MapboxDraw, MapboxMap, NavigationControl,
};
use crate::source_sync::SourceSync;

pub const SAVED_PLOTS_SOURCE: &str = "saved-plots";
pub const SAVED_PLOTS_FILL_LAYER: &str = "saved-plots-fill";
pub const SAVED_PLOTS_OUTLINE_LAYER: &str = "saved-plots-outline";

const FILL_COLOR: &str = "#16a34a";
const FILL_OPACITY: f64 = 0.22;
const OUTLINE_COLOR: &str = "#14532d";
const OUTLINE_WIDTH: f64 = 2.5;
const CONTROL_POSITION: &str = "top-left";

type Listener = Closure<dyn FnMut(JsValue)>;

/// Owns the map, the draw widget and every listener registered on them.
pub struct MapSession {
    map: MapboxMap,
    draw: MapboxDraw,
    sync: Rc<RefCell<SourceSync>>,
    listeners: RefCell<Vec<Listener>>,
}

impl MapSession {
    /// Returns `None` when no access token is configured.
    pub fn create(config: &ClientConfig, container_id: &str) -> Result<Option<Self>, JsValue> {
        let Some(token) = config.mapbox_token.as_deref() else {
            web_sys::console::error_1(
                &"Missing Mapbox access token; map rendering skipped".into(),
            );
            return Ok(None);
        };
        set_access_token(token)?;

        let map = MapboxMap::new(&to_js(&json!({
            "container": container_id,
            "style": MAP_STYLE,
            "center": DEFAULT_CENTER,
            "zoom": DEFAULT_ZOOM,
        }))?);
        let draw = MapboxDraw::new(&to_js(&json!({
            "displayControlsDefault": false,
            "controls": { "polygon": true, "trash": true },
            "defaultMode": DRAW_POLYGON_MODE,
        }))?);
        map.add_control(draw.as_ref(), CONTROL_POSITION);
        map.add_control(NavigationControl::new().as_ref(), CONTROL_POSITION);

        let session = Self {
            map,
            draw,
            sync: Rc::new(RefCell::new(SourceSync::default())),
            listeners: RefCell::new(Vec::new()),
        };

        let load_map = session.map.clone();
        let load_sync = session.sync.clone();
        let onload = Closure::<dyn FnMut(JsValue)>::new(move |_| {
            if let Err(error) = install_saved_layers(&load_map) {
                web_sys::console::error_1(&error);
                return;
            }
            let pending = load_sync.borrow_mut().mark_loaded();
            if let Some(collection) = pending {
                apply_collection(&load_map, &collection);
            }
        });
        session.map.once("load", onload.as_ref().unchecked_ref());
        session.listeners.borrow_mut().push(onload);

        Ok(Some(session))
    }

    /// Forwards draw widget events as [`DrawEvent`]s.
    pub fn on_draw_event(&self, handler: impl Fn(DrawEvent) + 'static) {
        let handler = Rc::new(handler);
        for name in ["draw.create", "draw.update"] {
            let draw = self.draw.clone();
            let handler = handler.clone();
            let listener = Closure::<dyn FnMut(JsValue)>::new(move |_| {
                let geometry = to_json_text(&draw.get_all())
                    .and_then(|snapshot| first_drawn_geometry(&snapshot));
                handler(DrawEvent::Changed(geometry));
            });
            self.listen(name, listener);
        }

        let delete_handler = handler.clone();
        self.listen(
            "draw.delete",
            Closure::<dyn FnMut(JsValue)>::new(move |_| delete_handler(DrawEvent::Deleted)),
        );

        self.listen(
            "draw.modechange",
            Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
                let mode = js_sys::Reflect::get(&event, &JsValue::from_str("mode"))
                    .ok()
                    .and_then(|mode| mode.as_string())
                    .unwrap_or_default();
                handler(DrawEvent::ModeChanged(mode));
            }),
        );
    }

    pub fn teardown(&self) {
        self.map.remove();
        self.listeners.borrow_mut().clear();
    }

    fn listen(&self, event: &str, listener: Listener) {
        self.map.on(event, listener.as_ref().unchecked_ref());
        self.listeners.borrow_mut().push(listener);
    }
}

impl MapSurface for MapSession {
    fn show_plots(&self, collection: &FeatureCollection) {
        let ready = self.sync.borrow_mut().push(collection.clone());
        if let Some(collection) = ready {
            apply_collection(&self.map, &collection);
        }
    }

    fn fit_camera(&self, fit: &CameraFit) {
        let result = to_js(&fit.bounds.corners()).and_then(|bounds| {
            let options = to_js(&json!({
                "padding": fit.padding,
                "duration": fit.duration_ms,
            }))?;
            self.map.fit_bounds(&bounds, &options);
            Ok(())
        });
        if let Err(error) = result {
            web_sys::console::error_1(&error);
        }
    }

    fn clear_drawing(&self) {
        self.draw.delete_all();
    }
}

fn install_saved_layers(map: &MapboxMap) -> Result<(), JsValue> {
    if map.get_source(SAVED_PLOTS_SOURCE).is_none() {
        map.add_source(
            SAVED_PLOTS_SOURCE,
            &to_js(&json!({
                "type": "geojson",
                "data": FeatureCollection::default(),
            }))?,
        );
    }
    if is_missing(&map.get_layer(SAVED_PLOTS_FILL_LAYER)) {
        map.add_layer(&to_js(&json!({
            "id": SAVED_PLOTS_FILL_LAYER,
            "type": "fill",
            "source": SAVED_PLOTS_SOURCE,
            "paint": { "fill-color": FILL_COLOR, "fill-opacity": FILL_OPACITY },
        }))?);
    }
    if is_missing(&map.get_layer(SAVED_PLOTS_OUTLINE_LAYER)) {
        map.add_layer(&to_js(&json!({
            "id": SAVED_PLOTS_OUTLINE_LAYER,
            "type": "line",
            "source": SAVED_PLOTS_SOURCE,
            "paint": { "line-color": OUTLINE_COLOR, "line-width": OUTLINE_WIDTH },
        }))?);
    }
    Ok(())
}

fn apply_collection(map: &MapboxMap, collection: &FeatureCollection) {
    let Some(source) = map.get_source(SAVED_PLOTS_SOURCE) else {
        web_sys::console::error_1(&"saved-plots source is not installed".into());
        return;
    };
    match to_js(collection) {
        Ok(data) => source.set_data(&data),
        Err(error) => web_sys::console::error_1(&error),
    }
}

fn is_missing(value: &JsValue) -> bool {
    value.is_undefined() || value.is_null()
}
