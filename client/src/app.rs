use std::cell::Cell;
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Event, HtmlButtonElement, HtmlElement, HtmlInputElement, HtmlSelectElement};

use crate::api::HttpPlotApi;
use crate::config::{ClientConfig, MAP_CONTAINER_ID};
use crate::controller::{PlotsController, SaveOutcome};
use crate::dom::{get_element, DomPanel};
use crate::map::MapSession;

const PLOT_NAME_ID: &str = "plotName";
const SAVE_BUTTON_ID: &str = "savePlot";
const PLOT_SELECT_ID: &str = "plotSelect";

type AppController = PlotsController<HttpPlotApi, Option<MapSession>, DomPanel>;

fn document_ready_state(document: &web_sys::Document) -> Option<String> {
    Reflect::get(document.as_ref(), &JsValue::from_str("readyState"))
        .ok()?
        .as_string()
}

#[wasm_bindgen(start)]
pub fn run() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let started = Rc::new(Cell::new(false));

    if document_ready_state(&document).as_deref() == Some("complete") {
        started.set(true);
        return start_app();
    }

    let onload_started = started.clone();
    let onload = Closure::<dyn FnMut(Event)>::new(move |_| {
        if onload_started.replace(true) {
            return;
        }
        if let Err(err) = start_app() {
            web_sys::console::error_1(&err);
        }
    });
    window.add_event_listener_with_callback("load", onload.as_ref().unchecked_ref())?;
    onload.forget();

    Ok(())
}

fn start_app() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;

    let container: HtmlElement = get_element(&document, MAP_CONTAINER_ID)?;
    let name_input: HtmlInputElement = get_element(&document, PLOT_NAME_ID)?;
    let save_button: HtmlButtonElement = get_element(&document, SAVE_BUTTON_ID)?;
    let plot_select: HtmlSelectElement = get_element(&document, PLOT_SELECT_ID)?;

    let config = ClientConfig::from_container(&container);
    web_sys::console::log_1(&format!("Plot API at {}", config.api_base).into());

    let map = MapSession::create(&config, MAP_CONTAINER_ID)?;
    let panel = DomPanel::new(window.clone(), name_input.clone(), plot_select.clone());
    let controller: Rc<AppController> =
        Rc::new(PlotsController::new(HttpPlotApi::new(&config), map, panel));

    if let Some(map) = controller.map() {
        let draw_controller = Rc::downgrade(&controller);
        map.on_draw_event(move |event| {
            if let Some(controller) = draw_controller.upgrade() {
                controller.handle_draw(event);
            }
        });
    }

    {
        let input_controller = controller.clone();
        let input = name_input.clone();
        let oninput = Closure::<dyn FnMut(Event)>::new(move |_| {
            input_controller.set_plot_name(&input.value());
        });
        name_input.add_event_listener_with_callback("input", oninput.as_ref().unchecked_ref())?;
        oninput.forget();
    }

    {
        let save_controller = controller.clone();
        let onsave = Closure::<dyn FnMut(Event)>::new(move |_| {
            let controller = save_controller.clone();
            spawn_local(async move {
                if controller.save().await == SaveOutcome::Saved {
                    web_sys::console::log_1(&"Plot saved".into());
                }
            });
        });
        save_button.add_event_listener_with_callback("click", onsave.as_ref().unchecked_ref())?;
        onsave.forget();
    }

    {
        let select_controller = controller.clone();
        let select = plot_select.clone();
        let onchange = Closure::<dyn FnMut(Event)>::new(move |_| {
            select_controller.select(&select.value());
        });
        plot_select.add_event_listener_with_callback("change", onchange.as_ref().unchecked_ref())?;
        onchange.forget();
    }

    {
        let unload_controller = controller.clone();
        let onbeforeunload = Closure::<dyn FnMut(Event)>::new(move |_| {
            if let Some(map) = unload_controller.map() {
                map.teardown();
            }
        });
        window.add_event_listener_with_callback(
            "beforeunload",
            onbeforeunload.as_ref().unchecked_ref(),
        )?;
        onbeforeunload.forget();
    }

    let refresh_controller = controller.clone();
    spawn_local(async move {
        refresh_controller.refresh_logged().await;
    });

    Ok(())
}
