//! Bindings for the `mapboxgl` and `MapboxDraw` globals loaded by `index.html`.

use js_sys::{Function, Reflect};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = mapboxgl, js_name = Map)]
    #[derive(Clone, Debug)]
    pub type MapboxMap;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "Map")]
    pub fn new(options: &JsValue) -> MapboxMap;

    #[wasm_bindgen(method, js_name = addControl)]
    pub fn add_control(this: &MapboxMap, control: &JsValue, position: &str);

    #[wasm_bindgen(method)]
    pub fn on(this: &MapboxMap, event: &str, listener: &Function);

    #[wasm_bindgen(method)]
    pub fn once(this: &MapboxMap, event: &str, listener: &Function);

    #[wasm_bindgen(method, js_name = getSource)]
    pub fn get_source(this: &MapboxMap, id: &str) -> Option<GeoJsonSource>;

    #[wasm_bindgen(method, js_name = addSource)]
    pub fn add_source(this: &MapboxMap, id: &str, source: &JsValue);

    #[wasm_bindgen(method, js_name = getLayer)]
    pub fn get_layer(this: &MapboxMap, id: &str) -> JsValue;

    #[wasm_bindgen(method, js_name = addLayer)]
    pub fn add_layer(this: &MapboxMap, layer: &JsValue);

    #[wasm_bindgen(method, js_name = fitBounds)]
    pub fn fit_bounds(this: &MapboxMap, bounds: &JsValue, options: &JsValue);

    #[wasm_bindgen(method)]
    pub fn remove(this: &MapboxMap);

    #[wasm_bindgen(js_namespace = mapboxgl, js_name = NavigationControl)]
    pub type NavigationControl;

    #[wasm_bindgen(constructor, js_namespace = mapboxgl, js_class = "NavigationControl")]
    pub fn new() -> NavigationControl;

    pub type GeoJsonSource;

    #[wasm_bindgen(method, js_name = setData)]
    pub fn set_data(this: &GeoJsonSource, data: &JsValue);

    #[wasm_bindgen(js_name = MapboxDraw)]
    #[derive(Clone, Debug)]
    pub type MapboxDraw;

    #[wasm_bindgen(constructor, js_class = "MapboxDraw")]
    pub fn new(options: &JsValue) -> MapboxDraw;

    #[wasm_bindgen(method, js_name = getAll)]
    pub fn get_all(this: &MapboxDraw) -> JsValue;

    #[wasm_bindgen(method, js_name = deleteAll)]
    pub fn delete_all(this: &MapboxDraw) -> JsValue;
}

pub fn set_access_token(token: &str) -> Result<(), JsValue> {
    let mapboxgl = Reflect::get(&js_sys::global(), &JsValue::from_str("mapboxgl"))?;
    if mapboxgl.is_undefined() {
        return Err(JsValue::from_str("mapboxgl is not loaded"));
    }
    Reflect::set(
        &mapboxgl,
        &JsValue::from_str("accessToken"),
        &JsValue::from_str(token),
    )?;
    Ok(())
}

/// Converts through JSON so plain objects reach the JS side.
pub fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    let text = serde_json::to_string(value).map_err(|error| JsValue::from_str(&error.to_string()))?;
    js_sys::JSON::parse(&text)
}

pub fn to_json_text(value: &JsValue) -> Option<String> {
    js_sys::JSON::stringify(value).ok()?.as_string()
}
