use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlInputElement, HtmlOptionElement, HtmlSelectElement, Window};

use crate::controller::Panel;
use crate::store::{PlotOption, PLACEHOLDER_LABEL};

pub fn get_element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    let element = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element: {id}")))?;
    element
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Invalid element type: {id}")))
}

/// The side panel: name input and saved-plot dropdown.
pub struct DomPanel {
    window: Window,
    name_input: HtmlInputElement,
    plot_select: HtmlSelectElement,
}

impl DomPanel {
    pub fn new(window: Window, name_input: HtmlInputElement, plot_select: HtmlSelectElement) -> Self {
        Self {
            window,
            name_input,
            plot_select,
        }
    }

    fn fill_options(&self, options: &[PlotOption]) -> Result<(), JsValue> {
        self.plot_select.set_inner_html("");
        let placeholder = HtmlOptionElement::new_with_text_and_value(PLACEHOLDER_LABEL, "")?;
        self.plot_select.append_child(&placeholder)?;
        for option in options {
            let element = HtmlOptionElement::new_with_text_and_value(&option.label, &option.value)?;
            self.plot_select.append_child(&element)?;
        }
        Ok(())
    }
}

impl Panel for DomPanel {
    fn render_options(&self, options: &[PlotOption], selected: &str) {
        if let Err(error) = self.fill_options(options) {
            web_sys::console::error_1(&error);
        }
        self.plot_select.set_value(selected);
    }

    fn set_plot_name(&self, value: &str) {
        self.name_input.set_value(value);
    }

    fn alert(&self, message: &str) {
        if let Err(error) = self.window.alert_with_message(message) {
            web_sys::console::error_1(&error);
        }
    }

    fn log_error(&self, message: &str) {
        web_sys::console::error_1(&message.into());
    }
}
