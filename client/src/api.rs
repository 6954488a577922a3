use async_trait::async_trait;
use plotmap_shared::{Feature, FeatureCollection};
use thiserror::Error;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response};

use crate::config::ClientConfig;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request could not be sent: {0}")]
    Transport(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("server rejected the request ({status}): {body}")]
    Rejected {
        status: u16,
        body: serde_json::Value,
    },
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// The plots collection resource.
#[async_trait(?Send)]
pub trait PlotApi {
    async fn list_plots(&self) -> Result<FeatureCollection, ApiError>;
    async fn create_plot(&self, plot: &Feature) -> Result<(), ApiError>;
}

pub struct HttpPlotApi {
    plots_url: String,
}

impl HttpPlotApi {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            plots_url: config.plots_url(),
        }
    }

    async fn send(&self, method: &str, body: Option<String>) -> Result<Response, ApiError> {
        let window = web_sys::window().ok_or_else(|| ApiError::Transport("Missing window".into()))?;
        let init = RequestInit::new();
        init.set_method(method);
        let has_body = body.is_some();
        if let Some(body) = body {
            init.set_body(&JsValue::from_str(&body));
        }
        let request =
            Request::new_with_str_and_init(&self.plots_url, &init).map_err(transport_error)?;
        if has_body {
            request
                .headers()
                .set("Content-Type", "application/json")
                .map_err(transport_error)?;
        }
        let response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(transport_error)?;
        response.dyn_into::<Response>().map_err(transport_error)
    }
}

#[async_trait(?Send)]
impl PlotApi for HttpPlotApi {
    async fn list_plots(&self) -> Result<FeatureCollection, ApiError> {
        let response = self.send("GET", None).await?;
        if !response.ok() {
            return Err(ApiError::Status(response.status()));
        }
        let text = response_text(&response).await?;
        serde_json::from_str(&text).map_err(|error| ApiError::Decode(error.to_string()))
    }

    async fn create_plot(&self, plot: &Feature) -> Result<(), ApiError> {
        let payload =
            serde_json::to_string(plot).map_err(|error| ApiError::Decode(error.to_string()))?;
        let response = self.send("POST", Some(payload)).await?;
        if response.ok() {
            return Ok(());
        }
        let text = response_text(&response).await.unwrap_or_default();
        Err(ApiError::Rejected {
            status: response.status(),
            body: rejection_body(&text),
        })
    }
}

/// Error bodies that are not JSON read as an empty object.
pub fn rejection_body(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::json!({}))
}

async fn response_text(response: &Response) -> Result<String, ApiError> {
    let promise = response.text().map_err(transport_error)?;
    JsFuture::from(promise)
        .await
        .map_err(transport_error)?
        .as_string()
        .ok_or_else(|| ApiError::Decode("response body is not text".into()))
}

fn transport_error(value: JsValue) -> ApiError {
    let message = value
        .dyn_ref::<js_sys::Error>()
        .map(|error| String::from(error.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{value:?}"));
    ApiError::Transport(message)
}
