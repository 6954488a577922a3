pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const MAP_CONTAINER_ID: &str = "map";
pub const MAP_STYLE: &str = "mapbox://styles/mapbox/streets-v12";
pub const DEFAULT_CENTER: [f64; 2] = [-6.84, 34.02];
pub const DEFAULT_ZOOM: f64 = 5.0;

const API_URL_ATTRIBUTE: &str = "data-api-url";
const MAPBOX_TOKEN_ATTRIBUTE: &str = "data-mapbox-token";

#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    pub api_base: String,
    pub mapbox_token: Option<String>,
}

impl ClientConfig {
    /// Reads overrides from the map container, falling back to values baked
    /// in at build time.
    pub fn from_container(container: &web_sys::Element) -> Self {
        Self::resolve(
            container.get_attribute(API_URL_ATTRIBUTE),
            option_env!("PLOTMAP_API_URL"),
            container.get_attribute(MAPBOX_TOKEN_ATTRIBUTE),
            option_env!("PLOTMAP_MAPBOX_TOKEN"),
        )
    }

    pub fn resolve(
        api_attribute: Option<String>,
        api_build: Option<&str>,
        token_attribute: Option<String>,
        token_build: Option<&str>,
    ) -> Self {
        let api_base = non_empty(api_attribute)
            .or_else(|| non_empty(api_build.map(str::to_string)))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let mapbox_token =
            non_empty(token_attribute).or_else(|| non_empty(token_build.map(str::to_string)));
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            mapbox_token,
        }
    }

    pub fn plots_url(&self) -> String {
        format!("{}/api/plots/", self.api_base)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
