use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use plotmap_shared::{Feature, FeatureCollection};
use serde::Deserialize;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::error::ApiError;
use crate::logic::{create_plot, parse_bbox, update_plot, PlotInput};
use crate::state::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/plots/", get(list_plots).post(create_plot_handler))
        .route(
            "/plots/:plot_id/",
            get(retrieve_plot)
                .put(replace_plot)
                .patch(patch_plot)
                .delete(delete_plot),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub in_bbox: Option<String>,
}

pub async fn list_plots(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let within = query.in_bbox.as_deref().map(parse_bbox).transpose()?;
    let registry = state.registry.read().await;
    let features = registry
        .list(within.as_ref())
        .into_iter()
        .map(|plot| plot.to_feature())
        .collect();
    Ok(Json(FeatureCollection::new(features)))
}

pub async fn create_plot_handler(
    State(state): State<AppState>,
    payload: Result<Json<PlotInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Feature>), ApiError> {
    let Json(input) = payload.map_err(|rejection| ApiError::Parse(rejection.body_text()))?;
    let feature = {
        let mut registry = state.registry.write().await;
        create_plot(&mut registry, input, Utc::now())
    }
    .inspect_err(|error| tracing::info!(%error, "rejected plot"))?;
    tracing::info!(id = ?feature.id, name = ?feature.name(), "created plot");
    Ok((StatusCode::CREATED, Json(feature)))
}

pub async fn retrieve_plot(
    State(state): State<AppState>,
    Path(plot_id): Path<String>,
) -> Result<Json<Feature>, ApiError> {
    let id = parse_plot_id(&plot_id)?;
    let registry = state.registry.read().await;
    registry
        .get(id)
        .map(|plot| Json(plot.to_feature()))
        .ok_or(ApiError::NotFound)
}

pub async fn replace_plot(
    State(state): State<AppState>,
    Path(plot_id): Path<String>,
    payload: Result<Json<PlotInput>, JsonRejection>,
) -> Result<Json<Feature>, ApiError> {
    update(state, &plot_id, payload, false).await
}

pub async fn patch_plot(
    State(state): State<AppState>,
    Path(plot_id): Path<String>,
    payload: Result<Json<PlotInput>, JsonRejection>,
) -> Result<Json<Feature>, ApiError> {
    update(state, &plot_id, payload, true).await
}

async fn update(
    state: AppState,
    plot_id: &str,
    payload: Result<Json<PlotInput>, JsonRejection>,
    partial: bool,
) -> Result<Json<Feature>, ApiError> {
    let id = parse_plot_id(plot_id)?;
    let Json(input) = payload.map_err(|rejection| ApiError::Parse(rejection.body_text()))?;
    let feature = {
        let mut registry = state.registry.write().await;
        update_plot(&mut registry, id, input, partial)
    }?;
    tracing::info!(id, name = ?feature.name(), partial, "updated plot");
    Ok(Json(feature))
}

pub async fn delete_plot(
    State(state): State<AppState>,
    Path(plot_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_plot_id(&plot_id)?;
    let removed = state.registry.write().await.remove(id);
    match removed {
        Some(plot) => {
            tracing::info!(id, name = %plot.name, "deleted plot");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::NotFound),
    }
}

fn parse_plot_id(value: &str) -> Result<u64, ApiError> {
    value.parse().map_err(|_| ApiError::NotFound)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;
    use plotmap_shared::{Bounds, Geometry, PlotId};

    use super::*;
    use crate::state::PlotRegistry;
    use crate::storage::FileStorage;

    fn test_state(dir: &tempfile::TempDir) -> AppState {
        AppState::new(
            PlotRegistry::default(),
            Arc::new(FileStorage::new(dir.path().to_path_buf())),
        )
    }

    fn square(west: f64, south: f64, size: f64) -> Geometry {
        Bounds::new(west, south, west + size, south + size).to_polygon()
    }

    async fn create(state: &AppState, name: &str, geometry: Geometry) -> Result<Feature, ApiError> {
        create_plot_handler(
            State(state.clone()),
            Ok(Json(Feature::new_plot(geometry, name).into())),
        )
        .await
        .map(|(status, Json(feature))| {
            assert_eq!(status, StatusCode::CREATED);
            feature
        })
    }

    async fn list(state: &AppState, in_bbox: Option<&str>) -> Result<FeatureCollection, ApiError> {
        let query = ListQuery {
            in_bbox: in_bbox.map(str::to_string),
        };
        list_plots(State(state.clone()), Query(query))
            .await
            .map(|Json(collection)| collection)
    }

    #[tokio::test]
    async fn created_plot_is_listed_as_a_feature_collection() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        create(&state, "Farm A", square(0.0, 0.0, 1.0)).await.unwrap();

        let collection = list(&state, None).await.unwrap();
        assert_eq!(collection.type_field, "FeatureCollection");
        assert_eq!(collection.features.len(), 1);
        assert_eq!(collection.features[0].name(), Some("Farm A"));
        assert!(state.registry.read().await.dirty);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        create(&state, "first", square(0.0, 0.0, 1.0)).await.unwrap();
        create(&state, "second", square(5.0, 5.0, 1.0)).await.unwrap();
        let collection = list(&state, None).await.unwrap();
        let ids = collection
            .features
            .iter()
            .map(|feature| feature.id.clone())
            .collect::<Vec<_>>();
        assert_eq!(ids, [Some(PlotId::Number(2)), Some(PlotId::Number(1))]);
    }

    #[tokio::test]
    async fn bad_bbox_is_a_field_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let error = list(&state, Some("nope")).await.unwrap_err();
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value["in_bbox"][0].is_string());
    }

    #[tokio::test]
    async fn overlap_response_is_400_with_geometry_errors() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        create(&state, "Farm A", square(0.0, 0.0, 1.0)).await.unwrap();
        let error = create(&state, "Farm B", square(0.5, 0.5, 1.0)).await.unwrap_err();
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value["geometry"][0]
            .as_str()
            .unwrap()
            .contains("overlaps existing plot 1"));
    }

    #[tokio::test]
    async fn retrieve_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        create(&state, "Farm A", square(0.0, 0.0, 1.0)).await.unwrap();

        let Json(feature) = retrieve_plot(State(state.clone()), Path("1".to_string()))
            .await
            .unwrap();
        assert_eq!(feature.name(), Some("Farm A"));

        let status = delete_plot(State(state.clone()), Path("1".to_string()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(list(&state, None).await.unwrap().features.is_empty());

        let missing = retrieve_plot(State(state.clone()), Path("1".to_string())).await;
        assert!(matches!(missing, Err(ApiError::NotFound)));
        let garbage = delete_plot(State(state.clone()), Path("abc".to_string())).await;
        assert!(matches!(garbage, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn not_found_body_has_detail() {
        let response = ApiError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, serde_json::json!({ "detail": "Not found." }));
    }

    #[tokio::test]
    async fn patch_renames_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        create(&state, "Original", square(0.0, 0.0, 1.0)).await.unwrap();
        let mut input = Feature::new_plot(square(0.0, 0.0, 1.0), "Renamed Plot");
        input.geometry = None;
        let Json(feature) = patch_plot(
            State(state.clone()),
            Path("1".to_string()),
            Ok(Json(input.into())),
        )
        .await
        .unwrap();
        assert_eq!(feature.name(), Some("Renamed Plot"));
        assert_eq!(feature.geometry, Some(square(0.0, 0.0, 1.0)));
    }
}
