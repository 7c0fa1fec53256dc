use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::component::Component;
use crate::field::Field;
use crate::render::{RenderedComponent, Renderer};
use crate::resolve::Record;
use crate::server::AppState;
use crate::storage::{DbStats, SqliteStore};
use crate::Error;

#[derive(Deserialize)]
pub struct InstanceParams {
    pub instance: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: Error) -> ApiError {
    let status = match &e {
        Error::UnknownComponent(_) | Error::UnknownField(_) | Error::UnknownPlacement { .. } => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse { error: e.to_string() }))
}

// rusqlite is blocking; each request opens its own connection off the runtime
async fn with_store<T, F>(state: &AppState, f: F) -> Result<Json<T>, ApiError>
where
    F: FnOnce(&SqliteStore) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let path = state.database_path.clone();
    let result = tokio::task::spawn_blocking(move || {
        let store = SqliteStore::open(&path)?;
        f(&store)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() })))?;

    result.map(Json).map_err(api_error)
}

pub async fn list_components(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Component>>, ApiError> {
    with_store(&state, |store| store.list_components()).await
}

pub async fn component_fields(
    State(state): State<Arc<AppState>>,
    Path(handle): Path<String>,
) -> Result<Json<Vec<Field>>, ApiError> {
    with_store(&state, move |store| {
        let component = store
            .get_component_by_handle(&handle)?
            .ok_or(Error::UnknownComponent(handle))?;
        store.find_fields_of_component(component.id)
    })
    .await
}

pub async fn render_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<RenderedComponent>>, ApiError> {
    with_store(&state, move |store| Renderer::new(store).render(id)).await
}

pub async fn resolved_fields(
    State(state): State<Arc<AppState>>,
    Path((id, handle)): Path<(i64, String)>,
    Query(params): Query<InstanceParams>,
) -> Result<Json<Record>, ApiError> {
    with_store(&state, move |store| {
        Renderer::new(store).resolved_fields_by_handle(&handle, id, params.instance.as_deref())
    })
    .await
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<DbStats>, ApiError> {
    with_store(&state, |store| store.stats()).await
}
