//! Widget render route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use tessera_core::{TesseraError, WidgetDefinition};
use tessera_engine::RenderResult;
use tracing::warn;

use crate::state::AppState;
use crate::view;

/// Status for a failed definition lookup.
pub(crate) fn store_error(e: TesseraError) -> (StatusCode, String) {
    match e {
        TesseraError::WidgetNotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        _ => (StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

async fn load(state: &AppState, id: i64) -> Result<WidgetDefinition, (StatusCode, String)> {
    state.store.fetch(id).await.map_err(store_error)
}

/// GET /api/widgets - All definitions known to the store.
pub async fn list_widgets(
    State(state): State<AppState>,
) -> Result<Json<Vec<WidgetDefinition>>, (StatusCode, String)> {
    let widgets = state.store.list().await.map_err(store_error)?;
    Ok(Json(widgets))
}

/// GET /api/widgets/{id}/render - One pipeline run.
pub async fn render_widget(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RenderResult>, (StatusCode, String)> {
    let definition = load(&state, id).await?;
    Ok(Json(state.pipeline.run(&definition).await))
}

/// GET /widgets/{id} - The widget rendered as an HTML frame.
pub async fn widget_frame(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, (StatusCode, String)> {
    let definition = load(&state, id).await?;
    let result = state.pipeline.run(&definition).await;

    match view::render_frame(&state.views, &definition, &result) {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            warn!(widget_id = id, error = %e, "Widget frame failed, showing raw result");
            Ok(Html(view::raw_frame(&result)))
        }
    }
}
