//! Dashboard-facing HTTP surface (spec.md §6): an axum `Router` +
//! `State` + `CorsLayer`, served over a bound `TcpListener`. A
//! read-plus-command-submission surface: goals/policies/metrics are
//! read from the document store, and commands (`pause`/`resume`/
//! `set_goal`/`set_policy`/`inject_event`/`set_param`) are written to
//! the `commands` collection for the runner to drain at its next step
//! boundary (spec.md §6 "Command collection").
//!
//! The web dashboard and the runner are separate processes sharing only
//! the `ConfigStore`; this module never touches a `World` directly.

use crate::store::{CommandKind, ConfigStore};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

pub struct AppState {
    pub store: Arc<dyn ConfigStore>,
}

/// Builds the router. Call sites (`src/bin/web.rs`) own binding and serving.
pub fn router(store: Arc<dyn ConfigStore>) -> Router {
    let state = Arc::new(AppState { store });
    Router::new()
        .route("/api/experiments/{id}", get(get_experiment))
        .route("/api/goals", get(list_goals))
        .route("/api/policies", get(list_policies))
        .route("/api/metrics", get(list_metrics))
        .route("/api/commands", post(submit_command))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

async fn get_experiment(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<serde_json::Value>, StatusCode> {
    state.store.get_document("experiments", &id).await.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn list_goals(State(state): State<Arc<AppState>>) -> Json<Vec<serde_json::Value>> {
    Json(state.store.list_collection("goals").await)
}

async fn list_policies(State(state): State<Arc<AppState>>) -> Json<Vec<serde_json::Value>> {
    Json(state.store.list_collection("policies").await)
}

async fn list_metrics(State(state): State<Arc<AppState>>) -> Json<Vec<serde_json::Value>> {
    Json(state.store.list_collection("metrics").await)
}

/// The dashboard posts a bare `CommandKind`; the server stamps an id and
/// the submission time so the runner can drain commands FIFO by `ts`.
#[derive(Debug, Deserialize)]
struct SubmitCommand {
    #[serde(flatten)]
    kind: CommandKind,
}

async fn submit_command(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitCommand>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let id = Uuid::new_v4().to_string();
    let command = crate::store::Command {
        id: id.clone(),
        ts: monotonic_ts(),
        kind: body.kind,
    };
    let value = serde_json::to_value(&command).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    state.store.put_document("commands", &id, value).await;
    Ok(Json(serde_json::json!({ "id": id })))
}

/// A process-local monotonic counter stands in for wall-clock time so
/// command ordering is stable without depending on the system clock.
fn monotonic_ts() -> i64 {
    use std::sync::atomic::{AtomicI64, Ordering};
    static COUNTER: AtomicI64 = AtomicI64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryConfigStore;

    #[tokio::test]
    async fn submit_command_writes_to_commands_collection() {
        let store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
        let app = router(store.clone());
        let body = serde_json::json!({"kind": "pause"});
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/commands")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap();
        let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.list_collection("commands").await.len(), 1);
    }

    #[tokio::test]
    async fn list_goals_reads_through_the_store() {
        let store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
        store.put_document("goals", "g1", serde_json::json!({"id": "g1"})).await;
        let app = router(store.clone());
        let request = axum::http::Request::builder()
            .method("GET")
            .uri("/api/goals")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
