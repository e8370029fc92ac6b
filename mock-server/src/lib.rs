use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const SEED_DAG: &str = "example_bash_operator";
pub const SEED_TASKS: [&str; 2] = ["runme_0", "also_run_this"];
pub const DEFAULT_POOL: &str = "default_pool";

#[derive(Clone, Debug, Serialize)]
pub struct DagRun {
    pub id: u64,
    pub dag_id: String,
    pub run_id: String,
    pub execution_date: String,
    pub start_date: String,
    pub state: String,
    pub conf: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pool {
    pub id: u64,
    pub pool: String,
    pub slots: u32,
    pub description: String,
}

#[derive(Deserialize)]
pub struct CreateDagRun {
    pub conf: Option<Value>,
    pub run_id: Option<String>,
    pub execution_date: Option<String>,
}

#[derive(Deserialize)]
pub struct CreatePool {
    pub name: String,
    pub slots: u32,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug)]
struct Dag {
    paused: bool,
    tasks: Vec<String>,
    runs: Vec<DagRun>,
}

#[derive(Debug, Default)]
pub struct Store {
    dags: HashMap<String, Dag>,
    pools: BTreeMap<String, Pool>,
    next_id: u64,
}

impl Store {
    pub fn seeded() -> Self {
        let mut store = Store::default();
        store.dags.insert(
            SEED_DAG.to_string(),
            Dag {
                paused: true,
                tasks: SEED_TASKS.iter().map(|t| t.to_string()).collect(),
                runs: Vec::new(),
            },
        );
        let id = store.allocate_id();
        store.pools.insert(
            DEFAULT_POOL.to_string(),
            Pool {
                id,
                pool: DEFAULT_POOL.to_string(),
                slots: 128,
                description: "Default pool".to_string(),
            },
        );
        store
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn dag(&self, dag_id: &str) -> Result<&Dag, ApiError> {
        self.dags
            .get(dag_id)
            .ok_or_else(|| ApiError::not_found(format!("Dag id {dag_id} not found")))
    }

    fn dag_mut(&mut self, dag_id: &str) -> Result<&mut Dag, ApiError> {
        self.dags
            .get_mut(dag_id)
            .ok_or_else(|| ApiError::not_found(format!("Dag id {dag_id} not found")))
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    /// Expected `Authorization` header; `None` disables auth.
    authorization: Option<Arc<str>>,
}

/// Error body in the service's `{"error": ...}` shape.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn app() -> Router {
    app_with_credentials(None)
}

/// Build the router; when `credentials` is set every route requires them as
/// HTTP Basic auth.
pub fn app_with_credentials(credentials: Option<(&str, &str)>) -> Router {
    let authorization: Option<Arc<str>> = credentials.map(|(user, password)| {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));
        Arc::from(format!("Basic {encoded}"))
    });
    let state = AppState {
        db: Arc::new(RwLock::new(Store::seeded())),
        authorization,
    };

    let api = Router::new()
        .route("/test", get(health))
        .route("/dags/{dag_id}/dag_runs", get(list_dag_runs).post(create_dag_run))
        .route("/dags/{dag_id}/dag_runs/{execution_date}", get(get_dag_run))
        .route(
            "/dags/{dag_id}/dag_runs/{execution_date}/tasks/{task_id}",
            get(get_task_instance),
        )
        .route("/dags/{dag_id}/tasks/{task_id}", get(get_task))
        .route("/dags/{dag_id}/paused/{paused}", get(set_paused))
        .route("/latest_runs", get(latest_runs))
        .route("/pools", get(list_pools).post(create_pool))
        .route("/pools/{name}", get(get_pool).delete(delete_pool));

    Router::new()
        .nest("/api/v1", api)
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_credentials(
    listener: TcpListener,
    username: &str,
    password: &str,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_credentials(Some((username, password)))).await
}

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.authorization.as_deref() else {
        return next.run(request).await;
    };
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if provided == Some(expected) {
        next.run(request).await
    } else {
        tracing::info!(uri = %request.uri(), "rejected unauthenticated request");
        ApiError {
            status: StatusCode::UNAUTHORIZED,
            message: "Unauthorized".to_string(),
        }
        .into_response()
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

/// A stored run plus the UI link the service reports alongside it.
#[derive(Serialize)]
pub struct DagRunView {
    #[serde(flatten)]
    run: DagRun,
    dag_run_url: String,
}

impl From<&DagRun> for DagRunView {
    fn from(run: &DagRun) -> Self {
        Self {
            dag_run_url: graph_url(&run.dag_id, &run.execution_date),
            run: run.clone(),
        }
    }
}

fn graph_url(dag_id: &str, execution_date: &str) -> String {
    format!("/admin/airflow/graph?dag_id={dag_id}&execution_date={execution_date}")
}

async fn list_dag_runs(
    State(state): State<AppState>,
    Path(dag_id): Path<String>,
) -> Result<Json<Vec<DagRunView>>, ApiError> {
    let store = state.db.read().await;
    let dag = store.dag(&dag_id)?;
    Ok(Json(dag.runs.iter().map(DagRunView::from).collect()))
}

async fn create_dag_run(
    State(state): State<AppState>,
    Path(dag_id): Path<String>,
    Json(input): Json<CreateDagRun>,
) -> Result<Json<Value>, ApiError> {
    let mut store = state.db.write().await;
    let id = store.allocate_id();
    let dag = store.dag_mut(&dag_id)?;

    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let execution_date = input.execution_date.unwrap_or_else(|| now.clone());
    if dag.runs.iter().any(|r| r.execution_date == execution_date) {
        return Err(ApiError::bad_request(format!(
            "Run for {dag_id} at {execution_date} already exists"
        )));
    }
    let run = DagRun {
        id,
        dag_id: dag_id.clone(),
        run_id: input
            .run_id
            .unwrap_or_else(|| format!("manual__{}", Uuid::new_v4())),
        execution_date,
        start_date: now,
        state: "running".to_string(),
        conf: input.conf,
    };
    tracing::info!(dag_id = %dag_id, run_id = %run.run_id, "created dag run");

    let body = json!({
        "message": format!("Created <DagRun {} @ {}: {}, externally triggered: True>", run.dag_id, run.execution_date, run.run_id),
        "execution_date": run.execution_date,
        "run_id": run.run_id,
    });
    dag.runs.push(run);
    Ok(Json(body))
}

async fn get_dag_run(
    State(state): State<AppState>,
    Path((dag_id, execution_date)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let store = state.db.read().await;
    let dag = store.dag(&dag_id)?;
    let run = dag
        .runs
        .iter()
        .find(|r| r.execution_date == execution_date)
        .ok_or_else(|| {
            ApiError::not_found(format!("DAG run for {dag_id} at {execution_date} not found"))
        })?;
    Ok(Json(json!({ "state": run.state })))
}

async fn get_task(
    State(state): State<AppState>,
    Path((dag_id, task_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let store = state.db.read().await;
    let dag = store.dag(&dag_id)?;
    if !dag.tasks.contains(&task_id) {
        return Err(ApiError::not_found(format!(
            "Task {task_id} not found in DAG {dag_id}"
        )));
    }
    Ok(Json(json!({
        "task_id": task_id,
        "owner": "airflow",
        "operator": "BashOperator",
        "retries": 0,
    })))
}

async fn get_task_instance(
    State(state): State<AppState>,
    Path((dag_id, execution_date, task_id)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let store = state.db.read().await;
    let dag = store.dag(&dag_id)?;
    if !dag.tasks.contains(&task_id) {
        return Err(ApiError::not_found(format!(
            "Task {task_id} not found in DAG {dag_id}"
        )));
    }
    let run = dag
        .runs
        .iter()
        .find(|r| r.execution_date == execution_date)
        .ok_or_else(|| {
            ApiError::not_found(format!("DAG run for {dag_id} at {execution_date} not found"))
        })?;
    Ok(Json(json!({
        "dag_id": dag_id,
        "task_id": task_id,
        "execution_date": run.execution_date,
        "state": "queued",
    })))
}

async fn set_paused(
    State(state): State<AppState>,
    Path((dag_id, paused)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let mut store = state.db.write().await;
    let dag = store.dag_mut(&dag_id)?;
    dag.paused = paused == "true";
    tracing::info!(dag_id = %dag_id, paused = dag.paused, "updated pause flag");
    Ok(Json(json!({ "response": "ok" })))
}

async fn latest_runs(State(state): State<AppState>) -> Json<Value> {
    let store = state.db.read().await;
    let mut items: Vec<Value> = store
        .dags
        .values()
        .filter_map(|dag| dag.runs.iter().max_by(|a, b| a.execution_date.cmp(&b.execution_date)))
        .map(|run| {
            json!({
                "dag_id": run.dag_id,
                "execution_date": run.execution_date,
                "start_date": run.start_date,
                "dag_run_url": graph_url(&run.dag_id, &run.execution_date),
            })
        })
        .collect();
    items.sort_by(|a, b| a["dag_id"].as_str().cmp(&b["dag_id"].as_str()));
    Json(json!({ "items": items }))
}

async fn list_pools(State(state): State<AppState>) -> Json<Vec<Pool>> {
    let store = state.db.read().await;
    Json(store.pools.values().cloned().collect())
}

async fn get_pool(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Pool>, ApiError> {
    let store = state.db.read().await;
    store
        .pools
        .get(&name)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Pool '{name}' doesn't exist")))
}

async fn create_pool(
    State(state): State<AppState>,
    Json(input): Json<CreatePool>,
) -> Result<Json<Pool>, ApiError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("Pool name shouldn't be empty"));
    }
    let mut store = state.db.write().await;
    let id = match store.pools.get(&name) {
        Some(existing) => existing.id,
        None => store.allocate_id(),
    };
    let pool = Pool {
        id,
        pool: name.clone(),
        slots: input.slots,
        description: input.description,
    };
    store.pools.insert(name, pool.clone());
    Ok(Json(pool))
}

async fn delete_pool(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Pool>, ApiError> {
    if name == DEFAULT_POOL {
        return Err(ApiError::bad_request("default_pool cannot be deleted"));
    }
    let mut store = state.db.write().await;
    store
        .pools
        .remove(&name)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Pool '{name}' doesn't exist")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_store_has_dag_and_default_pool() {
        let store = Store::seeded();
        let dag = store.dag(SEED_DAG).unwrap();
        assert!(dag.paused);
        assert_eq!(dag.tasks, vec!["runme_0", "also_run_this"]);
        assert_eq!(store.pools[DEFAULT_POOL].slots, 128);
    }

    #[test]
    fn unknown_dag_is_not_found() {
        let store = Store::seeded();
        let err = store.dag("missing").unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Dag id missing not found");
    }

    #[test]
    fn ids_are_allocated_sequentially() {
        let mut store = Store::seeded();
        let first = store.allocate_id();
        assert_eq!(store.allocate_id(), first + 1);
    }

    #[test]
    fn create_pool_defaults_description() {
        let input: CreatePool = serde_json::from_str(r#"{"name":"p","slots":2}"#).unwrap();
        assert_eq!(input.description, "");
    }

    #[test]
    fn create_dag_run_fields_are_optional() {
        let input: CreateDagRun = serde_json::from_str("{}").unwrap();
        assert!(input.conf.is_none());
        assert!(input.run_id.is_none());
        assert!(input.execution_date.is_none());
    }

    #[test]
    fn api_error_renders_error_body() {
        let response = ApiError::bad_request("nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
