use crate::atlas::{Atlas, FilterPipeline, FilteredView, IconSize};
use crate::config::AppConfig;
use crate::filter::filter_from_pairs;
use crate::grouping::to_feature_collection;
use crate::html::{json_for_script, page};
use crate::icon::parse_type_counts;
use crate::render::escape_html;
use crate::types::{CoordKey, FilterState};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use futures_util::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// A loaded atlas plus one filter pipeline per open page.
pub struct Loaded {
    pub atlas: Arc<Atlas>,
    sessions: Mutex<HashMap<u64, FilterPipeline>>,
    next_session: AtomicU64,
}

impl Loaded {
    pub fn new(atlas: Atlas) -> Self {
        Loaded {
            atlas: Arc::new(atlas),
            sessions: Mutex::new(HashMap::new()),
            next_session: AtomicU64::new(0),
        }
    }

    /// Starts a pipeline at the default filter. Must be called from within a tokio runtime.
    fn open_session(self: &Arc<Self>) -> (FilterSession, watch::Receiver<Arc<FilteredView>>) {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        let pipeline = self.atlas.spawn_filter_pipeline();
        let updates = pipeline.subscribe();
        let open = {
            let mut sessions = self.sessions();
            sessions.insert(id, pipeline);
            sessions.len()
        };
        debug!(session = id, open, "Opened filter session");

        (FilterSession { loaded: Arc::clone(self), id }, updates)
    }

    /// Returns false when the session is unknown or already closed.
    fn push_filter(&self, id: u64, filter: FilterState) -> bool {
        match self.sessions().get(&id) {
            Some(pipeline) => {
                pipeline.push(filter);
                true
            }
            None => false,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<u64, FilterPipeline>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owned by the event stream that opened it; dropping it stops the session's pipeline.
struct FilterSession {
    loaded: Arc<Loaded>,
    id: u64,
}

impl Drop for FilterSession {
    fn drop(&mut self) {
        let open = {
            let mut sessions = self.loaded.sessions();
            sessions.remove(&self.id);
            sessions.len()
        };
        debug!(session = self.id, open, "Closed filter session");
    }
}

enum LoadState {
    Ready(Arc<Loaded>),
    Failed(String),
}

pub struct AppState {
    config: AppConfig,
    data: RwLock<LoadState>,
}

impl AppState {
    pub fn new(config: AppConfig, loaded: Result<Atlas>) -> Self {
        let data = match loaded {
            Ok(atlas) => LoadState::Ready(Arc::new(Loaded::new(atlas))),
            Err(err) => {
                error!("Failed to load organization data: {:#}", err);
                LoadState::Failed(format!("{:#}", err))
            }
        };
        AppState { config, data: RwLock::new(data) }
    }

    async fn ready(&self) -> Result<Arc<Loaded>, ApiError> {
        match &*self.data.read().await {
            LoadState::Ready(loaded) => Ok(Arc::clone(loaded)),
            LoadState::Failed(_) => Err(ApiError::unavailable()),
        }
    }

    /// A failed load is only retried when the user reloads the page.
    async fn ready_or_reload(&self) -> Result<Arc<Loaded>, String> {
        if let LoadState::Ready(loaded) = &*self.data.read().await {
            return Ok(Arc::clone(loaded));
        }

        let mut data = self.data.write().await;
        // Checked again: a concurrent request may have reloaded while this one waited.
        if let LoadState::Failed(_) = &*data {
            info!("Retrying data load after manual reload");
            let config = self.config.clone();
            let attempt = tokio::task::spawn_blocking(move || Atlas::load(config)).await;
            *data = match attempt {
                Ok(Ok(atlas)) => LoadState::Ready(Arc::new(Loaded::new(atlas))),
                Ok(Err(err)) => LoadState::Failed(format!("{:#}", err)),
                Err(join_err) => LoadState::Failed(format!("Data load task failed: {}", join_err)),
            };
        }
        match &*data {
            LoadState::Ready(loaded) => Ok(Arc::clone(loaded)),
            LoadState::Failed(message) => Err(message.clone()),
        }
    }
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unavailable() -> Self {
        ApiError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "Organization data is not loaded; reload the page to retry".to_string(),
        }
    }

    fn bad_request(err: anyhow::Error) -> Self {
        ApiError { status: StatusCode::BAD_REQUEST, message: format!("{:#}", err) }
    }

    fn not_found(message: &str) -> Self {
        ApiError { status: StatusCode::NOT_FOUND, message: message.to_string() }
    }

    fn internal(err: anyhow::Error) -> Self {
        error!("Request failed: {:#}", err);
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: format!("{:#}", err) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

#[derive(Serialize)]
struct PageSettings<'a> {
    #[serde(flatten)]
    map: &'a crate::config::MapConfig,
    debounce_ms: u64,
}

#[derive(Serialize)]
struct TablePayload<'a> {
    html: &'a str,
    total: usize,
    shown: usize,
    remaining: usize,
    filter: &'a FilterState,
}

impl<'a> From<&'a FilteredView> for TablePayload<'a> {
    fn from(view: &'a FilteredView) -> Self {
        TablePayload {
            html: &view.table_html,
            total: view.table.total,
            shown: view.table.rows.len(),
            remaining: view.table.remaining,
            filter: &view.filter,
        }
    }
}

#[derive(Deserialize)]
struct SessionQuery {
    session: u64,
}

#[derive(Deserialize)]
struct DetailQuery {
    key: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/healthz", get(healthz))
        .route("/api/groups", get(groups_handler))
        .route("/api/categories", get(categories_handler))
        .route("/api/cluster-icon.svg", get(cluster_icon_handler))
        .route("/api/detail", get(detail_handler))
        .route("/api/filter", post(filter_handler))
        .route("/api/table", get(table_handler))
        .route("/api/table/events", get(table_events_handler))
        .route("/api/export.csv", get(export_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, loaded: Result<Atlas>) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState::new(config, loaded));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.ready_or_reload().await {
        Ok(loaded) => {
            let settings = PageSettings {
                map: &loaded.atlas.config().map,
                debounce_ms: loaded.atlas.config().filter.debounce_ms,
            };
            match json_for_script(&settings) {
                Ok(json) => Html(page::INDEX_HTML.replace("__ATLAS_SETTINGS__", &json)).into_response(),
                Err(err) => ApiError::internal(err.into()).into_response(),
            }
        }
        Err(message) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Html(page::LOAD_ERROR_HTML.replace("__ERROR_MESSAGE__", &escape_html(&message))),
        )
            .into_response(),
    }
}

async fn groups_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let loaded = state.ready().await?;
    let atlas = &loaded.atlas;
    let features = to_feature_collection(atlas.records(), atlas.groups(), atlas.palette());
    Ok(Json(features).into_response())
}

async fn categories_handler(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let loaded = state.ready().await?;
    Ok(Json(loaded.atlas.categories().to_vec()))
}

/// Query: `preset=compact|standard` plus one `type=Name:count` per organization type.
async fn cluster_icon_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let loaded = state.ready().await?;

    let mut size = IconSize::default();
    let mut entries = Vec::new();
    for (key, value) in &pairs {
        match key.as_str() {
            "preset" => size = value.parse::<IconSize>().map_err(ApiError::bad_request)?,
            "type" => entries.push(value.as_str()),
            other => {
                return Err(ApiError::bad_request(anyhow::anyhow!("Unknown icon parameter '{}'", other)));
            }
        }
    }
    let counts = parse_type_counts(entries).map_err(ApiError::bad_request)?;

    let svg = loaded.atlas.cluster_icon(&counts, size).to_svg();
    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        svg,
    )
        .into_response())
}

async fn detail_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DetailQuery>,
) -> Result<Html<String>, ApiError> {
    let loaded = state.ready().await?;
    let atlas = &loaded.atlas;

    let group = match (params.key.as_deref(), params.lat, params.lon) {
        (Some(key), _, _) => atlas.group_by_key(&CoordKey::from(key)),
        (None, Some(lat), Some(lon)) => atlas.group_at(lat, lon),
        _ => return Err(ApiError::bad_request(anyhow::anyhow!("Expected 'key' or both 'lat' and 'lon'"))),
    };

    match group {
        Some(group) => Ok(Html(atlas.detail_panel(group))),
        None => Err(ApiError::not_found("No organizations at this location")),
    }
}

fn filter_query(pairs: &[(String, String)]) -> Result<FilterState, ApiError> {
    filter_from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))).map_err(ApiError::bad_request)
}

async fn filter_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionQuery>,
    Json(filter): Json<FilterState>,
) -> Result<StatusCode, ApiError> {
    let loaded = state.ready().await?;
    if loaded.push_filter(params.session, filter) {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(ApiError::not_found("Unknown filter session; reopen the event stream"))
    }
}

/// Table for the filter in the query string, independent of any session.
async fn table_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let loaded = state.ready().await?;
    let view = loaded.atlas.view(filter_query(&pairs)?);
    Ok(Json(TablePayload::from(&view)).into_response())
}

fn session_event(id: u64) -> Event {
    Event::default().event("session").data(serde_json::json!({ "session": id }).to_string())
}

fn table_event(view: &FilteredView) -> Event {
    match serde_json::to_string(&TablePayload::from(view)) {
        Ok(json) => Event::default().event("table").data(json),
        Err(err) => {
            warn!("Failed to serialize table update: {}", err);
            Event::default().comment("serialization failed")
        }
    }
}

/// Opens a filter session: a `session` event with its id, the unfiltered table,
/// then one `table` event per settled filter posted to that session.
async fn table_events_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let loaded = state.ready().await?;
    let (session, mut updates) = loaded.open_session();
    let opened = session_event(session.id);
    let first = table_event(&updates.borrow_and_update());

    let rest = stream::unfold((updates, session), |(mut updates, session)| async move {
        updates.changed().await.ok()?;
        let event = table_event(&updates.borrow_and_update());
        Some((event, (updates, session)))
    });
    let events = stream::iter([opened, first]).chain(rest).map(Ok);

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn export_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let loaded = state.ready().await?;
    let filter = filter_query(&pairs)?;
    let csv = loaded.atlas.export_csv(&filter).map_err(ApiError::internal)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"organizations.csv\""),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::read_organizations;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    const CSV: &str = "OrganizationName;OrganizationType;FinalCategories;Headquarter;WebsiteUrl;AiSummary;Latitude;Longitude\n\
        Acme;Startup;Fintech;Berlin;https://acme.io;Payments;52,5;13,4\n\
        Beta;Accelerator;;Berlin;;;52.5;13.4\n\
        <i>Gamma</i>;;Health;Munich;;;48.137;11.575\n";

    fn config() -> AppConfig {
        AppConfig::from_toml("[input]\ndata_csv = \"/nonexistent/orgs.csv\"\n").unwrap()
    }

    fn ready_state() -> Arc<AppState> {
        let data = read_organizations(CSV.as_bytes(), b';').unwrap();
        let atlas = Atlas::new(config(), data);
        Arc::new(AppState::new(config(), Ok(atlas)))
    }

    fn ready_app() -> Router {
        router(ready_state())
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app.oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn post_filter(app: Router, uri: &str, json: &'static str) -> StatusCode {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json))
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    /// Next named SSE event on the stream, skipping keep-alive comments.
    async fn next_event(body: &mut Body) -> (String, serde_json::Value) {
        loop {
            let frame = body.frame().await.expect("event stream ended").unwrap();
            let Ok(bytes) = frame.into_data() else { continue };
            let text = String::from_utf8(bytes.to_vec()).unwrap();

            let mut name = None;
            let mut data = None;
            for line in text.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    name = Some(value.trim_start().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data = Some(value.trim_start().to_string());
                }
            }
            if let (Some(name), Some(data)) = (name, data) {
                return (name, serde_json::from_str(&data).unwrap());
            }
        }
    }

    /// Opens `/api/table/events`, returning the session id and the stream after its first table.
    async fn open_session(app: Router) -> (u64, serde_json::Value, Body) {
        let response = app
            .oneshot(Request::get("/api/table/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        let mut body = response.into_body();

        let (name, opened) = next_event(&mut body).await;
        assert_eq!(name, "session");
        let (name, table) = next_event(&mut body).await;
        assert_eq!(name, "table");
        (opened["session"].as_u64().unwrap(), table, body)
    }

    #[tokio::test]
    async fn index_embeds_map_settings() {
        let (status, body) = get(ready_app(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("__ATLAS_SETTINGS__"));
        assert!(body.contains("\"max_cluster_radius\":50"));
        assert!(body.contains("\"debounce_ms\":300"));
    }

    #[tokio::test]
    async fn failed_load_serves_error_page_with_reload() {
        let app = router(Arc::new(AppState::new(config(), Err(anyhow::anyhow!("file <missing>")))));

        let (status, body) = get(app.clone(), "/").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("Reload"));
        assert!(body.contains("Failed to open CSV file"));
        assert!(!body.contains("<missing>"));

        let (status, _) = get(app, "/api/groups").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn failed_load_is_retried_on_page_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orgs.csv");
        std::fs::write(&path, CSV).unwrap();
        let config = AppConfig::from_toml(&format!("[input]\ndata_csv = {:?}\n", path)).unwrap();
        let app = router(Arc::new(AppState::new(config, Err(anyhow::anyhow!("file was missing")))));

        let (status, _) = get(app.clone(), "/api/groups").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = get(app.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"debounce_ms\":300"));
        let (status, _) = get(app, "/api/groups").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn loaded_index_only_needs_a_read_lock() {
        let state = ready_state();
        let app = router(Arc::clone(&state));
        let _reader = state.data.read().await;

        let (status, _) = tokio::time::timeout(Duration::from_secs(1), get(app, "/"))
            .await
            .expect("index waited for the write lock");
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn groups_are_served_as_geojson() {
        let (status, body) = get(ready_app(), "/api/groups").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"].as_array().unwrap().len(), 2);
        assert_eq!(json["features"][0]["properties"]["count"], 2);
    }

    #[tokio::test]
    async fn cluster_icon_is_svg() {
        let app = ready_app();
        let response = app
            .clone()
            .oneshot(
                Request::get("/api/cluster-icon.svg?preset=compact&type=Startup:1200&type=Investor:3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let svg = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(svg.contains(">1203</text>"));
        assert!(svg.contains("fill=\"#2563eb\""));

        let (status, _) = get(app.clone(), "/api/cluster-icon.svg?type=Startup:x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get(app.clone(), "/api/cluster-icon.svg?type=Startup:1&preset=huge").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get(app, "/api/cluster-icon.svg?ids=0,1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn detail_resolves_key_and_click() {
        let app = ready_app();
        let (status, body) = get(app.clone(), "/api/detail?key=52.5,13.4").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Acme") && body.contains("Beta"));

        let (status, body) = get(app.clone(), "/api/detail?lat=48.137&lon=11.575").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("&lt;i&gt;Gamma&lt;/i&gt;"));

        let (status, _) = get(app.clone(), "/api/detail?lat=0&lon=0").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get(app, "/api/detail").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn export_applies_query_filter() {
        let (status, body) = get(ready_app(), "/api/export.csv?type=other").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Beta"));
        assert!(!body.contains("Acme"));

        let (status, _) = get(ready_app(), "/api/export.csv?type=vc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn table_follows_the_query_filter() {
        let app = ready_app();
        let (status, body) = get(app.clone(), "/api/table").await;
        assert_eq!(status, StatusCode::OK);
        let all: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(all["total"], 3);

        let (_, body) = get(app.clone(), "/api/table?type=startup&category=Health").await;
        let health: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(health["total"], 1);
        assert_eq!(health["filter"]["type_bucket"], "startup");

        let (status, _) = get(app, "/api/table?type=vc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn event_stream_delivers_the_settled_filter() {
        let app = ready_app();
        let (session, initial, mut events) = open_session(app.clone()).await;
        assert_eq!(initial["total"], 3);

        let uri = format!("/api/filter?session={session}");
        let status = post_filter(app.clone(), &uri, r#"{"type_bucket":"other"}"#).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let status = post_filter(app, &uri, r#"{"type_bucket":"startup","categories":["Health"]}"#).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (name, settled) = next_event(&mut events).await;
        assert_eq!(name, "table");
        assert_eq!(settled["total"], 1);
        assert_eq!(settled["filter"]["type_bucket"], "startup");
        assert!(settled["html"].as_str().unwrap().contains("Gamma"));
    }

    #[tokio::test(start_paused = true)]
    async fn clients_keep_independent_tables() {
        let app = ready_app();
        let (session_a, _, mut events_a) = open_session(app.clone()).await;
        let (session_b, _, mut events_b) = open_session(app.clone()).await;
        assert_ne!(session_a, session_b);

        let status = post_filter(app.clone(), &format!("/api/filter?session={session_a}"), r#"{"type_bucket":"other"}"#).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (_, table_a) = next_event(&mut events_a).await;
        assert_eq!(table_a["total"], 1);
        assert_eq!(table_a["filter"]["type_bucket"], "other");

        assert!(tokio::time::timeout(Duration::from_secs(5), next_event(&mut events_b)).await.is_err());
        let (_, body) = get(app, "/api/table").await;
        let table_b: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(table_b["total"], 3);
        assert!(table_b["filter"]["type_bucket"].is_null());
    }

    #[tokio::test]
    async fn closed_or_unknown_sessions_reject_filters() {
        let state = ready_state();
        let app = router(Arc::clone(&state));
        let (session, _, events) = open_session(app.clone()).await;
        let uri = format!("/api/filter?session={session}");
        assert_eq!(post_filter(app.clone(), &uri, "{}").await, StatusCode::ACCEPTED);

        drop(events);
        let loaded = state.ready().await.ok().unwrap();
        assert_eq!(loaded.sessions().len(), 0);
        assert_eq!(post_filter(app.clone(), &uri, "{}").await, StatusCode::NOT_FOUND);
        assert_eq!(post_filter(app.clone(), "/api/filter?session=99", "{}").await, StatusCode::NOT_FOUND);
        assert_eq!(post_filter(app, "/api/filter", "{}").await, StatusCode::BAD_REQUEST);
    }
}
