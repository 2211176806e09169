//! REST API for the basket table.
//!
//! Exposes one shared `TableSession` to the input and render side: drops,
//! basket placement, apple packing and sorting over HTTP, plus a
//! Server-Sent Events stream of every table change. Uses Axum as the web
//! framework and supports CORS.

use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, EngineConfig};
use crate::error::TableError;
use crate::layout::BasketMove;
use crate::model::{Apple, Basket, BasketSize, ValidationError};
use crate::session::{DropEvent, DropOutcome, TableEvent, TableSession, TokenKind};
use crate::types::{BoundingBox, Vec2};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Shared handler state: the session and the change feed.
#[derive(Clone)]
pub struct ApiState {
    session: Arc<Mutex<TableSession>>,
    events: broadcast::Sender<TableEvent>,
}

impl ApiState {
    pub fn new(session: TableSession) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            session: Arc::new(Mutex::new(session)),
            events,
        }
    }

    /// Locks the session for one whole protocol run.
    fn session(&self) -> MutexGuard<'_, TableSession> {
        // Every protocol commits all-or-nothing, so a poisoned lock still
        // guards a consistent session
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: TableEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableEvent> {
        self.events.subscribe()
    }
}

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid engine configuration: {0}")]
    Config(#[from] ValidationError),
    #[error("could not bind API server to {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
    #[error("API server terminated with an error: {0}")]
    Serve(#[from] std::io::Error),
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>basket-table API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request to place a basket once the size dialog has been answered.
#[derive(Deserialize, Clone, ToSchema)]
#[schema(example = json!({ "position": { "x": 0.0, "y": 0.0 }, "width": 70, "height": 70 }))]
pub struct PlaceBasketRequest {
    pub position: Vec2,
    pub width: u32,
    pub height: u32,
}

impl PlaceBasketRequest {
    fn into_validated(self) -> Result<(Vec2, BasketSize), ValidationError> {
        if !self.position.is_finite() {
            return Err(ValidationError::InvalidBasketSize(
                "Position must be finite".to_string(),
            ));
        }
        let size = BasketSize::new(self.width, self.height)?;
        Ok((self.position, size))
    }
}

/// A basket as seen by the render side.
#[derive(Serialize, ToSchema)]
pub struct BasketView {
    pub id: usize,
    /// Width in basket units
    pub width: f64,
    /// Height in basket units
    pub height: f64,
    pub position: Vec2,
    pub size: Vec2,
    pub bounds: BoundingBox,
    pub apple_count: usize,
    pub max_apples: usize,
    pub remaining_capacity: usize,
    pub apples: Vec<Apple>,
}

impl From<&Basket> for BasketView {
    fn from(basket: &Basket) -> Self {
        Self {
            id: basket.id,
            width: basket.width,
            height: basket.height,
            position: basket.position,
            size: basket.size,
            bounds: basket.bounding_box(),
            apple_count: basket.apple_count(),
            max_apples: basket.max_apples,
            remaining_capacity: basket.remaining_capacity(),
            apples: basket.apples.clone(),
        }
    }
}

/// Everything needed to redraw the table.
#[derive(Serialize, ToSchema)]
pub struct TableSnapshot {
    pub table: BoundingBox,
    pub max_baskets: usize,
    pub baskets: Vec<BasketView>,
}

impl TableSnapshot {
    pub fn from_session(session: &TableSession) -> Self {
        Self {
            table: *session.table().bounds(),
            max_baskets: session.config().max_baskets,
            baskets: session.baskets().iter().map(BasketView::from).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AppleResponse {
    pub basket_id: usize,
    pub apple: Apple,
    pub apple_count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct SortResponse {
    pub rows: usize,
    pub moves: Vec<BasketMove>,
    pub table: TableSnapshot,
}

#[derive(Serialize, Deserialize, ToSchema)]
struct ErrorResponse {
    error: String,
    code: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, code: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    code: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, code, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        "invalid_json",
        err.to_string(),
    )
}

fn validation_error(err: ValidationError) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        "invalid_input",
        err.to_string(),
    )
}

fn table_error_response(err: &TableError) -> Response {
    let status = match err {
        TableError::UnknownBasket(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::CONFLICT,
    };
    let details = match err {
        TableError::ContainerFull | TableError::DegenerateContainer => {
            "Return the apple to its origin"
        }
        TableError::PlacementBlocked | TableError::OutsideTable => "Drop the basket somewhere else",
        TableError::CapacityExceeded { .. } => "No more baskets can be added",
        TableError::LayoutOverflow { .. } => "Baskets keep their current positions",
        TableError::UnknownBasket(_) => "Use an id from GET /table",
    };
    error_response(status, err.to_string(), err.code(), details)
}

#[derive(OpenApi)]
#[openapi(
    paths(get_table, handle_drop, place_basket, add_apple, sort_baskets, stream_events),
    components(
        schemas(
            Vec2,
            BoundingBox,
            Apple,
            TokenKind,
            DropEvent,
            DropOutcome,
            TableEvent,
            BasketMove,
            BasketView,
            TableSnapshot,
            PlaceBasketRequest,
            AppleResponse,
            SortResponse,
            ErrorResponse
        )
    ),
    tags((name = "table", description = "Endpoints for basket placement, packing and sorting"))
)]
struct ApiDoc;

/// Builds the application router around `state`.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/table", get(get_table))
        .route("/drop", post(handle_drop))
        .route("/baskets", post(place_basket))
        .route("/baskets/{id}/apples", post(add_apple))
        .route("/sort", post(sort_baskets))
        .route("/events", get(stream_events))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
pub async fn start_api_server(config: ApiConfig, engine: EngineConfig) -> Result<(), ServerError> {
    let session = TableSession::new(engine.table_config())?;
    let state = ApiState::new(session);
    let app = router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(
        host = config.display_host(),
        port = config.port(),
        "server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("local access: http://localhost:{}", config.port());
    }
    info!("endpoints: GET /table, POST /drop, POST /baskets, POST /baskets/{{id}}/apples, POST /sort, GET /events");
    info!("documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Handler for GET /table.
#[utoipa::path(
    get,
    path = "/table",
    responses((status = 200, description = "Current table state", body = TableSnapshot)),
    tag = "table"
)]
async fn get_table(State(state): State<ApiState>) -> Response {
    let session = state.session();
    (StatusCode::OK, Json(TableSnapshot::from_session(&session))).into_response()
}

/// Handler for POST /drop.
///
/// Resolves a completed drag gesture. Basket drops over the table answer
/// `size_requested`; apple drops pack an apple into the basket under the
/// release point.
#[utoipa::path(
    post,
    path = "/drop",
    request_body = DropEvent,
    responses(
        (status = 200, description = "Drop resolved", body = DropOutcome),
        (status = CONFLICT, description = "Basket under the apple is full", body = ErrorResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "table"
)]
async fn handle_drop(
    State(state): State<ApiState>,
    payload: Result<Json<DropEvent>, JsonRejection>,
) -> Response {
    let Json(event) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let mut session = state.session();
    match session.handle_drop(event) {
        Ok(outcome) => {
            if let DropOutcome::ApplePlaced { basket_id, apple } = outcome {
                let apple_count = session
                    .basket(basket_id)
                    .map(Basket::apple_count)
                    .unwrap_or_default();
                info!(basket_id, apple_count, "apple dropped into basket");
                state.publish(TableEvent::AppleAdded {
                    basket_id,
                    slot: apple.slot,
                    apple_count,
                });
            }
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(err) => {
            info!(reason = err.code(), "drop rejected");
            state.publish(TableEvent::rejected(&err));
            table_error_response(&err)
        }
    }
}

/// Handler for POST /baskets.
///
/// Places a basket at the position of an earlier `size_requested` drop.
#[utoipa::path(
    post,
    path = "/baskets",
    request_body = PlaceBasketRequest,
    responses(
        (status = 201, description = "Basket placed", body = BasketView),
        (status = CONFLICT, description = "Basket overlaps another one or the table is full", body = ErrorResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid basket size", body = ErrorResponse)
    ),
    tag = "table"
)]
async fn place_basket(
    State(state): State<ApiState>,
    payload: Result<Json<PlaceBasketRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };
    let (position, size) = match request.into_validated() {
        Ok(validated) => validated,
        Err(err) => return validation_error(err),
    };

    let mut session = state.session();
    match session.place_basket(position, f64::from(size.width), f64::from(size.height)) {
        Ok(basket) => {
            info!(
                id = basket.id,
                width = size.width,
                height = size.height,
                "basket placed"
            );
            let view = BasketView::from(basket);
            state.publish(TableEvent::basket_placed(basket));
            (StatusCode::CREATED, Json(view)).into_response()
        }
        Err(err) => {
            info!(reason = err.code(), "basket rejected");
            state.publish(TableEvent::rejected(&err));
            table_error_response(&err)
        }
    }
}

/// Handler for POST /baskets/{id}/apples.
#[utoipa::path(
    post,
    path = "/baskets/{id}/apples",
    params(("id" = usize, Path, description = "Basket id")),
    responses(
        (status = 201, description = "Apple packed", body = AppleResponse),
        (status = NOT_FOUND, description = "Unknown basket", body = ErrorResponse),
        (status = CONFLICT, description = "Basket is full", body = ErrorResponse)
    ),
    tag = "table"
)]
async fn add_apple(State(state): State<ApiState>, Path(id): Path<usize>) -> Response {
    let mut session = state.session();
    match session.add_apple(id) {
        Ok(apple) => {
            let apple_count = session
                .basket(id)
                .map(Basket::apple_count)
                .unwrap_or_default();
            state.publish(TableEvent::AppleAdded {
                basket_id: id,
                slot: apple.slot,
                apple_count,
            });
            let response = AppleResponse {
                basket_id: id,
                apple,
                apple_count,
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(err) => {
            info!(basket_id = id, reason = err.code(), "apple rejected");
            state.publish(TableEvent::rejected(&err));
            table_error_response(&err)
        }
    }
}

/// Handler for POST /sort.
///
/// Re-lays out all baskets on shelves, fullest first.
#[utoipa::path(
    post,
    path = "/sort",
    responses(
        (status = 200, description = "Baskets sorted", body = SortResponse),
        (status = CONFLICT, description = "Sorted baskets do not fit on the table", body = ErrorResponse)
    ),
    tag = "table"
)]
async fn sort_baskets(State(state): State<ApiState>) -> Response {
    let mut session = state.session();
    match session.sort_baskets_with_progress(|evt| state.publish(evt.clone())) {
        Ok(report) => {
            info!(
                baskets = report.moves.len(),
                rows = report.rows,
                "baskets sorted"
            );
            let response = SortResponse {
                rows: report.rows,
                moves: report.moves,
                table: TableSnapshot::from_session(&session),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            info!(reason = err.code(), "sort rejected");
            state.publish(TableEvent::rejected(&err));
            table_error_response(&err)
        }
    }
}

/// Handler for GET /events (SSE).
///
/// Streams every table change as a Server-Sent Event so the render side
/// can redraw without polling.
#[utoipa::path(
    get,
    path = "/events",
    responses((
        status = 200,
        description = "Streams table events in real-time",
        content_type = "text/event-stream",
        body = String
    )),
    tag = "table"
)]
async fn stream_events(State(state): State<ApiState>) -> impl IntoResponse {
    // Lagging subscribers skip missed events and resync via GET /table
    let stream = BroadcastStream::new(state.subscribe()).filter_map(|msg| {
        let evt = msg.ok()?;
        match serde_json::to_string(&evt) {
            Ok(json) => Some(Ok::<_, Infallible>(Event::default().data(json))),
            Err(err) => {
                error!(error = %err, "could not serialize table event");
                None
            }
        }
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(10))
            .text("keep-alive"),
    )
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
