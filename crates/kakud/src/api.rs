use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::engine::CoverCommand;
use crate::engine::Engine;
use crate::engine::EngineError;
use crate::engine::LightCommand;
use crate::engine::LightRequest;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    version: &'static str,
    engine: Arc<Engine>,
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
        }),
    )
}

/// Handler for GET /v1/state
#[tracing::instrument(skip(state))]
async fn engine_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.engine.state_snapshot();
    (StatusCode::OK, Json(snapshot.as_ref().clone()))
}

/// Handler for POST /v1/lights/:entity_id/turn_on
///
/// The body is optional: `{"brightness": 0-255, "color_temp": n}`. An empty
/// body turns the light on with defaults; a body that does not parse is
/// rejected instead of being ignored.
#[tracing::instrument(skip(state, body))]
async fn light_turn_on(
    State(state): State<Arc<AppState>>,
    Path(entity_id): Path<String>,
    body: Bytes,
) -> Response {
    let request = if body.is_empty() {
        LightRequest::default()
    } else {
        match serde_json::from_slice::<LightRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("Rejecting turn_on body for {}: {}", entity_id, e);
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(ErrorResponse {
                        error: format!("Invalid light request: {}", e),
                    }),
                )
                    .into_response();
            }
        }
    };
    send_light(&state, entity_id, LightCommand::TurnOn(request))
}

/// Handler for POST /v1/lights/:entity_id/turn_off
#[tracing::instrument(skip(state))]
async fn light_turn_off(
    State(state): State<Arc<AppState>>,
    Path(entity_id): Path<String>,
) -> Response {
    send_light(&state, entity_id, LightCommand::TurnOff)
}

/// Handler for POST /v1/covers/:entity_id/:command
#[tracing::instrument(skip(state))]
async fn cover_command(
    State(state): State<Arc<AppState>>,
    Path((entity_id, command)): Path<(String, CoverCommand)>,
) -> Response {
    if !entity_id.starts_with("cover.") {
        return not_found(entity_id);
    }
    accepted(state.engine.send_cover_command(entity_id, command))
}

fn send_light(state: &AppState, entity_id: String, command: LightCommand) -> Response {
    if !entity_id.starts_with("light.") {
        return not_found(entity_id);
    }
    accepted(state.engine.send_light_command(entity_id, command))
}

/// Commands are fire-and-forget, so success is 202 rather than 200
fn accepted(result: Result<(), EngineError>) -> Response {
    match result {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(EngineError::UnknownEntity(entity_id)) => not_found(entity_id),
        Err(e @ EngineError::IntegrationStopped(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

fn not_found(entity_id: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Unknown entity: {}", entity_id),
        }),
    )
        .into_response()
}

/// Create the API router with all endpoints
fn create_router(engine: Arc<Engine>) -> Router {
    let state = Arc::new(AppState {
        version: env!("CARGO_PKG_VERSION"),
        engine,
    });

    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/state", get(engine_state))
        .route("/v1/lights/:entity_id/turn_on", post(light_turn_on))
        .route("/v1/lights/:entity_id/turn_off", post(light_turn_off))
        .route("/v1/covers/:entity_id/:command", post(cover_command))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP API server
///
/// This function will bind to the specified address and serve the API endpoints.
/// It will run until the provided shutdown signal is triggered.
///
/// # Arguments
/// * `listen` - The IP address to listen on (e.g., "127.0.0.1")
/// * `port` - The port to listen on (e.g., 8565)
/// * `engine` - Engine that commands are routed through
/// * `shutdown_rx` - A oneshot receiver that will trigger graceful shutdown
pub async fn serve(
    listen: String,
    port: u16,
    engine: Arc<Engine>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let app = create_router(engine);

    let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::integrations::ics2000::Ics2000Integration;
    use crate::integrations::ics2000::RetryPolicy;
    use crate::integrations::ics2000::catalog::HubOperation;
    use crate::integrations::ics2000::hub::Device;
    use crate::integrations::ics2000::hub::DeviceId;
    use crate::integrations::ics2000::hub::DeviceKind;
    use crate::integrations::ics2000::hub::mock::MockHub;

    /// Start an engine with one Zigbee lamp and one sunshade
    async fn start_engine() -> (Arc<Engine>, Arc<MockHub>) {
        let hub = Arc::new(MockHub::with_devices(vec![
            Device {
                id: DeviceId(5),
                name: "Desk".to_string(),
                kind: DeviceKind::ZigbeeLamp,
            },
            Device {
                id: DeviceId(6),
                name: "Screen".to_string(),
                kind: DeviceKind::Sunshade,
            },
        ]));

        let mut engine = Engine::new();
        engine.register_integration(
            "ics2000".to_string(),
            Box::new(Ics2000Integration::with_policy(
                hub.clone(),
                RetryPolicy::default(),
            )),
        );
        let engine = Arc::new(engine);

        let runner = engine.clone();
        tokio::spawn(async move { runner.run().await });

        wait_for(|| {
            let state = engine.state_snapshot();
            state.lights.contains_key("light.desk") && state.covers.contains_key("cover.screen")
        })
        .await;

        (engine, hub)
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not met in time");
    }

    #[tokio::test]
    async fn test_ping() {
        let app = create_router(Arc::new(Engine::new()));

        let response = app
            .oneshot(Request::get("/v1/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_turn_on_is_accepted_and_dispatched() {
        let (engine, hub) = start_engine().await;
        let app = create_router(engine.clone());

        let response = app
            .oneshot(
                Request::post("/v1/lights/light.desk/turn_on")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"brightness": 100, "color_temp": 300}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        wait_for(|| hub.calls().len() == 3).await;
        wait_for(|| engine.state_snapshot().lights["light.desk"].on == Some(true)).await;

        let state = engine.state_snapshot();
        assert_eq!(state.lights["light.desk"].brightness, Some(100));
        assert_eq!(state.lights["light.desk"].color_temp, Some(300));
    }

    #[tokio::test]
    async fn test_turn_on_without_body() {
        let (engine, hub) = start_engine().await;
        let app = create_router(engine);

        let response = app
            .oneshot(
                Request::post("/v1/lights/light.desk/turn_on")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        wait_for(|| !hub.calls().is_empty()).await;
        assert_eq!(hub.operations(), vec![(DeviceId(5), HubOperation::ZigbeeOn)]);
    }

    #[tokio::test]
    async fn test_invalid_turn_on_body_is_rejected() {
        let (engine, hub) = start_engine().await;
        let app = create_router(engine.clone());

        for body in [r#"{"brightness": 300, "color_temp": 250}"#, "{not json"] {
            let response = app
                .clone()
                .oneshot(
                    Request::post("/v1/lights/light.desk/turn_on")
                        .header("content-type", "application/json")
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
        }

        // Nothing was dispatched and the light was never turned on
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(hub.calls().is_empty());
        assert_eq!(engine.state_snapshot().lights["light.desk"].on, None);
    }

    #[tokio::test]
    async fn test_state_is_served_as_json() {
        let (engine, _hub) = start_engine().await;
        let app = create_router(engine);

        let response = app
            .oneshot(Request::get("/v1/state").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let state: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            state["lights"]["light.desk"],
            serde_json::json!({"on": null, "brightness": null, "color_temp": null})
        );
        assert_eq!(
            state["covers"]["cover.screen"],
            serde_json::json!({"last_command": null})
        );
    }

    #[tokio::test]
    async fn test_cover_command() {
        let (engine, hub) = start_engine().await;
        let app = create_router(engine);

        let response = app
            .oneshot(
                Request::post("/v1/covers/cover.screen/open")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        wait_for(|| !hub.calls().is_empty()).await;
        assert_eq!(hub.operations(), vec![(DeviceId(6), HubOperation::Open)]);
    }

    #[tokio::test]
    async fn test_unknown_entity_is_not_found() {
        let (engine, _hub) = start_engine().await;
        let app = create_router(engine);

        let response = app
            .clone()
            .oneshot(
                Request::post("/v1/lights/light.attic/turn_off")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Right entity, wrong platform
        let response = app
            .oneshot(
                Request::post("/v1/lights/cover.screen/turn_on")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
