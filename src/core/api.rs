//! HTTP + WebSocket API for calibration
//!
//! Endpoints:
//! - WS /calibrate - send screen size, receive one outcome token
//! - POST /calibrate - JSON request, waits for the outcome
//! - GET /health - Health check
//!
//! Only one session may hold the camera at a time.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CalibrationConfig;
use crate::core::devices::DeviceProvider;
use crate::core::session::{
    parse_screen_size, validate_screen_size, CalibrationSession, SessionSlot,
};
use crate::error::{log_calibration_error, CalibrationError, ErrorCode};
use crate::types::Outcome;

/// App state
pub struct AppState {
    pub config: CalibrationConfig,
    provider: Arc<dyn DeviceProvider>,
    active: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: CalibrationConfig, provider: Arc<dyn DeviceProvider>) -> Self {
        Self {
            config,
            provider,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claim the single session slot
    pub fn try_acquire(&self) -> Result<SessionSlot, CalibrationError> {
        SessionSlot::try_claim(&self.active)
    }

    pub fn session_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Run one full session and wait for its outcome
    ///
    /// The slot moves into the session, so a caller that stops waiting does
    /// not free the camera while the worker still holds it.
    pub async fn run_calibration(
        &self,
        screen_size_inches: f64,
    ) -> Result<CalibrateResponse, CalibrationError> {
        let screen_size_inches = validate_screen_size(screen_size_inches)?;
        let slot = self.try_acquire()?;

        let session =
            CalibrationSession::new(self.config.clone(), self.provider.devices()).with_slot(slot);
        let handle = tokio::task::spawn_blocking(move || session.start(screen_size_inches))
            .await
            .map_err(|e| CalibrationError::acquisition(format!("session start failed: {}", e)))??;
        let ideal_distance_cm = handle.ideal_distance_cm();
        let outcome = handle.outcome().await?;

        Ok(CalibrateResponse {
            outcome,
            token: outcome.token().to_string(),
            ideal_distance_cm,
        })
    }
}

/// Calibrate request
#[derive(Debug, Deserialize)]
pub struct CalibrateRequest {
    pub screen_size_inches: f64,
}

/// Calibrate response
#[derive(Debug, Serialize)]
pub struct CalibrateResponse {
    pub outcome: Outcome,
    pub token: String,
    pub ideal_distance_cm: f64,
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub message: String,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub session_active: bool,
}

impl IntoResponse for CalibrationError {
    fn into_response(self) -> Response {
        let status = match self {
            CalibrationError::InputValidation { .. } => StatusCode::BAD_REQUEST,
            CalibrationError::SessionBusy => StatusCode::CONFLICT,
            CalibrationError::Acquisition { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CalibrationError::InvalidMeasurement { .. } | CalibrationError::OutcomeLost => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorResponse {
            code: self.code(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/calibrate", get(websocket_handler).post(calibrate))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        session_active: state.session_active(),
    })
}

/// Run a session for a JSON request
async fn calibrate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CalibrateRequest>,
) -> Result<Json<CalibrateResponse>, CalibrationError> {
    match state.run_calibration(req.screen_size_inches).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            log_calibration_error(&err, "POST /calibrate");
            Err(err)
        }
    }
}

/// WebSocket handler for the calibration handshake
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Wire reply for a rejected request
pub fn error_message(err: &CalibrationError) -> String {
    format!("ERROR {}: {}", err.code(), err.message())
}

/// WebSocket connection on /calibrate
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, receiver) = socket.split();
    info!("caller connected");
    run_handshake(sender, receiver, &state).await;
}

/// One screen size in, one token or error reply out, then Close
///
/// Non-text frames before the screen size are skipped.
pub async fn run_handshake<S, R, E>(mut sender: S, mut receiver: R, state: &AppState)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let text = loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => break text,
            Some(Ok(Message::Close(_))) | None => {
                debug!("caller left before sending a screen size");
                return;
            }
            Some(Ok(_)) => continue,
            Some(Err(err)) => {
                warn!(%err, "websocket receive failed");
                return;
            }
        }
    };

    let reply = match parse_screen_size(&text) {
        Ok(screen_size_inches) => match state.run_calibration(screen_size_inches).await {
            Ok(response) => response.token,
            Err(err) => {
                log_calibration_error(&err, "WS /calibrate");
                error_message(&err)
            }
        },
        Err(err) => {
            log_calibration_error(&err, "WS /calibrate");
            error_message(&err)
        }
    };

    if let Err(err) = sender.send(Message::Text(reply)).await {
        warn!(%err, "caller disconnected before the outcome was delivered");
        return;
    }
    if let Err(err) = sender.send(Message::Close(None)).await {
        debug!(%err, "close frame not delivered");
    }
}

/// Run the API server
pub async fn run_server(
    addr: &str,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "distguide listening");
    info!("  WS   /calibrate  - screen size in, outcome token out");
    info!("  POST /calibrate  - JSON calibration request");
    info!("  GET  /health     - Health check");
    axum::serve(listener, router).await?;
    Ok(())
}
