//! Integration tests for the HTTP API
//!
//! Routes are driven in-process with tower's oneshot; the WebSocket handshake
//! runs over an in-memory stream and a recording sink. Sessions use replay
//! devices unless a test needs a slower camera.

use axum::{
    body::Body,
    extract::ws::Message,
    http::{Request, StatusCode},
};
use distguide::config::CalibrationConfig;
use distguide::core::api::run_handshake;
use distguide::core::{
    create_router, AppState, DeviceProvider, Devices, FaceDetector, Frame, FrameSource,
    OperatorInput, ReplayProvider, Trace,
};
use distguide::error::CalibrationError;
use distguide::types::{BoundingBox, OperatorCommand, Outcome};
use futures_util::{stream, Sink};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::ServiceExt;

fn confirming_trace() -> Trace {
    let mut trace = Trace::new(640, 480, 100);
    trace.push(Vec::new(), OperatorCommand::Lock);
    let face = trace.centered_face(14.0 * 800.0 / 152.4);
    trace.repeat_face(face, 80);
    trace
}

fn quitting_trace() -> Trace {
    let mut trace = Trace::new(640, 480, 100);
    trace.push(Vec::new(), OperatorCommand::Quit);
    trace
}

fn create_test_state(trace: Trace) -> Arc<AppState> {
    Arc::new(AppState::new(
        CalibrationConfig::default(),
        Arc::new(ReplayProvider::new(trace)),
    ))
}

fn calibrate_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/calibrate")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// HTTP
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(create_test_state(confirming_trace()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["session_active"], false);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_calibrate_confirms() {
    let state = create_test_state(confirming_trace());
    let app = create_router(state.clone());

    let response = app
        .oneshot(calibrate_request(r#"{"screen_size_inches": 24}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["outcome"], "CONFIRMED");
    assert_eq!(json["token"], "CALIBRATION_OK");
    assert!((json["ideal_distance_cm"].as_f64().unwrap() - 152.4).abs() < 1e-9);

    // Slot is freed once the session ends
    assert!(!state.session_active());
}

#[tokio::test]
async fn test_calibrate_reports_abandonment() {
    let app = create_router(create_test_state(quitting_trace()));

    let response = app
        .oneshot(calibrate_request(r#"{"screen_size_inches": 24}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["token"], "CALIBRATION_ABANDONED");
}

#[tokio::test]
async fn test_negative_screen_size_is_bad_request() {
    let app = create_router(create_test_state(confirming_trace()));

    let response = app
        .oneshot(calibrate_request(r#"{"screen_size_inches": -5}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], 3002);
}

#[tokio::test]
async fn test_unavailable_camera_is_service_unavailable() {
    let state = create_test_state(Trace::unavailable());
    let app = create_router(state.clone());

    let response = app
        .oneshot(calibrate_request(r#"{"screen_size_inches": 24}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["code"], 3001);
    assert!(!state.session_active());
}

#[tokio::test]
async fn test_second_session_is_rejected_while_busy() {
    let state = create_test_state(confirming_trace());
    let app = create_router(state.clone());

    let slot = state.try_acquire().unwrap();
    let response = app
        .clone()
        .oneshot(calibrate_request(r#"{"screen_size_inches": 24}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    drop(slot);
    let response = app
        .oneshot(calibrate_request(r#"{"screen_size_inches": 24}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// SESSION OWNERSHIP
// =============================================================================

/// Cameras open right now, and the most ever open at once
#[derive(Default)]
struct CameraCount {
    held: AtomicUsize,
    max_held: AtomicUsize,
}

/// Ten blank frames, 20ms apart in real time
struct SlowCamera {
    count: Arc<CameraCount>,
    frames: u64,
    open: bool,
}

impl FrameSource for SlowCamera {
    fn open(&mut self) -> Result<(), CalibrationError> {
        let held = self.count.held.fetch_add(1, Ordering::SeqCst) + 1;
        self.count.max_held.fetch_max(held, Ordering::SeqCst);
        self.open = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CalibrationError> {
        if self.frames == 10 {
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(20));
        self.frames += 1;
        Ok(Some(Frame {
            index: self.frames,
            width: 640,
            height: 480,
            captured_at: Instant::now(),
        }))
    }

    fn release(&mut self) {
        if self.open {
            self.open = false;
            self.count.held.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

struct NoFaces;

impl FaceDetector for NoFaces {
    fn detect(&mut self, _frame: &Frame) -> Vec<BoundingBox> {
        Vec::new()
    }
}

struct Idle;

impl OperatorInput for Idle {
    fn poll(&mut self) -> OperatorCommand {
        OperatorCommand::None
    }
}

struct SlowProvider {
    count: Arc<CameraCount>,
}

impl DeviceProvider for SlowProvider {
    fn devices(&self) -> Devices {
        Devices {
            source: Box::new(SlowCamera {
                count: Arc::clone(&self.count),
                frames: 0,
                open: false,
            }),
            detector: Box::new(NoFaces),
            input: Box::new(Idle),
        }
    }
}

#[tokio::test]
async fn test_caller_giving_up_keeps_camera_claimed_until_worker_ends() {
    let count = Arc::new(CameraCount::default());
    let provider = SlowProvider {
        count: Arc::clone(&count),
    };
    let state = AppState::new(CalibrationConfig::default(), Arc::new(provider));

    let first = tokio::time::timeout(Duration::from_millis(50), state.run_calibration(24.0)).await;
    assert!(first.is_err(), "worker should outlive the caller");
    assert!(state.session_active());

    let second = state.run_calibration(24.0).await;
    assert_eq!(second.unwrap_err(), CalibrationError::SessionBusy);

    for _ in 0..200 {
        if !state.session_active() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!state.session_active());
    assert_eq!(count.held.load(Ordering::SeqCst), 0);

    let third = state.run_calibration(24.0).await.unwrap();
    assert_eq!(third.outcome, Outcome::Abandoned);
    assert_eq!(count.max_held.load(Ordering::SeqCst), 1);
}

// =============================================================================
// WEBSOCKET HANDSHAKE
// =============================================================================

/// Sink that keeps every message sent to the caller
#[derive(Default)]
struct RecordingSink {
    sent: Vec<Message>,
}

impl Sink<Message> for RecordingSink {
    type Error = Infallible;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), Infallible> {
        self.get_mut().sent.push(item);
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }
}

async fn handshake(state: &AppState, incoming: Vec<Message>) -> Vec<Message> {
    let mut sink = RecordingSink::default();
    let frames = stream::iter(incoming.into_iter().map(Ok::<_, Infallible>));
    run_handshake(&mut sink, frames, state).await;
    sink.sent
}

fn text(msg: &str) -> Message {
    Message::Text(msg.to_string())
}

fn reply_text(sent: &[Message]) -> String {
    match sent.first() {
        Some(Message::Text(reply)) => reply.clone(),
        other => panic!("expected a text reply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ws_confirm_sends_token_then_close() {
    let state = create_test_state(confirming_trace());
    let sent = handshake(&state, vec![text("24")]).await;
    assert_eq!(sent, vec![text("CALIBRATION_OK"), Message::Close(None)]);
}

#[tokio::test]
async fn test_ws_abandon_sends_abandoned_token() {
    let state = create_test_state(quitting_trace());
    let sent = handshake(&state, vec![text("24")]).await;
    assert_eq!(sent, vec![text("CALIBRATION_ABANDONED"), Message::Close(None)]);
}

#[tokio::test]
async fn test_ws_skips_non_text_frames() {
    let state = create_test_state(confirming_trace());
    let incoming = vec![
        Message::Ping(vec![1]),
        Message::Binary(vec![0, 1, 2]),
        text(" 24 "),
    ];
    let sent = handshake(&state, incoming).await;
    assert_eq!(sent.len(), 2);
    assert_eq!(reply_text(&sent), "CALIBRATION_OK");
}

#[tokio::test]
async fn test_ws_non_numeric_size_is_rejected_without_camera() {
    let provider = ReplayProvider::new(confirming_trace());
    let stats = provider.stats();
    let state = AppState::new(CalibrationConfig::default(), Arc::new(provider));

    let sent = handshake(&state, vec![text("abc")]).await;
    assert!(reply_text(&sent).starts_with("ERROR 3002: "));
    assert_eq!(sent[1], Message::Close(None));
    assert_eq!(stats.opened(), 0);
}

#[tokio::test]
async fn test_ws_busy_server_replies_3004() {
    let state = create_test_state(confirming_trace());
    let _slot = state.try_acquire().unwrap();

    let sent = handshake(&state, vec![text("24")]).await;
    assert_eq!(
        reply_text(&sent),
        "ERROR 3004: A calibration session is already running"
    );
    assert_eq!(sent.len(), 2);
}

#[tokio::test]
async fn test_ws_caller_leaving_early_gets_nothing() {
    let state = create_test_state(confirming_trace());
    assert!(handshake(&state, vec![Message::Close(None)]).await.is_empty());
    assert!(handshake(&state, Vec::new()).await.is_empty());
}
