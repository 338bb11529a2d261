//! Webhook relay server.
//!
//! Three routes: a health banner, the platform verification handshake, and
//! the signed delivery endpoint. Deliveries are acknowledged immediately;
//! the backend call and reply push run in a detached task per delivery, so
//! concurrent deliveries share nothing but read-only configuration.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::sync::{watch, RwLock};
use tower_http::trace::TraceLayer;

use counsel_core::persona::RELAY_FALLBACK_MESSAGE;
use counsel_llm::ChatBackend;

use crate::api::CloudApiClient;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::events::{self, DeliveryPayload, InboundMessage};
use crate::signature::{self, SIGNATURE_HEADER};

/// Shared state for the webhook handlers.
struct RelayState {
    config: RelayConfig,
    api: CloudApiClient,
    backend: Arc<dyn ChatBackend>,
}

/// Webhook relay bound to one phone number and one backend.
pub struct WhatsAppRelay {
    state: Arc<RelayState>,
    shutdown_tx: RwLock<Option<watch::Sender<()>>>,
}

impl WhatsAppRelay {
    pub fn new(config: RelayConfig, backend: Arc<dyn ChatBackend>) -> Result<Self, RelayError> {
        let api = CloudApiClient::new(
            &config.whatsapp_token,
            &config.phone_number_id,
            &config.graph_base_url,
        )?;

        Ok(Self {
            state: Arc::new(RelayState {
                config,
                api,
                backend,
            }),
            shutdown_tx: RwLock::new(None),
        })
    }

    /// Build the relay router. Exposed so tests drive it without a socket.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(handle_health))
            .route("/webhook", get(handle_verify).post(handle_delivery))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the listener and serve until [`stop`](Self::stop) is called.
    pub async fn start(&self) -> Result<(), RelayError> {
        if self.shutdown_tx.read().await.is_some() {
            return Err(RelayError::AlreadyRunning);
        }

        let app = self.router();
        let addr = format!(
            "{}:{}",
            self.state.config.bind_address, self.state.config.port
        );
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RelayError::Config(format!("bind failed on {}: {}", addr, e)))?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(());
        *self.shutdown_tx.write().await = Some(shutdown_tx);

        tokio::spawn(async move {
            tracing::info!(addr = %addr, "WhatsApp webhook relay listening");
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
                .unwrap_or_else(|e| tracing::error!("relay server error: {}", e));
        });

        Ok(())
    }

    /// Stop serving gracefully.
    pub async fn stop(&self) -> Result<(), RelayError> {
        match self.shutdown_tx.write().await.take() {
            Some(tx) => {
                let _ = tx.send(());
                tracing::info!("WhatsApp relay stopped");
                Ok(())
            }
            None => Err(RelayError::NotRunning),
        }
    }
}

/// Health banner.
async fn handle_health() -> impl IntoResponse {
    (
        StatusCode::OK,
        "AI Career Counselor WhatsApp webhook is running.",
    )
}

/// Query parameters of the platform verification handshake.
#[derive(Debug, Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// Setup handshake: echo the challenge only for a matching verify token.
async fn handle_verify(
    State(state): State<Arc<RelayState>>,
    Query(params): Query<VerifyParams>,
) -> impl IntoResponse {
    let token_matches =
        params.verify_token.as_deref() == Some(state.config.verify_token.as_str());

    if params.mode.as_deref() == Some("subscribe") && token_matches {
        tracing::info!("webhook verification handshake succeeded");
        (StatusCode::OK, params.challenge.unwrap_or_default())
    } else {
        tracing::warn!("webhook verification handshake failed");
        (StatusCode::FORBIDDEN, String::new())
    }
}

/// Signed delivery endpoint.
///
/// The 200 acknowledgement is sent as soon as the signature checks out and
/// the payload parses; processing outcome never changes the response.
async fn handle_delivery(
    State(state): State<Arc<RelayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let provided = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if let Err(err) = signature::verify_signature(&state.config.app_secret, &body, provided) {
        tracing::warn!(error = %err, "rejected unauthenticated delivery");
        return (StatusCode::UNAUTHORIZED, "invalid signature".to_string());
    }

    let payload: DeliveryPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(error = %err, "malformed delivery payload");
            return (StatusCode::BAD_REQUEST, "malformed payload".to_string());
        }
    };

    if let Some(message) = events::first_message(&payload).cloned() {
        let state = state.clone();
        tokio::spawn(async move {
            process_message(state, message).await;
        });
    }

    (StatusCode::OK, String::new())
}

/// Relay one inbound message: one backend call, one outbound push.
///
/// Failures collapse to the fixed fallback apology; a failure pushing the
/// fallback itself is only logged.
async fn process_message(state: Arc<RelayState>, message: InboundMessage) {
    let Some(text) = message.text_body() else {
        tracing::info!(from = %message.from, kind = %message.kind, "ignoring non-text message");
        return;
    };

    tracing::info!(from = %message.from, "received text message");

    let reply = match state.backend.complete(&[], text).await {
        Ok(reply) => reply,
        Err(err) => {
            tracing::error!(recipient = %message.from, error = %err, "backend call failed");
            send_fallback(&state, &message.from).await;
            return;
        }
    };

    if let Err(err) = state.api.send_text(&message.from, &reply).await {
        tracing::error!(recipient = %message.from, error = %err, "failed to push reply");
        send_fallback(&state, &message.from).await;
    }
}

async fn send_fallback(state: &RelayState, to: &str) {
    if let Err(err) = state.api.send_text(to, RELAY_FALLBACK_MESSAGE).await {
        tracing::error!(recipient = %to, error = %err, "failed to deliver fallback message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Json;
    use tower::ServiceExt;

    use counsel_core::Message;
    use counsel_llm::{LlmError, ReplyStream};

    const VERIFY_TOKEN: &str = "verify-me";
    const APP_SECRET: &str = "relay-app-secret";

    /// Backend that returns a scripted single-shot reply.
    struct FakeBackend {
        reply: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn replying(reply: &'static str) -> Self {
            Self {
                reply: Some(reply),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn stream_reply(
            &self,
            _history: &[Message],
            _message: &str,
        ) -> Result<ReplyStream, LlmError> {
            unreachable!("relay path never streams")
        }

        async fn complete(
            &self,
            _history: &[Message],
            _message: &str,
        ) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Some(reply) => Ok(reply.to_string()),
                None => Err(LlmError::Request {
                    status: Some(500),
                    message: "provider exploded".to_string(),
                }),
            }
        }
    }

    /// Local stand-in for the Graph API that records send payloads.
    async fn spawn_capture_server() -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();

        let app = Router::new().route(
            "/:phone/messages",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(body);
                    Json(serde_json::json!({"messages": [{"id": "wamid.test"}]}))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), captured)
    }

    fn test_config(graph_base_url: &str) -> RelayConfig {
        RelayConfig {
            whatsapp_token: "test-token".to_string(),
            phone_number_id: "106540352242922".to_string(),
            verify_token: VERIFY_TOKEN.to_string(),
            app_secret: APP_SECRET.to_string(),
            port: 0,
            bind_address: "127.0.0.1".to_string(),
            graph_base_url: graph_base_url.to_string(),
        }
    }

    fn relay_with(backend: FakeBackend, graph_base_url: &str) -> (Router, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        let relay = WhatsAppRelay::new(test_config(graph_base_url), backend.clone()).unwrap();
        (relay.router(), backend)
    }

    fn text_delivery(from: &str, body: &str) -> String {
        serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{"id": "WBA", "changes": [{"field": "messages", "value": {
                "messaging_product": "whatsapp",
                "messages": [{
                    "from": from,
                    "id": "wamid.A",
                    "timestamp": "1700000000",
                    "type": "text",
                    "text": {"body": body}
                }]
            }}]}]
        })
        .to_string()
    }

    fn signed_post(body: &str) -> Request<Body> {
        let sig = signature::expected_signature(APP_SECRET, body.as_bytes()).unwrap();
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, sig)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn wait_for_sends(captured: &Arc<Mutex<Vec<serde_json::Value>>>, n: usize) {
        for _ in 0..200 {
            if captured.lock().unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {} outbound send(s)", n);
    }

    #[tokio::test]
    async fn health_banner_served() {
        let (router, _) = relay_with(FakeBackend::replying("hi"), "http://127.0.0.1:9");
        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("running"));
    }

    #[tokio::test]
    async fn handshake_echoes_challenge() {
        let (router, _) = relay_with(FakeBackend::replying("hi"), "http://127.0.0.1:9");
        let uri = format!(
            "/webhook?hub.mode=subscribe&hub.verify_token={}&hub.challenge=1158201444",
            VERIFY_TOKEN
        );
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "1158201444");
    }

    #[tokio::test]
    async fn handshake_wrong_token_forbidden_without_leak() {
        let (router, _) = relay_with(FakeBackend::replying("hi"), "http://127.0.0.1:9");
        let uri = "/webhook?hub.mode=subscribe&hub.verify_token=guess&hub.challenge=42";
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_string(response).await;
        assert!(!body.contains(VERIFY_TOKEN));
        assert!(!body.contains("42"));
    }

    #[tokio::test]
    async fn handshake_missing_mode_forbidden() {
        let (router, _) = relay_with(FakeBackend::replying("hi"), "http://127.0.0.1:9");
        let uri = format!("/webhook?hub.verify_token={}&hub.challenge=42", VERIFY_TOKEN);
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unsigned_delivery_rejected() {
        let (router, backend) = relay_with(FakeBackend::replying("hi"), "http://127.0.0.1:9");
        let body = text_delivery("15551234567", "hello");
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn badly_signed_delivery_rejected() {
        let (router, backend) = relay_with(FakeBackend::replying("hi"), "http://127.0.0.1:9");
        let body = text_delivery("15551234567", "hello");
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .header(
                SIGNATURE_HEADER,
                "sha256=deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef",
            )
            .body(Body::from(body))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_payload_with_valid_signature_is_bad_request() {
        let (router, backend) = relay_with(FakeBackend::replying("hi"), "http://127.0.0.1:9");
        let response = router.oneshot(signed_post("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn status_only_delivery_acknowledged_without_processing() {
        let (router, backend) = relay_with(FakeBackend::replying("hi"), "http://127.0.0.1:9");
        let body = r#"{"entry":[{"changes":[{"value":{"statuses":[{"status":"delivered"}]}}]}]}"#;
        let response = router.oneshot(signed_post(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn text_delivery_produces_exactly_one_send_to_sender() {
        let (base_url, captured) = spawn_capture_server().await;
        let (router, backend) = relay_with(FakeBackend::replying("Here is my advice."), &base_url);

        let body = text_delivery("15551234567", "How do I prepare?");
        let response = router.oneshot(signed_post(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        wait_for_sends(&captured, 1).await;
        let sends = captured.lock().unwrap();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0]["messaging_product"], "whatsapp");
        assert_eq!(sends[0]["to"], "15551234567");
        assert_eq!(sends[0]["text"]["body"], "Here is my advice.");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backend_failure_pushes_fallback_apology() {
        let (base_url, captured) = spawn_capture_server().await;
        let (router, backend) = relay_with(FakeBackend::failing(), &base_url);

        let body = text_delivery("15557654321", "hello?");
        let response = router.oneshot(signed_post(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        wait_for_sends(&captured, 1).await;
        let sends = captured.lock().unwrap();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0]["to"], "15557654321");
        assert_eq!(sends[0]["text"]["body"], RELAY_FALLBACK_MESSAGE);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_text_message_is_logged_only() {
        let (base_url, captured) = spawn_capture_server().await;
        let (router, backend) = relay_with(FakeBackend::replying("hi"), &base_url);

        let body = serde_json::json!({
            "entry": [{"changes": [{"value": {"messages": [{
                "from": "15551234567",
                "id": "wamid.A",
                "type": "audio"
            }]}}]}]
        })
        .to_string();

        let response = router.oneshot(signed_post(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert!(captured.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn relay_lifecycle_start_and_stop() {
        let backend = Arc::new(FakeBackend::replying("hi"));
        let relay = WhatsAppRelay::new(test_config("http://127.0.0.1:9"), backend).unwrap();

        relay.start().await.unwrap();
        assert!(matches!(
            relay.start().await,
            Err(RelayError::AlreadyRunning)
        ));
        relay.stop().await.unwrap();
        assert!(matches!(relay.stop().await, Err(RelayError::NotRunning)));
    }
}
