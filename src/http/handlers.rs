use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::bridge::{forward_to_discord, ChatEventKind};
use crate::http::{ApiError, AppState};
use crate::status::StatusSnapshot;
use crate::whitelist::WhitelistEntry;

pub const WEBHOOK_SECRET_HEADER: &str = "X-Webhook-Secret";

pub async fn index(State(state): State<AppState>) -> Json<Value> {
    let bot = state.presence.tag().await.unwrap_or_else(|| "not ready".to_string());
    Json(json!({ "status": "ok", "bot": bot }))
}

pub async fn status(State(state): State<AppState>) -> Response {
    let source = state.status.clone();
    match tokio::spawn(async move { source.query().await }).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            error!("Status probe task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusSnapshot::offline(e.to_string())),
            )
                .into_response()
        }
    }
}

pub async fn whitelist(State(state): State<AppState>) -> Json<Vec<WhitelistEntry>> {
    Json(state.whitelist.list().await)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(rename = "type")]
    kind: Option<String>,
    player: Option<String>,
    message: Option<String>,
}

/// Empty strings count as missing.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    if let Some(secret) = &state.webhook_secret {
        let provided = headers.get(WEBHOOK_SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(secret.as_str()) {
            warn!("/chat rejected: bad or missing {}", WEBHOOK_SECRET_HEADER);
            return Err(ApiError::Unauthorized);
        }
    }

    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let (Some(kind), Some(player)) = (present(&request.kind), present(&request.player)) else {
        return Err(ApiError::BadRequest(r#"Missing "type" and/or "player""#.to_string()));
    };

    let Some(kind) = ChatEventKind::parse(kind) else {
        let valid: Vec<&str> = ChatEventKind::ALL.iter().map(|k| k.as_str()).collect();
        return Err(ApiError::BadRequest(format!("type must be one of: {}", valid.join(", "))));
    };

    let message = present(&request.message);
    if kind == ChatEventKind::Chat && message.is_none() {
        return Err(ApiError::BadRequest(r#"type "chat" requires a "message" field"#.to_string()));
    }

    let sink = state.presence.chat_sink().await;
    forward_to_discord(sink.as_deref(), kind.as_str(), player, message)
        .await
        .map_err(|e| {
            error!("Failed to forward {} event to Discord: {}", kind.as_str(), e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use http_body_util::BodyExt;
    use serenity::async_trait;
    use tower::ServiceExt;

    use crate::bridge::inbound::tests::RecordingSink;
    use crate::bridge::ChatPost;
    use crate::discord::BotPresence;
    use crate::http::{build_router, AppState};
    use crate::status::announcer::tests::FixedSource;
    use crate::status::{StatusSnapshot, StatusSource};
    use crate::whitelist::WhitelistStore;

    use super::*;

    struct PanickingSource;

    #[async_trait]
    impl StatusSource for PanickingSource {
        async fn query(&self) -> StatusSnapshot {
            panic!("query exploded")
        }
    }

    struct Harness {
        app: Router,
        sink: Arc<RecordingSink>,
        whitelist: Arc<WhitelistStore>,
    }

    async fn harness(secret: Option<&str>, ready: bool) -> Harness {
        let sink = Arc::new(RecordingSink::default());
        let presence = Arc::new(BotPresence::new());
        if ready {
            presence.set_ready("bridge#0001", sink.clone()).await;
        }
        let whitelist = Arc::new(WhitelistStore::in_memory());
        let state = AppState {
            whitelist: whitelist.clone(),
            status: Arc::new(FixedSource(StatusSnapshot::offline("Connection refused"))),
            presence,
            webhook_secret: secret.map(str::to_string),
        };
        Harness {
            app: build_router(state),
            sink,
            whitelist,
        }
    }

    fn chat_request(body: Value, secret: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header("x-webhook-secret", secret);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_index_reports_bot_tag() {
        let not_ready = harness(None, false).await;
        let (status, body) = send(&not_ready.app, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "bot": "not ready"}));

        let ready = harness(None, true).await;
        let (_, body) = send(&ready.app, get("/")).await;
        assert_eq!(body["bot"], "bridge#0001");
    }

    #[tokio::test]
    async fn test_status_returns_snapshot() {
        let h = harness(None, true).await;
        let (status, body) = send(&h.app, get("/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"online": false, "error": "Connection refused"}));
    }

    #[tokio::test]
    async fn test_status_query_panic_is_500() {
        let state = AppState {
            whitelist: Arc::new(WhitelistStore::in_memory()),
            status: Arc::new(PanickingSource),
            presence: Arc::new(BotPresence::new()),
            webhook_secret: None,
        };
        let (status, body) = send(&build_router(state), get("/status")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["online"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_whitelist_lists_entries() {
        let h = harness(None, true).await;
        h.whitelist.add("Steve", "admin").await.unwrap();

        let (status, body) = send(&h.app, get("/whitelist")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "Steve");
        assert_eq!(body[0]["addedBy"], "admin");
    }

    #[tokio::test]
    async fn test_chat_forwards_event() {
        let h = harness(Some("s3cret"), true).await;
        let (status, body) = send(
            &h.app,
            chat_request(json!({"type": "join", "player": "Alex"}), Some("s3cret")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));
        assert_eq!(
            *h.sink.posts.lock().unwrap(),
            vec![ChatPost::Text("🟢 **Alex** joined the game.".to_string())]
        );
    }

    #[tokio::test]
    async fn test_chat_wrong_secret_is_401_and_nothing_posted() {
        let h = harness(Some("s3cret"), true).await;
        for secret in [None, Some("guess")] {
            let (status, body) = send(
                &h.app,
                chat_request(json!({"type": "chat", "player": "Alex", "message": "hi"}), secret),
            )
            .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body, json!({"error": "Unauthorized"}));
        }
        assert!(h.sink.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_validation() {
        let h = harness(None, true).await;

        let (status, body) = send(&h.app, chat_request(json!({"type": "chat", "player": "Alex"}), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("\"message\""));

        let (status, _) = send(&h.app, chat_request(json!({"player": "Alex"}), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&h.app, chat_request(json!({"type": "join", "player": ""}), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&h.app, chat_request(json!({"type": "death", "player": "Alex"}), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "type must be one of: chat, join, leave");

        let malformed = Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&h.app, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(h.sink.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_before_ready_is_accepted_and_dropped() {
        let h = harness(None, false).await;
        let (status, body) = send(
            &h.app,
            chat_request(json!({"type": "leave", "player": "Alex"}), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));
        assert!(h.sink.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_send_failure_is_500() {
        let sink = Arc::new(RecordingSink {
            broken: true,
            ..RecordingSink::default()
        });
        let presence = Arc::new(BotPresence::new());
        presence.set_ready("bridge#0001", sink).await;
        let state = AppState {
            whitelist: Arc::new(WhitelistStore::in_memory()),
            status: Arc::new(FixedSource(StatusSnapshot::offline("x"))),
            presence,
            webhook_secret: None,
        };

        let (status, body) = send(
            &build_router(state),
            chat_request(json!({"type": "chat", "player": "Alex", "message": "hi"}), None),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }
}
