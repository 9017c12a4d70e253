//! Session controller tests against a fake relay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use futures::{stream, StreamExt};
use pdf_chat_client::{
    ChatSettings, ClientError, LoadedDocument, MessageRole, RelayClient, SessionController,
    SessionState, CANCELLED_NOTICE, ERROR_MARKER, INTERRUPTION_MARKER,
};
use pretty_assertions::assert_eq;
use relay_core::FileInfo;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{any, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn document() -> LoadedDocument {
    LoadedDocument::extracted(
        "Doc X",
        FileInfo {
            name: "doc.pdf".to_string(),
            size: "1.00 KB".to_string(),
            content_type: "application/pdf".to_string(),
            last_modified: "1/2/2026, 3:04:05 PM".to_string(),
        },
    )
}

fn controller(relay_url: String) -> SessionController {
    let mut controller = SessionController::new(RelayClient::new(relay_url), ChatSettings::default());
    controller.load_document(document());
    controller
}

/// Serve `app` on an ephemeral port
async fn spawn_relay(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let url = format!("http://{}", listener.local_addr().expect("addr"));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    url
}

fn text_stream<S>(chunks: S) -> Response
where
    S: futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
{
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(chunks),
    )
        .into_response()
}

#[tokio::test]
async fn test_completes_with_streamed_text() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "documentText": "Doc X",
            "question": "What is X?"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw("It is Y.", "text/plain; charset=utf-8"))
        .mount(&relay)
        .await;

    let mut controller = controller(relay.uri());
    let outcome = controller
        .submit("What is X?", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(outcome.message.unwrap().content, "It is Y.");
    assert_eq!(outcome.notice, None);
    assert_eq!(*controller.subscribe().borrow(), "It is Y.");

    let roles: Vec<MessageRole> = controller
        .transcript()
        .messages()
        .iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(
        roles,
        vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]
    );
}

#[tokio::test]
async fn test_no_document_makes_no_request() {
    let relay = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&relay)
        .await;

    let mut controller = SessionController::new(RelayClient::new(relay.uri()), ChatSettings::default());
    let result = controller.submit("What is X?", CancellationToken::new()).await;

    assert!(matches!(result, Err(ClientError::NoDocument)));
    assert!(controller.transcript().is_empty());
}

#[tokio::test]
async fn test_fallback_answer_is_committed() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(502).set_body_json(serde_json::json!({
            "error": "Failed to connect to Ollama",
            "fallbackResponse": "I'm unable to connect to the Ollama service."
        })))
        .mount(&relay)
        .await;

    let mut controller = controller(relay.uri());
    let outcome = controller
        .submit("Q", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(
        outcome.message.unwrap().content,
        "I'm unable to connect to the Ollama service."
    );
}

#[tokio::test]
async fn test_missing_model_gives_install_instructions() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": "Model 'mistral' not found. Please make sure it's installed in Ollama."
        })))
        .mount(&relay)
        .await;

    let mut controller = controller(relay.uri());
    controller.settings_mut().model = Some("mistral".to_string());
    let outcome = controller
        .submit("Q", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SessionState::Failed);
    assert_eq!(outcome.message, None);
    let notice = outcome.notice.unwrap();
    assert_eq!(notice.role, MessageRole::System);
    assert!(notice.content.contains("ollama pull mistral"));
}

#[tokio::test]
async fn test_relay_error_is_a_notice() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": "Ollama API error: boom"
        })))
        .mount(&relay)
        .await;

    let mut controller = controller(relay.uri());
    let outcome = controller
        .submit("Q", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SessionState::Failed);
    assert_eq!(outcome.message, None);
    assert!(outcome.notice.unwrap().content.contains("Ollama API error: boom"));
}

#[tokio::test]
async fn test_unreachable_relay_fails() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut controller = controller(format!("http://127.0.0.1:{port}"));
    let outcome = controller
        .submit("Q", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SessionState::Failed);
    assert!(outcome.notice.is_some());
}

#[tokio::test]
async fn test_multibyte_text_split_across_chunks() {
    async fn chat() -> Response {
        let bytes = "Caf\u{e9} \u{1f600}".as_bytes();
        let chunks: Vec<Result<Bytes, std::io::Error>> = bytes
            .iter()
            .map(|b| Ok(Bytes::copy_from_slice(std::slice::from_ref(b))))
            .collect();
        text_stream(stream::iter(chunks))
    }

    let url = spawn_relay(Router::new().route("/api/chat", post(chat))).await;
    let mut controller = controller(url);
    let outcome = controller
        .submit("Q", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(outcome.message.unwrap().content, "Caf\u{e9} \u{1f600}");
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_cancel_commits_partial_answer_and_drops_connection() {
    let released = Arc::new(AtomicBool::new(false));
    let flag = released.clone();

    let app = Router::new().route(
        "/api/chat",
        post(move || {
            let guard = DropFlag(flag.clone());
            async move {
                let first = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"Partial ans"))]);
                text_stream(first.chain(stream::pending()).map(move |item| {
                    let _held = &guard;
                    item
                }))
            }
        }),
    );
    let url = spawn_relay(app).await;

    let mut controller = controller(url);
    let mut progress = controller.subscribe();
    let cancel = CancellationToken::new();

    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let outcome = controller.submit("Q", cancel).await;
            (controller, outcome)
        }
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while progress.changed().await.is_ok() {
            if progress.borrow_and_update().as_str() == "Partial ans" {
                break;
            }
        }
    })
    .await
    .expect("partial text should arrive");

    cancel.cancel();
    let (controller, outcome) = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("submit should end after cancel")
        .unwrap();
    let outcome = outcome.unwrap();

    assert_eq!(outcome.state, SessionState::Cancelled);
    assert_eq!(
        outcome.message.unwrap().content,
        format!("Partial ans{INTERRUPTION_MARKER}")
    );
    assert_eq!(
        controller.transcript().last().unwrap().content,
        format!("Partial ans{INTERRUPTION_MARKER}")
    );

    let dropped = tokio::time::timeout(Duration::from_secs(5), async {
        while !released.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(dropped.is_ok(), "relay stream should be released");
}

#[tokio::test]
async fn test_cancel_before_reply_adds_notice() {
    let relay = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&relay)
        .await;

    let mut controller = controller(relay.uri());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = controller.submit("Q", cancel).await.unwrap();
    assert_eq!(outcome.state, SessionState::Cancelled);
    assert_eq!(outcome.message, None);
    assert_eq!(outcome.notice.unwrap().content, CANCELLED_NOTICE);
}

#[tokio::test]
async fn test_read_error_keeps_partial_with_marker() {
    let fail_now = Arc::new(Notify::new());
    let trigger = fail_now.clone();

    let app = Router::new().route(
        "/api/chat",
        post(move || {
            let fail_now = trigger.clone();
            async move {
                let first = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"half"))]);
                let failure = stream::once(async move {
                    fail_now.notified().await;
                    Err(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "backend gone",
                    ))
                });
                text_stream(first.chain(failure))
            }
        }),
    );
    let url = spawn_relay(app).await;

    let mut controller = controller(url);
    let mut progress = controller.subscribe();
    let task = tokio::spawn(async move {
        controller.submit("Q", CancellationToken::new()).await
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while progress.changed().await.is_ok() {
            if progress.borrow_and_update().as_str() == "half" {
                break;
            }
        }
    })
    .await
    .expect("partial text should arrive");
    fail_now.notify_one();

    let outcome = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("read error should end the session")
        .unwrap()
        .unwrap();

    assert_eq!(outcome.state, SessionState::Failed);
    assert_eq!(
        outcome.message.unwrap().content,
        format!("half{ERROR_MARKER}")
    );
    assert!(outcome.notice.is_some());
}

#[tokio::test]
async fn test_json_success_body_is_not_streamed() {
    async fn chat() -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(serde_json::json!({ "error": "unexpected", "fallbackResponse": "Cached answer" })),
        )
    }

    let url = spawn_relay(Router::new().route("/api/chat", post(chat))).await;
    let mut controller = controller(url);
    let outcome = controller
        .submit("Q", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(outcome.message.unwrap().content, "Cached answer");
}
