//! `LoanApiClient` against an in-process stub of the loan backend.

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};

use loan_advisor_ui::api::{
    ApiError, ApplicationData, ChatRequest, DocumentFile, LoanApiClient, LoanBackend,
};

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<Value>>>,
    uploads: Arc<Mutex<Vec<(String, String, String, usize)>>>,
}

async fn chat(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Response {
    recorded.bodies.lock().unwrap().push(body.clone());
    match body["sessionId"].as_str() {
        Some("down") => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        Some("garbled") => "not json".into_response(),
        _ => Json(json!({
            "reply": format!("You said: {}", body["message"].as_str().unwrap_or_default()),
            "step": "underwriting",
            "decision": {"status": "approved", "emi": "20833.33", "credit_score": 742},
            "pdfId": "sl-1"
        }))
        .into_response(),
    }
}

async fn apply(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Response {
    recorded.bodies.lock().unwrap().push(body.clone());
    if body["sessionId"] == "down" {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
    }
    (StatusCode::CREATED, Json(json!({"saved": true}))).into_response()
}

async fn upload(State(recorded): State<Recorded>, mut multipart: Multipart) -> Response {
    let mut session_id = String::new();
    let mut file = None;
    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name() {
            Some("sessionId") => session_id = field.text().await.unwrap(),
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let mime = field.content_type().unwrap_or_default().to_string();
                let size = field.bytes().await.unwrap().len();
                file = Some((name, mime, size));
            }
            _ => {}
        }
    }
    let Some((name, mime, size)) = file else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    recorded
        .uploads
        .lock()
        .unwrap()
        .push((session_id, name.clone(), mime, size));
    let salary_slip = if name.contains("salary") {
        json!(true)
    } else {
        Value::Null
    };
    Json(json!({"filename": name, "salary_slip": salary_slip})).into_response()
}

async fn spawn_stub() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/api/chat", post(chat))
        .route("/api/apply", post(apply))
        .route("/api/upload", post(upload))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), recorded)
}

fn application() -> ApplicationData {
    ApplicationData {
        loan_amount: 500_000.into(),
        tenure: 12.into(),
        income: 80_000.into(),
        purpose: "Home Renovation".to_string(),
        employment: "Salaried".to_string(),
        age: 30.into(),
    }
}

#[tokio::test]
async fn test_chat_round_trip() {
    let (base, recorded) = spawn_stub().await;
    let client = LoanApiClient::new(&base).unwrap();

    let reply = client
        .post_chat(&ChatRequest::new("s-1", "hello"))
        .await
        .unwrap();

    assert_eq!(reply.reply.as_deref(), Some("You said: hello"));
    assert_eq!(reply.step.as_deref(), Some("underwriting"));
    assert_eq!(reply.pdf_id.as_deref(), Some("sl-1"));
    let decision = reply.decision.unwrap();
    assert_eq!(decision.status.as_deref(), Some("approved"));
    assert_eq!(decision.emi, Some(20_833.33));
    assert_eq!(decision.credit_score, Some(742.0));

    let bodies = recorded.bodies.lock().unwrap().clone();
    assert_eq!(bodies, vec![json!({"sessionId": "s-1", "message": "hello"})]);
}

#[tokio::test]
async fn test_chat_error_status() {
    let (base, _) = spawn_stub().await;
    let client = LoanApiClient::new(&base).unwrap();

    let err = client
        .post_chat(&ChatRequest::new("down", "hello"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Chat error: 500");
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_chat_undecodable_body() {
    let (base, _) = spawn_stub().await;
    let client = LoanApiClient::new(&base).unwrap();

    let err = client
        .post_chat(&ChatRequest::new("garbled", "hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Decode { .. }));
    assert!(err.to_string().starts_with("Chat error:"));
}

#[tokio::test]
async fn test_apply_flattens_fields_next_to_session_id() {
    let (base, recorded) = spawn_stub().await;
    let client = LoanApiClient::new(&base).unwrap();

    let saved = client.save_application("s-1", &application()).await.unwrap();
    assert_eq!(saved, json!({"saved": true}));

    let bodies = recorded.bodies.lock().unwrap().clone();
    assert_eq!(
        bodies,
        vec![json!({
            "sessionId": "s-1",
            "loan_amount": 500000,
            "tenure": 12,
            "income": 80000,
            "purpose": "Home Renovation",
            "employment": "Salaried",
            "age": 30
        })]
    );
}

#[tokio::test]
async fn test_apply_error_body_is_ignored() {
    let (base, _) = spawn_stub().await;
    let client = LoanApiClient::new(&base).unwrap();

    let err = client
        .save_application("down", &application())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Apply error: 503");
}

#[tokio::test]
async fn test_upload_sends_multipart() {
    let (base, recorded) = spawn_stub().await;
    let client = LoanApiClient::new(&base).unwrap();

    let result = client
        .upload_doc(
            "s-1",
            DocumentFile {
                file_name: "salary_march.pdf".to_string(),
                content_type: None,
                bytes: vec![7; 64],
            },
        )
        .await
        .unwrap();

    assert_eq!(result.filename, "salary_march.pdf");
    assert!(result.salary_slip);

    let uploads = recorded.uploads.lock().unwrap().clone();
    assert_eq!(
        uploads,
        vec![(
            "s-1".to_string(),
            "salary_march.pdf".to_string(),
            "application/pdf".to_string(),
            64
        )]
    );
}

#[tokio::test]
async fn test_upload_null_flag_reads_as_false() {
    let (base, _) = spawn_stub().await;
    let client = LoanApiClient::new(&base).unwrap();

    let result = client
        .upload_doc(
            "s-1",
            DocumentFile {
                file_name: "aadhaar.png".to_string(),
                content_type: None,
                bytes: vec![1; 8],
            },
        )
        .await
        .unwrap();

    assert_eq!(result.filename, "aadhaar.png");
    assert!(!result.salary_slip);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = LoanApiClient::new(format!("http://{addr}")).unwrap();
    let err = client
        .post_chat(&ChatRequest::new("s-1", "hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Transport { .. }));
    assert_eq!(err.status(), None);
}
