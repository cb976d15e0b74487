use axum::{
    Form, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use tracing::{info, warn};

use crate::AppState;
use crate::api::{DocumentFile, LoanApiClient};
use crate::chat::{CHECK_STATUS_MESSAGE, MessageOrigin, TokioDelay};
use crate::config::AppConfig;
use crate::form::LoanFormInput;
use crate::session::{LoanSession, RandomSessionIds};
use crate::ui;

/// Event fired after the application is saved.
const DECISION_UPDATED: &str = "decision-updated";
/// Event fired after an upload; the chat panel reloads on it.
const CHAT_UPDATED: &str = "chat-updated";
const HX_TRIGGER: &str = "HX-Trigger";

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let backend = Arc::new(LoanApiClient::new(&config.backend.base_url)?);
    info!(
        name: "backend.config.loaded",
        base_url = %backend.base_url(),
        "Loan backend configured"
    );

    let state = AppState::new(
        Arc::clone(&config),
        backend,
        Arc::new(TokioDelay),
        Arc::new(RandomSessionIds),
    );
    let _sweeper = state
        .sessions
        .spawn_sweeper(config.sweep_interval(), config.idle_timeout());

    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        backend = %config.backend.base_url,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the UI router.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/ui/{session_id}/apply", post(apply))
        .route("/ui/{session_id}/upload", post(upload))
        .route("/ui/{session_id}/chat", get(chat_fragment).post(chat_send))
        .route("/ui/{session_id}/chat/status", post(chat_status))
        .route("/ui/{session_id}/decision", get(decision_fragment))
        .nest_service("/static", ServeDir::new("static"))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Every page load starts a new session.
async fn index(State(state): State<AppState>) -> Html<String> {
    let session = state.sessions.create(state.ids.as_ref());
    Html(ui::render_page(
        &session,
        state.runtime.backend.as_ref(),
        &state.config.ui.htmx_src,
    ))
}

fn find_session(state: &AppState, session_id: &str) -> Result<LoanSession, Response> {
    state.sessions.get(session_id).ok_or_else(|| {
        (StatusCode::NOT_FOUND, Html(ui::render_missing_session())).into_response()
    })
}

async fn apply(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Form(input): Form<LoanFormInput>,
) -> Response {
    let session = match find_session(&state, &session_id) {
        Ok(session) => session,
        Err(response) => return response,
    };

    session
        .submit_application(&input, state.runtime.backend.as_ref())
        .await;

    (
        [(HX_TRIGGER, DECISION_UPDATED)],
        Html(ui::render_form(&session)),
    )
        .into_response()
}

async fn upload(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let session = match find_session(&state, &session_id) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match read_document(&mut multipart).await {
        Ok(file) => {
            session.upload_document(file, &state.runtime).await;
        }
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Failed to read upload");
            session.upload().record_error(e.body_text());
        }
    }

    (
        [(HX_TRIGGER, CHAT_UPDATED)],
        Html(ui::render_upload(&session)),
    )
        .into_response()
}

/// Pull the `file` part out of the upload form.
async fn read_document(multipart: &mut Multipart) -> Result<Option<DocumentFile>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string).unwrap_or_default();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        return Ok(Some(DocumentFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    #[serde(default)]
    message: String,
}

async fn chat_send(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Form(form): Form<ChatForm>,
) -> Response {
    let session = match find_session(&state, &session_id) {
        Ok(session) => session,
        Err(response) => return response,
    };

    session.spawn_chat(&form.message, MessageOrigin::User, &state.runtime);
    Html(ui::render_chat(&session, state.runtime.backend.as_ref())).into_response()
}

async fn chat_status(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    let session = match find_session(&state, &session_id) {
        Ok(session) => session,
        Err(response) => return response,
    };

    session.spawn_chat(CHECK_STATUS_MESSAGE, MessageOrigin::Synthetic, &state.runtime);
    Html(ui::render_chat(&session, state.runtime.backend.as_ref())).into_response()
}

async fn chat_fragment(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    match find_session(&state, &session_id) {
        Ok(session) => Html(ui::render_chat(&session, state.runtime.backend.as_ref())).into_response(),
        Err(response) => response,
    }
}

async fn decision_fragment(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match find_session(&state, &session_id) {
        Ok(session) => {
            Html(ui::render_decision(&session, state.runtime.backend.as_ref())).into_response()
        }
        Err(response) => response,
    }
}
