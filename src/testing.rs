//! In-process fakes for exercising the UI without a running backend.
//!
//! Used by the unit tests and by the integration tests under `tests/`.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::api::{
    ApiError, ApiVerb, ApplicationData, ChatReply, ChatRequest, DocumentFile, LoanBackend, Result,
    UploadResult,
};
use crate::chat::continuation::Delay;

/// Base URL used by [`ScriptedBackend::download_url`].
pub const FAKE_BACKEND_BASE: &str = "http://backend.test";

/// A [`LoanBackend`] that replays queued replies and records every call.
///
/// When the chat script runs dry the `fallback` reply is returned, or a
/// plain terminal reply if no fallback is set.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    chat_script: Mutex<VecDeque<Result<ChatReply>>>,
    chat_fallback: Mutex<Option<ChatReply>>,
    apply_script: Mutex<VecDeque<Result<Value>>>,
    upload_script: Mutex<VecDeque<Result<UploadResult>>>,
    chat_requests: Mutex<Vec<ChatRequest>>,
    applications: Mutex<Vec<(String, ApplicationData)>>,
    uploads: Mutex<Vec<(String, DocumentFile)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful chat reply.
    #[must_use]
    pub fn with_chat_reply(self, reply: ChatReply) -> Self {
        lock(&self.chat_script).push_back(Ok(reply));
        self
    }

    /// Queue a chat failure with the given HTTP status.
    #[must_use]
    pub fn with_chat_status(self, status: u16) -> Self {
        lock(&self.chat_script).push_back(Err(ApiError::Status {
            verb: ApiVerb::Chat,
            status,
        }));
        self
    }

    /// Reply returned once the chat script is exhausted.
    #[must_use]
    pub fn with_chat_fallback(self, reply: ChatReply) -> Self {
        *lock(&self.chat_fallback) = Some(reply);
        self
    }

    /// Queue an apply failure with the given HTTP status.
    #[must_use]
    pub fn with_apply_status(self, status: u16) -> Self {
        lock(&self.apply_script).push_back(Err(ApiError::Status {
            verb: ApiVerb::Apply,
            status,
        }));
        self
    }

    /// Queue a successful upload reply.
    #[must_use]
    pub fn with_upload_result(self, result: UploadResult) -> Self {
        lock(&self.upload_script).push_back(Ok(result));
        self
    }

    /// Queue an upload failure with the given HTTP status.
    #[must_use]
    pub fn with_upload_status(self, status: u16) -> Self {
        lock(&self.upload_script).push_back(Err(ApiError::Status {
            verb: ApiVerb::Upload,
            status,
        }));
        self
    }

    /// Messages sent to the chat endpoint, in order.
    pub fn chat_messages(&self) -> Vec<String> {
        lock(&self.chat_requests)
            .iter()
            .map(|r| r.message.clone())
            .collect()
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        lock(&self.chat_requests).clone()
    }

    pub fn applications(&self) -> Vec<(String, ApplicationData)> {
        lock(&self.applications).clone()
    }

    pub fn uploads(&self) -> Vec<(String, DocumentFile)> {
        lock(&self.uploads).clone()
    }
}

#[async_trait]
impl LoanBackend for ScriptedBackend {
    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        lock(&self.chat_requests).push(request.clone());
        let next = lock(&self.chat_script).pop_front();
        match next {
            Some(result) => result,
            None => Ok(lock(&self.chat_fallback).clone().unwrap_or_else(|| ChatReply {
                reply: Some("Noted.".to_string()),
                step: Some("end".to_string()),
                ..ChatReply::default()
            })),
        }
    }

    async fn save_application(&self, session_id: &str, data: &ApplicationData) -> Result<Value> {
        lock(&self.applications).push((session_id.to_string(), data.clone()));
        lock(&self.apply_script)
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"ok": true})))
    }

    async fn upload_doc(&self, session_id: &str, file: DocumentFile) -> Result<UploadResult> {
        let filename = file.file_name.clone();
        lock(&self.uploads).push((session_id.to_string(), file));
        lock(&self.upload_script).pop_front().unwrap_or_else(|| {
            Ok(UploadResult {
                filename,
                ..UploadResult::default()
            })
        })
    }

    fn download_url(&self, pdf_id: &str) -> String {
        format!("{FAKE_BACKEND_BASE}/api/download/{pdf_id}")
    }
}

/// A [`Delay`] that returns immediately and remembers what it was asked for.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        lock(&self.waits).clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn wait(&self, duration: Duration) {
        lock(&self.waits).push(duration);
    }
}
