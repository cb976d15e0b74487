//! Document upload panel.

use std::sync::{PoisonError, RwLock};

use crate::api::{DocumentFile, LoanBackend, UploadResult};

/// File extensions offered by the picker. Not enforced server-side.
pub const ACCEPTED_EXTENSIONS: &str = ".pdf,.jpg,.jpeg,.png,.doc,.docx";

/// Status line under the file picker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Uploaded { filename: String, salary_slip: bool },
    Error(String),
}

impl UploadStatus {
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Idle => None,
            Self::Uploading => Some("📤 Uploading...".to_string()),
            Self::Uploaded {
                filename,
                salary_slip,
            } => {
                let hint = if *salary_slip {
                    " (Salary Slip detected)"
                } else {
                    ""
                };
                Some(format!("✅ Uploaded: {filename}{hint}"))
            }
            Self::Error(message) => Some(format!("❌ Error: {message}")),
        }
    }
}

/// Result of an upload attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Uploaded(UploadResult),
    /// No file was selected; nothing changed.
    NoFile,
    /// Another upload from this session is still in flight.
    Busy,
    Failed,
}

#[derive(Debug, Default)]
struct UploadState {
    status: UploadStatus,
    uploading: bool,
}

/// Upload panel state for one session.
#[derive(Debug, Default)]
pub struct UploadPanel {
    state: RwLock<UploadState>,
}

impl UploadPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> UploadStatus {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
            .clone()
    }

    pub fn is_uploading(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .uploading
    }

    fn set_status(&self, status: UploadStatus) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .status = status;
    }

    /// Show an error raised before the backend was reached.
    pub fn record_error(&self, message: impl Into<String>) {
        self.set_status(UploadStatus::Error(message.into()));
    }

    /// Forward the selected file to the backend.
    ///
    /// No type or size checks happen here; the backend decides.
    pub async fn upload(
        &self,
        session_id: &str,
        file: Option<DocumentFile>,
        backend: &dyn LoanBackend,
    ) -> UploadOutcome {
        let Some(file) = file.filter(|f| !f.file_name.is_empty()) else {
            return UploadOutcome::NoFile;
        };

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.uploading {
                return UploadOutcome::Busy;
            }
            state.uploading = true;
            state.status = UploadStatus::Uploading;
        }
        let _uploading = UploadingFlag(self);

        match backend.upload_doc(session_id, file).await {
            Ok(result) => {
                self.set_status(UploadStatus::Uploaded {
                    filename: result.filename.clone(),
                    salary_slip: result.salary_slip,
                });
                UploadOutcome::Uploaded(result)
            }
            Err(e) => {
                self.set_status(UploadStatus::Error(e.to_string()));
                UploadOutcome::Failed
            }
        }
    }
}

/// Clears the uploading flag however the upload future ends.
struct UploadingFlag<'a>(&'a UploadPanel);

impl Drop for UploadingFlag<'_> {
    fn drop(&mut self) {
        self.0
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .uploading = false;
    }
}
