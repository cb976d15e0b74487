//! Wire types exchanged with the loan backend.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

// =============================================================================
// Chat
// =============================================================================

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub message: String,
}

impl ChatRequest {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
        }
    }
}

/// Reply from `POST /api/chat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Assistant text; may contain `**bold**` and `[text](url)` markup.
    #[serde(default)]
    pub reply: Option<String>,
    /// Workflow step label, e.g. `underwriting` or `sanction`.
    #[serde(default)]
    pub step: Option<String>,
    /// Decision snapshot, when the backend has one to report.
    #[serde(default)]
    pub decision: Option<Decision>,
    /// Identifier of a generated sanction letter.
    #[serde(default, rename = "pdfId")]
    pub pdf_id: Option<String>,
}

impl ChatReply {
    /// Reply text, treating an empty string as absent.
    pub fn reply_text(&self) -> Option<&str> {
        self.reply.as_deref().filter(|text| !text.is_empty())
    }

    /// PDF identifier, treating an empty string as absent.
    pub fn pdf(&self) -> Option<&str> {
        self.pdf_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn step_is(&self, step: &str) -> bool {
        self.step.as_deref() == Some(step)
    }
}

// =============================================================================
// Decision
// =============================================================================

/// The backend's verdict snapshot for the active application.
///
/// Every field is optional and the shape is owned by the backend. Numeric
/// fields accept numbers or numeric strings; anything else reads as absent.
/// Unknown fields are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub emi: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub tenure: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, rename = "pdfId", skip_serializing_if = "Option::is_none")]
    pub pdf_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Decision {
    /// Optimistic placeholder shown right after the loan form is saved.
    pub fn submitted(application: &ApplicationData) -> Self {
        Self {
            status: Some("submitted".to_string()),
            amount: application.loan_amount.as_f64(),
            tenure: application.tenure.as_f64(),
            ..Self::default()
        }
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    })
}

// =============================================================================
// Application
// =============================================================================

/// Loan requirements after numeric coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationData {
    pub loan_amount: Number,
    pub tenure: Number,
    pub income: Number,
    pub purpose: String,
    pub employment: String,
    pub age: Number,
}

/// Body of `POST /api/apply`: the session id merged with the application fields.
#[derive(Debug, Serialize)]
pub(crate) struct ApplyRequest<'a> {
    #[serde(rename = "sessionId")]
    pub session_id: &'a str,
    #[serde(flatten)]
    pub data: &'a ApplicationData,
}

// =============================================================================
// Upload
// =============================================================================

/// A document selected in the browser, ready to forward to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub file_name: String,
    /// MIME type reported by the browser; guessed from the name when absent.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DocumentFile {
    /// Content type to send, falling back to a guess from the file extension.
    pub fn resolved_content_type(&self) -> String {
        self.content_type
            .clone()
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            })
    }
}

/// Reply from `POST /api/upload`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub filename: String,
    /// Backend classifier flagged the document as a salary slip.
    #[serde(default, deserialize_with = "lenient_flag")]
    pub salary_slip: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `null` and non-string values read as empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        _ => String::new(),
    })
}

/// Truthiness: `null`, `false`, `0` and `""` are false.
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    })
}
