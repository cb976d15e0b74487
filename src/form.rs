//! Loan requirements form.
//!
//! Range limits are rendered as native input constraints and enforced by the
//! browser; the server only coerces the numeric fields before saving.

use std::sync::{PoisonError, RwLock};

use serde::Deserialize;
use serde_json::Number;
use thiserror::Error;

use crate::api::{ApplicationData, LoanBackend};

/// Employment options as `(value, label)`.
pub const EMPLOYMENT_OPTIONS: &[(&str, &str)] = &[
    ("Salaried", "Salaried"),
    ("Self-employed", "Self-employed"),
    ("Business", "Business Owner"),
    ("Freelancer", "Freelancer"),
];

/// Raw form fields exactly as posted by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoanFormInput {
    #[serde(default)]
    pub loan_amount: String,
    #[serde(default)]
    pub tenure: String,
    #[serde(default)]
    pub income: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub employment: String,
    #[serde(default)]
    pub age: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("{field} must be a number (got '{value}')")]
    NotANumber { field: &'static str, value: String },
}

impl LoanFormInput {
    /// Coerce the four numeric fields; text fields pass through unchanged.
    pub fn coerce(&self) -> Result<ApplicationData, FormError> {
        Ok(ApplicationData {
            loan_amount: coerce_number("loan_amount", &self.loan_amount)?,
            tenure: coerce_number("tenure", &self.tenure)?,
            income: coerce_number("income", &self.income)?,
            purpose: self.purpose.clone(),
            employment: self.employment.clone(),
            age: coerce_number("age", &self.age)?,
        })
    }
}

/// Parse a numeric form field.
///
/// Blank input reads as `0`. Integral values become JSON integers so the
/// backend sees `500000`, not `500000.0`.
pub fn coerce_number(field: &'static str, raw: &str) -> Result<Number, FormError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Number::from(0));
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(Number::from(n));
    }

    let not_a_number = || FormError::NotANumber {
        field,
        value: raw.to_string(),
    };
    let Ok(value) = trimmed.parse::<f64>() else {
        return Err(not_a_number());
    };
    if !value.is_finite() {
        return Err(not_a_number());
    }
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        return Ok(Number::from(value as i64));
    }
    Number::from_f64(value).ok_or_else(not_a_number)
}

/// Status line under the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FormStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error(String),
}

impl FormStatus {
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Idle => None,
            Self::Saving => Some("Saving...".to_string()),
            Self::Saved => Some("✅ Saved! Now chat with the AI advisor to proceed.".to_string()),
            Self::Error(message) => Some(format!("❌ Error: {message}")),
        }
    }
}

/// Result of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Backend accepted the application.
    Saved(ApplicationData),
    /// A numeric field could not be coerced; nothing was sent.
    Invalid,
    /// Backend call failed; the form can be submitted again.
    Failed,
    /// The form was already submitted in this session.
    Ignored,
}

#[derive(Debug, Clone, Default)]
struct FormState {
    status: FormStatus,
    submitted: bool,
    /// Last values posted, rendered back into the inputs.
    input: LoanFormInput,
}

/// Loan form state for one session.
#[derive(Debug, Default)]
pub struct LoanForm {
    state: RwLock<FormState>,
}

impl LoanForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> FormStatus {
        self.read().status.clone()
    }

    /// Values from the latest submission, or empty before the first one.
    pub fn input(&self) -> LoanFormInput {
        self.read().input.clone()
    }

    /// Whether the application has been saved. Never resets.
    pub fn is_submitted(&self) -> bool {
        self.read().submitted
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, FormState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: FormStatus) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .status = status;
    }

    /// Coerce, save, and update the status line.
    pub async fn submit(
        &self,
        session_id: &str,
        input: &LoanFormInput,
        backend: &dyn LoanBackend,
    ) -> SubmitOutcome {
        if self.is_submitted() {
            return SubmitOutcome::Ignored;
        }
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .input = input.clone();

        let data = match input.coerce() {
            Ok(data) => data,
            Err(e) => {
                self.set_status(FormStatus::Error(e.to_string()));
                return SubmitOutcome::Invalid;
            }
        };

        self.set_status(FormStatus::Saving);
        match backend.save_application(session_id, &data).await {
            Ok(_) => {
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                state.status = FormStatus::Saved;
                state.submitted = true;
                SubmitOutcome::Saved(data)
            }
            Err(e) => {
                self.set_status(FormStatus::Error(e.to_string()));
                SubmitOutcome::Failed
            }
        }
    }
}
