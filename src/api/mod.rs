//! Loan backend API client.
//!
//! The UI never decides anything about an application itself; every
//! business operation goes through the [`LoanBackend`] trait:
//!
//! - `post_chat`: forward a chat message to the AI advisor
//! - `save_application`: store the loan requirements
//! - `upload_doc`: forward a KYC or salary document
//! - `download_url`: build the sanction-letter link (no network call)

pub mod client;
pub mod error;
pub mod types;

pub use client::{LoanApiClient, LoanBackend};
pub use error::{ApiError, ApiVerb, Result};
pub use types::{ApplicationData, ChatReply, ChatRequest, Decision, DocumentFile, UploadResult};
