//! htmx fragments for each panel.
//!
//! Every fragment is a complete element with a stable id so handlers can
//! return it for an `outerHTML` swap.

use crate::api::LoanBackend;
use crate::chat::markup::{escape_html, render_markup};
use crate::decision::DecisionView;
use crate::form::{EMPLOYMENT_OPTIONS, FormStatus};
use crate::session::LoanSession;
use crate::upload::{ACCEPTED_EXTENSIONS, UploadStatus};

// ─────────────────────────────────────────────────────────────────────────────
// Status lines
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum StatusKind {
    Pending,
    Ok,
    Error,
}

impl StatusKind {
    fn css_class(self) -> &'static str {
        match self {
            Self::Pending => "status status-pending",
            Self::Ok => "status status-ok",
            Self::Error => "status status-error",
        }
    }
}

fn status_line(kind: StatusKind, text: Option<String>) -> String {
    match text {
        Some(text) => format!(
            r#"<div class="{class}" role="status">{text}</div>"#,
            class = kind.css_class(),
            text = escape_html(&text),
        ),
        None => String::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loan form
// ─────────────────────────────────────────────────────────────────────────────

/// Loan requirements form. Inputs are disabled once the application is saved.
pub fn render_form(session: &LoanSession) -> String {
    let form = session.form();
    let submitted = form.is_submitted();
    let status = form.status();
    let kind = match status {
        FormStatus::Saved => StatusKind::Ok,
        FormStatus::Error(_) => StatusKind::Error,
        FormStatus::Idle | FormStatus::Saving => StatusKind::Pending,
    };

    let input = form.input();
    let options: String = EMPLOYMENT_OPTIONS
        .iter()
        .map(|(value, label)| {
            let selected = if input.employment == *value { " selected" } else { "" };
            format!(r#"<option value="{value}"{selected}>{label}</option>"#)
        })
        .collect();
    let disabled = if submitted { " disabled" } else { "" };
    let button = if submitted {
        "✓ Submitted"
    } else {
        "Submit Application"
    };

    format!(
        r##"<section id="form-panel" class="card">
    <h3>📋 Loan Requirements</h3>
    <form hx-post="/ui/{session_id}/apply" hx-target="#form-panel" hx-swap="outerHTML">
        <fieldset class="form-grid"{disabled}>
            <div>
                <label class="label" for="loan_amount">Loan Amount (₹)</label>
                <input class="input" id="loan_amount" name="loan_amount" value="{loan_amount}" type="number" min="10000" step="1000" required placeholder="e.g., 500000">
            </div>
            <div>
                <label class="label" for="tenure">Tenure (months)</label>
                <input class="input" id="tenure" name="tenure" value="{tenure}" type="number" min="6" max="360" step="1" required placeholder="e.g., 12">
            </div>
            <div>
                <label class="label" for="income">Monthly Income (₹)</label>
                <input class="input" id="income" name="income" value="{income}" type="number" min="5000" step="100" required placeholder="e.g., 80000">
            </div>
            <div>
                <label class="label" for="purpose">Purpose</label>
                <input class="input" id="purpose" name="purpose" value="{purpose}" type="text" placeholder="e.g., Home Renovation">
            </div>
            <div>
                <label class="label" for="employment">Employment</label>
                <select class="input" id="employment" name="employment" required>
                    <option value="">Select...</option>
                    {options}
                </select>
            </div>
            <div>
                <label class="label" for="age">Age</label>
                <input class="input" id="age" name="age" value="{age}" type="number" min="18" max="70" required placeholder="e.g., 30">
            </div>
        </fieldset>
        <div class="actions">
            <button class="button" type="submit"{disabled}>{button}</button>
            <span class="htmx-indicator">Saving...</span>
        </div>
    </form>
    {status}
</section>"##,
        session_id = escape_html(session.id()),
        loan_amount = escape_html(&input.loan_amount),
        tenure = escape_html(&input.tenure),
        income = escape_html(&input.income),
        purpose = escape_html(&input.purpose),
        age = escape_html(&input.age),
        status = status_line(kind, status.text()),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Document upload
// ─────────────────────────────────────────────────────────────────────────────

/// File picker that uploads as soon as a file is chosen.
pub fn render_upload(session: &LoanSession) -> String {
    let panel = session.upload();
    let status = panel.status();
    let kind = match status {
        UploadStatus::Uploaded { .. } => StatusKind::Ok,
        UploadStatus::Error(_) => StatusKind::Error,
        UploadStatus::Idle | UploadStatus::Uploading => StatusKind::Pending,
    };
    let disabled = if panel.is_uploading() { " disabled" } else { "" };

    format!(
        r##"<section id="upload-panel" class="card">
    <h3>📄 Document Upload</h3>
    <p class="hint">Upload KYC documents (Aadhaar/PAN) or Salary Slip for verification.</p>
    <form hx-post="/ui/{session_id}/upload" hx-encoding="multipart/form-data" hx-trigger="change" hx-target="#upload-panel" hx-swap="outerHTML">
        <input type="file" name="file" accept="{ACCEPTED_EXTENSIONS}"{disabled}>
        <span class="htmx-indicator">📤 Uploading...</span>
    </form>
    {status}
</section>"##,
        session_id = escape_html(session.id()),
        status = status_line(kind, status.text()),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

/// Chat log, sanction banner and input controls.
///
/// While an exchange is running the fragment shows a processing bubble and
/// reloads itself every second.
pub fn render_chat(session: &LoanSession, backend: &dyn LoanBackend) -> String {
    let chat = session.chat();
    let busy = chat.is_busy();
    let session_id = escape_html(session.id());

    let mut log = String::new();
    for message in chat.messages() {
        log.push_str(&format!(
            r#"<div class="msg {role}"><span class="bubble">{text}</span></div>"#,
            role = message.role.as_str(),
            text = render_markup(&message.text),
        ));
    }
    if busy {
        log.push_str(r#"<div class="msg assistant"><span class="bubble">⏳ Processing...</span></div>"#);
    }

    let banner = chat
        .pdf_id()
        .map(|pdf_id| {
            format!(
                r#"<div class="sanction-banner">
        <strong>🎉 Loan Approved!</strong><br>
        <a href="{url}" target="_blank" rel="noopener">📥 Download Sanction Letter (PDF)</a>
    </div>"#,
                url = escape_html(&backend.download_url(&pdf_id)),
            )
        })
        .unwrap_or_default();

    let trigger = if busy {
        "load delay:1s, chat-updated from:body"
    } else {
        "chat-updated from:body"
    };
    let disabled = if busy { " disabled" } else { "" };

    format!(
        r##"<section id="chat-panel" class="card" hx-get="/ui/{session_id}/chat" hx-trigger="{trigger}" hx-swap="outerHTML">
    <h3>💬 Chat with AI Advisor</h3>
    <div class="chat-log"><div>{log}</div></div>
    {banner}
    <form class="chat-form" hx-post="/ui/{session_id}/chat" hx-target="#chat-panel" hx-swap="outerHTML">
        <textarea class="input" name="message" rows="2" placeholder="Type a message..." required{disabled}
            onkeydown="if (event.key === 'Enter' &amp;&amp; !event.shiftKey) {{ event.preventDefault(); this.form.requestSubmit(); }}"></textarea>
        <div class="actions">
            <button class="button button-muted" type="button" hx-post="/ui/{session_id}/chat/status" hx-target="#chat-panel" hx-swap="outerHTML"{disabled}>Check Status</button>
            <button class="button" type="submit"{disabled}>Send</button>
        </div>
    </form>
</section>"##
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision
// ─────────────────────────────────────────────────────────────────────────────

/// Decision summary. Empty until the first decision arrives.
pub fn render_decision(session: &LoanSession, backend: &dyn LoanBackend) -> String {
    let session_id = escape_html(session.id());
    let refresh = format!(
        r#"hx-get="/ui/{session_id}/decision" hx-trigger="decision-updated from:body, every 2s" hx-swap="outerHTML""#
    );

    let Some(decision) = session.decision() else {
        return format!(r#"<section id="decision-panel" class="decision-empty" {refresh}></section>"#);
    };

    let view = DecisionView::project(&decision, |id| backend.download_url(id));
    let rows: String = view
        .rows
        .iter()
        .map(|row| {
            format!(
                "<p><strong>{label}:</strong> {value}</p>",
                label = row.label,
                value = escape_html(&row.value),
            )
        })
        .collect();
    let download = view
        .download_url
        .map(|url| {
            format!(
                r#"<div class="download"><a class="button" href="{url}" target="_blank" rel="noreferrer">📥 Download Sanction Letter</a></div>"#,
                url = escape_html(&url),
            )
        })
        .unwrap_or_default();

    format!(
        r#"<section id="decision-panel" class="card decision {tone}" {refresh}>
    <h3>{heading}</h3>
    <div class="decision-status"><strong>Status:</strong> <span>{status}</span></div>
    {rows}
    {download}
</section>"#,
        tone = view.tone.css_class(),
        heading = view.tone.heading(),
        status = escape_html(&view.status),
    )
}
