//! Full page shell.

use crate::api::LoanBackend;
use crate::chat::markup::escape_html;
use crate::session::LoanSession;

use super::panels::{render_chat, render_decision, render_form, render_upload};

/// htmx swaps 2xx and the 404 "session expired" fragment; other errors are dropped.
const HTMX_CONFIG: &str = r#"{"responseHandling":[{"code":"204","swap":false},{"code":"[23]..","swap":true},{"code":"404","swap":true,"error":false},{"code":"[45]..","swap":false,"error":true}]}"#;

/// Wrap `content` in the document shell.
pub fn html_shell(title: &str, htmx_src: &str, content: &str) -> String {
    let title = escape_html(title);
    let htmx_src = escape_html(htmx_src);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Conversational loan advisor">
    <meta name="htmx-config" content='{HTMX_CONFIG}'>
    <title>{title}</title>
    <script src="{htmx_src}"></script>
    <link rel="stylesheet" href="/static/app.css">
</head>
<body>
    <div class="container">
        {content}
    </div>
</body>
</html>"#
    )
}

/// Render the whole page for a fresh session.
pub fn render_page(session: &LoanSession, backend: &dyn LoanBackend, htmx_src: &str) -> String {
    let content = format!(
        r#"<header class="header">
            <h2>🏦 AI Loan Advisor</h2>
            <small class="session-id">Session: {session_id}</small>
        </header>
        <div class="layout">
            <div class="column">
                {form}
                {upload}
            </div>
            <div class="column">
                {chat}
            </div>
            {decision}
        </div>"#,
        session_id = escape_html(session.id()),
        form = render_form(session),
        upload = render_upload(session),
        chat = render_chat(session, backend),
        decision = render_decision(session, backend),
    );
    html_shell("AI Loan Advisor", htmx_src, &content)
}

/// Fragment served for an unknown or expired session.
pub fn render_missing_session() -> String {
    r#"<div class="card status status-error session-missing">
    Your session has expired. <a href="/">Reload the page</a> to start a new application.
</div>"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SequentialSessionIds, SessionStore};
    use crate::testing::ScriptedBackend;

    #[test]
    fn test_page_shows_session_and_panels() {
        let store = SessionStore::new();
        let session = store.create(&SequentialSessionIds::new("page"));
        let html = render_page(&session, &ScriptedBackend::new(), "/htmx.js");

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<script src="/htmx.js"></script>"#));
        assert!(html.contains("Session: page-1"));
        assert!(html.contains(r#"id="form-panel""#));
        assert!(html.contains(r#"id="upload-panel""#));
        assert!(html.contains(r#"id="chat-panel""#));
        assert!(html.contains(r#"id="decision-panel""#));
    }

    #[test]
    fn test_shell_escapes_title() {
        let html = html_shell("<b>", "/htmx.js", "");
        assert!(html.contains("<title>&lt;b&gt;</title>"));
    }
}
