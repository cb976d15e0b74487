//! Constrained markup renderer for chat text.
//!
//! Backend replies are parsed as Markdown with `pulldown-cmark`, then
//! filtered against an allow list before HTML is written:
//!
//! - `**bold**` becomes `<strong>`
//! - `[text](url)` becomes an `<a>` when the URL is `http(s)://` or root-relative;
//!   any other link is written back as literal text
//! - a newline becomes `<br />`
//!
//! Raw HTML in the reply is rendered as escaped text. Every other block or
//! inline construct, emphasis and code spans included, is flattened to its
//! text content.

use pulldown_cmark::{CowStr, Event, LinkType, Parser, Tag, TagEnd, html};

/// Escape text for use in HTML content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render chat text to safe HTML.
///
/// ```rust
/// use loan_advisor_ui::chat::markup::render_markup;
///
/// let html = render_markup("**Approved**\n[PDF](/api/download/42)");
/// assert!(html.starts_with("<strong>Approved</strong><br />"));
/// assert!(html.ends_with(
///     "<a href=\"/api/download/42\" target=\"_blank\" rel=\"noopener noreferrer\">PDF</a>"
/// ));
/// ```
pub fn render_markup(text: &str) -> String {
    let mut filter = AllowList::default();
    for event in Parser::new(text) {
        filter.feed(event);
    }

    let mut out = String::with_capacity(text.len() + 16);
    html::push_html(&mut out, filter.events.into_iter());
    out
}

/// Link targets allowed in rendered output.
pub fn is_safe_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with('/')
}

#[derive(Default)]
struct AllowList<'a> {
    events: Vec<Event<'a>>,
    /// Line breaks owed before the next emitted event.
    pending_breaks: usize,
    /// One entry per open link: `None` if rendered as `<a>`, otherwise the
    /// rejected destination.
    links: Vec<Option<(LinkType, CowStr<'a>)>>,
}

impl<'a> AllowList<'a> {
    fn emit(&mut self, event: Event<'a>) {
        if !self.events.is_empty() {
            for _ in 0..self.pending_breaks {
                self.events.push(Event::HardBreak);
            }
        }
        self.pending_breaks = 0;
        self.events.push(event);
    }

    fn end_block(&mut self, breaks: usize) {
        self.pending_breaks = self.pending_breaks.max(breaks);
    }

    fn feed(&mut self, event: Event<'a>) {
        match event {
            Event::Start(Tag::Strong) => self.emit(Event::Start(Tag::Strong)),
            Event::End(TagEnd::Strong) => self.emit(Event::End(TagEnd::Strong)),

            Event::Start(Tag::Link {
                link_type, dest_url, ..
            }) => {
                if is_safe_url(&dest_url) {
                    let open = format!(
                        r#"<a href="{}" target="_blank" rel="noopener noreferrer">"#,
                        escape_html(dest_url.trim())
                    );
                    self.emit(Event::InlineHtml(open.into()));
                    self.links.push(None);
                } else {
                    if link_type == LinkType::Inline {
                        self.emit(Event::Text("[".into()));
                    }
                    self.links.push(Some((link_type, dest_url)));
                }
            }
            Event::End(TagEnd::Link) => match self.links.pop() {
                Some(None) => self.emit(Event::InlineHtml("</a>".into())),
                Some(Some((LinkType::Inline, dest_url))) => {
                    self.emit(Event::Text(format!("]({dest_url})").into()));
                }
                _ => {}
            },

            Event::End(TagEnd::Heading(_) | TagEnd::Item) => self.end_block(1),
            Event::End(TagEnd::Image | TagEnd::Emphasis) | Event::Start(_) => {}
            Event::End(_) | Event::Rule => self.end_block(2),

            Event::Html(raw) | Event::InlineHtml(raw) => {
                let line_end = raw.ends_with('\n');
                let text = raw.trim_end_matches('\n').to_string();
                if !text.is_empty() {
                    self.emit(Event::Text(text.into()));
                }
                if line_end {
                    self.end_block(1);
                }
            }
            Event::SoftBreak | Event::HardBreak => self.emit(Event::HardBreak),
            Event::Text(text) | Event::Code(text) => self.emit(Event::Text(text)),

            // Footnotes, math and task lists are not enabled in the parser.
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK_ATTRS: &str = r#"target="_blank" rel="noopener noreferrer""#;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = render_markup("<script>alert('x')</script> & more");
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp; more"));
        assert!(!html.contains("<script"));

        let html = render_markup("Hello <b onclick=\"x()\">there</b>");
        assert!(html.contains("&lt;b onclick="));
        assert!(!html.contains("<b "));
    }

    #[test]
    fn test_bold() {
        assert_eq!(
            render_markup("Your loan is **APPROVED**!"),
            "Your loan is <strong>APPROVED</strong>!"
        );
        assert_eq!(
            render_markup("**a** and **b**"),
            "<strong>a</strong> and <strong>b</strong>"
        );
    }

    #[test]
    fn test_unclosed_bold_is_literal() {
        assert_eq!(render_markup("**open"), "**open");
    }

    #[test]
    fn test_newlines() {
        let html = render_markup("a\nb");
        assert!(html.starts_with("a<br />"));
        assert!(html.ends_with('b'));

        let html = render_markup("a\n\nb");
        assert_eq!(html.matches("<br />").count(), 2);
        assert!(!html.contains("<p>"));
    }

    #[test]
    fn test_link() {
        assert_eq!(
            render_markup("[Download](https://x.test/api/download/1?a=1&b=2)"),
            format!(
                r#"<a href="https://x.test/api/download/1?a=1&amp;b=2" {LINK_ATTRS}>Download</a>"#
            )
        );
    }

    #[test]
    fn test_bold_link_from_sanction_reply() {
        let html = render_markup(
            "📥 **[Click here to download your Sanction Letter](http://localhost:5000/api/download/abc)**",
        );
        assert_eq!(
            html,
            format!(
                r#"📥 <strong><a href="http://localhost:5000/api/download/abc" {LINK_ATTRS}>Click here to download your Sanction Letter</a></strong>"#
            )
        );
    }

    #[test]
    fn test_unsafe_link_is_literal() {
        let html = render_markup("[click](javascript:alert(1))");
        assert!(!html.contains("<a"));
        assert!(!html.contains("href"));
        assert!(html.contains("[click](javascript:alert(1))"));
    }

    #[test]
    fn test_link_label_cannot_inject_markup() {
        let html = render_markup("[<img src=x onerror=alert(1)>](/ok)");
        assert_eq!(
            html,
            format!(r#"<a href="/ok" {LINK_ATTRS}>&lt;img src=x onerror=alert(1)&gt;</a>"#)
        );
    }

    #[test]
    fn test_attribute_breakout_is_escaped() {
        let html = render_markup("[x](/a\"onmouseover=\"alert(1))");
        assert!(html.starts_with(r#"<a href="/a&quot;onmouseover=&quot;alert(1)""#));
    }

    #[test]
    fn test_other_markdown_is_flattened() {
        let html = render_markup("# Summary\n- EMI: 20,000\n- Tenure: 12\n\n![x](javascript:alert(1))");
        assert!(!html.contains("<h1"));
        assert!(!html.contains("<li"));
        assert!(!html.contains("<img"));
        assert!(html.contains("Summary"));
        assert!(html.contains("EMI: 20,000"));

        assert_eq!(render_markup("*maybe* `code`"), "maybe code");
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!(render_markup("₹5,00,000 **✓**"), "₹5,00,000 <strong>✓</strong>");
    }

    #[test]
    fn test_safe_urls() {
        assert!(is_safe_url("https://a.b"));
        assert!(is_safe_url("HTTP://a.b"));
        assert!(is_safe_url("/api/download/1"));
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url("data:text/html,hi"));
        assert!(!is_safe_url("mailto:a@b"));
    }
}
