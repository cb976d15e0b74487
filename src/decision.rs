//! Decision panel projection.
//!
//! Turns the loosely typed [`Decision`] into display rows. Absent, zero, and
//! empty values are skipped.

use crate::api::Decision;

/// Color scheme and heading chosen from the decision status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionTone {
    Approved,
    Rejected,
    Neutral,
}

impl DecisionTone {
    pub fn from_status(status: Option<&str>) -> Self {
        match status {
            Some("approved") => Self::Approved,
            Some("rejected") => Self::Rejected,
            _ => Self::Neutral,
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Self::Approved => "🎉 Loan Approved!",
            Self::Rejected => "❌ Loan Declined",
            Self::Neutral => "📊 Decision Status",
        }
    }

    /// Modifier class used by the stylesheet.
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Approved => "tone-approved",
            Self::Rejected => "tone-rejected",
            Self::Neutral => "tone-neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRow {
    pub label: &'static str,
    pub value: String,
}

/// Everything the decision panel displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionView {
    pub tone: DecisionTone,
    pub status: String,
    pub rows: Vec<DecisionRow>,
    pub download_url: Option<String>,
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

fn present_text(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

impl DecisionView {
    /// Project a decision; `download_url` builds the sanction-letter link.
    pub fn project(decision: &Decision, download_url: impl Fn(&str) -> String) -> Self {
        let tone = DecisionTone::from_status(decision.status.as_deref());
        let mut rows = Vec::new();

        if let Some(amount) = present(decision.loan_amount).or(present(decision.amount)) {
            rows.push(DecisionRow {
                label: "Loan Amount",
                value: format_rupees(amount),
            });
        }
        if let Some(emi) = present(decision.emi) {
            rows.push(DecisionRow {
                label: "Monthly EMI",
                value: format_rupees(emi),
            });
        }
        if let Some(tenure) = present(decision.tenure) {
            rows.push(DecisionRow {
                label: "Tenure",
                value: format!("{} months", format_plain(tenure)),
            });
        }
        if let Some(score) = present(decision.credit_score) {
            rows.push(DecisionRow {
                label: "Credit Score",
                value: format_plain(score),
            });
        }
        if let Some(confidence) = present(decision.confidence) {
            rows.push(DecisionRow {
                label: "Confidence",
                value: format!("{:.0}%", confidence * 100.0),
            });
        }
        if let Some(reason) = present_text(decision.reason.as_ref()) {
            rows.push(DecisionRow {
                label: "Reason",
                value: reason.to_string(),
            });
        }

        Self {
            tone,
            status: decision.status.clone().unwrap_or_default(),
            rows,
            download_url: present_text(decision.pdf_id.as_ref()).map(download_url),
        }
    }
}

/// `₹` amount with thousands separators and at most two decimals.
pub fn format_rupees(value: f64) -> String {
    format!("₹{}", group_thousands(value))
}

/// Number without a trailing `.0` for integral values.
fn format_plain(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        let s = format!("{rounded:.2}");
        s.trim_end_matches('0').to_string()
    }
}

fn group_thousands(value: f64) -> String {
    let plain = format_plain(value.abs());
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (plain.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    if value < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}
